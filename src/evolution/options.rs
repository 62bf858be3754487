//! # GeneticParams
//!
//! Tunables of the genetic engine and the main loop. Defaults follow long
//! standing practice for school timetables; every value can be overridden
//! through the builder or parsed from a `name=value,name=value` string.
//!
//! ## Example
//!
//! ```rust
//! use tablix_core::evolution::options::GeneticParams;
//!
//! let params: GeneticParams = "popsize=100,toursize=4".parse().unwrap();
//! assert_eq!(params.get_population_size(), 100);
//! assert_eq!(params.get_tournament_size(), 4);
//! assert_eq!(params.get_cache_size(), 16);
//!
//! let params = GeneticParams::builder()
//!     .population_size(40)
//!     .max_generations(500)
//!     .build();
//! assert!(params.validate().is_ok());
//! ```
//!
//! ## Parameters
//!
//! | name | field | default |
//! |---|---|---|
//! | `popsize` | individuals per node | 500 |
//! | `toursize` | tournament size | 3 |
//! | `mutatepart` | 1/n of the elite mutated per generation | 4 |
//! | `randpart` | 1/n of the elite randomized per generation | 6 |
//! | `maxequal` | longest tolerated run of equal fitness | 20 |
//! | `finish` | stagnant generations before a feasible run ends | 300 |
//! | `migrtime` | generations between migrations | 40 |
//! | `migrpart` | 1/n of the population migrates | 10 |
//! | `localtresh` | stagnant generations before local search | 100 |
//! | `localstep` | initial local search step | 4 |
//! | `pophint` | percent of the population seeded from hints | 25 |
//! | `cachesize` | fitness cache slots, 0 disables | 16 |
//! | `maxgen` | generation limit, 0 for none | 0 |

use std::str::FromStr;

use crate::error::{Result, SolverError};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticParams {
    population_size: usize,
    tournament_size: usize,
    mutate_part: usize,
    rand_part: usize,
    max_equal: usize,
    finish: usize,
    migration_time: usize,
    migration_part: usize,
    local_threshold: usize,
    local_step: usize,
    hint_percent: u32,
    cache_size: usize,
    max_generations: u64,
}

impl GeneticParams {
    pub fn get_population_size(&self) -> usize {
        self.population_size
    }

    pub fn get_tournament_size(&self) -> usize {
        self.tournament_size
    }

    pub fn get_mutate_part(&self) -> usize {
        self.mutate_part
    }

    pub fn get_rand_part(&self) -> usize {
        self.rand_part
    }

    pub fn get_max_equal(&self) -> usize {
        self.max_equal
    }

    pub fn get_finish(&self) -> usize {
        self.finish
    }

    pub fn get_migration_time(&self) -> usize {
        self.migration_time
    }

    pub fn get_migration_part(&self) -> usize {
        self.migration_part
    }

    pub fn get_local_threshold(&self) -> usize {
        self.local_threshold
    }

    pub fn get_local_step(&self) -> usize {
        self.local_step
    }

    pub fn get_hint_percent(&self) -> u32 {
        self.hint_percent
    }

    pub fn get_cache_size(&self) -> usize {
        self.cache_size
    }

    /// Generation limit, 0 means unlimited.
    pub fn get_max_generations(&self) -> u64 {
        self.max_generations
    }

    /// Number of tables exchanged per migration.
    pub fn migration_size(&self) -> usize {
        self.population_size / self.migration_part.max(1)
    }

    pub fn set_population_size(&mut self, value: usize) {
        self.population_size = value;
    }

    pub fn set_tournament_size(&mut self, value: usize) {
        self.tournament_size = value;
    }

    pub fn set_cache_size(&mut self, value: usize) {
        self.cache_size = value;
    }

    pub fn set_max_generations(&mut self, value: u64) {
        self.max_generations = value;
    }

    /// Sets a parameter by its short name, as used in parameter strings.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let parsed = value.trim().parse::<u64>().map_err(|_| {
            SolverError::Configuration(format!(
                "parameter '{}' needs a non-negative integer, got '{}'",
                name, value
            ))
        })?;
        let as_usize = || {
            usize::try_from(parsed).map_err(|_| {
                SolverError::Configuration(format!("parameter '{}' is out of range", name))
            })
        };

        match name.trim() {
            "popsize" => self.population_size = as_usize()?,
            "toursize" => self.tournament_size = as_usize()?,
            "mutatepart" => self.mutate_part = as_usize()?,
            "randpart" => self.rand_part = as_usize()?,
            "maxequal" => self.max_equal = as_usize()?,
            "finish" => self.finish = as_usize()?,
            "migrtime" => self.migration_time = as_usize()?,
            "migrpart" => self.migration_part = as_usize()?,
            "localtresh" => self.local_threshold = as_usize()?,
            "localstep" => self.local_step = as_usize()?,
            "pophint" => {
                self.hint_percent = u32::try_from(parsed).map_err(|_| {
                    SolverError::Configuration("parameter 'pophint' is out of range".to_string())
                })?
            }
            "cachesize" => self.cache_size = as_usize()?,
            "maxgen" => self.max_generations = parsed,
            other => {
                return Err(SolverError::Configuration(format!(
                    "unknown parameter '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Rejects values the engine can not run with.
    pub fn validate(&self) -> Result<()> {
        let at_least = |name: &str, value: usize, min: usize| {
            if value < min {
                Err(SolverError::Configuration(format!(
                    "parameter '{}' must be at least {}, got {}",
                    name, min, value
                )))
            } else {
                Ok(())
            }
        };

        at_least("popsize", self.population_size, 2)?;
        at_least("toursize", self.tournament_size, 1)?;
        at_least("mutatepart", self.mutate_part, 1)?;
        at_least("randpart", self.rand_part, 1)?;
        at_least("migrtime", self.migration_time, 1)?;
        at_least("migrpart", self.migration_part, 1)?;
        at_least("localstep", self.local_step, 1)?;
        if self.hint_percent > 100 {
            return Err(SolverError::Configuration(format!(
                "parameter 'pophint' is a percentage, got {}",
                self.hint_percent
            )));
        }
        Ok(())
    }

    /// Returns a builder for creating a `GeneticParams` instance.
    pub fn builder() -> GeneticParamsBuilder {
        GeneticParamsBuilder::default()
    }
}

impl Default for GeneticParams {
    fn default() -> Self {
        GeneticParamsBuilder::default().build()
    }
}

impl FromStr for GeneticParams {
    type Err = SolverError;

    /// Parses `name=value` pairs separated by commas on top of the defaults.
    fn from_str(s: &str) -> Result<Self> {
        let mut params = Self::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                SolverError::Configuration(format!("expected name=value, got '{}'", pair))
            })?;
            params.set(name, value)?;
        }
        Ok(params)
    }
}

/// Builder for `GeneticParams`. Unset values take their defaults.
#[derive(Debug, Clone, Default)]
pub struct GeneticParamsBuilder {
    population_size: Option<usize>,
    tournament_size: Option<usize>,
    mutate_part: Option<usize>,
    rand_part: Option<usize>,
    max_equal: Option<usize>,
    finish: Option<usize>,
    migration_time: Option<usize>,
    migration_part: Option<usize>,
    local_threshold: Option<usize>,
    local_step: Option<usize>,
    hint_percent: Option<u32>,
    cache_size: Option<usize>,
    max_generations: Option<u64>,
}

impl GeneticParamsBuilder {
    pub fn population_size(mut self, value: usize) -> Self {
        self.population_size = Some(value);
        self
    }

    pub fn tournament_size(mut self, value: usize) -> Self {
        self.tournament_size = Some(value);
        self
    }

    pub fn mutate_part(mut self, value: usize) -> Self {
        self.mutate_part = Some(value);
        self
    }

    pub fn rand_part(mut self, value: usize) -> Self {
        self.rand_part = Some(value);
        self
    }

    pub fn max_equal(mut self, value: usize) -> Self {
        self.max_equal = Some(value);
        self
    }

    pub fn finish(mut self, value: usize) -> Self {
        self.finish = Some(value);
        self
    }

    pub fn migration_time(mut self, value: usize) -> Self {
        self.migration_time = Some(value);
        self
    }

    pub fn migration_part(mut self, value: usize) -> Self {
        self.migration_part = Some(value);
        self
    }

    pub fn local_threshold(mut self, value: usize) -> Self {
        self.local_threshold = Some(value);
        self
    }

    pub fn local_step(mut self, value: usize) -> Self {
        self.local_step = Some(value);
        self
    }

    pub fn hint_percent(mut self, value: u32) -> Self {
        self.hint_percent = Some(value);
        self
    }

    pub fn cache_size(mut self, value: usize) -> Self {
        self.cache_size = Some(value);
        self
    }

    pub fn max_generations(mut self, value: u64) -> Self {
        self.max_generations = Some(value);
        self
    }

    pub fn build(self) -> GeneticParams {
        GeneticParams {
            population_size: self.population_size.unwrap_or(500),
            tournament_size: self.tournament_size.unwrap_or(3),
            mutate_part: self.mutate_part.unwrap_or(4),
            rand_part: self.rand_part.unwrap_or(6),
            max_equal: self.max_equal.unwrap_or(20),
            finish: self.finish.unwrap_or(300),
            migration_time: self.migration_time.unwrap_or(40),
            migration_part: self.migration_part.unwrap_or(10),
            local_threshold: self.local_threshold.unwrap_or(100),
            local_step: self.local_step.unwrap_or(4),
            hint_percent: self.hint_percent.unwrap_or(25),
            cache_size: self.cache_size.unwrap_or(16),
            max_generations: self.max_generations.unwrap_or(0),
        }
    }
}
