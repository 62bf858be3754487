use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use super::{
    genetic::{evaluate_dirty, GeneticEngine},
    local_search::{HillClimbing, LocalSearch},
    migration::MigrationChannel,
    options::GeneticParams,
};
use crate::{
    chromosome::{Population, Table, FITNESS_WORST},
    error::{OptionExt, Result, SolverError},
    fitness::Evaluator,
    rng::RandomNumberGenerator,
};

/// State of the search after one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Continue,
    /// A feasible table with fitness 0 was found.
    Solved,
    /// The best feasible fitness has not improved for `finish` generations.
    Converged,
    /// `maxgen` generations have been run.
    GenerationLimit,
}

/// Why [`Solver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunOutcome {
    Solved,
    Converged,
    GenerationLimit,
    Interrupted,
}

/// Summary of the best table of a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationReport {
    pub generation: u64,
    pub fitness: u64,
    pub feasible: bool,
    /// Weighted error counts of the fitness functions in registration order.
    pub subtotals: Vec<u64>,
}

impl GenerationReport {
    fn of(generation: u64, table: &Table) -> Self {
        Self {
            generation,
            fitness: table.rank(),
            feasible: table.is_feasible(),
            subtotals: table.subtotals().to_vec(),
        }
    }
}

impl fmt::Display for GenerationReport {
    /// Tab separated: generation, fitness, feasibility as 0/1, then the
    /// subtotals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.generation,
            self.fitness,
            u8::from(self.feasible)
        )?;
        for subtotal in &self.subtotals {
            write!(f, "\t{}", subtotal)?;
        }
        Ok(())
    }
}

/// Drives the genetic search on one node.
///
/// The [`Evaluator`] must have all fitness functions registered before the
/// solver is built. Its cache is resized to
/// [`GeneticParams::get_cache_size`].
pub struct Solver<'p> {
    evaluator: Evaluator<'p>,
    engine: GeneticEngine,
    local: HillClimbing,
    population: Population,
    rng: RandomNumberGenerator,
    migration: Option<Box<dyn MigrationChannel + 'p>>,
    convergence_log: Option<Box<dyn Write + 'p>>,
    best_seen: u64,
    stagnant: usize,
}

impl<'p> Solver<'p> {
    /// Creates a random initial population, seeds it from hints and
    /// evaluates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid, no fitness function
    /// is registered or the population can not be allocated.
    pub fn new(
        evaluator: Evaluator<'p>,
        params: GeneticParams,
        mut rng: RandomNumberGenerator,
    ) -> Result<Self> {
        let problem = evaluator.problem();
        let mut population = Population::init(problem, params.get_population_size())?;
        population.rand(problem, &mut rng)?;
        if params.get_hint_percent() > 0 {
            population.hint(problem, params.get_hint_percent(), &mut rng);
        }
        info!(
            size = population.len(),
            seed = rng.seed(),
            "initial population created"
        );
        Self::with_population(evaluator, params, population, rng)
    }

    /// Continues from a population restored with
    /// [`Population::load`](crate::chromosome::Population::load).
    pub fn resume(
        evaluator: Evaluator<'p>,
        params: GeneticParams,
        population: Population,
        rng: RandomNumberGenerator,
    ) -> Result<Self> {
        population.validate(evaluator.problem())?;
        if population.len() != params.get_population_size() {
            warn!(
                restored = population.len(),
                configured = params.get_population_size(),
                "restored population size differs from configuration"
            );
        }
        info!(
            size = population.len(),
            generation = population.generation(),
            "resuming population"
        );
        Self::with_population(evaluator, params, population, rng)
    }

    fn with_population(
        mut evaluator: Evaluator<'p>,
        params: GeneticParams,
        mut population: Population,
        rng: RandomNumberGenerator,
    ) -> Result<Self> {
        if evaluator.function_count() == 0 {
            return Err(SolverError::Configuration(
                "no fitness functions registered".to_string(),
            ));
        }
        debug!(?params, "genetic parameters");
        if evaluator.cache().capacity() != params.get_cache_size() {
            debug!(
                from = evaluator.cache().capacity(),
                to = params.get_cache_size(),
                "resizing fitness cache"
            );
            evaluator.set_cache_size(params.get_cache_size());
        }
        let local = HillClimbing::new(params.get_local_step())?;
        let engine = GeneticEngine::new(params)?;

        for table in population.tables_mut() {
            table.mark_dirty();
        }
        evaluate_dirty(&mut evaluator, population.tables_mut());
        population.sort();

        Ok(Self {
            evaluator,
            engine,
            local,
            population,
            rng,
            migration: None,
            convergence_log: None,
            best_seen: FITNESS_WORST,
            stagnant: 0,
        })
    }

    /// Connects this node to a migration ring.
    pub fn with_migration(mut self, channel: Box<dyn MigrationChannel + 'p>) -> Self {
        self.migration = Some(channel);
        self
    }

    /// Writes one [`GenerationReport`] line per generation to `writer`.
    pub fn with_convergence_log(mut self, writer: impl Write + 'p) -> Self {
        self.convergence_log = Some(Box::new(writer));
        self
    }

    /// Runs one generation and the bookkeeping around it.
    pub fn step(&mut self) -> Result<Status> {
        self.engine.new_generation(
            &mut self.population,
            &mut self.evaluator,
            &mut self.rng,
            self.migration.as_deref_mut(),
        )?;

        let generation = self.population.generation();
        let rank = self.best()?.rank();
        if rank < self.best_seen {
            debug!(generation, fitness = rank, "new best fitness");
            self.best_seen = rank;
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }

        let params = self.engine.params();
        if self.stagnant == params.get_local_threshold() {
            let best = &mut self.population.tables_mut()[0];
            if self.local.search(best, &mut self.evaluator) {
                info!(generation, fitness = best.rank(), "local search improved best table");
            }
        }

        let report = self.report()?;
        info!(
            generation,
            fitness = report.fitness,
            feasible = report.feasible,
            subtotals = ?report.subtotals,
            stagnant = self.stagnant,
            "generation finished"
        );
        if let Some(log) = self.convergence_log.as_mut() {
            writeln!(log, "{}", report)?;
        }

        let max_generations = params.get_max_generations();
        let status = if report.feasible && report.fitness == 0 {
            Status::Solved
        } else if report.feasible && self.stagnant > params.get_finish() {
            Status::Converged
        } else if max_generations > 0 && generation >= max_generations {
            Status::GenerationLimit
        } else {
            Status::Continue
        };
        Ok(status)
    }

    /// Runs generations until the search ends or `cancel` is raised. On
    /// cancellation or failure the population is written to `checkpoint`
    /// if a path is given.
    pub fn run(
        &mut self,
        cancel: Option<&AtomicBool>,
        checkpoint: Option<&Path>,
    ) -> Result<RunOutcome> {
        info!(
            generation = self.population.generation(),
            size = self.population.len(),
            "solver started"
        );

        let outcome = loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                if let Some(path) = checkpoint {
                    self.population.save_to_path(path)?;
                }
                break RunOutcome::Interrupted;
            }

            match self.step() {
                Ok(Status::Continue) => {}
                Ok(Status::Solved) => break RunOutcome::Solved,
                Ok(Status::Converged) => break RunOutcome::Converged,
                Ok(Status::GenerationLimit) => break RunOutcome::GenerationLimit,
                Err(e) => {
                    error!("generation failed: {}", e);
                    if let Some(path) = checkpoint {
                        if let Err(save) = self.population.save_to_path(path) {
                            error!("checkpoint failed: {}", save);
                        }
                    }
                    return Err(e);
                }
            }
        };

        self.evaluator.log_cache_stats();
        let report = self.report()?;
        info!(
            ?outcome,
            generation = report.generation,
            fitness = report.fitness,
            feasible = report.feasible,
            "solver finished"
        );
        Ok(outcome)
    }

    pub fn best(&self) -> Result<&Table> {
        self.population
            .best()
            .ok_or_else_solver(|| SolverError::EmptyPopulation)
    }

    pub fn report(&self) -> Result<GenerationReport> {
        Ok(GenerationReport::of(self.population.generation(), self.best()?))
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn evaluator(&self) -> &Evaluator<'p> {
        &self.evaluator
    }

    /// Generations since the best fitness last improved.
    pub fn stagnant_generations(&self) -> usize {
        self.stagnant
    }

    pub fn into_population(self) -> Population {
        self.population
    }
}

impl fmt::Debug for Solver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("engine", &self.engine)
            .field("generation", &self.population.generation())
            .field("best_seen", &self.best_seen)
            .field("stagnant", &self.stagnant)
            .field("migration", &self.migration.is_some())
            .finish()
    }
}
