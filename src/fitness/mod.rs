//! # Fitness Framework
//!
//! Fitness functions are registered with a name, a positive weight and a
//! mandatory flag, and declare which chromosomes, [`Extension`]s and
//! [`Lookup`]s they read. Before every evaluation the evaluator rebuilds the
//! requested views from the table, calls every function in registration
//! order and stores the weighted results on the table.
//!
//! Fitness functions must be pure: the same genes must always yield the
//! same violation count. The [`FitnessCache`] relies on this.
//!
//! ```rust
//! use tablix_core::fitness::{Evaluator, FitnessContext};
//! use tablix_core::chromosome::Table;
//! use tablix_core::model::{ProblemBuilder, ResourceKind};
//!
//! let mut b = ProblemBuilder::new();
//! let time = b.restype_new("time", ResourceKind::Variable)?;
//! b.res_new_matrix(time, 1, 4)?;
//! b.tuple_new("a")?;
//! b.tuple_new("b")?;
//! let problem = b.build()?;
//!
//! let mut evaluator = Evaluator::new(&problem, 4);
//! let clash = evaluator.fitness_new("clash", 10, true, |ctx: &FitnessContext<'_>| {
//!     let slots = ctx.lookup(0);
//!     (0..slots.resource_count())
//!         .map(|r| slots.tuples(r).len().saturating_sub(1) as u32)
//!         .sum()
//! })?;
//! evaluator.request_lookup(clash, time)?;
//!
//! let mut table = Table::new(&problem)?;
//! evaluator.table_fitness(&mut table);
//! assert_eq!(table.fitness(), Some(10));
//! assert!(!table.is_feasible());
//! # Ok::<(), tablix_core::error::SolverError>(())
//! ```

pub mod cache;
pub mod views;

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::chromosome::{Chromosome, Table};
use crate::error::{Result, SolverError};
use crate::model::{Problem, ResourceTypeId};

pub use cache::{CacheStats, FitnessCache};
pub use views::{Extension, Lookup, OutputExtension};

/// A pure evaluation returning the number of violations in a table.
pub trait FitnessFunction: Send + Sync {
    fn evaluate(&self, ctx: &FitnessContext<'_>) -> u32;
}

impl<F> FitnessFunction for F
where
    F: Fn(&FitnessContext<'_>) -> u32 + Send + Sync,
{
    fn evaluate(&self, ctx: &FitnessContext<'_>) -> u32 {
        self(ctx)
    }
}

/// Handle returned by [`Evaluator::fitness_new`].
pub type FitnessId = usize;

/// What a fitness function sees. Chromosomes, extensions and lookups are
/// indexed in the order the function requested them.
pub struct FitnessContext<'a> {
    problem: &'a Problem,
    table: &'a Table,
    chromosome_types: &'a [ResourceTypeId],
    extension_ids: &'a [usize],
    lookup_ids: &'a [usize],
    extensions: &'a [Extension],
    lookups: &'a [Lookup],
}

impl<'a> FitnessContext<'a> {
    pub fn problem(&self) -> &'a Problem {
        self.problem
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn chromosome(&self, n: usize) -> &'a Chromosome {
        self.table.chromosome(self.chromosome_types[n])
    }

    pub fn chromosome_count(&self) -> usize {
        self.chromosome_types.len()
    }

    pub fn extension(&self, n: usize) -> &'a Extension {
        &self.extensions[self.extension_ids[n]]
    }

    pub fn extension_count(&self) -> usize {
        self.extension_ids.len()
    }

    pub fn lookup(&self, n: usize) -> &'a Lookup {
        &self.lookups[self.lookup_ids[n]]
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_ids.len()
    }
}

/// Public description of a registered fitness function.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitnessInfo {
    pub name: String,
    pub weight: u32,
    pub mandatory: bool,
}

#[derive(Clone)]
struct FitnessEntry {
    info: FitnessInfo,
    func: Arc<dyn FitnessFunction>,
    chromosome_types: Vec<ResourceTypeId>,
    extension_ids: Vec<usize>,
    lookup_ids: Vec<usize>,
}

impl fmt::Debug for FitnessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessEntry")
            .field("info", &self.info)
            .field("chromosome_types", &self.chromosome_types)
            .field("extension_ids", &self.extension_ids)
            .field("lookup_ids", &self.lookup_ids)
            .finish_non_exhaustive()
    }
}

/// Registry of fitness functions plus the shared views and the cache.
#[derive(Debug, Clone)]
pub struct Evaluator<'p> {
    problem: &'p Problem,
    functions: Vec<FitnessEntry>,
    extensions: Vec<Extension>,
    lookups: Vec<Lookup>,
    cache: FitnessCache,
    subtotals: Vec<u64>,
}

impl<'p> Evaluator<'p> {
    /// Creates an evaluator with a cache of `cache_size` slots (0 disables it).
    pub fn new(problem: &'p Problem, cache_size: usize) -> Self {
        Self {
            problem,
            functions: Vec::new(),
            extensions: Vec::new(),
            lookups: Vec::new(),
            cache: FitnessCache::new(cache_size),
            subtotals: Vec::new(),
        }
    }

    pub fn problem(&self) -> &'p Problem {
        self.problem
    }

    /// Replaces the cache by an empty one of `size` slots. Counters restart.
    pub(crate) fn set_cache_size(&mut self, size: usize) {
        self.cache = FitnessCache::new(size);
    }

    /// Registers a fitness function. Weight must be positive.
    pub fn fitness_new<F>(
        &mut self,
        name: &str,
        weight: u32,
        mandatory: bool,
        func: F,
    ) -> Result<FitnessId>
    where
        F: Fn(&FitnessContext<'_>) -> u32 + Send + Sync + 'static,
    {
        self.fitness_register(name, weight, mandatory, Arc::new(func))
    }

    /// Registers an already boxed fitness function.
    pub fn fitness_register(
        &mut self,
        name: &str,
        weight: u32,
        mandatory: bool,
        func: Arc<dyn FitnessFunction>,
    ) -> Result<FitnessId> {
        if weight == 0 {
            return Err(SolverError::Plugin(format!(
                "fitness function '{}' must have a positive weight",
                name
            )));
        }
        self.functions.push(FitnessEntry {
            info: FitnessInfo {
                name: name.to_string(),
                weight,
                mandatory,
            },
            func,
            chromosome_types: Vec::new(),
            extension_ids: Vec::new(),
            lookup_ids: Vec::new(),
        });
        Ok(self.functions.len() - 1)
    }

    /// Declares that `fitness` reads the chromosome of `type_id`.
    pub fn request_chromosome(&mut self, fitness: FitnessId, type_id: ResourceTypeId) -> Result<()> {
        self.check_type(type_id)?;
        self.entry_mut(fitness)?.chromosome_types.push(type_id);
        Ok(())
    }

    /// Declares that `fitness` reads the extension of constant type `con`
    /// over variable type `var`. Identical extensions are shared between
    /// functions.
    pub fn request_extension(
        &mut self,
        fitness: FitnessId,
        con: ResourceTypeId,
        var: ResourceTypeId,
    ) -> Result<()> {
        self.check_type(con)?;
        self.check_type(var)?;
        let name = &self.entry(fitness)?.info.name;
        if con == var {
            return Err(SolverError::Plugin(format!(
                "fitness function '{}' requested an extension of type '{}' over itself",
                name,
                self.problem.resource_type(con).name()
            )));
        }

        let id = match self
            .extensions
            .iter()
            .position(|e| e.con_type() == con && e.var_type() == var)
        {
            Some(id) => id,
            None => {
                self.extensions.push(Extension::new(self.problem, con, var));
                self.extensions.len() - 1
            }
        };
        self.functions[fitness].extension_ids.push(id);
        Ok(())
    }

    /// Declares that `fitness` reads the lookup of variable type `var`.
    pub fn request_lookup(&mut self, fitness: FitnessId, var: ResourceTypeId) -> Result<()> {
        self.check_type(var)?;
        self.entry(fitness)?;

        let id = match self.lookups.iter().position(|l| l.var_type() == var) {
            Some(id) => id,
            None => {
                self.lookups.push(Lookup::new(self.problem, var));
                self.lookups.len() - 1
            }
        };
        self.functions[fitness].lookup_ids.push(id);
        Ok(())
    }

    /// Registered functions, in evaluation order.
    pub fn functions(&self) -> impl Iterator<Item = &FitnessInfo> + '_ {
        self.functions.iter().map(|f| &f.info)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn cache(&self) -> &FitnessCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Evaluates `table` from scratch and stores fitness, feasibility and
    /// subtotals on it.
    pub fn table_fitness(&mut self, table: &mut Table) {
        let problem = self.problem;
        for ext in &mut self.extensions {
            ext.update(problem, table);
        }
        for lookup in &mut self.lookups {
            lookup.update(table);
        }

        self.subtotals.clear();
        let mut total: u64 = 0;
        let mut feasible = true;
        let view: &Table = table;

        for entry in &self.functions {
            let ctx = FitnessContext {
                problem,
                table: view,
                chromosome_types: &entry.chromosome_types,
                extension_ids: &entry.extension_ids,
                lookup_ids: &entry.lookup_ids,
                extensions: &self.extensions,
                lookups: &self.lookups,
            };
            let count = u64::from(entry.func.evaluate(&ctx));
            let weighted = count.saturating_mul(u64::from(entry.info.weight));

            if entry.info.mandatory && count > 0 {
                feasible = false;
            }
            self.subtotals.push(weighted);
            total = total.saturating_add(weighted);
        }

        table.set_evaluation(total, feasible, &self.subtotals);
    }

    /// Like [`table_fitness`](Self::table_fitness) but answers from the
    /// cache when an identical variable gene pattern was seen recently.
    pub fn cache_table_fitness(&mut self, table: &mut Table) {
        if !self.cache.is_enabled() {
            self.table_fitness(table);
            return;
        }
        let variable_types = self.problem.variable_types();
        if self.cache.lookup(variable_types, table) {
            return;
        }
        self.table_fitness(table);
        self.cache.store(variable_types, table);
    }

    /// Logs the cache counters.
    pub fn log_cache_stats(&self) {
        let stats = self.cache.stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            ratio = stats.hit_ratio(),
            "fitness cache statistics"
        );
    }

    fn check_type(&self, type_id: ResourceTypeId) -> Result<()> {
        if type_id >= self.problem.type_count() {
            return Err(SolverError::Plugin(format!(
                "unknown resource type {}",
                type_id
            )));
        }
        Ok(())
    }

    fn entry(&self, fitness: FitnessId) -> Result<&FitnessEntry> {
        self.functions
            .get(fitness)
            .ok_or_else(|| SolverError::Plugin(format!("unknown fitness function {}", fitness)))
    }

    fn entry_mut(&mut self, fitness: FitnessId) -> Result<&mut FitnessEntry> {
        self.functions
            .get_mut(fitness)
            .ok_or_else(|| SolverError::Plugin(format!("unknown fitness function {}", fitness)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProblemBuilder, ResourceKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn problem() -> Problem {
        let mut b = ProblemBuilder::new();
        let room = b.restype_new("room", ResourceKind::Constant).unwrap();
        let time = b.restype_new("time", ResourceKind::Variable).unwrap();
        b.res_new(room, "hall").unwrap();
        b.res_new(room, "lab").unwrap();
        b.res_new_matrix(time, 1, 4).unwrap();
        for (n, r) in [0, 0, 1].into_iter().enumerate() {
            let t = b.tuple_new(&format!("e{}", n)).unwrap();
            b.tuple_set(t, room, r).unwrap();
        }
        b.build().unwrap()
    }

    fn table(p: &Problem, times: [usize; 3]) -> Table {
        let mut t = Table::new(p).unwrap();
        for (tuple, time) in times.into_iter().enumerate() {
            t.set_gene(1, tuple, time);
        }
        t
    }

    /// Counts tuples sharing a room and a time with a lower-numbered tuple.
    fn room_clashes(ctx: &FitnessContext<'_>) -> u32 {
        let ext = ctx.extension(0);
        let rooms = ctx.chromosome(0);
        let times = ctx.chromosome(1);
        (0..rooms.len())
            .filter(|&t| ext.get(times.gene(t), rooms.gene(t)) != Some(t))
            .count() as u32
    }

    /// Counts tuples placed in time slot 3.
    fn late(ctx: &FitnessContext<'_>) -> u32 {
        ctx.lookup(0).tuples(3).len() as u32
    }

    fn evaluator(p: &Problem, cache: usize) -> Evaluator<'_> {
        let mut ev = Evaluator::new(p, cache);
        let clash = ev.fitness_new("clash", 100, true, room_clashes).unwrap();
        ev.request_chromosome(clash, 0).unwrap();
        ev.request_chromosome(clash, 1).unwrap();
        ev.request_extension(clash, 0, 1).unwrap();
        let late_id = ev.fitness_new("late", 3, false, late).unwrap();
        ev.request_lookup(late_id, 1).unwrap();
        ev
    }

    #[test]
    fn test_registration_errors() {
        let p = problem();
        let mut ev = Evaluator::new(&p, 0);
        assert!(ev.fitness_new("zero", 0, false, late).is_err());
        let id = ev.fitness_new("late", 1, false, late).unwrap();
        assert!(ev.request_extension(id, 1, 1).is_err());
        assert!(ev.request_extension(id, 0, 5).is_err());
        assert!(ev.request_lookup(id + 1, 1).is_err());
        assert!(ev.request_chromosome(id, 2).is_err());
    }

    #[test]
    fn test_views_are_shared() {
        let p = problem();
        let mut ev = evaluator(&p, 0);
        let other = ev.fitness_new("late again", 1, false, late).unwrap();
        ev.request_lookup(other, 1).unwrap();
        ev.request_extension(other, 0, 1).unwrap();
        assert_eq!(ev.lookups.len(), 1);
        assert_eq!(ev.extensions.len(), 1);

        let names: Vec<&str> = ev.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["clash", "late", "late again"]);
    }

    #[test]
    fn test_weights_and_feasibility() {
        let p = problem();
        let mut ev = evaluator(&p, 0);

        let mut good = table(&p, [0, 1, 0]);
        ev.table_fitness(&mut good);
        assert_eq!(good.fitness(), Some(0));
        assert!(good.is_feasible());
        assert_eq!(good.subtotals(), &[0, 0]);

        // e0 and e1 share the hall at time 0; e2 is late.
        let mut bad = table(&p, [0, 0, 3]);
        ev.table_fitness(&mut bad);
        assert_eq!(bad.subtotals(), &[100, 3]);
        assert_eq!(bad.fitness(), Some(103));
        assert!(!bad.is_feasible());

        // Optional violations alone keep the table feasible.
        let mut late_only = table(&p, [3, 1, 3]);
        ev.table_fitness(&mut late_only);
        assert_eq!(late_only.fitness(), Some(6));
        assert!(late_only.is_feasible());
    }

    #[test]
    fn test_table_fitness_is_repeatable() {
        let p = problem();
        let mut ev = evaluator(&p, 0);
        let mut t = table(&p, [2, 2, 3]);
        ev.table_fitness(&mut t);
        let first = t.clone();
        ev.table_fitness(&mut table(&p, [0, 1, 2]));
        ev.table_fitness(&mut t);
        assert_eq!(t, first);
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let p = problem();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut ev = Evaluator::new(&p, 2);
        let id = ev
            .fitness_new("late", 1, false, move |ctx: &FitnessContext<'_>| {
                counter.fetch_add(1, Ordering::SeqCst);
                late(ctx)
            })
            .unwrap();
        ev.request_lookup(id, 1).unwrap();

        for _ in 0..3 {
            let mut t = table(&p, [3, 1, 3]);
            ev.cache_table_fitness(&mut t);
            assert_eq!(t.fitness(), Some(2));
        }
        assert_eq!(ev.cache_stats(), CacheStats { hits: 2, misses: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_is_fifo() {
        let p = problem();
        let mut ev = evaluator(&p, 2);
        for times in [[0, 1, 0], [1, 2, 3], [2, 2, 2]] {
            ev.cache_table_fitness(&mut table(&p, times));
        }
        assert_eq!(ev.cache_stats().misses, 3);

        // The first pattern was evicted, the last two are still there.
        ev.cache_table_fitness(&mut table(&p, [2, 2, 2]));
        ev.cache_table_fitness(&mut table(&p, [1, 2, 3]));
        assert_eq!(ev.cache_stats().hits, 2);
        ev.cache_table_fitness(&mut table(&p, [0, 1, 0]));
        assert_eq!(ev.cache_stats().misses, 4);
    }

    #[test]
    fn test_cached_result_equals_fresh_result() {
        let p = problem();
        let mut cached = evaluator(&p, 4);
        let mut fresh = evaluator(&p, 0);

        for times in [[0, 0, 3], [0, 0, 3], [1, 2, 3], [0, 0, 3]] {
            let mut a = table(&p, times);
            let mut b = table(&p, times);
            cached.cache_table_fitness(&mut a);
            fresh.table_fitness(&mut b);
            assert_eq!(a.fitness(), b.fitness());
            assert_eq!(a.subtotals(), b.subtotals());
            assert_eq!(a.is_feasible(), b.is_feasible());
        }
        assert_eq!(cached.cache_stats().hits, 2);
        assert!(!fresh.cache().is_enabled());
    }

    #[test]
    fn test_disabled_cache_counts_nothing() {
        let p = problem();
        let mut ev = evaluator(&p, 0);
        ev.cache_table_fitness(&mut table(&p, [0, 1, 2]));
        assert_eq!(ev.cache_stats(), CacheStats::default());
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
