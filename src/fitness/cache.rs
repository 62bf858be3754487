//! Fitness result cache.
//!
//! A fixed ring of slots holding the variable genes of recently evaluated
//! tables together with their result. Lookup is a linear scan for an
//! identical gene pattern; new results overwrite the oldest slot (strict
//! FIFO). Sound only because fitness functions are pure.

use crate::chromosome::Table;
use crate::model::{ResourceId, ResourceTypeId};

/// Hit and miss counters of a [`FitnessCache`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    genes: Vec<Vec<ResourceId>>,
    fitness: u64,
    feasible: bool,
    subtotals: Vec<u64>,
}

impl CacheEntry {
    fn matches(&self, variable_types: &[ResourceTypeId], table: &Table) -> bool {
        variable_types
            .iter()
            .zip(&self.genes)
            .all(|(&t, genes)| table.chromosome(t).genes() == genes.as_slice())
    }
}

#[derive(Debug, Clone)]
pub struct FitnessCache {
    slots: Vec<Option<CacheEntry>>,
    next: usize,
    stats: CacheStats,
}

impl FitnessCache {
    /// Creates a cache with `size` slots. A size of 0 disables caching.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            next: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_enabled(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Empties every slot. Counters are kept.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.next = 0;
    }

    /// Copies a cached result into `table` if its variable genes were seen.
    /// Returns whether it was a hit.
    pub(crate) fn lookup(&mut self, variable_types: &[ResourceTypeId], table: &mut Table) -> bool {
        let found = self
            .slots
            .iter()
            .flatten()
            .find(|entry| entry.matches(variable_types, table));

        match found {
            Some(entry) => {
                table.set_evaluation(entry.fitness, entry.feasible, &entry.subtotals);
                self.stats.hits += 1;
                true
            }
            None => {
                self.stats.misses += 1;
                false
            }
        }
    }

    /// Stores the result of an evaluated `table` in the oldest slot.
    pub(crate) fn store(&mut self, variable_types: &[ResourceTypeId], table: &Table) {
        if self.slots.is_empty() {
            return;
        }
        let Some(fitness) = table.fitness() else {
            return;
        };

        let slot = &mut self.slots[self.next];
        match slot {
            Some(entry) => {
                for (genes, &t) in entry.genes.iter_mut().zip(variable_types) {
                    genes.clear();
                    genes.extend_from_slice(table.chromosome(t).genes());
                }
                entry.fitness = fitness;
                entry.feasible = table.is_feasible();
                entry.subtotals.clear();
                entry.subtotals.extend_from_slice(table.subtotals());
            }
            None => {
                *slot = Some(CacheEntry {
                    genes: variable_types
                        .iter()
                        .map(|&t| table.chromosome(t).genes().to_vec())
                        .collect(),
                    fitness,
                    feasible: table.is_feasible(),
                    subtotals: table.subtotals().to_vec(),
                });
            }
        }

        self.next = (self.next + 1) % self.slots.len();
    }
}
