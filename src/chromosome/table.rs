//! Candidate solutions.

use crate::error::{Result, SolverError};
use crate::model::{Problem, ResourceId, ResourceTypeId, TupleId};

/// Fitness given to individuals demoted by the anti-stagnation rule.
pub const FITNESS_WORST: u64 = u64::MAX;

/// Gene vector of one resource type, indexed by tuple id.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chromosome {
    type_id: ResourceTypeId,
    genes: Vec<ResourceId>,
}

impl Chromosome {
    pub(crate) fn zeroed(type_id: ResourceTypeId, len: usize) -> Result<Self> {
        let mut genes = Vec::new();
        genes.try_reserve_exact(len).map_err(|e| {
            SolverError::Allocation(format!(
                "chromosome of {} genes for type {}: {}",
                len, type_id, e
            ))
        })?;
        genes.resize(len, 0);
        Ok(Self { type_id, genes })
    }

    pub fn type_id(&self) -> ResourceTypeId {
        self.type_id
    }

    pub fn genes(&self) -> &[ResourceId] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut [ResourceId] {
        &mut self.genes
    }

    pub fn gene(&self, tuple: TupleId) -> ResourceId {
        self.genes[tuple]
    }

    pub fn set_gene(&mut self, tuple: TupleId, resource: ResourceId) {
        self.genes[tuple] = resource;
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// One individual: a chromosome per resource type plus its evaluation.
///
/// `fitness` is `None` while the table is dirty, i.e. its genes changed
/// since it was last evaluated.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    chromosomes: Vec<Chromosome>,
    fitness: Option<u64>,
    feasible: bool,
    subtotals: Vec<u64>,
}

impl Table {
    /// Allocates a table for `problem` with constant genes copied from the
    /// tuples and every variable gene set to resource 0.
    pub fn new(problem: &Problem) -> Result<Self> {
        let tuples = problem.tuple_count();
        let mut chromosomes = Vec::new();
        chromosomes
            .try_reserve_exact(problem.type_count())
            .map_err(|e| SolverError::Allocation(format!("table: {}", e)))?;

        for restype in problem.types() {
            let mut chromosome = Chromosome::zeroed(restype.id(), tuples)?;
            if !restype.is_variable() {
                for tuple in problem.tuples() {
                    if let Some(r) = tuple.resource(restype.id()) {
                        chromosome.set_gene(tuple.id(), r);
                    }
                }
            }
            chromosomes.push(chromosome);
        }

        Ok(Self::from_chromosomes(chromosomes))
    }

    pub(crate) fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self {
        Self {
            chromosomes,
            fitness: None,
            feasible: false,
            subtotals: Vec::new(),
        }
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn chromosome(&self, type_id: ResourceTypeId) -> &Chromosome {
        &self.chromosomes[type_id]
    }

    pub fn chromosome_mut(&mut self, type_id: ResourceTypeId) -> &mut Chromosome {
        &mut self.chromosomes[type_id]
    }

    pub fn gene(&self, type_id: ResourceTypeId, tuple: TupleId) -> ResourceId {
        self.chromosomes[type_id].gene(tuple)
    }

    /// Sets a gene and marks the table dirty.
    pub fn set_gene(&mut self, type_id: ResourceTypeId, tuple: TupleId, resource: ResourceId) {
        self.chromosomes[type_id].set_gene(tuple, resource);
        self.fitness = None;
    }

    pub fn type_count(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn tuple_count(&self) -> usize {
        self.chromosomes.first().map(Chromosome::len).unwrap_or(0)
    }

    /// Total weighted fitness, lower is better. `None` if not evaluated.
    pub fn fitness(&self) -> Option<u64> {
        self.fitness
    }

    /// Fitness used for ordering; dirty tables rank last.
    pub fn rank(&self) -> u64 {
        self.fitness.unwrap_or(FITNESS_WORST)
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// False if any mandatory fitness function reported a violation.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    /// Weighted violations per fitness function, in registration order.
    pub fn subtotals(&self) -> &[u64] {
        &self.subtotals
    }

    pub fn mark_dirty(&mut self) {
        self.fitness = None;
    }

    pub(crate) fn set_evaluation(&mut self, fitness: u64, feasible: bool, subtotals: &[u64]) {
        self.fitness = Some(fitness);
        self.feasible = feasible;
        self.subtotals.clear();
        self.subtotals.extend_from_slice(subtotals);
    }

    pub(crate) fn demote(&mut self) {
        self.fitness = Some(FITNESS_WORST);
    }

    /// Copies all genes from `other`. Both tables must have the same shape.
    pub(crate) fn copy_genes_from(&mut self, other: &Table) {
        for (dst, src) in self.chromosomes.iter_mut().zip(&other.chromosomes) {
            dst.genes.copy_from_slice(&src.genes);
        }
        self.fitness = None;
    }

    /// Checks shape and gene ranges against `problem`: constant genes must
    /// match the fixed resources, variable genes must be legal resource ids.
    pub fn validate(&self, problem: &Problem) -> std::result::Result<(), String> {
        if self.chromosomes.len() != problem.type_count() {
            return Err(format!(
                "table has {} resource types, problem has {}",
                self.chromosomes.len(),
                problem.type_count()
            ));
        }

        for (restype, chromosome) in problem.types().iter().zip(&self.chromosomes) {
            if chromosome.len() != problem.tuple_count() {
                return Err(format!(
                    "chromosome for type '{}' has {} genes, problem has {} tuples",
                    restype.name(),
                    chromosome.len(),
                    problem.tuple_count()
                ));
            }

            for tuple in problem.tuples() {
                let gene = chromosome.gene(tuple.id());
                if restype.is_variable() {
                    if gene >= restype.len() {
                        return Err(format!(
                            "tuple '{}' has resource {} of type '{}' which has only {} resources",
                            tuple.name(),
                            gene,
                            restype.name(),
                            restype.len()
                        ));
                    }
                } else if tuple.resource(restype.id()) != Some(gene) {
                    return Err(format!(
                        "tuple '{}' has constant resource {} of type '{}' which does not match the problem",
                        tuple.name(),
                        gene,
                        restype.name()
                    ));
                }
            }
        }

        Ok(())
    }
}
