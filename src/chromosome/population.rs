//! The population of one node.

use tracing::{debug, warn};

use crate::error::{OptionExt, Result, SolverError};
use crate::model::Problem;
use crate::rng::RandomNumberGenerator;

use super::Table;

/// Ordered collection of tables plus the generation counter. After every
/// generation the tables are sorted ascending by fitness.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    tables: Vec<Table>,
    generation: u64,
}

impl Population {
    /// Allocates `size` tables against `problem`. Constant genes are copied
    /// from the tuples; variable genes are left at 0 until
    /// [`rand`](Self::rand) or [`hint`](Self::hint) is called.
    pub fn init(problem: &Problem, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(SolverError::EmptyPopulation);
        }

        let template = Table::new(problem)?;
        let mut tables = Vec::new();
        tables
            .try_reserve_exact(size)
            .map_err(|e| SolverError::Allocation(format!("population of {}: {}", size, e)))?;
        tables.resize(size, template);

        Ok(Self {
            tables,
            generation: 0,
        })
    }

    pub(crate) fn from_tables(tables: Vec<Table>, generation: u64) -> Self {
        Self { tables, generation }
    }

    /// Checks every table of a resumed population against `problem`:
    /// shape, constant genes and domain membership of variable genes.
    pub fn validate(&self, problem: &Problem) -> Result<()> {
        if self.tables.is_empty() {
            return Err(SolverError::EmptyPopulation);
        }
        for (n, table) in self.tables.iter().enumerate() {
            check_domains(problem, table)
                .map_err(|msg| SolverError::Resume(format!("table {}: {}", n, msg)))?;
        }
        Ok(())
    }

    /// Draws every variable gene uniformly from its tuple's domain and marks
    /// all tables dirty.
    pub fn rand(&mut self, problem: &Problem, rng: &mut RandomNumberGenerator) -> Result<()> {
        for table in &mut self.tables {
            for &type_id in problem.variable_types() {
                for tuple in problem.tuples() {
                    let value = problem
                        .tuple_domain(tuple.id(), type_id)
                        .rand(rng)
                        .ok_or_else_solver(|| {
                            SolverError::Setup(format!(
                                "tuple '{}' has an empty domain",
                                tuple.name()
                            ))
                        })?;
                    table.set_gene(type_id, tuple.id(), value);
                }
            }
            table.mark_dirty();
        }
        Ok(())
    }

    /// Seeds variable genes from the hints stored on the tuples. Each table
    /// is hinted with probability `pct` percent. Hints outside the tuple's
    /// domain are ignored with a warning. Returns the number of hinted tables.
    pub fn hint(&mut self, problem: &Problem, pct: u32, rng: &mut RandomNumberGenerator) -> usize {
        let mut hints = Vec::new();
        for &type_id in problem.variable_types() {
            for tuple in problem.tuples() {
                let Some(value) = tuple.resource(type_id) else {
                    continue;
                };
                if problem.tuple_domain(tuple.id(), type_id).contains(value) {
                    hints.push((type_id, tuple.id(), value));
                } else {
                    warn!(
                        tuple = tuple.name(),
                        resource_type = problem.resource_type(type_id).name(),
                        value,
                        "hint not in domain, ignoring"
                    );
                }
            }
        }

        if hints.is_empty() {
            return 0;
        }

        let mut hinted = 0;
        for table in &mut self.tables {
            if rng.percent() >= pct {
                continue;
            }
            for &(type_id, tuple, value) in &hints {
                table.set_gene(type_id, tuple, value);
            }
            hinted += 1;
        }

        debug!(hinted, size = self.tables.len(), "population seeded from hints");
        hinted
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut [Table] {
        &mut self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Best table. Only meaningful after [`sort`](Self::sort).
    pub fn best(&self) -> Option<&Table> {
        self.tables.first()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Stable ascending sort by fitness; dirty tables go last.
    pub fn sort(&mut self) {
        self.tables.sort_by_key(Table::rank);
    }

    /// Clones the best `count` tables for migration to another node.
    pub fn emigrants(&self, count: usize) -> Vec<Table> {
        self.tables.iter().take(count).cloned().collect()
    }

    /// Overwrites the worst tables with received individuals. Tables that do
    /// not fit the model or hold genes outside their domains are dropped with
    /// a warning. Accepted tables are marked dirty. Returns the number of
    /// tables accepted.
    pub fn immigrate(&mut self, problem: &Problem, immigrants: Vec<Table>) -> usize {
        let mut slot = self.tables.len();
        let mut accepted = 0;

        for table in immigrants {
            if slot == 0 {
                break;
            }
            if let Err(msg) = check_domains(problem, &table) {
                warn!("rejecting immigrant: {}", msg);
                continue;
            }
            slot -= 1;
            self.tables[slot] = table;
            self.tables[slot].mark_dirty();
            accepted += 1;
        }

        debug!(accepted, "immigrants merged");
        accepted
    }
}

fn check_domains(problem: &Problem, table: &Table) -> std::result::Result<(), String> {
    table.validate(problem)?;
    for &type_id in problem.variable_types() {
        for tuple in problem.tuples() {
            let gene = table.gene(type_id, tuple.id());
            if !problem.tuple_domain(tuple.id(), type_id).contains(gene) {
                return Err(format!(
                    "tuple '{}' has illegal resource {} for type '{}'",
                    tuple.name(),
                    gene,
                    problem.resource_type(type_id).name()
                ));
            }
        }
    }
    Ok(())
}
