//! # Local Search
//!
//! Refinement applied to the best table when the genetic search stagnates.

use std::fmt::Debug;

use tracing::debug;

use crate::chromosome::Table;
use crate::error::{Result, SolverError};
use crate::fitness::Evaluator;

/// Improves a single table in place.
pub trait LocalSearch: Debug + Send + Sync {
    /// Returns `true` if the fitness of `table` was lowered. The table is
    /// left evaluated either way.
    fn search(&self, table: &mut Table, evaluator: &mut Evaluator<'_>) -> bool;
}

/// Best-improvement hill climbing over single genes.
///
/// Every sweep tries moving each independent variable gene by `+step` and
/// `-step` and applies the single best improving move. When a sweep finds
/// nothing the step is halved, and the search stops once a sweep with step
/// 1 finds nothing.
#[derive(Debug, Clone)]
pub struct HillClimbing {
    initial_step: usize,
}

impl HillClimbing {
    /// # Errors
    ///
    /// Returns an error if `initial_step` is 0.
    pub fn new(initial_step: usize) -> Result<Self> {
        if initial_step == 0 {
            return Err(SolverError::Configuration(
                "local search step must be greater than 0".to_string(),
            ));
        }
        Ok(Self { initial_step })
    }

    pub fn initial_step(&self) -> usize {
        self.initial_step
    }
}

struct Move {
    type_id: usize,
    tuple: usize,
    value: usize,
    fitness: u64,
}

fn evaluate(table: &mut Table, evaluator: &mut Evaluator<'_>) -> u64 {
    evaluator.problem().updater_call_all(table);
    evaluator.table_fitness(table);
    table.rank()
}

impl LocalSearch for HillClimbing {
    fn search(&self, table: &mut Table, evaluator: &mut Evaluator<'_>) -> bool {
        let problem = evaluator.problem();
        let initial = evaluate(table, evaluator);
        let mut current = initial;
        let mut step = self.initial_step;
        let mut moves = 0usize;

        loop {
            let mut best: Option<Move> = None;

            for &type_id in problem.variable_types() {
                let resources = problem.resource_type(type_id).len();
                for tuple in problem.tuples().iter().filter(|t| !t.is_dependent(type_id)) {
                    let id = tuple.id();
                    let old = table.gene(type_id, id);
                    let domain = problem.tuple_domain(id, type_id);
                    let candidates = [old.checked_add(step), old.checked_sub(step)];

                    for value in candidates.into_iter().flatten() {
                        if value >= resources || !domain.contains(value) {
                            continue;
                        }
                        table.set_gene(type_id, id, value);
                        let fitness = evaluate(table, evaluator);
                        let bar = best.as_ref().map_or(current, |m| m.fitness);
                        if fitness < bar {
                            best = Some(Move {
                                type_id,
                                tuple: id,
                                value,
                                fitness,
                            });
                        }
                        table.set_gene(type_id, id, old);
                    }
                }
            }

            match best {
                Some(m) => {
                    table.set_gene(m.type_id, m.tuple, m.value);
                    current = m.fitness;
                    moves += 1;
                }
                None if step == 1 => break,
                None => {
                    step = (step / 2).max(1);
                    debug!(step, fitness = current, "local search step lowered");
                }
            }
        }

        let last = evaluate(table, evaluator);
        debug!(from = initial, to = last, moves, "local search finished");
        last < initial
    }
}
