//! Core of a constraint-driven genetic timetabling solver.
//!
//! A timetable is a set of events (tuples) that each need one resource of
//! every resource type. Constant resources are fixed by the problem, the
//! variable ones are searched for by a genetic algorithm that minimises the
//! weighted sum of errors reported by registered fitness functions.
//!
//! ```
//! use tablix_core::evolution::{GeneticParams, RunOutcome, Solver};
//! use tablix_core::fitness::{Evaluator, FitnessContext};
//! use tablix_core::model::{ProblemBuilder, ResourceKind};
//! use tablix_core::rng::RandomNumberGenerator;
//!
//! let mut builder = ProblemBuilder::new();
//! let time = builder.restype_new("time", ResourceKind::Variable).unwrap();
//! builder.res_new_matrix(time, 1, 5).unwrap();
//! builder.tuple_new("math").unwrap();
//! builder.tuple_new("physics").unwrap();
//! let problem = builder.build().unwrap();
//!
//! let mut evaluator = Evaluator::new(&problem, 16);
//! let clash = evaluator
//!     .fitness_new("clash", 100, true, |ctx: &FitnessContext<'_>| {
//!         let genes = ctx.chromosome(0).genes();
//!         u32::from(genes[0] == genes[1])
//!     })
//!     .unwrap();
//! evaluator.request_chromosome(clash, time).unwrap();
//!
//! let params = GeneticParams::builder().population_size(10).max_generations(100).build();
//! let mut solver = Solver::new(evaluator, params, RandomNumberGenerator::from_seed(1)).unwrap();
//! assert_eq!(solver.run(None, None).unwrap(), RunOutcome::Solved);
//! ```

pub mod chromosome;
pub mod depend;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod model;
pub mod plugin;
pub mod rng;
pub mod selection;

// Re-export commonly used types for convenience
pub use chromosome::{Population, Table};
pub use error::{OptionExt, Result, ResultExt, SolverError};
pub use evolution::{GeneticParams, RunOutcome, Solver};
pub use fitness::Evaluator;
pub use model::{Problem, ProblemBuilder};
