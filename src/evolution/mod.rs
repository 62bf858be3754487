pub mod genetic;
pub mod launcher;
pub mod local_search;
pub mod migration;
pub mod options;

pub use genetic::GeneticEngine;
pub use launcher::{GenerationReport, RunOutcome, Solver, Status};
pub use local_search::{HillClimbing, LocalSearch};
pub use migration::{ChannelMigration, MigrationChannel};
pub use options::{GeneticParams, GeneticParamsBuilder};
