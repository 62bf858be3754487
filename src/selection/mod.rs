//! # Selection
//!
//! Parent selection for crossover.

pub mod tournament;

pub use tournament::TournamentSelection;
