//! # Chromosomes and Populations
//!
//! Storage for candidate solutions. A [`Table`] holds one [`Chromosome`]
//! per resource type; a [`Population`] holds the tables of one node and can
//! be checkpointed to plain text and resumed.

mod checkpoint;
pub mod population;
pub mod table;

pub use population::Population;
pub use table::{Chromosome, Table, FITNESS_WORST};
