//! # Problem Model
//!
//! Resource types, resources, tuples and domains. A [`ProblemBuilder`]
//! collects them during the setup phase; [`ProblemBuilder::build`] resolves
//! updater dependencies, compacts domains and conflicts, and freezes the
//! result into a read-only [`Problem`] shared by every table and fitness
//! evaluation of a node.
//!
//! All entities are addressed by dense integer ids assigned in creation
//! order.

mod builder;
mod domain;
mod problem;
mod resource;
mod tuple;

pub use builder::ProblemBuilder;
pub use domain::Domain;
pub use problem::Problem;
pub use resource::{Resource, ResourceKind, ResourceType};
pub use tuple::Tuple;

/// Index of a resource type.
pub type ResourceTypeId = usize;
/// Index of a resource within its type.
pub type ResourceId = usize;
/// Index of a tuple.
pub type TupleId = usize;
/// Index of a domain in the problem's domain arena.
pub type DomainId = usize;
