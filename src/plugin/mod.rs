//! # Plugin Contract
//!
//! Restriction handlers, precalc callbacks and module options. External
//! modules register handlers by restriction name; the configuration loader
//! calls them for every restriction it reads. A restriction nobody handles
//! is only a warning, a handler that fails is fatal.

pub mod options;
pub mod registry;

pub use options::{ModuleOption, ModuleOptions};
pub use registry::{PluginRegistry, Precalc, ResourceHandler, RestrictionOutcome, TupleHandler};
