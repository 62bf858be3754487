//! # Error Types
//!
//! Errors raised by the solver core. Every variant carries a message naming
//! the offending tuple, resource, restriction or file so that a failed setup
//! can be traced back to its input.
//!
//! Setup and dependency errors are fatal: the model cannot be solved as
//! specified and no recovery is attempted. Unknown restrictions are not
//! errors at all; they are logged as warnings by the plugin registry.
//!
//! ## Examples
//!
//! ```rust
//! use tablix_core::error::{OptionExt, Result, SolverError};
//!
//! fn best(fitness: &[u64]) -> Result<u64> {
//!     fitness.iter().min().copied().ok_or_else_solver(|| SolverError::EmptyPopulation)
//! }
//!
//! assert!(best(&[]).is_err());
//! assert_eq!(best(&[3, 1, 2]).unwrap(), 1);
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while building a problem or running the solver.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Duplicate resource or type, unknown resource reference, malformed
    /// dimensions, or a domain emptied to nothing.
    #[error("Setup error: {0}")]
    Setup(String),

    /// An updater target already has an updater for the type, or the
    /// updater graph contains a cycle.
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// Memory for tables or populations could not be reserved.
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// A restriction handler, precalc callback or fitness registration failed.
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// A checkpoint does not match the current model.
    #[error("Resume error: {0}")]
    Resume(String),

    /// Invalid genetic parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Extension trait for Result to add context to foreign errors.
///
/// ```rust
/// use tablix_core::error::ResultExt;
///
/// fn parse(text: &str) -> tablix_core::error::Result<u32> {
///     text.parse::<u32>().context("Failed to parse generation counter")
/// }
///
/// assert!(parse("x").is_err());
/// ```
pub trait ResultExt<T, E> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| SolverError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, SolverError>` using a closure
    /// to generate the error.
    fn ok_or_else_solver<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> SolverError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_solver<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> SolverError,
    {
        self.ok_or_else(err_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_class() {
        let err = SolverError::Setup("resource type 'room' already exists".to_string());
        assert_eq!(
            err.to_string(),
            "Setup error: resource type 'room' already exists"
        );

        let err = SolverError::Dependency("cycle".to_string());
        assert!(err.to_string().starts_with("Dependency error"));
    }

    #[test]
    fn test_io_conversion() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(SolverError::Io(_))));
    }

    #[test]
    fn test_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = res.context("writing checkpoint").unwrap_err();
        assert_eq!(err.to_string(), "writing checkpoint: boom");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<u32> = None;
        assert!(matches!(
            none.ok_or_else_solver(|| SolverError::EmptyPopulation),
            Err(SolverError::EmptyPopulation)
        ));
        assert_eq!(Some(4).ok_or_else_solver(|| SolverError::EmptyPopulation).unwrap(), 4);
    }
}
