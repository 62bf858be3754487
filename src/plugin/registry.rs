use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::{Result, SolverError};
use crate::model::{Problem, ProblemBuilder, ResourceId, ResourceTypeId, TupleId};

use super::ModuleOptions;

/// Handles a restriction attached to a tuple.
pub trait TupleHandler: Send + Sync {
    fn handle(
        &self,
        builder: &mut ProblemBuilder,
        restriction: &str,
        content: &str,
        tuple: TupleId,
    ) -> Result<()>;
}

impl<F> TupleHandler for F
where
    F: Fn(&mut ProblemBuilder, &str, &str, TupleId) -> Result<()> + Send + Sync,
{
    fn handle(
        &self,
        builder: &mut ProblemBuilder,
        restriction: &str,
        content: &str,
        tuple: TupleId,
    ) -> Result<()> {
        self(builder, restriction, content, tuple)
    }
}

/// Handles a restriction attached to a resource.
pub trait ResourceHandler: Send + Sync {
    fn handle(
        &self,
        builder: &mut ProblemBuilder,
        restriction: &str,
        content: &str,
        type_id: ResourceTypeId,
        resource: ResourceId,
    ) -> Result<()>;
}

impl<F> ResourceHandler for F
where
    F: Fn(&mut ProblemBuilder, &str, &str, ResourceTypeId, ResourceId) -> Result<()> + Send + Sync,
{
    fn handle(
        &self,
        builder: &mut ProblemBuilder,
        restriction: &str,
        content: &str,
        type_id: ResourceTypeId,
        resource: ResourceId,
    ) -> Result<()> {
        self(builder, restriction, content, type_id, resource)
    }
}

/// Runs once after every restriction was handled and before the problem
/// is built.
pub trait Precalc: Send + Sync {
    fn precalc(&self, builder: &ProblemBuilder, options: &ModuleOptions) -> Result<()>;
}

impl<F> Precalc for F
where
    F: Fn(&ProblemBuilder, &ModuleOptions) -> Result<()> + Send + Sync,
{
    fn precalc(&self, builder: &ProblemBuilder, options: &ModuleOptions) -> Result<()> {
        self(builder, options)
    }
}

/// Result of dispatching a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionOutcome {
    /// At least one handler accepted the restriction.
    Handled,
    /// No handler is registered for it.
    Unhandled,
}

struct TupleEntry {
    restriction: String,
    handler: Arc<dyn TupleHandler>,
}

struct ResourceEntry {
    restriction: String,
    /// `None` matches every resource type.
    type_name: Option<String>,
    handler: Arc<dyn ResourceHandler>,
}

struct PrecalcEntry {
    module: String,
    options: ModuleOptions,
    callback: Arc<dyn Precalc>,
}

/// Handlers registered by loaded modules.
#[derive(Default)]
pub struct PluginRegistry {
    tuple_handlers: Vec<TupleEntry>,
    resource_handlers: Vec<ResourceEntry>,
    precalcs: Vec<PrecalcEntry>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field(
                "tuple_handlers",
                &self.tuple_handlers.iter().map(|h| &h.restriction).collect::<Vec<_>>(),
            )
            .field(
                "resource_handlers",
                &self
                    .resource_handlers
                    .iter()
                    .map(|h| (&h.restriction, &h.type_name))
                    .collect::<Vec<_>>(),
            )
            .field(
                "precalcs",
                &self.precalcs.iter().map(|p| &p.module).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_tup_new<H>(&mut self, restriction: &str, handler: H)
    where
        H: Fn(&mut ProblemBuilder, &str, &str, TupleId) -> Result<()> + Send + Sync + 'static,
    {
        self.tuple_handlers.push(TupleEntry {
            restriction: restriction.to_string(),
            handler: Arc::new(handler),
        });
    }

    /// Registers a resource restriction handler for one resource type, or
    /// for every type when `type_name` is `None`.
    pub fn handler_res_new<H>(&mut self, type_name: Option<&str>, restriction: &str, handler: H)
    where
        H: Fn(&mut ProblemBuilder, &str, &str, ResourceTypeId, ResourceId) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.resource_handlers.push(ResourceEntry {
            restriction: restriction.to_string(),
            type_name: type_name.map(str::to_string),
            handler: Arc::new(handler),
        });
    }

    pub fn precalc_new<P>(&mut self, module: &str, options: ModuleOptions, callback: P)
    where
        P: Fn(&ProblemBuilder, &ModuleOptions) -> Result<()> + Send + Sync + 'static,
    {
        self.precalcs.push(PrecalcEntry {
            module: module.to_string(),
            options,
            callback: Arc::new(callback),
        });
    }

    /// Dispatches a tuple restriction to every matching handler.
    pub fn handler_tup_call(
        &self,
        builder: &mut ProblemBuilder,
        restriction: &str,
        content: &str,
        tuple: TupleId,
    ) -> Result<RestrictionOutcome> {
        let tuple_name = builder
            .tuple(tuple)
            .map(|t| t.name().to_string())
            .ok_or_else(|| SolverError::Setup(format!("unknown event {}", tuple)))?;

        let mut outcome = RestrictionOutcome::Unhandled;
        for entry in self
            .tuple_handlers
            .iter()
            .filter(|h| h.restriction == restriction)
        {
            entry
                .handler
                .handle(builder, restriction, content, tuple)
                .map_err(|e| {
                    error!(restriction, event = %tuple_name, "restriction handler failed: {}", e);
                    SolverError::Plugin(format!(
                        "restriction '{}' of event '{}': {}",
                        restriction, tuple_name, e
                    ))
                })?;
            outcome = RestrictionOutcome::Handled;
        }

        if outcome == RestrictionOutcome::Unhandled {
            warn!(restriction, event = %tuple_name, "unknown event restriction");
        }
        Ok(outcome)
    }

    /// Dispatches a resource restriction to every handler registered for
    /// the resource's type or for any type.
    pub fn handler_res_call(
        &self,
        builder: &mut ProblemBuilder,
        restriction: &str,
        content: &str,
        type_id: ResourceTypeId,
        resource: ResourceId,
    ) -> Result<RestrictionOutcome> {
        let restype = builder.resource_type(type_id)?;
        let type_name = restype.name().to_string();
        let resource_name = restype
            .resource(resource)
            .map(|r| r.name().to_string())
            .ok_or_else(|| {
                SolverError::Setup(format!(
                    "unknown resource {} of type '{}'",
                    resource, type_name
                ))
            })?;

        let mut outcome = RestrictionOutcome::Unhandled;
        for entry in self.resource_handlers.iter().filter(|h| {
            h.restriction == restriction
                && h.type_name.as_deref().map_or(true, |t| t == type_name)
        }) {
            entry
                .handler
                .handle(builder, restriction, content, type_id, resource)
                .map_err(|e| {
                    error!(
                        restriction,
                        resource = %resource_name,
                        resource_type = %type_name,
                        "restriction handler failed: {}",
                        e
                    );
                    SolverError::Plugin(format!(
                        "restriction '{}' of resource '{}' ({}): {}",
                        restriction, resource_name, type_name, e
                    ))
                })?;
            outcome = RestrictionOutcome::Handled;
        }

        if outcome == RestrictionOutcome::Unhandled {
            warn!(
                restriction,
                resource = %resource_name,
                resource_type = %type_name,
                "unknown resource restriction"
            );
        }
        Ok(outcome)
    }

    /// Runs every precalc callback in registration order.
    pub fn precalc_call(&self, builder: &ProblemBuilder) -> Result<()> {
        for entry in &self.precalcs {
            debug!(module = %entry.module, "running precalc");
            entry
                .callback
                .precalc(builder, &entry.options)
                .map_err(|e| {
                    error!(module = %entry.module, "precalc failed: {}", e);
                    SolverError::Plugin(format!("module '{}' precalc: {}", entry.module, e))
                })?;
        }
        Ok(())
    }

    /// Runs the precalc callbacks and builds the problem.
    pub fn build_problem(&self, builder: ProblemBuilder) -> Result<Problem> {
        self.precalc_call(&builder)?;
        builder.build()
    }
}
