//! # Dependency Resolver
//!
//! Some tuples do not get their own gene for a resource type: it is derived
//! from another tuple's gene by an [`Updater`]. The resolver keeps the
//! registered updaters, orders them so that every source is final before it
//! is read, tightens source domains so that derived genes are always legal,
//! and finally applies the chain to a [`Table`].
//!
//! ```rust
//! use tablix_core::model::{ProblemBuilder, ResourceKind};
//!
//! let mut builder = ProblemBuilder::new();
//! let time = builder.restype_new("time", ResourceKind::Variable).unwrap();
//! for slot in ["mon", "tue", "wed", "thu"] {
//!     builder.res_new(time, slot).unwrap();
//! }
//! let lecture = builder.tuple_new("lecture").unwrap();
//! let lab = builder.tuple_new("lab").unwrap();
//!
//! // The lab always takes place the slot after the lecture.
//! builder.updater_new(lecture, lab, time, |_, _, _, slot| slot + 1).unwrap();
//!
//! let problem = builder.build().unwrap();
//! assert!(!problem.tuple_domain(lecture, time).contains(3));
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::chromosome::Table;
use crate::error::{Result, SolverError};
use crate::model::{Domain, ResourceId, ResourceTypeId, Tuple, TupleId};

/// Maps the source tuple's resource to the destination tuple's resource.
///
/// Implementations must be deterministic. Results outside the resource
/// range are allowed; they simply never fall inside a domain.
pub trait Updater: Send + Sync {
    fn update(
        &self,
        src: TupleId,
        dst: TupleId,
        type_id: ResourceTypeId,
        src_resource: ResourceId,
    ) -> ResourceId;
}

impl<F> Updater for F
where
    F: Fn(TupleId, TupleId, ResourceTypeId, ResourceId) -> ResourceId + Send + Sync,
{
    fn update(
        &self,
        src: TupleId,
        dst: TupleId,
        type_id: ResourceTypeId,
        src_resource: ResourceId,
    ) -> ResourceId {
        self(src, dst, type_id, src_resource)
    }
}

/// One registered updater: the gene of `dst` for `type_id` is derived from
/// the gene of `src`.
#[derive(Clone)]
pub struct UpdaterFunction {
    src: TupleId,
    dst: TupleId,
    type_id: ResourceTypeId,
    func: Arc<dyn Updater>,
}

impl UpdaterFunction {
    pub fn src(&self) -> TupleId {
        self.src
    }

    pub fn dst(&self) -> TupleId {
        self.dst
    }

    pub fn type_id(&self) -> ResourceTypeId {
        self.type_id
    }

    pub fn call(&self, src_resource: ResourceId) -> ResourceId {
        self.func
            .update(self.src, self.dst, self.type_id, src_resource)
    }
}

impl fmt::Debug for UpdaterFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdaterFunction")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

/// Registry of updater functions. After [`reorder`](Self::reorder) the
/// updaters are stored in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    updaters: Vec<UpdaterFunction>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an updater. Fails if `dst` already has an updater for
    /// `type_id`.
    pub fn updater_new<U>(
        &mut self,
        src: TupleId,
        dst: TupleId,
        type_id: ResourceTypeId,
        func: U,
    ) -> Result<()>
    where
        U: Fn(TupleId, TupleId, ResourceTypeId, ResourceId) -> ResourceId + Send + Sync + 'static,
    {
        if src == dst {
            return Err(SolverError::Dependency(format!(
                "tuple {} can not depend on itself",
                src
            )));
        }
        if self.updater_check(dst, type_id) {
            return Err(SolverError::Dependency(format!(
                "tuple {} already has an updater for resource type {}",
                dst, type_id
            )));
        }
        self.updaters.push(UpdaterFunction {
            src,
            dst,
            type_id,
            func: Arc::new(func),
        });
        Ok(())
    }

    /// Whether an updater with destination `dst` for `type_id` exists.
    pub fn updater_check(&self, dst: TupleId, type_id: ResourceTypeId) -> bool {
        is_destination(&self.updaters, dst, type_id)
    }

    pub fn updaters(&self) -> &[UpdaterFunction] {
        &self.updaters
    }

    pub fn len(&self) -> usize {
        self.updaters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updaters.is_empty()
    }

    /// Sorts updaters so that an updater runs only after every updater that
    /// writes its source. Each pass moves all updaters whose source is not
    /// the destination of a remaining updater of the same type. A pass that
    /// moves nothing means the remaining updaters form a cycle.
    pub fn reorder(&mut self, tuples: &[Tuple]) -> Result<()> {
        let mut pending = std::mem::take(&mut self.updaters);
        let mut ordered = Vec::with_capacity(pending.len());
        let mut passes = 0;

        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();

            let mut i = 0;
            while i < pending.len() {
                let u = &pending[i];
                if is_destination(&pending, u.src, u.type_id) {
                    i += 1;
                } else {
                    ordered.push(pending.remove(i));
                }
            }

            if pending.len() == before {
                let edges: Vec<String> = pending
                    .iter()
                    .map(|u| {
                        let edge = format!(
                            "'{}' depends on '{}'",
                            tuple_name(tuples, u.dst),
                            tuple_name(tuples, u.src)
                        );
                        error!(type_id = u.type_id, "circular dependency: event {}", edge);
                        edge
                    })
                    .collect();

                ordered.append(&mut pending);
                self.updaters = ordered;

                return Err(SolverError::Dependency(format!(
                    "circular dependency between events: {}",
                    edges.join(", ")
                )));
            }
        }

        debug!(updaters = ordered.len(), passes, "updater functions reordered");
        self.updaters = ordered;
        Ok(())
    }

    /// Walks the evaluation order backwards and removes from every source
    /// domain the values that would map outside the destination domain.
    ///
    /// `domain_of(tuple, type)` gives the index of the domain in `domains`.
    /// Every tuple must still own its domains, i.e. this runs before the
    /// domains are compacted.
    pub fn fix_domains<F>(&self, domains: &mut [Domain], domain_of: F)
    where
        F: Fn(TupleId, ResourceTypeId) -> usize,
    {
        for u in self.updaters.iter().rev() {
            let src_dom = domain_of(u.src, u.type_id);
            let dst_dom = domain_of(u.dst, u.type_id);

            let valid: Vec<ResourceId> = domains[src_dom]
                .values()
                .iter()
                .copied()
                .filter(|&v| domains[dst_dom].contains(u.call(v)))
                .collect();

            domains[src_dom].and(&valid);
        }
    }

    /// Writes every dependent gene of `table` from its source gene, in
    /// evaluation order.
    pub fn call_all(&self, table: &mut Table) {
        for u in &self.updaters {
            let chromosome = table.chromosome_mut(u.type_id);
            let value = u.call(chromosome.gene(u.src));
            chromosome.set_gene(u.dst, value);
        }
    }
}

fn is_destination(updaters: &[UpdaterFunction], tuple: TupleId, type_id: ResourceTypeId) -> bool {
    updaters
        .iter()
        .any(|u| u.dst == tuple && u.type_id == type_id)
}

fn tuple_name(tuples: &[Tuple], id: TupleId) -> String {
    tuples
        .get(id)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| format!("#{}", id))
}
