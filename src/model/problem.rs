use crate::chromosome::Table;
use crate::depend::{DependencyResolver, UpdaterFunction};

use super::{Domain, ResourceType, ResourceTypeId, Tuple, TupleId};

/// The frozen model. Created by [`ProblemBuilder::build`](super::ProblemBuilder::build).
#[derive(Debug, Clone)]
pub struct Problem {
    pub(super) types: Vec<ResourceType>,
    pub(super) tuples: Vec<Tuple>,
    pub(super) domains: Vec<Domain>,
    pub(super) resolver: DependencyResolver,
    pub(super) variable_types: Vec<ResourceTypeId>,
}

impl Problem {
    pub fn types(&self) -> &[ResourceType] {
        &self.types
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn resource_type(&self, id: ResourceTypeId) -> &ResourceType {
        &self.types[id]
    }

    pub fn find_type(&self, name: &str) -> Option<ResourceTypeId> {
        self.types.iter().position(|t| t.name() == name)
    }

    /// Ids of the variable resource types, ascending.
    pub fn variable_types(&self) -> &[ResourceTypeId] {
        &self.variable_types
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    pub fn tuple(&self, id: TupleId) -> &Tuple {
        &self.tuples[id]
    }

    /// Compacted domains. Tuples with identical legal sets share one.
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn tuple_domain(&self, tuple: TupleId, type_id: ResourceTypeId) -> &Domain {
        &self.domains[self.tuples[tuple].domain(type_id)]
    }

    /// Updaters in evaluation order.
    pub fn updaters(&self) -> &[UpdaterFunction] {
        self.resolver.updaters()
    }

    /// Derives every dependent gene of `table` from its source.
    pub fn updater_call_all(&self, table: &mut Table) {
        self.resolver.call_all(table);
    }

    /// Two tuples are repeats of one event if they share a name and all
    /// constant resources.
    pub fn tuple_compare(&self, a: TupleId, b: TupleId) -> bool {
        tuples_equivalent(&self.types, &self.tuples[a], &self.tuples[b])
    }
}

pub(super) fn tuples_equivalent(types: &[ResourceType], a: &Tuple, b: &Tuple) -> bool {
    a.name() == b.name()
        && types
            .iter()
            .filter(|t| !t.is_variable())
            .all(|t| a.resource(t.id()) == b.resource(t.id()))
}
