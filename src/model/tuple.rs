//! Tuples (event instances).

use super::{DomainId, ResourceId, ResourceTypeId, TupleId};

/// An event that needs one resource of every resource type.
///
/// For constant types `resources` holds the fixed resource. For variable
/// types it holds an optional hint recovered from a previous solution.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    id: TupleId,
    name: String,
    resources: Vec<Option<ResourceId>>,
    domains: Vec<DomainId>,
    dependent: Vec<bool>,
}

impl Tuple {
    pub(crate) fn new(id: TupleId, name: &str, domains: Vec<DomainId>) -> Self {
        let types = domains.len();
        Self {
            id,
            name: name.to_string(),
            resources: vec![None; types],
            domains,
            dependent: vec![false; types],
        }
    }

    pub fn id(&self) -> TupleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed resource (constant type) or hint (variable type).
    pub fn resource(&self, type_id: ResourceTypeId) -> Option<ResourceId> {
        self.resources.get(type_id).copied().flatten()
    }

    pub fn domain(&self, type_id: ResourceTypeId) -> DomainId {
        self.domains[type_id]
    }

    /// Whether the gene for `type_id` is derived by an updater.
    pub fn is_dependent(&self, type_id: ResourceTypeId) -> bool {
        self.dependent.get(type_id).copied().unwrap_or(false)
    }

    /// Whether any gene of this tuple is derived by an updater.
    pub fn has_dependencies(&self) -> bool {
        self.dependent.iter().any(|&d| d)
    }

    pub(crate) fn set_resource(&mut self, type_id: ResourceTypeId, resource: ResourceId) {
        self.resources[type_id] = Some(resource);
    }

    pub(crate) fn set_domain(&mut self, type_id: ResourceTypeId, domain: DomainId) {
        self.domains[type_id] = domain;
    }

    pub(crate) fn set_dependent(&mut self, type_id: ResourceTypeId) {
        self.dependent[type_id] = true;
    }
}
