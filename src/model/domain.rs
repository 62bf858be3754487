//! Per-tuple legality sets.
//!
//! A [`Domain`] lists the resource ids a tuple may take for one resource
//! type. Values start as `0..N` and are kept ascending; after setup they
//! only ever shrink. Tuples with identical sets share one domain once the
//! problem has been built.

use crate::rng::RandomNumberGenerator;

use super::{ResourceId, ResourceTypeId, TupleId};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    type_id: ResourceTypeId,
    values: Vec<ResourceId>,
    tuples: Vec<TupleId>,
}

impl Domain {
    /// Full domain `0..resource_count`.
    pub fn full(type_id: ResourceTypeId, resource_count: usize) -> Self {
        Self {
            type_id,
            values: (0..resource_count).collect(),
            tuples: Vec::new(),
        }
    }

    pub(crate) fn from_values(type_id: ResourceTypeId, values: Vec<ResourceId>) -> Self {
        Self {
            type_id,
            values,
            tuples: Vec::new(),
        }
    }

    pub fn type_id(&self) -> ResourceTypeId {
        self.type_id
    }

    /// Legal resource ids, ascending.
    pub fn values(&self) -> &[ResourceId] {
        &self.values
    }

    /// Tuples sharing this domain. Filled in when domains are compacted.
    pub fn tuples(&self) -> &[TupleId] {
        &self.tuples
    }

    pub(crate) fn push_tuple(&mut self, tuple: TupleId) {
        self.tuples.push(tuple);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `value` is currently legal.
    pub fn contains(&self, value: ResourceId) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    /// Intersects this domain with `values`. Order of the remaining values
    /// is preserved; `values` may be unsorted and contain duplicates.
    pub fn and(&mut self, values: &[ResourceId]) {
        let mut allowed = values.to_vec();
        allowed.sort_unstable();
        allowed.dedup();
        self.values.retain(|v| allowed.binary_search(v).is_ok());
    }

    /// Uniform draw from the legal values. `None` for an empty domain.
    pub fn rand(&self, rng: &mut RandomNumberGenerator) -> Option<ResourceId> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values[rng.gen_index(self.values.len())])
    }
}
