//! Resource types and their resources.
//!
//! A [`ResourceType`] owns its resources and an N x N conflict matrix. Every
//! resource conflicts with itself; further conflicts are added during setup
//! and compacted into per-resource lookup lists by
//! [`ResourceType::compact_conflicts`].

use crate::error::{Result, SolverError};

use super::{ResourceId, ResourceTypeId};

/// Whether the genes of a resource type are solved for or fixed in advance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Assigned by the genetic algorithm.
    Variable,
    /// Fixed per tuple during setup.
    Constant,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: String,
    id: ResourceId,
}

impl Resource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }
}

/// A category of assignable entities, e.g. "time", "room" or "teacher".
#[derive(Debug, Clone)]
pub struct ResourceType {
    id: ResourceTypeId,
    name: String,
    kind: ResourceKind,
    resources: Vec<Resource>,
    /// Row-major N x N, `conflicts[a][b]` means a conflicts with b.
    conflicts: Vec<Vec<bool>>,
    conflict_lookup: Vec<Vec<ResourceId>>,
    conflicts_in_use: bool,
}

impl ResourceType {
    pub(crate) fn new(id: ResourceTypeId, name: &str, kind: ResourceKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            resources: Vec::new(),
            conflicts: Vec::new(),
            conflict_lookup: Vec::new(),
            conflicts_in_use: false,
        }
    }

    pub fn id(&self) -> ResourceTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_variable(&self) -> bool {
        self.kind == ResourceKind::Variable
    }

    /// Number of resources of this type.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn find_resource(&self, name: &str) -> Option<ResourceId> {
        self.resources.iter().position(|r| r.name == name)
    }

    /// Whether `a` conflicts with `b`. Out of range ids never conflict.
    pub fn conflicts(&self, a: ResourceId, b: ResourceId) -> bool {
        self.conflicts
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(false)
    }

    /// Resources `r` conflicts with, itself included. Empty until
    /// [`compact_conflicts`](Self::compact_conflicts) has run.
    pub fn conflicting(&self, r: ResourceId) -> &[ResourceId] {
        self.conflict_lookup
            .get(r)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True once any conflict beyond the trivial self-conflict was set.
    pub fn has_conflicts(&self) -> bool {
        self.conflicts_in_use
    }

    pub(crate) fn add_resource(&mut self, name: &str) -> Result<ResourceId> {
        if self.find_resource(name).is_some() {
            return Err(SolverError::Setup(format!(
                "resource '{}' of type '{}' already exists",
                name, self.name
            )));
        }

        let id = self.resources.len();
        self.resources.push(Resource {
            name: name.to_string(),
            id,
        });

        for row in &mut self.conflicts {
            row.push(false);
        }
        let mut row = vec![false; id + 1];
        row[id] = true;
        self.conflicts.push(row);

        Ok(id)
    }

    pub(crate) fn set_conflict(&mut self, a: ResourceId, b: ResourceId) -> Result<()> {
        let n = self.resources.len();
        if a >= n || b >= n {
            return Err(SolverError::Setup(format!(
                "conflict between resources {} and {} of type '{}' refers to an unknown resource",
                a, b, self.name
            )));
        }
        self.conflicts[a][b] = true;
        if a != b {
            self.conflicts_in_use = true;
        }
        Ok(())
    }

    pub(crate) fn compact_conflicts(&mut self) {
        self.conflict_lookup = self
            .conflicts
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &c)| c)
                    .map(|(id, _)| id)
                    .collect()
            })
            .collect();
    }

    /// Recovers the dimensions of a resource matrix created with
    /// `res_new_matrix`. Resource names must read `"x y"` with x-major order.
    pub fn matrix_dimensions(&self) -> Result<(usize, usize)> {
        let malformed = || {
            SolverError::Setup(format!(
                "resources of type '{}' do not form a matrix",
                self.name
            ))
        };

        let coords = self
            .resources
            .iter()
            .map(|r| parse_coordinates(&r.name))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(malformed)?;

        let height = coords.iter().take_while(|&&(x, _)| x == 0).count();
        if height == 0 || coords.len() % height != 0 {
            return Err(malformed());
        }

        let expected = |i: usize| (i / height, i % height);
        if coords.iter().enumerate().any(|(i, &c)| c != expected(i)) {
            return Err(malformed());
        }

        Ok((coords.len() / height, height))
    }
}

fn parse_coordinates(name: &str) -> Option<(usize, usize)> {
    let mut parts = name.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((x, y))
}
