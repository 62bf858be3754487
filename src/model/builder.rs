use std::collections::HashMap;

use tracing::{debug, error};

use crate::depend::DependencyResolver;
use crate::error::{Result, SolverError};

use super::problem::tuples_equivalent;
use super::{
    Domain, DomainId, Problem, ResourceId, ResourceKind, ResourceType, ResourceTypeId, Tuple,
    TupleId,
};

/// Collects the model during setup.
///
/// Resource types and resources must be created before the first tuple:
/// a new tuple gets a full domain over every type as it exists at that
/// moment.
///
/// ```rust
/// use tablix_core::model::{ProblemBuilder, ResourceKind};
///
/// let mut b = ProblemBuilder::new();
/// let teacher = b.restype_new("teacher", ResourceKind::Constant)?;
/// let time = b.restype_new("time", ResourceKind::Variable)?;
/// b.res_new(teacher, "Smith")?;
/// b.res_new_matrix(time, 5, 6)?;
///
/// let maths = b.tuple_new("maths")?;
/// b.tuple_set(maths, teacher, 0)?;
/// b.domain_and(maths, time, &[0, 1, 2])?;
///
/// let problem = b.build()?;
/// assert_eq!(problem.tuple_domain(maths, time).values(), &[0, 1, 2]);
/// # Ok::<(), tablix_core::error::SolverError>(())
/// ```
#[derive(Debug, Default)]
pub struct ProblemBuilder {
    types: Vec<ResourceType>,
    tuples: Vec<Tuple>,
    domains: Vec<Domain>,
    resolver: DependencyResolver,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resource type. Fails on a duplicate name or if tuples
    /// already exist.
    pub fn restype_new(&mut self, name: &str, kind: ResourceKind) -> Result<ResourceTypeId> {
        if self.find_type(name).is_some() {
            return Err(SolverError::Setup(format!(
                "resource type '{}' already exists",
                name
            )));
        }
        if !self.tuples.is_empty() {
            return Err(SolverError::Setup(format!(
                "resource type '{}' defined after the first event",
                name
            )));
        }
        let id = self.types.len();
        self.types.push(ResourceType::new(id, name, kind));
        Ok(id)
    }

    /// Adds a resource to a type. Fails on a duplicate name within the type
    /// or if tuples already exist.
    pub fn res_new(&mut self, type_id: ResourceTypeId, name: &str) -> Result<ResourceId> {
        if !self.tuples.is_empty() {
            return Err(SolverError::Setup(format!(
                "resource '{}' defined after the first event",
                name
            )));
        }
        self.type_mut(type_id)?.add_resource(name)
    }

    /// Adds `width * height` resources named `"x y"`, x-major. Returns the
    /// id of the last one.
    pub fn res_new_matrix(
        &mut self,
        type_id: ResourceTypeId,
        width: usize,
        height: usize,
    ) -> Result<ResourceId> {
        if width == 0 || height == 0 {
            return Err(SolverError::Setup(format!(
                "matrix of {}x{} resources is empty",
                width, height
            )));
        }
        let mut last = 0;
        for x in 0..width {
            for y in 0..height {
                last = self.res_new(type_id, &format!("{} {}", x, y))?;
            }
        }
        Ok(last)
    }

    /// Dimensions of a resource type created with [`res_new_matrix`](Self::res_new_matrix).
    pub fn res_get_matrix(&self, type_id: ResourceTypeId) -> Result<(usize, usize)> {
        self.resource_type(type_id)?.matrix_dimensions()
    }

    /// Marks resource `a` as conflicting with `b`. One direction only.
    pub fn res_set_conflict(
        &mut self,
        type_id: ResourceTypeId,
        a: ResourceId,
        b: ResourceId,
    ) -> Result<()> {
        self.type_mut(type_id)?.set_conflict(a, b)
    }

    pub fn find_type(&self, name: &str) -> Option<ResourceTypeId> {
        self.types.iter().position(|t| t.name() == name)
    }

    pub fn resource_type(&self, type_id: ResourceTypeId) -> Result<&ResourceType> {
        self.types
            .get(type_id)
            .ok_or_else(|| SolverError::Setup(format!("unknown resource type {}", type_id)))
    }

    pub fn types(&self) -> &[ResourceType] {
        &self.types
    }

    /// Creates a tuple with a full domain for every resource type.
    pub fn tuple_new(&mut self, name: &str) -> Result<TupleId> {
        let id = self.tuples.len();
        let mut domains = Vec::with_capacity(self.types.len());
        for restype in &self.types {
            domains.push(self.domains.len());
            self.domains.push(Domain::full(restype.id(), restype.len()));
        }
        self.tuples.push(Tuple::new(id, name, domains));
        Ok(id)
    }

    /// Sets the fixed resource of a constant type, or a hint for a variable
    /// type.
    pub fn tuple_set(
        &mut self,
        tuple: TupleId,
        type_id: ResourceTypeId,
        resource: ResourceId,
    ) -> Result<()> {
        let restype = self.resource_type(type_id)?;
        if restype.resource(resource).is_none() {
            return Err(SolverError::Setup(format!(
                "unknown resource {} of type '{}'",
                resource,
                restype.name()
            )));
        }
        self.tuple_mut(tuple)?.set_resource(type_id, resource);
        Ok(())
    }

    pub fn tuple(&self, tuple: TupleId) -> Option<&Tuple> {
        self.tuples.get(tuple)
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn find_tuple(&self, name: &str) -> Option<TupleId> {
        self.tuples.iter().position(|t| t.name() == name)
    }

    /// Whether two tuples are repeats of one event.
    pub fn tuple_compare(&self, a: TupleId, b: TupleId) -> bool {
        match (self.tuples.get(a), self.tuples.get(b)) {
            (Some(a), Some(b)) => tuples_equivalent(&self.types, a, b),
            _ => false,
        }
    }

    /// Restricts the legal resources of `tuple` for `type_id` to `values`.
    pub fn domain_and(
        &mut self,
        tuple: TupleId,
        type_id: ResourceTypeId,
        values: &[ResourceId],
    ) -> Result<()> {
        let id = self.domain_id(tuple, type_id)?;
        self.domains[id].and(values);
        Ok(())
    }

    pub fn domain(&self, tuple: TupleId, type_id: ResourceTypeId) -> Result<&Domain> {
        Ok(&self.domains[self.domain_id(tuple, type_id)?])
    }

    /// Whether `resource` is currently legal for `tuple`.
    pub fn domain_check(
        &self,
        tuple: TupleId,
        type_id: ResourceTypeId,
        resource: ResourceId,
    ) -> Result<bool> {
        Ok(self.domain(tuple, type_id)?.contains(resource))
    }

    /// Registers an updater deriving the gene of `dst` from `src`.
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
        let restype = self.resource_type(type_id)?;
        if !restype.is_variable() {
            return Err(SolverError::Dependency(format!(
                "updater for constant resource type '{}'",
                restype.name()
            )));
        }
        let type_name = restype.name().to_string();
        let src_name = self.tuple_name(src)?;
        let dst_name = self.tuple_name(dst)?;

        if src == dst {
            return Err(SolverError::Dependency(format!(
                "event '{}' can not depend on itself",
                dst_name
            )));
        }
        if self.resolver.updater_check(dst, type_id) {
            return Err(SolverError::Dependency(format!(
                "event '{}' already depends on another event for resource type '{}' (new source '{}')",
                dst_name, type_name, src_name
            )));
        }

        self.resolver.updater_new(src, dst, type_id, func)?;
        self.tuples[dst].set_dependent(type_id);
        Ok(())
    }

    /// Whether `dst` already has an updater for `type_id`.
    pub fn updater_check(&self, dst: TupleId, type_id: ResourceTypeId) -> bool {
        self.resolver.updater_check(dst, type_id)
    }

    /// Ends the setup phase: orders updaters, tightens source domains,
    /// merges identical domains and compacts conflicts.
    pub fn build(self) -> Result<Problem> {
        let Self {
            mut types,
            mut tuples,
            mut domains,
            mut resolver,
        } = self;

        if tuples.is_empty() {
            return Err(SolverError::Setup("no events defined".to_string()));
        }
        for restype in types.iter().filter(|t| !t.is_variable()) {
            if let Some(tuple) = tuples.iter().find(|t| t.resource(restype.id()).is_none()) {
                return Err(SolverError::Setup(format!(
                    "event '{}' has no resource of constant type '{}'",
                    tuple.name(),
                    restype.name()
                )));
            }
        }

        resolver.reorder(&tuples)?;
        resolver.fix_domains(&mut domains, |tuple, type_id| tuples[tuple].domain(type_id));

        let domains = compact_domains(&types, &mut tuples, domains)?;

        for restype in &mut types {
            restype.compact_conflicts();
            debug!(
                resource_type = restype.name(),
                in_use = restype.has_conflicts(),
                "conflicts compacted"
            );
        }

        let variable_types = types
            .iter()
            .filter(|t| t.is_variable())
            .map(ResourceType::id)
            .collect();

        debug!(
            types = types.len(),
            tuples = tuples.len(),
            domains = domains.len(),
            updaters = resolver.len(),
            "problem built"
        );

        Ok(Problem {
            types,
            tuples,
            domains,
            resolver,
            variable_types,
        })
    }

    fn type_mut(&mut self, type_id: ResourceTypeId) -> Result<&mut ResourceType> {
        self.types
            .get_mut(type_id)
            .ok_or_else(|| SolverError::Setup(format!("unknown resource type {}", type_id)))
    }

    fn tuple_mut(&mut self, tuple: TupleId) -> Result<&mut Tuple> {
        self.tuples.get_mut(tuple).ok_or_else(|| unknown_event(tuple))
    }

    fn tuple_name(&self, tuple: TupleId) -> Result<String> {
        self.tuples
            .get(tuple)
            .map(|t| t.name().to_string())
            .ok_or_else(|| unknown_event(tuple))
    }

    fn domain_id(&self, tuple: TupleId, type_id: ResourceTypeId) -> Result<DomainId> {
        self.resource_type(type_id)?;
        self.tuples
            .get(tuple)
            .map(|t| t.domain(type_id))
            .ok_or_else(|| unknown_event(tuple))
    }
}

fn unknown_event(tuple: TupleId) -> SolverError {
    SolverError::Setup(format!("unknown event {}", tuple))
}

/// Merges domains with identical (type, values) and fails if any domain of
/// a variable type is empty.
fn compact_domains(
    types: &[ResourceType],
    tuples: &mut [Tuple],
    domains: Vec<Domain>,
) -> Result<Vec<Domain>> {
    let before = domains.len();
    let mut index: HashMap<(ResourceTypeId, Vec<ResourceId>), DomainId> = HashMap::new();
    let mut compacted: Vec<Domain> = Vec::new();

    for tuple in tuples.iter_mut() {
        for restype in types {
            let old = &domains[tuple.domain(restype.id())];
            let key = (restype.id(), old.values().to_vec());
            let id = *index.entry(key).or_insert_with(|| {
                compacted.push(Domain::from_values(restype.id(), old.values().to_vec()));
                compacted.len() - 1
            });
            compacted[id].push_tuple(tuple.id());
            tuple.set_domain(restype.id(), id);
        }
    }

    let mut empty = Vec::new();
    for domain in compacted
        .iter()
        .filter(|d| d.is_empty() && types[d.type_id()].is_variable())
    {
        let names: Vec<&str> = domain.tuples().iter().map(|&t| tuples[t].name()).collect();
        error!(
            resource_type = types[domain.type_id()].name(),
            events = ?names,
            "domain is empty"
        );
        empty.push(format!(
            "no legal '{}' for events {}",
            types[domain.type_id()].name(),
            names.join(", ")
        ));
    }
    if !empty.is_empty() {
        return Err(SolverError::Setup(format!(
            "problem is infeasible: {}",
            empty.join("; ")
        )));
    }

    debug!(before, after = compacted.len(), "domains compacted");
    Ok(compacted)
}
