//! Read-only views derived from a table before each fitness pass.

use crate::chromosome::Table;
use crate::model::{Problem, ResourceId, ResourceTypeId, TupleId};

/// Which tuple occupies constant resource `c` at variable resource `v`.
///
/// If several tuples land on one cell the last one in tuple order wins;
/// fitness functions detect clashes by comparing [`get`](Self::get) with
/// the tuple they are looking at. When the constant type has conflicts, a
/// tuple also occupies every resource its own resource conflicts with.
#[derive(Debug, Clone)]
pub struct Extension {
    con_type: ResourceTypeId,
    var_type: ResourceTypeId,
    con_count: usize,
    var_count: usize,
    cells: Vec<Option<TupleId>>,
}

impl Extension {
    pub(crate) fn new(problem: &Problem, con_type: ResourceTypeId, var_type: ResourceTypeId) -> Self {
        let con_count = problem.resource_type(con_type).len();
        let var_count = problem.resource_type(var_type).len();
        Self {
            con_type,
            var_type,
            con_count,
            var_count,
            cells: vec![None; con_count * var_count],
        }
    }

    pub fn con_type(&self) -> ResourceTypeId {
        self.con_type
    }

    pub fn var_type(&self) -> ResourceTypeId {
        self.var_type
    }

    pub fn con_count(&self) -> usize {
        self.con_count
    }

    pub fn var_count(&self) -> usize {
        self.var_count
    }

    pub fn get(&self, var_res: ResourceId, con_res: ResourceId) -> Option<TupleId> {
        if var_res >= self.var_count || con_res >= self.con_count {
            return None;
        }
        self.cells[var_res * self.con_count + con_res]
    }

    pub(crate) fn update(&mut self, problem: &Problem, table: &Table) {
        self.cells.fill(None);

        let con_type = problem.resource_type(self.con_type);
        let con = table.chromosome(self.con_type).genes();
        let var = table.chromosome(self.var_type).genes();

        for (tuple, (&v, &c)) in var.iter().zip(con).enumerate() {
            let row = v * self.con_count;
            if con_type.has_conflicts() {
                for &r in con_type.conflicting(c) {
                    self.cells[row + r] = Some(tuple);
                }
            } else {
                self.cells[row + c] = Some(tuple);
            }
        }
    }
}

/// Tuples using each resource of a variable type (the "slist").
#[derive(Debug, Clone)]
pub struct Lookup {
    var_type: ResourceTypeId,
    lists: Vec<Vec<TupleId>>,
}

impl Lookup {
    pub(crate) fn new(problem: &Problem, var_type: ResourceTypeId) -> Self {
        let count = problem.resource_type(var_type).len();
        Self {
            var_type,
            lists: vec![Vec::new(); count],
        }
    }

    pub fn var_type(&self) -> ResourceTypeId {
        self.var_type
    }

    pub fn resource_count(&self) -> usize {
        self.lists.len()
    }

    /// Tuples assigned `var_res`, ascending.
    pub fn tuples(&self, var_res: ResourceId) -> &[TupleId] {
        self.lists.get(var_res).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn update(&mut self, table: &Table) {
        for list in &mut self.lists {
            list.clear();
        }
        for (tuple, &v) in table.chromosome(self.var_type).genes().iter().enumerate() {
            self.lists[v].push(tuple);
        }
    }
}

/// Lossless variant of [`Extension`] for exporters: every tuple in every
/// cell, conflicts included.
#[derive(Debug, Clone)]
pub struct OutputExtension {
    con_type: ResourceTypeId,
    var_type: ResourceTypeId,
    con_count: usize,
    cells: Vec<Vec<TupleId>>,
}

impl OutputExtension {
    /// Builds the view for `table`.
    pub fn new(
        problem: &Problem,
        con_type: ResourceTypeId,
        var_type: ResourceTypeId,
        table: &Table,
    ) -> Self {
        let con_count = problem.resource_type(con_type).len();
        let var_count = problem.resource_type(var_type).len();
        let mut ext = Self {
            con_type,
            var_type,
            con_count,
            cells: vec![Vec::new(); con_count * var_count],
        };
        ext.update(problem, table);
        ext
    }

    pub fn con_type(&self) -> ResourceTypeId {
        self.con_type
    }

    pub fn var_type(&self) -> ResourceTypeId {
        self.var_type
    }

    pub fn tuples(&self, var_res: ResourceId, con_res: ResourceId) -> &[TupleId] {
        if con_res >= self.con_count {
            return &[];
        }
        self.cells
            .get(var_res * self.con_count + con_res)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn update(&mut self, problem: &Problem, table: &Table) {
        for cell in &mut self.cells {
            cell.clear();
        }

        let con_type = problem.resource_type(self.con_type);
        let con = table.chromosome(self.con_type).genes();
        let var = table.chromosome(self.var_type).genes();

        for (tuple, (&v, &c)) in var.iter().zip(con).enumerate() {
            for &r in con_type.conflicting(c) {
                self.cells[v * self.con_count + r].push(tuple);
            }
        }
    }
}
