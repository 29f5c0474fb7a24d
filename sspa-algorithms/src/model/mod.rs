mod builder;
pub use builder::build;

use crate::HashMap;
use sspa_instances::{Assignment, GroupSlot};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// Student placed in the group.
    Assign { student: usize, slot: GroupSlot },
    /// Group hosts at least one student.
    Open(GroupSlot),
    /// Mutual partners `first < second` share a group.
    Together { first: usize, second: usize },
    /// Students above the project's ideal size.
    SizeSurplus(GroupSlot),
    /// Students below the project's ideal size, zero for closed groups.
    SizeDeficit(GroupSlot),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
    pub objective: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEq,
    GreaterEq,
    Equal,
}

impl Sense {
    pub fn holds(&self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Sense::LessEq => lhs <= rhs + tolerance,
            Sense::GreaterEq => lhs + tolerance >= rhs,
            Sense::Equal => (lhs - rhs).abs() <= tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.0]).sum()
    }
}

/// Solver independent 0-1 formulation of an instance (maximization).
///
/// Assignment variables come first, ordered by group slot then student, so
/// `VarId`s below [`Model::num_assignment_vars`] are exactly the `x[s,p,g]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) variables: Vec<Variable>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) num_students: usize,
    pub(crate) slots: Vec<GroupSlot>,
    pub(crate) index: HashMap<VarKind, VarId>,
}

impl Model {
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_students(&self) -> usize {
        self.num_students
    }

    /// Every group any project may realize, in variable order.
    pub fn slots(&self) -> &[GroupSlot] {
        &self.slots
    }

    pub fn var(&self, kind: &VarKind) -> Option<VarId> {
        self.index.get(kind).copied()
    }

    pub fn assign_var(&self, student: usize, slot: GroupSlot) -> Option<VarId> {
        self.var(&VarKind::Assign { student, slot })
    }

    pub fn num_assignment_vars(&self) -> usize {
        self.slots.len() * self.num_students
    }

    pub fn assignment_vars(&self) -> impl Iterator<Item = VarId> {
        (0..self.num_assignment_vars()).map(VarId)
    }

    /// All assignment variables of one student.
    pub fn student_vars(&self, student: usize) -> impl Iterator<Item = VarId> + '_ {
        let n = self.num_students;
        (0..self.slots.len()).map(move |slot| VarId(slot * n + student))
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables
            .iter()
            .zip(values)
            .map(|(var, value)| var.objective * value)
            .sum()
    }

    /// Assignment variables equal to one under `assignment`.
    pub fn ones(&self, assignment: &Assignment) -> Option<BTreeSet<VarId>> {
        assignment
            .slots
            .iter()
            .enumerate()
            .map(|(student, &slot)| self.assign_var(student, slot))
            .collect()
    }

    /// Reads the assignment variables back into per-student groups.
    ///
    /// Returns `None` unless every student sits in exactly one group.
    pub fn decode(&self, values: &[f64]) -> Option<Assignment> {
        if values.len() != self.variables.len() {
            return None;
        }
        let mut slots: Vec<Option<GroupSlot>> = vec![None; self.num_students];
        for id in self.assignment_vars() {
            if values[id.0] < 0.5 {
                continue;
            }
            if let VarKind::Assign { student, slot } = self.variables[id.0].kind {
                if slots[student].replace(slot).is_some() {
                    return None;
                }
            }
        }
        slots
            .into_iter()
            .collect::<Option<Vec<GroupSlot>>>()
            .map(Assignment::new)
    }

    /// Fixes the assignment variables of every student outside `free` to `assignment`.
    pub fn fixing(&self, assignment: &Assignment, free: &[bool]) -> BTreeMap<VarId, f64> {
        let mut fixed = BTreeMap::new();
        for (student, slot) in assignment.slots.iter().enumerate() {
            if free.get(student).copied().unwrap_or(false) {
                continue;
            }
            for var in self.student_vars(student) {
                let value = match self.variables[var.0].kind {
                    VarKind::Assign { slot: s, .. } if s == *slot => 1.0,
                    _ => 0.0,
                };
                fixed.insert(var, value);
            }
        }
        fixed
    }

    /// Checks bounds, integrality and every base constraint.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && self.variables.iter().zip(values).all(|(var, &value)| {
                value >= var.lower - tolerance
                    && value <= var.upper + tolerance
                    && (!var.integer || (value - value.round()).abs() <= tolerance)
            })
            && self
                .constraints
                .iter()
                .all(|c| c.sense.holds(c.lhs(values), c.rhs, tolerance))
    }
}
