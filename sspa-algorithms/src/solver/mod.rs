mod lp_backend;
pub use lp_backend::GoodLpSolver;

use crate::{
    model::{Model, VarId},
    MatchingResult,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    TimeLimitFeasible,
    TimeLimitNoFeasible,
    Infeasible,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    pub status: SolveStatus,
    /// One value per model variable; present unless no solution was found.
    pub values: Option<Vec<f64>>,
    pub objective: Option<f64>,
    pub bound: Option<f64>,
    pub elapsed: Duration,
    /// Diagnostic attached to `Error` results.
    pub message: Option<String>,
}

impl SolveResult {
    pub fn error(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Error,
            values: None,
            objective: None,
            bound: None,
            elapsed,
            message: Some(message.into()),
        }
    }

    pub fn without_solution(status: SolveStatus, elapsed: Duration) -> Self {
        Self {
            status,
            values: None,
            objective: None,
            bound: None,
            elapsed,
            message: None,
        }
    }
}

/// Hamming ball (or annulus) around a reference assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBranchingRestriction {
    /// Assignment variables equal to one in the reference.
    pub reference: BTreeSet<VarId>,
    pub max_distance: usize,
    pub min_distance: usize,
    /// Whether the reference may be handed to the solver as a starting point.
    pub warm_start: bool,
}

impl LocalBranchingRestriction {
    /// Distance as `constant + sum(coef * x)` over the assignment variables.
    pub fn distance_terms(&self, model: &Model) -> (f64, Vec<(VarId, f64)>) {
        let terms = model
            .assignment_vars()
            .map(|v| (v, if self.reference.contains(&v) { -1.0 } else { 1.0 }))
            .collect();
        (self.reference.len() as f64, terms)
    }

    pub fn distance(&self, model: &Model, values: &[f64]) -> f64 {
        let (constant, terms) = self.distance_terms(model);
        constant + terms.iter().map(|&(v, c)| c * values[v.0]).sum::<f64>()
    }
}

/// Iteration-scoped narrowing of the base model for a single solver call.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    None,
    /// Variables pinned to the given values.
    Fixing(BTreeMap<VarId, f64>),
    LocalBranching(LocalBranchingRestriction),
}

impl Restriction {
    pub fn is_satisfied_by(&self, model: &Model, values: &[f64], tolerance: f64) -> bool {
        match self {
            Restriction::None => true,
            Restriction::Fixing(fixed) => fixed
                .iter()
                .all(|(v, &value)| (values[v.0] - value).abs() <= tolerance),
            Restriction::LocalBranching(lb) => {
                let distance = lb.distance(model, values);
                distance <= lb.max_distance as f64 + tolerance
                    && distance + tolerance >= lb.min_distance as f64
            }
        }
    }
}

/// The only point of contact with a MIP solver.
///
/// Implementations must return within `time_limit` and must not keep any
/// restriction beyond the call. An `Err` means the solver cannot be reached at
/// all; every other failure is reported as [`SolveStatus::Error`].
pub trait MipSolver {
    fn name(&self) -> &str;

    fn solve(
        &mut self,
        model: &Model,
        restriction: &Restriction,
        time_limit: Duration,
    ) -> MatchingResult<SolveResult>;
}
