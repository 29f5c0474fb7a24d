use crate::{solver::SolveStatus, MatchingError, MatchingResult};
use serde::{Deserialize, Serialize};
use sspa_instances::{Assignment, GroupSlot};
use sspa_structs::core::{InstanceKey, Method};
use std::time::Duration;

/// Best solution known to a running heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent {
    pub assignment: Assignment,
    pub objective: i64,
    /// Time since the start of the run.
    pub found_at: Duration,
    /// Solver status of the call that produced it, `None` for a warm start.
    pub status: Option<SolveStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initial,
    LocalBranching { radius: usize },
    Diversification { min_radius: usize, max_radius: usize },
    Fixing { free_students: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected,
    Failed,
}

/// One solver call of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub iteration: usize,
    pub phase: Phase,
    pub status: SolveStatus,
    pub verdict: Verdict,
    /// Incumbent objective after the call.
    pub incumbent_objective: Option<i64>,
    pub elapsed_secs: f64,
    pub time_limit_secs: f64,
    /// Students whose group changed on acceptance.
    pub changed_students: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The solver proved the incumbent optimal.
    Optimal,
    /// Local branching ran past its maximum radius.
    Exhausted,
    /// Variable fixing completed a rotation without improvement.
    Converged,
    TimeLimit,
    Cancelled,
    /// The base model was proven infeasible.
    Infeasible,
    /// No feasible solution was found before the run ended.
    NoFeasibleSolution,
    /// A fatal solver condition ended the run, see [`RunResult::failure`].
    Aborted,
}

/// Final output of a run. Read-only once returned.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub(crate) method: Method,
    pub(crate) key: InstanceKey,
    pub(crate) status: RunStatus,
    pub(crate) failure: Option<MatchingError>,
    pub(crate) incumbent: Option<Incumbent>,
    pub(crate) best_bound: Option<f64>,
    pub(crate) elapsed: Duration,
    pub(crate) trace: Vec<TraceEntry>,
}

impl RunResult {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Fatal condition that ended the run early, if any.
    pub fn failure(&self) -> Option<&MatchingError> {
        self.failure.as_ref()
    }

    pub fn has_solution(&self) -> bool {
        self.incumbent.is_some()
    }

    pub fn incumbent(&self) -> MatchingResult<&Incumbent> {
        self.incumbent.as_ref().ok_or(MatchingError::NoSolution)
    }

    pub fn objective(&self) -> MatchingResult<i64> {
        Ok(self.incumbent()?.objective)
    }

    pub fn assignment(&self) -> MatchingResult<&Assignment> {
        Ok(&self.incumbent()?.assignment)
    }

    pub fn student_assignment(&self, student: usize) -> MatchingResult<Option<GroupSlot>> {
        Ok(self.assignment()?.slot(student))
    }

    /// Realized groups of `project` as `(group id, members)`.
    pub fn project_groups(&self, project: usize) -> MatchingResult<Vec<(usize, Vec<usize>)>> {
        Ok(self.assignment()?.project_groups(project))
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of solver calls issued.
    pub fn iterations(&self) -> usize {
        self.trace.len()
    }

    pub fn best_bound(&self) -> Option<f64> {
        self.best_bound
    }

    /// Relative optimality gap, when a bound is known.
    pub fn gap(&self) -> MatchingResult<Option<f64>> {
        let objective = self.objective()? as f64;
        Ok(self
            .best_bound
            .map(|bound| (bound - objective).max(0.0) / objective.abs().max(1.0)))
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            method: self.method,
            key: self.key,
            status: self.status,
            failure: self.failure.as_ref().map(|e| e.to_string()),
            objective: self.incumbent.as_ref().map(|i| i.objective),
            best_bound: self.best_bound,
            elapsed_secs: self.elapsed.as_secs_f64(),
            iterations: self.iterations(),
            assignment: self.incumbent.as_ref().map(|i| i.assignment.clone()),
            trace: self.trace.clone(),
        }
    }
}

/// Serializable view of a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub method: Method,
    pub key: InstanceKey,
    pub status: RunStatus,
    pub failure: Option<String>,
    pub objective: Option<i64>,
    pub best_bound: Option<f64>,
    pub elapsed_secs: f64,
    pub iterations: usize,
    pub assignment: Option<Assignment>,
    pub trace: Vec<TraceEntry>,
}
