use super::{Budget, Incumbent, Phase, RunResult, RunStatus, TraceEntry, Verdict};
use crate::{
    model::Model,
    solver::{MipSolver, Restriction, SolveStatus},
    MatchingError,
};
use log::{debug, warn};
use sspa_instances::{Assignment, Instance};
use sspa_structs::{
    config::{RunConfig, TimeSlice},
    core::Method,
};
use std::time::Duration;

/// Calls shorter than this are not worth issuing.
const MIN_CALL: Duration = Duration::from_millis(1);
const TOLERANCE: f64 = 1e-6;

/// Why a run stops before its strategy finishes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stop {
    TimeLimit,
    Cancelled,
    Fatal(MatchingError),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum End {
    Optimal,
    Exhausted,
    Converged,
    Infeasible,
    Stopped(Stop),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallOutcome {
    Solved {
        assignment: Assignment,
        objective: i64,
        status: SolveStatus,
    },
    /// `TimeLimitNoFeasible` or `Infeasible`.
    NoSolution { status: SolveStatus },
    /// Recoverable solver error, already traced.
    Failed,
}

/// Everything one run owns: the solver session, the budget and the trace.
pub(crate) struct Session<'a> {
    pub instance: &'a Instance,
    pub model: &'a Model,
    pub config: &'a RunConfig,
    pub budget: Budget,
    solver: &'a mut dyn MipSolver,
    trace: Vec<TraceEntry>,
    consecutive_failures: usize,
    best_bound: Option<f64>,
    last_time_limit: Duration,
}

impl<'a> Session<'a> {
    pub fn new(
        instance: &'a Instance,
        model: &'a Model,
        config: &'a RunConfig,
        budget: Budget,
        solver: &'a mut dyn MipSolver,
    ) -> Self {
        Self {
            instance,
            model,
            config,
            budget,
            solver,
            trace: Vec::new(),
            consecutive_failures: 0,
            best_bound: None,
            last_time_limit: Duration::ZERO,
        }
    }

    /// Issues one solver call, unless the budget is spent or the run was cancelled.
    pub fn call(
        &mut self,
        phase: Phase,
        restriction: &Restriction,
        slice: TimeSlice,
        incumbent: Option<&Incumbent>,
    ) -> Result<CallOutcome, Stop> {
        if self.budget.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        let time_limit = slice.duration(self.budget.remaining());
        if time_limit < MIN_CALL {
            return Err(Stop::TimeLimit);
        }
        self.last_time_limit = time_limit;

        let result = self
            .solver
            .solve(self.model, restriction, time_limit)
            .map_err(Stop::Fatal)?;
        debug!(
            "{:?}: {:?} in {:.3}s (limit {:.3}s)",
            phase,
            result.status,
            result.elapsed.as_secs_f64(),
            time_limit.as_secs_f64()
        );

        let failure = match (result.status, &result.values) {
            (SolveStatus::Error, _) => result
                .message
                .clone()
                .unwrap_or_else(|| "unspecified solver error".to_string()),
            (SolveStatus::TimeLimitNoFeasible | SolveStatus::Infeasible, _) => {
                self.consecutive_failures = 0;
                return Ok(CallOutcome::NoSolution {
                    status: result.status,
                });
            }
            (_, None) => format!("{:?} reported without a solution", result.status),
            (_, Some(values)) => match self.read_solution(restriction, values) {
                Ok((assignment, objective)) => {
                    self.consecutive_failures = 0;
                    if matches!(restriction, Restriction::None) {
                        self.tighten_bound(result.bound);
                    }
                    if let Some(reported) = result.objective {
                        if (reported - objective as f64).abs() > TOLERANCE * (objective.abs().max(1) as f64) {
                            debug!(
                                "solver objective {} differs from evaluated objective {}",
                                reported, objective
                            );
                        }
                    }
                    return Ok(CallOutcome::Solved {
                        assignment,
                        objective,
                        status: result.status,
                    });
                }
                Err(reason) => reason,
            },
        };

        self.consecutive_failures += 1;
        warn!(
            "solver call failed ({} in a row): {}",
            self.consecutive_failures, failure
        );
        self.record(
            phase,
            SolveStatus::Error,
            Verdict::Failed,
            incumbent,
            Vec::new(),
        );
        if self.consecutive_failures >= self.config.max_consecutive_failures {
            return Err(Stop::Fatal(MatchingError::RepeatedSolverFailure {
                consecutive: self.consecutive_failures,
                last_reason: failure,
            }));
        }
        Ok(CallOutcome::Failed)
    }

    fn read_solution(
        &self,
        restriction: &Restriction,
        values: &[f64],
    ) -> Result<(Assignment, i64), String> {
        if values.len() != self.model.variables().len() {
            return Err(format!(
                "solution has {} values for {} variables",
                values.len(),
                self.model.variables().len()
            ));
        }
        if !restriction.is_satisfied_by(self.model, values, TOLERANCE) {
            return Err("solution violates the restriction".to_string());
        }
        let assignment = self
            .model
            .decode(values)
            .ok_or_else(|| "solution does not place every student exactly once".to_string())?;
        let objective = self
            .instance
            .evaluate(&assignment)
            .map_err(|e| format!("solution is infeasible: {}", e))?;
        Ok((assignment, objective))
    }

    fn tighten_bound(&mut self, bound: Option<f64>) {
        if let Some(bound) = bound {
            self.best_bound = Some(self.best_bound.map_or(bound, |b| b.min(bound)));
        }
    }

    pub fn record(
        &mut self,
        phase: Phase,
        status: SolveStatus,
        verdict: Verdict,
        incumbent: Option<&Incumbent>,
        changed_students: Vec<usize>,
    ) {
        self.trace.push(TraceEntry {
            iteration: self.trace.len(),
            phase,
            status,
            verdict,
            incumbent_objective: incumbent.map(|i| i.objective),
            elapsed_secs: self.budget.elapsed().as_secs_f64(),
            time_limit_secs: self.last_time_limit.as_secs_f64(),
            changed_students,
        });
    }

    /// Builds the incumbent for a solution found just now.
    pub fn incumbent(&self, assignment: Assignment, objective: i64, status: SolveStatus) -> Incumbent {
        Incumbent {
            assignment,
            objective,
            found_at: self.budget.elapsed(),
            status: Some(status),
        }
    }

    pub fn finish(self, method: Method, end: End, incumbent: Option<Incumbent>) -> RunResult {
        let (status, failure) = match (end, incumbent.is_some()) {
            (End::Infeasible, _) => (RunStatus::Infeasible, None),
            (End::Stopped(Stop::Fatal(e)), true) => (RunStatus::Aborted, Some(e)),
            (End::Stopped(Stop::Fatal(e)), false) => (RunStatus::NoFeasibleSolution, Some(e)),
            (_, false) => (RunStatus::NoFeasibleSolution, None),
            (End::Optimal, true) => (RunStatus::Optimal, None),
            (End::Exhausted, true) => (RunStatus::Exhausted, None),
            (End::Converged, true) => (RunStatus::Converged, None),
            (End::Stopped(Stop::TimeLimit), true) => (RunStatus::TimeLimit, None),
            (End::Stopped(Stop::Cancelled), true) => (RunStatus::Cancelled, None),
        };
        RunResult {
            method,
            key: self.instance.key,
            status,
            failure,
            incumbent,
            best_bound: self.best_bound,
            elapsed: self.budget.elapsed(),
            trace: self.trace,
        }
    }
}
