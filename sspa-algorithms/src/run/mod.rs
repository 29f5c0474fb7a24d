mod budget;
pub use budget::*;
mod result;
pub use result::*;
mod session;
pub(crate) use session::*;

use crate::{solver::Restriction, solver::SolveStatus, MatchingError, MatchingResult};
use log::info;
use sspa_instances::{Assignment, Instance};
use sspa_structs::config::{Acceptance, RunConfig, TimeSlice};
use std::time::Instant;

/// Per-run inputs that are not configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cancel: Option<CancelFlag>,
    /// Feasible assignment to start from instead of an initial solve.
    pub warm_start: Option<Assignment>,
    /// When the run's clock started, if set-up work preceded the strategy.
    pub started: Option<Instant>,
}

impl RunOptions {
    pub(crate) fn budget(&self, run_config: &RunConfig) -> Budget {
        Budget::starting_at(
            self.started.unwrap_or_else(Instant::now),
            run_config.time_limit(),
            self.cancel.clone(),
        )
    }
}

pub(crate) fn invalid_config(reason: String) -> MatchingError {
    MatchingError::InvalidConfiguration { reason }
}

pub(crate) fn check_warm_start(instance: &Instance, options: &RunOptions) -> MatchingResult<()> {
    if let Some(warm_start) = &options.warm_start {
        instance
            .verify_assignment(warm_start)
            .map_err(|e| invalid_config(format!("warm start is infeasible: {}", e)))?;
    }
    Ok(())
}

/// Whether `objective`/`assignment` should replace `incumbent`.
pub(crate) fn improves(
    acceptance: Acceptance,
    incumbent: &Incumbent,
    objective: i64,
    assignment: &Assignment,
) -> bool {
    match acceptance {
        Acceptance::Strict => objective > incumbent.objective,
        Acceptance::NonStrict => {
            objective > incumbent.objective
                || (objective == incumbent.objective && *assignment != incumbent.assignment)
        }
    }
}

/// Secures a first incumbent, from the warm start or from unrestricted solves.
pub(crate) fn initialize(
    session: &mut Session,
    warm_start: Option<Assignment>,
    slice: TimeSlice,
) -> Result<Incumbent, End> {
    if let Some(assignment) = warm_start {
        if let Ok(objective) = session.instance.evaluate(&assignment) {
            info!("starting from warm start with objective {}", objective);
            return Ok(Incumbent {
                assignment,
                objective,
                found_at: session.budget.elapsed(),
                status: None,
            });
        }
    }
    loop {
        match session.call(Phase::Initial, &Restriction::None, slice, None) {
            Err(stop) => return Err(End::Stopped(stop)),
            Ok(CallOutcome::Solved {
                assignment,
                objective,
                status,
            }) => {
                let incumbent = session.incumbent(assignment, objective, status);
                session.record(Phase::Initial, status, Verdict::Accepted, Some(&incumbent), Vec::new());
                info!("initial incumbent {} ({:?})", objective, status);
                return Ok(incumbent);
            }
            Ok(CallOutcome::NoSolution { status }) => {
                session.record(Phase::Initial, status, Verdict::Rejected, None, Vec::new());
                if status == SolveStatus::Infeasible {
                    return Err(End::Infeasible);
                }
            }
            Ok(CallOutcome::Failed) => {}
        }
    }
}
