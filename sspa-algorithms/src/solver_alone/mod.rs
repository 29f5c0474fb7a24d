use crate::{
    model::Model,
    run::{
        check_warm_start, initialize, invalid_config, End, RunOptions, RunResult, Session,
        Stop,
    },
    solver::{MipSolver, SolveStatus},
    MatchingResult,
};
use logging_timer::time;
use sspa_instances::Instance;
use sspa_structs::{
    config::{RunConfig, TimeSlice},
    core::Method,
};

/// Baseline: hands the unrestricted model to the solver with the whole budget.
///
/// A warm start is returned as is when the budget leaves no room for a call.
#[time]
pub fn run(
    instance: &Instance,
    model: &Model,
    run_config: &RunConfig,
    solver: &mut dyn MipSolver,
    options: RunOptions,
) -> MatchingResult<RunResult> {
    run_config.validate().map_err(invalid_config)?;
    check_warm_start(instance, &options)?;

    let budget = options.budget(run_config);
    let mut session = Session::new(instance, model, run_config, budget, solver);
    let whole_budget = TimeSlice::FractionOfRemaining { fraction: 1.0 };

    let incumbent = match initialize(&mut session, None, whole_budget) {
        Ok(incumbent) => incumbent,
        Err(end) => {
            let fallback = options
                .warm_start
                .and_then(|a| instance.evaluate(&a).ok().map(|o| (a, o)))
                .map(|(a, o)| session.incumbent(a, o, SolveStatus::TimeLimitFeasible));
            return Ok(session.finish(Method::SolverAlone, end, fallback));
        }
    };
    let end = match incumbent.status {
        Some(SolveStatus::Optimal) => End::Optimal,
        _ => End::Stopped(Stop::TimeLimit),
    };
    Ok(session.finish(Method::SolverAlone, end, Some(incumbent)))
}
