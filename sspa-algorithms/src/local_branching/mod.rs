use crate::{
    model::Model,
    run::{
        check_warm_start, improves, initialize, invalid_config, CallOutcome, End, Incumbent,
        Phase, RunOptions, RunResult, Session, Stop, Verdict,
    },
    solver::{LocalBranchingRestriction, MipSolver, Restriction, SolveStatus},
    MatchingError, MatchingResult,
};
use log::{debug, info};
use logging_timer::time;
use sspa_instances::{Assignment, Instance};
use sspa_structs::{
    config::{Acceptance, LocalBranchingConfig, RunConfig},
    core::Method,
};

/// Neighbourhood radii resolved against an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Radii {
    pub initial: usize,
    pub step: usize,
    pub max: usize,
}

impl Radii {
    /// Fractions refer to the largest Hamming distance, two per student.
    pub fn resolve(config: &LocalBranchingConfig, num_students: usize) -> Self {
        let max_distance = 2 * num_students;
        let initial = config.initial_radius.resolve(max_distance).max(1);
        Self {
            initial,
            step: config.radius_step.resolve(max_distance).max(1),
            max: config.max_radius.resolve(max_distance).max(initial),
        }
    }

    /// Radius after one without an improvement, or `None` once the maximum was searched.
    pub fn widen(&self, k: usize) -> Option<usize> {
        (k < self.max).then(|| (k + self.step).min(self.max))
    }
}

/// Current point of the descent, which differs from the incumbent only after a shake.
struct Center {
    assignment: Assignment,
    objective: i64,
}

impl Center {
    fn of(incumbent: &Incumbent) -> Self {
        Self {
            assignment: incumbent.assignment.clone(),
            objective: incumbent.objective,
        }
    }
}

/// Band `[min_distance, max_distance]` around `center`, or `None` when the
/// center does not map onto the model's assignment variables.
fn restriction(
    model: &Model,
    center: &Assignment,
    min_distance: usize,
    max_distance: usize,
) -> Option<Restriction> {
    Some(Restriction::LocalBranching(LocalBranchingRestriction {
        reference: model.ones(center)?,
        max_distance,
        min_distance,
        warm_start: min_distance == 0,
    }))
}

fn unmapped_center() -> End {
    End::Stopped(Stop::Fatal(MatchingError::MalformedInstance {
        reason: "center assignment has no counterpart in the model".to_string(),
    }))
}

/// Local branching: repeatedly solve the Hamming ball of radius `k` around the
/// incumbent, resetting `k` on improvement and widening it up to the maximum
/// radius otherwise. Once a ball is proven free of improvements only the
/// shell beyond it is searched.
#[time]
pub fn run(
    instance: &Instance,
    model: &Model,
    run_config: &RunConfig,
    config: &LocalBranchingConfig,
    solver: &mut dyn MipSolver,
    options: RunOptions,
) -> MatchingResult<RunResult> {
    run_config.validate().map_err(invalid_config)?;
    config.validate().map_err(invalid_config)?;
    check_warm_start(instance, &options)?;

    let radii = Radii::resolve(config, instance.num_students());
    let budget = options.budget(run_config);
    let mut session = Session::new(instance, model, run_config, budget, solver);

    let mut incumbent = match initialize(&mut session, options.warm_start, run_config.initial_slice) {
        Ok(incumbent) => incumbent,
        Err(end) => return Ok(session.finish(Method::LocalBranching, end, None)),
    };
    if incumbent.status == Some(SolveStatus::Optimal) {
        return Ok(session.finish(Method::LocalBranching, End::Optimal, Some(incumbent)));
    }

    let mut center = Center::of(&incumbent);
    let mut diversifications_left = config.diversifications;
    let mut radius = Some(radii.initial);
    // Every point closer than this to the center is known not to improve on it.
    let mut searched = 0;

    let end = loop {
        let Some(k) = radius else {
            if diversifications_left == 0 {
                info!("neighbourhood exhausted at radius {}", radii.max);
                break End::Exhausted;
            }
            diversifications_left -= 1;
            let phase = Phase::Diversification {
                min_radius: radii.initial,
                max_radius: radii.max,
            };
            let Some(shake) = restriction(model, &incumbent.assignment, radii.initial, radii.max)
            else {
                break unmapped_center();
            };
            match session.call(phase, &shake, run_config.iteration_slice, Some(&incumbent)) {
                Err(stop) => break End::Stopped(stop),
                Ok(CallOutcome::Solved {
                    assignment,
                    objective,
                    status,
                }) => {
                    let changed = assignment.moved_students(&incumbent.assignment);
                    let verdict =
                        if improves(run_config.acceptance, &incumbent, objective, &assignment) {
                            incumbent = session.incumbent(assignment.clone(), objective, status);
                            Verdict::Accepted
                        } else {
                            Verdict::Rejected
                        };
                    session.record(phase, status, verdict, Some(&incumbent), changed);
                    debug!("shaken to objective {}", objective);
                    center = Center {
                        assignment,
                        objective,
                    };
                    radius = Some(radii.initial);
                    searched = 0;
                }
                Ok(CallOutcome::NoSolution { status }) => {
                    session.record(phase, status, Verdict::Rejected, Some(&incumbent), Vec::new());
                    break End::Exhausted;
                }
                Ok(CallOutcome::Failed) => {}
            }
            continue;
        };

        let phase = Phase::LocalBranching { radius: k };
        let Some(ball) = restriction(model, &center.assignment, searched, k) else {
            break unmapped_center();
        };
        match session.call(phase, &ball, run_config.iteration_slice, Some(&incumbent)) {
            Err(stop) => break End::Stopped(stop),
            Ok(CallOutcome::Solved {
                assignment,
                objective,
                status,
            }) => {
                let moves_center = objective > center.objective
                    || (run_config.acceptance == Acceptance::NonStrict
                        && objective == center.objective
                        && assignment != center.assignment);
                if !moves_center {
                    session.record(phase, status, Verdict::Rejected, Some(&incumbent), Vec::new());
                    if status == SolveStatus::Optimal {
                        searched = k + 1;
                    }
                    radius = radii.widen(k);
                    continue;
                }
                let changed = assignment.moved_students(&center.assignment);
                let verdict = if improves(run_config.acceptance, &incumbent, objective, &assignment) {
                    info!("radius {}: incumbent {} -> {}", k, incumbent.objective, objective);
                    incumbent = session.incumbent(assignment.clone(), objective, status);
                    Verdict::Accepted
                } else {
                    Verdict::Rejected
                };
                session.record(phase, status, verdict, Some(&incumbent), changed);
                center = Center {
                    assignment,
                    objective,
                };
                radius = Some(radii.initial);
                searched = 0;
            }
            Ok(CallOutcome::NoSolution { status }) => {
                session.record(phase, status, Verdict::Rejected, Some(&incumbent), Vec::new());
                if status == SolveStatus::Infeasible {
                    searched = k + 1;
                }
                radius = radii.widen(k);
            }
            Ok(CallOutcome::Failed) => {}
        }
    };

    Ok(session.finish(Method::LocalBranching, end, Some(incumbent)))
}
