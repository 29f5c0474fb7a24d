mod rotation;
pub use rotation::Rotation;

use crate::{
    model::Model,
    run::{
        check_warm_start, improves, initialize, invalid_config, CallOutcome, End, Phase,
        RunOptions, RunResult, Session, Verdict,
    },
    solver::{MipSolver, Restriction, SolveStatus},
    MatchingResult,
};
use log::{debug, info};
use logging_timer::time;
use sspa_instances::{Assignment, GroupSlot, Instance};
use sspa_structs::{
    config::{RunConfig, VariableFixingConfig},
    core::Method,
};
use std::collections::BTreeMap;

/// Renumbers every project's groups so that groups holding at least one fixed
/// student come first, keeping relative order otherwise.
///
/// Groups are interchangeable within a project, so the objective is unchanged,
/// while free students become able to close or open trailing groups.
pub fn relabel_groups(assignment: &Assignment, free: &[bool]) -> Assignment {
    let mut by_project: BTreeMap<usize, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (slot, members) in assignment.groups() {
        let (anchored, loose) = by_project.entry(slot.project).or_default();
        if members.iter().any(|&s| !free.get(s).copied().unwrap_or(false)) {
            anchored.push(slot.group);
        } else {
            loose.push(slot.group);
        }
    }
    let mut renumbered: BTreeMap<GroupSlot, GroupSlot> = BTreeMap::new();
    for (project, (anchored, loose)) in by_project {
        for (new_group, old_group) in anchored.into_iter().chain(loose).enumerate() {
            renumbered.insert(
                GroupSlot::new(project, old_group),
                GroupSlot::new(project, new_group),
            );
        }
    }
    Assignment::new(
        assignment
            .slots
            .iter()
            .map(|slot| renumbered.get(slot).copied().unwrap_or(*slot))
            .collect(),
    )
}

/// Variable fixing: each iteration frees the assignment variables of a window
/// of students, fixes everyone else to the incumbent and re-solves.
///
/// Stops once every student has been free in a completed call since the last
/// improvement (the free set is widened first when `max_free_set` allows it)
/// or when the time budget runs out.
#[time]
pub fn run(
    instance: &Instance,
    model: &Model,
    run_config: &RunConfig,
    config: &VariableFixingConfig,
    solver: &mut dyn MipSolver,
    options: RunOptions,
) -> MatchingResult<RunResult> {
    run_config.validate().map_err(invalid_config)?;
    config.validate().map_err(invalid_config)?;
    check_warm_start(instance, &options)?;

    let n = instance.num_students();
    let base_size = config.free_set.resolve(n);
    let max_size = config
        .max_free_set
        .map_or(base_size, |m| m.resolve(n))
        .max(base_size);

    let budget = options.budget(run_config);
    let mut session = Session::new(instance, model, run_config, budget, solver);

    let mut incumbent = match initialize(&mut session, options.warm_start, run_config.initial_slice) {
        Ok(incumbent) => incumbent,
        Err(end) => return Ok(session.finish(Method::VariableFixing, end, None)),
    };
    if incumbent.status == Some(SolveStatus::Optimal) || n == 0 {
        return Ok(session.finish(Method::VariableFixing, End::Optimal, Some(incumbent)));
    }

    let mut rotation = Rotation::new(config.rotation, config.seed);
    let mut size = base_size;
    let mut covered = vec![false; n];
    let mut num_covered = 0;

    let end = loop {
        // partitioning
        let free_students = rotation.next_free_set(size, instance, &incumbent.assignment);
        let mut free = vec![false; n];
        for &s in &free_students {
            free[s] = true;
        }
        let reference = relabel_groups(&incumbent.assignment, &free);
        let fixing = Restriction::Fixing(model.fixing(&reference, &free));
        let phase = Phase::Fixing {
            free_students: free_students.len(),
        };

        match session.call(phase, &fixing, run_config.iteration_slice, Some(&incumbent)) {
            Err(stop) => break End::Stopped(stop),
            Ok(CallOutcome::Solved {
                assignment,
                objective,
                status,
            }) if improves(run_config.acceptance, &incumbent, objective, &assignment)
                && assignment != reference =>
            {
                let changed = assignment.moved_students(&reference);
                info!(
                    "{} free students: incumbent {} -> {} ({} moved)",
                    free_students.len(),
                    incumbent.objective,
                    objective,
                    changed.len()
                );
                incumbent = session.incumbent(assignment, objective, status);
                session.record(phase, status, Verdict::Accepted, Some(&incumbent), changed);
                covered.iter_mut().for_each(|c| *c = false);
                num_covered = 0;
                size = base_size;
                continue;
            }
            Ok(CallOutcome::Solved { status, .. }) | Ok(CallOutcome::NoSolution { status }) => {
                session.record(phase, status, Verdict::Rejected, Some(&incumbent), Vec::new());
                for &s in &free_students {
                    if !covered[s] {
                        covered[s] = true;
                        num_covered += 1;
                    }
                }
            }
            // a failed call explored nothing
            Ok(CallOutcome::Failed) => continue,
        }

        if num_covered == n {
            if size >= max_size {
                info!("rotation over {} students brought no improvement", size);
                break End::Converged;
            }
            size = (size * 2).min(max_size);
            debug!("widening the free set to {} students", size);
            covered.iter_mut().for_each(|c| *c = false);
            num_covered = 0;
        }
    };

    Ok(session.finish(Method::VariableFixing, end, Some(incumbent)))
}
