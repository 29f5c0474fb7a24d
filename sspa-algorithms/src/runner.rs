use crate::{
    local_branching, model, run::RunOptions, run::RunResult, solver::MipSolver, solver_alone,
    variable_fixing,
};
use anyhow::{anyhow, Result};
use log::info;
use sspa_instances::{Instance, InstanceSource};
use sspa_structs::{
    config::{RunConfig, Settings},
    core::{InstanceKey, Method},
};
use std::time::{Duration, Instant};

fn prepare(
    source: &dyn InstanceSource,
    key: &InstanceKey,
    time_limit: Duration,
    settings: &Settings,
    options: &mut RunOptions,
) -> Result<(Instance, model::Model, RunConfig)> {
    if time_limit.is_zero() {
        return Err(anyhow!("time limit must be positive"));
    }
    // loading and model construction count against the time limit
    options.started.get_or_insert_with(Instant::now);
    let instance = source.load(key)?;
    let model = model::build(&instance)?;
    let mut run_config = settings.run.clone();
    run_config.time_limit_secs = time_limit.as_secs_f64();
    info!(
        "instance {}: {} variables, {} constraints",
        key,
        model.variables().len(),
        model.constraints().len()
    );
    Ok((instance, model, run_config))
}

/// Resolves `key` from `source` and runs local branching for `time_limit`.
pub fn run_local_branching(
    source: &dyn InstanceSource,
    key: &InstanceKey,
    time_limit: Duration,
    settings: &Settings,
    solver: &mut dyn MipSolver,
    mut options: RunOptions,
) -> Result<RunResult> {
    let (instance, model, run_config) = prepare(source, key, time_limit, settings, &mut options)?;
    Ok(local_branching::run(
        &instance,
        &model,
        &run_config,
        &settings.local_branching,
        solver,
        options,
    )?)
}

/// Resolves `key` from `source` and runs variable fixing for `time_limit`.
pub fn run_variable_fixing(
    source: &dyn InstanceSource,
    key: &InstanceKey,
    time_limit: Duration,
    settings: &Settings,
    solver: &mut dyn MipSolver,
    mut options: RunOptions,
) -> Result<RunResult> {
    let (instance, model, run_config) = prepare(source, key, time_limit, settings, &mut options)?;
    Ok(variable_fixing::run(
        &instance,
        &model,
        &run_config,
        &settings.variable_fixing,
        solver,
        options,
    )?)
}

/// Resolves `key` from `source` and solves the full model once.
pub fn run_solver_alone(
    source: &dyn InstanceSource,
    key: &InstanceKey,
    time_limit: Duration,
    settings: &Settings,
    solver: &mut dyn MipSolver,
    mut options: RunOptions,
) -> Result<RunResult> {
    let (instance, model, run_config) = prepare(source, key, time_limit, settings, &mut options)?;
    Ok(solver_alone::run(
        &instance,
        &model,
        &run_config,
        solver,
        options,
    )?)
}

pub fn run_method(
    method: Method,
    source: &dyn InstanceSource,
    key: &InstanceKey,
    time_limit: Duration,
    settings: &Settings,
    solver: &mut dyn MipSolver,
    options: RunOptions,
) -> Result<RunResult> {
    match method {
        Method::LocalBranching => {
            run_local_branching(source, key, time_limit, settings, solver, options)
        }
        Method::VariableFixing => {
            run_variable_fixing(source, key, time_limit, settings, solver, options)
        }
        Method::SolverAlone => run_solver_alone(source, key, time_limit, settings, solver, options),
    }
}
