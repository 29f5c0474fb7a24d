mod common;

use common::*;
use sspa_algorithms::{
    local_branching, model::build, run_method, run_solver_alone, run_variable_fixing,
    solver::GoodLpSolver, variable_fixing, RunOptions, RunStatus,
};
use sspa_instances::{GeneratedInstances, InstanceSource};
use sspa_structs::{
    config::{
        FreeSetSize, LocalBranchingConfig, Radius, RotationOrder, RunConfig, Settings,
        VariableFixingConfig,
    },
    core::{InstanceKey, Method},
};
use std::time::Duration;

fn key() -> InstanceKey {
    InstanceKey::new(2, 6, 0)
}

#[test]
fn test_generous_time_limit_reaches_the_optimum() {
    let source = FixedSource(toy_instance());
    let settings = Settings::default();
    let mut solver = GoodLpSolver::new();

    let alone = run_solver_alone(
        &source,
        &key(),
        Duration::from_secs(300),
        &settings,
        &mut solver,
        RunOptions::default(),
    )
    .unwrap();
    let fixing = run_variable_fixing(
        &source,
        &key(),
        Duration::from_secs(300),
        &settings,
        &mut solver,
        RunOptions::default(),
    )
    .unwrap();

    assert_eq!(alone.status(), RunStatus::Optimal);
    assert_eq!(alone.objective().unwrap(), 30);
    assert_eq!(fixing.objective().unwrap(), alone.objective().unwrap());
    assert!((alone.best_bound().unwrap() - 30.0).abs() < 1e-4);
    assert!(alone.gap().unwrap().unwrap() < 1e-4);
    assert_eq!(
        alone.project_groups(0).unwrap(),
        vec![(0, vec![0, 1, 2])]
    );
    assert_eq!(alone.method(), Method::SolverAlone);
    assert_eq!(fixing.method(), Method::VariableFixing);
}

#[test]
fn test_short_time_limit_variable_fixing_keeps_up() {
    let source = FixedSource(toy_instance());
    let settings = Settings::default();
    let mut solver = GoodLpSolver::new();
    let alone = run_solver_alone(
        &source,
        &key(),
        Duration::from_secs(1),
        &settings,
        &mut solver,
        RunOptions::default(),
    )
    .unwrap();
    let fixing = run_variable_fixing(
        &source,
        &key(),
        Duration::from_secs(1),
        &settings,
        &mut solver,
        RunOptions::default(),
    )
    .unwrap();
    let alone = alone.objective().expect("solver alone found no solution");
    let fixing = fixing.objective().expect("variable fixing found no solution");
    assert!(fixing >= alone);
}

#[test]
fn test_variable_fixing_repairs_a_poor_warm_start() {
    let instance = toy_instance();
    let model = build(&instance).unwrap();
    let mut solver = GoodLpSolver::new();
    let config = VariableFixingConfig {
        free_set: FreeSetSize::Count(2),
        rotation: RotationOrder::Sequential,
        ..VariableFixingConfig::default()
    };
    let options = RunOptions {
        cancel: None,
        warm_start: Some(swapped()),
        ..RunOptions::default()
    };
    let result = variable_fixing::run(
        &instance,
        &model,
        &RunConfig::default(),
        &config,
        &mut solver,
        options,
    )
    .unwrap();

    assert_eq!(result.status(), RunStatus::Converged);
    assert_eq!(result.objective().unwrap(), 30);
    assert_eq!(result.assignment().unwrap(), &optimum());
}

#[test]
fn test_local_branching_repairs_a_poor_warm_start() {
    let instance = toy_instance();
    let model = build(&instance).unwrap();
    let mut solver = GoodLpSolver::new();
    let config = LocalBranchingConfig {
        initial_radius: Radius::Absolute(4),
        radius_step: Radius::Absolute(2),
        max_radius: Radius::Absolute(6),
        diversifications: 0,
    };
    let options = RunOptions {
        cancel: None,
        warm_start: Some(swapped()),
        ..RunOptions::default()
    };
    let result = local_branching::run(
        &instance,
        &model,
        &RunConfig::default(),
        &config,
        &mut solver,
        options,
    )
    .unwrap();

    assert_eq!(result.status(), RunStatus::Exhausted);
    assert_eq!(result.objective().unwrap(), 30);
    assert_eq!(result.trace()[0].incumbent_objective, Some(30));
}

#[test]
fn test_generated_instance_end_to_end() {
    let source = GeneratedInstances::default();
    let key = InstanceKey::new(2, 8, 0);
    let mut solver = GoodLpSolver::new();
    for method in Method::ALL {
        let result = run_method(
            method,
            &source,
            &key,
            Duration::from_secs(5),
            &Settings::default(),
            &mut solver,
            RunOptions::default(),
        )
        .unwrap();
        assert_eq!(result.key(), &key);
        if let Ok(assignment) = result.assignment() {
            let instance = source.load(&key).unwrap();
            assert_eq!(
                instance.evaluate(assignment).unwrap(),
                result.objective().unwrap()
            );
        }
    }
}
