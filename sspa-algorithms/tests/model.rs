mod common;

use common::*;
use sspa_algorithms::{
    model::{build, Sense, VarKind},
    solver::{GoodLpSolver, LocalBranchingRestriction, MipSolver, Restriction, SolveStatus},
    MatchingError,
};
use sspa_instances::{GroupSlot, Instance, Project, Student};
use sspa_structs::core::InstanceKey;
use std::time::Duration;

#[test]
fn test_build_is_deterministic() {
    let instance = toy_instance();
    assert_eq!(build(&instance).unwrap(), build(&instance).unwrap());
}

#[test]
fn test_variable_layout() {
    let model = build(&toy_instance()).unwrap();
    // 2 projects x 2 groups
    assert_eq!(model.slots().len(), 4);
    assert_eq!(model.num_assignment_vars(), 24);
    // assignment, open, together, surplus + deficit
    assert_eq!(model.variables().len(), 24 + 4 + 6 + 8);
    for (i, var) in model.variables().iter().take(24).enumerate() {
        assert!(matches!(var.kind, VarKind::Assign { student, .. } if student == i % 6));
    }
    let x = model.assign_var(4, GroupSlot::new(1, 1)).unwrap();
    assert_eq!(model.variables()[x.0].objective, 3.0);
    let open = model.var(&VarKind::Open(GroupSlot::new(0, 1))).unwrap();
    assert_eq!(model.variables()[open.0].objective, -1.0);
    let open = model.var(&VarKind::Open(GroupSlot::new(0, 0))).unwrap();
    assert_eq!(model.variables()[open.0].objective, 0.0);
}

#[test]
fn test_one_group_per_student_constraints() {
    let model = build(&toy_instance()).unwrap();
    let one_group: Vec<_> = model
        .constraints()
        .iter()
        .filter(|c| c.name.starts_with("one_group"))
        .collect();
    assert_eq!(one_group.len(), 6);
    assert!(one_group
        .iter()
        .all(|c| c.sense == Sense::Equal && c.rhs == 1.0 && c.terms.len() == 4));
}

#[test]
fn test_optimum_is_feasible_in_the_model() {
    let model = build(&toy_instance()).unwrap();
    let mut values = values_for(&model, &optimum());
    for slot in [GroupSlot::new(0, 0), GroupSlot::new(1, 0)] {
        values[model.var(&VarKind::Open(slot)).unwrap().0] = 1.0;
    }
    for (first, second) in toy_instance().mutual_pairs() {
        values[model.var(&VarKind::Together { first, second }).unwrap().0] = 1.0;
    }
    assert!(model.is_feasible(&values, 1e-6));
    assert_eq!(model.objective_value(&values), 30.0);
    assert_eq!(model.decode(&values), Some(optimum()));

    // without its open group the assignment breaks the size bounds
    values[model.var(&VarKind::Open(GroupSlot::new(1, 0))).unwrap().0] = 0.0;
    assert!(!model.is_feasible(&values, 1e-6));
}

#[test]
fn test_decode_rejects_double_placement() {
    let model = build(&toy_instance()).unwrap();
    let mut values = values_for(&model, &optimum());
    assert_eq!(model.decode(&values), Some(optimum()));
    values[model.assign_var(0, GroupSlot::new(1, 1)).unwrap().0] = 1.0;
    assert_eq!(model.decode(&values), None);
    assert_eq!(model.decode(&values[1..]), None);
}

#[test]
fn test_fixing_pins_only_fixed_students() {
    let model = build(&toy_instance()).unwrap();
    let free = [true, false, false, false, false, true];
    let fixed = model.fixing(&optimum(), &free);
    assert_eq!(fixed.len(), 4 * 4);
    assert_eq!(free_students(&model, &Restriction::Fixing(fixed.clone())), vec![0, 5]);
    let x = model.assign_var(2, GroupSlot::new(0, 0)).unwrap();
    assert_eq!(fixed[&x], 1.0);
    let x = model.assign_var(2, GroupSlot::new(0, 1)).unwrap();
    assert_eq!(fixed[&x], 0.0);
}

#[test]
fn test_malformed_instance_is_rejected() {
    let mut instance = toy_instance();
    instance.projects[0].min_group_size = 5;
    match build(&instance) {
        Err(MatchingError::MalformedInstance { reason }) => {
            assert!(reason.contains("min group size"))
        }
        other => panic!("unexpected build result: {:?}", other),
    }
}

#[test]
fn test_unreachable_student_total_is_malformed() {
    let project = Project {
        min_group_size: 3,
        ideal_group_size: 3,
        max_group_size: 3,
        ..toy_project(0)
    };
    let students = (0..4)
        .map(|id| Student {
            id,
            project_preferences: vec![1],
            partner_preferences: Vec::new(),
        })
        .collect();
    let instance = Instance::new(InstanceKey::new(1, 4, 0), 2, vec![project], students);
    assert!(matches!(
        build(&instance),
        Err(MatchingError::MalformedInstance { .. })
    ));
}

#[test]
fn test_good_lp_solves_the_toy_instance() {
    let instance = toy_instance();
    let model = build(&instance).unwrap();
    let mut solver = GoodLpSolver::new();
    let result = solver
        .solve(&model, &Restriction::None, Duration::from_secs(60))
        .unwrap();
    assert_eq!(result.status, SolveStatus::Optimal);
    let values = result.values.unwrap();
    assert!(model.is_feasible(&values, 1e-5));
    let assignment = model.decode(&values).unwrap();
    assert_eq!(instance.evaluate(&assignment).unwrap(), 30);
    assert!((result.objective.unwrap() - 30.0).abs() < 1e-4);
}

#[test]
fn test_good_lp_respects_fixing() {
    let instance = toy_instance();
    let model = build(&instance).unwrap();
    let free = [true, true, false, false, true, true];
    let fixing = Restriction::Fixing(model.fixing(&swapped(), &free));
    let mut solver = GoodLpSolver::new();
    let result = solver
        .solve(&model, &fixing, Duration::from_secs(60))
        .unwrap();
    assert_eq!(result.status, SolveStatus::Optimal);
    let values = result.values.unwrap();
    assert!(fixing.is_satisfied_by(&model, &values, 1e-5));
    let assignment = model.decode(&values).unwrap();
    assert_eq!(assignment.slot(2), Some(GroupSlot::new(1, 0)));
    assert_eq!(assignment.slot(3), Some(GroupSlot::new(0, 0)));
    assert!(instance.evaluate(&assignment).unwrap() >= 16);
}

#[test]
fn test_good_lp_reports_contradictory_fixing_as_infeasible() {
    let model = build(&toy_instance()).unwrap();
    let mut fixed = model.fixing(&optimum(), &[false; 6]);
    // student 0 may sit nowhere
    let x = model.assign_var(0, GroupSlot::new(0, 0)).unwrap();
    fixed.insert(x, 0.0);
    let mut solver = GoodLpSolver::new();
    let result = solver
        .solve(&model, &Restriction::Fixing(fixed), Duration::from_secs(60))
        .unwrap();
    assert_eq!(result.status, SolveStatus::Infeasible);
    assert!(result.values.is_none());
}

#[test]
fn test_good_lp_accepts_a_warm_started_ball() {
    let instance = toy_instance();
    let model = build(&instance).unwrap();
    let ball = Restriction::LocalBranching(LocalBranchingRestriction {
        reference: model.ones(&optimum()).unwrap(),
        max_distance: 0,
        min_distance: 0,
        warm_start: true,
    });
    let mut solver = GoodLpSolver::new();
    let result = solver.solve(&model, &ball, Duration::from_secs(60)).unwrap();
    assert_eq!(result.status, SolveStatus::Optimal);
    let values = result.values.unwrap();
    assert_eq!(model.decode(&values), Some(optimum()));
    assert!((result.bound.unwrap() - 30.0).abs() < 1e-4);
}

#[test]
fn test_good_lp_time_limit_keeps_the_incumbent() {
    let instance = Instance::generate(&InstanceKey::new(8, 60, 0)).unwrap();
    let model = build(&instance).unwrap();
    let mut solver = GoodLpSolver::new();
    let limit = Duration::from_millis(500);
    let result = solver.solve(&model, &Restriction::None, limit).unwrap();
    assert!(result.elapsed < limit + Duration::from_secs(10));
    match result.status {
        SolveStatus::Optimal => assert!(result.bound.is_some()),
        SolveStatus::TimeLimitFeasible => {
            let values = result.values.unwrap();
            assert!(model.is_feasible(&values, 1e-5));
            assert!(model.decode(&values).is_some());
            assert!(result.bound.is_none());
        }
        SolveStatus::TimeLimitNoFeasible => assert!(result.values.is_none()),
        other => panic!("unexpected status {:?}", other),
    }
}

#[test]
fn test_ones_rejects_slots_outside_the_model() {
    let model = build(&toy_instance()).unwrap();
    assert_eq!(model.ones(&optimum()).unwrap().len(), 6);
    let mut stray = optimum();
    stray.slots[0] = GroupSlot::new(0, 5);
    assert_eq!(model.ones(&stray), None);
}
