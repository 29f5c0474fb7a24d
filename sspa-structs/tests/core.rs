use serde_json::json;
use sspa_structs::{config::*, core::*};
use std::time::Duration;

#[test]
fn test_calc_seed_depends_only_on_key() {
    let key = InstanceKey::new(2, 6, 0);
    assert_eq!(key.calc_seed(), InstanceKey::new(2, 6, 0).calc_seed());
    assert_ne!(key.calc_seed(), InstanceKey::new(2, 6, 1).calc_seed());
    assert_ne!(key.calc_seed(), InstanceKey::new(6, 2, 0).calc_seed());
}

#[test]
fn test_instance_key_display() {
    assert_eq!(
        InstanceKey::new(3, 40, 7).to_string(),
        "3_projects_40_students_7"
    );
}

#[test]
fn test_method_parse() {
    for method in Method::ALL {
        assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
    }
    assert!("gurobi".parse::<Method>().is_err());
}

#[test]
fn test_settings_defaults_fill_missing_fields() {
    let settings: Settings = serde_json::from_value(json!({
        "run": {"time_limit_secs": 5.0},
        "variable_fixing": {"rotation": "sequential", "free_set": {"count": 4}}
    }))
    .unwrap();
    assert_eq!(settings.run.time_limit_secs, 5.0);
    assert_eq!(settings.run.max_consecutive_failures, 5);
    assert_eq!(settings.run.acceptance, Acceptance::Strict);
    assert_eq!(settings.variable_fixing.rotation, RotationOrder::Sequential);
    assert_eq!(settings.variable_fixing.free_set, FreeSetSize::Count(4));
    assert_eq!(settings.local_branching, LocalBranchingConfig::default());
}

#[test]
fn test_time_slice_is_capped_by_remaining() {
    let remaining = Duration::from_secs(4);
    assert_eq!(
        TimeSlice::Fixed { secs: 10.0 }.duration(remaining),
        Duration::from_secs(4)
    );
    assert_eq!(
        TimeSlice::Fixed { secs: 1.0 }.duration(remaining),
        Duration::from_secs(1)
    );
    assert_eq!(
        TimeSlice::FractionOfRemaining { fraction: 0.5 }.duration(remaining),
        Duration::from_secs(2)
    );
    assert_eq!(
        TimeSlice::Fixed { secs: 1.0 }.duration(Duration::ZERO),
        Duration::ZERO
    );
}

#[test]
fn test_radius_and_free_set_resolution() {
    assert_eq!(Radius::Fraction(0.1).resolve(60), 6);
    assert_eq!(Radius::Absolute(4).resolve(60), 4);
    assert_eq!(FreeSetSize::Fraction(0.3).resolve(10), 3);
    assert_eq!(FreeSetSize::Fraction(0.01).resolve(10), 1);
    assert_eq!(FreeSetSize::Count(50).resolve(10), 10);
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut run = RunConfig::default();
    assert!(run.validate().is_ok());
    run.time_limit_secs = 0.0;
    assert!(run.validate().is_err());

    let run = RunConfig {
        max_consecutive_failures: 0,
        ..RunConfig::default()
    };
    assert!(run.validate().is_err());

    let lb = LocalBranchingConfig {
        radius_step: Radius::Absolute(0),
        ..LocalBranchingConfig::default()
    };
    assert!(lb.validate().is_err());

    let vf = VariableFixingConfig {
        free_set: FreeSetSize::Fraction(1.5),
        ..VariableFixingConfig::default()
    };
    assert!(vf.validate().is_err());
}
