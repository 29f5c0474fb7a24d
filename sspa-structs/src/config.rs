use crate::serializable_struct_with_defaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a single solver call may run, before capping by the remaining budget.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TimeSlice {
    Fixed { secs: f64 },
    FractionOfRemaining { fraction: f64 },
}

impl TimeSlice {
    pub fn duration(&self, remaining: Duration) -> Duration {
        let slice = match *self {
            TimeSlice::Fixed { secs } => Duration::from_secs_f64(secs.max(0.0)),
            TimeSlice::FractionOfRemaining { fraction } => remaining.mul_f64(fraction.max(0.0)),
        };
        slice.min(remaining)
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            TimeSlice::Fixed { secs } if !(secs > 0.0 && secs.is_finite()) => {
                Err(format!("fixed time slice must be positive, got {}", secs))
            }
            TimeSlice::FractionOfRemaining { fraction } if !(fraction > 0.0 && fraction <= 1.0) => {
                Err(format!(
                    "time slice fraction must be in (0, 1], got {}",
                    fraction
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Whether an equal-objective solution may replace the incumbent.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    Strict,
    NonStrict,
}

serializable_struct_with_defaults! {
    RunConfig {
        time_limit_secs: f64 = 60.0,
        initial_slice: TimeSlice = TimeSlice::FractionOfRemaining { fraction: 0.25 },
        iteration_slice: TimeSlice = TimeSlice::Fixed { secs: 10.0 },
        acceptance: Acceptance = Acceptance::Strict,
        /// Consecutive solver errors tolerated before the run is aborted.
        max_consecutive_failures: usize = 5,
    }
}

impl RunConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit_secs.max(0.0))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.time_limit_secs > 0.0 && self.time_limit_secs.is_finite()) {
            return Err(format!(
                "time limit must be positive, got {}",
                self.time_limit_secs
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err("max_consecutive_failures must be at least 1".to_string());
        }
        self.initial_slice.validate()?;
        self.iteration_slice.validate()
    }
}

/// A Hamming radius, absolute or relative to the largest possible distance.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Radius {
    Absolute(usize),
    Fraction(f64),
}

impl Radius {
    pub fn resolve(&self, max_distance: usize) -> usize {
        match *self {
            Radius::Absolute(k) => k,
            Radius::Fraction(f) => (f * max_distance as f64).round() as usize,
        }
    }
}

serializable_struct_with_defaults! {
    LocalBranchingConfig {
        initial_radius: Radius = Radius::Fraction(0.1),
        radius_step: Radius = Radius::Fraction(0.1),
        max_radius: Radius = Radius::Fraction(0.4),
        /// Shakes performed after the neighbourhood is exhausted.
        diversifications: usize = 0,
    }
}

impl LocalBranchingConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, radius) in [
            ("initial_radius", self.initial_radius),
            ("radius_step", self.radius_step),
            ("max_radius", self.max_radius),
        ] {
            match radius {
                Radius::Absolute(0) => return Err(format!("{} must be positive", name)),
                Radius::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                    return Err(format!("{} fraction must be in (0, 1], got {}", name, f))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Number of students whose assignment variables stay free in one iteration.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FreeSetSize {
    Fraction(f64),
    Count(usize),
}

impl FreeSetSize {
    pub fn resolve(&self, num_students: usize) -> usize {
        let n = match *self {
            FreeSetSize::Fraction(f) => (f * num_students as f64 - 1e-9).ceil() as usize,
            FreeSetSize::Count(c) => c,
        };
        n.clamp(1, num_students.max(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            FreeSetSize::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(format!("free set fraction must be in (0, 1], got {}", f))
            }
            FreeSetSize::Count(0) => Err("free set count must be positive".to_string()),
            _ => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationOrder {
    /// Students in index order.
    Sequential,
    /// A fresh seeded shuffle every rotation.
    Shuffled,
    /// Students contributing least to the incumbent objective first.
    PreferenceWeighted,
}

serializable_struct_with_defaults! {
    VariableFixingConfig {
        free_set: FreeSetSize = FreeSetSize::Fraction(0.3),
        /// Ceiling for widening the free set after a rotation without improvement.
        max_free_set: Option<FreeSetSize> = None,
        rotation: RotationOrder = RotationOrder::Shuffled,
        seed: u64 = 0,
    }
}

impl VariableFixingConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.free_set.validate()?;
        if let Some(max) = &self.max_free_set {
            max.validate()?;
        }
        Ok(())
    }
}

serializable_struct_with_defaults! {
    /// Everything a run can be configured with, as read from one json document.
    Settings {
        run: RunConfig = RunConfig::default(),
        local_branching: LocalBranchingConfig = LocalBranchingConfig::default(),
        variable_fixing: VariableFixingConfig = VariableFixingConfig::default(),
    }
}
