use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sspa_utils::{jsonify, u8s_from_str};
use std::{fmt, str::FromStr};

/// Identifies an instance: `(#projects, #students, index)`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub num_projects: usize,
    pub num_students: usize,
    pub instance_index: usize,
}

impl InstanceKey {
    pub fn new(num_projects: usize, num_students: usize, instance_index: usize) -> Self {
        Self {
            num_projects,
            num_students,
            instance_index,
        }
    }

    /// Seed for instance generation, derived only from the key.
    pub fn calc_seed(&self) -> [u8; 32] {
        let canonical = jsonify(self).unwrap_or_else(|_| self.to_string());
        u8s_from_str(&canonical)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_projects_{}_students_{}",
            self.num_projects, self.num_students, self.instance_index
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    LocalBranching,
    VariableFixing,
    SolverAlone,
}

impl Method {
    pub const ALL: [Method; 3] = [
        Method::LocalBranching,
        Method::VariableFixing,
        Method::SolverAlone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::LocalBranching => "local_branching",
            Method::VariableFixing => "variable_fixing",
            Method::SolverAlone => "solver_alone",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown method '{}'", s))
    }
}
