use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sspa_structs::core::InstanceKey;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Student {
    pub id: usize,
    /// Preference weight for every project, indexed by project id.
    pub project_preferences: Vec<u32>,
    /// Students this student would like to share a group with.
    pub partner_preferences: Vec<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: usize,
    pub min_groups: usize,
    pub desired_groups: usize,
    pub max_groups: usize,
    pub min_group_size: usize,
    pub ideal_group_size: usize,
    pub max_group_size: usize,
    /// Charged for every group beyond `desired_groups`.
    pub group_penalty: u32,
    /// Charged per student of deviation from `ideal_group_size`, per group.
    pub size_penalty: u32,
}

/// Immutable snapshot of one allocation problem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Instance {
    pub key: InstanceKey,
    pub seed: [u8; 32],
    /// Reward for every mutual partner pair placed in the same group.
    pub reward_mutual_pair: u32,
    pub projects: Vec<Project>,
    pub students: Vec<Student>,
}

impl Instance {
    pub fn new(
        key: InstanceKey,
        reward_mutual_pair: u32,
        projects: Vec<Project>,
        students: Vec<Student>,
    ) -> Self {
        Self {
            seed: key.calc_seed(),
            key,
            reward_mutual_pair,
            projects,
            students,
        }
    }

    pub fn num_projects(&self) -> usize {
        self.projects.len()
    }

    pub fn num_students(&self) -> usize {
        self.students.len()
    }

    /// Lightweight sanity pass over the capacity data. Does not prove feasibility.
    pub fn validate(&self) -> Result<()> {
        if self.key.num_projects != self.projects.len() {
            return Err(anyhow!(
                "Key announces {} projects but the instance has {}",
                self.key.num_projects,
                self.projects.len()
            ));
        }
        if self.key.num_students != self.students.len() {
            return Err(anyhow!(
                "Key announces {} students but the instance has {}",
                self.key.num_students,
                self.students.len()
            ));
        }
        for (i, project) in self.projects.iter().enumerate() {
            if project.id != i {
                return Err(anyhow!("Project at position {} has id {}", i, project.id));
            }
            if project.min_group_size == 0 {
                return Err(anyhow!("Project {}: min group size must be positive", i));
            }
            if project.min_group_size > project.max_group_size {
                return Err(anyhow!(
                    "Project {}: min group size {} exceeds max group size {}",
                    i,
                    project.min_group_size,
                    project.max_group_size
                ));
            }
            if !(project.min_group_size..=project.max_group_size)
                .contains(&project.ideal_group_size)
            {
                return Err(anyhow!(
                    "Project {}: ideal group size {} outside [{}, {}]",
                    i,
                    project.ideal_group_size,
                    project.min_group_size,
                    project.max_group_size
                ));
            }
            if project.min_groups > project.max_groups {
                return Err(anyhow!(
                    "Project {}: min groups {} exceeds max groups {}",
                    i,
                    project.min_groups,
                    project.max_groups
                ));
            }
        }
        for (i, student) in self.students.iter().enumerate() {
            if student.id != i {
                return Err(anyhow!("Student at position {} has id {}", i, student.id));
            }
            if student.project_preferences.len() != self.projects.len() {
                return Err(anyhow!(
                    "Student {}: expected {} project preferences, got {}",
                    i,
                    self.projects.len(),
                    student.project_preferences.len()
                ));
            }
            if let Some(&partner) = student
                .partner_preferences
                .iter()
                .find(|&&p| p == i || p >= self.students.len())
            {
                return Err(anyhow!("Student {}: invalid partner preference {}", i, partner));
            }
        }

        let min_capacity: usize = self
            .projects
            .iter()
            .map(|p| p.min_groups * p.min_group_size)
            .sum();
        let max_capacity: usize = self
            .projects
            .iter()
            .map(|p| p.max_groups * p.max_group_size)
            .sum();
        let n = self.students.len();
        if n < min_capacity {
            return Err(anyhow!(
                "{} students cannot fill the mandatory groups, which need at least {}",
                n,
                min_capacity
            ));
        }
        if n > max_capacity {
            return Err(anyhow!(
                "{} students exceed the total group capacity of {}",
                n,
                max_capacity
            ));
        }
        if !reachable_totals(&self.projects, n)[n] {
            return Err(anyhow!(
                "{} students fit no combination of group counts and group sizes",
                n
            ));
        }
        Ok(())
    }

    /// Pairs `(a, b)` with `a < b` where each lists the other as a partner preference.
    pub fn mutual_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for a in &self.students {
            for &b in &a.partner_preferences {
                if a.id < b
                    && self
                        .students
                        .get(b)
                        .is_some_and(|other| other.partner_preferences.contains(&a.id))
                {
                    pairs.push((a.id, b));
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Upper bound on the objective, ignoring all penalties.
    pub fn optimistic_bound(&self) -> i64 {
        let preferences: i64 = self
            .students
            .iter()
            .map(|s| s.project_preferences.iter().copied().max().unwrap_or(0) as i64)
            .sum();
        preferences + self.reward_mutual_pair as i64 * self.mutual_pairs().len() as i64
    }
}

/// `totals[t]` tells whether exactly `t` students, for every `t <= limit`, can
/// be seated with each project opening between `min_groups` and `max_groups`
/// groups of admissible size.
pub fn reachable_totals(projects: &[Project], limit: usize) -> Vec<bool> {
    let mut totals = vec![false; limit + 1];
    totals[0] = true;
    for project in projects {
        let mut seats = vec![false; limit + 1];
        for groups in project.min_groups..=project.max_groups {
            let lo = groups * project.min_group_size;
            if lo > limit {
                break;
            }
            let hi = (groups * project.max_group_size).min(limit);
            seats[lo..=hi].iter_mut().for_each(|s| *s = true);
        }
        let mut next = vec![false; limit + 1];
        for (base, _) in totals.iter().enumerate().filter(|&(_, &ok)| ok) {
            for (extra, _) in seats[..=limit - base].iter().enumerate().filter(|&(_, &ok)| ok) {
                next[base + extra] = true;
            }
        }
        totals = next;
    }
    totals
}
