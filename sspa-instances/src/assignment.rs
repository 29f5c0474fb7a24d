use crate::Instance;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group `group` of project `project`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupSlot {
    pub project: usize,
    pub group: usize,
}

impl GroupSlot {
    pub fn new(project: usize, group: usize) -> Self {
        Self { project, group }
    }
}

/// Every student's group, indexed by student id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub slots: Vec<GroupSlot>,
}

impl Assignment {
    pub fn new(slots: Vec<GroupSlot>) -> Self {
        Self { slots }
    }

    pub fn slot(&self, student: usize) -> Option<GroupSlot> {
        self.slots.get(student).copied()
    }

    /// Members of every realized group.
    pub fn groups(&self) -> BTreeMap<GroupSlot, Vec<usize>> {
        let mut groups: BTreeMap<GroupSlot, Vec<usize>> = BTreeMap::new();
        for (student, slot) in self.slots.iter().enumerate() {
            groups.entry(*slot).or_default().push(student);
        }
        groups
    }

    /// Members of each realized group of `project`, ordered by group id.
    pub fn project_groups(&self, project: usize) -> Vec<(usize, Vec<usize>)> {
        self.groups()
            .into_iter()
            .filter(|(slot, _)| slot.project == project)
            .map(|(slot, members)| (slot.group, members))
            .collect()
    }

    /// Students placed differently in `other`.
    pub fn moved_students(&self, other: &Assignment) -> Vec<usize> {
        self.slots
            .iter()
            .zip(other.slots.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(student, _)| student)
            .collect()
    }
}

impl Instance {
    pub fn verify_assignment(&self, assignment: &Assignment) -> Result<()> {
        if assignment.slots.len() != self.num_students() {
            return Err(anyhow!(
                "Invalid number of students. Expected: {}, Actual: {}",
                self.num_students(),
                assignment.slots.len()
            ));
        }
        if let Some((student, slot)) = assignment
            .slots
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.project >= self.num_projects())
        {
            return Err(anyhow!(
                "Student {} assigned to unknown project {}",
                student,
                slot.project
            ));
        }

        let groups = assignment.groups();
        for project in &self.projects {
            let group_ids: Vec<usize> = groups
                .keys()
                .filter(|slot| slot.project == project.id)
                .map(|slot| slot.group)
                .collect();
            if let Some((expected, actual)) = group_ids
                .iter()
                .enumerate()
                .find(|(expected, &actual)| *expected != actual)
            {
                return Err(anyhow!(
                    "Project {}: groups must be numbered consecutively, expected group {} but found {}",
                    project.id,
                    expected,
                    actual
                ));
            }
            if group_ids.len() < project.min_groups || group_ids.len() > project.max_groups {
                return Err(anyhow!(
                    "Project {}: {} groups outside [{}, {}]",
                    project.id,
                    group_ids.len(),
                    project.min_groups,
                    project.max_groups
                ));
            }
        }
        for (slot, members) in &groups {
            let project = &self.projects[slot.project];
            if members.len() < project.min_group_size || members.len() > project.max_group_size {
                return Err(anyhow!(
                    "Project {} group {}: size {} outside [{}, {}]",
                    slot.project,
                    slot.group,
                    members.len(),
                    project.min_group_size,
                    project.max_group_size
                ));
            }
        }
        Ok(())
    }

    /// Objective value of a feasible assignment (higher is better).
    pub fn evaluate(&self, assignment: &Assignment) -> Result<i64> {
        self.verify_assignment(assignment)?;
        let preferences: i64 = assignment
            .slots
            .iter()
            .zip(&self.students)
            .map(|(slot, student)| student.project_preferences[slot.project] as i64)
            .sum();
        let together = self
            .mutual_pairs()
            .into_iter()
            .filter(|&(a, b)| assignment.slots[a] == assignment.slots[b])
            .count() as i64;

        let mut penalties = 0i64;
        for project in &self.projects {
            let groups = assignment.project_groups(project.id);
            let surplus_groups = groups.len().saturating_sub(project.desired_groups) as i64;
            let deviation: i64 = groups
                .iter()
                .map(|(_, members)| members.len().abs_diff(project.ideal_group_size) as i64)
                .sum();
            penalties +=
                project.group_penalty as i64 * surplus_groups + project.size_penalty as i64 * deviation;
        }
        Ok(preferences + self.reward_mutual_pair as i64 * together - penalties)
    }

    /// Each student's share of the objective; shares sum to [`Instance::evaluate`].
    ///
    /// Group penalties are split evenly between the members of the group and a
    /// mutual pair reward is split between both partners.
    pub fn student_contributions(&self, assignment: &Assignment) -> Result<Vec<f64>> {
        self.verify_assignment(assignment)?;
        let groups = assignment.groups();
        let mut contributions: Vec<f64> = assignment
            .slots
            .iter()
            .zip(&self.students)
            .map(|(slot, student)| student.project_preferences[slot.project] as f64)
            .collect();

        let half_reward = self.reward_mutual_pair as f64 / 2.0;
        for (a, b) in self.mutual_pairs() {
            if assignment.slots[a] == assignment.slots[b] {
                contributions[a] += half_reward;
                contributions[b] += half_reward;
            }
        }
        for (slot, members) in &groups {
            let project = &self.projects[slot.project];
            let mut penalty =
                project.size_penalty as f64 * members.len().abs_diff(project.ideal_group_size) as f64;
            if slot.group >= project.desired_groups {
                penalty += project.group_penalty as f64;
            }
            let share = penalty / members.len() as f64;
            for &student in members {
                contributions[student] -= share;
            }
        }
        Ok(contributions)
    }
}
