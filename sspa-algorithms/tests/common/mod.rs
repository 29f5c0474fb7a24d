#![allow(dead_code)]

use anyhow::Result;
use sspa_algorithms::{
    model::{Model, VarId},
    solver::{MipSolver, Restriction, SolveResult, SolveStatus},
    CancelFlag, MatchingError, MatchingResult,
};
use sspa_instances::{Assignment, GroupSlot, Instance, InstanceSource, Project, Student};
use sspa_structs::core::InstanceKey;
use std::{collections::VecDeque, thread, time::Duration};

pub fn toy_project(id: usize) -> Project {
    Project {
        id,
        min_groups: 0,
        desired_groups: 1,
        max_groups: 2,
        min_group_size: 2,
        ideal_group_size: 3,
        max_group_size: 4,
        group_penalty: 1,
        size_penalty: 1,
    }
}

pub fn toy_student(id: usize) -> Student {
    let team = if id < 3 { 0 } else { 3 };
    Student {
        id,
        project_preferences: if id < 3 { vec![3, 0] } else { vec![0, 3] },
        partner_preferences: (team..team + 3).filter(|&p| p != id).collect(),
    }
}

/// Two projects, two teams of three with disjoint preferences. Optimum 30.
pub fn toy_instance() -> Instance {
    Instance::new(
        InstanceKey::new(2, 6, 0),
        2,
        vec![toy_project(0), toy_project(1)],
        (0..6).map(toy_student).collect(),
    )
}

pub fn assignment(slots: &[(usize, usize)]) -> Assignment {
    Assignment::new(slots.iter().map(|&(p, g)| GroupSlot::new(p, g)).collect())
}

/// The toy optimum: each team in its favourite project.
pub fn optimum() -> Assignment {
    assignment(&[(0, 0), (0, 0), (0, 0), (1, 0), (1, 0), (1, 0)])
}

/// Students 2 and 3 swapped with respect to [`optimum`]. Objective 16.
pub fn swapped() -> Assignment {
    assignment(&[(0, 0), (0, 0), (1, 0), (0, 0), (1, 0), (1, 0)])
}

/// Serves one fixed instance for every key.
pub struct FixedSource(pub Instance);

impl InstanceSource for FixedSource {
    fn load(&self, _key: &InstanceKey) -> Result<Instance> {
        Ok(self.0.clone())
    }
}

/// Assignment variables set for `assignment`, everything else zero.
pub fn values_for(model: &Model, assignment: &Assignment) -> Vec<f64> {
    let mut values = vec![0.0; model.variables().len()];
    for VarId(i) in model.ones(assignment).unwrap() {
        values[i] = 1.0;
    }
    values
}

#[derive(Debug, Clone)]
pub enum Step {
    Return(Assignment, SolveStatus),
    NoSolution(SolveStatus),
    Error,
    Unavailable,
}

/// Replays `script` call by call, then repeats `fallback` forever.
pub struct ScriptedSolver {
    pub script: VecDeque<Step>,
    pub fallback: Step,
    pub delay: Duration,
    /// Raised right before serving the call with this index.
    pub cancel_at: Option<(usize, CancelFlag)>,
    pub calls: Vec<(Restriction, Duration)>,
}

impl ScriptedSolver {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: script.into(),
            fallback,
            delay: Duration::ZERO,
            cancel_at: None,
            calls: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl MipSolver for ScriptedSolver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn solve(
        &mut self,
        model: &Model,
        restriction: &Restriction,
        time_limit: Duration,
    ) -> MatchingResult<SolveResult> {
        if let Some((at, flag)) = &self.cancel_at {
            if *at == self.calls.len() {
                flag.cancel();
            }
        }
        self.calls.push((restriction.clone(), time_limit));
        let elapsed = self.delay.min(time_limit);
        if !elapsed.is_zero() {
            thread::sleep(elapsed);
        }
        let step = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Return(assignment, status) => {
                let values = values_for(model, &assignment);
                let objective = model.objective_value(&values);
                Ok(SolveResult {
                    status,
                    values: Some(values),
                    objective: Some(objective),
                    bound: None,
                    elapsed,
                    message: None,
                })
            }
            Step::NoSolution(status) => Ok(SolveResult::without_solution(status, elapsed)),
            Step::Error => Ok(SolveResult::error("scripted failure", elapsed)),
            Step::Unavailable => Err(MatchingError::SolverUnavailable {
                solver: "scripted".to_string(),
                reason: "offline".to_string(),
            }),
        }
    }
}

/// Students whose assignment variables a fixing restriction leaves free.
pub fn free_students(model: &Model, restriction: &Restriction) -> Vec<usize> {
    match restriction {
        Restriction::Fixing(fixed) => (0..model.num_students())
            .filter(|&s| model.student_vars(s).all(|v| !fixed.contains_key(&v)))
            .collect(),
        _ => Vec::new(),
    }
}
