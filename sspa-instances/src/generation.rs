use crate::{reachable_totals, Instance, Project, Student};
use anyhow::{anyhow, Result};
use rand::{
    rngs::{SmallRng, StdRng},
    seq::SliceRandom,
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};
use sspa_structs::{core::InstanceKey, serializable_struct_with_defaults};

/// Attempts at redrawing project capacities before giving up on a key.
const MAX_PROJECT_DRAWS: usize = 1000;

serializable_struct_with_defaults! {
    ProjectsParams {
        desired_groups: (usize, usize) = (2, 4),
        extra_groups: (usize, usize) = (1, 3),
        ideal_group_size: (usize, usize) = (2, 4),
        tolerable_deficit: (usize, usize) = (1, 3),
        tolerable_surplus: (usize, usize) = (1, 3),
        group_penalty: (u32, u32) = (1, 3),
        size_penalty: (u32, u32) = (1, 3),
    }
}

serializable_struct_with_defaults! {
    StudentsParams {
        partner_preferences: (usize, usize) = (1, 5),
        reciprocity: f64 = 0.7,
        peer_influence: f64 = 0.7,
        project_preference: (u32, u32) = (0, 3),
    }
}

serializable_struct_with_defaults! {
    GenerationParams {
        projects: ProjectsParams = ProjectsParams::default(),
        students: StudentsParams = StudentsParams::default(),
        reward_mutual_pair: u32 = 2,
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<()> {
        let p = &self.projects;
        let ranges = [
            ("desired_groups", p.desired_groups.0, p.desired_groups.1),
            ("extra_groups", p.extra_groups.0, p.extra_groups.1),
            ("ideal_group_size", p.ideal_group_size.0, p.ideal_group_size.1),
            ("tolerable_deficit", p.tolerable_deficit.0, p.tolerable_deficit.1),
            ("tolerable_surplus", p.tolerable_surplus.0, p.tolerable_surplus.1),
            ("group_penalty", p.group_penalty.0 as usize, p.group_penalty.1 as usize),
            ("size_penalty", p.size_penalty.0 as usize, p.size_penalty.1 as usize),
            (
                "partner_preferences",
                self.students.partner_preferences.0,
                self.students.partner_preferences.1,
            ),
            (
                "project_preference",
                self.students.project_preference.0 as usize,
                self.students.project_preference.1 as usize,
            ),
        ];
        if let Some((name, lo, hi)) = ranges.iter().find(|(_, lo, hi)| lo > hi) {
            return Err(anyhow!("Invalid range for {}: ({}, {})", name, lo, hi));
        }
        if p.ideal_group_size.0 == 0 {
            return Err(anyhow!("Ideal group sizes must be positive"));
        }
        for (name, probability) in [
            ("reciprocity", self.students.reciprocity),
            ("peer_influence", self.students.peer_influence),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(anyhow!("{} must be a probability, got {}", name, probability));
            }
        }
        Ok(())
    }
}

impl Instance {
    /// Deterministically generates the instance identified by `key`.
    pub fn generate(key: &InstanceKey) -> Result<Self> {
        Self::generate_with(key, &GenerationParams::default())
    }

    pub fn generate_with(key: &InstanceKey, params: &GenerationParams) -> Result<Self> {
        if key.num_projects == 0 {
            return Err(anyhow!("An instance needs at least one project"));
        }
        params.validate()?;
        let mut rng = SmallRng::from_seed(StdRng::from_seed(key.calc_seed()).gen());

        for _ in 0..MAX_PROJECT_DRAWS {
            let projects = random_projects(&mut rng, key.num_projects, &params.projects);
            if !reachable_totals(&projects, key.num_students)[key.num_students] {
                continue;
            }
            let students = random_students(
                &mut rng,
                key.num_projects,
                key.num_students,
                &params.students,
            );
            let instance = Instance::new(*key, params.reward_mutual_pair, projects, students);
            instance.validate()?;
            return Ok(instance);
        }
        Err(anyhow!(
            "Could not draw projects able to host {} students in {} attempts",
            key.num_students,
            MAX_PROJECT_DRAWS
        ))
    }
}

fn random_projects(rng: &mut SmallRng, num_projects: usize, params: &ProjectsParams) -> Vec<Project> {
    (0..num_projects)
        .map(|id| {
            let desired_groups = rng.gen_range(params.desired_groups.0..=params.desired_groups.1);
            let max_groups =
                desired_groups + rng.gen_range(params.extra_groups.0..=params.extra_groups.1);
            let ideal_group_size =
                rng.gen_range(params.ideal_group_size.0..=params.ideal_group_size.1);
            let deficit = rng.gen_range(params.tolerable_deficit.0..=params.tolerable_deficit.1);
            let surplus = rng.gen_range(params.tolerable_surplus.0..=params.tolerable_surplus.1);
            Project {
                id,
                min_groups: 0,
                desired_groups,
                max_groups,
                min_group_size: ideal_group_size.saturating_sub(deficit).max(1),
                ideal_group_size,
                max_group_size: ideal_group_size + surplus,
                group_penalty: rng.gen_range(params.group_penalty.0..=params.group_penalty.1),
                size_penalty: rng.gen_range(params.size_penalty.0..=params.size_penalty.1),
            }
        })
        .collect()
}

fn random_students(
    rng: &mut SmallRng,
    num_projects: usize,
    num_students: usize,
    params: &StudentsParams,
) -> Vec<Student> {
    let partners = random_partner_preferences(rng, num_students, params);
    let mut project_preferences: Vec<Vec<u32>> = Vec::with_capacity(num_students);
    for wished in &partners {
        // only partners generated earlier can influence this student
        let peers: Vec<&Vec<u32>> = wished
            .iter()
            .filter_map(|&p| project_preferences.get(p))
            .collect();
        let prefs = (0..num_projects)
            .map(|project| {
                if !peers.is_empty() && rng.gen_bool(params.peer_influence) {
                    let values = peers.iter().map(|peer| peer[project]);
                    if rng.gen_bool(0.5) {
                        values.max().unwrap_or(0)
                    } else {
                        values.min().unwrap_or(0)
                    }
                } else {
                    rng.gen_range(params.project_preference.0..=params.project_preference.1)
                }
            })
            .collect();
        project_preferences.push(prefs);
    }
    partners
        .into_iter()
        .zip(project_preferences)
        .enumerate()
        .map(|(id, (partner_preferences, project_preferences))| Student {
            id,
            project_preferences,
            partner_preferences,
        })
        .collect()
}

fn random_partner_preferences(
    rng: &mut SmallRng,
    num_students: usize,
    params: &StudentsParams,
) -> Vec<Vec<usize>> {
    let mut chosen_by: Vec<Vec<usize>> = vec![Vec::new(); num_students];
    let mut all: Vec<Vec<usize>> = Vec::with_capacity(num_students);
    let max_wishes = num_students.saturating_sub(1);

    for student in 0..num_students {
        let count = rng
            .gen_range(params.partner_preferences.0..=params.partner_preferences.1)
            .min(max_wishes);

        let reciprocal: Vec<usize> = chosen_by[student]
            .choose_multiple(rng, count.min(chosen_by[student].len()))
            .copied()
            .collect();
        let mut wishes: Vec<usize> = reciprocal
            .into_iter()
            .filter(|_| rng.gen_bool(params.reciprocity))
            .collect();
        let mut others: Vec<usize> = (0..num_students)
            .filter(|&other| other != student && !wishes.contains(&other))
            .collect();
        others.shuffle(rng);
        wishes.extend(others.into_iter().take(count - wishes.len()));

        for &wish in &wishes {
            chosen_by[wish].push(student);
        }
        all.push(wishes);
    }
    all
}
