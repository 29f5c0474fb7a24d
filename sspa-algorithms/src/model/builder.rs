use super::{Constraint, Model, Sense, VarId, VarKind, Variable};
use crate::{seeded_hasher, HashMap, MatchingError, MatchingResult};
use logging_timer::time;
use sspa_instances::{GroupSlot, Instance};

/// Translates an instance into its 0-1 assignment model.
///
/// Variables:
/// * `x[s,p,g]` binary, student `s` in group `g` of project `p`
/// * `open[p,g]` binary, group realized
/// * `together[a,b]` in [0, 1], mutual partners share a group
/// * `surplus[p,g]`, `deficit[p,g]` continuous, deviation from the ideal size
///
/// Constraints: one group per student, groups open in index order, sizes in
/// bounds for open groups and zero for closed ones, size deviation
/// linearization, minimum group count, and `together[a,b] <= 1 - x[a] + x[b]`
/// for every group.
#[time]
pub fn build(instance: &Instance) -> MatchingResult<Model> {
    instance
        .validate()
        .map_err(|e| MatchingError::MalformedInstance {
            reason: e.to_string(),
        })?;

    let mut builder = ModelBuilder {
        variables: Vec::new(),
        constraints: Vec::new(),
        index: HashMap::with_hasher(seeded_hasher(&instance.seed)),
    };
    let n = instance.num_students();
    let slots: Vec<GroupSlot> = instance
        .projects
        .iter()
        .flat_map(|p| (0..p.max_groups).map(move |g| GroupSlot::new(p.id, g)))
        .collect();

    for &slot in &slots {
        for student in &instance.students {
            builder.add(Variable {
                kind: VarKind::Assign {
                    student: student.id,
                    slot,
                },
                lower: 0.0,
                upper: 1.0,
                integer: true,
                objective: student.project_preferences[slot.project] as f64,
            });
        }
    }
    for &slot in &slots {
        let project = &instance.projects[slot.project];
        let objective = if slot.group >= project.desired_groups {
            -(project.group_penalty as f64)
        } else {
            0.0
        };
        builder.add(Variable {
            kind: VarKind::Open(slot),
            lower: 0.0,
            upper: 1.0,
            integer: true,
            objective,
        });
    }
    let pairs = instance.mutual_pairs();
    for &(first, second) in &pairs {
        builder.add(Variable {
            kind: VarKind::Together { first, second },
            lower: 0.0,
            upper: 1.0,
            integer: false,
            objective: instance.reward_mutual_pair as f64,
        });
    }
    for &slot in &slots {
        let project = &instance.projects[slot.project];
        let penalty = -(project.size_penalty as f64);
        builder.add(Variable {
            kind: VarKind::SizeSurplus(slot),
            lower: 0.0,
            upper: (project.max_group_size - project.ideal_group_size) as f64,
            integer: false,
            objective: penalty,
        });
        builder.add(Variable {
            kind: VarKind::SizeDeficit(slot),
            lower: 0.0,
            upper: project.ideal_group_size as f64,
            integer: false,
            objective: penalty,
        });
    }

    for student in 0..n {
        let terms = slots
            .iter()
            .map(|&slot| (builder.id(VarKind::Assign { student, slot }), 1.0))
            .collect();
        builder.constrain(format!("one_group[{}]", student), terms, Sense::Equal, 1.0);
    }

    for &slot in &slots {
        let project = &instance.projects[slot.project];
        let open = builder.id(VarKind::Open(slot));
        let members: Vec<(VarId, f64)> = (0..n)
            .map(|student| (builder.id(VarKind::Assign { student, slot }), 1.0))
            .collect();
        let tag = format!("{},{}", slot.project, slot.group);
        let max_size = project.max_group_size as f64;
        let ideal = project.ideal_group_size as f64;

        if slot.group > 0 {
            let previous = builder.id(VarKind::Open(GroupSlot::new(slot.project, slot.group - 1)));
            builder.constrain(
                format!("open_in_order[{}]", tag),
                vec![(open, 1.0), (previous, -1.0)],
                Sense::LessEq,
                0.0,
            );
        }

        let mut terms = members.clone();
        terms.push((open, -(project.min_group_size as f64)));
        builder.constrain(format!("min_size[{}]", tag), terms, Sense::GreaterEq, 0.0);

        let mut terms = members.clone();
        terms.push((open, -max_size));
        builder.constrain(format!("max_size[{}]", tag), terms, Sense::LessEq, 0.0);

        // surplus >= size - ideal
        let mut terms: Vec<(VarId, f64)> = members.iter().map(|&(v, _)| (v, -1.0)).collect();
        terms.push((builder.id(VarKind::SizeSurplus(slot)), 1.0));
        builder.constrain(format!("size_surplus[{}]", tag), terms, Sense::GreaterEq, -ideal);

        // deficit >= ideal - size - max_size * (1 - open)
        let mut terms = members;
        terms.push((builder.id(VarKind::SizeDeficit(slot)), 1.0));
        terms.push((open, -max_size));
        builder.constrain(
            format!("size_deficit[{}]", tag),
            terms,
            Sense::GreaterEq,
            ideal - max_size,
        );
    }

    for project in instance.projects.iter().filter(|p| p.min_groups > 0) {
        let terms = (0..project.max_groups)
            .map(|g| (builder.id(VarKind::Open(GroupSlot::new(project.id, g))), 1.0))
            .collect();
        builder.constrain(
            format!("min_groups[{}]", project.id),
            terms,
            Sense::GreaterEq,
            project.min_groups as f64,
        );
    }

    for &(first, second) in &pairs {
        let together = builder.id(VarKind::Together { first, second });
        for &slot in &slots {
            builder.constrain(
                format!("together[{},{},{},{}]", first, second, slot.project, slot.group),
                vec![
                    (together, 1.0),
                    (builder.id(VarKind::Assign { student: first, slot }), 1.0),
                    (builder.id(VarKind::Assign { student: second, slot }), -1.0),
                ],
                Sense::LessEq,
                1.0,
            );
        }
    }

    Ok(Model {
        variables: builder.variables,
        constraints: builder.constraints,
        num_students: n,
        slots,
        index: builder.index,
    })
}

struct ModelBuilder {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    index: HashMap<VarKind, VarId>,
}

impl ModelBuilder {
    fn add(&mut self, variable: Variable) {
        let id = VarId(self.variables.len());
        self.index.insert(variable.kind, id);
        self.variables.push(variable);
    }

    fn id(&self, kind: VarKind) -> VarId {
        // every kind looked up here was added above
        self.index[&kind]
    }

    fn constrain(&mut self, name: String, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            name,
            terms,
            sense,
            rhs,
        });
    }
}
