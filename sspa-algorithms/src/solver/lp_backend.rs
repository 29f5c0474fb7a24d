use super::{MipSolver, Restriction, SolveResult, SolveStatus};
use crate::{
    model::{Model, Sense},
    MatchingResult,
};
use good_lp::{
    microlp, variable, variables, Expression, ResolutionError, Solution, SolutionStatus,
    SolverModel, Variable, WithInitialSolution, WithTimeLimit,
};
use log::{debug, warn};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    time::{Duration, Instant},
};

const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Message microlp attaches when its time limit expires without an incumbent.
const NO_INCUMBENT_AT_TIME_LIMIT: &str = "Time limit reached before finding a feasible solution";

/// Solves through `good_lp`'s microlp backend, which enforces the time limit
/// itself and hands back its best incumbent when the limit expires.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

struct Column {
    lower: f64,
    upper: f64,
    integer: bool,
}

struct Row {
    terms: Vec<(usize, f64)>,
    sense: Sense,
    rhs: f64,
}

/// Restricted copy of a model, ready to hand to the backend.
struct LpJob {
    columns: Vec<Column>,
    objective: Vec<f64>,
    rows: Vec<Row>,
    /// Starting values for some columns.
    hint: Vec<(usize, f64)>,
}

/// Outcome of one backend solve: values and whether optimality was proven.
type LpOutcome = Result<(Vec<f64>, bool), ResolutionError>;

impl LpJob {
    /// Returns `None` when the restriction already contradicts a variable bound.
    fn new(model: &Model, restriction: &Restriction) -> Option<Self> {
        let mut columns: Vec<Column> = model
            .variables()
            .iter()
            .map(|v| Column {
                lower: v.lower,
                upper: v.upper,
                integer: v.integer,
            })
            .collect();
        let mut rows: Vec<Row> = model
            .constraints()
            .iter()
            .map(|c| Row {
                terms: c.terms.iter().map(|&(v, coef)| (v.0, coef)).collect(),
                sense: c.sense,
                rhs: c.rhs,
            })
            .collect();
        let mut hint = Vec::new();

        match restriction {
            Restriction::None => {}
            Restriction::Fixing(fixed) => {
                for (var, &value) in fixed {
                    let column = columns.get_mut(var.0)?;
                    if value < column.lower - FEASIBILITY_TOLERANCE
                        || value > column.upper + FEASIBILITY_TOLERANCE
                    {
                        return None;
                    }
                    column.lower = value;
                    column.upper = value;
                }
            }
            Restriction::LocalBranching(lb) => {
                let (constant, terms) = lb.distance_terms(model);
                let terms: Vec<(usize, f64)> = terms.into_iter().map(|(v, c)| (v.0, c)).collect();
                rows.push(Row {
                    terms: terms.clone(),
                    sense: Sense::LessEq,
                    rhs: lb.max_distance as f64 - constant,
                });
                if lb.min_distance > 0 {
                    rows.push(Row {
                        terms,
                        sense: Sense::GreaterEq,
                        rhs: lb.min_distance as f64 - constant,
                    });
                }
                if lb.warm_start {
                    hint = model
                        .assignment_vars()
                        .map(|v| (v.0, if lb.reference.contains(&v) { 1.0 } else { 0.0 }))
                        .collect();
                }
            }
        }

        Some(Self {
            columns,
            objective: model.variables().iter().map(|v| v.objective).collect(),
            rows,
            hint,
        })
    }

    fn run(self, time_limit: Duration) -> LpOutcome {
        let mut vars = variables!();
        let xs: Vec<Variable> = self
            .columns
            .iter()
            .map(|c| {
                if c.integer && c.lower == 0.0 && c.upper == 1.0 {
                    vars.add(variable().binary())
                } else if c.integer && c.lower < c.upper {
                    vars.add(variable().integer().min(c.lower).max(c.upper))
                } else {
                    vars.add(variable().min(c.lower).max(c.upper))
                }
            })
            .collect();

        let objective = self
            .objective
            .iter()
            .zip(&xs)
            .filter(|(coef, _)| **coef != 0.0)
            .fold(Expression::from(0.0), |acc, (&coef, &x)| acc + coef * x);

        let mut problem = vars
            .maximise(objective)
            .using(microlp)
            .with_time_limit(time_limit.as_secs_f64());
        if !self.hint.is_empty() {
            problem = problem.with_initial_solution(self.hint.iter().map(|&(i, v)| (xs[i], v)));
        }
        for row in self.rows.iter().filter(|r| !r.terms.is_empty()) {
            let lhs = row
                .terms
                .iter()
                .fold(Expression::from(0.0), |acc, &(i, coef)| acc + coef * xs[i]);
            match row.sense {
                Sense::LessEq => problem.add_constraint(lhs.leq(row.rhs)),
                Sense::GreaterEq => problem.add_constraint(lhs.geq(row.rhs)),
                Sense::Equal => problem.add_constraint(lhs.eq(row.rhs)),
            };
        }

        let solution = problem.solve()?;
        // The relative gap is left at zero, so a gap stop is a proof as well.
        let proven = matches!(
            solution.status(),
            SolutionStatus::Optimal | SolutionStatus::GapLimit
        );
        Ok((xs.iter().map(|&x| solution.value(x)).collect(), proven))
    }

    /// Rows without variables are decided here; the backend may reject them.
    fn has_violated_empty_row(&self) -> bool {
        self.rows
            .iter()
            .filter(|r| r.terms.is_empty())
            .any(|r| !r.sense.holds(0.0, r.rhs, FEASIBILITY_TOLERANCE))
    }
}

impl MipSolver for GoodLpSolver {
    fn name(&self) -> &str {
        "good_lp"
    }

    fn solve(
        &mut self,
        model: &Model,
        restriction: &Restriction,
        time_limit: Duration,
    ) -> MatchingResult<SolveResult> {
        let start = Instant::now();
        let job = match LpJob::new(model, restriction) {
            Some(job) if !job.has_violated_empty_row() => job,
            _ => {
                return Ok(SolveResult::without_solution(
                    SolveStatus::Infeasible,
                    start.elapsed(),
                ))
            }
        };
        if job.columns.is_empty() {
            return Ok(SolveResult {
                status: SolveStatus::Optimal,
                values: Some(Vec::new()),
                objective: Some(0.0),
                bound: Some(0.0),
                elapsed: start.elapsed(),
                message: None,
            });
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| job.run(time_limit)));
        let result = match outcome {
            Ok(Ok((values, proven))) => {
                let objective = model.objective_value(&values);
                SolveResult {
                    status: if proven {
                        SolveStatus::Optimal
                    } else {
                        SolveStatus::TimeLimitFeasible
                    },
                    values: Some(values),
                    objective: Some(objective),
                    bound: proven.then_some(objective),
                    elapsed: start.elapsed(),
                    message: None,
                }
            }
            Ok(Err(ResolutionError::Infeasible)) => {
                SolveResult::without_solution(SolveStatus::Infeasible, start.elapsed())
            }
            Ok(Err(ResolutionError::Other(message))) if message == NO_INCUMBENT_AT_TIME_LIMIT => {
                debug!("no incumbent within {:.3}s", time_limit.as_secs_f64());
                SolveResult::without_solution(SolveStatus::TimeLimitNoFeasible, start.elapsed())
            }
            Ok(Err(e)) => SolveResult::error(e.to_string(), start.elapsed()),
            Err(_) => {
                warn!("solver panicked");
                SolveResult::error("solver panicked", start.elapsed())
            }
        };
        Ok(result)
    }
}
