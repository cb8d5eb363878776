//! Linear models through `good_lp` with the pure-Rust Clarabel solver.

use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use tracing::{debug, info, warn};
use web_time::Instant;

use super::{SolutionStatus, SolveOptions, SolveOutcome, SolverBackend};
use crate::error::{BuildError, BuildResult};
use crate::formulation::ProblemClass;
use crate::model::{Expr, Sense, SymbolicModel, VarKind};

/// Interior-point LP backend. Integer variables are only accepted when
/// `relax_integrality` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl ClarabelBackend {
    pub fn new() -> Self {
        Self
    }
}

fn linear_expression(expr: &Expr, vars: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for (id, coef) in &expr.linear {
        out += *coef * vars[id.index()];
    }
    out
}

impl SolverBackend for ClarabelBackend {
    fn id(&self) -> &'static str {
        "clarabel"
    }

    fn supported_classes(&self) -> &'static [ProblemClass] {
        &[ProblemClass::LinearProgram]
    }

    fn solve(&self, model: &SymbolicModel, options: &SolveOptions) -> BuildResult<SolveOutcome> {
        let class = model.problem_class();
        if !class.is_linear() {
            return Err(BuildError::Solver(format!(
                "{} cannot solve {} models",
                self.id(),
                class
            )));
        }
        if class.has_integers() && !options.relax_integrality {
            return Err(BuildError::Solver(format!(
                "{} has {} binary variables; set relax_integrality to solve the LP relaxation",
                class,
                model.num_binaries()
            )));
        }

        let start = Instant::now();
        let mut problem = variables!();
        let vars: Vec<Variable> = model
            .variables()
            .iter()
            .map(|v| {
                let (lower, upper) = match v.kind {
                    VarKind::Binary => (v.lower.max(0.0), v.upper.min(1.0)),
                    VarKind::Continuous => (v.lower, v.upper),
                };
                let mut def = variable().name(v.name.clone());
                if lower.is_finite() {
                    def = def.min(lower);
                }
                if upper.is_finite() {
                    def = def.max(upper);
                }
                problem.add(def)
            })
            .collect();

        let objective = model
            .objective()
            .map(|expr| linear_expression(expr, &vars))
            .unwrap_or_else(|| Expression::from(0.0));
        let mut lp = problem.minimise(objective.clone()).using(clarabel);
        for c in model.constraints() {
            let lhs = linear_expression(&c.expr, &vars);
            let rhs = c.rhs;
            lp = match c.sense {
                Sense::Le => lp.with(constraint!(lhs <= rhs)),
                Sense::Eq => lp.with(constraint!(lhs == rhs)),
                Sense::Ge => lp.with(constraint!(lhs >= rhs)),
            };
        }
        debug!(
            variables = vars.len(),
            constraints = model.num_constraints(),
            "clarabel model assembled"
        );

        let (status, objective_value, values) = match lp.solve() {
            Ok(solution) => {
                let values: Vec<f64> = vars.iter().map(|v| solution.value(*v)).collect();
                let objective_value = objective.eval_with(&solution);
                (SolutionStatus::Optimal, objective_value, values)
            }
            Err(ResolutionError::Infeasible) => (SolutionStatus::Infeasible, f64::NAN, Vec::new()),
            Err(ResolutionError::Unbounded) => (SolutionStatus::Unbounded, f64::NAN, Vec::new()),
            Err(e) => {
                warn!(backend = self.id(), error = ?e, "solver failed");
                (SolutionStatus::Error, f64::NAN, Vec::new())
            }
        };
        let solve_time_ms = start.elapsed().as_millis() as u64;
        info!(
            backend = self.id(),
            status = %status,
            solve_time_ms,
            "solve finished"
        );

        Ok(SolveOutcome {
            status,
            objective: objective_value,
            values,
            solve_time_ms,
        })
    }
}
