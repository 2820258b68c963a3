//! LP / MILP backend on `good_lp` with the pure-Rust `microlp` solver.

use std::time::Instant;

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use grr_core::config::SolverSettings;
use grr_core::model::{
    ConstraintSense, LinearTerms, Model, ModelSolution, ObjectiveSense, ProblemClass, SolveStatus,
    VarKind,
};
use grr_core::{SolveError, SolverBackend};
use tracing::{debug, info};

const BACKEND_ID: &str = "milp";

/// Exact backend for affine models, with or without integer variables.
///
/// `microlp` does not enforce wall-clock limits; `time_limit_secs` is
/// ignored here.
#[derive(Debug, Clone, Default)]
pub struct MilpBackend;

impl MilpBackend {
    pub fn new() -> Self {
        Self
    }
}

fn to_expression(terms: &LinearTerms, handles: &[Variable]) -> Expression {
    let mut expr = Expression::from(terms.constant);
    for (var, coeff) in &terms.coefficients {
        expr += *coeff * handles[var.index()];
    }
    expr
}

fn affine(model: &Model, what: &str, terms: Option<LinearTerms>) -> Result<LinearTerms, SolveError> {
    terms.ok_or_else(|| {
        debug!(what, "non-affine expression reached the MILP backend");
        SolveError::Unsupported {
            backend: BACKEND_ID.to_string(),
            class: model.problem_class(),
        }
    })
}

/// Round integer values that sit within `tolerance` of an integer.
///
/// A discrete value further away than that means the solver did not return
/// an integral point.
fn snap_discrete(model: &Model, values: &mut [f64], tolerance: f64) -> Result<(), SolveError> {
    for (def, value) in model.vars().iter().zip(values.iter_mut()) {
        if !def.kind.is_discrete() {
            continue;
        }
        let rounded = value.round();
        if (*value - rounded).abs() > tolerance {
            return Err(SolveError::failure(
                BACKEND_ID,
                format!("`{}` = {value} is not integral", def.name),
            ));
        }
        *value = rounded;
    }
    Ok(())
}

fn constant_holds(sense: ConstraintSense, value: f64, tolerance: f64) -> bool {
    match sense {
        ConstraintSense::Le => value <= tolerance,
        ConstraintSense::Ge => value >= -tolerance,
        ConstraintSense::Eq => value.abs() <= tolerance,
    }
}

impl SolverBackend for MilpBackend {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn supported_classes(&self) -> &[ProblemClass] {
        &[ProblemClass::LinearProgram, ProblemClass::MixedIntegerLinear]
    }

    fn solve(&self, model: &Model, settings: &SolverSettings) -> Result<ModelSolution, SolveError> {
        let start = Instant::now();
        let class = self.ensure_supported(model)?;

        // === Variables ===
        let mut vars = variables!();
        let handles: Vec<Variable> = model
            .vars()
            .iter()
            .map(|def| {
                let mut v = variable().name(def.name.clone());
                match def.kind {
                    VarKind::Binary if !def.is_fixed() => v = v.binary(),
                    VarKind::Integer if !def.is_fixed() => v = v.integer(),
                    _ => {}
                }
                if def.lower.is_finite() {
                    v = v.min(def.lower);
                }
                if def.upper.is_finite() {
                    v = v.max(def.upper);
                }
                vars.add(v)
            })
            .collect();

        // === Objective ===
        let objective = affine(model, "objective", model.objective().linear_terms())?;
        let objective = to_expression(&objective, &handles);
        let mut problem = match model.sense() {
            ObjectiveSense::Minimize => vars.minimise(objective).using(microlp),
            ObjectiveSense::Maximize => vars.maximise(objective).using(microlp),
        };

        // === Constraints: Σ a x ⋄ −c ===
        let mut rows = 0usize;
        for c in model.constraints() {
            let terms = affine(model, &c.name, c.body.linear_terms())?.prune();
            if terms.coefficients.is_empty() {
                if !constant_holds(c.sense, terms.constant, settings.tolerance) {
                    return Err(SolveError::Infeasible(format!(
                        "constraint `{}` is a violated constant",
                        c.name
                    )));
                }
                continue;
            }
            let rhs = -terms.constant;
            let lhs = to_expression(
                &LinearTerms {
                    constant: 0.0,
                    ..terms
                },
                &handles,
            );
            problem = match c.sense {
                ConstraintSense::Le => problem.with(constraint!(lhs <= rhs)),
                ConstraintSense::Ge => problem.with(constraint!(lhs >= rhs)),
                ConstraintSense::Eq => problem.with(constraint!(lhs == rhs)),
            };
            rows += 1;
        }

        debug!(
            model = model.name(),
            %class,
            vars = handles.len(),
            rows,
            "solving with microlp"
        );

        let solution = problem.solve().map_err(|err| match err {
            ResolutionError::Infeasible => SolveError::Infeasible(model.name().to_string()),
            ResolutionError::Unbounded => SolveError::Unbounded(model.name().to_string()),
            other => SolveError::failure(BACKEND_ID, other.to_string()),
        })?;

        let mut values: Vec<f64> = handles.iter().map(|&h| solution.value(h)).collect();
        snap_discrete(model, &mut values, settings.integrality_tolerance)?;
        let max_violation = model.max_violation(&values);
        let objective = model.objective_value(&values);
        let solve_time = start.elapsed();

        info!(
            model = model.name(),
            objective,
            max_violation,
            elapsed_ms = solve_time.as_millis() as u64,
            "milp solve finished"
        );

        Ok(ModelSolution {
            status: SolveStatus::Optimal,
            objective,
            values,
            iterations: 0,
            solve_time,
            max_violation,
            backend: BACKEND_ID.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grr_core::model::{Constraint, Expr};

    #[test]
    fn test_knapsack_is_exact() {
        // max 5a + 4b + 3c  s.t. 2a + 3b + c <= 4, binaries → a = c = 1, obj 8
        let mut m = Model::new("knapsack");
        let a = m.add_binary("a");
        let b = m.add_binary("b");
        let c = m.add_binary("c");
        m.add_constraint(Constraint::leq("weight", 2.0 * a + 3.0 * b + c, 4.0));
        m.set_objective(ObjectiveSense::Maximize, 5.0 * a + 4.0 * b + 3.0 * c);

        let sol = MilpBackend.solve(&m, &SolverSettings::default()).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 8.0).abs() < 1e-6);
        assert!(sol.is_set(a) && !sol.is_set(b) && sol.is_set(c));
    }

    #[test]
    fn test_general_integers() {
        // max 3x + 2y  s.t.  2x + 2y ≤ 7, x ≤ 2.5, x, y ∈ {0..5}  →  x = 2, y = 1
        let mut m = Model::new("integers");
        let x = m.add_integer("x", 0.0, 5.0);
        let y = m.add_integer("y", 0.0, 5.0);
        m.add_constraint(Constraint::leq("budget", 2.0 * x + 2.0 * y, 7.0));
        m.add_constraint(Constraint::leq("cap", x, 2.5));
        m.set_objective(ObjectiveSense::Maximize, 3.0 * x + 2.0 * y);

        let sol = MilpBackend.solve(&m, &SolverSettings::default()).unwrap();
        assert_eq!(sol.value(x), 2.0);
        assert_eq!(sol.value(y), 1.0);
        assert!((sol.objective - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_is_reported() {
        let mut m = Model::new("empty");
        let x = m.add_continuous("x", 0.0, 1.0);
        m.add_constraint(Constraint::geq("too_big", x, 2.0));
        m.set_objective(ObjectiveSense::Minimize, x);

        let err = MilpBackend.solve(&m, &SolverSettings::default()).unwrap_err();
        assert!(matches!(err, SolveError::Infeasible(_)));
    }

    #[test]
    fn test_nonlinear_model_rejected() {
        let mut m = Model::new("circle");
        let x = m.add_continuous("x", -1.0, 1.0);
        m.add_constraint(Constraint::leq("c", Expr::from(x).square(), 1.0));
        m.set_objective(ObjectiveSense::Minimize, x);

        let err = MilpBackend.solve(&m, &SolverSettings::default()).unwrap_err();
        assert!(matches!(err, SolveError::Unsupported { .. }));
    }

    #[test]
    fn test_snap_discrete_within_tolerance() {
        let mut m = Model::new("snap");
        m.add_binary("z");
        m.add_continuous("x", 0.0, 1.0);

        let mut values = vec![0.999_999_7, 0.3];
        snap_discrete(&m, &mut values, 1e-6).unwrap();
        assert_eq!(values, vec![1.0, 0.3]);

        let mut values = vec![0.4, 0.3];
        let err = snap_discrete(&m, &mut values, 1e-6).unwrap_err();
        assert!(matches!(err, SolveError::SolverFailure { .. }));
    }

    #[test]
    fn test_fixed_binaries_respected() {
        let mut m = Model::new("fixed");
        let x = m.add_continuous("x", 0.0, 10.0);
        let z = m.add_binary("z");
        m.add_constraint(Constraint::leq("gate", x, 10.0 * z));
        m.set_objective(ObjectiveSense::Maximize, x);

        let sol = MilpBackend
            .solve(&m.with_fixed(&[(z, 0.0)]), &SolverSettings::default())
            .unwrap();
        assert!(sol.value(x).abs() < 1e-9);
    }
}
