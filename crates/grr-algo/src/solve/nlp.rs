//! # Augmented Lagrangian NLP Backend
//!
//! Local solver for continuous models with nonlinear (AC power flow)
//! constraints, built on the `argmin` L-BFGS implementation.
//!
//! ## Method
//!
//! Variable bounds are removed with a smooth change of variables
//! `x = T(y)`, so every iterate respects them exactly:
//!
//! ```text
//! [l, u] :  x = l + (u − l)(1 + sin y) / 2
//! [l, ∞) :  x = l + y²
//! (−∞, u]:  x = u − y²
//! ```
//!
//! Constraints enter an augmented Lagrangian with multipliers `λ` and
//! penalty `μ`:
//!
//! ```text
//! L(y) = ±f(x) + Σ_eq   [λ h(x) + μ/2 h(x)²]
//!              + Σ_ineq [max(0, λ + μ g(x))² − λ²] / (2μ)
//! ```
//!
//! Each outer round minimizes `L` with L-BFGS (More-Thuente line search),
//! updates `λ` and grows `μ` when the violation does not shrink enough.
//! Gradients are exact, accumulated through the expression trees.
//!
//! ## References
//!
//! - **Nocedal & Wright (2006)**: "Numerical Optimization", Chapter 17
//!   (augmented Lagrangian methods)
//! - **Moré & Thuente (1994)**: "Line Search Algorithms with Guaranteed
//!   Sufficient Decrease", ACM Trans. Mathematical Software, 20(3), 286-307

use std::time::Instant;

use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use grr_core::config::SolverSettings;
use grr_core::model::{
    ConstraintSense, Model, ModelSolution, ObjectiveSense, ProblemClass, SolveStatus, VarDef,
};
use grr_core::{SolveError, SolverBackend};
use tracing::{debug, info, trace};

const BACKEND_ID: &str = "nlp";

/// Upper limit on the penalty parameter.
const MAX_PENALTY: f64 = 1e10;

/// Required violation decrease per round before the penalty is kept.
const VIOLATION_DECREASE: f64 = 0.25;

/// Augmented Lagrangian + L-BFGS backend for LP and NLP models.
#[derive(Debug, Clone, Default)]
pub struct NlpBackend;

impl NlpBackend {
    pub fn new() -> Self {
        Self
    }
}

// ============================================================================
// BOUND TRANSFORM
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Transform {
    Fixed(f64),
    Interval { lower: f64, upper: f64 },
    Lower(f64),
    Upper(f64),
    Free,
}

impl Transform {
    fn from_def(def: &VarDef) -> Self {
        match (def.lower.is_finite(), def.upper.is_finite()) {
            _ if def.is_fixed() => Transform::Fixed(def.lower),
            (true, true) => Transform::Interval {
                lower: def.lower,
                upper: def.upper,
            },
            (true, false) => Transform::Lower(def.lower),
            (false, true) => Transform::Upper(def.upper),
            (false, false) => Transform::Free,
        }
    }

    fn value(&self, y: f64) -> f64 {
        match *self {
            Transform::Fixed(v) => v,
            Transform::Interval { lower, upper } => lower + (upper - lower) * (1.0 + y.sin()) / 2.0,
            Transform::Lower(lower) => lower + y * y,
            Transform::Upper(upper) => upper - y * y,
            Transform::Free => y,
        }
    }

    fn derivative(&self, y: f64) -> f64 {
        match *self {
            Transform::Fixed(_) => 0.0,
            Transform::Interval { lower, upper } => (upper - lower) * y.cos() / 2.0,
            Transform::Lower(_) => 2.0 * y,
            Transform::Upper(_) => -2.0 * y,
            Transform::Free => 1.0,
        }
    }

    /// Start at interval midpoints, one unit inside half-bounded domains.
    fn initial(&self) -> f64 {
        match self {
            Transform::Lower(_) | Transform::Upper(_) => 1.0,
            _ => 0.0,
        }
    }
}

/// Maps the unconstrained search vector `y` to the model point `x`.
struct Reparam {
    transforms: Vec<Transform>,
    /// Model index of each search coordinate
    free: Vec<usize>,
}

impl Reparam {
    fn new(model: &Model) -> Self {
        let transforms: Vec<Transform> = model.vars().iter().map(Transform::from_def).collect();
        let free = transforms
            .iter()
            .enumerate()
            .filter(|(_, t)| !matches!(t, Transform::Fixed(_)))
            .map(|(i, _)| i)
            .collect();
        Self { transforms, free }
    }

    fn initial(&self) -> Vec<f64> {
        self.free.iter().map(|&i| self.transforms[i].initial()).collect()
    }

    fn expand(&self, y: &[f64]) -> Vec<f64> {
        let mut x: Vec<f64> = self.transforms.iter().map(|t| t.value(0.0)).collect();
        for (&i, &yi) in self.free.iter().zip(y) {
            x[i] = self.transforms[i].value(yi);
        }
        x
    }
}

// ============================================================================
// AUGMENTED LAGRANGIAN
// ============================================================================

/// Value and body weight of one constraint's augmented Lagrangian term.
///
/// The weight is `∂term/∂body`, used to chain the body gradient.
fn constraint_term(sense: ConstraintSense, body: f64, lambda: f64, mu: f64) -> (f64, f64) {
    match sense {
        ConstraintSense::Eq => (lambda * body + 0.5 * mu * body * body, lambda + mu * body),
        ConstraintSense::Le => {
            let shifted = (lambda + mu * body).max(0.0);
            ((shifted * shifted - lambda * lambda) / (2.0 * mu), shifted)
        }
        ConstraintSense::Ge => {
            let shifted = (lambda - mu * body).max(0.0);
            ((shifted * shifted - lambda * lambda) / (2.0 * mu), -shifted)
        }
    }
}

/// First-order multiplier update after a round with penalty `mu`.
fn update_multiplier(sense: ConstraintSense, body: f64, lambda: f64, mu: f64) -> f64 {
    match sense {
        ConstraintSense::Eq => lambda + mu * body,
        ConstraintSense::Le => (lambda + mu * body).max(0.0),
        ConstraintSense::Ge => (lambda - mu * body).max(0.0),
    }
}

struct AugmentedLagrangian<'a> {
    model: &'a Model,
    reparam: &'a Reparam,
    /// +1 to minimize, −1 to maximize
    sign: f64,
    multipliers: &'a [f64],
    penalty: f64,
}

impl CostFunction for AugmentedLagrangian<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, y: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let x = self.reparam.expand(y);
        let mut value = self.sign * self.model.objective_value(&x);
        for (c, &lambda) in self.model.constraints().iter().zip(self.multipliers) {
            value += constraint_term(c.sense, c.body.eval(&x), lambda, self.penalty).0;
        }
        Ok(value)
    }
}

impl Gradient for AugmentedLagrangian<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, y: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let x = self.reparam.expand(y);
        let mut grad_x = vec![0.0; x.len()];
        self.model
            .objective()
            .accumulate_gradient(&x, self.sign, &mut grad_x);
        for (c, &lambda) in self.model.constraints().iter().zip(self.multipliers) {
            let (_, weight) = constraint_term(c.sense, c.body.eval(&x), lambda, self.penalty);
            c.body.accumulate_gradient(&x, weight, &mut grad_x);
        }

        // Chain rule through x = T(y)
        Ok(self
            .reparam
            .free
            .iter()
            .zip(y)
            .map(|(&i, &yi)| grad_x[i] * self.reparam.transforms[i].derivative(yi))
            .collect())
    }
}

impl SolverBackend for NlpBackend {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn supported_classes(&self) -> &[ProblemClass] {
        &[ProblemClass::LinearProgram, ProblemClass::NonlinearProgram]
    }

    fn solve(&self, model: &Model, settings: &SolverSettings) -> Result<ModelSolution, SolveError> {
        let start = Instant::now();
        self.ensure_supported(model)?;

        let reparam = Reparam::new(model);
        let sign = match model.sense() {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        let time_limit = settings.time_limit();

        let mut y = reparam.initial();
        let mut multipliers = vec![0.0; model.num_constraints()];
        let mut penalty = settings.initial_penalty;
        let mut violation = model.max_violation(&reparam.expand(&y));
        let mut iterations = 0usize;

        // ====================================================================
        // OUTER LOOP: MULTIPLIER AND PENALTY UPDATES
        // ====================================================================

        for round in 0..settings.max_outer_iterations {
            if let Some(limit) = time_limit {
                if start.elapsed() > limit {
                    return Err(SolveError::failure(
                        BACKEND_ID,
                        format!("time limit of {:.1}s reached", limit.as_secs_f64()),
                    ));
                }
            }

            if !y.is_empty() {
                let problem = AugmentedLagrangian {
                    model,
                    reparam: &reparam,
                    sign,
                    multipliers: &multipliers,
                    penalty,
                };

                // INNER LOOP: L-BFGS on the augmented Lagrangian
                let linesearch = MoreThuenteLineSearch::new();
                let solver = LBFGS::new(linesearch, settings.lbfgs_memory);
                let executor = Executor::new(problem, solver)
                    .configure(|state| state.param(y.clone()).max_iters(settings.max_iterations));

                match executor.run() {
                    Ok(res) => {
                        iterations += res.state().get_iter() as usize;
                        if let Some(best) = res.state().get_best_param() {
                            y = best.clone();
                        }
                    }
                    Err(err) => {
                        // Line search failure; continue from the current point
                        trace!(round, error = %err, "L-BFGS round ended early");
                    }
                }
            }

            let x = reparam.expand(&y);
            let previous = violation;
            violation = model.max_violation(&x);
            debug!(
                model = model.name(),
                round,
                penalty,
                violation,
                objective = model.objective_value(&x),
                "augmented Lagrangian round"
            );

            if violation <= settings.tolerance {
                break;
            }

            for (c, lambda) in model.constraints().iter().zip(multipliers.iter_mut()) {
                *lambda = update_multiplier(c.sense, c.body.eval(&x), *lambda, penalty);
            }
            if violation > VIOLATION_DECREASE * previous {
                penalty = (penalty * settings.penalty_growth).min(MAX_PENALTY);
            }
        }

        let values = reparam.expand(&y);
        if violation > settings.tolerance {
            return Err(SolveError::failure(
                BACKEND_ID,
                format!(
                    "{}: no convergence after {} rounds (max violation {violation:.3e})",
                    model.name(),
                    settings.max_outer_iterations
                ),
            ));
        }

        let objective = model.objective_value(&values);
        let solve_time = start.elapsed();
        info!(
            model = model.name(),
            objective,
            iterations,
            max_violation = violation,
            elapsed_ms = solve_time.as_millis() as u64,
            "nlp solve finished"
        );

        Ok(ModelSolution {
            status: SolveStatus::LocallyOptimal,
            objective,
            values,
            iterations,
            solve_time,
            max_violation: violation,
            backend: BACKEND_ID.to_string(),
        })
    }
}
