//! Exact MINLP driver for small instances.
//!
//! Discrete variables are assigned depth-first. After every assignment the
//! linear constraints over discrete variables only are checked with interval
//! arithmetic, and branches that cannot satisfy them are cut. Each surviving
//! leaf fixes the discrete variables and solves the continuous remainder:
//! LP leaves with [`MilpBackend`], nonlinear leaves with [`NlpBackend`].
//!
//! Only interval-pruned branches and leaves the MILP backend proves
//! infeasible count as infeasible. A nonlinear leaf on which the local
//! solver does not converge stays unresolved: the best resolved leaf is
//! still returned (as locally optimal), and if none exists the search
//! ends in a solver failure.

use std::time::Instant;

use grr_core::config::SolverSettings;
use grr_core::model::{
    ConstraintSense, LinearTerms, Model, ModelSolution, ObjectiveSense, ProblemClass, SolveStatus,
    VarId,
};
use grr_core::{SolveError, SolverBackend};
use tracing::{debug, info, trace, warn};

use super::milp::MilpBackend;
use super::nlp::NlpBackend;

const BACKEND_ID: &str = "enumeration";

#[derive(Debug, Clone, Default)]
pub struct EnumerationBackend {
    linear: MilpBackend,
    nonlinear: NlpBackend,
}

impl EnumerationBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Linear constraint touching discrete variables only.
struct DiscreteRow {
    terms: LinearTerms,
    sense: ConstraintSense,
}

impl DiscreteRow {
    /// Can the row still hold given the assigned values and the bounds of
    /// the unassigned variables?
    fn satisfiable(&self, assigned: &[Option<f64>], model: &Model, tol: f64) -> bool {
        let mut lo = self.terms.constant;
        let mut hi = self.terms.constant;
        for (var, &a) in &self.terms.coefficients {
            match assigned[var.index()] {
                Some(v) => {
                    lo += a * v;
                    hi += a * v;
                }
                None => {
                    let def = model.var(*var);
                    lo += (a * def.lower).min(a * def.upper);
                    hi += (a * def.lower).max(a * def.upper);
                }
            }
        }
        match self.sense {
            ConstraintSense::Le => lo <= tol,
            ConstraintSense::Ge => hi >= -tol,
            ConstraintSense::Eq => lo <= tol && hi >= -tol,
        }
    }
}

struct Search<'a> {
    backend: &'a EnumerationBackend,
    model: &'a Model,
    settings: &'a SolverSettings,
    start: Instant,
    order: Vec<VarId>,
    rows: Vec<DiscreteRow>,
    /// Rows touching each variable (indexed by model variable)
    rows_of: Vec<Vec<usize>>,
    assigned: Vec<Option<f64>>,
    leaves: usize,
    /// Leaves the local solver left undecided, with the last reason
    unresolved: usize,
    last_failure: Option<SolveError>,
    iterations: usize,
    all_optimal: bool,
    best: Option<ModelSolution>,
}

impl Search<'_> {
    fn better(&self, candidate: &ModelSolution) -> bool {
        match &self.best {
            None => true,
            Some(best) => match self.model.sense() {
                ObjectiveSense::Minimize => candidate.objective < best.objective,
                ObjectiveSense::Maximize => candidate.objective > best.objective,
            },
        }
    }

    fn consistent(&self, var: VarId) -> bool {
        self.rows_of[var.index()].iter().all(|&r| {
            self.rows[r].satisfiable(&self.assigned, self.model, self.settings.tolerance)
        })
    }

    fn descend(&mut self, depth: usize) -> Result<(), SolveError> {
        if depth == self.order.len() {
            return self.leaf();
        }
        let var = self.order[depth];
        let def = self.model.var(var);
        let tol = self.settings.integrality_tolerance;
        let (lo, hi) = ((def.lower - tol).ceil() as i64, (def.upper + tol).floor() as i64);
        for value in lo..=hi {
            self.assigned[var.index()] = Some(value as f64);
            if self.consistent(var) {
                self.descend(depth + 1)?;
            }
        }
        self.assigned[var.index()] = None;
        Ok(())
    }

    fn leaf(&mut self) -> Result<(), SolveError> {
        self.leaves += 1;
        if self.leaves > self.settings.max_binary_assignments {
            return Err(SolveError::failure(
                BACKEND_ID,
                format!(
                    "more than {} discrete assignments survive pruning",
                    self.settings.max_binary_assignments
                ),
            ));
        }

        let mut inner = self.settings.clone();
        if let Some(limit) = self.settings.time_limit() {
            let elapsed = self.start.elapsed();
            if elapsed >= limit {
                return Err(SolveError::failure(BACKEND_ID, "time limit reached"));
            }
            inner.time_limit_secs = Some((limit - elapsed).as_secs_f64());
        }

        let fixes: Vec<(VarId, f64)> = self
            .order
            .iter()
            .map(|&v| (v, self.assigned[v.index()].unwrap_or_default()))
            .collect();
        let leaf_model = self.model.with_fixed(&fixes);
        let linear = leaf_model.problem_class() == ProblemClass::LinearProgram;
        let outcome = if linear {
            self.backend.linear.solve(&leaf_model, &inner)
        } else {
            self.backend.nonlinear.solve(&leaf_model, &inner)
        };

        match outcome {
            Ok(solution) => {
                self.iterations += solution.iterations;
                self.all_optimal &= solution.status == SolveStatus::Optimal;
                trace!(leaf = self.leaves, objective = solution.objective, "feasible leaf");
                if self.better(&solution) {
                    self.best = Some(solution);
                }
                Ok(())
            }
            Err(err @ SolveError::Infeasible(_)) if linear => {
                trace!(leaf = self.leaves, error = %err, "leaf skipped");
                Ok(())
            }
            Err(err @ SolveError::SolverFailure { .. }) if !linear => {
                debug!(leaf = self.leaves, error = %err, "leaf unresolved");
                self.unresolved += 1;
                self.all_optimal = false;
                self.last_failure = Some(err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl SolverBackend for EnumerationBackend {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn supported_classes(&self) -> &[ProblemClass] {
        &[
            ProblemClass::LinearProgram,
            ProblemClass::MixedIntegerLinear,
            ProblemClass::NonlinearProgram,
            ProblemClass::MixedIntegerNonlinear,
        ]
    }

    fn solve(&self, model: &Model, settings: &SolverSettings) -> Result<ModelSolution, SolveError> {
        let start = Instant::now();
        self.ensure_supported(model)?;

        let order = model.free_discrete_vars();
        let mut assigned: Vec<Option<f64>> = vec![None; model.num_vars()];
        for (i, def) in model.vars().iter().enumerate() {
            if def.kind.is_discrete() && def.is_fixed() {
                assigned[i] = Some(def.lower);
            }
        }

        let mut rows = Vec::new();
        let mut rows_of = vec![Vec::new(); model.num_vars()];
        for c in model.constraints() {
            let Some(terms) = c.body.linear_terms() else {
                continue;
            };
            let terms = terms.prune();
            if terms.coefficients.is_empty()
                || !terms.coefficients.keys().all(|v| model.var(*v).kind.is_discrete())
            {
                continue;
            }
            for v in terms.coefficients.keys() {
                rows_of[v.index()].push(rows.len());
            }
            rows.push(DiscreteRow {
                terms,
                sense: c.sense,
            });
        }

        debug!(
            model = model.name(),
            discrete = order.len(),
            pruning_rows = rows.len(),
            "enumerating discrete assignments"
        );

        let mut search = Search {
            backend: self,
            model,
            settings,
            start,
            order,
            rows,
            rows_of,
            assigned,
            leaves: 0,
            unresolved: 0,
            last_failure: None,
            iterations: 0,
            all_optimal: true,
            best: None,
        };
        search.descend(0)?;

        let leaves = search.leaves;
        let unresolved = search.unresolved;
        let iterations = search.iterations;
        let status = if search.all_optimal {
            SolveStatus::Optimal
        } else {
            SolveStatus::LocallyOptimal
        };
        let mut best = match (search.best, search.last_failure) {
            (Some(best), _) => best,
            (None, Some(reason)) => {
                return Err(SolveError::failure(
                    BACKEND_ID,
                    format!(
                        "{}: {unresolved} of {leaves} discrete assignments unresolved, none feasible ({reason})",
                        model.name()
                    ),
                ));
            }
            (None, None) => {
                return Err(SolveError::Infeasible(format!(
                    "{}: none of {leaves} discrete assignments is feasible",
                    model.name()
                )));
            }
        };
        if unresolved > 0 {
            warn!(
                model = model.name(),
                unresolved,
                leaves,
                "some discrete assignments were not resolved; incumbent may not be the best"
            );
        }

        best.status = status;
        best.iterations = iterations;
        best.solve_time = start.elapsed();
        best.max_violation = model.max_violation(&best.values);
        best.backend = BACKEND_ID.to_string();

        info!(
            model = model.name(),
            leaves,
            objective = best.objective,
            max_violation = best.max_violation,
            elapsed_ms = best.solve_time.as_millis() as u64,
            "enumeration finished"
        );
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grr_core::model::{Constraint, Expr};

    #[test]
    fn test_minlp_picks_best_leaf() {
        // max x  s.t.  x ≤ 1 + z1 + 2 z2,  x² ≤ 4,  z1 + z2 ≤ 1
        let mut m = Model::new("pick");
        let x = m.add_continuous("x", 0.0, 5.0);
        let z1 = m.add_binary("z1");
        let z2 = m.add_binary("z2");
        m.add_constraint(Constraint::leq("cap", x, 1.0 + z1 + 2.0 * z2));
        m.add_constraint(Constraint::leq("round", Expr::from(x).square(), 4.0));
        m.add_constraint(Constraint::leq("one", z1 + z2, 1.0));
        m.set_objective(ObjectiveSense::Maximize, x - 0.1 * z2);

        let sol = EnumerationBackend::new()
            .solve(&m, &SolverSettings::default())
            .unwrap();
        // z2 = 1 gives x = 2 (objective 1.9), z1 = 1 gives x = 2 (objective 2)
        assert!(sol.is_set(z1) && !sol.is_set(z2));
        assert!((sol.objective - 2.0).abs() < 1e-3);
        assert_eq!(sol.status, SolveStatus::LocallyOptimal);
    }

    #[test]
    fn test_pruning_bounds_visited_leaves() {
        // Σ z = 1 over 12 binaries: 12 leaves survive, not 4096
        let mut m = Model::new("one-hot");
        let zs: Vec<VarId> = (0..12).map(|i| m.add_binary(format!("z{i}"))).collect();
        m.add_constraint(Constraint::eq("one", Expr::sum(zs.iter().copied()), 1.0));
        m.set_objective(
            ObjectiveSense::Maximize,
            Expr::sum(zs.iter().enumerate().map(|(i, &z)| (i as f64) * z)),
        );

        let settings = SolverSettings {
            max_binary_assignments: 12,
            ..SolverSettings::default()
        };
        let sol = EnumerationBackend::new().solve(&m, &settings).unwrap();
        assert!(sol.is_set(zs[11]));
        assert_eq!(sol.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_integer_range_is_enumerated() {
        // min (x − 2.6)²  s.t.  n ≤ x ≤ n,  n ∈ {0..4}  →  n = 3
        let mut m = Model::new("range");
        let x = m.add_continuous("x", 0.0, 4.0);
        let n = m.add_integer("n", 0.0, 4.0);
        m.add_constraint(Constraint::eq("tie", x, n));
        m.set_objective(ObjectiveSense::Minimize, (x - 2.6).square());

        let sol = EnumerationBackend::new()
            .solve(&m, &SolverSettings::default())
            .unwrap();
        assert_eq!(sol.value(n), 3.0);
        assert!((sol.objective - 0.16).abs() < 1e-6);
    }

    #[test]
    fn test_assignment_limit_is_failure() {
        let mut m = Model::new("wide");
        for i in 0..6 {
            m.add_binary(format!("z{i}"));
        }
        let settings = SolverSettings {
            max_binary_assignments: 10,
            ..SolverSettings::default()
        };
        let err = EnumerationBackend::new().solve(&m, &settings).unwrap_err();
        assert!(matches!(err, SolveError::SolverFailure { .. }));
    }

    #[test]
    fn test_unresolved_nonlinear_leaves_are_failure() {
        // x² = 3 + z has no solution in [0, 1], which a local solver cannot prove
        let mut m = Model::new("stuck");
        let x = m.add_continuous("x", 0.0, 1.0);
        let z = m.add_binary("z");
        m.add_constraint(Constraint::eq("far", Expr::from(x).square(), 3.0 + z));
        m.set_objective(ObjectiveSense::Minimize, x);

        let settings = SolverSettings {
            max_outer_iterations: 4,
            ..SolverSettings::default()
        };
        let err = EnumerationBackend::new().solve(&m, &settings).unwrap_err();
        assert!(matches!(err, SolveError::SolverFailure { .. }), "{err}");
    }

    #[test]
    fn test_unresolved_leaf_keeps_incumbent() {
        // z = 0 leaf is solvable, z = 1 leaf asks for x² = 3 on [0, 1]
        let mut m = Model::new("partial");
        let x = m.add_continuous("x", 0.0, 1.0);
        let z = m.add_binary("z");
        m.add_constraint(Constraint::eq("far", Expr::from(x).square(), 0.25 + 2.75 * z));
        m.set_objective(ObjectiveSense::Maximize, x + z);

        let settings = SolverSettings {
            max_outer_iterations: 6,
            ..SolverSettings::default()
        };
        let sol = EnumerationBackend::new().solve(&m, &settings).unwrap();
        assert!(!sol.is_set(z));
        assert!((sol.value(x) - 0.5).abs() < 1e-4);
        assert_eq!(sol.status, SolveStatus::LocallyOptimal);
    }

    #[test]
    fn test_all_leaves_infeasible() {
        let mut m = Model::new("none");
        let x = m.add_continuous("x", 0.0, 1.0);
        let z = m.add_binary("z");
        m.add_constraint(Constraint::geq("need", x, 2.0 + z));
        m.set_objective(ObjectiveSense::Minimize, x);

        let err = EnumerationBackend::new()
            .solve(&m, &SolverSettings::default())
            .unwrap_err();
        assert!(matches!(err, SolveError::Infeasible(_)));
    }
}
