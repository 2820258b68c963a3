//! Solver-independent algebraic model representation.
//!
//! The restoration models are assembled here once and then handed to any
//! [`SolverBackend`](crate::solver::SolverBackend). A model is a list of
//! bounded variables, a list of constraints of the form `body ⋄ 0` and one
//! objective.

mod expr;
mod solution;

pub use expr::{Expr, LinearTerms, VarId};
pub use solution::{ModelSolution, SolveStatus};

use crate::error::ConstructionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    Binary,
    Integer,
}

impl VarKind {
    pub fn is_discrete(&self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

impl VarDef {
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    /// Distance from `value` to `[lower, upper]`.
    pub fn bound_violation(&self, value: f64) -> f64 {
        (self.lower - value).max(value - self.upper).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintSense {
    /// `body ≤ 0`
    Le,
    /// `body ≥ 0`
    Ge,
    /// `body = 0`
    Eq,
}

impl ConstraintSense {
    fn symbol(&self) -> &'static str {
        match self {
            ConstraintSense::Le => "<=",
            ConstraintSense::Ge => ">=",
            ConstraintSense::Eq => "=",
        }
    }
}

/// Named constraint `body ⋄ 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub body: Expr,
    pub sense: ConstraintSense,
}

impl Constraint {
    /// `lhs ≤ rhs`
    pub fn leq(name: impl Into<String>, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(name, lhs.into() - rhs.into(), ConstraintSense::Le)
    }

    /// `lhs ≥ rhs`
    pub fn geq(name: impl Into<String>, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(name, lhs.into() - rhs.into(), ConstraintSense::Ge)
    }

    /// `lhs = rhs`
    pub fn eq(name: impl Into<String>, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(name, lhs.into() - rhs.into(), ConstraintSense::Eq)
    }

    pub fn new(name: impl Into<String>, body: Expr, sense: ConstraintSense) -> Self {
        Self {
            name: name.into(),
            body,
            sense,
        }
    }

    /// Amount by which the constraint is violated at `x` (0 when satisfied).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let value = self.body.eval(x);
        match self.sense {
            ConstraintSense::Le => value.max(0.0),
            ConstraintSense::Ge => (-value).max(0.0),
            ConstraintSense::Eq => value.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// Structural class of a model, used to pick a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemClass {
    LinearProgram,
    MixedIntegerLinear,
    NonlinearProgram,
    MixedIntegerNonlinear,
}

impl ProblemClass {
    pub fn has_integers(&self) -> bool {
        matches!(
            self,
            ProblemClass::MixedIntegerLinear | ProblemClass::MixedIntegerNonlinear
        )
    }

    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            ProblemClass::LinearProgram | ProblemClass::MixedIntegerLinear
        )
    }
}

impl fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProblemClass::LinearProgram => "LP",
            ProblemClass::MixedIntegerLinear => "MILP",
            ProblemClass::NonlinearProgram => "NLP",
            ProblemClass::MixedIntegerNonlinear => "MINLP",
        };
        f.write_str(s)
    }
}

/// An optimization model: variables, constraints and one objective.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
    sense: ObjectiveSense,
    objective: Expr,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
            sense: ObjectiveSense::Minimize,
            objective: Expr::zero(),
        }
    }

    fn push_var(&mut self, name: String, kind: VarKind, lower: f64, upper: f64) -> VarId {
        let id = VarId::new(self.vars.len());
        self.vars.push(VarDef {
            name,
            kind,
            lower,
            upper,
        });
        id
    }

    /// Continuous variable in `[lower, upper]` (either side may be infinite).
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_var(name.into(), VarKind::Continuous, lower, upper)
    }

    /// Unbounded continuous variable.
    pub fn add_free(&mut self, name: impl Into<String>) -> VarId {
        self.add_continuous(name, f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Binary, 0.0, 1.0)
    }

    pub fn add_integer(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_var(name.into(), VarKind::Integer, lower, upper)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    pub fn set_objective(&mut self, sense: ObjectiveSense, objective: impl Into<Expr>) {
        self.sense = sense;
        self.objective = objective.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.vars[id.index()]
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn objective(&self) -> &Expr {
        &self.objective
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.eval(x)
    }

    /// Ids of discrete variables whose bounds do not already fix them.
    pub fn free_discrete_vars(&self) -> Vec<VarId> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind.is_discrete() && !v.is_fixed())
            .map(|(i, _)| VarId::new(i))
            .collect()
    }

    /// Classify as LP, MILP, NLP or MINLP.
    ///
    /// Discrete variables already fixed by their bounds do not count.
    pub fn problem_class(&self) -> ProblemClass {
        let integers = !self.free_discrete_vars().is_empty();
        let linear = self.objective.is_linear() && self.constraints.iter().all(|c| c.body.is_linear());
        match (integers, linear) {
            (false, true) => ProblemClass::LinearProgram,
            (true, true) => ProblemClass::MixedIntegerLinear,
            (false, false) => ProblemClass::NonlinearProgram,
            (true, false) => ProblemClass::MixedIntegerNonlinear,
        }
    }

    /// Check variable bounds, variable references and constants.
    pub fn validate(&self) -> Result<(), ConstructionError> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(self.vars.len());
        for (i, var) in self.vars.iter().enumerate() {
            if let Some(prev) = seen.insert(var.name.as_str(), i) {
                return Err(ConstructionError::Duplicate {
                    what: "variable",
                    index: format!("{} (#{prev} and #{i})", var.name),
                });
            }
            if var.lower.is_nan() || var.upper.is_nan() || var.lower > var.upper {
                return Err(ConstructionError::InvalidParameter {
                    param: "bounds",
                    index: var.name.clone(),
                    reason: format!("[{}, {}] is not an interval", var.lower, var.upper),
                });
            }
            if var.kind.is_discrete() && !(var.lower.is_finite() && var.upper.is_finite()) {
                return Err(ConstructionError::InvalidParameter {
                    param: "bounds",
                    index: var.name.clone(),
                    reason: "discrete variables need finite bounds".into(),
                });
            }
        }

        let check_expr = |what: &str, expr: &Expr| -> Result<(), ConstructionError> {
            if let Some(bad) = expr.vars().into_iter().find(|v| v.index() >= self.vars.len()) {
                return Err(ConstructionError::Structure(format!(
                    "{what} references undeclared variable {bad}"
                )));
            }
            if !constants_finite(expr) {
                return Err(ConstructionError::Structure(format!(
                    "{what} contains a non-finite coefficient"
                )));
            }
            Ok(())
        };

        check_expr("objective", &self.objective)?;
        for c in &self.constraints {
            check_expr(format!("constraint `{}`", c.name).as_str(), &c.body)?;
        }
        Ok(())
    }

    /// Largest constraint or bound violation at `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let bounds = self
            .vars
            .iter()
            .zip(x)
            .map(|(v, &xi)| v.bound_violation(xi))
            .fold(0.0_f64, f64::max);
        self.constraints
            .iter()
            .map(|c| c.violation(x))
            .fold(bounds, f64::max)
    }

    /// Copy of the model with the given variables fixed (`lower = upper = value`).
    pub fn with_fixed(&self, values: &[(VarId, f64)]) -> Model {
        let mut fixed = self.clone();
        for &(id, value) in values {
            let var = &mut fixed.vars[id.index()];
            var.lower = value;
            var.upper = value;
        }
        fixed
    }

    fn var_name(&self, id: VarId) -> String {
        self.vars
            .get(id.index())
            .map(|v| v.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

fn constants_finite(expr: &Expr) -> bool {
    match expr {
        Expr::Const(c) => c.is_finite(),
        Expr::Var(_) => true,
        Expr::Sum(terms) => terms.iter().all(constants_finite),
        Expr::Scale(c, e) => c.is_finite() && constants_finite(e),
        Expr::Product(a, b) => constants_finite(a) && constants_finite(b),
        Expr::Powi(e, _) | Expr::Sin(e) | Expr::Cos(e) => constants_finite(e),
    }
}

struct Named<'a> {
    model: &'a Model,
    expr: &'a Expr,
}

impl fmt::Display for Named<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.write_with(f, &|id| self.model.var_name(id))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\\ model {} ({})", self.name, self.problem_class())?;
        let sense = match self.sense {
            ObjectiveSense::Minimize => "minimize",
            ObjectiveSense::Maximize => "maximize",
        };
        writeln!(f, "{sense}")?;
        writeln!(f, "  obj: {}", Named { model: self, expr: &self.objective })?;
        writeln!(f, "subject to")?;
        for c in &self.constraints {
            writeln!(
                f,
                "  {}: {} {} 0",
                c.name,
                Named { model: self, expr: &c.body },
                c.sense.symbol()
            )?;
        }
        writeln!(f, "bounds")?;
        for v in self.vars.iter().filter(|v| v.kind == VarKind::Continuous) {
            writeln!(f, "  {} <= {} <= {}", v.lower, v.name, v.upper)?;
        }
        let discrete: Vec<&VarDef> = self.vars.iter().filter(|v| v.kind.is_discrete()).collect();
        if !discrete.is_empty() {
            writeln!(f, "general")?;
            for v in discrete {
                writeln!(f, "  {} in [{}, {}]", v.name, v.lower, v.upper)?;
            }
        }
        write!(f, "end")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_milp() -> (Model, VarId, VarId) {
        let mut m = Model::new("toy");
        let x = m.add_continuous("x", 0.0, 10.0);
        let y = m.add_binary("y");
        m.add_constraint(Constraint::leq("link", x, 10.0 * y));
        m.set_objective(ObjectiveSense::Maximize, x - 2.0 * y);
        (m, x, y)
    }

    #[test]
    fn test_problem_class() {
        let (m, x, y) = small_milp();
        assert_eq!(m.problem_class(), ProblemClass::MixedIntegerLinear);

        let fixed = m.with_fixed(&[(y, 1.0)]);
        assert_eq!(fixed.problem_class(), ProblemClass::LinearProgram);

        let mut nl = m.clone();
        nl.add_constraint(Constraint::leq("circle", Expr::from(x).square(), 4.0));
        assert_eq!(nl.problem_class(), ProblemClass::MixedIntegerNonlinear);
        assert_eq!(nl.with_fixed(&[(y, 0.0)]).problem_class(), ProblemClass::NonlinearProgram);
    }

    #[test]
    fn test_violation_covers_bounds_and_constraints() {
        let (m, _, _) = small_milp();
        assert_eq!(m.max_violation(&[5.0, 1.0]), 0.0);
        // x above the link
        assert_eq!(m.max_violation(&[5.0, 0.0]), 5.0);
        // x outside its domain
        assert_eq!(m.max_violation(&[12.0, 1.0]), 2.0);
    }

    #[test]
    fn test_with_fixed_leaves_original_untouched() {
        let (m, _, y) = small_milp();
        let fixed = m.with_fixed(&[(y, 1.0)]);
        assert!(fixed.var(y).is_fixed());
        assert!(!m.var(y).is_fixed());
    }

    #[test]
    fn test_validate_rejects_bad_bounds_and_references() {
        let mut m = Model::new("bad");
        m.add_continuous("x", 1.0, 0.0);
        assert!(matches!(
            m.validate(),
            Err(ConstructionError::InvalidParameter { param: "bounds", .. })
        ));

        let mut m = Model::new("dangling");
        let x = m.add_free("x");
        m.add_constraint(Constraint::eq("c", x + VarId::new(7), 0.0));
        assert!(matches!(m.validate(), Err(ConstructionError::Structure(_))));

        let mut m = Model::new("nan");
        let x = m.add_free("x");
        m.set_objective(ObjectiveSense::Minimize, f64::NAN * x);
        assert!(m.validate().is_err());

        let mut m = Model::new("dup");
        m.add_binary("z");
        m.add_binary("z");
        assert!(matches!(m.validate(), Err(ConstructionError::Duplicate { .. })));
    }

    #[test]
    fn test_display_uses_variable_names() {
        let (m, _, _) = small_milp();
        let text = m.to_string();
        assert!(text.contains("maximize"));
        assert!(text.contains("link: (x + -10 y) <= 0"));
        assert!(text.contains("y in [0, 1]"));
        assert!(text.ends_with("end"));
    }
}
