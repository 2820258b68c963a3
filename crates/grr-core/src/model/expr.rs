//! Expression trees over model variables.
//!
//! Expressions are small trees built with ordinary arithmetic operators:
//!
//! ```
//! use grr_core::model::{Expr, VarId};
//!
//! let v_n = VarId::new(0);
//! let v_m = VarId::new(1);
//! let theta = VarId::new(2);
//!
//! // v_n² g − v_n v_m g cos θ
//! let g = 2.0;
//! let flow = g * Expr::from(v_n).square() - g * (v_n * v_m) * Expr::from(theta).cos();
//!
//! let x = [1.0, 1.0, 0.0];
//! assert!((flow.eval(&x)).abs() < 1e-12);
//! ```
//!
//! Backends consume them in two ways: affine expressions are decomposed with
//! [`Expr::linear_terms`] for LP/MILP solvers, everything else is evaluated
//! with [`Expr::eval`] and differentiated with [`Expr::accumulate_gradient`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Dense index of a variable inside its [`Model`](super::Model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn new(index: usize) -> Self {
        VarId(index)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x[{}]", self.0)
    }
}

/// Algebraic expression over model variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(VarId),
    Sum(Vec<Expr>),
    /// `c · e`
    Scale(f64, Box<Expr>),
    Product(Box<Expr>, Box<Expr>),
    /// Integer power `e^n`
    Powi(Box<Expr>, i32),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
}

/// Affine decomposition `Σ a_i x_i + c` of an expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearTerms {
    pub coefficients: BTreeMap<VarId, f64>,
    pub constant: f64,
}

impl LinearTerms {
    fn constant(c: f64) -> Self {
        Self {
            coefficients: BTreeMap::new(),
            constant: c,
        }
    }

    fn is_constant(&self) -> bool {
        self.coefficients.values().all(|a| *a == 0.0)
    }

    fn add_scaled(&mut self, other: &LinearTerms, factor: f64) {
        for (var, coeff) in &other.coefficients {
            *self.coefficients.entry(*var).or_insert(0.0) += factor * coeff;
        }
        self.constant += factor * other.constant;
    }

    fn scaled(mut self, factor: f64) -> Self {
        for coeff in self.coefficients.values_mut() {
            *coeff *= factor;
        }
        self.constant *= factor;
        self
    }

    /// Drop explicit zero coefficients.
    pub fn prune(mut self) -> Self {
        self.coefficients.retain(|_, a| *a != 0.0);
        self
    }
}

impl Expr {
    pub fn zero() -> Self {
        Expr::Const(0.0)
    }

    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn var(id: VarId) -> Self {
        Expr::Var(id)
    }

    /// Sum of an iterator of terms (empty sum is zero).
    pub fn sum<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        let terms: Vec<Expr> = terms.into_iter().map(Into::into).collect();
        match terms.len() {
            0 => Expr::zero(),
            _ => Expr::Sum(terms),
        }
    }

    pub fn sin(self) -> Self {
        Expr::Sin(Box::new(self))
    }

    pub fn cos(self) -> Self {
        Expr::Cos(Box::new(self))
    }

    pub fn powi(self, n: i32) -> Self {
        Expr::Powi(Box::new(self), n)
    }

    pub fn square(self) -> Self {
        self.powi(2)
    }

    /// Value of the expression at point `x` (indexed by [`VarId::index`]).
    pub fn eval(&self, x: &[f64]) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Var(id) => x[id.index()],
            Expr::Sum(terms) => terms.iter().map(|t| t.eval(x)).sum(),
            Expr::Scale(c, e) => c * e.eval(x),
            Expr::Product(a, b) => a.eval(x) * b.eval(x),
            Expr::Powi(e, n) => e.eval(x).powi(*n),
            Expr::Sin(e) => e.eval(x).sin(),
            Expr::Cos(e) => e.eval(x).cos(),
        }
    }

    /// Add `weight · ∇expr(x)` into `grad` (reverse-mode).
    pub fn accumulate_gradient(&self, x: &[f64], weight: f64, grad: &mut [f64]) {
        if weight == 0.0 {
            return;
        }
        match self {
            Expr::Const(_) => {}
            Expr::Var(id) => grad[id.index()] += weight,
            Expr::Sum(terms) => {
                for term in terms {
                    term.accumulate_gradient(x, weight, grad);
                }
            }
            Expr::Scale(c, e) => e.accumulate_gradient(x, weight * c, grad),
            Expr::Product(a, b) => {
                let va = a.eval(x);
                let vb = b.eval(x);
                a.accumulate_gradient(x, weight * vb, grad);
                b.accumulate_gradient(x, weight * va, grad);
            }
            Expr::Powi(e, n) => {
                if *n != 0 {
                    let v = e.eval(x);
                    e.accumulate_gradient(x, weight * f64::from(*n) * v.powi(n - 1), grad);
                }
            }
            Expr::Sin(e) => {
                let v = e.eval(x);
                e.accumulate_gradient(x, weight * v.cos(), grad);
            }
            Expr::Cos(e) => {
                let v = e.eval(x);
                e.accumulate_gradient(x, -weight * v.sin(), grad);
            }
        }
    }

    /// Insert every variable referenced by the expression into `out`.
    pub fn collect_vars(&self, out: &mut BTreeSet<VarId>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(id) => {
                out.insert(*id);
            }
            Expr::Sum(terms) => terms.iter().for_each(|t| t.collect_vars(out)),
            Expr::Scale(_, e) | Expr::Powi(e, _) | Expr::Sin(e) | Expr::Cos(e) => e.collect_vars(out),
            Expr::Product(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }

    /// Variables referenced by the expression.
    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    /// Affine decomposition, or `None` when the expression is nonlinear.
    ///
    /// Nonlinear operators applied to constant subtrees fold to constants.
    pub fn linear_terms(&self) -> Option<LinearTerms> {
        match self {
            Expr::Const(c) => Some(LinearTerms::constant(*c)),
            Expr::Var(id) => {
                let mut terms = LinearTerms::default();
                terms.coefficients.insert(*id, 1.0);
                Some(terms)
            }
            Expr::Sum(items) => {
                let mut acc = LinearTerms::default();
                for item in items {
                    acc.add_scaled(&item.linear_terms()?, 1.0);
                }
                Some(acc)
            }
            Expr::Scale(c, e) => Some(e.linear_terms()?.scaled(*c)),
            Expr::Product(a, b) => {
                let la = a.linear_terms()?;
                let lb = b.linear_terms()?;
                if la.is_constant() {
                    Some(lb.scaled(la.constant))
                } else if lb.is_constant() {
                    Some(la.scaled(lb.constant))
                } else {
                    None
                }
            }
            Expr::Powi(e, n) => {
                let inner = e.linear_terms()?;
                match n {
                    0 => Some(LinearTerms::constant(1.0)),
                    1 => Some(inner),
                    _ if inner.is_constant() => Some(LinearTerms::constant(inner.constant.powi(*n))),
                    _ => None,
                }
            }
            Expr::Sin(e) | Expr::Cos(e) => {
                let inner = e.linear_terms()?;
                if !inner.is_constant() {
                    return None;
                }
                let value = match self {
                    Expr::Sin(_) => inner.constant.sin(),
                    _ => inner.constant.cos(),
                };
                Some(LinearTerms::constant(value))
            }
        }
    }

    pub fn is_linear(&self) -> bool {
        self.linear_terms().is_some()
    }

    /// Write the expression with a custom variable namer.
    pub(crate) fn write_with(
        &self,
        f: &mut fmt::Formatter<'_>,
        name: &dyn Fn(VarId) -> String,
    ) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{c}"),
            Expr::Var(id) => write!(f, "{}", name(*id)),
            Expr::Sum(terms) => {
                write!(f, "(")?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    term.write_with(f, name)?;
                }
                write!(f, ")")
            }
            Expr::Scale(c, e) => {
                write!(f, "{c} ")?;
                e.write_with(f, name)
            }
            Expr::Product(a, b) => {
                a.write_with(f, name)?;
                write!(f, " * ")?;
                b.write_with(f, name)
            }
            Expr::Powi(e, n) => {
                e.write_with(f, name)?;
                write!(f, "^{n}")
            }
            Expr::Sin(e) => {
                write!(f, "sin(")?;
                e.write_with(f, name)?;
                write!(f, ")")
            }
            Expr::Cos(e) => {
                write!(f, "cos(")?;
                e.write_with(f, name)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, &|id| id.to_string())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl From<VarId> for Expr {
    fn from(id: VarId) -> Self {
        Expr::Var(id)
    }
}

impl From<&VarId> for Expr {
    fn from(id: &VarId) -> Self {
        Expr::Var(*id)
    }
}

fn add_exprs(lhs: Expr, rhs: Expr) -> Expr {
    match (lhs, rhs) {
        (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
        (Expr::Const(c), e) | (e, Expr::Const(c)) if c == 0.0 => e,
        (Expr::Sum(mut terms), Expr::Sum(more)) => {
            terms.extend(more);
            Expr::Sum(terms)
        }
        (Expr::Sum(mut terms), e) => {
            terms.push(e);
            Expr::Sum(terms)
        }
        (e, Expr::Sum(mut terms)) => {
            terms.insert(0, e);
            Expr::Sum(terms)
        }
        (a, b) => Expr::Sum(vec![a, b]),
    }
}

fn scale_expr(factor: f64, e: Expr) -> Expr {
    match e {
        Expr::Const(c) => Expr::Const(factor * c),
        _ if factor == 0.0 => Expr::Const(0.0),
        Expr::Scale(c, inner) => Expr::Scale(factor * c, inner),
        other if factor == 1.0 => other,
        other => Expr::Scale(factor, Box::new(other)),
    }
}

fn mul_exprs(lhs: Expr, rhs: Expr) -> Expr {
    match (lhs, rhs) {
        (Expr::Const(c), e) | (e, Expr::Const(c)) => scale_expr(c, e),
        (a, b) => Expr::Product(Box::new(a), Box::new(b)),
    }
}

impl<R: Into<Expr>> Add<R> for Expr {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        add_exprs(self, rhs.into())
    }
}

impl<R: Into<Expr>> Sub<R> for Expr {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        add_exprs(self, scale_expr(-1.0, rhs.into()))
    }
}

impl<R: Into<Expr>> Mul<R> for Expr {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        mul_exprs(self, rhs.into())
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        scale_expr(-1.0, self)
    }
}

impl<R: Into<Expr>> AddAssign<R> for Expr {
    fn add_assign(&mut self, rhs: R) {
        let lhs = std::mem::replace(self, Expr::zero());
        *self = add_exprs(lhs, rhs.into());
    }
}

impl<R: Into<Expr>> SubAssign<R> for Expr {
    fn sub_assign(&mut self, rhs: R) {
        let lhs = std::mem::replace(self, Expr::zero());
        *self = add_exprs(lhs, scale_expr(-1.0, rhs.into()));
    }
}

impl<R: Into<Expr>> Add<R> for VarId {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        Expr::from(self) + rhs
    }
}

impl<R: Into<Expr>> Sub<R> for VarId {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        Expr::from(self) - rhs
    }
}

impl<R: Into<Expr>> Mul<R> for VarId {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        Expr::from(self) * rhs
    }
}

impl Neg for VarId {
    type Output = Expr;
    fn neg(self) -> Expr {
        -Expr::from(self)
    }
}

impl Add<Expr> for f64 {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::from(self) + rhs
    }
}

impl Add<VarId> for f64 {
    type Output = Expr;
    fn add(self, rhs: VarId) -> Expr {
        Expr::from(self) + rhs
    }
}

impl Sub<Expr> for f64 {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::from(self) - rhs
    }
}

impl Sub<VarId> for f64 {
    type Output = Expr;
    fn sub(self, rhs: VarId) -> Expr {
        Expr::from(self) - rhs
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        scale_expr(self, rhs)
    }
}

impl Mul<VarId> for f64 {
    type Output = Expr;
    fn mul(self, rhs: VarId) -> Expr {
        scale_expr(self, Expr::from(rhs))
    }
}
