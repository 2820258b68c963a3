use super::VarId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Optimality claim attached to a returned solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Globally optimal (LP/MILP, or exhaustive enumeration over convex leaves).
    Optimal,
    /// Feasible local optimum from a nonlinear solver.
    LocallyOptimal,
}

/// Raw result of solving a [`Model`](super::Model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSolution {
    pub status: SolveStatus,
    pub objective: f64,
    /// Values indexed by [`VarId::index`]
    pub values: Vec<f64>,
    pub iterations: usize,
    pub solve_time: Duration,
    /// Largest constraint/bound violation at `values`
    pub max_violation: f64,
    pub backend: String,
}

impl ModelSolution {
    pub fn value(&self, id: VarId) -> f64 {
        self.values[id.index()]
    }

    /// Binary decision read with rounding at 0.5.
    pub fn is_set(&self, id: VarId) -> bool {
        self.value(id) > 0.5
    }
}
