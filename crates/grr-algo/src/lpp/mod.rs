//! AC Load Pickup (LPP)
//!
//! Maximizes the active load served on a network whose topology is fixed,
//! under the full nonlinear AC power flow equations.
//!
//! ## Formulation
//!
//! ```text
//! maximize    Σ_n p_l_n · l_n
//!
//! subject to:
//!   p_g_n − p_l_n · l_n  ≤  Σ_{(n,m)∈L} p_nm          Flow conservation (active)
//!   q_g_n − q_l_n · l_n  ≤  Σ_{(n,m)∈L} q_nm          Flow conservation (reactive)
//!   p_nm = v_n² g − v_n v_m (g cos θ_nm + b sin θ_nm)  AC branch flow
//!   q_nm = −v_n² b + v_n v_m (b cos θ_nm − g sin θ_nm)
//!   p_nm² + q_nm² ≤ S_nm²                             Thermal limit
//!   v ∈ [v_lb, v_ub], p_g ∈ [p_g_lb, p_g_ub], q_g ∈ [q_g_lb, q_g_ub]
//!   l ∈ [0, 1], p_nm, q_nm ∈ [−S_nm, S_nm]
//! ```
//!
//! ## Variants
//!
//! Two independent axes select the published variants
//! ([`LppFormulation::Standard`], [`LppFormulation::ExplicitBounds`]):
//! - [`BoundEncoding`]: limits as variable domains or as explicit rows
//! - [`FlowScope`]: conservation over lines leaving `n`, or over every line
//!
//! [`BalanceSense`] switches conservation between `≤` (the published
//! relaxation) and `=`.
//!
//! ## References
//!
//! - **Coffrin & Van Hentenryck (2014)**: "A Linear-Programming
//!   Approximation of AC Power Flows", INFORMS J. Computing 26(4)

mod model;
mod problem;
mod solution;

pub use model::{build_model, solve_load_pickup, LppModel};
pub use problem::{BalanceSense, BoundEncoding, FlowScope, LoadPickupProblem, LppFormulation};
pub use solution::{BusState, LineFlow, LoadPickupSolution};
