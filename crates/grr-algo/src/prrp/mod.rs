//! Pickup-and-Repair Routing (PRRP)
//!
//! Routes repair crews from their departure depot, through the pickup
//! sites holding repair material and the repair sites that need it, to
//! their arrival depot. Minimizes the sum of repair completion times while
//! honoring vehicle capacities and the repair precedences coming out of a
//! restoration ordering.
//!
//! ## Sets
//!
//! ```text
//! H+  departure depots        W+  pickup sites (load d_i, repair site r_i)
//! H−  arrival depots          W−  repair sites (service time s_i)
//! S+ = H+ ∪ W+ ∪ W−           S− = H− ∪ W+ ∪ W−
//! ```
//!
//! The successor relation is a sparse set of binaries `σ_ij` over the arcs
//! `S+ × S−` (`i ≠ j`). Crew identity propagates along chosen arcs, so each
//! route uses exactly one vehicle. Load and arrival times propagate through
//! big-M inequalities sized from instance data ([`crate::bigm`]); a visit
//! rank rules out detached cycles when travel and service times are zero.
//!
//! ## Example
//!
//! ```text
//! h+ ──▶ warehouse (+d) ──▶ feeder (−d, s) ──▶ h−
//! ```

mod model;
mod problem;
mod solution;

pub use model::{build_model, solve_routing, PrrpModel};
pub use problem::{RoutingProblem, RoutingProblemBuilder};
pub use solution::{Route, RoutingSolution};
