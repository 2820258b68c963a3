//! AC Restoration Ordering (ROP)
//!
//! Given a set of damaged lines, decides the order in which they are
//! repaired, one per step, maximizing the load served summed over all
//! steps. Step `k` carries its own AC operating point; a line only carries
//! flow once it is repaired.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ step 1        step 2        ...        step |R|            │
//! │ o[·,1]  ≤     o[·,2]  ≤     ...   ≤    o[·,|R|] = 1        │
//! │ z ≤ o         z ≤ o                    z ≤ o               │
//! │ AC flow gated by z in every step                           │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Intact lines are always active. When `z = 0` the flow on the line is
//! pinned to zero and its branch equations are released through big-M
//! constants from [`crate::bigm::branch_flow`].

mod model;
mod problem;
mod solution;

pub use model::{build_model, solve_restoration_ordering, RopModel};
pub use problem::RestorationOrderingProblem;
pub use solution::{RestorationOrderingSolution, RestorationStep};
