//! # grr-algo: Grid Restoration Models
//!
//! Optimization models for restoring a damaged power grid, built on the
//! algebraic layer of `grr-core`.
//!
//! | Model | Decides | Problem Class |
//! |-------|---------|---------------|
//! | [`lpp`] load pickup | generation, voltages, served load on a fixed topology | NLP |
//! | [`rop`] restoration ordering | which damaged line to repair at each step | MINLP |
//! | [`prrp`] pickup-and-repair routing | crew routes through pickup and repair sites | MILP |
//!
//! ## Pipeline
//!
//! ```text
//! damaged lines ──▶ rop ──▶ repair order ──▶ precedence ──▶ prrp ──▶ routes
//! ```
//!
//! [`precedence::from_repair_order`] turns an ordering into the precedence
//! pairs consumed by the routing model. [`validation`] re-checks any
//! solution against its instance data.
//!
//! ## Solving
//!
//! Each model exposes `build_model` (returning the assembled
//! [`grr_core::model::Model`] plus the handles to read a solution back) and a
//! `solve_*` convenience that dispatches through [`solve::solve_model`].
//!
//! ## Example
//!
//! ```no_run
//! use grr_algo::rop::{solve_restoration_ordering, RestorationOrderingProblem};
//! use grr_core::{Bus, BusId, LineKey, Network, RestorationConfig};
//!
//! let mut network = Network::new();
//! network
//!     .add_bus(Bus::new(BusId::new(1), "source").with_p_gen(0.0, 20.0).with_q_gen(-10.0, 10.0))
//!     .add_bus(Bus::new(BusId::new(2), "feeder").with_load(2.0, 0.0))
//!     .add_branch(BusId::new(1), BusId::new(2), 0.0, -10.0, 10.0);
//!
//! let damaged = vec![LineKey::new(BusId::new(1), BusId::new(2))];
//! let problem = RestorationOrderingProblem::new(network, damaged);
//! let solution = solve_restoration_ordering(&problem, &RestorationConfig::default())?;
//! println!("{}", solution.summary());
//! # Ok::<(), grr_core::GrrError>(())
//! ```

pub(crate) mod ac;
pub mod bigm;
pub mod lpp;
pub mod precedence;
pub mod prrp;
pub mod rop;
pub mod solve;
pub mod validation;

pub use lpp::{solve_load_pickup, LoadPickupProblem, LoadPickupSolution};
pub use prrp::{solve_routing, RoutingProblem, RoutingProblemBuilder, RoutingSolution};
pub use rop::{solve_restoration_ordering, RestorationOrderingProblem, RestorationOrderingSolution};
pub use solve::{solve_model, SolverKind};
pub use validation::{ValidationReport, Violation};
