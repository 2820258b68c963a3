//! # grr-core: Grid Restoration Modeling Core
//!
//! Instance data, a solver-independent algebraic model layer and the seams
//! shared by the restoration models in `grr-algo`.
//!
//! ## Design Philosophy
//!
//! Every restoration model is built in two steps:
//! - **Instance data** ([`Network`], [`Site`], [`Vehicle`]) is validated and
//!   then immutable
//! - **Models** ([`model::Model`]) are plain data: bounded variables,
//!   `body ⋄ 0` constraints and one objective, solved by any
//!   [`SolverBackend`]
//!
//! ## Quick Start
//!
//! ```rust
//! use grr_core::model::{Constraint, Model, ObjectiveSense};
//!
//! let mut model = Model::new("toy");
//! let x = model.add_continuous("x", 0.0, 4.0);
//! let on = model.add_binary("on");
//! model.add_constraint(Constraint::leq("gate", x, 4.0 * on));
//! model.set_objective(ObjectiveSense::Maximize, x - on);
//!
//! assert_eq!(model.problem_class().to_string(), "MILP");
//! assert_eq!(model.max_violation(&[4.0, 1.0]), 0.0);
//! ```
//!
//! ## ID System
//!
//! Every element has a unique ID (newtype wrapper around `usize`):
//! [`BusId`], [`SiteId`], [`VehicleId`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod error;
pub mod model;
pub mod network;
pub mod routing;
pub mod solver;

pub use config::{BigMPolicy, RestorationConfig, SolverSettings};
pub use error::{ConstructionError, GrrError, GrrResult, SolveError};
pub use network::{Bus, Line, LineKey, Network};
pub use routing::{Site, SiteKind, Vehicle};
pub use solver::SolverBackend;

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl SiteId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SiteId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl VehicleId {
    #[inline]
    pub fn new(value: usize) -> Self {
        VehicleId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent() {
        let id = BusId::new(4);
        assert_eq!(serde_json::to_string(&id).unwrap(), "4");
        let back: SiteId = serde_json::from_str("9").unwrap();
        assert_eq!(back.value(), 9);
        assert_eq!(VehicleId::new(2).to_string(), "2");
    }
}
