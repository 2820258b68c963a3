//! Restoration ordering problem definition

use std::collections::HashSet;

use grr_core::{ConstructionError, LineKey, Network};

use crate::lpp::BalanceSense;

/// AC restoration ordering problem: sequence the repair of damaged lines so
/// that served load accumulated over the repair steps is maximal.
#[derive(Debug, Clone)]
pub struct RestorationOrderingProblem {
    pub network: Network,
    /// Damaged lines R ⊆ L, one repaired per step
    pub damaged: Vec<LineKey>,
    pub balance: BalanceSense,
}

impl RestorationOrderingProblem {
    pub fn new(network: Network, damaged: Vec<LineKey>) -> Self {
        Self {
            network,
            damaged,
            balance: BalanceSense::default(),
        }
    }

    pub fn with_balance(mut self, balance: BalanceSense) -> Self {
        self.balance = balance;
        self
    }

    /// Number of repair steps `|R|`.
    pub fn num_steps(&self) -> usize {
        self.damaged.len()
    }

    pub fn is_damaged(&self, key: LineKey) -> bool {
        self.damaged.contains(&key)
    }

    pub fn validate(&self) -> Result<(), ConstructionError> {
        self.network.validate()?;
        if self.damaged.is_empty() {
            return Err(ConstructionError::Structure(
                "restoration ordering needs at least one damaged line".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.damaged.len());
        for key in &self.damaged {
            if !self.network.contains_line(*key) {
                return Err(ConstructionError::OutOfDomain {
                    what: "damaged line",
                    index: key.to_string(),
                    domain: "network lines",
                });
            }
            if !seen.insert(*key) {
                return Err(ConstructionError::Duplicate {
                    what: "damaged line",
                    index: key.to_string(),
                });
            }
        }
        Ok(())
    }
}
