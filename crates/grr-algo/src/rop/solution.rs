//! Restoration ordering solution data structures

use std::time::Duration;

use grr_core::model::SolveStatus;
use grr_core::LineKey;
use serde::{Deserialize, Serialize};

use crate::lpp::{BusState, LineFlow};

/// Network state after the `step`-th repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorationStep {
    /// 1-based step index
    pub step: usize,
    /// Damaged lines repaired by this step (`o = 1`)
    pub repaired: Vec<LineKey>,
    /// Lines carrying flow at this step (`z = 1`)
    pub energized: Vec<LineKey>,
    /// Active load served at this step
    pub served_load: f64,
    pub buses: Vec<BusState>,
    pub lines: Vec<LineFlow>,
}

impl RestorationStep {
    pub fn is_energized(&self, key: LineKey) -> bool {
        self.energized.contains(&key)
    }
}

/// Complete solution to a restoration ordering problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorationOrderingSolution {
    pub status: SolveStatus,
    /// Served load summed over all steps
    pub objective: f64,
    /// Damaged lines in the order they are repaired
    pub repair_order: Vec<LineKey>,
    pub steps: Vec<RestorationStep>,
    pub max_violation: f64,
    pub solve_time: Duration,
    pub backend: String,
}

impl RestorationOrderingSolution {
    pub fn step(&self, k: usize) -> Option<&RestorationStep> {
        self.steps.iter().find(|s| s.step == k)
    }

    /// Position (1-based) at which `key` is repaired.
    pub fn repair_step(&self, key: LineKey) -> Option<usize> {
        self.repair_order.iter().position(|&l| l == key).map(|i| i + 1)
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "Restoration Ordering Solution Summary\n{}\n",
            "=".repeat(40)
        ));
        s.push_str(&format!("Status: {:?} ({})\n", self.status, self.backend));
        s.push_str(&format!("Cumulative Served Load: {:.4}\n", self.objective));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));

        s.push_str("\nRepair Sequence:\n");
        for step in &self.steps {
            let repaired = self
                .repair_order
                .get(step.step - 1)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            s.push_str(&format!(
                "  step {:>3}: repair {}  served={:.4}  energized={}\n",
                step.step,
                repaired,
                step.served_load,
                step.energized.len()
            ));
        }
        s
    }
}
