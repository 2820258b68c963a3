//! Load pickup solution data structures

use std::time::Duration;

use grr_core::model::SolveStatus;
use grr_core::{BusId, LineKey};
use serde::{Deserialize, Serialize};

/// Operating point of one bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusState {
    pub id: BusId,
    /// Voltage magnitude (per-unit)
    pub v: f64,
    /// Phase angle (radians)
    pub theta: f64,
    pub p_gen: f64,
    pub q_gen: f64,
    /// Fraction of the desired load served, in `[0, 1]`
    pub served: f64,
}

/// Flow on one directed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFlow {
    pub key: LineKey,
    pub p: f64,
    pub q: f64,
    /// Thermal limit of the line
    pub s_max: f64,
}

impl LineFlow {
    pub fn apparent_power(&self) -> f64 {
        self.p.hypot(self.q)
    }
}

/// Complete solution to a load pickup problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPickupSolution {
    pub status: SolveStatus,
    /// Served active load `Σ p_l · l`
    pub objective: f64,
    pub buses: Vec<BusState>,
    pub lines: Vec<LineFlow>,
    pub max_violation: f64,
    pub solve_time: Duration,
    pub backend: String,
}

impl LoadPickupSolution {
    pub fn bus(&self, id: BusId) -> Option<&BusState> {
        self.buses.iter().find(|b| b.id == id)
    }

    pub fn line(&self, key: LineKey) -> Option<&LineFlow> {
        self.lines.iter().find(|l| l.key == key)
    }

    /// Total served active load (equals the objective).
    pub fn served_load(&self) -> f64 {
        self.objective
    }

    /// Lines loaded to within `tol` of their thermal limit.
    pub fn saturated_lines(&self, tol: f64) -> Vec<LineKey> {
        self.lines
            .iter()
            .filter(|l| l.apparent_power() >= l.s_max - tol)
            .map(|l| l.key)
            .collect()
    }

    pub fn total_generation(&self) -> f64 {
        self.buses.iter().map(|b| b.p_gen).sum()
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Load Pickup Solution Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!("Status: {:?} ({})\n", self.status, self.backend));
        s.push_str(&format!("Served Load: {:.4}\n", self.served_load()));
        s.push_str(&format!("Total Generation: {:.4}\n", self.total_generation()));
        s.push_str(&format!("Max Violation: {:.2e}\n", self.max_violation));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));

        s.push_str("\nBuses:\n");
        for b in &self.buses {
            s.push_str(&format!(
                "  bus {:>4}  v={:.4}  θ={:+.4}  p_g={:.4}  q_g={:+.4}  served={:.1}%\n",
                b.id,
                b.v,
                b.theta,
                b.p_gen,
                b.q_gen,
                b.served * 100.0
            ));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoadPickupSolution {
        let key = LineKey::new(BusId::new(1), BusId::new(2));
        LoadPickupSolution {
            status: SolveStatus::LocallyOptimal,
            objective: 7.5,
            buses: vec![BusState {
                id: BusId::new(1),
                v: 1.0,
                theta: 0.0,
                p_gen: 7.6,
                q_gen: 0.0,
                served: 0.75,
            }],
            lines: vec![
                LineFlow {
                    key,
                    p: 3.0,
                    q: 4.0,
                    s_max: 5.0,
                },
                LineFlow {
                    key: key.reversed(),
                    p: -1.0,
                    q: 0.0,
                    s_max: 5.0,
                },
            ],
            max_violation: 0.0,
            solve_time: Duration::from_millis(3),
            backend: "nlp".into(),
        }
    }

    #[test]
    fn test_saturated_lines() {
        let sol = sample();
        let saturated = sol.saturated_lines(1e-9);
        assert_eq!(saturated, vec![LineKey::new(BusId::new(1), BusId::new(2))]);
    }

    #[test]
    fn test_summary_mentions_served_load() {
        let summary = sample().summary();
        assert!(summary.contains("Served Load: 7.5000"));
        assert!(summary.contains("served=75.0%"));
    }
}
