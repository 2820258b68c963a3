//! Routing solution data structures

use std::collections::BTreeMap;
use std::time::Duration;

use grr_core::model::SolveStatus;
use grr_core::{SiteId, VehicleId};
use serde::{Deserialize, Serialize};

/// Sites visited by one vehicle, depot to depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub vehicle: VehicleId,
    pub sites: Vec<SiteId>,
}

impl Route {
    /// Route leaves its depot and goes straight back.
    pub fn is_idle(&self) -> bool {
        self.sites.len() <= 2
    }
}

/// Complete solution to a routing problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSolution {
    pub status: SolveStatus,
    /// Σ over repair sites of `eat_i + s_i`
    pub objective: f64,
    pub routes: Vec<Route>,
    /// `sigma`: successor of every site in S+
    pub successors: BTreeMap<SiteId, SiteId>,
    pub assignment: BTreeMap<SiteId, VehicleId>,
    /// Load carried when leaving each site
    pub weights: BTreeMap<SiteId, f64>,
    /// Earliest arrival time at each site
    pub arrival_times: BTreeMap<SiteId, f64>,
    /// `eat_i + s_i` for every repair site
    pub completion_times: BTreeMap<SiteId, f64>,
    pub max_violation: f64,
    pub solve_time: Duration,
    pub backend: String,
}

impl RoutingSolution {
    pub fn route(&self, vehicle: VehicleId) -> Option<&Route> {
        self.routes.iter().find(|r| r.vehicle == vehicle)
    }

    pub fn successor(&self, site: SiteId) -> Option<SiteId> {
        self.successors.get(&site).copied()
    }

    pub fn arrival_time(&self, site: SiteId) -> Option<f64> {
        self.arrival_times.get(&site).copied()
    }

    pub fn weight(&self, site: SiteId) -> Option<f64> {
        self.weights.get(&site).copied()
    }

    pub fn total_completion_time(&self) -> f64 {
        self.completion_times.values().sum()
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Routing Solution Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!("Status: {:?} ({})\n", self.status, self.backend));
        s.push_str(&format!(
            "Total Completion Time: {:.4}\n",
            self.total_completion_time()
        ));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));

        s.push_str("\nRoutes:\n");
        for route in &self.routes {
            let path: Vec<String> = route.sites.iter().map(|id| id.to_string()).collect();
            s.push_str(&format!("  vehicle {}: {}\n", route.vehicle, path.join(" -> ")));
        }

        if !self.completion_times.is_empty() {
            s.push_str("\nRepairs Completed:\n");
            for (site, t) in &self.completion_times {
                s.push_str(&format!("  site {site}: {t:.4}\n"));
            }
        }
        s
    }
}
