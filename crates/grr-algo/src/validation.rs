//! Independent checks of solutions against their instance data.
//!
//! Nothing here looks at the assembled model: network states, repair
//! sequences and routes are re-derived from the problem and tested
//! directly, so a modeling mistake shows up as a violation.

use std::collections::HashMap;
use std::fmt;

use grr_core::{LineKey, Network, SiteId, SiteKind};
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use thiserror::Error;

use crate::lpp::{BusState, LineFlow, LoadPickupSolution};
use crate::prrp::{RoutingProblem, RoutingSolution};
use crate::rop::{RestorationOrderingProblem, RestorationOrderingSolution};

/// Slack allowed on flows and equations of a restoration ordering.
const ORDERING_TOLERANCE: f64 = 1e-5;
/// Slack allowed on loads and times of a route.
const ROUTE_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("{what} at {at} is {value:.6}, outside [{lower}, {upper}]")]
    Bound {
        what: &'static str,
        at: String,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("{what} on {at} off by {residual:.3e}")]
    Equation {
        what: &'static str,
        at: String,
        residual: f64,
    },

    #[error("apparent power {apparent:.6} on {line} exceeds {limit}")]
    Thermal {
        line: LineKey,
        apparent: f64,
        limit: f64,
    },

    #[error("step {step}: {reason}")]
    Ordering { step: usize, reason: String },

    #[error("route: {0}")]
    Route(String),
}

/// Violations found by one check.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    fn bound(&mut self, what: &'static str, at: impl fmt::Display, value: f64, lower: f64, upper: f64, tol: f64) {
        if value < lower - tol || value > upper + tol {
            self.push(Violation::Bound {
                what,
                at: at.to_string(),
                value,
                lower,
                upper,
            });
        }
    }

    fn equation(&mut self, what: &'static str, at: impl fmt::Display, residual: f64, tol: f64) {
        if residual.abs() > tol {
            self.push(Violation::Equation {
                what,
                at: at.to_string(),
                residual,
            });
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "no violations");
        }
        writeln!(f, "{} violation(s):", self.len())?;
        for v in &self.violations {
            writeln!(f, "  - {v}")?;
        }
        Ok(())
    }
}

// ============================================================================
// AC operating points
// ============================================================================

/// `(f_p, f_q)` of `line` at the voltages in `from`, `to`.
fn ac_flow(g: f64, b: f64, from: &BusState, to: &BusState) -> (f64, f64) {
    let (vn, vm) = (from.v, to.v);
    let delta = from.theta - to.theta;
    let p = vn * vn * g - vn * vm * (g * delta.cos() + b * delta.sin());
    let q = -vn * vn * b + vn * vm * (b * delta.cos() - g * delta.sin());
    (p, q)
}

/// Bounds, thermal limits and branch equations on the lines in `active`.
fn check_operating_point(
    network: &Network,
    buses: &[BusState],
    lines: &[LineFlow],
    active: impl Fn(LineKey) -> bool,
    tol: f64,
    report: &mut ValidationReport,
) {
    let states: HashMap<_, _> = buses.iter().map(|s| (s.id, s)).collect();
    for bus in &network.buses {
        let Some(state) = states.get(&bus.id) else {
            report.push(Violation::Equation {
                what: "missing bus state",
                at: bus.id.to_string(),
                residual: f64::NAN,
            });
            continue;
        };
        report.bound("v", bus.id, state.v, bus.v_min, bus.v_max, tol);
        report.bound("p_g", bus.id, state.p_gen, bus.p_gen_min, bus.p_gen_max, tol);
        report.bound("q_g", bus.id, state.q_gen, bus.q_gen_min, bus.q_gen_max, tol);
        report.bound("l", bus.id, state.served, 0.0, 1.0, tol);
    }

    for (line, flow) in network.lines.iter().zip(lines) {
        let apparent = flow.apparent_power();
        if apparent > line.s_max + tol {
            report.push(Violation::Thermal {
                line: line.key,
                apparent,
                limit: line.s_max,
            });
        }
        if !active(line.key) {
            continue;
        }
        if let (Some(from), Some(to)) = (states.get(&line.key.from), states.get(&line.key.to)) {
            let (fp, fq) = ac_flow(line.g, line.b, from, to);
            report.equation("active_flow", line.key, flow.p - fp, tol);
            report.equation("reactive_flow", line.key, flow.q - fq, tol);
        }
    }
}

/// Bounds, AC branch equations and thermal limits of a load pickup solution.
pub fn check_load_pickup(network: &Network, solution: &LoadPickupSolution, tol: f64) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_operating_point(network, &solution.buses, &solution.lines, |_| true, tol, &mut report);
    report
}

// ============================================================================
// Restoration ordering
// ============================================================================

/// Repair sequencing and conditional flows of every step.
pub fn check_ordering(
    problem: &RestorationOrderingProblem,
    solution: &RestorationOrderingSolution,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let tol = ORDERING_TOLERANCE;

    if solution.steps.len() != problem.num_steps() {
        report.push(Violation::Ordering {
            step: solution.steps.len(),
            reason: format!("expected {} steps", problem.num_steps()),
        });
    }

    let mut previous: &[LineKey] = &[];
    for step in &solution.steps {
        let k = step.step;
        let order = |reason: String| Violation::Ordering { step: k, reason };

        if step.repaired.len() != k {
            report.push(order(format!("{} lines repaired, expected {k}", step.repaired.len())));
        }
        if let Some(lost) = previous.iter().find(|l| !step.repaired.contains(l)) {
            report.push(order(format!("{lost} repaired earlier but not any more")));
        }
        if let Some(foreign) = step.repaired.iter().find(|l| !problem.is_damaged(**l)) {
            report.push(order(format!("{foreign} is not a damaged line")));
        }

        for line in &problem.network.lines {
            let energized = step.is_energized(line.key);
            if problem.is_damaged(line.key) {
                if energized && !step.repaired.contains(&line.key) {
                    report.push(order(format!("{} energized before its repair", line.key)));
                }
            } else if !energized {
                report.push(order(format!("intact line {} is not energized", line.key)));
            }
        }
        for flow in &step.lines {
            if !step.is_energized(flow.key) && flow.apparent_power() > tol {
                report.push(order(format!(
                    "inactive line {} carries {:.3e}",
                    flow.key,
                    flow.apparent_power()
                )));
            }
        }

        check_operating_point(
            &problem.network,
            &step.buses,
            &step.lines,
            |key| step.is_energized(key),
            tol,
            &mut report,
        );
        previous = &step.repaired;
    }

    let mut sorted = solution.repair_order.clone();
    sorted.sort();
    let mut damaged = problem.damaged.clone();
    damaged.sort();
    if sorted != damaged {
        report.push(Violation::Ordering {
            step: problem.num_steps(),
            reason: "repair order is not a permutation of the damaged lines".into(),
        });
    }
    report
}

// ============================================================================
// Routes
// ============================================================================

/// Successor relation, coverage, capacity, timing and precedences of a
/// routing solution.
pub fn check_routes(problem: &RoutingProblem, solution: &RoutingSolution) -> ValidationReport {
    let mut report = ValidationReport::default();
    let tol = ROUTE_TOLERANCE;

    let mut graph = DiGraph::<SiteId, ()>::new();
    let nodes: HashMap<SiteId, NodeIndex> = problem
        .sites
        .iter()
        .map(|s| (s.id, graph.add_node(s.id)))
        .collect();
    for (from, to) in &solution.successors {
        match (nodes.get(from), nodes.get(to)) {
            (Some(&a), Some(&b)) => {
                graph.add_edge(a, b, ());
            }
            _ => report.push(Violation::Route(format!("arc ({from}, {to}) leaves the site set"))),
        }
    }

    for site in &problem.sites {
        let node = nodes[&site.id];
        let out = graph.edges_directed(node, Direction::Outgoing).count();
        let inc = graph.edges_directed(node, Direction::Incoming).count();
        let (want_out, want_in) = (usize::from(site.has_successor()), usize::from(site.has_predecessor()));
        if out != want_out {
            report.push(Violation::Route(format!("site {} has {out} successors", site.id)));
        }
        if inc != want_in {
            report.push(Violation::Route(format!("site {} has {inc} predecessors", site.id)));
        }
    }
    if is_cyclic_directed(&graph) {
        report.push(Violation::Route("successor relation contains a cycle".into()));
    }

    let mut visits: HashMap<SiteId, usize> = HashMap::new();
    for vehicle in &problem.vehicles {
        let (Some(&start), Some(&end)) = (nodes.get(&vehicle.departure), nodes.get(&vehicle.arrival)) else {
            continue;
        };
        if !has_path_connecting(&graph, start, end, None) {
            report.push(Violation::Route(format!(
                "vehicle {} never reaches its arrival depot",
                vehicle.id
            )));
        }
        let Some(route) = solution.route(vehicle.id) else {
            report.push(Violation::Route(format!("vehicle {} has no route", vehicle.id)));
            continue;
        };
        if route.sites.first() != Some(&vehicle.departure) || route.sites.last() != Some(&vehicle.arrival) {
            report.push(Violation::Route(format!(
                "route of vehicle {} is not depot to depot",
                vehicle.id
            )));
        }
        for id in &route.sites {
            *visits.entry(*id).or_default() += 1;
        }

        let mut load = 0.0;
        for (pos, id) in route.sites.iter().enumerate() {
            let Some(site) = problem.site(*id) else { continue };
            load += problem.load_delta(site);
            if load < -tol || load > vehicle.capacity + tol {
                report.push(Violation::Route(format!(
                    "vehicle {} carries {load:.4} at site {id}, capacity {}",
                    vehicle.id, vehicle.capacity
                )));
            }
            if let SiteKind::Pickup { repair_site, .. } = site.kind {
                if !route.sites[pos..].contains(&repair_site) {
                    report.push(Violation::Route(format!(
                        "pickup {id} is not followed by repair site {repair_site} on vehicle {}",
                        vehicle.id
                    )));
                }
            }
        }

        for pair in route.sites.windows(2) {
            let (i, j) = (pair[0], pair[1]);
            let (Some(ti), Some(tj)) = (solution.arrival_time(i), solution.arrival_time(j)) else {
                continue;
            };
            let service = problem.site(i).map_or(0.0, |s| s.service_time());
            let travel = problem.travel_time(i, j).unwrap_or_default();
            if tj + tol < ti + service + travel {
                report.push(Violation::Route(format!(
                    "site {j} reached at {tj:.4}, before {:.4}",
                    ti + service + travel
                )));
            }
        }
    }

    for site in problem.sites.iter().filter(|s| s.is_pickup() || s.is_repair()) {
        let n = visits.get(&site.id).copied().unwrap_or(0);
        if n != 1 {
            report.push(Violation::Route(format!("site {} visited {n} times", site.id)));
        }
    }

    for &(i, j) in &problem.precedences {
        if let (Some(ti), Some(tj)) = (solution.arrival_time(i), solution.arrival_time(j)) {
            if ti > tj + tol {
                report.push(Violation::Route(format!(
                    "repair {j} reached at {tj:.4} before repair {i} at {ti:.4}"
                )));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use grr_core::model::SolveStatus;
    use grr_core::{Bus, BusId, Site, Vehicle, VehicleId};

    use crate::prrp::{Route, RoutingProblemBuilder};

    fn flat_start() -> (Network, LoadPickupSolution) {
        let mut net = Network::new();
        net.add_bus(Bus::new(BusId::new(1), "a").with_p_gen(0.0, 5.0))
            .add_bus(Bus::new(BusId::new(2), "b").with_load(1.0, 0.0))
            .add_branch(BusId::new(1), BusId::new(2), 0.0, -10.0, 2.0);
        let state = |id| BusState {
            id: BusId::new(id),
            v: 1.0,
            theta: 0.0,
            p_gen: 0.0,
            q_gen: 0.0,
            served: 0.0,
        };
        let flows = net
            .lines
            .iter()
            .map(|l| LineFlow {
                key: l.key,
                p: 0.0,
                q: 0.0,
                s_max: l.s_max,
            })
            .collect();
        let solution = LoadPickupSolution {
            status: SolveStatus::LocallyOptimal,
            objective: 0.0,
            buses: vec![state(1), state(2)],
            lines: flows,
            max_violation: 0.0,
            solve_time: Duration::ZERO,
            backend: "nlp".into(),
        };
        (net, solution)
    }

    #[test]
    fn test_flat_start_is_valid() {
        let (net, solution) = flat_start();
        let report = check_load_pickup(&net, &solution, 1e-9);
        assert!(report.is_valid(), "{report}");
    }

    #[test]
    fn test_detects_equation_and_bound_violations() {
        let (net, mut solution) = flat_start();
        solution.lines[0].p = 0.5;
        solution.buses[1].v = 1.3;
        let report = check_load_pickup(&net, &solution, 1e-9);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::Bound { what: "v", .. })));
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::Equation { what: "active_flow", .. })));
    }

    fn routing() -> RoutingProblem {
        let id = SiteId::new;
        RoutingProblemBuilder::new()
            .site(Site::departure_depot(id(0), "out"))
            .site(Site::arrival_depot(id(1), "in"))
            .site(Site::pickup(id(2), "warehouse", 2.0, id(3)))
            .site(Site::repair(id(3), "feeder", 4.0))
            .vehicle(Vehicle::new(VehicleId::new(0), "crew", id(0), id(1), 5.0))
            .default_travel_time(1.0)
            .build()
            .unwrap()
    }

    fn tour(order: &[usize], eat: &[f64]) -> RoutingSolution {
        let sites: Vec<SiteId> = order.iter().map(|&n| SiteId::new(n)).collect();
        RoutingSolution {
            status: SolveStatus::Optimal,
            objective: 0.0,
            routes: vec![Route {
                vehicle: VehicleId::new(0),
                sites: sites.clone(),
            }],
            successors: sites.windows(2).map(|w| (w[0], w[1])).collect(),
            assignment: sites.iter().map(|&s| (s, VehicleId::new(0))).collect(),
            weights: BTreeMap::new(),
            arrival_times: sites.iter().copied().zip(eat.iter().copied()).collect(),
            completion_times: BTreeMap::new(),
            max_violation: 0.0,
            solve_time: Duration::ZERO,
            backend: "milp".into(),
        }
    }

    #[test]
    fn test_route_checks() {
        let problem = routing();
        let good = tour(&[0, 2, 3, 1], &[0.0, 1.0, 2.0, 7.0]);
        assert!(check_routes(&problem, &good).is_valid());

        // Repair before pickup: load goes negative
        let swapped = tour(&[0, 3, 2, 1], &[0.0, 1.0, 6.0, 7.0]);
        let report = check_routes(&problem, &swapped);
        assert!(!report.is_valid());

        // Service time ignored on the way out of the repair site
        let rushed = tour(&[0, 2, 3, 1], &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(check_routes(&problem, &rushed).len(), 1);
    }
}
