//! Routing model assembly and solution extraction

use std::collections::{BTreeMap, HashSet};

use grr_core::model::{Constraint, Expr, Model, ModelSolution, ObjectiveSense, VarId};
use grr_core::{ConstructionError, GrrResult, RestorationConfig, SiteId, SiteKind, VehicleId};
use tracing::{debug, info, warn};

use super::{Route, RoutingProblem, RoutingSolution};
use crate::bigm;
use crate::solve::solve_model;

/// Assembled routing model.
#[derive(Debug, Clone)]
pub struct PrrpModel {
    pub model: Model,
    problem: RoutingProblem,
    /// `sigma_{i,j}` per arc
    sigma: BTreeMap<(SiteId, SiteId), VarId>,
    /// `vehicle_{v,i}`, indexed `[v][i]`
    vehicle: Vec<Vec<VarId>>,
    weight: Vec<VarId>,
    eat: Vec<VarId>,
}

/// Build the routing model.
///
/// ```text
/// minimize    Σ_{i∈W−} (eat_i + s_i)
/// subject to  Σ_j σ_ij = 1 (i ∈ S+),  Σ_i σ_ij = 1 (j ∈ S−)   (successor, predecessor)
///             vehicle_{v,h±_v} = 1,  Σ_v vehicle_{v,i} = 1      (depot, assign)
///             |vehicle_{v,j} − vehicle_{v,i}| ≤ 1 − σ_ij        (crew)
///             vehicle_{v,p} = vehicle_{v,r_p}                   (pair)
///             |weight_j − weight_i − Δ_j| ≤ M (1 − σ_ij)        (load)
///             weight_i ≤ Σ_v c_v vehicle_{v,i}                  (capacity)
///             eat_j ≥ eat_i + s_i + t_ij − M_ij (1 − σ_ij)      (arrival)
///             rank_j ≥ rank_i + 1 − M (1 − σ_ij)                (rank)
///             eat_i ≤ eat_j  for (i, j) ∈ C                     (precedence)
/// ```
pub fn build_model(
    problem: &RoutingProblem,
    config: &RestorationConfig,
) -> Result<PrrpModel, ConstructionError> {
    problem.validate()?;
    let policy = &config.big_m;
    let index = problem.site_index();
    let sites = &problem.sites;

    let max_capacity = problem.max_capacity();
    let horizon = bigm::horizon(
        sites
            .iter()
            .map(|s| (s.service_time(), problem.max_travel_from(s.id))),
    );
    let rank_m = bigm::rank(sites.len(), policy);

    let mut model = Model::new("pickup-and-repair-routing");

    // === Variables ===
    let mut sigma = BTreeMap::new();
    for (i, j) in problem.arcs() {
        sigma.insert((i, j), model.add_binary(format!("sigma[{i},{j}]")));
    }
    let vehicle: Vec<Vec<VarId>> = problem
        .vehicles
        .iter()
        .map(|v| {
            sites
                .iter()
                .map(|s| model.add_binary(format!("vehicle[{},{}]", v.id, s.id)))
                .collect()
        })
        .collect();
    let weight: Vec<VarId> = sites
        .iter()
        .map(|s| model.add_continuous(format!("weight[{}]", s.id), 0.0, max_capacity))
        .collect();
    let eat: Vec<VarId> = sites
        .iter()
        .map(|s| model.add_continuous(format!("eat[{}]", s.id), 0.0, horizon))
        .collect();
    let rank: Vec<VarId> = sites
        .iter()
        .map(|s| model.add_continuous(format!("rank[{}]", s.id), 0.0, sites.len() as f64))
        .collect();

    // === Successor relation ===
    for site in sites {
        if site.has_successor() {
            let out = sigma.iter().filter(|((i, _), _)| *i == site.id).map(|(_, &x)| x);
            model.add_constraint(Constraint::eq(format!("successor[{}]", site.id), Expr::sum(out), 1.0));
        }
        if site.has_predecessor() {
            let inc = sigma.iter().filter(|((_, j), _)| *j == site.id).map(|(_, &x)| x);
            model.add_constraint(Constraint::eq(format!("predecessor[{}]", site.id), Expr::sum(inc), 1.0));
        }
    }

    // === Vehicle assignment ===
    for (v, crew) in problem.vehicles.iter().enumerate() {
        let out = vehicle[v][index[&crew.departure]];
        let back = vehicle[v][index[&crew.arrival]];
        model.add_constraint(Constraint::eq(format!("depot_out[{}]", crew.id), out, 1.0));
        model.add_constraint(Constraint::eq(format!("depot_in[{}]", crew.id), back, 1.0));
    }
    for (n, site) in sites.iter().enumerate() {
        let on_site = Expr::sum(vehicle.iter().map(|per_site| per_site[n]));
        model.add_constraint(Constraint::eq(format!("assign[{}]", site.id), on_site, 1.0));
    }
    for (&(i, j), &x) in &sigma {
        let (a, b) = (index[&i], index[&j]);
        for (v, crew) in problem.vehicles.iter().enumerate() {
            let (vi, vj) = (vehicle[v][a], vehicle[v][b]);
            model.add_constraint(Constraint::leq(
                format!("crew_hi[{i},{j},{}]", crew.id),
                vj - vi,
                1.0 - x,
            ));
            model.add_constraint(Constraint::leq(
                format!("crew_lo[{i},{j},{}]", crew.id),
                vi - vj,
                1.0 - x,
            ));
        }
    }
    for (n, site) in sites.iter().enumerate() {
        if let SiteKind::Pickup { repair_site, .. } = site.kind {
            let r = index[&repair_site];
            for (v, crew) in problem.vehicles.iter().enumerate() {
                model.add_constraint(Constraint::eq(
                    format!("pair[{},{}]", site.id, crew.id),
                    vehicle[v][n],
                    vehicle[v][r],
                ));
            }
        }
    }

    // === Load propagation ===
    for (n, site) in sites.iter().enumerate() {
        if site.kind == SiteKind::DepartureDepot {
            model.add_constraint(Constraint::eq(format!("weight_depot[{}]", site.id), weight[n], 0.0));
        }
        let capacity = Expr::sum(
            problem
                .vehicles
                .iter()
                .enumerate()
                .map(|(v, crew)| crew.capacity * vehicle[v][n]),
        );
        model.add_constraint(Constraint::leq(format!("capacity[{}]", site.id), weight[n], capacity));
    }
    let deltas: Vec<f64> = sites.iter().map(|s| problem.load_delta(s)).collect();
    for (&(i, j), &x) in &sigma {
        let (a, b) = (index[&i], index[&j]);
        let m = bigm::load(max_capacity, deltas[b], policy);
        let slack = m * (1.0 - x);
        model.add_constraint(Constraint::leq(
            format!("load_hi[{i},{j}]"),
            weight[b] - weight[a] - deltas[b],
            slack.clone(),
        ));
        model.add_constraint(Constraint::leq(
            format!("load_lo[{i},{j}]"),
            weight[a] + deltas[b] - weight[b],
            slack,
        ));
    }

    // === Arrival times ===
    for (n, site) in sites.iter().enumerate() {
        if site.kind == SiteKind::DepartureDepot {
            model.add_constraint(Constraint::eq(format!("eat_depot[{}]", site.id), eat[n], 0.0));
            model.add_constraint(Constraint::eq(format!("rank_depot[{}]", site.id), rank[n], 0.0));
        }
    }
    for (&(i, j), &x) in &sigma {
        let (a, b) = (index[&i], index[&j]);
        let service = sites[a].service_time();
        let travel = problem.travel_time(i, j).unwrap_or_default();
        let m = bigm::arrival(horizon, service, travel, policy);
        model.add_constraint(Constraint::geq(
            format!("arrival[{i},{j}]"),
            eat[b] - eat[a],
            service + travel - m * (1.0 - x),
        ));
        model.add_constraint(Constraint::geq(
            format!("rank[{i},{j}]"),
            rank[b] - rank[a],
            1.0 - rank_m * (1.0 - x),
        ));
    }
    for &(i, j) in &problem.precedences {
        model.add_constraint(Constraint::leq(
            format!("precedence[{i},{j}]"),
            eat[index[&i]],
            eat[index[&j]],
        ));
    }

    let completion = Expr::sum(
        sites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_repair())
            .map(|(n, s)| eat[n] + s.service_time()),
    );
    model.set_objective(ObjectiveSense::Minimize, completion);
    model.validate()?;

    info!(
        sites = sites.len(),
        vehicles = problem.vehicles.len(),
        arcs = sigma.len(),
        precedences = problem.precedences.len(),
        vars = model.num_vars(),
        constraints = model.num_constraints(),
        class = %model.problem_class(),
        horizon,
        "built routing model"
    );

    Ok(PrrpModel {
        model,
        problem: problem.clone(),
        sigma,
        vehicle,
        weight,
        eat,
    })
}

impl PrrpModel {
    pub fn extract(&self, solution: &ModelSolution) -> RoutingSolution {
        let sites = &self.problem.sites;

        let successors: BTreeMap<SiteId, SiteId> = self
            .sigma
            .iter()
            .filter(|(_, &x)| solution.is_set(x))
            .map(|(&arc, _)| arc)
            .collect();

        let mut assignment = BTreeMap::new();
        for (v, crew) in self.problem.vehicles.iter().enumerate() {
            for (n, site) in sites.iter().enumerate() {
                if solution.is_set(self.vehicle[v][n]) {
                    assignment.insert(site.id, crew.id);
                }
            }
        }

        let weights = sites
            .iter()
            .zip(&self.weight)
            .map(|(s, &w)| (s.id, solution.value(w)))
            .collect();
        let arrival_times: BTreeMap<SiteId, f64> = sites
            .iter()
            .zip(&self.eat)
            .map(|(s, &t)| (s.id, solution.value(t)))
            .collect();
        let completion_times = sites
            .iter()
            .filter(|s| s.is_repair())
            .map(|s| (s.id, arrival_times[&s.id] + s.service_time()))
            .collect();

        let routes = self
            .problem
            .vehicles
            .iter()
            .map(|crew| follow(crew.id, crew.departure, crew.arrival, &successors, sites.len()))
            .collect();

        RoutingSolution {
            status: solution.status,
            objective: solution.objective,
            routes,
            successors,
            assignment,
            weights,
            arrival_times,
            completion_times,
            max_violation: solution.max_violation,
            solve_time: solution.solve_time,
            backend: solution.backend.clone(),
        }
    }
}

/// Walk the successor relation from `start` until `end`.
fn follow(
    vehicle: VehicleId,
    start: SiteId,
    end: SiteId,
    successors: &BTreeMap<SiteId, SiteId>,
    max_len: usize,
) -> Route {
    let mut sites = vec![start];
    let mut seen = HashSet::from([start]);
    let mut current = start;
    while current != end {
        let Some(&next) = successors.get(&current) else {
            warn!(%vehicle, at = %current, "route ends before its arrival depot");
            break;
        };
        if !seen.insert(next) || sites.len() > max_len {
            warn!(%vehicle, at = %next, "route revisits a site");
            break;
        }
        sites.push(next);
        current = next;
    }
    debug!(%vehicle, stops = sites.len(), "extracted route");
    Route { vehicle, sites }
}

/// Build and solve a routing problem (MILP).
///
/// # Example
///
/// ```no_run
/// use grr_algo::prrp::{solve_routing, RoutingProblemBuilder};
/// use grr_core::{RestorationConfig, Site, SiteId, Vehicle, VehicleId};
///
/// let (out, back, depot, feeder) = (SiteId::new(0), SiteId::new(1), SiteId::new(2), SiteId::new(3));
/// let problem = RoutingProblemBuilder::new()
///     .site(Site::departure_depot(out, "yard"))
///     .site(Site::arrival_depot(back, "yard"))
///     .site(Site::pickup(depot, "warehouse", 1.0, feeder))
///     .site(Site::repair(feeder, "feeder 7", 2.0))
///     .vehicle(Vehicle::new(VehicleId::new(0), "crew", out, back, 4.0))
///     .default_travel_time(1.0)
///     .build()?;
///
/// let solution = solve_routing(&problem, &RestorationConfig::default())?;
/// println!("{}", solution.summary());
/// # Ok::<(), grr_core::GrrError>(())
/// ```
pub fn solve_routing(problem: &RoutingProblem, config: &RestorationConfig) -> GrrResult<RoutingSolution> {
    config.validate()?;
    let built = build_model(problem, config)?;
    let solution = solve_model(&built.model, &config.solver)?;
    Ok(built.extract(&solution))
}
