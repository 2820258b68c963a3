//! Pickup-and-repair routing problem definition

use std::collections::{BTreeMap, HashMap, HashSet};

use grr_core::{ConstructionError, LineKey, Site, SiteId, SiteKind, Vehicle};

use crate::precedence;

/// Crews routed from their departure depot through pickup and repair sites
/// to their arrival depot.
#[derive(Debug, Clone, Default)]
pub struct RoutingProblem {
    pub sites: Vec<Site>,
    pub vehicles: Vec<Vehicle>,
    /// Travel time `t_ij`, one entry per arc
    pub travel_times: BTreeMap<(SiteId, SiteId), f64>,
    /// `(i, j)`: repair site `j` is not reached before repair site `i`
    pub precedences: Vec<(SiteId, SiteId)>,
}

impl RoutingProblem {
    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn site_index(&self) -> HashMap<SiteId, usize> {
        self.sites.iter().enumerate().map(|(i, s)| (s.id, i)).collect()
    }

    pub fn travel_time(&self, from: SiteId, to: SiteId) -> Option<f64> {
        self.travel_times.get(&(from, to)).copied()
    }

    /// Candidate successor arcs `(i, j)` with `i ∈ S+`, `j ∈ S−`, `i ≠ j`.
    pub fn arcs(&self) -> impl Iterator<Item = (SiteId, SiteId)> + '_ {
        self.sites
            .iter()
            .filter(|i| i.has_successor())
            .flat_map(move |i| {
                self.sites
                    .iter()
                    .filter(move |j| j.has_predecessor() && j.id != i.id)
                    .map(move |j| (i.id, j.id))
            })
    }

    pub fn max_capacity(&self) -> f64 {
        self.vehicles.iter().map(|v| v.capacity).fold(0.0, f64::max)
    }

    /// Load change `Δ_j` when a vehicle reaches `j`: `+d_j` at a pickup,
    /// minus every load destined for `j` at a repair site, zero at depots.
    pub fn load_delta(&self, site: &Site) -> f64 {
        match site.kind {
            SiteKind::Pickup { load, .. } => load,
            SiteKind::Repair { .. } => -self
                .sites
                .iter()
                .filter_map(|p| match p.kind {
                    SiteKind::Pickup { load, repair_site } if repair_site == site.id => Some(load),
                    _ => None,
                })
                .sum::<f64>(),
            SiteKind::DepartureDepot | SiteKind::ArrivalDepot => 0.0,
        }
    }

    /// Longest travel time out of `from` over its arcs (zero outside S+).
    pub fn max_travel_from(&self, from: SiteId) -> f64 {
        if !self.site(from).is_some_and(Site::has_successor) {
            return 0.0;
        }
        self.travel_times
            .range((from, SiteId::new(0))..=(from, SiteId::new(usize::MAX)))
            .filter(|((_, to), _)| *to != from && self.site(*to).is_some_and(|s| s.has_predecessor()))
            .map(|(_, &t)| t)
            .fold(0.0, f64::max)
    }

    pub fn repair_sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|s| s.is_repair())
    }

    pub fn validate(&self) -> Result<(), ConstructionError> {
        let mut ids = HashSet::with_capacity(self.sites.len());
        for site in &self.sites {
            if !ids.insert(site.id) {
                return Err(ConstructionError::Duplicate {
                    what: "site",
                    index: site.id.to_string(),
                });
            }
        }
        self.validate_vehicles()?;

        for site in &self.sites {
            match site.kind {
                SiteKind::Pickup { load, repair_site } => {
                    non_negative("d", site.id, load)?;
                    if !self.site(repair_site).is_some_and(Site::is_repair) {
                        return Err(ConstructionError::OutOfDomain {
                            what: "repair site",
                            index: format!("{repair_site} of pickup {}", site.id),
                            domain: "W-",
                        });
                    }
                }
                SiteKind::Repair { service_time } => non_negative("s", site.id, service_time)?,
                _ => {}
            }
        }

        for &(i, j) in &self.precedences {
            for id in [i, j] {
                if !self.site(id).is_some_and(Site::is_repair) {
                    return Err(ConstructionError::OutOfDomain {
                        what: "precedence site",
                        index: format!("{id} in ({i}, {j})"),
                        domain: "W-",
                    });
                }
            }
        }

        for &(i, j) in self.travel_times.keys() {
            if self.site(i).is_none() || self.site(j).is_none() {
                return Err(ConstructionError::OutOfDomain {
                    what: "travel time",
                    index: format!("({i}, {j})"),
                    domain: "S x S",
                });
            }
        }
        for (i, j) in self.arcs() {
            let t = self
                .travel_time(i, j)
                .ok_or_else(|| ConstructionError::MissingParameter {
                    param: "t",
                    index: format!("({i}, {j})"),
                })?;
            if !t.is_finite() || t < 0.0 {
                return Err(ConstructionError::InvalidParameter {
                    param: "t",
                    index: format!("({i}, {j})"),
                    reason: format!("{t} is not a non-negative time"),
                });
            }
        }
        Ok(())
    }

    fn validate_vehicles(&self) -> Result<(), ConstructionError> {
        if self.vehicles.is_empty() {
            return Err(ConstructionError::Structure("routing needs at least one vehicle".into()));
        }
        let mut ids = HashSet::new();
        let mut departures = HashSet::new();
        let mut arrivals = HashSet::new();
        for vehicle in &self.vehicles {
            if !ids.insert(vehicle.id) {
                return Err(ConstructionError::Duplicate {
                    what: "vehicle",
                    index: vehicle.id.to_string(),
                });
            }
            if !vehicle.capacity.is_finite() || vehicle.capacity < 0.0 {
                return Err(ConstructionError::InvalidParameter {
                    param: "c",
                    index: vehicle.id.to_string(),
                    reason: format!("{} is not a non-negative capacity", vehicle.capacity),
                });
            }
            let departure = self.site(vehicle.departure);
            if !departure.is_some_and(|s| s.kind == SiteKind::DepartureDepot) {
                return Err(ConstructionError::OutOfDomain {
                    what: "departure depot",
                    index: format!("{} of vehicle {}", vehicle.departure, vehicle.id),
                    domain: "H+",
                });
            }
            let arrival = self.site(vehicle.arrival);
            if !arrival.is_some_and(|s| s.kind == SiteKind::ArrivalDepot) {
                return Err(ConstructionError::OutOfDomain {
                    what: "arrival depot",
                    index: format!("{} of vehicle {}", vehicle.arrival, vehicle.id),
                    domain: "H-",
                });
            }
            if !departures.insert(vehicle.departure) {
                return Err(ConstructionError::Duplicate {
                    what: "departure depot assignment",
                    index: vehicle.departure.to_string(),
                });
            }
            if !arrivals.insert(vehicle.arrival) {
                return Err(ConstructionError::Duplicate {
                    what: "arrival depot assignment",
                    index: vehicle.arrival.to_string(),
                });
            }
        }

        let unused = self.sites.iter().find(|s| match s.kind {
            SiteKind::DepartureDepot => !departures.contains(&s.id),
            SiteKind::ArrivalDepot => !arrivals.contains(&s.id),
            _ => false,
        });
        if let Some(depot) = unused {
            return Err(ConstructionError::Structure(format!(
                "depot {} is not assigned to any vehicle",
                depot.id
            )));
        }
        Ok(())
    }
}

fn non_negative(param: &'static str, site: SiteId, value: f64) -> Result<(), ConstructionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConstructionError::InvalidParameter {
            param,
            index: site.to_string(),
            reason: format!("{value} must be finite and non-negative"),
        })
    }
}

/// Builder for constructing routing problems
#[derive(Debug, Default)]
pub struct RoutingProblemBuilder {
    problem: RoutingProblem,
}

impl RoutingProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(mut self, site: Site) -> Self {
        self.problem.sites.push(site);
        self
    }

    pub fn sites(mut self, sites: impl IntoIterator<Item = Site>) -> Self {
        self.problem.sites.extend(sites);
        self
    }

    pub fn vehicle(mut self, vehicle: Vehicle) -> Self {
        self.problem.vehicles.push(vehicle);
        self
    }

    pub fn travel_time(mut self, from: SiteId, to: SiteId, time: f64) -> Self {
        self.problem.travel_times.insert((from, to), time);
        self
    }

    /// Same travel time in both directions
    pub fn symmetric_travel_time(self, a: SiteId, b: SiteId, time: f64) -> Self {
        self.travel_time(a, b, time).travel_time(b, a, time)
    }

    /// Travel time for every ordered pair of sites not set yet
    pub fn default_travel_time(mut self, time: f64) -> Self {
        let ids: Vec<SiteId> = self.problem.sites.iter().map(|s| s.id).collect();
        for &i in &ids {
            for &j in ids.iter().filter(|&&j| j != i) {
                self.problem.travel_times.entry((i, j)).or_insert(time);
            }
        }
        self
    }

    pub fn precedence(mut self, before: SiteId, after: SiteId) -> Self {
        self.problem.precedences.push((before, after));
        self
    }

    /// Precedences of consecutive repairs in a restoration ordering.
    pub fn precedences_from_order(
        mut self,
        order: &[LineKey],
        repair_site_of_line: &HashMap<LineKey, SiteId>,
    ) -> Result<Self, ConstructionError> {
        let pairs = precedence::from_repair_order(order, repair_site_of_line)?;
        self.problem.precedences.extend(pairs);
        Ok(self)
    }

    pub fn build(self) -> Result<RoutingProblem, ConstructionError> {
        self.problem.validate()?;
        Ok(self.problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grr_core::VehicleId;

    fn id(n: usize) -> SiteId {
        SiteId::new(n)
    }

    fn builder() -> RoutingProblemBuilder {
        RoutingProblemBuilder::new()
            .site(Site::departure_depot(id(0), "out"))
            .site(Site::arrival_depot(id(1), "in"))
            .site(Site::pickup(id(2), "warehouse", 2.0, id(3)))
            .site(Site::repair(id(3), "feeder", 4.0))
            .vehicle(Vehicle::new(VehicleId::new(0), "crew", id(0), id(1), 5.0))
    }

    #[test]
    fn test_arcs_and_deltas() {
        let problem = builder().default_travel_time(1.0).build().unwrap();
        let arcs: Vec<_> = problem.arcs().collect();

        // S+ = {0, 2, 3}, S- = {1, 2, 3}, minus self loops
        assert_eq!(arcs.len(), 3 * 3 - 2);
        assert!(!arcs.contains(&(id(1), id(0))));
        assert!(arcs.contains(&(id(0), id(1))));

        let deltas: Vec<f64> = problem.sites.iter().map(|s| problem.load_delta(s)).collect();
        assert_eq!(deltas, vec![0.0, 0.0, 2.0, -2.0]);
        assert_eq!(problem.max_travel_from(id(0)), 1.0);
    }

    #[test]
    fn test_missing_travel_time() {
        let err = builder()
            .travel_time(id(0), id(2), 1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::MissingParameter { param: "t", .. }));
    }

    #[test]
    fn test_pickup_must_target_repair_site() {
        let err = RoutingProblemBuilder::new()
            .site(Site::departure_depot(id(0), "out"))
            .site(Site::arrival_depot(id(1), "in"))
            .site(Site::pickup(id(2), "warehouse", 2.0, id(1)))
            .vehicle(Vehicle::new(VehicleId::new(0), "crew", id(0), id(1), 5.0))
            .default_travel_time(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::OutOfDomain { what: "repair site", .. }));
    }

    #[test]
    fn test_depot_rules() {
        // Second crew shares the first crew's departure depot
        let err = builder()
            .site(Site::arrival_depot(id(4), "in 2"))
            .vehicle(Vehicle::new(VehicleId::new(1), "crew 2", id(0), id(4), 5.0))
            .default_travel_time(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::Duplicate { .. }));

        // Unused depot
        let err = builder()
            .site(Site::departure_depot(id(4), "spare"))
            .default_travel_time(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::Structure(_)));

        // Vehicle departing from a repair site
        let err = RoutingProblemBuilder::new()
            .site(Site::arrival_depot(id(1), "in"))
            .site(Site::repair(id(3), "feeder", 4.0))
            .vehicle(Vehicle::new(VehicleId::new(0), "crew", id(3), id(1), 5.0))
            .default_travel_time(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::OutOfDomain { what: "departure depot", .. }));
    }

    #[test]
    fn test_precedence_sites_are_repairs() {
        let err = builder()
            .precedence(id(3), id(2))
            .default_travel_time(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::OutOfDomain { what: "precedence site", .. }));
    }

    #[test]
    fn test_negative_parameters() {
        let err = builder()
            .default_travel_time(1.0)
            .travel_time(id(2), id(3), -1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidParameter { param: "t", .. }));

        let err = builder()
            .site(Site::repair(id(5), "bad", -2.0))
            .default_travel_time(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidParameter { param: "s", .. }));
    }
}
