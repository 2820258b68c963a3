//! Sites and vehicles for the pickup-and-repair routing model.

use serde::{Deserialize, Serialize};

use crate::{SiteId, VehicleId};

/// Role of a site in the routing model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SiteKind {
    /// Where a vehicle starts (H+).
    DepartureDepot,
    /// Where a vehicle ends (H−).
    ArrivalDepot,
    /// Where repair material is collected (W+).
    Pickup { load: f64, repair_site: SiteId },
    /// Where a damaged component is repaired (W−).
    Repair { service_time: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub kind: SiteKind,
}

impl Site {
    pub fn departure_depot(id: SiteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SiteKind::DepartureDepot,
        }
    }

    pub fn arrival_depot(id: SiteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SiteKind::ArrivalDepot,
        }
    }

    pub fn pickup(id: SiteId, name: impl Into<String>, load: f64, repair_site: SiteId) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SiteKind::Pickup { load, repair_site },
        }
    }

    pub fn repair(id: SiteId, name: impl Into<String>, service_time: f64) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SiteKind::Repair { service_time },
        }
    }

    /// Service time `s_i` (zero everywhere except repair sites).
    pub fn service_time(&self) -> f64 {
        match self.kind {
            SiteKind::Repair { service_time } => service_time,
            _ => 0.0,
        }
    }

    /// Sites a vehicle may leave from (S+ = H+ ∪ W+ ∪ W−).
    pub fn has_successor(&self) -> bool {
        !matches!(self.kind, SiteKind::ArrivalDepot)
    }

    /// Sites a vehicle may arrive at (S− = H− ∪ W+ ∪ W−).
    pub fn has_predecessor(&self) -> bool {
        !matches!(self.kind, SiteKind::DepartureDepot)
    }

    pub fn is_repair(&self) -> bool {
        matches!(self.kind, SiteKind::Repair { .. })
    }

    pub fn is_pickup(&self) -> bool {
        matches!(self.kind, SiteKind::Pickup { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub departure: SiteId,
    pub arrival: SiteId,
    pub capacity: f64,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        name: impl Into<String>,
        departure: SiteId,
        arrival: SiteId,
        capacity: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            departure,
            arrival,
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_predecessor_sets() {
        let h_plus = Site::departure_depot(SiteId::new(0), "depot out");
        let h_minus = Site::arrival_depot(SiteId::new(1), "depot in");
        let repair = Site::repair(SiteId::new(2), "feeder 7", 3.0);
        let pickup = Site::pickup(SiteId::new(3), "warehouse", 1.0, SiteId::new(2));

        assert!(h_plus.has_successor() && !h_plus.has_predecessor());
        assert!(!h_minus.has_successor() && h_minus.has_predecessor());
        assert!(repair.has_successor() && repair.has_predecessor());
        assert!(pickup.has_successor() && pickup.has_predecessor());

        assert_eq!(repair.service_time(), 3.0);
        assert_eq!(pickup.service_time(), 0.0);
    }

    #[test]
    fn test_site_kind_serializes() {
        let site = Site::pickup(SiteId::new(3), "warehouse", 1.5, SiteId::new(2));
        let json = serde_json::to_string(&site).unwrap();
        let back: Site = serde_json::from_str(&json).unwrap();
        assert_eq!(back, site);
    }
}
