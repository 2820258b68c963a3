#![allow(dead_code)]

use grr_core::{Bus, BusId, Network, Site, SiteId, Vehicle, VehicleId};
use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness; `RUST_LOG=grr_algo=debug`
/// shows model sizes and solver progress.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn bus(id: usize) -> BusId {
    BusId::new(id)
}

pub fn site(id: usize) -> SiteId {
    SiteId::new(id)
}

/// Generator at bus 1 feeding a 10 MW load at bus 2 over a lossless
/// branch.
pub fn two_bus() -> Network {
    let mut network = Network::new();
    network
        .add_bus(Bus::new(bus(1), "source").with_p_gen(0.0, 20.0).with_q_gen(-10.0, 10.0))
        .add_bus(Bus::new(bus(2), "feeder").with_load(10.0, 0.0))
        .add_branch(bus(1), bus(2), 0.0, -10.0, 30.0);
    network
}

/// Source bus 1 radially feeding bus 2 (2 MW) and bus 3 (1 MW).
pub fn three_bus_radial() -> Network {
    let mut network = Network::new();
    network
        .add_bus(Bus::new(bus(1), "source").with_p_gen(0.0, 20.0).with_q_gen(-10.0, 10.0))
        .add_bus(Bus::new(bus(2), "north").with_load(2.0, 0.0).with_q_gen(-1.0, 1.0))
        .add_bus(Bus::new(bus(3), "south").with_load(1.0, 0.0).with_q_gen(-1.0, 1.0))
        .add_branch(bus(1), bus(2), 0.0, -10.0, 10.0)
        .add_branch(bus(1), bus(3), 0.0, -10.0, 10.0);
    network
}

pub fn crew(id: usize, departure: usize, arrival: usize, capacity: f64) -> Vehicle {
    Vehicle::new(
        VehicleId::new(id),
        format!("crew {id}"),
        site(departure),
        site(arrival),
        capacity,
    )
}

/// One depot pair, a pickup of `load` feeding a repair taking `service`.
pub fn single_job(load: f64, service: f64) -> Vec<Site> {
    vec![
        Site::departure_depot(site(0), "yard out"),
        Site::arrival_depot(site(1), "yard in"),
        Site::pickup(site(2), "warehouse", load, site(3)),
        Site::repair(site(3), "feeder 7", service),
    ]
}
