mod common;

use common::{bus, init_tracing, two_bus};
use grr_algo::lpp::{build_model, solve_load_pickup, BalanceSense, LoadPickupProblem, LppFormulation};
use grr_algo::validation::check_load_pickup;
use grr_core::model::SolveStatus;
use grr_core::{Bus, GrrError, Line, LineKey, Network, RestorationConfig, SolveError};

/// Load of 10 at the generator bus, one line 1 → 2 with `g = b = 1` and
/// `S = 5`.
fn local_load() -> Network {
    let mut network = Network::new();
    network
        .add_bus(
            Bus::new(bus(1), "source")
                .with_load(10.0, 0.0)
                .with_p_gen(0.0, 10.0)
                .with_voltage(0.95, 1.05),
        )
        .add_bus(Bus::new(bus(2), "spur").with_voltage(0.95, 1.05))
        .add_line(Line::new(bus(1), bus(2), 1.0, 1.0, 5.0));
    network
}

/// Bus 2 sits behind a line limited to 2; bus 3 behind a line with ample
/// headroom.
fn constrained_feeder() -> Network {
    let mut network = Network::new();
    network
        .add_bus(Bus::new(bus(1), "source").with_p_gen(0.0, 20.0).with_q_gen(-10.0, 10.0))
        .add_bus(Bus::new(bus(2), "behind limit").with_load(10.0, 0.0).with_q_gen(-10.0, 10.0))
        .add_bus(Bus::new(bus(3), "open").with_load(1.0, 0.0).with_q_gen(-1.0, 1.0))
        .add_branch(bus(1), bus(2), 0.0, -10.0, 2.0)
        .add_branch(bus(1), bus(3), 0.0, -10.0, 10.0);
    network
}

/// Five-bus mesh (ring plus two chords) whose parameters vary with `seed`.
///
/// Zero load, zero generation, flat voltages and zero flows satisfy every
/// row, so each instance is feasible.
fn meshed(seed: usize) -> Network {
    let mut network = Network::new();
    network.add_bus(Bus::new(bus(1), "source").with_p_gen(0.0, 15.0).with_q_gen(-5.0, 5.0));
    for n in 2..=5 {
        let load = 1.0 + ((seed + n) % 4) as f64;
        let q_load = 0.2 * ((seed * 3 + n) % 3) as f64;
        network.add_bus(Bus::new(bus(n), format!("load {n}")).with_load(load, q_load));
    }
    let edges = [(1, 2), (2, 3), (3, 4), (4, 5), (5, 1), (1, 3), (2, 5)];
    for (k, &(a, b)) in edges.iter().enumerate() {
        let g = 0.5 + 0.25 * ((seed * 7 + k * 3) % 5) as f64;
        let susceptance = -(4.0 + ((seed * 3 + k) % 7) as f64);
        let s_max = 1.5 + ((seed + 2 * k) % 4) as f64;
        network.add_branch(bus(a), bus(b), g, susceptance, s_max);
    }
    network
}

#[test]
fn test_two_bus_serves_full_load() {
    init_tracing();
    let problem = LoadPickupProblem::new(two_bus());
    let solution = solve_load_pickup(&problem, &RestorationConfig::default()).unwrap();

    assert_eq!(solution.status, SolveStatus::LocallyOptimal);
    assert!((solution.served_load() - 10.0).abs() < 1e-3, "{}", solution.summary());
    let served = solution.bus(bus(2)).map(|b| 10.0 * b.served).unwrap_or_default();
    assert!((served - solution.objective).abs() < 1e-6);

    let report = check_load_pickup(&problem.network, &solution, 1e-5);
    assert!(report.is_valid(), "{report}");
}

#[test]
fn test_explicit_bounds_variant_agrees() {
    init_tracing();
    let standard = solve_load_pickup(&LoadPickupProblem::new(two_bus()), &RestorationConfig::default()).unwrap();

    let problem = LoadPickupProblem::new(two_bus()).with_formulation(LppFormulation::ExplicitBounds);
    let explicit = solve_load_pickup(&problem, &RestorationConfig::default()).unwrap();

    assert!((explicit.served_load() - standard.served_load()).abs() < 1e-2);
    let report = check_load_pickup(&problem.network, &explicit, 1e-4);
    assert!(report.is_valid(), "{report}");
}

#[test]
fn test_milp_backend_rejects_ac_model() {
    let mut config = RestorationConfig::default();
    config.solver.backend = "milp".into();
    let err = solve_load_pickup(&LoadPickupProblem::new(two_bus()), &config).unwrap_err();
    assert!(matches!(err, GrrError::Solve(SolveError::Unsupported { .. })));
}

#[test]
fn test_unknown_bus_in_line_is_construction_error() {
    let mut network = two_bus();
    network.add_line(grr_core::Line::new(bus(2), bus(9), 0.0, -10.0, 1.0));
    let err = build_model(&LoadPickupProblem::new(network)).unwrap_err();
    assert!(matches!(err, grr_core::ConstructionError::OutOfDomain { .. }));
}

#[test]
fn test_local_load_on_single_line() {
    init_tracing();
    for formulation in [LppFormulation::Standard, LppFormulation::ExplicitBounds] {
        let problem = LoadPickupProblem::new(local_load()).with_formulation(formulation);
        let solution = solve_load_pickup(&problem, &RestorationConfig::default()).unwrap();

        let served = solution.bus(bus(1)).map(|b| b.served).unwrap_or_default();
        assert!(served <= 1.0, "{formulation:?}: l_1 = {served}");
        assert!((solution.objective - 10.0).abs() < 1e-3, "{formulation:?}\n{}", solution.summary());
        assert!((solution.objective - 10.0 * served).abs() < 1e-6);

        let report = check_load_pickup(&problem.network, &solution, 1e-6);
        assert!(report.is_valid(), "{formulation:?}: {report}");
    }
}

#[test]
fn test_thermal_limit_binds_on_the_bottleneck() {
    init_tracing();
    let problem = LoadPickupProblem::new(constrained_feeder()).with_balance(BalanceSense::Exact);
    let solution = solve_load_pickup(&problem, &RestorationConfig::default()).unwrap();

    // At most 2 of the 10 behind the limit, all of bus 3
    let behind = solution.bus(bus(2)).map(|b| b.served).unwrap_or_default();
    assert!(behind < 0.25, "{}", solution.summary());
    let open = solution.bus(bus(3)).map(|b| b.served).unwrap_or_default();
    assert!((open - 1.0).abs() < 1e-3);

    let bottleneck = [LineKey::new(bus(1), bus(2)), LineKey::new(bus(2), bus(1))];
    let saturated = solution.saturated_lines(1e-3);
    assert!(!saturated.is_empty());
    assert!(saturated.iter().all(|key| bottleneck.contains(key)), "{saturated:?}");

    for flow in &solution.lines {
        let slack = flow.s_max.powi(2) - (flow.p.powi(2) + flow.q.powi(2));
        if saturated.contains(&flow.key) {
            assert!(slack.abs() < 5e-3, "{}: slack {slack}", flow.key);
        } else if !bottleneck.contains(&flow.key) {
            assert!(slack > 1.0, "{}: slack {slack}", flow.key);
        }
    }

    let report = check_load_pickup(&problem.network, &solution, 1e-5);
    assert!(report.is_valid(), "{report}");
}

#[test]
fn test_feasible_mesh_is_never_reported_infeasible() {
    init_tracing();
    for seed in 0..12 {
        let problem = LoadPickupProblem::new(meshed(seed)).with_balance(BalanceSense::Exact);
        match solve_load_pickup(&problem, &RestorationConfig::default()) {
            Ok(solution) => {
                let report = check_load_pickup(&problem.network, &solution, 1e-5);
                assert!(report.is_valid(), "seed {seed}: {report}");
            }
            Err(GrrError::Solve(SolveError::SolverFailure { .. })) => {}
            Err(err) => panic!("seed {seed}: {err}"),
        }
    }
}
