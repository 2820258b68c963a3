mod common;

use common::{bus, init_tracing, three_bus_radial};
use grr_algo::lpp::BalanceSense;
use grr_algo::rop::{build_model, solve_restoration_ordering, RestorationOrderingProblem};
use grr_algo::validation::check_ordering;
use grr_core::model::ProblemClass;
use grr_core::{ConstructionError, GrrError, LineKey, RestorationConfig, SolveError};

fn inbound() -> (LineKey, LineKey) {
    (LineKey::new(bus(2), bus(1)), LineKey::new(bus(3), bus(1)))
}

fn problem() -> RestorationOrderingProblem {
    let (north, south) = inbound();
    RestorationOrderingProblem::new(three_bus_radial(), vec![north, south]).with_balance(BalanceSense::Exact)
}

#[test]
fn test_larger_load_is_restored_first() {
    init_tracing();
    let problem = problem();
    let solution = solve_restoration_ordering(&problem, &RestorationConfig::default()).unwrap();
    let (north, south) = inbound();

    // Step 1 picks up 2 MW, step 2 all 3 MW
    assert_eq!(solution.repair_order, vec![north, south], "{}", solution.summary());
    assert!((solution.objective - 5.0).abs() < 1e-3);
    assert!((solution.steps[0].served_load - 2.0).abs() < 1e-3);
    assert!((solution.steps[1].served_load - 3.0).abs() < 1e-3);
    assert_eq!(solution.repair_step(south), Some(2));

    let report = check_ordering(&problem, &solution);
    assert!(report.is_valid(), "{report}");
}

#[test]
fn test_served_load_is_monotone_over_steps() {
    init_tracing();
    let problem = problem();
    let solution = solve_restoration_ordering(&problem, &RestorationConfig::default()).unwrap();
    for pair in solution.steps.windows(2) {
        assert!(pair[1].served_load + 1e-4 >= pair[0].served_load);
        assert!(pair[0].repaired.iter().all(|l| pair[1].repaired.contains(l)));
    }
}

#[test]
fn test_doubling_big_m_keeps_the_order() {
    init_tracing();
    let problem = problem();
    let base = solve_restoration_ordering(&problem, &RestorationConfig::default()).unwrap();

    let mut config = RestorationConfig::default();
    config.big_m.scale = 2.0;
    let doubled = solve_restoration_ordering(&problem, &config).unwrap();

    assert!((base.objective - doubled.objective).abs() < 1e-4);
    assert_eq!(base.repair_order, doubled.repair_order);
    let report = check_ordering(&problem, &doubled);
    assert!(report.is_valid(), "{report}");
}

#[test]
fn test_model_is_minlp_with_step_blocks() {
    let built = build_model(&problem(), &RestorationConfig::default()).unwrap();
    assert_eq!(built.model.problem_class(), ProblemClass::MixedIntegerNonlinear);
    let intact = built
        .model
        .constraints()
        .iter()
        .filter(|c| c.name.starts_with("intact["))
        .count();
    // (1, 2) and (1, 3) in both steps
    assert_eq!(intact, 4);
}

#[test]
fn test_continuous_backend_is_refused() {
    let mut config = RestorationConfig::default();
    config.solver.backend = "nlp".into();
    let err = solve_restoration_ordering(&problem(), &config).unwrap_err();
    assert!(matches!(err, GrrError::Solve(SolveError::Unsupported { .. })));
}

#[test]
fn test_damaged_line_outside_network() {
    let problem = RestorationOrderingProblem::new(three_bus_radial(), vec![LineKey::new(bus(2), bus(3))]);
    let err = build_model(&problem, &RestorationConfig::default()).unwrap_err();
    assert!(matches!(err, ConstructionError::OutOfDomain { what: "damaged line", .. }));
}
