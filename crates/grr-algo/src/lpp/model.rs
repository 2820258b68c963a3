//! Load pickup model assembly and solution extraction

use grr_core::model::{Model, ModelSolution, ObjectiveSense};
use grr_core::{ConstructionError, GrrResult, Network, RestorationConfig};
use tracing::info;

use super::{LoadPickupProblem, LoadPickupSolution};
use crate::ac::AcBlock;
use crate::solve::solve_model;

/// Assembled load pickup model with the handles needed to read it back.
#[derive(Debug, Clone)]
pub struct LppModel {
    pub model: Model,
    network: Network,
    block: AcBlock,
}

/// Build the load pickup model.
///
/// ```text
/// maximize    Σ_n p_l_n · l_n
/// subject to  p_g_n − p_l_n · l_n ⋄ Σ p_nm        (flow_p, flow_q)
///             p_nm = f_p(v, θ),  q_nm = f_q(v, θ)  (active_flow, reactive_flow)
///             p_nm² + q_nm² ≤ S_nm²                (thermal)
/// ```
pub fn build_model(problem: &LoadPickupProblem) -> Result<LppModel, ConstructionError> {
    problem.validate()?;
    let network = &problem.network;

    let mut model = Model::new("ac-load-pickup");
    let block = AcBlock::add(&mut model, network, problem.encoding, None);
    block.add_balance(&mut model, network, problem.scope, problem.balance);
    block.add_branch_equations(&mut model, network);
    block.add_thermal_limits(&mut model, network);
    model.set_objective(ObjectiveSense::Maximize, block.served_load(network));

    model.validate()?;
    info!(
        buses = problem.num_buses(),
        lines = problem.num_lines(),
        desired_load = network.total_load(),
        vars = model.num_vars(),
        constraints = model.num_constraints(),
        class = %model.problem_class(),
        encoding = ?problem.encoding,
        scope = ?problem.scope,
        balance = ?problem.balance,
        "built load pickup model"
    );

    Ok(LppModel {
        model,
        network: network.clone(),
        block,
    })
}

impl LppModel {
    pub fn extract(&self, solution: &ModelSolution) -> LoadPickupSolution {
        let (buses, lines) = self.block.read(&self.network, solution);
        LoadPickupSolution {
            status: solution.status,
            objective: solution.objective,
            buses,
            lines,
            max_violation: solution.max_violation,
            solve_time: solution.solve_time,
            backend: solution.backend.clone(),
        }
    }
}

/// Build and solve a load pickup problem.
///
/// # Example
///
/// ```no_run
/// use grr_algo::lpp::{solve_load_pickup, LoadPickupProblem};
/// use grr_core::{Bus, BusId, Network, RestorationConfig};
///
/// let mut network = Network::new();
/// network
///     .add_bus(Bus::new(BusId::new(1), "source").with_p_gen(0.0, 20.0).with_q_gen(-10.0, 10.0))
///     .add_bus(Bus::new(BusId::new(2), "feeder").with_load(10.0, 0.0))
///     .add_branch(BusId::new(1), BusId::new(2), 0.0, -10.0, 30.0);
///
/// let problem = LoadPickupProblem::new(network);
/// let solution = solve_load_pickup(&problem, &RestorationConfig::default())?;
/// println!("{}", solution.summary());
/// # Ok::<(), grr_core::GrrError>(())
/// ```
pub fn solve_load_pickup(
    problem: &LoadPickupProblem,
    config: &RestorationConfig,
) -> GrrResult<LoadPickupSolution> {
    config.validate()?;
    let built = build_model(problem)?;
    let solution = solve_model(&built.model, &config.solver)?;
    Ok(built.extract(&solution))
}
