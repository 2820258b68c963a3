//! Restoration ordering model assembly and solution extraction

use grr_core::model::{Constraint, Expr, Model, ModelSolution, ObjectiveSense, VarId};
use grr_core::{ConstructionError, GrrResult, LineKey, Network, RestorationConfig};
use tracing::info;

use super::{RestorationOrderingProblem, RestorationOrderingSolution, RestorationStep};
use crate::ac::AcBlock;
use crate::bigm;
use crate::lpp::{BoundEncoding, FlowScope};
use crate::solve::solve_model;

/// Assembled restoration ordering model.
#[derive(Debug, Clone)]
pub struct RopModel {
    pub model: Model,
    network: Network,
    damaged: Vec<LineKey>,
    /// One AC block per step
    blocks: Vec<AcBlock>,
    /// `o[k][r]`: damaged line `r` repaired by step `k + 1`
    repaired: Vec<Vec<VarId>>,
    /// `z[k][l]`: line `l` active at step `k + 1`
    active: Vec<Vec<VarId>>,
}

/// Build the restoration ordering model.
///
/// ```text
/// maximize    Σ_k Σ_n p_l_n · l_{n,k}
/// subject to  Σ_{r∈R} o_{r,k} = k                          (repairs)
///             o_{r,k−1} ≤ o_{r,k}                          (monotone)
///             z_{r,k} ≤ o_{r,k},  z_{l,k} = 1 for l ∉ R    (energize, intact)
///             −S z ≤ p ≤ S z,  −S z ≤ q ≤ S z             (gate)
///             |p − f_p| ≤ M_p (1 − z),  |q − f_q| ≤ M_q (1 − z)
///             flow conservation and thermal limits per step
/// ```
pub fn build_model(
    problem: &RestorationOrderingProblem,
    config: &RestorationConfig,
) -> Result<RopModel, ConstructionError> {
    problem.validate()?;
    let network = &problem.network;
    let steps = problem.num_steps();
    let index = network.bus_index();

    let flow_m: Vec<(f64, f64)> = network
        .lines
        .iter()
        .map(|line| {
            let v_from = network.buses[index[&line.key.from]].v_max;
            let v_to = network.buses[index[&line.key.to]].v_max;
            bigm::branch_flow(line, v_from, v_to, &config.big_m)
        })
        .collect();

    let mut model = Model::new("ac-restoration-ordering");
    let mut blocks = Vec::with_capacity(steps);
    let mut repaired: Vec<Vec<VarId>> = Vec::with_capacity(steps);
    let mut active: Vec<Vec<VarId>> = Vec::with_capacity(steps);

    for k in 1..=steps {
        let block = AcBlock::add(&mut model, network, BoundEncoding::VariableDomain, Some(k));
        let o: Vec<VarId> = problem
            .damaged
            .iter()
            .map(|key| model.add_binary(block.name("o", key)))
            .collect();
        let z: Vec<VarId> = network
            .lines
            .iter()
            .map(|line| model.add_binary(block.name("z", line.key)))
            .collect();

        // === Repair sequencing ===
        model.add_constraint(Constraint::eq(
            format!("repairs[{k}]"),
            Expr::sum(o.iter().copied()),
            k as f64,
        ));
        if let Some(prev) = repaired.last() {
            for (r, key) in problem.damaged.iter().enumerate() {
                model.add_constraint(Constraint::leq(block.name("monotone", key), prev[r], o[r]));
            }
        }
        for (i, line) in network.lines.iter().enumerate() {
            match problem.damaged.iter().position(|d| *d == line.key) {
                Some(r) => model.add_constraint(Constraint::leq(block.name("energize", line.key), z[i], o[r])),
                None => model.add_constraint(Constraint::eq(block.name("intact", line.key), z[i], 1.0)),
            };
        }

        // === Conditional power flow ===
        block.add_balance(&mut model, network, FlowScope::OriginBus, problem.balance);
        for (i, line) in network.lines.iter().enumerate() {
            let vars = block.lines[i];
            let s = line.s_max;
            let (fp, fq) = block.branch_flow(network, i);
            let (mp, mq) = flow_m[i];
            let key = line.key;

            model.add_constraint(Constraint::geq(block.name("p_gate_lo", key), vars.p, -s * z[i]));
            model.add_constraint(Constraint::leq(block.name("p_gate_hi", key), vars.p, s * z[i]));
            model.add_constraint(Constraint::geq(block.name("q_gate_lo", key), vars.q, -s * z[i]));
            model.add_constraint(Constraint::leq(block.name("q_gate_hi", key), vars.q, s * z[i]));

            let p_slack = mp * (1.0 - z[i]);
            let q_slack = mq * (1.0 - z[i]);
            model.add_constraint(Constraint::leq(
                block.name("active_flow_hi", key),
                vars.p - fp.clone(),
                p_slack.clone(),
            ));
            model.add_constraint(Constraint::leq(block.name("active_flow_lo", key), fp - vars.p, p_slack));
            model.add_constraint(Constraint::leq(
                block.name("reactive_flow_hi", key),
                vars.q - fq.clone(),
                q_slack.clone(),
            ));
            model.add_constraint(Constraint::leq(block.name("reactive_flow_lo", key), fq - vars.q, q_slack));
        }
        block.add_thermal_limits(&mut model, network);

        blocks.push(block);
        repaired.push(o);
        active.push(z);
    }

    let objective = Expr::sum(blocks.iter().map(|b| b.served_load(network)));
    model.set_objective(ObjectiveSense::Maximize, objective);
    model.validate()?;

    info!(
        buses = network.buses.len(),
        lines = network.lines.len(),
        damaged = problem.damaged.len(),
        desired_load = network.total_load(),
        steps,
        vars = model.num_vars(),
        constraints = model.num_constraints(),
        class = %model.problem_class(),
        big_m_scale = config.big_m.scale,
        "built restoration ordering model"
    );

    Ok(RopModel {
        model,
        network: network.clone(),
        damaged: problem.damaged.clone(),
        blocks,
        repaired,
        active,
    })
}

impl RopModel {
    pub fn extract(&self, solution: &ModelSolution) -> RestorationOrderingSolution {
        let mut repair_order = Vec::with_capacity(self.damaged.len());
        let mut steps = Vec::with_capacity(self.blocks.len());

        for (k, block) in self.blocks.iter().enumerate() {
            let repaired: Vec<LineKey> = self
                .damaged
                .iter()
                .zip(&self.repaired[k])
                .filter(|(_, &o)| solution.is_set(o))
                .map(|(key, _)| *key)
                .collect();
            for key in &repaired {
                if !repair_order.contains(key) {
                    repair_order.push(*key);
                }
            }

            let energized = self
                .network
                .lines
                .iter()
                .zip(&self.active[k])
                .filter(|(_, &z)| solution.is_set(z))
                .map(|(line, _)| line.key)
                .collect();
            let (buses, lines) = block.read(&self.network, solution);
            let served_load = self
                .network
                .buses
                .iter()
                .zip(&buses)
                .map(|(bus, state)| bus.p_load * state.served)
                .sum();

            steps.push(RestorationStep {
                step: k + 1,
                repaired,
                energized,
                served_load,
                buses,
                lines,
            });
        }

        RestorationOrderingSolution {
            status: solution.status,
            objective: solution.objective,
            repair_order,
            steps,
            max_violation: solution.max_violation,
            solve_time: solution.solve_time,
            backend: solution.backend.clone(),
        }
    }
}

/// Build and solve a restoration ordering problem.
///
/// With the default `"auto"` backend the model (MINLP) is solved by the
/// enumeration driver over NLP leaves.
pub fn solve_restoration_ordering(
    problem: &RestorationOrderingProblem,
    config: &RestorationConfig,
) -> GrrResult<RestorationOrderingSolution> {
    config.validate()?;
    let built = build_model(problem, config)?;
    let solution = solve_model(&built.model, &config.solver)?;
    Ok(built.extract(&solution))
}
