//! AC network block shared by the load pickup and restoration ordering models.
//!
//! One block holds the per-bus and per-line variables of one operating
//! point; the restoration ordering model adds one block per repair step.
//!
//! ```text
//! p_nm = v_n² g − v_n v_m g cos(θ_n − θ_m) − v_n v_m b sin(θ_n − θ_m)
//! q_nm = −v_n² b + v_n v_m b cos(θ_n − θ_m) − v_n v_m g sin(θ_n − θ_m)
//! ```

use std::collections::HashMap;
use std::fmt::Display;

use grr_core::model::{Constraint, Expr, Model, ModelSolution, VarId};
use grr_core::{BusId, Network};

use crate::lpp::{BalanceSense, BoundEncoding, BusState, FlowScope, LineFlow};

#[derive(Debug, Clone, Copy)]
pub(crate) struct BusVars {
    pub theta: VarId,
    pub v: VarId,
    pub p_gen: VarId,
    pub q_gen: VarId,
    pub served: VarId,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LineVars {
    pub p: VarId,
    pub q: VarId,
}

/// Variables of one operating point, aligned with `network.buses` and
/// `network.lines`.
#[derive(Debug, Clone)]
pub(crate) struct AcBlock {
    pub buses: Vec<BusVars>,
    pub lines: Vec<LineVars>,
    /// Position of every bus id in `buses`
    index: HashMap<BusId, usize>,
    step: Option<usize>,
}

fn label(base: &str, index: impl Display, step: Option<usize>) -> String {
    match step {
        Some(k) => format!("{base}[{index},{k}]"),
        None => format!("{base}[{index}]"),
    }
}

/// Continuous variable carrying `[lower, upper]` either as its domain or as
/// two explicit constraints.
fn bounded(
    model: &mut Model,
    encoding: BoundEncoding,
    name: String,
    lower: f64,
    upper: f64,
) -> VarId {
    match encoding {
        BoundEncoding::VariableDomain => model.add_continuous(name, lower, upper),
        BoundEncoding::ExplicitConstraints => {
            let var = model.add_free(name.clone());
            model.add_constraint(Constraint::geq(format!("{name}_lb"), var, lower));
            model.add_constraint(Constraint::leq(format!("{name}_ub"), var, upper));
            var
        }
    }
}

impl AcBlock {
    pub fn add(model: &mut Model, network: &Network, encoding: BoundEncoding, step: Option<usize>) -> Self {
        let buses = network
            .buses
            .iter()
            .map(|bus| BusVars {
                theta: model.add_free(label("theta", bus.id, step)),
                v: bounded(model, encoding, label("v", bus.id, step), bus.v_min, bus.v_max),
                p_gen: bounded(
                    model,
                    encoding,
                    label("p_g", bus.id, step),
                    bus.p_gen_min,
                    bus.p_gen_max,
                ),
                q_gen: bounded(
                    model,
                    encoding,
                    label("q_g", bus.id, step),
                    bus.q_gen_min,
                    bus.q_gen_max,
                ),
                served: bounded(model, encoding, label("l", bus.id, step), 0.0, 1.0),
            })
            .collect();

        let lines = network
            .lines
            .iter()
            .map(|line| {
                let s = line.s_max;
                LineVars {
                    p: bounded(model, encoding, label("p", line.key, step), -s, s),
                    q: bounded(model, encoding, label("q", line.key, step), -s, s),
                }
            })
            .collect();

        Self {
            buses,
            lines,
            index: network.bus_index(),
            step,
        }
    }

    pub fn name(&self, base: &str, index: impl Display) -> String {
        label(base, index, self.step)
    }

    fn bus(&self, id: BusId) -> &BusVars {
        &self.buses[self.index[&id]]
    }

    /// `(f_p, f_q)` of line `i` as functions of `v` and `θ`.
    pub fn branch_flow(&self, network: &Network, i: usize) -> (Expr, Expr) {
        let line = &network.lines[i];
        let from = self.bus(line.key.from);
        let to = self.bus(line.key.to);
        let (g, b) = (line.g, line.b);

        let vn2 = Expr::from(from.v).square();
        let vnvm = from.v * to.v;
        let delta = from.theta - to.theta;
        let (cos, sin) = (delta.clone().cos(), delta.sin());

        let p = g * vn2.clone() - vnvm.clone() * (g * cos.clone() + b * sin.clone());
        let q = -b * vn2 + vnvm * (b * cos - g * sin);
        (p, q)
    }

    /// `Σ_n p_l_n · l_n`
    pub fn served_load(&self, network: &Network) -> Expr {
        Expr::sum(
            network
                .buses
                .iter()
                .zip(&self.buses)
                .map(|(bus, vars)| bus.p_load * vars.served),
        )
    }

    /// Active and reactive flow conservation at every bus.
    pub fn add_balance(
        &self,
        model: &mut Model,
        network: &Network,
        scope: FlowScope,
        sense: BalanceSense,
    ) {
        for (bus, vars) in network.buses.iter().zip(&self.buses) {
            let outgoing: Vec<&LineVars> = network
                .lines
                .iter()
                .zip(&self.lines)
                .filter(|(line, _)| scope == FlowScope::AllLines || line.key.from == bus.id)
                .map(|(_, v)| v)
                .collect();
            let p_out = Expr::sum(outgoing.iter().map(|l| l.p));
            let q_out = Expr::sum(outgoing.iter().map(|l| l.q));
            let p_net = vars.p_gen - bus.p_load * vars.served;
            let q_net = vars.q_gen - bus.q_load * vars.served;

            let (p_name, q_name) = (self.name("flow_p", bus.id), self.name("flow_q", bus.id));
            let (cp, cq) = match sense {
                BalanceSense::Relaxed => (
                    Constraint::leq(p_name, p_net, p_out),
                    Constraint::leq(q_name, q_net, q_out),
                ),
                BalanceSense::Exact => (
                    Constraint::eq(p_name, p_net, p_out),
                    Constraint::eq(q_name, q_net, q_out),
                ),
            };
            model.add_constraint(cp);
            model.add_constraint(cq);
        }
    }

    /// `p_nm = f_p`, `q_nm = f_q` on every line.
    pub fn add_branch_equations(&self, model: &mut Model, network: &Network) {
        for (i, line) in network.lines.iter().enumerate() {
            let (fp, fq) = self.branch_flow(network, i);
            let vars = self.lines[i];
            model.add_constraint(Constraint::eq(self.name("active_flow", line.key), vars.p, fp));
            model.add_constraint(Constraint::eq(self.name("reactive_flow", line.key), vars.q, fq));
        }
    }

    /// `p² + q² ≤ S²` on every line.
    pub fn add_thermal_limits(&self, model: &mut Model, network: &Network) {
        for (line, vars) in network.lines.iter().zip(&self.lines) {
            model.add_constraint(Constraint::leq(
                self.name("thermal", line.key),
                Expr::from(vars.p).square() + Expr::from(vars.q).square(),
                line.s_max * line.s_max,
            ));
        }
    }

    /// Bus states and line flows of this block in a model solution.
    pub fn read(&self, network: &Network, solution: &ModelSolution) -> (Vec<BusState>, Vec<LineFlow>) {
        let buses = network
            .buses
            .iter()
            .zip(&self.buses)
            .map(|(bus, vars)| BusState {
                id: bus.id,
                v: solution.value(vars.v),
                theta: solution.value(vars.theta),
                p_gen: solution.value(vars.p_gen),
                q_gen: solution.value(vars.q_gen),
                served: solution.value(vars.served),
            })
            .collect();
        let lines = network
            .lines
            .iter()
            .zip(&self.lines)
            .map(|(line, vars)| LineFlow {
                key: line.key,
                p: solution.value(vars.p),
                q: solution.value(vars.q),
                s_max: line.s_max,
            })
            .collect();
        (buses, lines)
    }
}
