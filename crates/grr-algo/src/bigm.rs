//! Big-M constants derived from instance data.
//!
//! Each constant bounds the slack its constraint family needs when the
//! controlling binary is off. [`BigMPolicy::scale`] (≥ 1) multiplies every
//! value, so scaling never cuts off a feasible point.

use grr_core::{BigMPolicy, Line};

/// Bounds on `|f_p|` and `|f_q|` of the AC branch equations for a line with
/// endpoint voltage limits `v_from_max`, `v_to_max`:
///
/// ```text
/// M_p = v̄_n² |g| + v̄_n v̄_m (|g| + |b|)
/// M_q = v̄_n² |b| + v̄_n v̄_m (|g| + |b|)
/// ```
pub fn branch_flow(line: &Line, v_from_max: f64, v_to_max: f64, policy: &BigMPolicy) -> (f64, f64) {
    let (g, b) = (line.g.abs(), line.b.abs());
    let vn = v_from_max.abs();
    let vm = v_to_max.abs();
    let cross = vn * vm * (g + b);
    (policy.apply(vn * vn * g + cross), policy.apply(vn * vn * b + cross))
}

/// Load propagation slack `max_v c_v + |Δ_j|`.
pub fn load(max_capacity: f64, delta: f64, policy: &BigMPolicy) -> f64 {
    policy.apply(max_capacity + delta.abs())
}

/// Time horizon `T = Σ_i (s_i + max_j t_ij)`: no site can be reached later.
pub fn horizon<I>(per_site: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    per_site
        .into_iter()
        .map(|(service, max_travel)| service + max_travel)
        .sum()
}

/// Arrival-time slack `T + s_i + t_ij` for arc `(i, j)`.
pub fn arrival(horizon: f64, service: f64, travel: f64, policy: &BigMPolicy) -> f64 {
    policy.apply(horizon + service + travel)
}

/// Visit-rank slack `|S| + 1`; ranks live in `[0, |S|]`.
pub fn rank(num_sites: usize, policy: &BigMPolicy) -> f64 {
    policy.apply(num_sites as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grr_core::BusId;

    #[test]
    fn test_branch_flow_bound_dominates_equations() {
        let line = Line::new(BusId::new(1), BusId::new(2), 1.5, -4.0, 10.0);
        let policy = BigMPolicy::default();
        let (mp, mq) = branch_flow(&line, 1.1, 1.05, &policy);

        // Sample the AC equations over the voltage box and all angle gaps
        for vn in [0.9, 1.0, 1.1] {
            for vm in [0.9, 1.05] {
                for step in 0..64 {
                    let d = -std::f64::consts::PI + step as f64 * 0.1;
                    let fp = vn * vn * line.g - vn * vm * (line.g * d.cos() + line.b * d.sin());
                    let fq = -vn * vn * line.b + vn * vm * (line.b * d.cos() - line.g * d.sin());
                    assert!(fp.abs() <= mp + 1e-12);
                    assert!(fq.abs() <= mq + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_scale_multiplies() {
        let doubled = BigMPolicy { scale: 2.0 };
        assert_eq!(load(5.0, -3.0, &doubled), 16.0);
        assert_eq!(arrival(10.0, 2.0, 1.0, &doubled), 26.0);
        assert_eq!(horizon([(2.0, 3.0), (0.0, 4.0)]), 9.0);
        assert_eq!(rank(4, &doubled), 10.0);
    }
}
