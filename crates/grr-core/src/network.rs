//! Electrical network data for the AC models.
//!
//! Lines are **directed**: `(n, m)` and `(m, n)` are distinct members of the
//! line set and flow conservation at bus `n` only sums lines leaving `n`. An
//! undirected branch is therefore entered as two lines, which
//! [`Network::add_branch`] does in one call.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;
use crate::BusId;

/// Bus with its desired load, generation limits and voltage limits (per-unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Desired active load `p_l`
    pub p_load: f64,
    /// Desired reactive load `q_l`
    pub q_load: f64,
    pub p_gen_min: f64,
    pub p_gen_max: f64,
    pub q_gen_min: f64,
    pub q_gen_max: f64,
    pub v_min: f64,
    pub v_max: f64,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId::new(0),
            name: String::new(),
            p_load: 0.0,
            q_load: 0.0,
            p_gen_min: 0.0,
            p_gen_max: 0.0,
            q_gen_min: 0.0,
            q_gen_max: 0.0,
            v_min: 0.9,
            v_max: 1.1,
        }
    }
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_load(mut self, p: f64, q: f64) -> Self {
        self.p_load = p;
        self.q_load = q;
        self
    }

    pub fn with_p_gen(mut self, min: f64, max: f64) -> Self {
        self.p_gen_min = min;
        self.p_gen_max = max;
        self
    }

    pub fn with_q_gen(mut self, min: f64, max: f64) -> Self {
        self.q_gen_min = min;
        self.q_gen_max = max;
        self
    }

    pub fn with_voltage(mut self, min: f64, max: f64) -> Self {
        self.v_min = min;
        self.v_max = max;
        self
    }
}

/// Ordered `(from, to)` pair identifying a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub from: BusId,
    pub to: BusId,
}

impl LineKey {
    pub fn new(from: BusId, to: BusId) -> Self {
        Self { from, to }
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.from, self.to)
    }
}

/// Directed line with series admittance `g + jb` and thermal limit `s_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub key: LineKey,
    /// Conductance (per-unit)
    pub g: f64,
    /// Susceptance (per-unit)
    pub b: f64,
    /// Apparent power limit (per-unit)
    pub s_max: f64,
}

impl Line {
    pub fn new(from: BusId, to: BusId, g: f64, b: f64, s_max: f64) -> Self {
        Self {
            key: LineKey::new(from, to),
            g,
            b,
            s_max,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub buses: Vec<Bus>,
    pub lines: Vec<Line>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&mut self, bus: Bus) -> &mut Self {
        self.buses.push(bus);
        self
    }

    pub fn add_line(&mut self, line: Line) -> &mut Self {
        self.lines.push(line);
        self
    }

    /// Add both directions of an undirected branch.
    pub fn add_branch(&mut self, a: BusId, b: BusId, g: f64, susceptance: f64, s_max: f64) -> &mut Self {
        self.add_line(Line::new(a, b, g, susceptance, s_max));
        self.add_line(Line::new(b, a, g, susceptance, s_max))
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }

    pub fn line(&self, key: LineKey) -> Option<&Line> {
        self.lines.iter().find(|l| l.key == key)
    }

    pub fn contains_line(&self, key: LineKey) -> bool {
        self.line(key).is_some()
    }

    /// Position of every bus in `buses`.
    pub fn bus_index(&self) -> HashMap<BusId, usize> {
        self.buses
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, i))
            .collect()
    }

    pub fn total_load(&self) -> f64 {
        self.buses.iter().map(|b| b.p_load).sum()
    }

    /// Check ids, references and parameter ranges.
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.buses.is_empty() {
            return Err(ConstructionError::Structure("network has no buses".into()));
        }

        let mut ids = HashSet::with_capacity(self.buses.len());
        for bus in &self.buses {
            if !ids.insert(bus.id) {
                return Err(ConstructionError::Duplicate {
                    what: "bus",
                    index: bus.id.to_string(),
                });
            }
            let index = || format!("bus {}", bus.id);
            let params = [
                ("p_load", bus.p_load),
                ("q_load", bus.q_load),
                ("p_gen_min", bus.p_gen_min),
                ("p_gen_max", bus.p_gen_max),
                ("q_gen_min", bus.q_gen_min),
                ("q_gen_max", bus.q_gen_max),
                ("v_min", bus.v_min),
                ("v_max", bus.v_max),
            ];
            for (param, value) in params {
                if !value.is_finite() {
                    return Err(ConstructionError::InvalidParameter {
                        param,
                        index: index(),
                        reason: format!("{value} is not finite"),
                    });
                }
            }
            for (param, lo, hi) in [
                ("p_gen", bus.p_gen_min, bus.p_gen_max),
                ("q_gen", bus.q_gen_min, bus.q_gen_max),
                ("v", bus.v_min, bus.v_max),
            ] {
                if lo > hi {
                    return Err(ConstructionError::InvalidParameter {
                        param,
                        index: index(),
                        reason: format!("lower bound {lo} exceeds upper bound {hi}"),
                    });
                }
            }
            if bus.v_min < 0.0 {
                return Err(ConstructionError::InvalidParameter {
                    param: "v_min",
                    index: index(),
                    reason: "voltage magnitude cannot be negative".into(),
                });
            }
        }

        let mut keys = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            let key = line.key;
            for end in [key.from, key.to] {
                if !ids.contains(&end) {
                    return Err(ConstructionError::OutOfDomain {
                        what: "line endpoint",
                        index: format!("{end} of line {key}"),
                        domain: "buses",
                    });
                }
            }
            if key.from == key.to {
                return Err(ConstructionError::Structure(format!(
                    "line {key} is a self loop"
                )));
            }
            if !keys.insert(key) {
                return Err(ConstructionError::Duplicate {
                    what: "line",
                    index: key.to_string(),
                });
            }
            for (param, value) in [("g", line.g), ("b", line.b), ("s_max", line.s_max)] {
                if !value.is_finite() {
                    return Err(ConstructionError::InvalidParameter {
                        param,
                        index: format!("line {key}"),
                        reason: format!("{value} is not finite"),
                    });
                }
            }
            if line.s_max < 0.0 {
                return Err(ConstructionError::InvalidParameter {
                    param: "s_max",
                    index: format!("line {key}"),
                    reason: format!("thermal limit must be non-negative, got {}", line.s_max),
                });
            }
        }
        Ok(())
    }
}
