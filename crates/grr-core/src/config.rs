//! Solver and big-M configuration.
//!
//! [`RestorationConfig`] is read from TOML and supports partial files where
//! unspecified values fall back to defaults:
//!
//! ```toml
//! [solver]
//! backend = "enumeration"
//! tolerance = 1e-7
//! time_limit_secs = 30.0
//!
//! [big_m]
//! scale = 2.0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GrrError, GrrResult};

/// Top-level configuration for a restoration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationConfig {
    /// Backend selection and numerical settings.
    pub solver: SolverSettings,

    /// Scaling applied to data-derived big-M constants.
    pub big_m: BigMPolicy,
}

/// Numerical settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Backend name ("auto", "milp", "nlp", "enumeration").
    pub backend: String,

    /// Feasibility tolerance on constraint and bound violations.
    pub tolerance: f64,

    /// L-BFGS iterations per augmented Lagrangian round.
    pub max_iterations: u64,

    /// Augmented Lagrangian rounds.
    pub max_outer_iterations: usize,

    /// Initial penalty parameter.
    pub initial_penalty: f64,

    /// Penalty growth factor when violation stalls.
    pub penalty_growth: f64,

    /// L-BFGS history length.
    pub lbfgs_memory: usize,

    /// Leaves the enumeration driver may visit before giving up.
    pub max_binary_assignments: usize,

    /// Distance from an integer still accepted as integral.
    pub integrality_tolerance: f64,

    /// Wall-clock limit in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<f64>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            tolerance: 1e-6,
            max_iterations: 200,
            max_outer_iterations: 20,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            lbfgs_memory: 7,
            max_binary_assignments: 4096,
            integrality_tolerance: 1e-6,
            time_limit_secs: None,
        }
    }
}

impl SolverSettings {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs_f64)
    }
}

/// Big-M handling.
///
/// Big-M constants are derived from instance data per constraint family;
/// `scale` multiplies every one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigMPolicy {
    pub scale: f64,
}

impl Default for BigMPolicy {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl BigMPolicy {
    pub fn apply(&self, m: f64) -> f64 {
        self.scale * m
    }
}

impl RestorationConfig {
    pub fn from_toml_str(contents: &str) -> GrrResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load(path: impl AsRef<Path>) -> GrrResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), backend = %config.solver.backend, "loaded restoration config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> GrrResult<String> {
        toml::to_string_pretty(self).map_err(|e| GrrError::Config(e.to_string()))
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> GrrResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)?;
        debug!(path = %path.display(), "saved restoration config");
        Ok(())
    }

    pub fn validate(&self) -> GrrResult<()> {
        let s = &self.solver;
        let positive = [
            ("solver.tolerance", s.tolerance),
            ("solver.initial_penalty", s.initial_penalty),
            ("solver.integrality_tolerance", s.integrality_tolerance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GrrError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(s.penalty_growth.is_finite() && s.penalty_growth > 1.0) {
            return Err(GrrError::Config(format!(
                "solver.penalty_growth must exceed 1, got {}",
                s.penalty_growth
            )));
        }
        if s.max_iterations == 0
            || s.max_outer_iterations == 0
            || s.lbfgs_memory == 0
            || s.max_binary_assignments == 0
        {
            return Err(GrrError::Config("solver iteration limits must be non-zero".into()));
        }
        if let Some(limit) = s.time_limit_secs {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(GrrError::Config(format!(
                    "solver.time_limit_secs must be positive, got {limit}"
                )));
            }
        }
        if !(self.big_m.scale.is_finite() && self.big_m.scale >= 1.0) {
            return Err(GrrError::Config(format!(
                "big_m.scale must be at least 1, got {}",
                self.big_m.scale
            )));
        }
        Ok(())
    }
}
