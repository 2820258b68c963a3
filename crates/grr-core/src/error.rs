//! Error taxonomy for model construction and solving
//!
//! Three layers, mirroring how a restoration run can fail:
//!
//! - [`ConstructionError`]: the instance data cannot populate a model
//!   (missing parameter, index outside its domain, malformed value). Always
//!   raised before a model reaches a solver.
//! - [`SolveError`]: the solver answered, but not with a solution
//!   (infeasible, unbounded, failed to terminate conclusively).
//! - [`GrrError`]: umbrella type for API boundaries, with conversions from
//!   both of the above plus configuration and I/O errors.
//!
//! # Example
//!
//! ```
//! use grr_core::{ConstructionError, GrrError, GrrResult};
//!
//! fn require_positive(value: f64) -> GrrResult<f64> {
//!     if value <= 0.0 {
//!         return Err(ConstructionError::InvalidParameter {
//!             param: "capacity",
//!             index: "vehicle 1".into(),
//!             reason: format!("must be positive, got {value}"),
//!         }
//!         .into());
//!     }
//!     Ok(value)
//! }
//!
//! assert!(matches!(require_positive(-1.0), Err(GrrError::Construction(_))));
//! ```

use crate::model::ProblemClass;
use thiserror::Error;

/// Instance data cannot be turned into a well-formed model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    /// A parameter required by a declared index has no value.
    #[error("missing parameter `{param}` for {index}")]
    MissingParameter { param: &'static str, index: String },

    /// An index lies outside the set it must belong to.
    #[error("{what} {index} is not in {domain}")]
    OutOfDomain {
        what: &'static str,
        index: String,
        domain: &'static str,
    },

    /// A parameter is present but its value is unusable.
    #[error("parameter `{param}` for {index} is invalid: {reason}")]
    InvalidParameter {
        param: &'static str,
        index: String,
        reason: String,
    },

    /// An element of a set was declared twice.
    #[error("duplicate {what} {index}")]
    Duplicate { what: &'static str, index: String },

    /// Structural problem with the instance as a whole.
    #[error("{0}")]
    Structure(String),
}

/// The solver did not return a solution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The constraint system admits no solution.
    #[error("model is infeasible: {0}")]
    Infeasible(String),

    /// The objective has no finite optimum.
    #[error("model is unbounded: {0}")]
    Unbounded(String),

    /// The solver did not terminate conclusively (time limit, numerics, limits).
    #[error("solver `{backend}` failed: {message}")]
    SolverFailure { backend: String, message: String },

    /// The backend cannot handle this class of model.
    #[error("solver `{backend}` does not support {class} models")]
    Unsupported { backend: String, class: ProblemClass },
}

impl SolveError {
    /// Shorthand for a [`SolveError::SolverFailure`].
    pub fn failure(backend: impl Into<String>, message: impl Into<String>) -> Self {
        SolveError::SolverFailure {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// True for outcomes that describe the model rather than the solver.
    pub fn is_model_outcome(&self) -> bool {
        matches!(self, SolveError::Infeasible(_) | SolveError::Unbounded(_))
    }
}

/// Unified error type for grr operations.
#[derive(Error, Debug)]
pub enum GrrError {
    /// Model construction failed
    #[error("Model construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Solving failed
    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using GrrError.
pub type GrrResult<T> = Result<T, GrrError>;

impl From<toml::de::Error> for GrrError {
    fn from(err: toml::de::Error) -> Self {
        GrrError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for GrrError {
    fn from(err: serde_json::Error) -> Self {
        GrrError::Parse(err.to_string())
    }
}
