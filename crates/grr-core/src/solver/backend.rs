//! Backend trait shared by every solver implementation.

use crate::config::SolverSettings;
use crate::error::SolveError;
use crate::model::{Model, ModelSolution, ProblemClass};

/// Solves a [`Model`] of a supported [`ProblemClass`].
///
/// Backends are matched to models via `problem_class()`. Multiple backends
/// may support the same class (the enumeration driver and the MILP backend
/// both accept MILP models).
pub trait SolverBackend: Send + Sync {
    /// Unique identifier (e.g., "milp", "nlp", "enumeration")
    fn id(&self) -> &str;

    /// Problem classes this backend can solve
    fn supported_classes(&self) -> &[ProblemClass];

    fn supports(&self, class: ProblemClass) -> bool {
        self.supported_classes().contains(&class)
    }

    /// Solve the model
    fn solve(&self, model: &Model, settings: &SolverSettings) -> Result<ModelSolution, SolveError>;

    /// Reject models of a class this backend does not handle.
    fn ensure_supported(&self, model: &Model) -> Result<ProblemClass, SolveError> {
        let class = model.problem_class();
        if self.supports(class) {
            Ok(class)
        } else {
            Err(SolveError::Unsupported {
                backend: self.id().to_string(),
                class,
            })
        }
    }
}
