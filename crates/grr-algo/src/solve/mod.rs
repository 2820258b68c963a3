//! Solver backends and dispatch.
//!
//! | backend | classes | method |
//! |---------|---------|--------|
//! | [`MilpBackend`] | LP, MILP | `good_lp` + `microlp` branch and bound |
//! | [`NlpBackend`] | LP, NLP | augmented Lagrangian + `argmin` L-BFGS |
//! | [`EnumerationBackend`] | all | discrete enumeration, continuous leaves |

mod enumeration;
mod milp;
mod nlp;
mod registry;

pub use enumeration::EnumerationBackend;
pub use milp::MilpBackend;
pub use nlp::NlpBackend;
pub use registry::SolverKind;

use grr_core::config::SolverSettings;
use grr_core::model::{Model, ModelSolution, SolveStatus};
use grr_core::GrrResult;
use tracing::{info, warn};

/// Validate `model`, pick the configured backend and solve.
pub fn solve_model(model: &Model, settings: &SolverSettings) -> GrrResult<ModelSolution> {
    model.validate()?;
    let class = model.problem_class();
    let kind = SolverKind::resolve(&settings.backend, class)?;
    info!(
        model = model.name(),
        %class,
        backend = kind.as_str(),
        vars = model.num_vars(),
        constraints = model.num_constraints(),
        "solving model"
    );

    let solution = kind.build_backend().solve(model, settings).map_err(|err| {
        if err.is_model_outcome() {
            info!(model = model.name(), outcome = %err, "model has no solution");
        } else {
            warn!(model = model.name(), error = %err, "solver did not terminate conclusively");
        }
        err
    })?;
    if solution.status == SolveStatus::LocallyOptimal {
        warn!(
            model = model.name(),
            backend = %solution.backend,
            "solution is only locally optimal"
        );
    }
    Ok(solution)
}
