use std::str::FromStr;
use std::sync::Arc;

use grr_core::model::ProblemClass;
use grr_core::{GrrError, SolverBackend};

use super::{EnumerationBackend, MilpBackend, NlpBackend};

/// Registry of available backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Milp,
    Nlp,
    Enumeration,
}

impl SolverKind {
    pub fn build_backend(self) -> Arc<dyn SolverBackend> {
        match self {
            SolverKind::Milp => Arc::new(MilpBackend::new()),
            SolverKind::Nlp => Arc::new(NlpBackend::new()),
            SolverKind::Enumeration => Arc::new(EnumerationBackend::new()),
        }
    }

    /// Default backend for a problem class.
    pub fn for_class(class: ProblemClass) -> Self {
        match class {
            ProblemClass::LinearProgram | ProblemClass::MixedIntegerLinear => SolverKind::Milp,
            ProblemClass::NonlinearProgram => SolverKind::Nlp,
            ProblemClass::MixedIntegerNonlinear => SolverKind::Enumeration,
        }
    }

    /// Resolve a configured backend name; `"auto"` defers to the problem class.
    pub fn resolve(name: &str, class: ProblemClass) -> Result<Self, GrrError> {
        if name.eq_ignore_ascii_case("auto") {
            Ok(Self::for_class(class))
        } else {
            name.parse()
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["milp", "nlp", "enumeration"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Milp => "milp",
            SolverKind::Nlp => "nlp",
            SolverKind::Enumeration => "enumeration",
        }
    }
}

impl FromStr for SolverKind {
    type Err = GrrError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "milp" | "lp" | "microlp" => Ok(SolverKind::Milp),
            "nlp" | "lbfgs" => Ok(SolverKind::Nlp),
            "enumeration" | "minlp" => Ok(SolverKind::Enumeration),
            other => Err(GrrError::Config(format!(
                "unknown solver '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_kind_parsing_supports_all_backends() {
        for name in SolverKind::available() {
            let kind: SolverKind = name.parse().unwrap();
            assert_eq!(kind.as_str(), *name);
            assert_eq!(kind.build_backend().id(), *name);
        }
        assert_eq!("LBFGS".parse::<SolverKind>().unwrap(), SolverKind::Nlp);
        assert!(matches!("ipopt".parse::<SolverKind>(), Err(GrrError::Config(_))));
    }

    #[test]
    fn auto_selection_follows_problem_class() {
        let resolve = |class| SolverKind::resolve("auto", class).unwrap();
        assert_eq!(resolve(ProblemClass::LinearProgram), SolverKind::Milp);
        assert_eq!(resolve(ProblemClass::MixedIntegerLinear), SolverKind::Milp);
        assert_eq!(resolve(ProblemClass::NonlinearProgram), SolverKind::Nlp);
        assert_eq!(
            resolve(ProblemClass::MixedIntegerNonlinear),
            SolverKind::Enumeration
        );
        assert_eq!(
            SolverKind::resolve("nlp", ProblemClass::MixedIntegerLinear).unwrap(),
            SolverKind::Nlp
        );
    }
}
