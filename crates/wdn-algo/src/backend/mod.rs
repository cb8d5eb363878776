//! Solver collaborator seam.
//!
//! A backend receives a finished [`SymbolicModel`] and returns a status plus
//! one value per variable. Nothing in model construction depends on which
//! backend is used.

#[cfg(feature = "solver-clarabel")]
mod clarabel;

#[cfg(feature = "solver-clarabel")]
pub use self::clarabel::ClarabelBackend;

use serde::{Deserialize, Serialize};

use crate::error::BuildResult;
use crate::formulation::ProblemClass;
use crate::model::SymbolicModel;

/// Outcome of a solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Stopped at the solver's own time limit
    TimeLimit,
    /// The solver failed without a certificate
    Error,
}

impl SolutionStatus {
    /// Only an optimal solve carries usable values.
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::TimeLimit => write!(f, "time_limit"),
            SolutionStatus::Error => write!(f, "error"),
        }
    }
}

/// Options passed to a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Treat binary variables as continuous on `[0, 1]`
    pub relax_integrality: bool,
}

/// Result of one backend call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    pub status: SolutionStatus,
    pub objective: f64,
    /// One value per variable, indexed by `VarId`
    pub values: Vec<f64>,
    pub solve_time_ms: u64,
}

/// An external optimizer that accepts symbolic models.
pub trait SolverBackend: Send + Sync {
    /// Short identifier, used in logs.
    fn id(&self) -> &'static str;

    /// Problem classes this backend can solve directly.
    fn supported_classes(&self) -> &'static [ProblemClass];

    fn solve(&self, model: &SymbolicModel, options: &SolveOptions) -> BuildResult<SolveOutcome>;

    /// Whether `model` can be handed to this backend under `options`.
    fn supports(&self, model: &SymbolicModel, options: &SolveOptions) -> bool {
        let class = match model.problem_class() {
            ProblemClass::MixedIntegerLinear if options.relax_integrality => {
                ProblemClass::LinearProgram
            }
            ProblemClass::MixedIntegerNonlinear if options.relax_integrality => {
                ProblemClass::NonlinearProgram
            }
            class => class,
        };
        self.supported_classes().contains(&class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_and_success() {
        assert_eq!(SolutionStatus::Optimal.to_string(), "optimal");
        assert_eq!(SolutionStatus::TimeLimit.to_string(), "time_limit");
        assert!(SolutionStatus::Optimal.is_success());
        assert!(!SolutionStatus::Infeasible.is_success());
        assert_eq!(
            serde_json::to_string(&SolutionStatus::TimeLimit).unwrap(),
            "\"time_limit\""
        );
    }
}
