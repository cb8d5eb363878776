//! Formulation variants and problem classes.
//!
//! | Formulation | Directed | Binaries | Head loss | Problem class |
//! |-------------|----------|----------|-----------|---------------|
//! | [`Formulation::MixedInteger`] | no | integral | `dh = L·r·q|q|^(α-1)` | MINLP (nonconvex) |
//! | [`Formulation::ContinuousRelaxation`] | yes | relaxed to `[0, 1]` | `dh⁺ ≥ L·r·(q⁺)^α` | NLP (convex) |
//! | [`Formulation::OuterApproximation`] | yes | integral | tangent cuts of `L·r·(q⁺)^α` | MILP |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Selects how device logic and head loss are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    /// Full nonconvex mixed-integer encoding over undirected flows
    #[default]
    #[serde(alias = "mi", alias = "nc")]
    MixedInteger,
    /// Directed convex relaxation with integrality dropped
    #[serde(alias = "cr", alias = "crd")]
    ContinuousRelaxation,
    /// Directed mixed-integer linear outer approximation
    #[serde(alias = "oa", alias = "la")]
    OuterApproximation,
}

impl Formulation {
    /// Directed formulations split flows by direction and emit nodal
    /// directionality constraints.
    pub fn is_directed(&self) -> bool {
        !matches!(self, Formulation::MixedInteger)
    }

    /// Binary device states are kept integral.
    pub fn is_integral(&self) -> bool {
        !matches!(self, Formulation::ContinuousRelaxation)
    }

    /// Only linear constraint terms are emitted.
    pub fn is_linear(&self) -> bool {
        matches!(self, Formulation::OuterApproximation)
    }

    /// Nominal problem class of a model built with this formulation.
    pub fn problem_class(&self) -> ProblemClass {
        match self {
            Formulation::MixedInteger => ProblemClass::MixedIntegerNonlinear,
            Formulation::ContinuousRelaxation => ProblemClass::NonlinearProgram,
            Formulation::OuterApproximation => ProblemClass::MixedIntegerLinear,
        }
    }
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formulation::MixedInteger => write!(f, "mi"),
            Formulation::ContinuousRelaxation => write!(f, "cr"),
            Formulation::OuterApproximation => write!(f, "oa"),
        }
    }
}

impl std::str::FromStr for Formulation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mi" | "nc" | "mixed_integer" => Ok(Formulation::MixedInteger),
            "cr" | "crd" | "continuous_relaxation" => Ok(Formulation::ContinuousRelaxation),
            "oa" | "la" | "outer_approximation" => Ok(Formulation::OuterApproximation),
            _ => Err(format!("Unknown formulation: {}", s)),
        }
    }
}

/// Problem class for solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProblemClass {
    /// Linear program
    LinearProgram,
    /// Mixed-integer linear program
    MixedIntegerLinear,
    /// Continuous nonlinear program
    NonlinearProgram,
    /// Mixed-integer nonlinear program
    MixedIntegerNonlinear,
}

impl ProblemClass {
    pub fn from_parts(has_integers: bool, has_nonlinear: bool) -> Self {
        match (has_integers, has_nonlinear) {
            (false, false) => ProblemClass::LinearProgram,
            (true, false) => ProblemClass::MixedIntegerLinear,
            (false, true) => ProblemClass::NonlinearProgram,
            (true, true) => ProblemClass::MixedIntegerNonlinear,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            ProblemClass::LinearProgram | ProblemClass::MixedIntegerLinear
        )
    }

    pub fn has_integers(&self) -> bool {
        matches!(
            self,
            ProblemClass::MixedIntegerLinear | ProblemClass::MixedIntegerNonlinear
        )
    }
}

impl fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemClass::LinearProgram => write!(f, "LP"),
            ProblemClass::MixedIntegerLinear => write!(f, "MILP"),
            ProblemClass::NonlinearProgram => write!(f, "NLP"),
            ProblemClass::MixedIntegerNonlinear => write!(f, "MINLP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!("nc".parse::<Formulation>().unwrap(), Formulation::MixedInteger);
        assert_eq!("CRD".parse::<Formulation>().unwrap(), Formulation::ContinuousRelaxation);
        assert_eq!("la".parse::<Formulation>().unwrap(), Formulation::OuterApproximation);
        assert!("socp".parse::<Formulation>().is_err());
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for f in [
            Formulation::MixedInteger,
            Formulation::ContinuousRelaxation,
            Formulation::OuterApproximation,
        ] {
            assert_eq!(f.to_string().parse::<Formulation>().unwrap(), f);
        }
    }

    #[test]
    fn problem_classes_match_properties() {
        assert!(!Formulation::MixedInteger.is_directed());
        assert!(Formulation::OuterApproximation.problem_class().is_linear());
        assert!(!Formulation::ContinuousRelaxation.problem_class().has_integers());
        assert_eq!(
            ProblemClass::from_parts(true, true),
            ProblemClass::MixedIntegerNonlinear
        );
    }
}
