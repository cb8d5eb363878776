use thiserror::Error;
use wdn_core::{LinkId, TankId, WdnError};

/// Broad class of a construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input or option combination the builder cannot honor
    Configuration,
    /// Derived numbers are inconsistent (empty intervals, invalid curves)
    Numeric,
    /// Symbolic model misuse (duplicates, missing variables)
    Model,
    /// Failure reported by an external solver backend
    Solver,
}

/// Model construction errors.
///
/// Every variant is fatal for the (sub)network being built; there is no
/// partially built model on error.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// A link record matches more than one device subtype
    #[error("{link} is ambiguous: matches {}", .matches.join(", "))]
    AmbiguousDevice {
        link: LinkId,
        matches: Vec<&'static str>,
    },

    /// Valve record with a missing or unknown type tag
    #[error("{link} has unsupported valve type '{tag}'")]
    UnsupportedValveType { link: LinkId, tag: String },

    /// Only right-cylinder tanks can be modeled
    #[error("{tank} has an unsupported geometry (only cylindrical tanks are modeled)")]
    UnsupportedTankGeometry { tank: TankId },

    /// Temporal constraints requested without a period duration
    #[error("time step is required to link periods {from} and {to}")]
    MissingTimeStep { from: usize, to: usize },

    /// Single-period input given to a multi-period build or vice versa
    #[error("expected {expected} input, found {found}")]
    ModeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Any other invalid input record
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A propagated interval is empty
    #[error("inconsistent bounds for {entity}: min {min} > max {max}")]
    InvalidBounds { entity: String, min: f64, max: f64 },

    /// Pump curve fit failed or is not physically meaningful
    #[error("pump curve of {link}: {reason}")]
    PumpCurve { link: LinkId, reason: String },

    /// A constraint category was registered twice for one component
    #[error("constraints {category} already registered for {component}")]
    DuplicateRegistration { category: String, component: String },

    /// A variable key was declared twice
    #[error("variable {0} already declared")]
    DuplicateVariable(String),

    /// A template referenced a variable that was never declared
    #[error("variable {0} has not been declared")]
    MissingVariable(String),

    /// Backend failure or unsupported problem class
    #[error("solver error: {0}")]
    Solver(String),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::AmbiguousDevice { .. }
            | BuildError::UnsupportedValveType { .. }
            | BuildError::UnsupportedTankGeometry { .. }
            | BuildError::MissingTimeStep { .. }
            | BuildError::ModeMismatch { .. }
            | BuildError::InvalidInput(_) => ErrorKind::Configuration,
            BuildError::InvalidBounds { .. } | BuildError::PumpCurve { .. } => ErrorKind::Numeric,
            BuildError::DuplicateRegistration { .. }
            | BuildError::DuplicateVariable(_)
            | BuildError::MissingVariable(_) => ErrorKind::Model,
            BuildError::Solver(_) => ErrorKind::Solver,
        }
    }
}

impl From<BuildError> for WdnError {
    fn from(err: BuildError) -> Self {
        match err.kind() {
            ErrorKind::Configuration => WdnError::Config(err.to_string()),
            _ => WdnError::Build(err.to_string()),
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
