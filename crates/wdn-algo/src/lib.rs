//! # wdn-algo: Model Construction for Water Network Optimization
//!
//! Turns a normalized water network ([`wdn_core::NetworkData`]) and a requested
//! [`Formulation`] into a solver-ready [`SymbolicModel`]: declared variables
//! with bounds, constraints grouped by category, and an optional linear
//! objective.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Classification & resistance | [`reference`], [`resistance`] | [`NetworkRef`] |
//! | Pump curve fitting | [`pump_curve`] | [`PumpCurve`] per pump |
//! | Bound propagation | [`bounds`] | immutable [`Bounds`] tables |
//! | Constraint templates | [`templates`] | groups in the [`SymbolicModel`] registry |
//! | Temporal linking | [`multiperiod`] | [`TimeExpandedModel`] |
//! | Solver hand-off | [`backend`] | [`SolveOutcome`] |
//!
//! Every stage reads only finalized output of the previous ones. Bounds are
//! computed once and are the only source of big-M constants.
//!
//! ## Formulations
//!
//! | Variant | Directed | Indicators | Head loss | Problem class |
//! |---------|----------|------------|-----------|---------------|
//! | [`Formulation::MixedInteger`] | no | binary | `dh = L·r·q·|q|^(α-1)` | MINLP |
//! | [`Formulation::ContinuousRelaxation`] | yes | `[0, 1]` | convex bound + secant | NLP |
//! | [`Formulation::OuterApproximation`] | yes | binary | tangent cuts + secant | MILP |
//!
//! ## Example
//!
//! ```ignore
//! use wdn_algo::{BuildConfig, Formulation, ModelContext};
//! use wdn_core::ModelInput;
//!
//! let input = ModelInput::from_json_str(&std::fs::read_to_string("net.json")?)?;
//! let config = BuildConfig::new(Formulation::OuterApproximation);
//! let ctx = ModelContext::build(&input, &config)?;
//! println!("{} constraints", ctx.model.num_constraints());
//! ```

pub mod backend;
pub mod bounds;
pub mod config;
pub mod context;
pub mod error;
pub mod formulation;
pub mod model;
pub mod multiperiod;
pub mod pump_curve;
pub mod reference;
pub mod resistance;
pub mod templates;

#[cfg(feature = "solver-clarabel")]
pub use backend::ClarabelBackend;
pub use backend::{SolutionStatus, SolveOptions, SolveOutcome, SolverBackend};
pub use bounds::{Bounds, Interval};
pub use config::{BuildConfig, DEFAULT_FLOW_EPSILON, DEFAULT_PASS_THROUGH_MARGIN};
pub use context::{ModelContext, PeriodRole};
pub use error::{BuildError, BuildResult, ErrorKind};
pub use formulation::{Formulation, ProblemClass};
pub use model::{
    ComponentKey, Constraint, ConstraintCategory, Expr, Sense, SymbolicModel, VarId, VarKey,
    VarKind, Violation,
};
pub use multiperiod::{LinkConstraint, TimeExpandedModel};
pub use pump_curve::PumpCurve;
pub use reference::{Device, LinkRef, NetworkRef};
