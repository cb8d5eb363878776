//! Build configuration.
//!
//! Stored as TOML; unspecified values fall back to their defaults, so a
//! partial file such as
//!
//! ```toml
//! formulation = "oa"
//! oa_cut_points = 8
//! ```
//!
//! is a complete configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wdn_core::{WdnError, WdnResult};

use crate::formulation::Formulation;

/// Minimum flow through an open device. Kept at its historical value; it is
/// a solver tolerance, not a physical constant.
pub const DEFAULT_FLOW_EPSILON: f64 = 6.31465679e-6;

/// Lower head relaxation at nodes with nothing attached (m).
pub const DEFAULT_PASS_THROUGH_MARGIN: f64 = 100.0;

/// Options controlling model construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub formulation: Formulation,

    /// Strictly positive flow threshold of open check valves, pumps,
    /// regulators and shutoff valves.
    pub flow_epsilon: f64,

    /// Amount subtracted from the lower head bound of pass-through nodes.
    pub pass_through_margin: f64,

    /// Tangent points per link in the outer approximation.
    pub oa_cut_points: usize,

    /// When set, overrides the `dispatchable` flag of every tank before
    /// bounds are computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tanks_dispatchable: Option<bool>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            formulation: Formulation::default(),
            flow_epsilon: DEFAULT_FLOW_EPSILON,
            pass_through_margin: DEFAULT_PASS_THROUGH_MARGIN,
            oa_cut_points: 5,
            tanks_dispatchable: None,
        }
    }
}

impl BuildConfig {
    pub fn new(formulation: Formulation) -> Self {
        Self {
            formulation,
            ..Self::default()
        }
    }

    pub fn with_tanks_dispatchable(mut self, dispatchable: bool) -> Self {
        self.tanks_dispatchable = Some(dispatchable);
        self
    }

    pub fn from_toml_str(contents: &str) -> WdnResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| WdnError::Parse(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> WdnResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> WdnResult<String> {
        toml::to_string_pretty(self).map_err(|e| WdnError::Serialize(format!("config: {}", e)))
    }

    pub fn validate(&self) -> WdnResult<()> {
        if !(self.flow_epsilon.is_finite() && self.flow_epsilon > 0.0) {
            return Err(WdnError::Config(format!(
                "flow_epsilon must be positive, got {}",
                self.flow_epsilon
            )));
        }
        if !(self.pass_through_margin.is_finite() && self.pass_through_margin >= 0.0) {
            return Err(WdnError::Config(format!(
                "pass_through_margin must be non-negative, got {}",
                self.pass_through_margin
            )));
        }
        if self.oa_cut_points == 0 {
            return Err(WdnError::Config(
                "oa_cut_points must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
