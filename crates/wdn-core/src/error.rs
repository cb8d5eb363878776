//! Unified error types for the WDN workspace
//!
//! [`WdnError`] is the boundary error: domain-specific errors (such as the
//! model-construction errors in `wdn-algo`) convert into it so callers can
//! handle failures uniformly.
//!
//! # Example
//!
//! ```
//! use wdn_core::{NetworkData, WdnResult};
//!
//! fn count_nodes(json: &str) -> WdnResult<usize> {
//!     let network = NetworkData::from_json_str(json)?;
//!     Ok(network.node.len())
//! }
//!
//! assert_eq!(count_nodes(r#"{"node": {"1": {"elevation": 3.0}}}"#).unwrap(), 1);
//! assert!(count_nodes("not json").is_err());
//! ```

use thiserror::Error;

/// Failures surfaced at the crate boundary.
#[derive(Error, Debug)]
pub enum WdnError {
    /// Reading or writing config and model files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input or TOML config
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed input that breaks the input contract
    #[error("Validation error: {0}")]
    Validation(String),

    /// Out-of-range build settings or configuration-class build failures
    #[error("Configuration error: {0}")]
    Config(String),

    /// Numeric, model or solver failures during model construction
    #[error("Build error: {0}")]
    Build(String),

    /// Writing a value out as TOML
    #[error("Serialization error: {0}")]
    Serialize(String),
}

pub type WdnResult<T> = Result<T, WdnError>;

impl From<serde_json::Error> for WdnError {
    fn from(err: serde_json::Error) -> Self {
        WdnError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelInput;

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = ModelInput::from_json_str(r#"{"node": "#).unwrap_err();
        assert!(matches!(err, WdnError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn read(path: &str) -> WdnResult<String> {
            Ok(std::fs::read_to_string(path)?)
        }
        assert!(matches!(read("/nonexistent/wdn.json"), Err(WdnError::Io(_))));
    }
}
