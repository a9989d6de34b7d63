#![forbid(unsafe_code)]

//! Error types.
//!
//! Engine operations are infallible by contract: a missing content container
//! or a redundant close is a silent no-op, not an error. Only configuration
//! loading can fail, and callers fall back to defaults when it does.

use thiserror::Error;

/// Failure while loading or validating a [`ViewConfig`](crate::config::ViewConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) const fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
