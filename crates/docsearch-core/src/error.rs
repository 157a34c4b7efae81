//! Core domain errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating records received from the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A required field is absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Structured error body returned by the service.
///
/// Appears both as the `error` of a failed task and as the body of a
/// non-success HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human readable description.
    #[serde(default)]
    pub message: String,

    /// Stable machine readable error code, e.g. `index_not_found`.
    #[serde(default)]
    pub code: String,

    /// Error category, e.g. `invalid_request`.
    #[serde(rename = "type", default)]
    pub error_type: String,

    /// Link to the service documentation for this error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ErrorPayload {
    /// Payload carrying only a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}
