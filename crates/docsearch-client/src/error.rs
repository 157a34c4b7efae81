//! Error types for the client.

use std::fmt;
use std::time::Duration;

use docsearch_core::{CoreError, ErrorPayload, FilterError, TaskUid};
use thiserror::Error;

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A record received from the service is malformed.
    #[error("validation error: {0}")]
    Validation(#[from] CoreError),

    /// The service answered with a non-success status.
    #[error("API error: {0}")]
    Api(ApiError),

    /// A task did not reach a terminal status in time.
    #[error("timed out after {timeout:?} waiting for task {uid}")]
    Timeout { uid: TaskUid, timeout: Duration },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A filter description could not be compiled.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Returns true for an API error with HTTP status 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_not_found())
    }

    /// Returns true for a polling timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// A non-success response from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Parsed error body.
    pub payload: ErrorPayload,
}

impl ApiError {
    pub fn new(status: u16, payload: ErrorPayload) -> Self {
        Self { status, payload }
    }

    /// Only an explicit 404 counts as not-found.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn code(&self) -> &str {
        &self.payload.code
    }

    pub fn message(&self) -> &str {
        &self.payload.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if !self.payload.code.is_empty() {
            write!(f, " {}", self.payload.code)?;
        }
        if !self.payload.message.is_empty() {
            write!(f, ": {}", self.payload.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}
