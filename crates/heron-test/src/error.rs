//! Test error types.

use thiserror::Error;

/// Errors from building a test request or reading its response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The URI or another request part is invalid.
    #[error("cannot build request: {0}")]
    RequestBuild(String),

    /// A header name or value is invalid.
    #[error("invalid header {0}")]
    InvalidHeader(String),

    /// The body is not what the caller asked for.
    #[error("cannot read body: {0}")]
    BodyRead(String),

    /// JSON encoding or decoding failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
