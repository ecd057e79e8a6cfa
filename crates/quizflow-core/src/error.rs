//! Service error types.

use thiserror::Error;

/// Errors that can occur when talking to a quiz backend.
///
/// Application-level outcomes (topic exhausted, no suitable question) are not
/// errors; they are encoded in the response types in [`crate::traits`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend returned a non-success transport status.
    #[error("service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded into the expected shape.
    /// A malformed body is never interpreted as success.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
