//! Transport error types.

use thiserror::Error;

/// Errors surfaced by the request mechanism.
///
/// Engine clients propagate these unchanged and never retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("request to {path} failed: {message}")]
    Request {
        /// Remote path of the request.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("server returned {status} for {path}: {}", .errors.join("; "))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Remote path of the request.
        path: String,
        /// Error strings reported by the server.
        errors: Vec<String>,
    },

    /// The response body is not a valid envelope.
    #[error("invalid response from {path}: {message}")]
    InvalidResponse {
        /// Remote path of the request.
        path: String,
        /// Parser message.
        message: String,
    },

    /// The transport is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// A single entity was expected but the server holds no record of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{identifier} is not found at {path}")]
pub struct NotFound {
    /// Requested identifier (connection, role, lease id, secret path...).
    pub identifier: String,
    /// Remote path that returned no result.
    pub path: String,
}
