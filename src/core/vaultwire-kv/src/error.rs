//! KV engine error types.

use thiserror::Error;

use vaultwire_mapper::MapperError;
use vaultwire_transport::{NotFound, TransportError};

/// Errors that can occur in the KV engine client.
#[derive(Debug, Error)]
pub enum KvError {
    /// The request to the server failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No secret exists at the requested path or version.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The engine mount has no configuration.
    #[error("{0} secret config is not found")]
    ConfigNotFound(String),

    /// A write was acknowledged without version metadata.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// The response does not match the expected record shape.
    #[error("decode error: {0}")]
    Decode(#[from] MapperError),
}
