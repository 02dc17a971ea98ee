//! Database engine error types.

use thiserror::Error;

use vaultwire_mapper::MapperError;
use vaultwire_transport::{NotFound, TransportError};

/// Errors that can occur in the Database engine client.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The request to the server failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The connection, role or credential does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The response does not match the expected record shape.
    #[error("decode error: {0}")]
    Decode(#[from] MapperError),
}
