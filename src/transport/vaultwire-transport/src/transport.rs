//! The request interface engines are written against.

use async_trait::async_trait;
use serde_json::Value;

use vaultwire_mapper::Mapping;

use crate::{Envelope, NotFound, TransportError};

/// Remote request mechanism.
///
/// Every call is a single exchange. `Ok(None)` means the server holds no
/// result for the path; its meaning (error, empty list, nothing to report)
/// is decided by the calling engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reads the value stored at `path`.
    async fn read(&self, path: &str) -> Result<Option<Envelope>, TransportError>;

    /// Reads `path` with additional query parameters.
    async fn read_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Envelope>, TransportError>;

    /// Writes `data` to `path`.
    async fn write(&self, path: &str, data: Mapping) -> Result<Option<Envelope>, TransportError>;

    /// Lists the keys under `path`.
    async fn list(&self, path: &str) -> Result<Option<Envelope>, TransportError>;

    /// Deletes the value at `path`.
    async fn delete(&self, path: &str) -> Result<Option<Envelope>, TransportError>;
}

/// Absent-result policy helpers for transport responses.
pub trait Absent {
    /// Turns an absent result into [`NotFound`].
    fn or_not_found(self, identifier: &str, path: &str) -> Result<Envelope, NotFound>;

    /// List entries, empty when the result is absent.
    fn keys_or_empty(self) -> Vec<Value>;
}

impl Absent for Option<Envelope> {
    fn or_not_found(self, identifier: &str, path: &str) -> Result<Envelope, NotFound> {
        self.ok_or_else(|| NotFound {
            identifier: identifier.to_string(),
            path: path.to_string(),
        })
    }

    fn keys_or_empty(self) -> Vec<Value> {
        self.map(|envelope| envelope.keys()).unwrap_or_default()
    }
}
