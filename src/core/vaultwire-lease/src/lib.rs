//! # Vaultwire Lease Client
//!
//! Lookup, renewal and revocation of the leases attached to dynamic secrets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use vaultwire_mapper::{decode, record, to_strings_with_path_prefix, Mapping, Value};
use vaultwire_transport::{Absent, Transport, TransportError};
use vaultwire_transport_http::HttpTransport;

pub use error::LeaseError;

const LOOKUP_PATH: &str = "sys/leases/lookup";
const RENEW_PATH: &str = "sys/leases/renew";
const REVOKE_PATH: &str = "sys/leases/revoke";
const TIDY_PATH: &str = "sys/leases/tidy";

/// Error string the server reports for unknown or revoked leases.
const INVALID_LEASE: &str = "invalid lease";

record! {
    /// Snapshot of a lease as tracked by the server.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct LeaseDetail {
        /// Fully qualified lease id.
        pub lease_id: String => "id",
        /// Time the lease was issued.
        pub issue_time: DateTime<Utc> => "issue_time",
        /// Time the lease expires.
        pub expire_time: DateTime<Utc> => "expire_time",
        /// Time of the latest renewal, if any.
        pub last_renewal_time: Option<DateTime<Utc>> => "last_renewal_time",
        /// Whether the lease can be renewed.
        pub renewable: bool => "renewable",
        /// Remaining time-to-live in seconds.
        pub ttl: i64 => "ttl",
    }
}

/// Client for the system lease endpoints.
#[derive(Clone)]
pub struct LeaseEngine {
    transport: Arc<dyn Transport>,
}

impl LeaseEngine {
    /// Creates a lease client.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Creates a client over an HTTP transport configured from the environment.
    pub fn from_env() -> Result<Self, LeaseError> {
        let transport = HttpTransport::from_env()?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Looks up the lease `lease_id`.
    ///
    /// Unknown and revoked leases are reported by the server as an
    /// `invalid lease` rejection; both surface as [`LeaseError::NotFound`].
    pub async fn lookup(&self, lease_id: &str) -> Result<LeaseDetail, LeaseError> {
        debug!(lease_id = lease_id, "Looking up lease");

        let result = match self.transport.write(LOOKUP_PATH, lease_body(lease_id)).await {
            Err(e) if is_invalid_lease(&e) => None,
            other => other?,
        };
        let envelope = result.or_not_found(lease_id, LOOKUP_PATH)?;
        Ok(decode(&envelope.data)?)
    }

    /// Lists the leases under `prefix` as fully qualified lease ids.
    ///
    /// Empty when nothing matches or the listing fails.
    pub async fn list(&self, prefix: &str) -> Vec<String> {
        let path = format!("{}/{}", LOOKUP_PATH, prefix);
        debug!(path = %path, "Listing leases");

        match self.transport.list(&path).await {
            Ok(result) => to_strings_with_path_prefix(&result.keys_or_empty(), prefix),
            Err(e) => {
                warn!(path = %path, error = %e, "List failed, returning empty result");
                Vec::new()
            },
        }
    }

    /// Extends the lease by `increment` seconds.
    pub async fn renew(&self, lease_id: &str, increment: i64) -> Result<(), LeaseError> {
        let mut body = lease_body(lease_id);
        body.insert("increment".to_string(), Value::from(increment));

        self.transport.write(RENEW_PATH, body).await?;

        info!(lease_id = lease_id, increment = increment, "Lease renewed");
        Ok(())
    }

    /// Revokes the lease immediately.
    pub async fn revoke(&self, lease_id: &str) -> Result<(), LeaseError> {
        self.transport.write(REVOKE_PATH, lease_body(lease_id)).await?;

        info!(lease_id = lease_id, "Lease revoked");
        Ok(())
    }

    /// Revokes every lease under `prefix`.
    pub async fn revoke_prefix(&self, prefix: &str) -> Result<(), LeaseError> {
        self.transport
            .write(&format!("sys/leases/revoke-prefix/{}", prefix), Mapping::new())
            .await?;

        info!(prefix = prefix, "Leases revoked by prefix");
        Ok(())
    }

    /// Cleans up invalid lease entries on the server.
    pub async fn tidy(&self) -> Result<(), LeaseError> {
        self.transport.write(TIDY_PATH, Mapping::new()).await?;

        info!("Lease tidy started");
        Ok(())
    }
}

/// Whether the server rejected a request because the lease does not exist.
fn is_invalid_lease(error: &TransportError) -> bool {
    match error {
        TransportError::Status { status, errors, .. } => {
            *status == 400 && errors.iter().any(|e| e.contains(INVALID_LEASE))
        },
        _ => false,
    }
}

fn lease_body(lease_id: &str) -> Mapping {
    let mut body = Mapping::new();
    body.insert("lease_id".to_string(), Value::from(lease_id));
    body
}

impl fmt::Debug for LeaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseEngine").finish_non_exhaustive()
    }
}
