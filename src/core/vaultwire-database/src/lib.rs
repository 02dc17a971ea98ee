//! # Vaultwire Database Engine
//!
//! Client for the database secrets engine: connection and role management
//! plus dynamic credential generation.
//!
//! ## Features
//!
//! - Mount enable and tuning status
//! - Connection create/read/reset/delete/list
//! - Role create/read/delete/list
//! - Credential generation with lease information
//! - Lease listing per role

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vaultwire_mapper::{decode, encode, to_strings, to_strings_with_path_prefix, Mapping, Value};
use vaultwire_transport::{mount, Absent, Transport};
use vaultwire_transport_http::HttpTransport;

pub use error::DatabaseError;
pub use types::{Credential, DatabaseConnectionConfig, DatabaseRole, DatabaseType, SecretStatus};

use types::{ConnectionReadout, UsernamePassword};

/// Mount used when none is given.
pub const DEFAULT_MOUNT: &str = "database";

/// Client for a database secrets engine mount.
#[derive(Clone)]
pub struct DatabaseEngine {
    transport: Arc<dyn Transport>,
    mount: String,
}

impl DatabaseEngine {
    /// Creates a client for the engine mounted at `mount`.
    pub fn new(transport: Arc<dyn Transport>, mount: impl Into<String>) -> Self {
        Self {
            transport,
            mount: mount.into(),
        }
    }

    /// Creates a client for the engine mounted at [`DEFAULT_MOUNT`].
    pub fn with_default_mount(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, DEFAULT_MOUNT)
    }

    /// Creates a client over an HTTP transport configured from the environment.
    pub fn from_env() -> Result<Self, DatabaseError> {
        Self::from_env_with_mount(DEFAULT_MOUNT)
    }

    /// Like [`from_env`](Self::from_env) with a custom mount.
    pub fn from_env_with_mount(mount: impl Into<String>) -> Result<Self, DatabaseError> {
        let transport = HttpTransport::from_env()?;
        Ok(Self::new(Arc::new(transport), mount))
    }

    /// Returns the mount path.
    pub fn path(&self) -> &str {
        &self.mount
    }

    fn config_path(&self, name: &str) -> String {
        format!("{}/config/{}", self.mount, name)
    }

    fn role_path(&self, name: &str) -> String {
        format!("{}/roles/{}", self.mount, name)
    }

    // ========================================================================
    // Mount
    // ========================================================================

    /// Mounts the database engine at this client's mount path.
    pub async fn enable(&self) -> Result<(), DatabaseError> {
        self.transport
            .write(&mount::mount_path(&self.mount), mount::mount_body("database"))
            .await?;

        info!(mount = %self.mount, "Database engine enabled");
        Ok(())
    }

    /// Reads the mount tuning; `None` when the server has no record of the mount.
    pub async fn status(&self) -> Result<Option<SecretStatus>, DatabaseError> {
        let path = mount::tune_path(&self.mount);
        debug!(path = %path, "Reading mount status");

        match self.transport.read(&path).await? {
            Some(envelope) => Ok(Some(decode(&envelope.data)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Creates or replaces the connection `name`.
    pub async fn create_connection(
        &self,
        name: &str,
        config: &DatabaseConnectionConfig,
    ) -> Result<(), DatabaseError> {
        let path = self.config_path(name);
        debug!(path = %path, "Writing connection");

        self.transport.write(&path, encode(config)).await?;

        info!(mount = %self.mount, name = name, "Connection configured");
        Ok(())
    }

    /// Reads the connection `name`.
    ///
    /// The server nests the URL and username under `connection_details`; they
    /// are flattened into the returned config. The password is never returned.
    pub async fn read_connection(
        &self,
        name: &str,
    ) -> Result<DatabaseConnectionConfig, DatabaseError> {
        let path = self.config_path(name);
        debug!(path = %path, "Reading connection");

        let envelope = self.transport.read(&path).await?.or_not_found(name, &path)?;
        let readout: ConnectionReadout = decode(&envelope.data)?;
        Ok(readout.into())
    }

    /// Closes and reopens the connection `name` on the server.
    pub async fn reset_connection(&self, name: &str) -> Result<(), DatabaseError> {
        let path = format!("{}/reset/{}", self.mount, name);
        debug!(path = %path, "Resetting connection");

        self.transport.write(&path, Mapping::new()).await?;
        Ok(())
    }

    /// Deletes the connection `name`.
    pub async fn delete_connection(&self, name: &str) -> Result<(), DatabaseError> {
        let path = self.config_path(name);
        self.transport.delete(&path).await?;

        info!(mount = %self.mount, name = name, "Connection deleted");
        Ok(())
    }

    /// Lists connection names; empty when none exist or the listing fails.
    pub async fn list_connections(&self) -> Vec<String> {
        to_strings(&self.list_keys(&format!("{}/config", self.mount)).await)
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Creates or replaces the role `name`.
    pub async fn create_role(&self, name: &str, role: &DatabaseRole) -> Result<(), DatabaseError> {
        let path = self.role_path(name);
        debug!(path = %path, "Writing role");

        self.transport.write(&path, encode(role)).await?;

        info!(mount = %self.mount, name = name, "Role configured");
        Ok(())
    }

    /// Reads the role `name`.
    pub async fn read_role(&self, name: &str) -> Result<DatabaseRole, DatabaseError> {
        let path = self.role_path(name);
        debug!(path = %path, "Reading role");

        let envelope = self.transport.read(&path).await?.or_not_found(name, &path)?;
        Ok(decode(&envelope.data)?)
    }

    /// Deletes the role `name`.
    pub async fn delete_role(&self, name: &str) -> Result<(), DatabaseError> {
        self.transport.delete(&self.role_path(name)).await?;

        info!(mount = %self.mount, name = name, "Role deleted");
        Ok(())
    }

    /// Lists role names; empty when none exist or the listing fails.
    pub async fn list_roles(&self) -> Vec<String> {
        to_strings(&self.list_keys(&format!("{}/roles", self.mount)).await)
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Generates a new set of credentials from the role `role_name`.
    pub async fn generate_credentials(&self, role_name: &str) -> Result<Credential, DatabaseError> {
        let path = format!("{}/creds/{}", self.mount, role_name);
        debug!(path = %path, "Generating credentials");

        let envelope = self
            .transport
            .read(&path)
            .await?
            .or_not_found(role_name, &path)?;
        let pair: UsernamePassword = decode(&envelope.data)?;

        info!(lease_id = %envelope.lease_id, "Credentials issued");
        Ok(Credential {
            lease_id: envelope.lease_id,
            lease_duration: envelope.lease_duration,
            renewable: envelope.renewable,
            username: pair.username,
            password: pair.password,
        })
    }

    /// Lists the leases issued by `role_name` as fully qualified lease ids.
    pub async fn list_leases(&self, role_name: &str) -> Vec<String> {
        let prefix = format!("{}/creds/{}/", self.mount, role_name);
        let keys = self
            .list_keys(&format!("sys/leases/lookup/{}", prefix))
            .await;
        to_strings_with_path_prefix(&keys, &prefix)
    }

    /// Lists keys under `path`, treating failures as an empty collection.
    async fn list_keys(&self, path: &str) -> Vec<Value> {
        debug!(path = path, "Listing");

        match self.transport.list(path).await {
            Ok(result) => result.keys_or_empty(),
            Err(e) => {
                warn!(path = path, error = %e, "List failed, returning empty result");
                Vec::new()
            },
        }
    }
}

impl fmt::Debug for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseEngine")
            .field("mount", &self.mount)
            .finish_non_exhaustive()
    }
}
