//! # Vaultwire KV Engine
//!
//! Client for the versioned key/value (KV v2) secrets engine.
//!
//! ## Features
//!
//! - Engine configuration (max versions, CAS, delete-after grace period)
//! - Typed or raw secret payloads with version metadata
//! - Reads of the latest or a specific version
//! - Soft delete, undelete and permanent destroy per version
//! - Path metadata read, update and full destroy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vaultwire_mapper::{decode, decode_value, encode, to_strings, Mapping, Value, WireField};
use vaultwire_transport::{mount, Absent, Envelope, NotFound, Transport};
use vaultwire_transport_http::HttpTransport;

pub use error::KvError;
pub use types::{KvConfig, KvHistoryMetadata, KvMetadata, KvRecord};
pub use vaultwire_transport::SecretStatus;

/// Mount used when none is given.
pub const DEFAULT_MOUNT: &str = "secret";

/// Client for a KV v2 secrets engine mount.
#[derive(Clone)]
pub struct KvEngine {
    transport: Arc<dyn Transport>,
    mount: String,
}

impl KvEngine {
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
    pub fn from_env() -> Result<Self, KvError> {
        Self::from_env_with_mount(DEFAULT_MOUNT)
    }

    /// Like [`from_env`](Self::from_env) with a custom mount.
    pub fn from_env_with_mount(mount: impl Into<String>) -> Result<Self, KvError> {
        let transport = HttpTransport::from_env()?;
        Ok(Self::new(Arc::new(transport), mount))
    }

    /// Returns the mount path.
    pub fn path(&self) -> &str {
        &self.mount
    }

    fn api_path(&self, section: &str, path: &str) -> String {
        format!("{}/{}/{}", self.mount, section, path)
    }

    // ========================================================================
    // Mount and configuration
    // ========================================================================

    /// Mounts a KV v2 engine at this client's mount path.
    pub async fn enable(&self) -> Result<(), KvError> {
        self.transport
            .write(&mount::mount_path(&self.mount), mount::mount_body("kv-v2"))
            .await?;

        info!(mount = %self.mount, "KV engine enabled");
        Ok(())
    }

    /// Reads the mount tuning; `None` when the server has no record of the mount.
    pub async fn status(&self) -> Result<Option<SecretStatus>, KvError> {
        let path = mount::tune_path(&self.mount);
        debug!(path = %path, "Reading mount status");

        match self.transport.read(&path).await? {
            Some(envelope) => Ok(Some(decode(&envelope.data)?)),
            None => Ok(None),
        }
    }

    /// Writes the engine-wide versioning settings.
    pub async fn write_config(&self, config: &KvConfig) -> Result<(), KvError> {
        let path = format!("{}/config", self.mount);
        debug!(path = %path, "Writing engine config");

        self.transport.write(&path, encode(config)).await?;
        Ok(())
    }

    /// Reads the engine-wide versioning settings.
    pub async fn read_config(&self) -> Result<KvConfig, KvError> {
        let path = format!("{}/config", self.mount);
        debug!(path = %path, "Reading engine config");

        let envelope = self
            .transport
            .read(&path)
            .await?
            .ok_or_else(|| KvError::ConfigNotFound(self.mount.clone()))?;
        Ok(decode(&envelope.data)?)
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Writes `data` as a new version at `path` and returns its metadata.
    ///
    /// `data` is a typed record or a raw [`Mapping`].
    pub async fn write<T: WireField>(&self, path: &str, data: &T) -> Result<KvMetadata, KvError> {
        let full = self.api_path("data", path);
        debug!(path = %full, "Writing secret");

        let mut body = Mapping::new();
        body.insert(
            "data".to_string(),
            data.to_wire().unwrap_or_else(|| Value::Object(Mapping::new())),
        );

        let envelope = self
            .transport
            .write(&full, body)
            .await?
            .ok_or_else(|| KvError::EmptyResponse(full.clone()))?;
        let metadata: KvMetadata = decode(&envelope.data)?;

        info!(path = %full, version = metadata.version, "Secret version written");
        Ok(metadata)
    }

    /// Writes a raw mapping; see [`write`](Self::write).
    pub async fn write_data(&self, path: &str, data: Mapping) -> Result<KvMetadata, KvError> {
        self.write(path, &data).await
    }

    /// Reads the latest version at `path`.
    pub async fn read<T: WireField + Default>(&self, path: &str) -> Result<KvRecord<T>, KvError> {
        let full = self.api_path("data", path);
        debug!(path = %full, "Reading secret");

        let envelope = self.transport.read(&full).await?.or_not_found(path, &full)?;
        unpack(path, &full, &envelope)
    }

    /// Reads the latest version at `path` as a raw mapping.
    pub async fn read_data(&self, path: &str) -> Result<KvRecord<Mapping>, KvError> {
        self.read(path).await
    }

    /// Reads a specific version at `path`.
    pub async fn read_version<T: WireField + Default>(
        &self,
        path: &str,
        version: u64,
    ) -> Result<KvRecord<T>, KvError> {
        let full = self.api_path("data", path);
        let version = version.to_string();
        debug!(path = %full, version = %version, "Reading secret version");

        let envelope = self
            .transport
            .read_with_query(&full, &[("version", version.as_str())])
            .await?
            .or_not_found(&format!("{}@{}", path, version), &full)?;
        unpack(path, &full, &envelope)
    }

    /// Reads a specific version at `path` as a raw mapping.
    pub async fn read_version_data(
        &self,
        path: &str,
        version: u64,
    ) -> Result<KvRecord<Mapping>, KvError> {
        self.read_version(path, version).await
    }

    // ========================================================================
    // Version lifecycle
    // ========================================================================

    /// Soft-deletes the latest version at `path`.
    pub async fn delete(&self, path: &str) -> Result<(), KvError> {
        let full = self.api_path("data", path);
        self.transport.delete(&full).await?;

        info!(path = %full, "Latest secret version deleted");
        Ok(())
    }

    /// Soft-deletes the given versions at `path`.
    pub async fn delete_versions(&self, path: &str, versions: &[u64]) -> Result<(), KvError> {
        self.write_versions("delete", path, versions).await?;
        info!(path = path, versions = ?versions, "Secret versions deleted");
        Ok(())
    }

    /// Restores soft-deleted versions at `path`.
    pub async fn undelete_versions(&self, path: &str, versions: &[u64]) -> Result<(), KvError> {
        self.write_versions("undelete", path, versions).await?;
        info!(path = path, versions = ?versions, "Secret versions restored");
        Ok(())
    }

    /// Permanently destroys the data of the given versions at `path`.
    pub async fn destroy_versions(&self, path: &str, versions: &[u64]) -> Result<(), KvError> {
        self.write_versions("destroy", path, versions).await?;
        info!(path = path, versions = ?versions, "Secret versions destroyed");
        Ok(())
    }

    async fn write_versions(
        &self,
        section: &str,
        path: &str,
        versions: &[u64],
    ) -> Result<(), KvError> {
        let full = self.api_path(section, path);
        debug!(path = %full, "Writing version list");

        let mut body = Mapping::new();
        body.insert("versions".to_string(), Value::from(versions.to_vec()));
        self.transport.write(&full, body).await?;
        Ok(())
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Lists the keys under `path`; folders end with `/`.
    ///
    /// Empty when nothing is stored there or the listing fails.
    pub async fn list(&self, path: &str) -> Vec<String> {
        let full = self.api_path("metadata", path);
        debug!(path = %full, "Listing secrets");

        match self.transport.list(&full).await {
            Ok(result) => to_strings(&result.keys_or_empty()),
            Err(e) => {
                warn!(path = %full, error = %e, "List failed, returning empty result");
                Vec::new()
            },
        }
    }

    /// Reads the metadata of every version stored at `path`.
    pub async fn read_metadata(&self, path: &str) -> Result<KvHistoryMetadata, KvError> {
        let full = self.api_path("metadata", path);
        debug!(path = %full, "Reading secret metadata");

        let envelope = self.transport.read(&full).await?.or_not_found(path, &full)?;
        Ok(decode(&envelope.data)?)
    }

    /// Updates the per-path versioning settings.
    pub async fn update_metadata(&self, path: &str, config: &KvConfig) -> Result<(), KvError> {
        let full = self.api_path("metadata", path);
        debug!(path = %full, "Updating secret metadata");

        self.transport.write(&full, encode(config)).await?;
        Ok(())
    }

    /// Permanently removes every version and the metadata at `path`.
    pub async fn destroy_all(&self, path: &str) -> Result<(), KvError> {
        let full = self.api_path("metadata", path);
        self.transport.delete(&full).await?;

        info!(path = %full, "Secret destroyed");
        Ok(())
    }
}

/// Splits a data response into payload and metadata.
///
/// Either part may be absent. A version reported as deleted or destroyed
/// counts as not found.
fn unpack<T: WireField + Default>(
    path: &str,
    full: &str,
    envelope: &Envelope,
) -> Result<KvRecord<T>, KvError> {
    let metadata: Option<KvMetadata> = match envelope.part("metadata") {
        None | Some(Value::Null) => None,
        Some(value) => Some(decode_value(value)?),
    };

    let data = match envelope.part("data") {
        None | Some(Value::Null) => {
            if metadata
                .as_ref()
                .is_some_and(|m| m.destroyed || m.deletion_time.is_some())
            {
                return Err(NotFound {
                    identifier: path.to_string(),
                    path: full.to_string(),
                }
                .into());
            }
            T::default()
        },
        Some(value) => T::from_wire(value)?,
    };

    Ok(KvRecord { data, metadata })
}

impl fmt::Debug for KvEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvEngine")
            .field("mount", &self.mount)
            .finish_non_exhaustive()
    }
}
