//! Connection settings for the HTTP transport.

use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

use vaultwire_mapper::parse_duration;
use vaultwire_transport::TransportError;

/// Server address used when `VAULT_ADDR` is unset.
pub const DEFAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Request timeout used when `VAULT_CLIENT_TIMEOUT` is unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Server address, credentials and request limits.
#[derive(Clone)]
pub struct HttpConfig {
    /// Base address of the server, without the `/v1` prefix.
    pub addr: String,
    /// Access token sent as `X-Vault-Token`.
    pub token: Zeroizing<String>,
    /// Optional namespace sent as `X-Vault-Namespace`.
    pub namespace: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpConfig {
    /// Creates a configuration with the default timeout and no namespace.
    pub fn new(addr: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token: Zeroizing::new(token.into()),
            namespace: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// `VAULT_TOKEN` is required. `VAULT_CLIENT_TIMEOUT` accepts plain
    /// seconds (`"30"`) or a duration string (`"1m30s"`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TransportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let addr = present("VAULT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let token = present("VAULT_TOKEN").ok_or_else(|| {
            TransportError::Configuration("VAULT_TOKEN must be set".to_string())
        })?;

        let mut config = Self::new(addr, token);
        config.namespace = present("VAULT_NAMESPACE");
        if let Some(raw) = present("VAULT_CLIENT_TIMEOUT") {
            config.timeout = parse_timeout(&raw)?;
        }
        Ok(config)
    }
}

/// Parses a request timeout given as plain seconds (`"30"`) or as a
/// duration string (`"1m30s"`).
pub fn parse_timeout(raw: &str) -> Result<Duration, TransportError> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    parse_duration(raw).map_err(|e| {
        TransportError::Configuration(format!("invalid VAULT_CLIENT_TIMEOUT: {}", e))
    })
}

impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("addr", &self.addr)
            .field("token", &"[redacted]")
            .field("namespace", &self.namespace)
            .field("timeout", &self.timeout)
            .finish()
    }
}
