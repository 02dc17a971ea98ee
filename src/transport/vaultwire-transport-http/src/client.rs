//! HTTP client implementing the transport interface.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use vaultwire_mapper::Mapping;
use vaultwire_transport::{Envelope, Transport, TransportError};

use crate::HttpConfig;

/// Error body returned by the server on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Transport over the server HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
}

impl HttpTransport {
    /// Creates a transport for the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                TransportError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a transport configured from the process environment.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::new(HttpConfig::from_env()?)
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.addr.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if !self.config.token.is_empty() {
            builder = builder.header("X-Vault-Token", self.config.token.as_str());
        }
        if let Some(namespace) = &self.config.namespace {
            builder = builder.header("X-Vault-Namespace", namespace);
        }
        builder
    }

    async fn send(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Option<Envelope>, TransportError> {
        let response = builder.send().await.map_err(|e| TransportError::Request {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TransportError::Request {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        debug!(path = path, status = status.as_u16(), "Received response");

        if status == StatusCode::NO_CONTENT || (status.is_success() && body.trim().is_empty()) {
            return Ok(None);
        }

        if status == StatusCode::NOT_FOUND {
            // A 404 may still carry warnings (e.g. on lists); keep those.
            let envelope = serde_json::from_str::<Envelope>(&body).ok();
            return Ok(envelope.filter(Envelope::has_content));
        }

        if !status.is_success() {
            let errors = serde_json::from_str::<ErrorBody>(&body)
                .unwrap_or_default()
                .errors;
            warn!(path = path, status = status.as_u16(), "Request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                errors,
            });
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| TransportError::InvalidResponse {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn read(&self, path: &str) -> Result<Option<Envelope>, TransportError> {
        debug!(path = path, "Reading");
        self.send(path, self.request(Method::GET, path)).await
    }

    async fn read_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Envelope>, TransportError> {
        debug!(path = path, "Reading with query");
        self.send(path, self.request(Method::GET, path).query(query))
            .await
    }

    async fn write(&self, path: &str, data: Mapping) -> Result<Option<Envelope>, TransportError> {
        debug!(path = path, "Writing");
        self.send(path, self.request(Method::PUT, path).json(&data))
            .await
    }

    async fn list(&self, path: &str) -> Result<Option<Envelope>, TransportError> {
        debug!(path = path, "Listing");
        self.send(
            path,
            self.request(Method::GET, path).query(&[("list", "true")]),
        )
        .await
    }

    async fn delete(&self, path: &str) -> Result<Option<Envelope>, TransportError> {
        debug!(path = path, "Deleting");
        self.send(path, self.request(Method::DELETE, path)).await
    }
}
