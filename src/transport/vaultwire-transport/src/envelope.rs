//! Response envelope returned by the secrets server.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use vaultwire_mapper::Mapping;

/// Outer structure of a server response.
///
/// Besides the `data` payload, an envelope may carry lease information for
/// dynamically generated secrets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Server-side request identifier.
    #[serde(default)]
    pub request_id: String,
    /// Lease identifier of a generated secret.
    #[serde(default)]
    pub lease_id: String,
    /// Lease duration in seconds.
    #[serde(default)]
    pub lease_duration: i64,
    /// Whether the lease can be renewed.
    #[serde(default)]
    pub renewable: bool,
    /// Response payload.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Mapping,
    /// Warnings attached by the server.
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
}

impl Envelope {
    /// Creates an envelope carrying only a data payload.
    pub fn new(data: Mapping) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Returns one part of the data payload.
    pub fn part(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Entries of a list response (`data.keys`), empty when absent.
    pub fn keys(&self) -> Vec<Value> {
        match self.data.get("keys") {
            Some(Value::Array(keys)) => keys.clone(),
            _ => Vec::new(),
        }
    }

    /// Whether the envelope carries any data or warnings.
    pub fn has_content(&self) -> bool {
        !self.data.is_empty() || !self.warnings.is_empty()
    }
}

/// Deserializes `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
