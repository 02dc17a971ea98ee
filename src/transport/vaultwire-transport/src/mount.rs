//! System mount endpoints shared by every secrets engine.

use serde_json::Value;

use vaultwire_mapper::{record, Mapping};

record! {
    /// Tuning information of a secrets engine mount.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct SecretStatus {
        /// Default lease TTL in seconds.
        pub default_lease_ttl: i64 => "default_lease_ttl",
        /// Maximum lease TTL in seconds.
        pub max_lease_ttl: i64 => "max_lease_ttl",
        /// Mount description.
        pub description: String => "description",
        /// Whether caching is disabled.
        pub force_no_cache: bool => "force_no_cache",
    }
}

/// Path enabling or describing the mount.
pub fn mount_path(mount: &str) -> String {
    format!("sys/mounts/{}", mount)
}

/// Path of the mount tuning.
pub fn tune_path(mount: &str) -> String {
    format!("sys/mounts/{}/tune", mount)
}

/// Body declaring the engine type of a new mount (`database`, `kv-v2`, ...).
pub fn mount_body(engine_type: &str) -> Mapping {
    let mut body = Mapping::new();
    body.insert("type".to_string(), Value::from(engine_type));
    body
}
