//! In-memory secrets server.
//!
//! Implements the transport interface directly and keeps just enough state
//! to exercise the engine clients end to end: mounts, database connections,
//! roles and issued credentials, leases, and KV v2 versioning with soft
//! delete and destroy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use vaultwire_mapper::{parse_duration, time, Mapping};
use vaultwire_transport::{Envelope, Transport, TransportError};

type Response = Result<Option<Envelope>, TransportError>;

/// Default TTL of generated credentials when the role sets none.
const DEFAULT_LEASE_TTL: i64 = 3600;

/// Mount tuning reported for every mount.
const MOUNT_TTL: i64 = 2_764_800;

struct Lease {
    issue_time: DateTime<Utc>,
    expire_time: DateTime<Utc>,
    last_renewal_time: Option<DateTime<Utc>>,
    ttl: i64,
}

struct Version {
    data: Option<Mapping>,
    created_time: DateTime<Utc>,
    deletion_time: Option<DateTime<Utc>>,
    destroyed: bool,
}

impl Version {
    fn live_data(&self) -> Option<&Mapping> {
        if self.destroyed || self.deletion_time.is_some() {
            None
        } else {
            self.data.as_ref()
        }
    }

    fn metadata(&self) -> Mapping {
        let mut out = Mapping::new();
        out.insert("created_time".into(), json!(time::format(&self.created_time)));
        out.insert(
            "deletion_time".into(),
            json!(self
                .deletion_time
                .map(|t| time::format(&t))
                .unwrap_or_default()),
        );
        out.insert("destroyed".into(), json!(self.destroyed));
        out
    }
}

struct Secret {
    versions: BTreeMap<u64, Version>,
    current: u64,
    created_time: DateTime<Utc>,
    updated_time: DateTime<Utc>,
    settings: Mapping,
}

#[derive(Default)]
struct State {
    mounts: BTreeMap<String, String>,
    connections: BTreeMap<String, Mapping>,
    roles: BTreeMap<String, Mapping>,
    leases: BTreeMap<String, Lease>,
    kv_configs: BTreeMap<String, Mapping>,
    secrets: BTreeMap<String, Secret>,
    issued: u64,
}

/// Stateful in-memory stand-in for the secrets server.
#[derive(Default)]
pub struct FakeVault {
    state: Mutex<State>,
}

impl FakeVault {
    /// Creates a server with no mounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every active lease.
    pub fn active_leases(&self) -> Vec<String> {
        self.lock().leases.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Response helpers
// ============================================================================

fn respond(data: Mapping) -> Response {
    Ok(Some(Envelope::new(data)))
}

fn respond_keys(keys: impl IntoIterator<Item = String>) -> Response {
    let keys: Vec<Value> = keys.into_iter().map(Value::from).collect();
    if keys.is_empty() {
        return Ok(None);
    }
    let mut data = Mapping::new();
    data.insert("keys".into(), Value::Array(keys));
    respond(data)
}

fn rejected(path: &str, message: &str) -> TransportError {
    TransportError::Status {
        status: 400,
        path: path.to_string(),
        errors: vec![message.to_string()],
    }
}

fn no_route(path: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        path: path.to_string(),
        errors: vec![format!("no handler for route \"{}\"", path)],
    }
}

fn text<'a>(body: &'a Mapping, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn or_empty_list(body: &Mapping, key: &str) -> Value {
    body.get(key).cloned().unwrap_or_else(|| json!([]))
}

/// Renders a duration the way the server echoes it back (`2777h46m40s`).
fn normalize_duration(raw: &str) -> String {
    let Ok(duration) = parse_duration(raw) else {
        return raw.to_string();
    };
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Next segment of `key` below `dir`, with a trailing `/` for folders.
fn child_of(key: &str, dir: &str) -> Option<String> {
    let rest = if dir.is_empty() {
        key
    } else {
        key.strip_prefix(dir)?.strip_prefix('/')?
    };
    match rest.split_once('/') {
        Some((folder, _)) => Some(format!("{}/", folder)),
        None if !rest.is_empty() => Some(rest.to_string()),
        None => None,
    }
}

impl State {
    /// Splits `path` into a registered mount, its type and the remainder.
    fn route<'p>(&self, path: &'p str) -> Option<(&'p str, String, &'p str)> {
        self.mounts
            .iter()
            .filter_map(|(mount, kind)| {
                let rest = path.strip_prefix(mount.as_str())?.strip_prefix('/')?;
                Some((&path[..mount.len()], kind.clone(), rest))
            })
            .max_by_key(|(mount, _, _)| mount.len())
    }

    // ========================================================================
    // System endpoints
    // ========================================================================

    fn tune(&self, mount: &str) -> Response {
        if !self.mounts.contains_key(mount) {
            return Ok(None);
        }
        let mut data = Mapping::new();
        data.insert("default_lease_ttl".into(), json!(MOUNT_TTL));
        data.insert("max_lease_ttl".into(), json!(MOUNT_TTL));
        data.insert("description".into(), json!(""));
        data.insert("force_no_cache".into(), json!(false));
        respond(data)
    }

    fn lease_lookup(&self, path: &str, lease_id: &str) -> Response {
        let Some(lease) = self.leases.get(lease_id) else {
            return Err(rejected(path, "invalid lease"));
        };
        let mut data = Mapping::new();
        data.insert("id".into(), json!(lease_id));
        data.insert("issue_time".into(), json!(time::format(&lease.issue_time)));
        data.insert("expire_time".into(), json!(time::format(&lease.expire_time)));
        data.insert(
            "last_renewal_time".into(),
            lease
                .last_renewal_time
                .map(|t| json!(time::format(&t)))
                .unwrap_or(Value::Null),
        );
        data.insert("renewable".into(), json!(true));
        data.insert("ttl".into(), json!(lease.ttl));
        respond(data)
    }

    fn lease_renew(&mut self, path: &str, body: &Mapping) -> Response {
        let lease_id = text(body, "lease_id");
        let increment = body
            .get("increment")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_LEASE_TTL);
        let Some(lease) = self.leases.get_mut(lease_id) else {
            return Err(rejected(path, "lease not found"));
        };

        let now = Utc::now();
        lease.last_renewal_time = Some(now);
        lease.expire_time = now + Duration::seconds(increment);
        lease.ttl = increment;

        Ok(Some(Envelope {
            lease_id: lease_id.to_string(),
            lease_duration: increment,
            renewable: true,
            ..Default::default()
        }))
    }

    fn lease_list(&self, prefix: &str) -> Response {
        let dir = prefix.trim_end_matches('/');
        let children: BTreeSet<String> = self
            .leases
            .keys()
            .filter_map(|id| child_of(id, dir))
            .collect();
        respond_keys(children)
    }

    fn system_write(&mut self, path: &str, body: &Mapping) -> Response {
        if let Some(mount) = path.strip_prefix("sys/mounts/") {
            let kind = text(body, "type");
            if kind.is_empty() {
                return Err(rejected(path, "plugin type must be set"));
            }
            if self.mounts.contains_key(mount) {
                return Err(rejected(path, "path is already in use"));
            }
            self.mounts.insert(mount.to_string(), kind.to_string());
            return Ok(None);
        }
        if let Some(prefix) = path.strip_prefix("sys/leases/revoke-prefix/") {
            self.leases.retain(|id, _| !id.starts_with(prefix));
            return Ok(None);
        }
        match path {
            "sys/leases/lookup" => self.lease_lookup(path, text(body, "lease_id")),
            "sys/leases/renew" => self.lease_renew(path, body),
            "sys/leases/revoke" => {
                self.leases.remove(text(body, "lease_id"));
                Ok(None)
            },
            "sys/leases/tidy" => Ok(None),
            _ => Err(no_route(path)),
        }
    }

    // ========================================================================
    // Database engine
    // ========================================================================

    fn database_read(&mut self, mount: &str, rest: &str) -> Response {
        if let Some(name) = rest.strip_prefix("config/") {
            let Some(stored) = self.connections.get(&format!("{}/{}", mount, name)) else {
                return Ok(None);
            };
            let mut data = Mapping::new();
            data.insert("allowed_roles".into(), or_empty_list(stored, "allowed_roles"));
            data.insert(
                "connection_details".into(),
                json!({
                    "connection_url": text(stored, "connection_url"),
                    "username": text(stored, "username"),
                }),
            );
            data.insert("password_policy".into(), json!(text(stored, "password_policy")));
            data.insert("plugin_name".into(), json!(text(stored, "plugin_name")));
            data.insert("plugin_version".into(), json!(""));
            data.insert(
                "root_credentials_rotate_statements".into(),
                or_empty_list(stored, "root_rotation_statements"),
            );
            data.insert("verify_connection".into(), json!(true));
            return respond(data);
        }
        if let Some(name) = rest.strip_prefix("roles/") {
            return match self.roles.get(&format!("{}/{}", mount, name)) {
                Some(stored) => {
                    let mut data = stored.clone();
                    data.insert("credential_type".into(), json!("password"));
                    respond(data)
                },
                None => Ok(None),
            };
        }
        if let Some(role) = rest.strip_prefix("creds/") {
            return self.issue_credentials(mount, role);
        }
        Ok(None)
    }

    fn issue_credentials(&mut self, mount: &str, role: &str) -> Response {
        let Some(stored) = self.roles.get(&format!("{}/{}", mount, role)) else {
            return Ok(None);
        };
        let ttl = stored
            .get("default_ttl")
            .and_then(Value::as_i64)
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_LEASE_TTL);

        self.issued += 1;
        let serial = self.issued;
        let lease_id = format!("{}/creds/{}/lease-{:04}", mount, role, serial);
        let now = Utc::now();
        self.leases.insert(
            lease_id.clone(),
            Lease {
                issue_time: now,
                expire_time: now + Duration::seconds(ttl),
                last_renewal_time: None,
                ttl,
            },
        );

        let mut data = Mapping::new();
        data.insert("username".into(), json!(format!("v-{}-{:04}", role, serial)));
        data.insert("password".into(), json!(format!("A1a-{:04}-secret", serial)));
        Ok(Some(Envelope {
            request_id: format!("req-{:04}", serial),
            lease_id,
            lease_duration: ttl,
            renewable: true,
            data,
            warnings: Vec::new(),
        }))
    }

    fn database_write(&mut self, path: &str, mount: &str, rest: &str, body: Mapping) -> Response {
        if let Some(name) = rest.strip_prefix("config/") {
            if text(&body, "plugin_name").is_empty() {
                return Err(rejected(path, "plugin_name must be set"));
            }
            self.connections.insert(format!("{}/{}", mount, name), body);
            return Ok(None);
        }
        if let Some(name) = rest.strip_prefix("reset/") {
            if !self.connections.contains_key(&format!("{}/{}", mount, name)) {
                return Err(rejected(path, "unknown database connection"));
            }
            return Ok(None);
        }
        if let Some(name) = rest.strip_prefix("roles/") {
            if text(&body, "db_name").is_empty() {
                return Err(rejected(path, "empty database name attribute"));
            }
            self.roles.insert(format!("{}/{}", mount, name), body);
            return Ok(None);
        }
        Err(no_route(path))
    }

    fn database_list(&self, mount: &str, rest: &str) -> Response {
        let store = match rest {
            "config" => &self.connections,
            "roles" => &self.roles,
            _ => return Ok(None),
        };
        respond_keys(store.keys().filter_map(|key| child_of(key, mount)))
    }

    fn database_delete(&mut self, mount: &str, rest: &str) -> Response {
        if let Some(name) = rest.strip_prefix("config/") {
            self.connections.remove(&format!("{}/{}", mount, name));
        } else if let Some(name) = rest.strip_prefix("roles/") {
            self.roles.remove(&format!("{}/{}", mount, name));
        }
        Ok(None)
    }

    // ========================================================================
    // KV v2 engine
    // ========================================================================

    fn kv_read(&self, mount: &str, rest: &str, version: Option<u64>) -> Response {
        if rest == "config" {
            return match self.kv_configs.get(mount) {
                Some(config) => respond(config.clone()),
                None => Ok(None),
            };
        }
        if let Some(path) = rest.strip_prefix("data/") {
            let Some(secret) = self.secrets.get(&format!("{}/{}", mount, path)) else {
                return Ok(None);
            };
            let number = version.unwrap_or(secret.current);
            let Some(entry) = secret.versions.get(&number) else {
                return Ok(None);
            };
            let mut metadata = entry.metadata();
            metadata.insert("custom_metadata".into(), Value::Null);
            metadata.insert("version".into(), json!(number));

            let mut data = Mapping::new();
            data.insert(
                "data".into(),
                entry
                    .live_data()
                    .map(|d| Value::Object(d.clone()))
                    .unwrap_or(Value::Null),
            );
            data.insert("metadata".into(), Value::Object(metadata));
            return respond(data);
        }
        if let Some(path) = rest.strip_prefix("metadata/") {
            let Some(secret) = self.secrets.get(&format!("{}/{}", mount, path)) else {
                return Ok(None);
            };
            let versions: Mapping = secret
                .versions
                .iter()
                .map(|(n, v)| (n.to_string(), Value::Object(v.metadata())))
                .collect();

            let mut data = Mapping::new();
            data.insert(
                "cas_required".into(),
                secret.settings.get("cas_required").cloned().unwrap_or(json!(false)),
            );
            data.insert("created_time".into(), json!(time::format(&secret.created_time)));
            data.insert("current_version".into(), json!(secret.current));
            data.insert("custom_metadata".into(), Value::Null);
            data.insert(
                "delete_version_after".into(),
                secret
                    .settings
                    .get("delete_version_after")
                    .cloned()
                    .unwrap_or(json!("0s")),
            );
            data.insert(
                "max_versions".into(),
                secret.settings.get("max_versions").cloned().unwrap_or(json!(0)),
            );
            data.insert(
                "oldest_version".into(),
                json!(secret.versions.keys().next().copied().unwrap_or_default()),
            );
            data.insert("updated_time".into(), json!(time::format(&secret.updated_time)));
            data.insert("versions".into(), Value::Object(versions));
            return respond(data);
        }
        Ok(None)
    }

    fn kv_write(&mut self, path: &str, mount: &str, rest: &str, body: Mapping) -> Response {
        if rest == "config" {
            self.kv_configs.insert(mount.to_string(), kv_settings(body));
            return Ok(None);
        }
        if let Some(secret_path) = rest.strip_prefix("data/") {
            let Some(Value::Object(payload)) = body.get("data") else {
                return Err(rejected(path, "no data provided"));
            };
            return self.kv_put(mount, secret_path, payload.clone());
        }
        if let Some(secret_path) = rest.strip_prefix("metadata/") {
            let now = Utc::now();
            let secret = self
                .secrets
                .entry(format!("{}/{}", mount, secret_path))
                .or_insert_with(|| Secret {
                    versions: BTreeMap::new(),
                    current: 0,
                    created_time: now,
                    updated_time: now,
                    settings: Mapping::new(),
                });
            secret.settings = kv_settings(body);
            return Ok(None);
        }
        for (section, action) in [
            ("delete/", VersionAction::Delete),
            ("undelete/", VersionAction::Undelete),
            ("destroy/", VersionAction::Destroy),
        ] {
            if let Some(secret_path) = rest.strip_prefix(section) {
                let numbers: Vec<u64> = body
                    .get("versions")
                    .and_then(Value::as_array)
                    .map(|list| list.iter().filter_map(Value::as_u64).collect())
                    .unwrap_or_default();
                if numbers.is_empty() {
                    return Err(rejected(path, "no versions provided"));
                }
                if let Some(secret) = self.secrets.get_mut(&format!("{}/{}", mount, secret_path)) {
                    for number in numbers {
                        if let Some(entry) = secret.versions.get_mut(&number) {
                            action.apply(entry);
                        }
                    }
                }
                return Ok(None);
            }
        }
        Err(no_route(path))
    }

    fn kv_put(&mut self, mount: &str, path: &str, payload: Mapping) -> Response {
        let now = Utc::now();
        let secret = self
            .secrets
            .entry(format!("{}/{}", mount, path))
            .or_insert_with(|| Secret {
                versions: BTreeMap::new(),
                current: 0,
                created_time: now,
                updated_time: now,
                settings: Mapping::new(),
            });

        secret.current += 1;
        secret.updated_time = now;
        let entry = Version {
            data: Some(payload),
            created_time: now,
            deletion_time: None,
            destroyed: false,
        };
        let mut metadata = entry.metadata();
        metadata.insert("custom_metadata".into(), Value::Null);
        metadata.insert("version".into(), json!(secret.current));
        secret.versions.insert(secret.current, entry);

        respond(metadata)
    }

    fn kv_list(&self, mount: &str, rest: &str) -> Response {
        let Some(dir) = rest.strip_prefix("metadata/").or((rest == "metadata").then_some(""))
        else {
            return Ok(None);
        };
        let dir = dir.trim_end_matches('/');
        let root = format!("{}/", mount);
        let children: BTreeSet<String> = self
            .secrets
            .keys()
            .filter_map(|key| key.strip_prefix(root.as_str()))
            .filter_map(|key| child_of(key, dir))
            .collect();
        respond_keys(children)
    }

    fn kv_delete(&mut self, mount: &str, rest: &str) -> Response {
        if let Some(path) = rest.strip_prefix("data/") {
            if let Some(secret) = self.secrets.get_mut(&format!("{}/{}", mount, path)) {
                let current = secret.current;
                if let Some(entry) = secret.versions.get_mut(&current) {
                    VersionAction::Delete.apply(entry);
                }
            }
        } else if let Some(path) = rest.strip_prefix("metadata/") {
            self.secrets.remove(&format!("{}/{}", mount, path));
        }
        Ok(None)
    }
}

#[derive(Clone, Copy)]
enum VersionAction {
    Delete,
    Undelete,
    Destroy,
}

impl VersionAction {
    fn apply(self, entry: &mut Version) {
        match self {
            VersionAction::Delete => {
                if entry.deletion_time.is_none() {
                    entry.deletion_time = Some(Utc::now());
                }
            },
            VersionAction::Undelete => {
                if !entry.destroyed {
                    entry.deletion_time = None;
                }
            },
            VersionAction::Destroy => {
                entry.destroyed = true;
                entry.data = None;
            },
        }
    }
}

/// Stores KV settings the way the server reports them back.
fn kv_settings(mut body: Mapping) -> Mapping {
    if let Some(Value::String(raw)) = body.get("delete_version_after") {
        let normalized = if raw.is_empty() {
            "0s".to_string()
        } else {
            normalize_duration(raw)
        };
        body.insert("delete_version_after".into(), json!(normalized));
    }
    body
}

#[async_trait]
impl Transport for FakeVault {
    async fn read(&self, path: &str) -> Response {
        self.read_with_query(path, &[]).await
    }

    async fn read_with_query(&self, path: &str, query: &[(&str, &str)]) -> Response {
        let version = query
            .iter()
            .find(|(key, _)| *key == "version")
            .and_then(|(_, value)| value.parse().ok());

        let mut state = self.lock();
        if let Some(mount) = path
            .strip_prefix("sys/mounts/")
            .and_then(|rest| rest.strip_suffix("/tune"))
        {
            return state.tune(mount);
        }
        let Some((mount, kind, rest)) = state.route(path) else {
            return Err(no_route(path));
        };
        match kind.as_str() {
            "database" => state.database_read(mount, rest),
            "kv-v2" => state.kv_read(mount, rest, version),
            _ => Err(no_route(path)),
        }
    }

    async fn write(&self, path: &str, data: Mapping) -> Response {
        let mut state = self.lock();
        if path.starts_with("sys/") {
            return state.system_write(path, &data);
        }
        let Some((mount, kind, rest)) = state.route(path) else {
            return Err(no_route(path));
        };
        match kind.as_str() {
            "database" => state.database_write(path, mount, rest, data),
            "kv-v2" => state.kv_write(path, mount, rest, data),
            _ => Err(no_route(path)),
        }
    }

    async fn list(&self, path: &str) -> Response {
        let state = self.lock();
        if let Some(prefix) = path.strip_prefix("sys/leases/lookup/") {
            return state.lease_list(prefix);
        }
        let Some((mount, kind, rest)) = state.route(path) else {
            return Err(no_route(path));
        };
        match kind.as_str() {
            "database" => state.database_list(mount, rest),
            "kv-v2" => state.kv_list(mount, rest),
            _ => Err(no_route(path)),
        }
    }

    async fn delete(&self, path: &str) -> Response {
        let mut state = self.lock();
        let Some((mount, kind, rest)) = state.route(path) else {
            return Err(no_route(path));
        };
        match kind.as_str() {
            "database" => state.database_delete(mount, rest),
            "kv-v2" => state.kv_delete(mount, rest),
            _ => Err(no_route(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_duration() {
        assert_eq!(normalize_duration("10000000s"), "2777h46m40s");
        assert_eq!(normalize_duration("90s"), "1m30s");
        assert_eq!(normalize_duration("0"), "0s");
    }

    #[test]
    fn test_unknown_lease_lookup_is_rejected() {
        let mut state = State::default();
        let mut body = Mapping::new();
        body.insert("lease_id".into(), json!("database/creds/reader/lease-9999"));

        match state.system_write("sys/leases/lookup", &body) {
            Err(TransportError::Status { status, errors, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(errors, vec!["invalid lease".to_string()]);
            },
            other => panic!("expected invalid lease rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_child_of() {
        assert_eq!(child_of("sample/first", ""), Some("sample/".into()));
        assert_eq!(child_of("sample/first", "sample"), Some("first".into()));
        assert_eq!(child_of("sample/a/b", "sample"), Some("a/".into()));
        assert_eq!(child_of("other/first", "sample"), None);
        assert_eq!(child_of("samples/first", "sample"), None);
    }
}
