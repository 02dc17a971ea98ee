//! Records exchanged with the database engine.

use std::fmt;
use std::str::FromStr;

use vaultwire_mapper::{record, FieldKind, MapperError, Value, WireField};

pub use vaultwire_transport::SecretStatus;

/// Database plugin backing a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// `mysql-database-plugin`
    #[default]
    MySql,
    /// `postgresql-database-plugin`
    PostgreSql,
}

impl DatabaseType {
    /// Plugin identifiers accepted by the server.
    pub const NAMES: &'static [&'static str] =
        &["mysql-database-plugin", "postgresql-database-plugin"];

    /// Plugin identifier on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySql => Self::NAMES[0],
            DatabaseType::PostgreSql => Self::NAMES[1],
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql-database-plugin" => Ok(DatabaseType::MySql),
            "postgresql-database-plugin" => Ok(DatabaseType::PostgreSql),
            other => Err(MapperError::UnknownVariant {
                value: other.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

impl WireField for DatabaseType {
    fn kind() -> FieldKind {
        FieldKind::Text
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::from(self.as_str()))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        String::from_wire(value)?.parse()
    }
}

record! {
    /// Configuration of a database connection.
    ///
    /// The same shape is used to create a connection and to return it from
    /// [`read_connection`](crate::DatabaseEngine::read_connection). The server
    /// never returns the password, so it is empty on read.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct DatabaseConnectionConfig {
        /// Plugin driving the connection.
        pub plugin: DatabaseType => "plugin_name",
        /// Connection URL template, e.g. `{{username}}:{{password}}@tcp(db:3306)/`.
        pub connection_url: String => "connection_url",
        /// Root username.
        pub username: String => "username",
        /// Root password.
        pub password: String => "password",
        /// Roles allowed to use this connection.
        pub allowed_roles: Vec<String> => "allowed_roles",
        /// Statements used to rotate the root credentials.
        pub root_rotation_statements: Option<Vec<String>> => "root_rotation_statements",
        /// Password policy applied to generated passwords.
        pub password_policy: Option<String> => "password_policy",
    }
}

record! {
    #[derive(Debug, Default)]
    struct ConnectionDetails {
        connection_url: String => "connection_url",
        username: String => "username",
    }
}

record! {
    /// Connection as reported by the server on read.
    #[derive(Debug, Default)]
    pub(crate) struct ConnectionReadout {
        plugin: DatabaseType => "plugin_name",
        details: ConnectionDetails => "connection_details",
        allowed_roles: Vec<String> => "allowed_roles",
        root_rotation_statements: Vec<String> => "root_credentials_rotate_statements",
        password_policy: String => "password_policy",
    }
}

impl From<ConnectionReadout> for DatabaseConnectionConfig {
    fn from(readout: ConnectionReadout) -> Self {
        Self {
            plugin: readout.plugin,
            connection_url: readout.details.connection_url,
            username: readout.details.username,
            password: String::new(),
            allowed_roles: readout.allowed_roles,
            root_rotation_statements: Some(readout.root_rotation_statements)
                .filter(|statements| !statements.is_empty()),
            password_policy: Some(readout.password_policy).filter(|policy| !policy.is_empty()),
        }
    }
}

record! {
    /// A role issuing credentials on a connection.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct DatabaseRole {
        /// Name of the connection the role uses.
        pub connection_name: String => "db_name",
        /// Default credential TTL in seconds.
        pub default_ttl: i64 => "default_ttl",
        /// Maximum credential TTL in seconds.
        pub max_ttl: i64 => "max_ttl",
        /// Statements creating the database user.
        pub creation_statements: Vec<String> => "creation_statements",
        /// Statements dropping the database user.
        pub revocation_statements: Vec<String> => "revocation_statements",
        /// Statements undoing a failed creation.
        pub rollback_statements: Option<Vec<String>> => "rollback_statements",
        /// Statements run on lease renewal.
        pub renew_statements: Option<Vec<String>> => "renew_statements",
    }
}

record! {
    #[derive(Debug, Default)]
    pub(crate) struct UsernamePassword {
        pub(crate) username: String => "username",
        pub(crate) password: String => "password",
    }
}

record! {
    /// Freshly generated database credentials and their lease.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Credential {
        /// Lease tracking the credentials.
        pub lease_id: String => "lease_id",
        /// Lease duration in seconds.
        pub lease_duration: i64 => "lease_duration",
        /// Whether the lease can be renewed.
        pub renewable: bool => "renewable",
        /// Generated username.
        pub username: String => "username",
        /// Generated password.
        pub password: String => "password",
    }
}
