//! Vaultwire CLI - Command line interface.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaultwire_database::{DatabaseConnectionConfig, DatabaseEngine, DatabaseRole, DatabaseType};
use vaultwire_kv::{KvConfig, KvEngine};
use vaultwire_lease::LeaseEngine;
use vaultwire_mapper::{encode, Mapping, Record};
use vaultwire_transport::Transport;
use vaultwire_transport_http::config::DEFAULT_ADDR;
use vaultwire_transport_http::{parse_timeout, HttpConfig, HttpTransport};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "vaultwire")]
#[command(about = "Vaultwire CLI - Manage database credentials, KV secrets and leases")]
#[command(version)]
struct Cli {
    /// Secrets server address
    #[arg(long, default_value = DEFAULT_ADDR, env = "VAULT_ADDR")]
    addr: String,

    /// Authentication token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Namespace sent with every request
    #[arg(long, env = "VAULT_NAMESPACE")]
    namespace: Option<String>,

    /// Request timeout, in seconds or as a duration (e.g. 1m30s)
    #[arg(long, default_value = "60", env = "VAULT_CLIENT_TIMEOUT", value_parser = parse_timeout)]
    timeout: Duration,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database secrets engine
    Database {
        /// Engine mount path
        #[arg(long, default_value = vaultwire_database::DEFAULT_MOUNT)]
        mount: String,
        #[command(subcommand)]
        command: DatabaseCommands,
    },
    /// Versioned key/value secrets engine
    Kv {
        /// Engine mount path
        #[arg(long, default_value = vaultwire_kv::DEFAULT_MOUNT)]
        mount: String,
        #[command(subcommand)]
        command: KvCommands,
    },
    /// Lease management
    Lease {
        #[command(subcommand)]
        command: LeaseCommands,
    },
}

#[derive(Subcommand)]
enum DatabaseCommands {
    /// Mount the database engine
    Enable,
    /// Show the mount tuning
    Status,
    /// Create or replace a connection
    CreateConnection(ConnectionArgs),
    /// Show a connection
    ReadConnection { name: String },
    /// Reset a connection
    ResetConnection { name: String },
    /// Delete a connection
    DeleteConnection { name: String },
    /// List connections
    ListConnections,
    /// Create or replace a role
    CreateRole(RoleArgs),
    /// Show a role
    ReadRole { name: String },
    /// Delete a role
    DeleteRole { name: String },
    /// List roles
    ListRoles,
    /// Generate credentials from a role
    Creds { role: String },
    /// List the leases issued by a role
    Leases { role: String },
}

#[derive(Args)]
struct ConnectionArgs {
    /// Connection name
    name: String,
    /// Database plugin
    #[arg(long, default_value = "mysql-database-plugin")]
    plugin: DatabaseType,
    /// Connection URL template
    #[arg(long)]
    connection_url: String,
    /// Root username
    #[arg(long)]
    username: String,
    /// Root password
    #[arg(long, env = "VAULTWIRE_DB_PASSWORD", hide_env_values = true)]
    password: String,
    /// Roles allowed to use the connection (comma separated)
    #[arg(long, value_delimiter = ',')]
    allowed_roles: Vec<String>,
    /// Password policy name
    #[arg(long)]
    password_policy: Option<String>,
}

#[derive(Args)]
struct RoleArgs {
    /// Role name
    name: String,
    /// Connection used by the role
    #[arg(long)]
    connection: String,
    /// Default credential TTL in seconds
    #[arg(long, default_value = "3600")]
    default_ttl: i64,
    /// Maximum credential TTL in seconds
    #[arg(long, default_value = "86400")]
    max_ttl: i64,
    /// Creation statement (repeatable)
    #[arg(long = "creation-statement", required = true)]
    creation_statements: Vec<String>,
    /// Revocation statement (repeatable)
    #[arg(long = "revocation-statement")]
    revocation_statements: Vec<String>,
}

#[derive(Subcommand)]
enum KvCommands {
    /// Mount a KV v2 engine
    Enable,
    /// Show the mount tuning
    Status,
    /// Write the engine configuration
    WriteConfig(KvConfigArgs),
    /// Show the engine configuration
    ReadConfig,
    /// Write a secret (key=value pairs)
    Put {
        path: String,
        #[arg(required = true)]
        data: Vec<String>,
    },
    /// Read a secret
    Get {
        path: String,
        /// Version to read (latest when omitted)
        #[arg(long)]
        version: Option<u64>,
        /// Output format (json, value)
        #[arg(long, short, default_value = "json")]
        format: String,
        /// Print a single field
        #[arg(long)]
        field: Option<String>,
    },
    /// Soft-delete the latest version
    Delete { path: String },
    /// Soft-delete specific versions
    DeleteVersions {
        path: String,
        #[arg(required = true)]
        versions: Vec<u64>,
    },
    /// Restore soft-deleted versions
    Undelete {
        path: String,
        #[arg(required = true)]
        versions: Vec<u64>,
    },
    /// Permanently destroy versions
    Destroy {
        path: String,
        #[arg(required = true)]
        versions: Vec<u64>,
    },
    /// List keys under a path
    List {
        #[arg(default_value = "")]
        path: String,
    },
    /// Show version history of a path
    Metadata { path: String },
    /// Update per-path versioning settings
    UpdateMetadata {
        path: String,
        #[command(flatten)]
        config: KvConfigArgs,
    },
    /// Remove every version and the metadata of a path
    DestroyAll { path: String },
}

#[derive(Args)]
struct KvConfigArgs {
    /// Versions kept per path
    #[arg(long, default_value = "0")]
    max_versions: u64,
    /// Require check-and-set on writes
    #[arg(long)]
    cas_required: bool,
    /// Grace period before versions are deleted (e.g. 768h)
    #[arg(long, default_value = "")]
    delete_version_after: String,
}

impl From<KvConfigArgs> for KvConfig {
    fn from(args: KvConfigArgs) -> Self {
        KvConfig {
            max_versions: args.max_versions,
            cas_required: args.cas_required,
            delete_version_after: args.delete_version_after,
        }
    }
}

#[derive(Subcommand)]
enum LeaseCommands {
    /// Show a lease
    Lookup { lease_id: String },
    /// List leases under a prefix
    List { prefix: String },
    /// Renew a lease
    Renew {
        lease_id: String,
        /// Requested extension in seconds
        #[arg(long, default_value = "3600")]
        increment: i64,
    },
    /// Revoke a lease
    Revoke { lease_id: String },
    /// Revoke every lease under a prefix
    RevokePrefix { prefix: String },
    /// Clean up invalid lease entries
    Tidy,
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_record<R: Record>(record: &R) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&Value::Object(encode(record)))?
    );
    Ok(())
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        println!("No {} found", title);
    } else {
        println!("{}:", capitalize(title));
        for item in items {
            println!("  {}", item);
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_pairs(pairs: &[String]) -> Result<Mapping> {
    let mut data = Mapping::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid key=value pair: {}. Use format: key=value", pair);
        };
        data.insert(key.to_string(), Value::from(value));
    }
    Ok(data)
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_database(engine: &DatabaseEngine, command: DatabaseCommands) -> Result<()> {
    match command {
        DatabaseCommands::Enable => {
            engine.enable().await?;
            println!("Database engine enabled at '{}'", engine.path());
        },
        DatabaseCommands::Status => match engine.status().await? {
            Some(status) => print_record(&status)?,
            None => println!("No status reported for '{}'", engine.path()),
        },
        DatabaseCommands::CreateConnection(args) => {
            let config = DatabaseConnectionConfig {
                plugin: args.plugin,
                connection_url: args.connection_url,
                username: args.username,
                password: args.password,
                allowed_roles: args.allowed_roles,
                root_rotation_statements: None,
                password_policy: args.password_policy,
            };
            engine.create_connection(&args.name, &config).await?;
            println!("Connection '{}' written", args.name);
        },
        DatabaseCommands::ReadConnection { name } => {
            print_record(&engine.read_connection(&name).await?)?
        },
        DatabaseCommands::ResetConnection { name } => {
            engine.reset_connection(&name).await?;
            println!("Connection '{}' reset", name);
        },
        DatabaseCommands::DeleteConnection { name } => {
            engine.delete_connection(&name).await?;
            println!("Connection '{}' deleted", name);
        },
        DatabaseCommands::ListConnections => {
            print_list("connections", &engine.list_connections().await)
        },
        DatabaseCommands::CreateRole(args) => {
            let role = DatabaseRole {
                connection_name: args.connection,
                default_ttl: args.default_ttl,
                max_ttl: args.max_ttl,
                creation_statements: args.creation_statements,
                revocation_statements: args.revocation_statements,
                rollback_statements: None,
                renew_statements: None,
            };
            engine.create_role(&args.name, &role).await?;
            println!("Role '{}' written", args.name);
        },
        DatabaseCommands::ReadRole { name } => print_record(&engine.read_role(&name).await?)?,
        DatabaseCommands::DeleteRole { name } => {
            engine.delete_role(&name).await?;
            println!("Role '{}' deleted", name);
        },
        DatabaseCommands::ListRoles => print_list("roles", &engine.list_roles().await),
        DatabaseCommands::Creds { role } => {
            print_record(&engine.generate_credentials(&role).await?)?
        },
        DatabaseCommands::Leases { role } => print_list("leases", &engine.list_leases(&role).await),
    }
    Ok(())
}

async fn cmd_kv(engine: &KvEngine, command: KvCommands) -> Result<()> {
    match command {
        KvCommands::Enable => {
            engine.enable().await?;
            println!("KV engine enabled at '{}'", engine.path());
        },
        KvCommands::Status => match engine.status().await? {
            Some(status) => print_record(&status)?,
            None => println!("No status reported for '{}'", engine.path()),
        },
        KvCommands::WriteConfig(args) => {
            engine.write_config(&args.into()).await?;
            println!("Configuration written");
        },
        KvCommands::ReadConfig => print_record(&engine.read_config().await?)?,
        KvCommands::Put { path, data } => {
            let metadata = engine.write_data(&path, parse_pairs(&data)?).await?;
            println!("Secret written successfully (version {})", metadata.version);
        },
        KvCommands::Get {
            path,
            version,
            format,
            field,
        } => {
            let record = match version {
                Some(version) => engine.read_version_data(&path, version).await?,
                None => engine.read_data(&path).await?,
            };
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&record.data)?),
                "value" => match field.as_deref() {
                    Some(field) => match record.data.get(field) {
                        Some(Value::String(s)) => println!("{}", s),
                        Some(other) => println!("{}", other),
                        None => bail!("Field '{}' not found in secret", field),
                    },
                    None => {
                        for (k, v) in &record.data {
                            println!("{}={}", k, v);
                        }
                    },
                },
                _ => bail!("Unknown format: {}. Use 'json' or 'value'", format),
            }
        },
        KvCommands::Delete { path } => {
            engine.delete(&path).await?;
            println!("Latest version of '{}' deleted", path);
        },
        KvCommands::DeleteVersions { path, versions } => {
            engine.delete_versions(&path, &versions).await?;
            println!("Versions {:?} of '{}' deleted", versions, path);
        },
        KvCommands::Undelete { path, versions } => {
            engine.undelete_versions(&path, &versions).await?;
            println!("Versions {:?} of '{}' restored", versions, path);
        },
        KvCommands::Destroy { path, versions } => {
            engine.destroy_versions(&path, &versions).await?;
            println!("Versions {:?} of '{}' destroyed", versions, path);
        },
        KvCommands::List { path } => print_list("secrets", &engine.list(&path).await),
        KvCommands::Metadata { path } => print_record(&engine.read_metadata(&path).await?)?,
        KvCommands::UpdateMetadata { path, config } => {
            engine.update_metadata(&path, &config.into()).await?;
            println!("Metadata of '{}' updated", path);
        },
        KvCommands::DestroyAll { path } => {
            engine.destroy_all(&path).await?;
            println!("Secret '{}' destroyed", path);
        },
    }
    Ok(())
}

async fn cmd_lease(engine: &LeaseEngine, command: LeaseCommands) -> Result<()> {
    match command {
        LeaseCommands::Lookup { lease_id } => print_record(&engine.lookup(&lease_id).await?)?,
        LeaseCommands::List { prefix } => print_list("leases", &engine.list(&prefix).await),
        LeaseCommands::Renew {
            lease_id,
            increment,
        } => {
            engine.renew(&lease_id, increment).await?;
            println!("Lease '{}' renewed", lease_id);
        },
        LeaseCommands::Revoke { lease_id } => {
            engine.revoke(&lease_id).await?;
            println!("Lease '{}' revoked", lease_id);
        },
        LeaseCommands::RevokePrefix { prefix } => {
            engine.revoke_prefix(&prefix).await?;
            println!("Leases under '{}' revoked", prefix);
        },
        LeaseCommands::Tidy => {
            engine.tidy().await?;
            println!("Lease tidy started");
        },
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn transport(cli: &Cli) -> Result<Arc<dyn Transport>> {
    let token = cli
        .token
        .clone()
        .context("Authentication token required. Set VAULT_TOKEN or use --token")?;

    let mut config =
        HttpConfig::new(cli.addr.clone(), token).with_timeout(cli.timeout);
    if let Some(namespace) = &cli.namespace {
        config = config.with_namespace(namespace.clone());
    }

    let transport = HttpTransport::new(config).context("Failed to create HTTP client")?;
    Ok(Arc::new(transport))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let transport = transport(&cli)?;
    debug!(addr = %cli.addr, namespace = ?cli.namespace, "Client configured");

    let result = match cli.command {
        Commands::Database { mount, command } => {
            info!(engine = "database", mount = %mount, "Dispatching command");
            cmd_database(&DatabaseEngine::new(transport, mount), command).await
        },
        Commands::Kv { mount, command } => {
            info!(engine = "kv", mount = %mount, "Dispatching command");
            cmd_kv(&KvEngine::new(transport, mount), command).await
        },
        Commands::Lease { command } => {
            info!(engine = "lease", "Dispatching command");
            cmd_lease(&LeaseEngine::new(transport), command).await
        },
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}
