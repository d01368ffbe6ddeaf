/// Service bootstrap
///
/// One-shot startup sequence: load the file layer, snapshot the process
/// environment, try the secret store (probe, authenticate, read the three
/// registry paths), then run the resolver. Store trouble of any kind is
/// logged and downgraded to "that layer is empty"; only an unreadable
/// config file or a failed resolution aborts startup.
use std::env;

use thiserror::Error;
use url::Url;

use registry_secrets::{ProbeOutcome, ReadError, SecretEntry, SecretStoreClient, StoreCredential};

use crate::config::{
    load_file_config, resolve, EnvSource, FileConfig, ResolveError, ResolvedConfig, SecretSources,
};
use crate::identity::ServiceIdentity;

pub const DATABASE_SECRET_PATH: &str = "mongodb";
pub const TELEMETRY_SECRET_PATH: &str = "apm";
pub const PORTS_SECRET_PATH: &str = "ports";

const ENV_STORE_ADDR: &str = "VAULT_ADDR";
const ENV_STORE_TOKEN: &str = "VAULT_TOKEN";
const ENV_STORE_MOUNT: &str = "VAULT_MOUNT";
const ENV_STORE_AUTH_METHOD: &str = "VAULT_AUTH_METHOD";
const ENV_STORE_ROLE: &str = "VAULT_ROLE";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load configuration file: {0}")]
    File(#[from] config::ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Where and how to reach the secret store for this boot.
#[derive(Debug, Clone)]
pub struct StoreConnection {
    pub address: Url,
    pub mount: String,
    pub credential: StoreCredential,
}

impl StoreConnection {
    /// Build the connection from environment variables with the file's
    /// `[secret_store]` section as fallback. `None` means no store is
    /// configured and the secret layer stays empty without a warning.
    pub fn discover(file: &FileConfig) -> Option<Self> {
        let address = env_or(ENV_STORE_ADDR, &file.secret_store.address)?;
        let address = match Url::parse(&address) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Ignoring malformed secret store address");
                return None;
            }
        };

        let mount = env_or(ENV_STORE_MOUNT, &file.secret_store.mount)
            .unwrap_or_else(|| "registry".to_string());
        let auth_method = env_or(ENV_STORE_AUTH_METHOD, &file.secret_store.auth_method)
            .unwrap_or_else(|| "token".to_string());

        let credential = match auth_method.as_str() {
            "kubernetes" => StoreCredential::Kubernetes {
                role: env_or(ENV_STORE_ROLE, &file.secret_store.role).unwrap_or_default(),
            },
            _ => StoreCredential::Token(env::var(ENV_STORE_TOKEN).unwrap_or_default()),
        };

        Some(Self {
            address,
            mount,
            credential,
        })
    }
}

fn env_or(key: &str, file_value: &str) -> Option<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            if file_value.trim().is_empty() {
                None
            } else {
                Some(file_value.to_string())
            }
        })
}

/// Probe, authenticate and read the three registry paths. Every failure
/// mode collapses to an empty layer; the resolver falls through to env,
/// file and defaults.
pub async fn fetch_secret_sources(connection: &StoreConnection) -> SecretSources {
    let client = SecretStoreClient::new(connection.address.clone(), connection.mount.clone());

    match client.probe_health().await {
        ProbeOutcome::Healthy => {}
        ProbeOutcome::Degraded(reason) => {
            tracing::warn!(
                address = %connection.address,
                reason = %reason,
                "Secret store degraded, resolving without it"
            );
            return SecretSources::unavailable();
        }
    }

    let session = match client.authenticate(&connection.credential).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(
                address = %connection.address,
                error = %e,
                "Secret store authentication failed, resolving without it"
            );
            return SecretSources::unavailable();
        }
    };

    tracing::info!(address = %connection.address, mount = %connection.mount, "Secret store session established");

    SecretSources {
        database: read_path(&client, &session, DATABASE_SECRET_PATH).await,
        telemetry: read_path(&client, &session, TELEMETRY_SECRET_PATH).await,
        ports: read_path(&client, &session, PORTS_SECRET_PATH).await,
    }
}

async fn read_path(
    client: &SecretStoreClient,
    session: &registry_secrets::Session,
    path: &str,
) -> Option<SecretEntry> {
    match client.read_secret_path(session, path).await {
        Ok(entry) => Some(entry),
        Err(ReadError::NotFound(path)) => {
            tracing::debug!(path = %path, "Secret path not present, lower layers take over");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Secret path read failed, lower layers take over");
            None
        }
    }
}

/// Full bootstrap against the real process environment.
pub async fn bootstrap(identity: ServiceIdentity) -> Result<ResolvedConfig, BootstrapError> {
    let file = load_file_config()?;
    let env_source = EnvSource::from_process();
    let connection = StoreConnection::discover(&file);
    bootstrap_from_sources(identity, connection.as_ref(), &env_source, &file).await
}

/// Bootstrap with every source supplied by the caller.
pub async fn bootstrap_from_sources(
    identity: ServiceIdentity,
    connection: Option<&StoreConnection>,
    env_source: &EnvSource,
    file: &FileConfig,
) -> Result<ResolvedConfig, BootstrapError> {
    let secrets = match connection {
        Some(connection) => fetch_secret_sources(connection).await,
        None => {
            tracing::info!("No secret store configured, resolving from env, file and defaults");
            SecretSources::unavailable()
        }
    };

    let config = resolve(identity, &secrets, env_source, file)?;
    tracing::info!(
        service = %config.service_name,
        port = %config.port,
        database = %config.database.database_name,
        telemetry_enabled = %config.telemetry.is_some(),
        "Configuration resolved"
    );
    Ok(config)
}
