/// Configuration resolver
///
/// One pass over four layers, highest precedence first: secret store,
/// process environment, config file, static defaults. A value wins only
/// when it is present and non-empty (non-zero for ports); losing layers
/// are never consulted again. The resolver takes every source as an
/// argument and mutates none of them.
use std::collections::BTreeMap;
use std::env;

use registry_secrets::SecretEntry;
use thiserror::Error;

use crate::config::{ApmConfig, DatabaseConfig, FileConfig, LoggingConfig, ResolvedConfig};
use crate::identity::ServiceIdentity;

pub const ENV_MONGODB_URI: &str = "MONGODB_URI";
pub const ENV_MONGODB_USERNAME: &str = "MONGODB_USERNAME";
pub const ENV_MONGODB_PASSWORD: &str = "MONGODB_PASSWORD";
pub const ENV_DATABASE_NAME: &str = "DATABASE_NAME";
pub const ENV_SERVICE_PORT: &str = "SERVICE_PORT";
pub const ENV_SERVICE_HOST: &str = "SERVICE_HOST";
pub const ENV_SERVICE_NAME: &str = "SERVICE_NAME";
pub const ENV_APM_SERVER_URL: &str = "ELASTIC_APM_SERVER_URL";
pub const ENV_APM_SECRET_TOKEN: &str = "ELASTIC_APM_SECRET_TOKEN";
pub const ENV_APM_ENVIRONMENT: &str = "ELASTIC_APM_ENVIRONMENT";
pub const ENV_APM_SERVICE_NAME: &str = "ELASTIC_APM_SERVICE_NAME";

const WELL_KNOWN_KEYS: &[&str] = &[
    ENV_MONGODB_URI,
    ENV_MONGODB_USERNAME,
    ENV_MONGODB_PASSWORD,
    ENV_DATABASE_NAME,
    ENV_SERVICE_PORT,
    ENV_SERVICE_HOST,
    ENV_SERVICE_NAME,
    ENV_APM_SERVER_URL,
    ENV_APM_SECRET_TOKEN,
    ENV_APM_ENVIRONMENT,
    ENV_APM_SERVICE_NAME,
];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no value for required field `{field}` (tried {attempted})")]
    MissingField {
        field: &'static str,
        attempted: String,
    },
    #[error("invalid value for field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Snapshot of the process environment, restricted to the keys the
/// resolver understands. Tests build one by hand instead of mutating
/// the real environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    pub fn from_process() -> Self {
        let vars = WELL_KNOWN_KEYS
            .iter()
            .filter_map(|key| env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self { vars }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Secret store material handed to the resolver. Any path the fetch
/// sequence could not read arrives as `None` and its layer simply loses
/// every contest.
#[derive(Debug, Clone, Default)]
pub struct SecretSources {
    pub database: Option<SecretEntry>,
    pub telemetry: Option<SecretEntry>,
    pub ports: Option<SecretEntry>,
}

impl SecretSources {
    /// The shape used when the store is unreachable or authentication
    /// failed: all lower layers take over.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

pub fn resolve(
    identity: ServiceIdentity,
    secrets: &SecretSources,
    env_source: &EnvSource,
    file: &FileConfig,
) -> Result<ResolvedConfig, ResolveError> {
    let database = resolve_database(secrets, env_source, file)?;
    let port = resolve_port(identity, secrets, env_source, file)?;
    let host = pick(
        "host",
        [
            ("env", env_source.get(ENV_SERVICE_HOST).map(str::to_string)),
            ("file", non_empty(&file.server.host)),
        ],
    )
    .unwrap_or_else(|| "0.0.0.0".to_string());
    let service_name = pick(
        "service_name",
        [("env", env_source.get(ENV_SERVICE_NAME).map(str::to_string))],
    )
    .unwrap_or_else(|| identity.service_name().to_string());
    let telemetry = resolve_telemetry(&service_name, secrets, env_source, file);

    Ok(ResolvedConfig {
        service_name,
        host,
        port,
        database,
        telemetry,
        logging: LoggingConfig::from_settings(&file.logging),
    })
}

fn resolve_database(
    secrets: &SecretSources,
    env_source: &EnvSource,
    file: &FileConfig,
) -> Result<DatabaseConfig, ResolveError> {
    let store = secrets.database.as_ref();

    let uri = pick(
        "database.uri",
        [
            ("secret-store", store.and_then(|e| e.text("uri")).map(str::to_string)),
            ("env", env_source.get(ENV_MONGODB_URI).map(str::to_string)),
            ("file", non_empty(&file.database.uri)),
        ],
    )
    .ok_or(ResolveError::MissingField {
        field: "database.uri",
        attempted: "secret path `mongodb` key `uri`, env MONGODB_URI, file [database].uri"
            .to_string(),
    })?;

    if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
        return Err(ResolveError::InvalidField {
            field: "database.uri",
            reason: format!("unsupported connection scheme in `{uri}`"),
        });
    }

    let username = pick(
        "database.username",
        [
            ("secret-store", store.and_then(|e| e.text("username")).map(str::to_string)),
            ("env", env_source.get(ENV_MONGODB_USERNAME).map(str::to_string)),
            ("file", non_empty(&file.database.username)),
        ],
    );
    let password = pick(
        "database.password",
        [
            ("secret-store", store.and_then(|e| e.text("password")).map(str::to_string)),
            ("env", env_source.get(ENV_MONGODB_PASSWORD).map(str::to_string)),
            ("file", non_empty(&file.database.password)),
        ],
    );
    let database_name = pick(
        "database.name",
        [
            ("secret-store", store.and_then(|e| e.text("database")).map(str::to_string)),
            ("env", env_source.get(ENV_DATABASE_NAME).map(str::to_string)),
            ("file", non_empty(&file.database.name)),
        ],
    )
    .unwrap_or_else(|| "registry".to_string());

    Ok(DatabaseConfig {
        uri,
        username,
        password,
        database_name,
    })
}

fn resolve_port(
    identity: ServiceIdentity,
    secrets: &SecretSources,
    env_source: &EnvSource,
    file: &FileConfig,
) -> Result<u16, ResolveError> {
    if let Some(port) = secrets.ports.as_ref().and_then(|e| e.port(identity.key())) {
        tracing::debug!(field = "port", source = "secret-store", port = %port, "Resolved configuration field");
        return Ok(port);
    }

    if let Some(raw) = env_source.get(ENV_SERVICE_PORT) {
        let port = raw
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| ResolveError::InvalidField {
                field: "port",
                reason: format!("SERVICE_PORT `{raw}` is not a valid port"),
            })?;
        tracing::debug!(field = "port", source = "env", port = %port, "Resolved configuration field");
        return Ok(port);
    }

    if file.server.port > 0 {
        tracing::debug!(field = "port", source = "file", port = %file.server.port, "Resolved configuration field");
        return Ok(file.server.port);
    }

    let port = identity.default_port();
    tracing::debug!(field = "port", source = "default", port = %port, "Resolved configuration field");
    Ok(port)
}

fn resolve_telemetry(
    default_service_name: &str,
    secrets: &SecretSources,
    env_source: &EnvSource,
    file: &FileConfig,
) -> Option<ApmConfig> {
    let store = secrets.telemetry.as_ref();

    let server_url = pick(
        "apm.server_url",
        [
            ("secret-store", store.and_then(|e| e.text("server_url")).map(str::to_string)),
            ("env", env_source.get(ENV_APM_SERVER_URL).map(str::to_string)),
            ("file", non_empty(&file.apm.server_url)),
        ],
    );
    let secret_token = pick(
        "apm.secret_token",
        [
            ("secret-store", store.and_then(|e| e.text("secret_token")).map(str::to_string)),
            ("env", env_source.get(ENV_APM_SECRET_TOKEN).map(str::to_string)),
            ("file", non_empty(&file.apm.secret_token)),
        ],
    );
    let environment = pick(
        "apm.environment",
        [
            ("secret-store", store.and_then(|e| e.text("environment")).map(str::to_string)),
            ("env", env_source.get(ENV_APM_ENVIRONMENT).map(str::to_string)),
            ("file", non_empty(&file.apm.environment)),
        ],
    );
    let service_name = pick(
        "apm.service_name",
        [("env", env_source.get(ENV_APM_SERVICE_NAME).map(str::to_string))],
    );

    ApmConfig::from_parts(
        default_service_name,
        server_url,
        secret_token,
        environment,
        service_name,
    )
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// First layer with a concrete value wins; the winner is logged so a
/// misbehaving deployment can be diagnosed from debug logs alone.
fn pick<const N: usize>(
    field: &'static str,
    candidates: [(&'static str, Option<String>); N],
) -> Option<String> {
    for (source, value) in candidates {
        if let Some(value) = value {
            tracing::debug!(field = field, source = source, "Resolved configuration field");
            return Some(value);
        }
    }
    None
}
