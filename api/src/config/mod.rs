/// Configuration module
///
/// Two shapes live here: `FileConfig`, the optional TOML layer loaded from
/// `configs/{APP__ENV}/default.toml` (APP__ prefixed variables override file
/// keys at load time), and `ResolvedConfig`, the immutable result of running
/// the resolver over every source. Services read `ResolvedConfig` only.
pub mod resolver;

use serde::Deserialize;
use std::env;

pub use resolver::{resolve, EnvSource, ResolveError, SecretSources};

/// Everything a service needs to start, resolved once at boot.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub telemetry: Option<ApmConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database_name: String,
}

/// APM settings; `None` at the `ResolvedConfig` level means telemetry
/// export stays off and the service runs with plain logs.
#[derive(Debug, Clone)]
pub struct ApmConfig {
    pub server_url: String,
    pub secret_token: Option<String>,
    pub environment: String,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub apm: ApmSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub secret_store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    /// Zero means "not set here"; the resolver falls through to the
    /// identity's static default.
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApmSettings {
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub secret_token: String,
    #[serde(default)]
    pub environment: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_store_mount")]
    pub mount: String,
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    #[serde(default)]
    pub role: String,
}

// Defaults
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_database_name() -> String {
    "registry".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_store_mount() -> String {
    "registry".to_string()
}

fn default_auth_method() -> String {
    "token".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: String::new(),
            username: String::new(),
            password: String::new(),
            name: default_database_name(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            mount: default_store_mount(),
            auth_method: default_auth_method(),
            role: String::new(),
        }
    }
}

impl LoggingConfig {
    pub(crate) fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            format: settings.format.clone(),
        }
    }
}

impl ResolvedConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn load_file_config() -> Result<FileConfig, config::ConfigError> {
    let env = env::var("APP__ENV").unwrap_or_else(|_| "dev".to_string());

    let mut builder = config::Config::builder();

    // Try to load TOML file, but don't fail if it doesn't exist
    let config_path = format!("configs/{}/default", env);
    if std::path::Path::new(&format!("{}.toml", config_path)).exists() {
        builder = builder.add_source(config::File::with_name(&config_path).required(false));
    }

    // Environment variables override with APP__ prefix
    builder = builder.add_source(
        config::Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

impl ApmConfig {
    /// APM export needs at least a server URL; everything else falls
    /// back to the service's advertised name and a dev environment.
    pub(crate) fn from_parts(
        default_service_name: &str,
        server_url: Option<String>,
        secret_token: Option<String>,
        environment: Option<String>,
        service_name: Option<String>,
    ) -> Option<Self> {
        let server_url = server_url?;
        Some(Self {
            server_url,
            secret_token,
            environment: environment.unwrap_or_else(|| "dev".to_string()),
            service_name: service_name.unwrap_or_else(|| default_service_name.to_string()),
        })
    }
}
