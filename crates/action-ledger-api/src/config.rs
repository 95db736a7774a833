//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use action_ledger_core::adapters::PostgrestConfig;
use action_ledger_core::storage::DEFAULT_TABLE_NAME;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::info;

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "ACTION_LEDGER_CONFIG_FILE";

/// Prefix for structured environment overrides, e.g. `ACTION_LEDGER__SERVER__PORT`
pub const ENV_PREFIX: &str = "ACTION_LEDGER";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Record store settings
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from files and the environment.
    ///
    /// Sources, later ones overriding earlier ones:
    ///  1. `/etc/action-ledger/service.yaml`, then `./config/service.yaml` (both optional)
    ///  2. the file named by `ACTION_LEDGER_CONFIG_FILE`, required when set
    ///  3. `ACTION_LEDGER__`-prefixed variables with `__` between path segments
    ///  4. `SUPABASE_URL`, `SUPABASE_KEY` and `SUPABASE_TABLE`
    ///
    /// The result is not validated; call [`ServiceConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name("/etc/action-ledger/service")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name("config/service")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Some(explicit_path) = non_empty_env(CONFIG_FILE_ENV) {
            info!(path = %explicit_path, "Loading configuration from explicit path");
            builder = builder.add_source(config::File::with_name(&explicit_path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("database.url", non_empty_env("SUPABASE_URL"))?
            .set_override_option("database.api_key", non_empty_env("SUPABASE_KEY"))?
            .set_override_option("database.table", non_empty_env("SUPABASE_TABLE"))?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Check that the configuration can start a working service
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }

        self.server.socket_addr()?;
        self.database.validate()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind to, IPv4 or IPv6 (`0.0.0.0`, `::`, `[::1]`)
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable compression
    pub enable_compression: bool,
}

impl ServerConfig {
    /// Listen address built from `host` and `port`
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host.trim().trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
            message: format!("server.host '{}' is not an IP address", self.host),
        })?;

        Ok(SocketAddr::from((ip, self.port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            shutdown_timeout_seconds: 30,
            max_body_size: 5 * 1024 * 1024, // 5MB
            enable_cors: true,
            enable_compression: true,
        }
    }
}

/// Record store (Supabase / PostgREST) configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Project URL
    pub url: String,

    /// Project API key
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Table holding the action records
    pub table: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "database.url (SUPABASE_URL)".to_string(),
            });
        }

        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "database.api_key (SUPABASE_KEY)".to_string(),
            });
        }

        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::Invalid {
            message: format!("database.url '{}' is not a valid URL: {}", self.url, e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                message: format!("database.url must use http or https, got '{}'", parsed.scheme()),
            });
        }

        if self.table.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "database.table must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Settings for the PostgREST gateway
    pub fn to_postgrest_config(&self) -> PostgrestConfig {
        PostgrestConfig::new(&self.url, &self.api_key)
            .with_table(&self.table)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: DEFAULT_TABLE_NAME.to_string(),
            timeout_seconds: 10,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("api_key", &"<REDACTED>")
            .field("table", &self.table)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
