//! Server configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A YAML file (optional)
//! 3. `FLASHDECK_*` environment variables, `__` separating nested keys
//!    (`FLASHDECK_SERVER__PORT=8080`, `FLASHDECK_STORAGE__BACKEND=postgres`)
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 5000
//! storage:
//!   backend: postgres
//!   database_url: postgres://flashdeck@localhost/flashdeck
//! session:
//!   ttl_secs: 86400
//!   secure_cookie: true
//! logging:
//!   level: info
//!   json: true
//! ```

use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "FLASHDECK";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub session: SessionSettings,
    pub listing: ListingSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Required for the postgres backend.
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
    /// Per-query timeout for the postgres backend.
    pub query_timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: None,
            pool_size: 10,
            connection_timeout_secs: 5,
            query_timeout_secs: 30,
        }
    }
}

/// Session cookie settings.
///
/// Sessions are held server-side; the cookie only carries an opaque key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    /// Session lifetime, also used as the cookie's `Max-Age`.
    pub ttl_secs: u64,
    /// Adds the `Secure` attribute; enable behind HTTPS.
    pub secure_cookie: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "flashdeck_session".to_string(),
            ttl_secs: 7 * 24 * 60 * 60,
            secure_cookie: false,
        }
    }
}

/// Page sizes for set listings and search.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingSettings {
    /// Page size for public listings when no `limit` is given.
    pub default_page_size: usize,
    /// Upper bound applied to any requested `limit`.
    pub max_page_size: usize,
    /// Result count for search when no `limit` is given.
    pub search_limit: usize,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 200,
            search_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MetricsSettings {
    /// Serve Prometheus metrics at `/metrics`.
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    /// One or more settings are out of range; `message` lists all of them.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Loads defaults, then `path`, then environment overrides, and
    /// validates the result.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::build(Some(path))
    }

    /// Loads defaults and environment overrides only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::build(None)
    }

    fn build(file: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ServerConfig::default())?);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }
        let loaded: ServerConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks every setting and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let mut problems = Vec::new();

        if self.server.port == 0 {
            problems.push("server.port must not be 0".to_string());
        }
        if self.server.body_limit_bytes == 0 {
            problems.push("server.body_limit_bytes must be greater than 0".to_string());
        }

        let has_url = self
            .storage
            .database_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if self.storage.backend == StorageBackend::Postgres && !has_url {
            problems.push("storage.database_url is required for the postgres backend".to_string());
        }
        if self.storage.pool_size == 0 {
            problems.push("storage.pool_size must be greater than 0".to_string());
        }

        if self.session.cookie_name.trim().is_empty() {
            problems.push("session.cookie_name must not be empty".to_string());
        }
        if self.session.ttl_secs == 0 {
            problems.push("session.ttl_secs must be greater than 0".to_string());
        }

        let listing = &self.listing;
        if [listing.default_page_size, listing.max_page_size, listing.search_limit].contains(&0) {
            problems.push("listing page sizes must be greater than 0".to_string());
        } else if listing.default_page_size > listing.max_page_size {
            problems.push(format!(
                "listing.default_page_size ({}) exceeds listing.max_page_size ({})",
                listing.default_page_size, listing.max_page_size
            ));
        }

        if self.logging.level.trim().parse::<tracing::Level>().is_err() {
            problems.push(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error",
                self.logging.level
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigLoadError::Invalid {
                message: problems.join("; "),
            })
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
