//! Configuration types.
//!
//! This module defines the deserialized shape of the YAML configuration file
//! and the accessors that apply defaults to it.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use log::warn;
use serde::Deserialize;
use url::Url;

use crate::config::constants::*;
use crate::error_handling::ConfigError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    /// Parses a level name as written in the configuration file.
    ///
    /// Accepts the usual spellings case-insensitively, including `WARNING`
    /// and `CRITICAL` (mapped to `Warn` and `Error`).
    pub fn parse_config(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" | "critical" | "fatal" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Database driver behind an environment's connection settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// PostgreSQL (default)
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    /// SQLite; `dbname` is the database file path
    #[serde(alias = "sqlite3")]
    Sqlite,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_POSTGRES_PORT
}

/// Connection settings for one environment.
#[derive(Clone, PartialEq, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub driver: Driver,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database name, or the database file path for SQLite.
    #[serde(alias = "database")]
    pub dbname: String,
    #[serde(default)]
    pub sslmode: Option<String>,
}

impl ConnectionConfig {
    /// Settings for a SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            dbname: path.into(),
            sslmode: None,
        }
    }

    /// Renders the connection URL understood by `sqlx`.
    ///
    /// User name and password are percent-encoded. SQLite URLs open the file
    /// in read-write-create mode.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        match self.driver {
            Driver::Sqlite => Ok(format!("sqlite://{}?mode=rwc", self.dbname)),
            Driver::Postgres => {
                let mut url = Url::parse(&format!("postgres://{}:{}", self.host, self.port))
                    .map_err(|e| ConfigError::Invalid(format!("host '{}': {e}", self.host)))?;
                if let Some(user) = &self.user {
                    url.set_username(user)
                        .map_err(|_| ConfigError::Invalid(format!("user '{user}'")))?;
                }
                if let Some(password) = &self.password {
                    url.set_password(Some(password))
                        .map_err(|_| ConfigError::Invalid("password".to_string()))?;
                }
                url.set_path(&format!("/{}", self.dbname.trim_start_matches('/')));
                if let Some(mode) = &self.sslmode {
                    url.query_pairs_mut().append_pair("sslmode", mode);
                }
                Ok(url.into())
            }
        }
    }
}

// Passwords stay out of logs and error output.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dbname", &self.dbname)
            .field("sslmode", &self.sslmode)
            .finish()
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.driver {
            Driver::Sqlite => write!(f, "sqlite:{}", self.dbname),
            Driver::Postgres => match &self.user {
                Some(user) => write!(
                    f,
                    "postgres://{user}@{}:{}/{}",
                    self.host, self.port, self.dbname
                ),
                None => write!(f, "postgres://{}:{}/{}", self.host, self.port, self.dbname),
            },
        }
    }
}

/// Connection pool bounds and timeouts (`app.connection_pool`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    /// Seconds to wait for a connection before failing with a timeout.
    pub connection_timeout: u64,
    /// Seconds before an idle pooled connection is closed.
    pub idle_timeout: u64,
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT_SECS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

/// Parallel insert settings (`app.threading`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    pub enable_threading: bool,
    pub max_workers: usize,
    pub chunk_size: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            enable_threading: false,
            max_workers: DEFAULT_MAX_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct EnvironmentSection {
    current: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    table_name: Option<String>,
    /// Every other key under `database` names an environment.
    #[serde(flatten)]
    environments: HashMap<String, ConnectionConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct AppSection {
    log_level: Option<String>,
    batch_size: Option<usize>,
    connection_pool: PoolConfig,
    threading: ThreadingConfig,
}

/// Parsed configuration file.
///
/// Built by [`ConfigLoader`](crate::config::ConfigLoader) and shared behind an
/// `Arc`; every component receives it explicitly instead of reading a global.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    environment: EnvironmentSection,
    database: DatabaseSection,
    app: AppSection,
}

impl AppConfig {
    /// Parses a YAML document without touching the filesystem.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Err(ConfigError::Malformed(
                "configuration document is empty".to_string(),
            ));
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Name of the active environment.
    ///
    /// Falls back to `development` when `environment.current` is not set.
    pub fn current_environment(&self) -> &str {
        match self.environment.current.as_deref() {
            Some(env) => env,
            None => {
                warn!(
                    "No environment.current in configuration, using default environment: {DEFAULT_ENVIRONMENT}"
                );
                DEFAULT_ENVIRONMENT
            }
        }
    }

    /// Connection settings for `environment`, or for the current environment
    /// when `None`.
    pub fn database_config(
        &self,
        environment: Option<&str>,
    ) -> Result<&ConnectionConfig, ConfigError> {
        let environment = environment.unwrap_or_else(|| self.current_environment());
        self.database
            .environments
            .get(environment)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(environment.to_string()))
    }

    /// Environment names that have connection settings, sorted.
    pub fn environments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .database
            .environments
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn table_name(&self) -> Result<&str, ConfigError> {
        self.database
            .table_name
            .as_deref()
            .ok_or(ConfigError::MissingKey("database.table_name"))
    }

    /// Configured log level; unknown names fall back to `Info`.
    pub fn log_level(&self) -> LogLevel {
        let raw = self.app.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        LogLevel::parse_config(raw).unwrap_or_else(|| {
            warn!("Unknown log level '{raw}' in configuration, using INFO");
            LogLevel::Info
        })
    }

    pub fn batch_size(&self) -> usize {
        self.app.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn pool_config(&self) -> &PoolConfig {
        &self.app.connection_pool
    }

    pub fn threading_config(&self) -> &ThreadingConfig {
        &self.app.threading
    }

    pub fn is_threading_enabled(&self) -> bool {
        self.app.threading.enable_threading
    }

    /// Rejects tuning values that would make inserts impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size() == 0 {
            return Err(ConfigError::Invalid("app.batch_size must be > 0".into()));
        }
        let threading = self.threading_config();
        if threading.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "app.threading.chunk_size must be > 0".into(),
            ));
        }
        if threading.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "app.threading.max_workers must be > 0".into(),
            ));
        }
        let pool = self.pool_config();
        if pool.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "app.connection_pool.max_connections must be > 0".into(),
            ));
        }
        if pool.min_connections > pool.max_connections {
            return Err(ConfigError::Invalid(format!(
                "app.connection_pool.min_connections ({}) exceeds max_connections ({})",
                pool.min_connections, pool.max_connections
            )));
        }
        Ok(())
    }
}
