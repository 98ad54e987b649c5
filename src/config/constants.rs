//! Configuration constants.
//!
//! Defaults applied when the configuration file leaves a value out, plus
//! dialect limits used when sizing INSERT statements.

/// Configuration file used when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Environment used when `environment.current` is absent.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Log level used when `app.log_level` is absent.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Rows grouped into one multi-row INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 100;

// Connection pool defaults
pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Seconds to wait for a connection before giving up
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
/// Seconds an idle pooled connection is kept open
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

// Worker defaults
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default Postgres port.
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_HOST: &str = "localhost";

/// Postgres encodes the parameter count of a statement as a u16.
pub const POSTGRES_MAX_BIND_PARAMS: usize = 65_535;
/// SQLITE_MAX_VARIABLE_NUMBER for SQLite >= 3.32.
pub const SQLITE_MAX_BIND_PARAMS: usize = 32_766;
