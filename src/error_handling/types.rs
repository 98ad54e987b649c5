//! Error type definitions.
//!
//! One enum per concern; [`LoaderError`] aggregates them for the facade and
//! the binary.

use std::path::PathBuf;
use std::time::Duration;

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors raised while loading or reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    Missing(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is empty, not YAML, or has the wrong shape.
    #[error("Malformed configuration: {0}")]
    Malformed(String),

    /// No connection settings exist for the requested environment.
    #[error("No database configuration for environment '{0}'")]
    EnvironmentNotFound(String),

    /// A required key is absent.
    #[error("Missing configuration key: {0}")]
    MissingKey(&'static str),

    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// No connection became available within the configured timeout.
    #[error("Timed out after {0:?} waiting for a database connection")]
    ConnectionTimeout(Duration),

    /// The database could not be reached or refused the connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailure(#[source] sqlx::Error),

    /// The connection settings could not be turned into a URL.
    #[error("Invalid connection settings: {0}")]
    Settings(#[from] ConfigError),

    /// A table or column name that cannot be safely placed in SQL.
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Error types for batch inserts.
#[derive(Error, Debug)]
pub enum InsertError {
    /// A record's column set differs from the first record's.
    #[error("Record {index} has columns {found:?}, expected {expected:?}")]
    ColumnMismatch {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// The records carry no columns at all.
    #[error("Records have no columns to insert")]
    NoColumns,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// One chunk of a parallel insert failed. Rows of chunks that committed
    /// before or alongside it stay in the table.
    #[error("Chunk {chunk} failed ({committed_rows} rows from other chunks were committed): {source}")]
    ChunkFailed {
        chunk: usize,
        committed_rows: u64,
        #[source]
        source: Box<InsertError>,
    },

    /// A worker task panicked or was aborted.
    #[error("Insert worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<sqlx::Error> for InsertError {
    fn from(e: sqlx::Error) -> Self {
        InsertError::Database(DatabaseError::SqlError(e))
    }
}

/// Errors raised while reading records from an input file.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `line` is 1-based; 0 means the whole document was one JSON array.
    #[error("Invalid record at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error returned by [`Loader`](crate::Loader).
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error(transparent)]
    Input(#[from] InputError),
}
