//! Error handling.
//!
//! Error types are split by concern:
//! - **Configuration**: missing, unreadable, or malformed files and unknown environments
//! - **Database**: connection timeouts and failures, invalid identifiers, SQL errors
//! - **Insert**: column-set mismatches and failed chunks
//! - **Input**: unreadable or invalid record files
//!
//! None of these are retried; they are logged where they occur and returned
//! to the caller, which decides whether to abort a larger pipeline.

mod types;

// Re-export public API
pub use types::{
    ConfigError, DatabaseError, InitializationError, InputError, InsertError, LoaderError,
};
