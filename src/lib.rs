//! table_loader library: environment-aware table creation and batched inserts
//!
//! Reads per-environment database settings from a YAML file, creates the
//! destination table if it is missing, and inserts records in multi-row
//! batches, either sequentially in one transaction or in parallel chunks over
//! a bounded connection pool.
//!
//! # Example
//!
//! ```no_run
//! use table_loader::{record, ConfigLoader, Loader, Value};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new("config.yml").load()?;
//! let loader = Loader::new(config, None).await?;
//! loader.create_table(None).await?;
//!
//! let rows = vec![record([
//!     ("room_id", Value::from("R-1")),
//!     ("room_name", Value::from("Deluxe Twin")),
//! ])];
//! let report = loader.insert(rows, None).await?;
//! println!("Inserted {} rows into {}", report.rows_inserted, report.table);
//! loader.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime; parallel inserts spawn tasks onto it.

pub mod config;
pub mod error_handling;
pub mod initialization;
mod pipeline;
mod records;
pub mod storage;

// Re-export public API
pub use config::{AppConfig, ConfigLoader, ConnectionConfig, Driver, LogFormat, LogLevel};
pub use error_handling::{ConfigError, DatabaseError, InputError, InsertError, LoaderError};
pub use pipeline::Loader;
pub use records::{load_records, parse_records, record, Record, Value};
pub use storage::{InsertMode, InsertReport, TableSchema};
