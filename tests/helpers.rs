// Shared test helpers: YAML fixtures pointing at SQLite files in a temp dir.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;
use table_loader::{record, AppConfig, ConfigLoader, Record, Value};

/// Threading section of a generated config.
#[allow(dead_code)] // Used by other test files
pub struct Threading {
    pub enabled: bool,
    pub max_workers: usize,
    pub chunk_size: usize,
}

#[allow(dead_code)]
impl Threading {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_workers: 4,
            chunk_size: 1000,
        }
    }

    pub fn enabled(max_workers: usize, chunk_size: usize) -> Self {
        Self {
            enabled: true,
            max_workers,
            chunk_size,
        }
    }
}

/// Renders a config with `development` and `staging` SQLite environments.
pub fn config_yaml(dir: &Path, batch_size: usize, threading: &Threading, max_connections: u32) -> String {
    format!(
        r#"
environment:
  current: development
database:
  table_name: room_listing
  development:
    driver: sqlite
    dbname: '{dev}'
  staging:
    driver: sqlite
    dbname: '{staging}'
app:
  log_level: DEBUG
  batch_size: {batch_size}
  connection_pool:
    min_connections: 1
    max_connections: {max_connections}
    connection_timeout: 10
    idle_timeout: 60
  threading:
    enable_threading: {enabled}
    max_workers: {max_workers}
    chunk_size: {chunk_size}
"#,
        dev = dir.join("dev.db").display(),
        staging = dir.join("staging.db").display(),
        enabled = threading.enabled,
        max_workers = threading.max_workers,
        chunk_size = threading.chunk_size,
    )
}

/// Writes `config.yml` into `dir` and returns its path.
#[allow(dead_code)]
pub fn write_config(dir: &Path, batch_size: usize, threading: &Threading, max_connections: u32) -> PathBuf {
    let path = dir.join("config.yml");
    std::fs::write(&path, config_yaml(dir, batch_size, threading, max_connections))
        .expect("Failed to write config");
    path
}

/// Loads the config written by [`write_config`].
#[allow(dead_code)]
pub fn load_config(dir: &Path, batch_size: usize, threading: &Threading, max_connections: u32) -> Arc<AppConfig> {
    let path = write_config(dir, batch_size, threading, max_connections);
    ConfigLoader::new(path).load().expect("Failed to load config")
}

/// Room listing rows with distinct room ids.
#[allow(dead_code)]
pub fn room_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            record([
                ("room_id", Value::from(format!("R-{i}"))),
                ("check_in_date", Value::from("2024-05-01")),
                ("room_name", Value::from(format!("Room {i}"))),
                ("price", Value::from(100.0 + i as f64)),
                ("rating", Value::Null),
                ("hotel_name", Value::from("Harbour View")),
            ])
        })
        .collect()
}

/// Opens the SQLite file directly, bypassing the crate under test.
#[allow(dead_code)]
pub async fn open_sqlite(path: &Path) -> SqlitePool {
    SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .expect("Failed to open SQLite database")
}

#[allow(dead_code)]
pub async fn count_rows(path: &Path, table: &str) -> i64 {
    let pool = open_sqlite(path).await;
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&pool)
        .await
        .expect("Failed to count rows");
    pool.close().await;
    count
}
