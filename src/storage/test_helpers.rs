//! Shared test helpers for storage module tests.

use std::path::Path;
use std::time::Duration;

use crate::config::{ConnectionConfig, PoolConfig};
use crate::storage::connection::ConnectionProvider;

/// Connection settings for a SQLite database file at `path`.
pub fn sqlite_config(path: &Path) -> ConnectionConfig {
    ConnectionConfig::sqlite(path.to_string_lossy())
}

/// A provider for a SQLite file: pooled with `max_connections` when given,
/// otherwise one dedicated connection per use.
pub async fn sqlite_provider(path: &Path, max_connections: Option<u32>) -> ConnectionProvider {
    let config = sqlite_config(path);
    match max_connections {
        Some(max_connections) => {
            let pool_config = PoolConfig {
                min_connections: 1,
                max_connections,
                connection_timeout: 10,
                idle_timeout: 60,
            };
            ConnectionProvider::pooled(&config, &pool_config)
                .await
                .expect("Failed to open test pool")
        }
        None => ConnectionProvider::single(config, Duration::from_secs(10)),
    }
}

/// Creates `items (id, name TEXT NOT NULL, qty INTEGER NOT NULL)`.
pub async fn create_items_table(provider: &ConnectionProvider) {
    let mut conn = provider.acquire().await.expect("Failed to connect");
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            qty INTEGER NOT NULL
        )",
    )
    .execute(&mut *conn)
    .await
    .expect("Failed to create items table");
    conn.release().await;
}

/// Number of rows in `table`.
pub async fn count_rows(provider: &ConnectionProvider, table: &str) -> i64 {
    let mut conn = provider.acquire().await.expect("Failed to connect");
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *conn)
        .await
        .expect("Failed to count rows");
    conn.release().await;
    count
}
