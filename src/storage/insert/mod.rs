//! Batched record insertion.
//!
//! [`BatchInserter`] writes records either sequentially (one connection, one
//! transaction for everything) or in parallel (fixed-size chunks, each its own
//! transaction on its own connection, at most `max_workers` at once). Within a
//! transaction rows go out as multi-row INSERT statements of up to
//! `batch_size` rows.

mod chunk;
mod parallel;
mod statement;

use std::time::{Duration, Instant};

use log::{error, info, warn};
use strum_macros::Display;

use crate::config::ThreadingConfig;
use crate::error_handling::InsertError;
use crate::records::Record;
use crate::storage::connection::ConnectionProvider;
use crate::storage::dialect::validate_identifier;

use chunk::{chunk_ranges, validate_columns};
use parallel::{insert_chunks, ChunkJob};
use statement::insert_in_transaction;

/// Which insert path produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InsertMode {
    Sequential,
    Parallel,
}

/// Outcome of a successful insert.
#[derive(Debug, Clone)]
pub struct InsertReport {
    pub table: String,
    pub mode: InsertMode,
    /// Rows written; equals the number of input records.
    pub rows_inserted: u64,
    /// Transactions committed (1 for sequential inserts, 0 for empty input).
    pub chunks: usize,
    pub elapsed: Duration,
}

/// Writes records through a [`ConnectionProvider`].
#[derive(Clone, Debug)]
pub struct BatchInserter {
    provider: ConnectionProvider,
    batch_size: usize,
    threading: ThreadingConfig,
}

impl BatchInserter {
    pub fn new(provider: ConnectionProvider, batch_size: usize, threading: ThreadingConfig) -> Self {
        Self {
            provider,
            batch_size,
            threading,
        }
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Inserts all `records` on one connection in a single transaction.
    ///
    /// Either every record is committed or none is.
    pub async fn insert_sequential(
        &self,
        table: &str,
        records: &[Record],
    ) -> Result<InsertReport, InsertError> {
        let started = Instant::now();
        validate_identifier(table)?;
        if records.is_empty() {
            warn!("No records to insert into {table}, skipping");
            return Ok(empty_report(table, InsertMode::Sequential));
        }
        let columns = validate_columns(records)?;
        info!(
            "Inserting {} records into {table} sequentially (batch size {})",
            records.len(),
            self.batch_size
        );

        let mut conn = self.provider.acquire().await?;
        let result = insert_in_transaction(
            &mut conn,
            self.provider.driver(),
            table,
            &columns,
            records,
            self.batch_size,
        )
        .await;
        conn.release().await;

        match result {
            Ok(rows_inserted) => {
                info!("Inserted {rows_inserted} records into {table}");
                Ok(InsertReport {
                    table: table.to_string(),
                    mode: InsertMode::Sequential,
                    rows_inserted,
                    chunks: 1,
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                error!("Insert into {table} failed: {e}");
                Err(e)
            }
        }
    }

    /// Splits `records` into `chunk_size` chunks and inserts them concurrently,
    /// at most `max_workers` chunks at a time, each on its own connection and
    /// in its own transaction.
    ///
    /// Chunks commit in no particular order. If any chunk fails the whole call
    /// fails; chunks that committed before the failure are not undone.
    pub async fn insert_parallel(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> Result<InsertReport, InsertError> {
        let started = Instant::now();
        validate_identifier(table)?;
        if records.is_empty() {
            warn!("No records to insert into {table}, skipping");
            return Ok(empty_report(table, InsertMode::Parallel));
        }
        let columns = validate_columns(&records)?;

        let ThreadingConfig {
            max_workers,
            chunk_size,
            ..
        } = self.threading;
        let ranges = chunk_ranges(records.len(), chunk_size);
        let chunks = ranges.len();
        info!(
            "Starting parallel insert: {} records in {chunks} chunks using {max_workers} workers",
            records.len()
        );
        if let Some(pool) = self.provider.pool() {
            let max_connections = pool.inner().options().get_max_connections() as usize;
            if max_workers > max_connections {
                warn!(
                    "{max_workers} workers share {max_connections} pooled connections; workers will wait for connections"
                );
            }
        }

        let job = ChunkJob {
            provider: self.provider.clone(),
            table: table.to_string(),
            columns,
            records,
            batch_size: self.batch_size,
        };
        match insert_chunks(job, ranges, max_workers).await {
            Ok(rows_inserted) => {
                info!("Parallel insert complete: {rows_inserted} records inserted into {table}");
                Ok(InsertReport {
                    table: table.to_string(),
                    mode: InsertMode::Parallel,
                    rows_inserted,
                    chunks,
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                error!("Parallel insert into {table} failed: {e}");
                Err(e)
            }
        }
    }
}

fn empty_report(table: &str, mode: InsertMode) -> InsertReport {
    InsertReport {
        table: table.to_string(),
        mode,
        rows_inserted: 0,
        chunks: 0,
        elapsed: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::DatabaseError;
    use crate::records::{record, Value};
    use crate::storage::test_helpers::{count_rows, create_items_table, sqlite_provider};

    fn items(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                record([
                    ("name", Value::from(format!("item-{i}"))),
                    ("qty", Value::from(i as i64)),
                ])
            })
            .collect()
    }

    fn threading(max_workers: usize, chunk_size: usize) -> ThreadingConfig {
        ThreadingConfig {
            enable_threading: true,
            max_workers,
            chunk_size,
        }
    }

    #[test]
    fn test_insert_mode_display() {
        assert_eq!(InsertMode::Sequential.to_string(), "sequential");
        assert_eq!(InsertMode::Parallel.to_string(), "parallel");
    }

    #[tokio::test]
    async fn test_sequential_insert_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("seq.db"), None).await;
        create_items_table(&provider).await;

        let inserter = BatchInserter::new(provider.clone(), 7, threading(1, 10));
        let report = inserter.insert_sequential("items", &items(25)).await.unwrap();

        assert_eq!(report.rows_inserted, 25);
        assert_eq!(report.chunks, 1);
        assert_eq!(report.mode, InsertMode::Sequential);
        assert_eq!(count_rows(&provider, "items").await, 25);
    }

    #[tokio::test]
    async fn test_parallel_insert_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("par.db"), Some(3)).await;
        create_items_table(&provider).await;

        let inserter = BatchInserter::new(provider.clone(), 4, threading(3, 6));
        let report = inserter.insert_parallel("items", items(40)).await.unwrap();

        assert_eq!(report.rows_inserted, 40);
        assert_eq!(report.chunks, 7);
        assert_eq!(report.mode, InsertMode::Parallel);
        assert_eq!(count_rows(&provider, "items").await, 40);
        provider.close().await;
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("empty.db"), None).await;
        let inserter = BatchInserter::new(provider, 10, threading(2, 10));

        let report = inserter.insert_sequential("items", &[]).await.unwrap();
        assert_eq!(report.rows_inserted, 0);
        assert_eq!(report.chunks, 0);

        let report = inserter.insert_parallel("items", Vec::new()).await.unwrap();
        assert_eq!(report.rows_inserted, 0);
    }

    #[tokio::test]
    async fn test_sequential_failure_rolls_back_everything() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("rollback.db"), None).await;
        create_items_table(&provider).await;

        let mut records = items(10);
        // qty is NOT NULL
        records[8].insert("qty".into(), Value::Null);

        let inserter = BatchInserter::new(provider.clone(), 3, threading(1, 10));
        let result = inserter.insert_sequential("items", &records).await;
        assert!(matches!(
            result,
            Err(InsertError::Database(DatabaseError::SqlError(_)))
        ));
        assert_eq!(count_rows(&provider, "items").await, 0);
    }

    #[tokio::test]
    async fn test_mismatched_columns_fail_before_any_sql() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("mismatch.db"), None).await;
        create_items_table(&provider).await;

        let mut records = items(5);
        records[3].remove("qty");

        let inserter = BatchInserter::new(provider.clone(), 10, threading(2, 2));
        let result = inserter.insert_parallel("items", records).await;
        assert!(matches!(
            result,
            Err(InsertError::ColumnMismatch { index: 3, .. })
        ));
        assert_eq!(count_rows(&provider, "items").await, 0);
    }

    #[tokio::test]
    async fn test_invalid_table_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("badname.db"), None).await;
        let inserter = BatchInserter::new(provider, 10, threading(2, 2));
        let result = inserter
            .insert_sequential("items; DROP TABLE items", &items(1))
            .await;
        assert!(matches!(
            result,
            Err(InsertError::Database(DatabaseError::InvalidIdentifier(_)))
        ));
    }
}
