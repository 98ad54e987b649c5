//! Chunk fan-out across a bounded set of workers.

use std::ops::Range;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error_handling::InsertError;
use crate::records::Record;
use crate::storage::connection::ConnectionProvider;

use super::statement::insert_in_transaction;

/// Everything a worker needs, shared across all chunk tasks.
pub(super) struct ChunkJob {
    pub provider: ConnectionProvider,
    pub table: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub batch_size: usize,
}

enum ChunkOutcome {
    Inserted(u64),
    /// Not started because another chunk had already failed.
    Skipped,
    Failed(InsertError),
}

/// Inserts each range of `job.records` as its own transaction, at most
/// `max_workers` at a time.
///
/// The first failure cancels chunks that have not started; chunks already
/// running finish and their rows stay committed. The returned error names
/// the failed chunk and how many rows were committed regardless.
pub(super) async fn insert_chunks(
    job: ChunkJob,
    ranges: Vec<Range<usize>>,
    max_workers: usize,
) -> Result<u64, InsertError> {
    let job = Arc::new(job);
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for (index, range) in ranges.into_iter().enumerate() {
        let job = Arc::clone(&job);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                return (index, ChunkOutcome::Skipped);
            };
            if cancel.is_cancelled() {
                return (index, ChunkOutcome::Skipped);
            }

            match insert_chunk(&job, index, range).await {
                Ok(count) => (index, ChunkOutcome::Inserted(count)),
                Err(e) => {
                    cancel.cancel();
                    (index, ChunkOutcome::Failed(e))
                }
            }
        });
    }

    let mut committed = 0u64;
    let mut skipped = 0usize;
    let mut first_failure: Option<(Option<usize>, InsertError)> = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, ChunkOutcome::Inserted(count))) => committed += count,
            Ok((_, ChunkOutcome::Skipped)) => skipped += 1,
            Ok((index, ChunkOutcome::Failed(e))) => {
                error!("Worker for chunk {index} failed: {e}");
                if first_failure.is_none() {
                    first_failure = Some((Some(index), e));
                }
            }
            Err(join_error) => {
                cancel.cancel();
                error!("Insert worker panicked: {join_error}");
                if first_failure.is_none() {
                    let panicked = InsertError::WorkerPanicked(join_error.to_string());
                    first_failure = Some((None, panicked));
                }
            }
        }
    }

    match first_failure {
        None => Ok(committed),
        Some((chunk, source)) => {
            if skipped > 0 {
                warn!("Skipped {skipped} chunks after the first failure");
            }
            if committed > 0 {
                warn!(
                    "{committed} rows from completed chunks remain committed in {}",
                    job.table
                );
            }
            match chunk {
                Some(chunk) => Err(InsertError::ChunkFailed {
                    chunk,
                    committed_rows: committed,
                    source: Box::new(source),
                }),
                None => Err(source),
            }
        }
    }
}

/// One worker's unit of work: own connection, one transaction, release.
async fn insert_chunk(
    job: &ChunkJob,
    index: usize,
    range: Range<usize>,
) -> Result<u64, InsertError> {
    let rows = &job.records[range];
    let mut conn = job.provider.acquire().await?;
    debug!("Chunk {index}: acquired connection for {} rows", rows.len());

    let result = insert_in_transaction(
        &mut conn,
        job.provider.driver(),
        &job.table,
        &job.columns,
        rows,
        job.batch_size,
    )
    .await;
    conn.release().await;

    if let Ok(count) = &result {
        info!("Chunk {index}: inserted {count} rows into {}", job.table);
    }
    result
}
