// src/store/mod.rs

use anyhow::{bail, Context, Result};
use tracing::{debug, info, instrument};

use crate::record::NameRecord;

pub mod sql;

pub use sql::SqlStore;

/// Table that receives extracted records and feeds the contact sync.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Write every record in `chunk` with a single bulk insert.
    async fn insert_chunk(&mut self, chunk: &[NameRecord]) -> Result<()>;

    /// Total number of rows in the table.
    async fn count(&mut self) -> Result<u64>;

    /// The first `limit` rows in table order.
    async fn fetch_prefix(&mut self, limit: usize) -> Result<Vec<NameRecord>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub records: usize,
    pub chunks: usize,
    pub skipped: u64,
}

/// Insert `records` in consecutive chunks of `chunk_size`, awaiting each
/// insert before issuing the next. Nothing wraps the sequence: when a chunk
/// fails the earlier chunks stay written and the error names the chunk.
#[instrument(level = "info", skip(store, records), fields(records = records.len()))]
pub async fn insert_in_chunks<S: RecordStore>(
    store: &mut S,
    records: &[NameRecord],
    chunk_size: usize,
) -> Result<LoadReport> {
    if chunk_size == 0 {
        bail!("chunk size must be at least 1");
    }
    if records.is_empty() {
        info!("no records to insert");
        return Ok(LoadReport::default());
    }

    let total_chunks = records.len().div_ceil(chunk_size);
    info!(total_chunks, chunk_size, "inserting records");

    for (index, chunk) in records.chunks(chunk_size).enumerate() {
        store.insert_chunk(chunk).await.with_context(|| {
            format!(
                "inserting chunk {}/{} ({} records)",
                index + 1,
                total_chunks,
                chunk.len()
            )
        })?;
        debug!(chunk = index + 1, total_chunks, rows = chunk.len(), "chunk inserted");
    }

    info!(records = records.len(), "database insertion complete");
    Ok(LoadReport {
        records: records.len(),
        chunks: total_chunks,
        skipped: 0,
    })
}
