use futures::Stream;
use futures::StreamExt;
use landed_domain::{ChecksumsDocument, ChunkFormat, ChunkSummary, OutputSpec, Record, SchemaColumn, Value};
use landed_partition::chunk_file_name;
use landed_storage::StorageBackend;
use tracing::debug;

use crate::columnar::write_columnar;
use crate::error::ChunkError;
use crate::row::write_row_delimited;

/// Accumulated result of chunking and writing one partition's worth of
/// records (§4.5, §4.6 "per-chunk summary").
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    pub chunks: Vec<ChunkSummary>,
    pub checksums: ChecksumsDocument,
    pub chunk_count: u64,
    pub record_count: u64,
    pub byte_count: u64,
    pub schema: Vec<SchemaColumn>,
}

/// Buffers an incoming record stream, splits it into chunks per §4.5's
/// chunking rule, and writes each chunk — in every requested format — under
/// `staging_key`. Columnar is required; row-delimited is opt-in via
/// `output.format_set`.
///
/// Chunk *grouping* is always sequential (the rule depends on running
/// totals), but chunk *writing* parallelizes across up to
/// `output.parallel_workers` chunks at once when set — §4.7's chunk-level
/// parallel mode, opt-in and off by default. Sequence numbers are still
/// assigned in delivery order before any writing starts, so the on-disk
/// `part-NNNN` naming is unaffected by write order.
pub async fn write_chunks(
    backend: &dyn StorageBackend,
    output: &OutputSpec,
    staging_key: &str,
    mut records: impl Stream<Item = Record> + Unpin,
) -> Result<ChunkOutcome, ChunkError> {
    let mut groups: Vec<Vec<Record>> = Vec::new();
    let mut buffer: Vec<Record> = Vec::new();
    let mut buffer_bytes: u64 = 0;

    while let Some(record) = records.next().await {
        let record_bytes = estimate_bytes(&record);
        let would_overflow = !buffer.is_empty()
            && (buffer.len() as u64 + 1 > output.max_rows_per_chunk
                || buffer_bytes + record_bytes > output.max_bytes_per_chunk);

        if would_overflow {
            groups.push(std::mem::take(&mut buffer));
            buffer_bytes = 0;
        }

        buffer_bytes += record_bytes;
        buffer.push(record);
    }
    if !buffer.is_empty() {
        groups.push(buffer);
    }

    let mut outcome = ChunkOutcome::default();
    outcome.chunk_count = groups.len() as u64;

    let workers = output.parallel_workers.unwrap_or(1).max(1) as usize;
    let results: Vec<Result<ChunkWriteResult, ChunkError>> = if workers <= 1 {
        let mut out = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            out.push(flush_chunk(backend, output, staging_key, index as u32 + 1, group).await);
        }
        out
    } else {
        futures::stream::iter(groups.iter().enumerate())
            .map(|(index, group)| flush_chunk(backend, output, staging_key, index as u32 + 1, group))
            .buffer_unordered(workers)
            .collect()
            .await
    };

    for result in results {
        fold_chunk_result(&mut outcome, result?);
    }
    Ok(outcome)
}

/// One chunk's worth of per-format files, written independently of chunk
/// write order so results can be folded into `ChunkOutcome` deterministically
/// regardless of which chunk a parallel worker finished first.
struct ChunkWriteResult {
    record_count: u64,
    files: Vec<(ChunkSummary, String)>,
    schema: Vec<SchemaColumn>,
}

fn fold_chunk_result(outcome: &mut ChunkOutcome, result: ChunkWriteResult) {
    outcome.record_count += result.record_count;
    for column in result.schema {
        let merged = outcome
            .schema
            .iter()
            .position(|c| c.name == column.name)
            .map(|i| outcome.schema[i].column_type.join(column.column_type));
        match merged {
            Some(joined) => outcome.schema.iter_mut().find(|c| c.name == column.name).unwrap().column_type = joined,
            None => outcome.schema.push(column),
        }
    }
    for (summary, checksum) in result.files {
        outcome.byte_count += summary.byte_count;
        outcome.checksums.insert(summary.file_name.clone(), checksum);
        outcome.chunks.push(summary);
    }
}

async fn flush_chunk(
    backend: &dyn StorageBackend,
    output: &OutputSpec,
    staging_key: &str,
    sequence: u32,
    records: &[Record],
) -> Result<ChunkWriteResult, ChunkError> {
    let mut result = ChunkWriteResult { record_count: records.len() as u64, files: Vec::new(), schema: Vec::new() };

    for format in &output.format_set {
        let ext = match format {
            ChunkFormat::Columnar => "parquet",
            ChunkFormat::Row => "csv",
        };
        let file_name = chunk_file_name(sequence, ext);
        let scratch = tempfile::NamedTempFile::new()?;

        let columns = match format {
            ChunkFormat::Columnar => write_columnar(records, scratch.path())?,
            ChunkFormat::Row => write_row_delimited(records, scratch.path())?,
        };
        for column in columns {
            let merged = result
                .schema
                .iter()
                .position(|c| c.name == column.name)
                .map(|i| result.schema[i].column_type.join(column.column_type));
            match merged {
                Some(joined) => result.schema.iter_mut().find(|c| c.name == column.name).unwrap().column_type = joined,
                None => result.schema.push(column),
            }
        }

        let byte_count = tokio::fs::metadata(scratch.path()).await?.len();
        let checksum = landed_manifest::hex_sha256_file(scratch.path()).await?;
        let key = format!("{}/{file_name}", staging_key.trim_end_matches('/'));
        backend.put(&key, scratch.path()).await?;

        debug!(file = %file_name, rows = records.len(), bytes = byte_count, "wrote chunk");
        result.files.push((ChunkSummary { file_name, record_count: records.len() as u64, byte_count }, checksum));
    }
    Ok(result)
}

/// Rough in-memory size of a record, used only to decide when a chunk would
/// cross `max_bytes_per_chunk` — not a byte-exact measure of the eventual
/// encoded size.
fn estimate_bytes(record: &Record) -> u64 {
    record
        .iter()
        .map(|(k, v)| k.len() as u64 + value_bytes(v))
        .sum()
}

fn value_bytes(value: &Value) -> u64 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 8,
        Value::Float(_) => 8,
        Value::Str(s) => s.len() as u64,
        Value::Timestamp(_) => 8,
    }
}
