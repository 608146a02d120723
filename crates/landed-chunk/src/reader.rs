use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::compute;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{TimeZone, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use landed_domain::{MetadataDocument, Record, Value};
use landed_storage::StorageBackend;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::ChunkError;

const STREAM_CHANNEL_DEPTH: usize = 256;

/// Both formats a committed partition's chunks may be stored in (§4.5
/// "columnar is required; row-delimited is opt-in"). When a partition was
/// written in both, each chunk appears twice under a distinct extension but
/// describes the same logical rows — reading picks one, never both.
fn preferred_extension(metadata: &MetadataDocument) -> &'static str {
    if metadata.chunks.iter().any(|c| c.file_name.ends_with(".parquet")) {
        "parquet"
    } else {
        "csv"
    }
}

/// Streams a committed partition's records back one chunk at a time (§4.8
/// "Input: the Bronze partition ... streamed, never materialized whole").
/// Mirrors `landed_source::FileAdapter`'s own producer-task-plus-channel
/// shape: a spawned task does the blocking I/O, the caller gets an
/// ordinary `Stream`.
pub fn stream_partition_records(
    backend: Arc<dyn StorageBackend>,
    partition_key: String,
    metadata: MetadataDocument,
) -> BoxStream<'static, Result<Record, ChunkError>> {
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_DEPTH);
    tokio::spawn(async move {
        let ext = preferred_extension(&metadata);
        for chunk in metadata.chunks.iter().filter(|c| c.file_name.ends_with(ext)) {
            let key = format!("{}/{}", partition_key.trim_end_matches('/'), chunk.file_name);
            let scratch = match tempfile::NamedTempFile::new() {
                Ok(f) => f,
                Err(err) => {
                    let _ = tx.send(Err(ChunkError::from(err))).await;
                    return;
                }
            };
            if let Err(err) = backend.get(&key, scratch.path()).await {
                let _ = tx.send(Err(ChunkError::from(err))).await;
                return;
            }
            let records = if ext == "parquet" { read_columnar_chunk(scratch.path()) } else { read_row_chunk(scratch.path()) };
            match records {
                Ok(records) => {
                    for record in records {
                        if tx.send(Ok(record)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            }
        }
    });
    ReceiverStream::new(rx).boxed()
}

/// Reads one Parquet chunk back into records. Dictionary-encoded columns
/// (§4.5 "dictionary-typed columnar encoding") are cast back to plain Utf8
/// before extraction rather than hand-decoded, since `arrow::compute::cast`
/// already knows how.
pub fn read_columnar_chunk(path: &Path) -> Result<Vec<Record>, ChunkError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;
    let mut records = Vec::new();
    for batch in reader {
        records.extend(batch_to_records(&batch?)?);
    }
    Ok(records)
}

fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>, ChunkError> {
    let schema = batch.schema();
    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        let array = batch.column(idx);
        let normalized = if matches!(field.data_type(), DataType::Dictionary(_, _)) {
            compute::cast(array, &DataType::Utf8)?
        } else {
            array.clone()
        };
        columns.push((field.name().clone(), normalized));
    }

    let mut records = vec![Record::new(); batch.num_rows()];
    for (name, array) in &columns {
        for (row, record) in records.iter_mut().enumerate() {
            record.insert(name.clone(), array_value(array, row)?);
        }
    }
    Ok(records)
}

fn array_value(array: &ArrayRef, row: usize) -> Result<Value, ChunkError> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    match array.data_type() {
        DataType::Boolean => Ok(Value::Bool(downcast::<BooleanArray>(array)?.value(row))),
        DataType::Int64 => Ok(Value::Int(downcast::<Int64Array>(array)?.value(row))),
        DataType::Float64 => Ok(Value::Float(downcast::<Float64Array>(array)?.value(row))),
        DataType::Utf8 => Ok(Value::Str(downcast::<StringArray>(array)?.value(row).to_string())),
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let micros = downcast::<TimestampMicrosecondArray>(array)?.value(row);
            Ok(Value::Timestamp(Utc.timestamp_micros(micros).single().unwrap_or_else(|| Utc.timestamp_nanos(0))))
        }
        other => Err(ChunkError::Decode(format!("unsupported arrow type for read-back: {other:?}"))),
    }
}

fn downcast<'a, T: Array + 'static>(array: &'a ArrayRef) -> Result<&'a T, ChunkError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ChunkError::Decode("arrow array downcast mismatch".to_string()))
}

/// Reads one row-delimited chunk back into records, re-inferring types from
/// text with the same heuristic `landed_source::FileAdapter` uses for CSV
/// sources (int, then float, then bool, else string; empty cell is null).
pub fn read_row_chunk(path: &Path) -> Result<Vec<Record>, ChunkError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers.iter().zip(row.iter()).map(|(name, cell)| (name.clone(), infer_cell(cell))).collect();
        records.push(record);
    }
    Ok(records)
}

fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        return Value::Float(f);
    }
    if let Ok(b) = cell.parse::<bool>() {
        return Value::Bool(b);
    }
    Value::Str(cell.to_string())
}
