use futures::stream::StreamExt;
use landed_domain::{FileFormat, Record, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::{CursorCell, RecordStream, SourceAdapter};
use crate::error::SourceError;
use crate::json::json_object_to_record;

const DEFAULT_CHANNEL_DEPTH: usize = 256;

#[derive(Clone)]
pub struct FileAdapter {
    glob: String,
    format: FileFormat,
    projection: Option<Vec<String>>,
    row_limit: Option<u64>,
}

impl FileAdapter {
    pub fn new(glob: String, format: FileFormat, projection: Option<Vec<String>>, row_limit: Option<u64>) -> Self {
        Self { glob, format, projection, row_limit }
    }

    /// No retries beyond OS-level open retry (§4.3): a failed open or parse
    /// is reported on the channel and ends the stream for that file.
    async fn run(self, tx: mpsc::Sender<Result<Record, SourceError>>, cancel: CancellationToken) {
        let mut emitted: u64 = 0;
        let paths = match glob::glob(&self.glob) {
            Ok(paths) => paths,
            Err(err) => {
                let _ = tx.send(Err(err.into())).await;
                return;
            }
        };

        for entry in paths {
            if cancel.is_cancelled() {
                return;
            }
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    let _ = tx.send(Err(SourceError::Io(err.into_error()))).await;
                    continue;
                }
            };
            debug!(path = %path.display(), "streaming file source");

            let records = match self.format {
                FileFormat::Csv => read_delimited(&path, b','),
                FileFormat::Tsv => read_delimited(&path, b'\t'),
                FileFormat::Json => read_json(&path),
                FileFormat::JsonLines => read_json_lines(&path),
                FileFormat::Columnar => read_columnar(&path),
            };

            let records = match records {
                Ok(records) => records,
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    continue;
                }
            };

            for mut record in records {
                if let Some(limit) = self.row_limit {
                    if emitted >= limit {
                        return;
                    }
                }
                if let Some(columns) = &self.projection {
                    record.retain(|k, _| columns.contains(k));
                }
                emitted += 1;
                if tx.send(Ok(record)).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn read_delimited(path: &std::path::Path, delimiter: u8) -> Result<Vec<Record>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().delimiter(delimiter).has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.clone(), infer_cell(cell)))
            .collect();
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

/// §4.3 file source `columnar` format: reuses the chunk writer's own Parquet
/// reader rather than a second arrow/parquet round-trip, so a file source
/// reading a columnar export and the Silver engine reading a Bronze
/// columnar chunk decode identically.
fn read_columnar(path: &std::path::Path) -> Result<Vec<Record>, SourceError> {
    Ok(landed_chunk::read_columnar_chunk(path)?)
}

fn read_json(path: &std::path::Path) -> Result<Vec<Record>, SourceError> {
    let content = std::fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&content)?;
    let items = parsed.as_array().cloned().unwrap_or_else(|| vec![parsed]);
    Ok(items.into_iter().map(json_object_to_record).collect())
}

fn read_json_lines(path: &std::path::Path) -> Result<Vec<Record>, SourceError> {
    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: serde_json::Value = serde_json::from_str(line)?;
        records.push(json_object_to_record(parsed));
    }
    Ok(records)
}

#[async_trait::async_trait]
impl SourceAdapter for FileAdapter {
    async fn extract(&self, cancel: CancellationToken) -> Result<(RecordStream, CursorCell), SourceError> {
        let cursor_cell = CursorCell::new();
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_DEPTH);
        let worker = self.clone();
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            worker.run(tx, worker_cancel).await;
        });
        Ok((ReceiverStream::new(rx).boxed(), cursor_cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;
    use std::io::Write;

    #[tokio::test]
    async fn streams_csv_rows_with_projection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "id,name,extra").unwrap();
        writeln!(f, "1,a,x").unwrap();
        writeln!(f, "2,b,y").unwrap();

        let adapter = FileAdapter::new(
            path.to_string_lossy().to_string(),
            FileFormat::Csv,
            Some(vec!["id".to_string(), "name".to_string()]),
            None,
        );
        let (mut stream, _cursor) = adapter.extract(CancellationToken::new()).await.unwrap();
        let mut rows = Vec::new();
        while let Some(record) = stream.next().await {
            rows.push(record.unwrap());
        }
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].contains_key("extra"));
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn streams_columnar_rows_with_projection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        let records = vec![
            [
                ("id".to_string(), Value::Int(1)),
                ("name".to_string(), Value::Str("a".to_string())),
                ("extra".to_string(), Value::Str("x".to_string())),
            ]
            .into_iter()
            .collect(),
            [
                ("id".to_string(), Value::Int(2)),
                ("name".to_string(), Value::Str("b".to_string())),
                ("extra".to_string(), Value::Str("y".to_string())),
            ]
            .into_iter()
            .collect(),
        ];
        landed_chunk::write_columnar(&records, &path).unwrap();

        let adapter = FileAdapter::new(
            path.to_string_lossy().to_string(),
            FileFormat::Columnar,
            Some(vec!["id".to_string(), "name".to_string()]),
            None,
        );
        let (mut stream, _cursor) = adapter.extract(CancellationToken::new()).await.unwrap();
        let mut rows = Vec::new();
        while let Some(record) = stream.next().await {
            rows.push(record.unwrap());
        }
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].contains_key("extra"));
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(rows[1].get("name"), Some(&Value::Str("b".to_string())));
    }

    #[tokio::test]
    async fn honors_row_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"id": 1}}"#).unwrap();
        writeln!(f, r#"{{"id": 2}}"#).unwrap();
        writeln!(f, r#"{{"id": 3}}"#).unwrap();

        let adapter = FileAdapter::new(path.to_string_lossy().to_string(), FileFormat::JsonLines, None, Some(2));
        let (mut stream, _cursor) = adapter.extract(CancellationToken::new()).await.unwrap();
        let mut rows = Vec::new();
        while let Some(record) = stream.next().await {
            rows.push(record.unwrap());
        }
        assert_eq!(rows.len(), 2);
    }
}
