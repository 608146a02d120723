use std::sync::Arc;

use futures::stream::StreamExt;
use landed_domain::{Record, ResilienceSpec, Value};
use landed_resilience::{Gate, ResilienceRegistry};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{Column, Row, TypeInfo};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::{CursorCell, RecordStream, SourceAdapter};
use crate::error::SourceError;

const DEFAULT_CHANNEL_DEPTH: usize = 64;

#[derive(Clone)]
pub struct SqlAdapter {
    connection_ref: String,
    query: String,
    watermark_column: Option<String>,
    last_watermark: Option<String>,
    batch_size: u32,
    identity: String,
    resilience: ResilienceSpec,
    registry: Arc<ResilienceRegistry>,
}

impl SqlAdapter {
    pub fn new(
        connection_ref: String,
        query: String,
        watermark_column: Option<String>,
        last_watermark: Option<String>,
        batch_size: u32,
        identity: String,
        resilience: ResilienceSpec,
        registry: Arc<ResilienceRegistry>,
    ) -> Self {
        static INSTALL_DRIVERS: std::sync::Once = std::sync::Once::new();
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
        Self {
            connection_ref,
            query,
            watermark_column,
            last_watermark,
            batch_size,
            identity,
            resilience,
            registry,
        }
    }

    async fn run(
        self,
        tx: mpsc::Sender<Result<Record, SourceError>>,
        cursor_cell: CursorCell,
        cancel: CancellationToken,
    ) {
        if let Err(err) = self.drive(&tx, &cursor_cell, &cancel).await {
            let _ = tx.send(Err(err)).await;
        }
    }

    async fn drive(
        &self,
        tx: &mpsc::Sender<Result<Record, SourceError>>,
        cursor_cell: &CursorCell,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        let gate = Gate::new(&self.identity, &self.resilience, &self.registry).await;

        let pool = gate.call(cancel, || connect(&self.connection_ref)).await?;

        let mut watermark = self.last_watermark.clone();
        let mut last_seen: Option<String> = None;
        let mut offset: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let rows: Vec<AnyRow> = gate
                .call(cancel, || fetch_batch(&pool, &self.query, watermark.as_deref(), self.batch_size, offset))
                .await?;

            if rows.is_empty() {
                break;
            }
            let fetched = rows.len() as u32;

            for row in rows {
                let record = row_to_record(&row)?;
                if let Some(column) = &self.watermark_column {
                    if let Some(value) = record.get(column) {
                        last_seen = Some(cell_to_cursor(value));
                    }
                }
                if tx.send(Ok(record)).await.is_err() {
                    return Ok(());
                }
            }

            if self.watermark_column.is_some() {
                watermark = last_seen.clone();
            }
            offset += fetched;
            if fetched < self.batch_size {
                break;
            }
        }

        if let Some(cursor) = last_seen {
            cursor_cell.set(cursor).await;
        }
        Ok(())
    }
}

async fn connect(connection_ref: &str) -> Result<sqlx::any::AnyPool, SourceError> {
    let pool = AnyPoolOptions::new().max_connections(1).connect(connection_ref).await?;
    Ok(pool)
}

async fn fetch_batch(
    pool: &sqlx::any::AnyPool,
    query: &str,
    watermark: Option<&str>,
    batch_size: u32,
    offset: u32,
) -> Result<Vec<AnyRow>, SourceError> {
    let mut builder = sqlx::query(query);
    if let Some(watermark) = watermark {
        builder = builder.bind(watermark.to_string());
    }
    builder = builder.bind(batch_size as i64).bind(offset as i64);
    let rows = builder.fetch_all(pool).await?;
    debug!(fetched = rows.len(), offset, "fetched sql batch");
    Ok(rows)
}

fn row_to_record(row: &AnyRow) -> Result<Record, SourceError> {
    let mut record = Record::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let value = decode_column(row, column)?;
        record.insert(name, value);
    }
    Ok(record)
}

fn decode_column(row: &AnyRow, column: &sqlx::any::AnyColumn) -> Result<Value, SourceError> {
    let ordinal = column.ordinal();
    match column.type_info().name() {
        "BOOL" | "BOOLEAN" => Ok(row.try_get::<Option<bool>, _>(ordinal)?.map(Value::Bool).unwrap_or(Value::Null)),
        "INT2" | "INT4" | "INT8" | "INTEGER" | "BIGINT" | "SMALLINT" => {
            Ok(row.try_get::<Option<i64>, _>(ordinal)?.map(Value::Int).unwrap_or(Value::Null))
        }
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" | "NUMERIC" => {
            Ok(row.try_get::<Option<f64>, _>(ordinal)?.map(Value::Float).unwrap_or(Value::Null))
        }
        _ => Ok(row.try_get::<Option<String>, _>(ordinal)?.map(Value::Str).unwrap_or(Value::Null)),
    }
}

fn cell_to_cursor(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Timestamp(t) => t.to_rfc3339(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
    }
}

#[async_trait::async_trait]
impl SourceAdapter for SqlAdapter {
    async fn extract(&self, cancel: CancellationToken) -> Result<(RecordStream, CursorCell), SourceError> {
        let cursor_cell = CursorCell::new();
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_DEPTH);
        let worker = self.clone();
        let worker_cursor = cursor_cell.clone();
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            worker.run(tx, worker_cursor, worker_cancel).await;
        });
        Ok((ReceiverStream::new(rx).boxed(), cursor_cell))
    }
}
