use tracing::{error, info, warn};

use crate::event::HookEvent;

/// A user-registered hook sink (§4.10). Sink failures are logged and never
/// fail the run — the dispatcher enforces this, not the sink implementation.
#[async_trait::async_trait]
pub trait HookSink: Send + Sync {
    async fn handle(&self, event: &HookEvent) -> Result<(), HookSinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HookSinkError {
    #[error("http hook delivery failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("hook sink error: {0}")]
    Other(String),
}

/// Default sink: logs every event through `tracing` at the level matching
/// its severity. Always registered first so a run never has zero observers.
pub struct TracingSink;

#[async_trait::async_trait]
impl HookSink for TracingSink {
    async fn handle(&self, event: &HookEvent) -> Result<(), HookSinkError> {
        match event {
            HookEvent::RunFailed { kind, message, .. } => {
                error!(kind = ?kind, message = %message, "run_failed");
            }
            HookEvent::RunStarted { system, entity, .. } => {
                info!(system = %system, entity = %entity, "run_started");
            }
            HookEvent::RunCompleted { record_count, chunk_count, .. } => {
                info!(record_count, chunk_count, "run_completed");
            }
            HookEvent::PartitionWritten { path, record_count, chunk_count, bytes, .. } => {
                info!(path = %path, record_count, chunk_count, bytes, "partition_written");
            }
            HookEvent::SchemaSnapshot { path, columns, .. } => {
                info!(path = %path, column_count = columns.len(), "schema_snapshot");
            }
        }
        Ok(())
    }
}

/// Posts every event as a JSON body to a configured URL. Used for webhook
/// integrations; never blocks the run past its own HTTP timeout.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into() }
    }
}

#[async_trait::async_trait]
impl HookSink for HttpSink {
    async fn handle(&self, event: &HookEvent) -> Result<(), HookSinkError> {
        let response = self.client.post(&self.url).json(event).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), url = %self.url, "hook webhook returned non-success status");
        }
        Ok(())
    }
}
