use std::sync::Arc;

use futures::stream::BoxStream;
use landed_domain::Record;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;

pub type RecordStream = BoxStream<'static, Result<Record, SourceError>>;

/// Shared slot a running extraction writes its final cursor into once the
/// underlying page/batch/file loop completes (§4.3 "Cursor"). The runner
/// reads it only after the returned [`RecordStream`] has been fully drained.
#[derive(Clone, Default)]
pub struct CursorCell(Arc<Mutex<Option<String>>>);

impl CursorCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, cursor: impl Into<String>) {
        *self.0.lock().await = Some(cursor.into());
    }

    pub async fn get(&self) -> Option<String> {
        self.0.lock().await.clone()
    }
}

/// Source-specific record producer (§4.3). Implementations must not write
/// files, touch storage, or choose partition paths — only produce records
/// and, once exhausted, a resumption cursor via the returned [`CursorCell`].
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn extract(&self, cancel: CancellationToken) -> Result<(RecordStream, CursorCell), SourceError>;
}
