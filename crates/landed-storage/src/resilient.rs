use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use landed_domain::ResilienceSpec;
use landed_resilience::{Gate, ResilienceRegistry};
use tokio_util::sync::CancellationToken;

use crate::driver::StorageBackend;
use crate::error::StorageError;

/// Wraps a [`StorageBackend`] with the retry/breaker/rate-limiter composition
/// from §4.2 ("Composition") and §4.7 step 4 ("retry/breaker wraps each
/// adapter call and each storage `put`"). `list` is passed straight through:
/// it yields a lazy, restartable sequence rather than a single fallible call,
/// so wrapping it per-item would retry already-delivered keys.
pub struct ResilientBackend {
    inner: Arc<dyn StorageBackend>,
    identity: String,
    resilience: ResilienceSpec,
    registry: Arc<ResilienceRegistry>,
    cancel: CancellationToken,
}

impl ResilientBackend {
    pub fn new(
        inner: Arc<dyn StorageBackend>,
        identity: impl Into<String>,
        resilience: ResilienceSpec,
        registry: Arc<ResilienceRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self { inner, identity: identity.into(), resilience, registry, cancel }
    }

    async fn gate(&self) -> Gate<'_> {
        Gate::new(&self.identity, &self.resilience, &self.registry).await
    }
}

#[async_trait]
impl StorageBackend for ResilientBackend {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    async fn put(&self, remote_key: &str, local_file: &Path) -> Result<(), StorageError> {
        let gate = self.gate().await;
        gate.call(&self.cancel, || self.inner.put(remote_key, local_file)).await.map_err(StorageError::from)
    }

    async fn get(&self, remote_key: &str, local_file: &Path) -> Result<(), StorageError> {
        let gate = self.gate().await;
        gate.call(&self.cancel, || self.inner.get(remote_key, local_file)).await.map_err(StorageError::from)
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<String, StorageError>> {
        self.inner.list(prefix)
    }

    async fn delete(&self, remote_key: &str) -> Result<(), StorageError> {
        let gate = self.gate().await;
        gate.call(&self.cancel, || self.inner.delete(remote_key)).await.map_err(StorageError::from)
    }

    async fn exists(&self, remote_key: &str) -> Result<bool, StorageError> {
        let gate = self.gate().await;
        gate.call(&self.cancel, || self.inner.exists(remote_key)).await.map_err(StorageError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalBackend;

    #[tokio::test]
    async fn put_through_resilient_wrapper_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let inner: Arc<dyn StorageBackend> = Arc::new(LocalBackend::new(root.path()));
        let backend = ResilientBackend::new(
            inner,
            "test.identity",
            ResilienceSpec::default(),
            Arc::new(ResilienceRegistry::new()),
            CancellationToken::new(),
        );

        let src = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(src.path(), b"hello").await.unwrap();
        backend.put("a/part-0001.csv", src.path()).await.unwrap();
        assert!(backend.exists("a/part-0001.csv").await.unwrap());
    }
}
