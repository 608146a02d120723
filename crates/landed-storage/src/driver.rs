use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StorageError;

/// Uniform operations over an opaque object namespace (§4.1). `put` of the
/// same content under the same key is idempotent from the caller's
/// perspective: last writer wins, no partial files ever become visible.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    fn kind(&self) -> &'static str;

    async fn put(&self, remote_key: &str, local_file: &Path) -> Result<(), StorageError>;

    async fn get(&self, remote_key: &str, local_file: &Path) -> Result<(), StorageError>;

    /// Restartable, finite, unspecified order.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<String, StorageError>>;

    async fn delete(&self, remote_key: &str) -> Result<(), StorageError>;

    async fn exists(&self, remote_key: &str) -> Result<bool, StorageError>;
}
