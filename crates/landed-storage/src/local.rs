use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::debug;

use crate::driver::StorageBackend;
use crate::error::StorageError;

/// Direct filesystem access rooted at `root`. No network, no retries beyond
/// what the OS gives for free — matches §4.1's `"local"` backend kind.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn put(&self, remote_key: &str, local_file: &Path) -> Result<(), StorageError> {
        let dest = self.resolve(remote_key);
        debug!(key = remote_key, dest = %dest.display(), "LocalBackend::put");
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_err(&dest, e))?;
        }
        let staged = dest.with_extension("put-tmp");
        tokio::fs::copy(local_file, &staged).await.map_err(|e| io_err(local_file, e))?;
        tokio::fs::rename(&staged, &dest).await.map_err(|e| io_err(&dest, e))?;
        Ok(())
    }

    async fn get(&self, remote_key: &str, local_file: &Path) -> Result<(), StorageError> {
        let src = self.resolve(remote_key);
        debug!(key = remote_key, src = %src.display(), "LocalBackend::get");
        if !src.exists() {
            return Err(StorageError::NotFound { backend: self.kind().to_string(), key: remote_key.to_string() });
        }
        if let Some(parent) = local_file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_err(local_file, e))?;
        }
        tokio::fs::copy(&src, local_file).await.map_err(|e| io_err(&src, e))?;
        Ok(())
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<String, StorageError>> {
        let base = self.resolve(prefix);
        let root = self.root.clone();
        let entries = walk(base).into_iter().filter_map(move |path| {
            path.strip_prefix(&root).ok().map(|rel| Ok(rel.to_string_lossy().replace('\\', "/")))
        });
        stream::iter(entries).boxed()
    }

    async fn delete(&self, remote_key: &str) -> Result<(), StorageError> {
        let target = self.resolve(remote_key);
        debug!(key = remote_key, "LocalBackend::delete");
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&target, e)),
        }
    }

    async fn exists(&self, remote_key: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(remote_key).exists())
    }
}

fn walk(dir: PathBuf) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(&dir) else { return out };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(path));
        } else {
            out.push(path);
        }
    }
    out
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    match source.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound {
            backend: "local".to_string(),
            key: path.display().to_string(),
        },
        std::io::ErrorKind::PermissionDenied => StorageError::Auth {
            backend: "local".to_string(),
            key: path.display().to_string(),
        },
        _ => StorageError::Permanent {
            backend: "local".to_string(),
            key: path.display().to_string(),
            message: source.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());

        let src = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(src.path(), b"hello").await.unwrap();

        backend.put("system=crm/table=accounts/part-0001.csv", src.path()).await.unwrap();
        assert!(backend.exists("system=crm/table=accounts/part-0001.csv").await.unwrap());

        let dest = tempfile::NamedTempFile::new().unwrap();
        backend.get("system=crm/table=accounts/part-0001.csv", dest.path()).await.unwrap();
        let content = tokio::fs::read(dest.path()).await.unwrap();
        assert_eq!(content, b"hello");
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let dest = tempfile::NamedTempFile::new().unwrap();
        let err = backend.get("missing", dest.path()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_returns_keys_under_prefix() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let src = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(src.path(), b"x").await.unwrap();
        backend.put("a/part-0001.csv", src.path()).await.unwrap();
        backend.put("a/part-0002.csv", src.path()).await.unwrap();

        let keys: Vec<_> = backend.list("a").collect::<Vec<_>>().await;
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        backend.delete("never-existed").await.unwrap();
    }
}
