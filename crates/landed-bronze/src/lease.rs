use chrono::{DateTime, Utc};
use landed_chunk::abort;
use landed_storage::StorageBackend;
use tracing::warn;

use crate::error::BronzeError;

const LEASE_FILE_NAME: &str = ".lease";

/// Acquires the write lease for a Bronze partition (§4.7 step 2). Scans for
/// any existing `<partition>.staging-*` directory; if one is found and its
/// lease timestamp is younger than `stale_after`, the run is refused. An
/// older (or unreadable) lease is reclaimed: its staging contents are
/// deleted before this run claims a fresh one.
///
/// Grounded on `landed-chunk`'s own staging-dir idiom (`commit.rs`,
/// `abort.rs`) — the lease is just a marker object living alongside the
/// chunks a run will stage, using the same `put`/`get`/`list` primitives.
pub async fn acquire(
    backend: &dyn StorageBackend,
    partition_path: &str,
    staging_path: &str,
    stale_after: chrono::Duration,
) -> Result<(), BronzeError> {
    let stale_prefix = format!("{}.staging-", partition_path.trim_end_matches('/'));

    let mut existing_dirs = std::collections::BTreeSet::new();
    let mut listing = backend.list(&stale_prefix);
    use futures::StreamExt;
    while let Some(key) = listing.next().await {
        let key = key?;
        if let Some(rest) = key.strip_prefix(&stale_prefix) {
            if let Some(dir) = rest.split('/').next() {
                existing_dirs.insert(format!("{stale_prefix}{dir}"));
            }
        }
    }
    drop(listing);

    for dir in existing_dirs {
        if dir == staging_path.trim_end_matches('/') {
            continue;
        }
        let lease_key = format!("{}/{LEASE_FILE_NAME}", dir.trim_end_matches('/'));
        let age = read_lease_age(backend, &lease_key).await;
        let is_stale = match age {
            Some(age) => age > stale_after,
            None => true,
        };
        if !is_stale {
            return Err(BronzeError::LeaseHeld { partition: partition_path.to_string() });
        }
        warn!(staging = %dir, "reclaiming stale write lease");
        abort(backend, &dir).await;
    }

    write_lease(backend, staging_path).await
}

async fn read_lease_age(backend: &dyn StorageBackend, lease_key: &str) -> Option<chrono::Duration> {
    let scratch = tempfile::NamedTempFile::new().ok()?;
    backend.get(lease_key, scratch.path()).await.ok()?;
    let bytes = tokio::fs::read(scratch.path()).await.ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let stamped: DateTime<Utc> = text.trim().parse().ok()?;
    Some(Utc::now() - stamped)
}

async fn write_lease(backend: &dyn StorageBackend, staging_path: &str) -> Result<(), BronzeError> {
    let scratch = tempfile::NamedTempFile::new().map_err(|e| BronzeError::Internal(e.to_string()))?;
    tokio::fs::write(scratch.path(), Utc::now().to_rfc3339().as_bytes())
        .await
        .map_err(|e| BronzeError::Internal(e.to_string()))?;
    let key = format!("{}/{LEASE_FILE_NAME}", staging_path.trim_end_matches('/'));
    backend.put(&key, scratch.path()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use landed_storage::LocalBackend;

    use super::*;

    #[tokio::test]
    async fn fresh_lease_acquired_without_conflict() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let result = acquire(&backend, "system=a/table=b", "system=a/table=b.staging-r1", chrono::Duration::hours(1)).await;
        assert!(result.is_ok());
        assert!(backend.exists("system=a/table=b.staging-r1/.lease").await.unwrap());
    }

    #[tokio::test]
    async fn non_stale_competing_lease_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        acquire(&backend, "system=a/table=b", "system=a/table=b.staging-r1", chrono::Duration::hours(1))
            .await
            .unwrap();

        let result = acquire(&backend, "system=a/table=b", "system=a/table=b.staging-r2", chrono::Duration::hours(1)).await;
        assert!(matches!(result, Err(BronzeError::LeaseHeld { .. })));
    }

    #[tokio::test]
    async fn stale_competing_lease_is_reclaimed() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        acquire(&backend, "system=a/table=b", "system=a/table=b.staging-r1", chrono::Duration::hours(1))
            .await
            .unwrap();

        let result = acquire(&backend, "system=a/table=b", "system=a/table=b.staging-r2", chrono::Duration::zero()).await;
        assert!(result.is_ok());
        assert!(!backend.exists("system=a/table=b.staging-r1/.lease").await.unwrap());
    }
}
