use futures::StreamExt;
use landed_partition::{CHECKSUMS_FILE_NAME, METADATA_FILE_NAME};
use landed_storage::StorageBackend;
use tracing::{debug, warn};

use crate::error::ChunkError;

/// Moves everything written under `staging_key` into `partition_key`,
/// manifest documents last, then removes the staging copies (§4.5 steps
/// 4-6). `StorageBackend` has no native rename, so "move" is emulated with a
/// local-scratch get+put per object; only the commit boundary (manifests
/// landing last) needs to be atomic from a reader's point of view, not the
/// object store.
pub async fn commit(
    backend: &dyn StorageBackend,
    staging_key: &str,
    partition_key: &str,
) -> Result<(), ChunkError> {
    let existing: Vec<String> = backend
        .list(partition_key)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;
    for key in existing {
        backend.delete(&key).await?;
    }

    let staging_prefix = staging_key.trim_end_matches('/').to_string();
    let partition_prefix = partition_key.trim_end_matches('/').to_string();

    let staged: Vec<String> = backend
        .list(staging_key)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    let (manifests, data): (Vec<String>, Vec<String>) = staged
        .into_iter()
        .partition(|key| key.ends_with(METADATA_FILE_NAME) || key.ends_with(CHECKSUMS_FILE_NAME));

    for key in data.iter().chain(manifests.iter()) {
        let relative = key.strip_prefix(&staging_prefix).unwrap_or(key.as_str()).trim_start_matches('/');
        let dest = format!("{partition_prefix}/{relative}");
        let scratch = tempfile::NamedTempFile::new()?;
        backend.get(key, scratch.path()).await?;
        backend.put(&dest, scratch.path()).await?;
    }

    for key in data.iter().chain(manifests.iter()) {
        backend.delete(key).await?;
    }

    debug!(staging = %staging_key, partition = %partition_key, "committed partition");
    Ok(())
}

/// Deletes everything under `staging_key`. Best-effort: a failed cleanup
/// leaves an orphaned staging directory, which the next run's staleness
/// check (§4.4) will reclaim, so errors here are logged, not propagated.
pub async fn abort(backend: &dyn StorageBackend, staging_key: &str) {
    let staged = match backend.list(staging_key).collect::<Vec<_>>().await.into_iter().collect::<Result<Vec<_>, _>>() {
        Ok(keys) => keys,
        Err(err) => {
            warn!(staging = %staging_key, error = %err, "failed to list staging area for abort");
            return;
        }
    };
    for key in staged {
        if let Err(err) = backend.delete(&key).await {
            warn!(key = %key, error = %err, "failed to delete staging object during abort");
        }
    }
}
