use std::path::Path;

use landed_domain::{ChecksumsDocument, MetadataDocument};
use landed_storage::StorageBackend;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::ManifestError;

pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const CHECKSUMS_FILE_NAME: &str = "checksums.json";

/// Result of reading a partition's manifest pair (§4.6): `valid`, `missing`,
/// or `corrupt`. A partition is observable by consumers only in the first
/// two states — never partially (§3 invariants).
#[derive(Debug)]
pub enum ManifestOutcome {
    Valid { metadata: MetadataDocument, checksums: ChecksumsDocument },
    Missing,
    Corrupt { reason: String },
}

/// Writes the metadata and checksums documents into `staging_key` (§4.5 step
/// 3). Called after the last chunk closes, before the atomic rename.
pub async fn write(
    backend: &dyn StorageBackend,
    staging_key: &str,
    metadata: &MetadataDocument,
    checksums: &ChecksumsDocument,
) -> Result<(), ManifestError> {
    write_doc(backend, staging_key, METADATA_FILE_NAME, metadata).await?;
    write_doc(backend, staging_key, CHECKSUMS_FILE_NAME, checksums).await?;
    Ok(())
}

async fn write_doc<T: serde::Serialize>(
    backend: &dyn StorageBackend,
    staging_key: &str,
    file_name: &str,
    doc: &T,
) -> Result<(), ManifestError> {
    let scratch = tempfile::NamedTempFile::new()?;
    let json = serde_json::to_vec_pretty(doc)?;
    tokio::fs::write(scratch.path(), &json).await?;
    backend.put(&join(staging_key, file_name), scratch.path()).await?;
    Ok(())
}

fn join(base: &str, name: &str) -> String {
    format!("{}/{name}", base.trim_end_matches('/'))
}

/// Reads and lightly validates a partition's manifest pair: presence of
/// mandatory fields and referential integrity between the chunk list in
/// `metadata` and the entries in `checksums` (§4.6). Does not re-hash chunk
/// bytes — see [`verify_chunks`] for the expensive full check the Silver
/// engine runs before trusting a Bronze partition (§4.8 "Input").
pub async fn read(backend: &dyn StorageBackend, partition_key: &str) -> Result<ManifestOutcome, ManifestError> {
    let meta_key = join(partition_key, METADATA_FILE_NAME);
    let sums_key = join(partition_key, CHECKSUMS_FILE_NAME);

    if !backend.exists(&meta_key).await? || !backend.exists(&sums_key).await? {
        return Ok(ManifestOutcome::Missing);
    }

    let metadata: MetadataDocument = match read_doc(backend, &meta_key).await {
        Ok(doc) => doc,
        Err(e) => return Ok(ManifestOutcome::Corrupt { reason: e.to_string() }),
    };
    let checksums: ChecksumsDocument = match read_doc(backend, &sums_key).await {
        Ok(doc) => doc,
        Err(e) => return Ok(ManifestOutcome::Corrupt { reason: e.to_string() }),
    };

    if metadata.chunk_count as usize != metadata.chunks.len() && metadata.chunk_count > 0 {
        return Ok(ManifestOutcome::Corrupt {
            reason: format!(
                "metadata declares chunk_count={} but lists {} chunk summaries",
                metadata.chunk_count,
                metadata.chunks.len()
            ),
        });
    }
    for chunk in &metadata.chunks {
        if checksums.get(&chunk.file_name).is_none() {
            return Ok(ManifestOutcome::Corrupt {
                reason: format!("chunk '{}' has no checksums entry", chunk.file_name),
            });
        }
    }

    debug!(partition = partition_key, chunks = metadata.chunk_count, "manifest read as valid");
    Ok(ManifestOutcome::Valid { metadata, checksums })
}

async fn read_doc<T: serde::de::DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> Result<T, ManifestError> {
    let scratch = tempfile::NamedTempFile::new()?;
    backend.get(key, scratch.path()).await?;
    let bytes = tokio::fs::read(scratch.path()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Recomputes SHA-256 over every chunk file and compares against the
/// checksums document (§8 "Round-trip / idempotence laws"). Used by the
/// Silver engine before trusting Bronze input, and by integration tests
/// asserting manifest integrity end to end.
pub async fn verify_chunks(
    backend: &dyn StorageBackend,
    partition_key: &str,
    metadata: &MetadataDocument,
    checksums: &ChecksumsDocument,
) -> Result<(), ManifestError> {
    for chunk in &metadata.chunks {
        let expected = checksums.get(&chunk.file_name).ok_or_else(|| ManifestError::Corrupt {
            partition: partition_key.to_string(),
            reason: format!("chunk '{}' missing from checksums document", chunk.file_name),
        })?;
        let scratch = tempfile::NamedTempFile::new()?;
        let key = join(partition_key, &chunk.file_name);
        backend.get(&key, scratch.path()).await?;
        let bytes = tokio::fs::read(scratch.path()).await?;
        let actual = hex_sha256(&bytes);
        if actual != expected {
            warn!(chunk = %chunk.file_name, "checksum mismatch");
            return Err(ManifestError::Corrupt {
                partition: partition_key.to_string(),
                reason: format!("checksum mismatch for '{}'", chunk.file_name),
            });
        }
    }
    Ok(())
}

pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 of a local file on disk, used by the chunk writer immediately
/// after closing a chunk (§4.5 "Checksums").
pub async fn hex_sha256_file(path: &Path) -> Result<String, ManifestError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hex_sha256(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::{ChunkSummary, LoadPattern};
    use landed_storage::LocalBackend;

    fn sample_metadata() -> MetadataDocument {
        MetadataDocument {
            system: "crm".to_string(),
            entity: "accounts".to_string(),
            run_date: chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            load_pattern: LoadPattern::Full,
            record_count: 10,
            chunk_count: 1,
            chunk_bytes_total: 5,
            duration_ms: 1,
            format_list: vec!["row".to_string()],
            run_id: "run-1".to_string(),
            cursor: None,
            ownership: None,
            schema: None,
            chunks: vec![ChunkSummary { file_name: "part-0001.csv".to_string(), record_count: 10, byte_count: 5 }],
            bronze_partition_ref: None,
            applied_model: None,
            tie_break_rule: None,
        }
    }

    #[tokio::test]
    async fn missing_when_no_documents_present() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let outcome = read(&backend, "system=crm/table=accounts/pattern=full/dt=2026-07-28/").await.unwrap();
        assert!(matches!(outcome, ManifestOutcome::Missing));
    }

    #[tokio::test]
    async fn write_then_read_round_trips_as_valid() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let metadata = sample_metadata();
        let mut checksums = ChecksumsDocument::new();
        checksums.insert("part-0001.csv", "deadbeef");

        let key = "system=crm/table=accounts/pattern=full/dt=2026-07-28";
        write(&backend, key, &metadata, &checksums).await.unwrap();

        let outcome = read(&backend, key).await.unwrap();
        assert!(matches!(outcome, ManifestOutcome::Valid { .. }));
    }

    #[tokio::test]
    async fn corrupt_when_chunk_missing_from_checksums() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let metadata = sample_metadata();
        let checksums = ChecksumsDocument::new();

        let key = "system=crm/table=accounts/pattern=full/dt=2026-07-28";
        write(&backend, key, &metadata, &checksums).await.unwrap();

        let outcome = read(&backend, key).await.unwrap();
        assert!(matches!(outcome, ManifestOutcome::Corrupt { .. }));
    }

    #[tokio::test]
    async fn verify_chunks_detects_tampered_content() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let metadata = sample_metadata();
        let mut checksums = ChecksumsDocument::new();
        checksums.insert("part-0001.csv", "0000000000000000000000000000000000000000000000000000000000000000");

        let key = "system=crm/table=accounts/pattern=full/dt=2026-07-28";
        write(&backend, key, &metadata, &checksums).await.unwrap();

        let scratch = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(scratch.path(), b"hello").await.unwrap();
        backend.put(&join(key, "part-0001.csv"), scratch.path()).await.unwrap();

        let err = verify_chunks(&backend, key, &metadata, &checksums).await.unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }));
    }
}
