use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::Utc;
use futures::StreamExt;
use landed_chunk::{abort, commit};
use landed_domain::{
    ChunkFormat, ExtractionConfig, MetadataDocument, OwnershipMeta, Record, SchemaSnapshot,
};
use landed_hooks::{HookDispatcher, HookEvent};
use landed_partition::BronzePartition;
use landed_resilience::ResilienceRegistry;
use landed_source::{SourceError, SourceRegistry};
use landed_storage::BackendRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::BronzeError;
use crate::lease;
use crate::request::{BronzeRunOutcome, BronzeRunRequest};

/// Runs one Bronze extraction end to end (§4.7). Mirrors the teacher's
/// `reconcile()` in shape — a numbered sequence, per-step tracing, a single
/// terminal failure point that cleans up before returning — with
/// "provision cloud resources" replaced by "extract, chunk, commit."
pub async fn run(
    config: &ExtractionConfig,
    req: BronzeRunRequest,
    storage: &BackendRegistry,
    sources: &SourceRegistry,
    resilience: &Arc<ResilienceRegistry>,
    onprem_allow_list: &[String],
    hooks: &HookDispatcher,
    cancel: CancellationToken,
) -> Result<BronzeRunOutcome, BronzeError> {
    let started = std::time::Instant::now();
    let identity = format!("{}.{}", config.system.as_str(), config.entity.as_str());

    hooks
        .emit(HookEvent::RunStarted {
            run_id: req.run_id.clone(),
            at: Utc::now(),
            system: config.system.as_str().to_string(),
            entity: config.entity.as_str().to_string(),
        })
        .await;

    match run_inner(config, &req, storage, sources, resilience, onprem_allow_list, &identity, cancel).await {
        Ok(outcome) => {
            hooks
                .emit(HookEvent::RunCompleted {
                    run_id: req.run_id.clone(),
                    at: Utc::now(),
                    record_count: outcome.record_count,
                    chunk_count: outcome.chunk_count,
                })
                .await;
            hooks
                .emit(HookEvent::PartitionWritten {
                    run_id: req.run_id.clone(),
                    at: Utc::now(),
                    path: outcome.partition_path.clone(),
                    record_count: outcome.record_count,
                    chunk_count: outcome.chunk_count,
                    bytes: outcome.byte_count,
                })
                .await;
            if !outcome.schema.is_empty() {
                hooks
                    .emit(HookEvent::SchemaSnapshot {
                        run_id: req.run_id.clone(),
                        at: Utc::now(),
                        path: outcome.partition_path.clone(),
                        columns: outcome.schema.clone(),
                    })
                    .await;
            }
            info!(
                system = %config.system, entity = %config.entity,
                record_count = outcome.record_count, chunk_count = outcome.chunk_count,
                duration_ms = ?started.elapsed().as_millis(), "bronze run complete"
            );
            Ok(outcome)
        }
        Err(err) => {
            hooks
                .emit(HookEvent::RunFailed {
                    run_id: req.run_id.clone(),
                    at: Utc::now(),
                    kind: err.kind(),
                    message: err.to_string(),
                })
                .await;
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_inner(
    config: &ExtractionConfig,
    req: &BronzeRunRequest,
    storage: &BackendRegistry,
    sources: &SourceRegistry,
    resilience: &Arc<ResilienceRegistry>,
    onprem_allow_list: &[String],
    identity: &str,
    cancel: CancellationToken,
) -> Result<BronzeRunOutcome, BronzeError> {
    // 2. Resolve storage and plan the partition path.
    let raw_backend = storage.resolve(&config.storage.backend)?;

    // 1. Policy gate — fail fast on violation.
    landed_policy::validate(config, raw_backend.kind(), onprem_allow_list)?;

    // Every storage `put`/`get`/`delete`/`exists` below goes through the same
    // retry/breaker/rate-limiter composition as the source adapter (§4.2
    // "Composition", §4.7 step 4).
    let backend: Arc<dyn landed_storage::StorageBackend> = Arc::new(landed_storage::ResilientBackend::new(
        raw_backend,
        identity,
        config.resilience.clone(),
        resilience.clone(),
        cancel.clone(),
    ));

    let partition = BronzePartition {
        system: config.system.clone(),
        entity: config.entity.clone(),
        load_pattern: config.load_pattern,
        run_date: config.run_date,
    };
    let partition_path = partition.path(req.storage_prefix.as_deref());
    let staging_path = partition.staging_path(req.storage_prefix.as_deref(), &req.run_id);

    // 2. Acquire the write lease.
    lease::acquire(backend.as_ref(), &partition_path, &staging_path, req.stale_after).await?;

    let result = extract_and_commit(
        config, req, backend.as_ref(), sources, resilience, identity, &partition_path, &staging_path, cancel,
    )
    .await;

    if result.is_err() {
        abort(backend.as_ref(), &staging_path).await;
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn extract_and_commit(
    config: &ExtractionConfig,
    req: &BronzeRunRequest,
    backend: &dyn landed_storage::StorageBackend,
    sources: &SourceRegistry,
    resilience: &Arc<ResilienceRegistry>,
    identity: &str,
    partition_path: &str,
    staging_path: &str,
    cancel: CancellationToken,
) -> Result<BronzeRunOutcome, BronzeError> {
    let started = std::time::Instant::now();

    // 3. Instantiate the source adapter; load the prior cursor if incremental.
    let prior_cursor = load_prior_cursor(backend, config, partition_path).await;
    let mut source_config = config.clone();
    if let landed_domain::SourceSpec::Sql { last_watermark, .. } = &mut source_config.source {
        if last_watermark.is_none() {
            *last_watermark = prior_cursor.clone();
        }
    }

    let adapter = sources.build(&source_config.source, identity, &config.resilience, resilience)?;

    if cancel.is_cancelled() {
        return Err(BronzeError::Cancelled);
    }
    let (mut record_stream, cursor_cell) = adapter.extract(cancel.clone()).await?;

    // 4. Begin the extraction loop: adapter -> bounded channel -> chunk writer.
    let prefetch_depth = req.prefetch_depth.max(1);
    let (tx, rx) = tokio::sync::mpsc::channel::<Record>(prefetch_depth);
    let extract_error: Arc<StdMutex<Option<SourceError>>> = Arc::new(StdMutex::new(None));
    let task_error = extract_error.clone();
    let task_cancel = cancel.clone();

    let producer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => break,
                next = record_stream.next() => {
                    match next {
                        Some(Ok(record)) => {
                            if tx.send(record).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            *task_error.lock().unwrap() = Some(err);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let record_stream = tokio_stream::wrappers::ReceiverStream::new(rx);
    let outcome = landed_chunk::write_chunks(backend, &config.output, staging_path, record_stream).await;

    producer.await.map_err(|e| BronzeError::Internal(e.to_string()))?;
    if cancel.is_cancelled() {
        return Err(BronzeError::Cancelled);
    }
    if let Some(err) = extract_error.lock().unwrap().take() {
        return Err(BronzeError::Source(err));
    }
    let outcome = outcome?;

    let cursor = cursor_cell.get().await;

    // 5. Finalize: write manifests, commit.
    let format_list: Vec<String> = config
        .output
        .format_set
        .iter()
        .map(|f| match f {
            ChunkFormat::Columnar => "columnar".to_string(),
            ChunkFormat::Row => "row".to_string(),
        })
        .collect();

    let metadata = MetadataDocument {
        system: config.system.as_str().to_string(),
        entity: config.entity.as_str().to_string(),
        run_date: config.run_date,
        load_pattern: config.load_pattern,
        record_count: outcome.record_count,
        chunk_count: outcome.chunk_count,
        chunk_bytes_total: outcome.byte_count,
        duration_ms: started.elapsed().as_millis() as u64,
        format_list,
        run_id: req.run_id.clone(),
        cursor: cursor.clone(),
        ownership: Some(OwnershipMeta {
            domain: None,
            boundary: config.storage.boundary.clone(),
            provider_type: config.storage.provider_type.clone(),
        }),
        schema: if outcome.schema.is_empty() {
            None
        } else {
            Some(SchemaSnapshot { columns: outcome.schema.clone() })
        },
        chunks: outcome.chunks.clone(),
        bronze_partition_ref: None,
        applied_model: None,
        tie_break_rule: None,
    };

    landed_manifest::write(backend, staging_path, &metadata, &outcome.checksums).await?;
    commit(backend, staging_path, partition_path).await?;

    Ok(BronzeRunOutcome {
        partition_path: partition_path.to_string(),
        record_count: outcome.record_count,
        chunk_count: outcome.chunk_count,
        byte_count: outcome.byte_count,
        duration_ms: started.elapsed().as_millis() as u64,
        cursor,
        schema: outcome.schema,
        chunks: outcome.chunks,
    })
}

/// Loads the previous run's cursor/watermark from its committed metadata, for
/// incremental (CDC) load patterns (§4.7 step 3). Absence of a prior
/// partition is not an error — the adapter starts from scratch.
async fn load_prior_cursor(
    backend: &dyn landed_storage::StorageBackend,
    config: &ExtractionConfig,
    partition_path: &str,
) -> Option<String> {
    if config.load_pattern != landed_domain::LoadPattern::Cdc {
        return None;
    }
    match landed_manifest::read(backend, partition_path).await {
        Ok(landed_manifest::ManifestOutcome::Valid { metadata, .. }) => metadata.cursor,
        Ok(_) => None,
        Err(err) => {
            warn!(error = %err, "failed to read prior manifest for cursor resume, starting fresh");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use landed_domain::{
        ChunkFormat, FileFormat, LoadPattern, OutputSpec, ResilienceSpec, SourceSpec, StorageScope, StorageSpec,
        SystemId, EntityId,
    };
    use landed_hooks::HookDispatcher;
    use landed_resilience::ResilienceRegistry;
    use landed_source::SourceRegistry;
    use landed_storage::{BackendRegistry, LocalBackend};

    use super::*;

    fn test_config(tmp: &std::path::Path) -> ExtractionConfig {
        let data_dir = tmp.join("input");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("rows.csv"), "id,name\n1,alice\n2,bob\n").unwrap();

        ExtractionConfig {
            system: SystemId::new("crm").unwrap(),
            entity: EntityId::new("accounts").unwrap(),
            run_date: chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            load_pattern: LoadPattern::Full,
            source: SourceSpec::File {
                glob: format!("{}/*.csv", data_dir.display()),
                format: FileFormat::Csv,
                projection: None,
                row_limit: None,
            },
            output: OutputSpec {
                format_set: vec![ChunkFormat::Row],
                compression: None,
                max_rows_per_chunk: 1000,
                max_bytes_per_chunk: 1_000_000,
                parallel_workers: None,
            },
            resilience: ResilienceSpec::default(),
            silver: None,
            storage: StorageSpec {
                backend: "local".to_string(),
                container: "landing".to_string(),
                prefix: None,
                credential_ref: None,
                scope: StorageScope::Cloud,
                boundary: Some("net-a".to_string()),
                provider_type: Some("local-fs".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn full_run_commits_partition_and_emits_hooks() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());

        let mut storage = BackendRegistry::new();
        storage.register("local", Arc::new(LocalBackend::new(tmp.path().join("landing"))));

        let sources = SourceRegistry::new();
        let resilience = Arc::new(ResilienceRegistry::new());
        let hooks = HookDispatcher::spawn(vec![Arc::new(landed_hooks::TracingSink)]);

        let req = BronzeRunRequest {
            run_id: "run-1".to_string(),
            storage_prefix: None,
            stale_after: chrono::Duration::hours(1),
            prefetch_depth: 16,
        };

        let outcome = run(&config, req, &storage, &sources, &resilience, &[], &hooks, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.record_count, 2);
        assert_eq!(outcome.chunk_count, 1);
        assert_eq!(outcome.partition_path, "system=crm/table=accounts/pattern=full/dt=2026-07-28/");
    }

    #[tokio::test]
    async fn rerun_same_config_overwrites_idempotently() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());

        let mut storage = BackendRegistry::new();
        storage.register("local", Arc::new(LocalBackend::new(tmp.path().join("landing"))));
        let sources = SourceRegistry::new();
        let resilience = Arc::new(ResilienceRegistry::new());
        let hooks = HookDispatcher::spawn(vec![Arc::new(landed_hooks::TracingSink)]);

        for run_id in ["run-1", "run-2"] {
            let req = BronzeRunRequest {
                run_id: run_id.to_string(),
                storage_prefix: None,
                stale_after: chrono::Duration::hours(1),
                prefetch_depth: 16,
            };
            run(&config, req, &storage, &sources, &resilience, &[], &hooks, CancellationToken::new())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn policy_violation_fails_before_any_storage_access() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        config.storage.boundary = None;

        let mut storage = BackendRegistry::new();
        storage.register("local", Arc::new(LocalBackend::new(tmp.path().join("landing"))));
        let sources = SourceRegistry::new();
        let resilience = Arc::new(ResilienceRegistry::new());
        let hooks = HookDispatcher::spawn(vec![Arc::new(landed_hooks::TracingSink)]);

        let req = BronzeRunRequest {
            run_id: "run-1".to_string(),
            storage_prefix: None,
            stale_after: chrono::Duration::hours(1),
            prefetch_depth: 16,
        };

        let err = run(&config, req, &storage, &sources, &resilience, &[], &hooks, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BronzeError::Policy(_)));
    }
}
