use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use landed_chunk::{commit, stream_partition_records};
use landed_domain::{ExtractionConfig, MetadataDocument, Model, OwnershipMeta, Record, SchemaSnapshot, SilverSpec};
use landed_hooks::{HookDispatcher, HookEvent};
use landed_manifest::ManifestOutcome;
use landed_partition::{BronzePartition, SilverPartition};
use landed_resilience::ResilienceRegistry;
use landed_storage::BackendRegistry;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bucket::{read_bucket, BucketSet};
use crate::error::SilverError;
use crate::keying::{column_text, natural_key_bytes, natural_key_string};
use crate::model::{dedupe, incremental, scd2, snapshot, ModelRow};
use crate::normalize::normalize;
use crate::quarantine::{bad_record_reason, enforce_threshold};
use crate::request::{SilverLeafOutcome, SilverRunOutcome, SilverRunRequest};

const DEFAULT_MEMORY_BUDGET_BYTES: u64 = 64 * 1024 * 1024;
const ERRORS_ARTIFACT: &str = "_errors";

/// Runs one Silver curation end to end (§4.8). Parallel in shape to
/// `landed_bronze::run`: policy gate, the actual work, then lifecycle hooks
/// regardless of outcome.
pub async fn run(
    config: &ExtractionConfig,
    req: SilverRunRequest,
    storage: &BackendRegistry,
    resilience: &Arc<ResilienceRegistry>,
    onprem_allow_list: &[String],
    hooks: &HookDispatcher,
    cancel: CancellationToken,
) -> Result<SilverRunOutcome, SilverError> {
    hooks
        .emit(HookEvent::RunStarted {
            run_id: req.run_id.clone(),
            at: Utc::now(),
            system: config.system.as_str().to_string(),
            entity: config.entity.as_str().to_string(),
        })
        .await;

    match run_inner(config, &req, storage, resilience, onprem_allow_list, cancel).await {
        Ok(outcome) => {
            hooks
                .emit(HookEvent::RunCompleted {
                    run_id: req.run_id.clone(),
                    at: Utc::now(),
                    record_count: outcome.leaves.iter().map(|l| l.record_count).sum(),
                    chunk_count: outcome.leaves.iter().map(|l| l.chunk_count).sum(),
                })
                .await;
            for leaf in &outcome.leaves {
                hooks
                    .emit(HookEvent::PartitionWritten {
                        run_id: req.run_id.clone(),
                        at: Utc::now(),
                        path: leaf.path.clone(),
                        record_count: leaf.record_count,
                        chunk_count: leaf.chunk_count,
                        bytes: leaf.byte_count,
                    })
                    .await;
            }
            info!(
                system = %config.system, entity = %config.entity,
                model = ?outcome.applied_model, leaves = outcome.leaves.len(),
                bad_records = outcome.bad_record_count, "silver run complete"
            );
            Ok(outcome)
        }
        Err(err) => {
            hooks
                .emit(HookEvent::RunFailed { run_id: req.run_id.clone(), at: Utc::now(), kind: err.kind(), message: err.to_string() })
                .await;
            Err(err)
        }
    }
}

async fn run_inner(
    config: &ExtractionConfig,
    req: &SilverRunRequest,
    storage: &BackendRegistry,
    resilience: &Arc<ResilienceRegistry>,
    onprem_allow_list: &[String],
    cancel: CancellationToken,
) -> Result<SilverRunOutcome, SilverError> {
    let started = std::time::Instant::now();
    let spec = config.silver.as_ref().ok_or(SilverError::MissingSpec)?;
    let identity = format!("{}.{}", config.system.as_str(), config.entity.as_str());

    let raw_backend = storage.resolve(&config.storage.backend)?;
    landed_policy::validate(config, raw_backend.kind(), onprem_allow_list)?;

    // Every manifest read, chunk read/write, and commit below goes through
    // the same retry/breaker/rate-limiter composition as the Bronze side
    // (§4.2 "Composition", §4.7 step 4).
    let backend: Arc<dyn landed_storage::StorageBackend> = Arc::new(landed_storage::ResilientBackend::new(
        raw_backend,
        identity,
        config.resilience.clone(),
        resilience.clone(),
        cancel.clone(),
    ));

    let bronze_partition = BronzePartition {
        system: config.system.clone(),
        entity: config.entity.clone(),
        load_pattern: config.load_pattern,
        run_date: config.run_date,
    };
    let bronze_path = bronze_partition.path(req.storage_prefix.as_deref());

    let (metadata, checksums) = match landed_manifest::read(backend.as_ref(), &bronze_path).await? {
        ManifestOutcome::Valid { metadata, checksums } => (metadata, checksums),
        ManifestOutcome::Missing => return Err(SilverError::BronzePartitionMissing { partition: bronze_path }),
        ManifestOutcome::Corrupt { reason } => return Err(SilverError::BronzePartitionCorrupt { partition: bronze_path, reason }),
    };
    landed_manifest::verify_chunks(backend.as_ref(), &bronze_path, &metadata, &checksums)
        .await
        .map_err(|e| SilverError::BronzePartitionCorrupt { partition: bronze_path.clone(), reason: e.to_string() })?;

    let model = spec.model_choice.unwrap_or_else(|| Model::derive(spec.entity_kind, spec.history_mode, spec.input_mode));
    let needs_full_pass = matches!(model, Model::FullMergeDedupe | Model::ScdType1 | Model::ScdType2);

    let bucket_count = req.bucket_count.unwrap_or_else(|| {
        let budget = spec.external_sort_budget_bytes.unwrap_or(DEFAULT_MEMORY_BUDGET_BYTES).max(1);
        ((metadata.chunk_bytes_total.max(1) as f64) / budget as f64).ceil().max(1.0) as usize
    });

    let total_input = metadata.record_count;
    let mut leaves: HashMap<(&'static str, Vec<(String, String)>), Vec<Record>> = HashMap::new();
    let mut bad_records: Vec<Record> = Vec::new();
    let mut bucket_set = if needs_full_pass { Some(BucketSet::new(bucket_count)?) } else { None };
    let mut tie_break_rule: Option<&'static str> = None;

    let mut stream = stream_partition_records(backend.clone(), bronze_path.clone(), metadata.clone());
    while let Some(record) = stream.next().await {
        if cancel.is_cancelled() {
            return Err(SilverError::Cancelled);
        }
        let record = record?;

        if let Some(_reason) = bad_record_reason(&record, spec) {
            bad_records.push(record);
            continue;
        }

        if let Some(set) = bucket_set.as_mut() {
            let index = BucketSet::index_for(&natural_key_bytes(&record, &spec.natural_keys), set.len());
            set.append(index, &record)?;
        } else {
            let row = match model {
                Model::PeriodicSnapshot => snapshot::apply(record),
                Model::IncrementalMerge => incremental::apply(record),
                _ => unreachable!("full-pass models are routed through the bucket set above"),
            };
            route(&mut leaves, row, spec);
        }
    }

    enforce_threshold(bad_records.len() as u64, total_input, &spec.error_handling)
        .map_err(|(bad, total)| SilverError::DataQuality { bad, total })?;

    if let Some(set) = bucket_set.take() {
        let buckets = set.finish()?;
        for bucket in &buckets {
            let records = read_bucket(bucket.path())?;
            let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
            for record in records {
                groups.entry(natural_key_string(&record, &spec.natural_keys)).or_default().push(record);
            }
            for (_, group) in groups {
                match model {
                    Model::FullMergeDedupe | Model::ScdType1 => {
                        let (row, rule) = dedupe::apply(group, spec);
                        tie_break_rule = Some(rule);
                        route(&mut leaves, row, spec);
                    }
                    Model::ScdType2 => {
                        let (history, current) = scd2::apply(group, spec);
                        for row in history {
                            route(&mut leaves, row, spec);
                        }
                        if let Some(row) = current {
                            route(&mut leaves, row, spec);
                        }
                    }
                    _ => unreachable!("streaming models never reach the bucket set"),
                }
            }
        }
    }

    if !bad_records.is_empty() {
        leaves.entry((ERRORS_ARTIFACT, Vec::new())).or_default().extend(bad_records.iter().cloned());
    }

    let mut outcome = SilverRunOutcome {
        bronze_partition_ref: bronze_path,
        applied_model: Some(model),
        leaves: Vec::new(),
        bad_record_count: bad_records.len() as u64,
        duration_ms: 0,
    };

    for ((artifact, secondary), records) in leaves {
        let leaf = write_leaf(
            backend.as_ref(),
            config,
            spec,
            req,
            artifact,
            secondary,
            records,
            &outcome.bronze_partition_ref,
            model,
            tie_break_rule,
        )
        .await?;
        outcome.leaves.push(leaf);
    }

    outcome.duration_ms = started.elapsed().as_millis() as u64;
    Ok(outcome)
}

/// Applies projection (when `attributes` is declared) and normalization to a
/// model's output row, then files it under the leaf its artifact and
/// `partition_by` values select.
fn route(leaves: &mut HashMap<(&'static str, Vec<(String, String)>), Vec<Record>>, row: ModelRow, spec: &SilverSpec) {
    let normalized = normalize(row.record, spec);
    let secondary: Vec<(String, String)> =
        spec.partition_by.iter().map(|col| (col.clone(), column_text(&normalized, col))).collect();
    leaves.entry((row.artifact, secondary)).or_default().push(normalized);
}

#[allow(clippy::too_many_arguments)]
async fn write_leaf(
    backend: &dyn landed_storage::StorageBackend,
    config: &ExtractionConfig,
    spec: &SilverSpec,
    req: &SilverRunRequest,
    artifact: &str,
    secondary: Vec<(String, String)>,
    records: Vec<Record>,
    bronze_partition_ref: &str,
    model: Model,
    tie_break_rule: Option<&'static str>,
) -> Result<SilverLeafOutcome, SilverError> {
    let started = std::time::Instant::now();

    let mut full_secondary = Vec::new();
    if artifact != "main" {
        full_secondary.push(("artifact".to_string(), artifact.to_string()));
    }
    full_secondary.extend(secondary);

    let partition = SilverPartition {
        domain: spec.domain.clone(),
        entity: config.entity.clone(),
        version: spec.version,
        load_date: config.run_date,
        secondary: full_secondary,
    };
    let partition_path = partition.path(req.storage_prefix.as_deref());
    let staging_path = partition.staging_path(req.storage_prefix.as_deref(), &req.run_id);

    let outcome = landed_chunk::write_chunks(backend, &config.output, &staging_path, futures::stream::iter(records)).await?;

    let format_list: Vec<String> = config
        .output
        .format_set
        .iter()
        .map(|f| match f {
            landed_domain::ChunkFormat::Columnar => "columnar".to_string(),
            landed_domain::ChunkFormat::Row => "row".to_string(),
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
        cursor: None,
        ownership: Some(OwnershipMeta {
            domain: Some(spec.domain.as_str().to_string()),
            boundary: config.storage.boundary.clone(),
            provider_type: config.storage.provider_type.clone(),
        }),
        schema: if outcome.schema.is_empty() { None } else { Some(SchemaSnapshot { columns: outcome.schema.clone() }) },
        chunks: outcome.chunks.clone(),
        bronze_partition_ref: Some(bronze_partition_ref.to_string()),
        applied_model: Some(model),
        tie_break_rule: tie_break_rule.map(str::to_string),
    };

    landed_manifest::write(backend, &staging_path, &metadata, &outcome.checksums).await?;
    commit(backend, &staging_path, &partition_path).await?;

    Ok(SilverLeafOutcome {
        artifact: artifact.to_string(),
        path: partition_path,
        record_count: outcome.record_count,
        chunk_count: outcome.chunk_count,
        byte_count: outcome.byte_count,
    })
}

#[cfg(test)]
mod tests {
    use landed_domain::{
        ChunkFormat, DomainId, EntityId, EntityKind, FileFormat, LoadPattern, OutputSpec, ResilienceSpec, SourceSpec,
        StorageScope, StorageSpec, SystemId,
    };
    use landed_hooks::HookDispatcher;
    use landed_source::SourceRegistry;
    use landed_storage::LocalBackend;

    use super::*;

    fn bronze_then_config(tmp: &std::path::Path) -> ExtractionConfig {
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
            silver: Some(landed_domain::SilverSpec {
                entity_kind: EntityKind::State,
                history_mode: None,
                input_mode: None,
                delete_mode: landed_domain::DeleteMode::Ignore,
                schema_mode: landed_domain::SchemaMode::Strict,
                natural_keys: vec!["id".to_string()],
                event_ts_column: None,
                change_ts_column: None,
                order_column: None,
                attributes: Vec::new(),
                partition_by: Vec::new(),
                model_choice: Some(Model::PeriodicSnapshot),
                normalization: Default::default(),
                error_handling: Default::default(),
                delete_marker_column: None,
                external_sort_budget_bytes: None,
                domain: DomainId::new("sales").unwrap(),
                version: 1,
            }),
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
    async fn full_run_reads_bronze_and_writes_a_silver_leaf() {
        let tmp = tempfile::tempdir().unwrap();
        let config = bronze_then_config(tmp.path());

        let mut storage = BackendRegistry::new();
        storage.register("local", Arc::new(LocalBackend::new(tmp.path().join("landing"))));

        let sources = SourceRegistry::new();
        let resilience = Arc::new(ResilienceRegistry::new());
        let hooks = HookDispatcher::spawn(vec![Arc::new(landed_hooks::TracingSink)]);

        let bronze_req = landed_bronze::BronzeRunRequest {
            run_id: "bronze-1".to_string(),
            storage_prefix: None,
            stale_after: chrono::Duration::hours(1),
            prefetch_depth: 16,
        };
        landed_bronze::run(
            &config,
            bronze_req,
            &storage,
            &sources,
            &resilience,
            &[],
            &hooks,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let silver_req = SilverRunRequest { run_id: "silver-1".to_string(), storage_prefix: None, bucket_count: None };
        let outcome =
            run(&config, silver_req, &storage, &resilience, &[], &hooks, CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.leaves.len(), 1);
        assert_eq!(outcome.leaves[0].record_count, 2);
        assert_eq!(outcome.bad_record_count, 0);
    }

    #[tokio::test]
    async fn missing_bronze_partition_fails_before_any_write() {
        let tmp = tempfile::tempdir().unwrap();
        let config = bronze_then_config(tmp.path());

        let mut storage = BackendRegistry::new();
        storage.register("local", Arc::new(LocalBackend::new(tmp.path().join("landing"))));
        let resilience = Arc::new(ResilienceRegistry::new());
        let hooks = HookDispatcher::spawn(vec![Arc::new(landed_hooks::TracingSink)]);

        let silver_req = SilverRunRequest { run_id: "silver-1".to_string(), storage_prefix: None, bucket_count: None };
        let err =
            run(&config, silver_req, &storage, &resilience, &[], &hooks, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SilverError::BronzePartitionMissing { .. }));
    }
}
