use std::sync::Arc;

use landed_bronze::BronzeRunRequest;
use landed_config::LoadOverrides;
use landed_domain::{ExtractionConfig, SourceSpec, StorageScope};
use landed_hooks::{HookDispatcher, HookSink, HttpSink, TracingSink};
use landed_resilience::ResilienceRegistry;
use landed_silver::SilverRunRequest;
use landed_source::SourceRegistry;
use landed_storage::BackendRegistry;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::{backend, output};

const DEFAULT_PREFETCH_DEPTH: usize = 64;
const DEFAULT_STALE_AFTER_HOURS: i64 = 1;

/// Runs the `bronze` subcommand across every source in `args.config` (§6).
pub async fn bronze(args: RunArgs) -> anyhow::Result<i32> {
    run(args, Mode::Bronze).await
}

/// Runs the `silver` subcommand across every source in `args.config` (§6).
pub async fn silver(args: RunArgs) -> anyhow::Result<i32> {
    run(args, Mode::Silver).await
}

#[derive(Clone, Copy)]
enum Mode {
    Bronze,
    Silver,
}

async fn run(args: RunArgs, mode: Mode) -> anyhow::Result<i32> {
    let run_date = args.run_date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let overrides = LoadOverrides { run_date, load_pattern: args.load_pattern.map(Into::into) };

    let mut configs = match landed_config::load_configs(&args.config, overrides) {
        Ok(configs) => configs,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return Ok(err.kind().exit_code());
        }
    };

    if let Some(scope) = args.storage_scope {
        let scope: StorageScope = scope.into();
        for config in &mut configs {
            config.storage.scope = scope;
        }
    }

    let onprem_allow_list: Vec<String> =
        args.onprem_allow_list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();

    let storage_specs: Vec<&landed_domain::StorageSpec> = configs.iter().map(|c| &c.storage).collect();
    let storage = match backend::build_registry(&storage_specs) {
        Ok(registry) => registry,
        Err(err) => {
            error!(error = %err, "failed to build storage backend registry");
            return Ok(landed_domain::ErrorKind::Config.exit_code());
        }
    };

    let sources = Arc::new(SourceRegistry::new());
    let resilience = Arc::new(ResilienceRegistry::new());
    let storage = Arc::new(storage);
    let onprem_allow_list = Arc::new(onprem_allow_list);

    let mut sinks: Vec<Arc<dyn HookSink>> = vec![Arc::new(TracingSink)];
    if let Some(url) = &args.hook_url {
        sinks.push(Arc::new(HttpSink::new(url.clone())));
    }
    let hooks = Arc::new(HookDispatcher::spawn(sinks));

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt signal, cancelling in-flight runs");
            ctrl_c_cancel.cancel();
        }
    });

    let permits = args.parallel_workers.max(1);
    let semaphore = Arc::new(Semaphore::new(permits));

    let mut handles = Vec::with_capacity(configs.len());
    for config in configs {
        let semaphore = semaphore.clone();
        let storage = storage.clone();
        let sources = sources.clone();
        let resilience = resilience.clone();
        let hooks = hooks.clone();
        let onprem_allow_list = onprem_allow_list.clone();
        let cancel = cancel.clone();
        let args = args.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            run_one(mode, config, &args, &storage, &sources, &resilience, &onprem_allow_list, &hooks, cancel).await
        }));
    }

    let mut exit_code = 0;
    for handle in handles {
        let code = handle.await?;
        if code != 0 && exit_code == 0 {
            exit_code = code;
        }
    }

    Ok(exit_code)
}

#[allow(clippy::too_many_arguments)]
async fn run_one(
    mode: Mode,
    config: ExtractionConfig,
    args: &RunArgs,
    storage: &BackendRegistry,
    sources: &SourceRegistry,
    resilience: &Arc<ResilienceRegistry>,
    onprem_allow_list: &[String],
    hooks: &HookDispatcher,
    cancel: CancellationToken,
) -> i32 {
    let identity = format!("{}.{}", config.system.as_str(), config.entity.as_str());

    let backend_kind = match storage.resolve(&config.storage.backend) {
        Ok(backend) => backend.kind().to_string(),
        Err(err) => {
            error!(identity = %identity, error = %err, "failed to resolve storage backend");
            return err.kind().exit_code();
        }
    };

    if let Err(err) = landed_policy::validate(&config, &backend_kind, onprem_allow_list) {
        error!(identity = %identity, error = %err, "policy gate rejected configuration");
        return err.kind().exit_code();
    }

    if args.validate_only {
        info!(identity = %identity, "configuration is valid");
        return 0;
    }

    if args.dry_run {
        return dry_run(mode, &config, &identity, args.storage_prefix.as_deref(), sources, resilience, storage).await;
    }

    match mode {
        Mode::Bronze => {
            let req = BronzeRunRequest {
                run_id: uuid::Uuid::new_v4().to_string(),
                storage_prefix: args.storage_prefix.clone(),
                stale_after: chrono::Duration::hours(DEFAULT_STALE_AFTER_HOURS),
                prefetch_depth: channel_prefetch_depth(&config.source),
            };
            match landed_bronze::run(&config, req, storage, sources, resilience, onprem_allow_list, hooks, cancel).await
            {
                Ok(outcome) => {
                    output::print_bronze_outcome(&identity, &outcome);
                    0
                }
                Err(err) => {
                    error!(identity = %identity, error = %err, "bronze run failed");
                    err.kind().exit_code()
                }
            }
        }
        Mode::Silver => {
            let req = SilverRunRequest {
                run_id: uuid::Uuid::new_v4().to_string(),
                storage_prefix: args.storage_prefix.clone(),
                bucket_count: args.bucket_count,
            };
            match landed_silver::run(&config, req, storage, resilience, onprem_allow_list, hooks, cancel).await {
                Ok(outcome) => {
                    output::print_silver_outcome(&identity, &outcome);
                    0
                }
                Err(err) => {
                    error!(identity = %identity, error = %err, "silver run failed");
                    err.kind().exit_code()
                }
            }
        }
    }
}

/// Plans a run and probes its adapter/backend without writing anything
/// (§6 `--dry-run`): builds the source adapter for a Bronze run, or confirms
/// the referenced Bronze partition has a valid manifest for a Silver run.
async fn dry_run(
    mode: Mode,
    config: &ExtractionConfig,
    identity: &str,
    storage_prefix: Option<&str>,
    sources: &SourceRegistry,
    resilience: &Arc<ResilienceRegistry>,
    storage: &BackendRegistry,
) -> i32 {
    match mode {
        Mode::Bronze => match sources.build(&config.source, identity, &config.resilience, resilience) {
            Ok(_) => {
                info!(identity = %identity, "dry run: source adapter built successfully");
                0
            }
            Err(err) => {
                error!(identity = %identity, error = %err, "dry run: failed to build source adapter");
                err.kind().exit_code()
            }
        },
        Mode::Silver => {
            let backend = match storage.resolve(&config.storage.backend) {
                Ok(backend) => backend,
                Err(err) => {
                    error!(identity = %identity, error = %err, "dry run: failed to resolve storage backend");
                    return err.kind().exit_code();
                }
            };
            let partition = landed_partition::BronzePartition {
                system: config.system.clone(),
                entity: config.entity.clone(),
                load_pattern: config.load_pattern,
                run_date: config.run_date,
            };
            let partition_path = partition.path(storage_prefix);
            match landed_manifest::read(backend.as_ref(), &partition_path).await {
                Ok(landed_manifest::ManifestOutcome::Valid { .. }) => {
                    info!(identity = %identity, partition = %partition_path, "dry run: bronze partition is valid");
                    0
                }
                Ok(landed_manifest::ManifestOutcome::Missing) => {
                    error!(identity = %identity, partition = %partition_path, "dry run: bronze partition missing");
                    landed_domain::ErrorKind::NotFound.exit_code()
                }
                Ok(landed_manifest::ManifestOutcome::Corrupt { reason }) => {
                    error!(identity = %identity, partition = %partition_path, reason = %reason, "dry run: bronze partition corrupt");
                    landed_domain::ErrorKind::CorruptManifest.exit_code()
                }
                Err(err) => {
                    error!(identity = %identity, error = %err, "dry run: failed to read bronze manifest");
                    err.kind().exit_code()
                }
            }
        }
    }
}

/// The channel depth between the source adapter and the chunk writer
/// (§4.7 step 4), falling back to the source spec's own `prefetch_depth`
/// when the HTTP variant declares one.
fn channel_prefetch_depth(source: &SourceSpec) -> usize {
    match source {
        SourceSpec::Http { prefetch_depth: Some(depth), .. } => (*depth).max(1) as usize,
        _ => DEFAULT_PREFETCH_DEPTH,
    }
}
