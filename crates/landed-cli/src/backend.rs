use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use landed_domain::StorageSpec;
use landed_storage::{aws, azure, BackendRegistry, LocalBackend, StorageBackend};
use tracing::warn;

/// Registers every distinct `storage.backend` tag a batch of configs refers
/// to (§4.1 "Registry"). One concrete backend is built per tag — the first
/// config to mention a tag decides its `container` — matching the
/// registry's own tag-keyed shape; a later config naming the same tag with
/// a different container is a misconfiguration, not a second backend.
/// Credentials for the cloud backends come from environment variables named
/// the same way `landed_source::HttpAdapter` names its own auth env vars —
/// fixed rather than config-declared, since `StorageSpec` carries no
/// per-field credential references.
pub fn build_registry(specs: &[&StorageSpec]) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    let mut seen: HashSet<String> = HashSet::new();

    for spec in specs {
        if !seen.insert(spec.backend.clone()) {
            continue;
        }
        let tag = spec.backend.clone();
        let backend: Arc<dyn StorageBackend> = match tag.as_str() {
            "local" => Arc::new(LocalBackend::new(&spec.container)),
            "object-store" => Arc::new(
                aws::build(aws::S3Config {
                    bucket: spec.container.clone(),
                    region: std::env::var("AWS_REGION").ok(),
                    endpoint: std::env::var("AWS_ENDPOINT").ok(),
                    access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
                    secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
                    session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
                    path_style: std::env::var("AWS_S3_PATH_STYLE").as_deref() == Ok("true"),
                })
                .context("failed to build object-store backend")?,
            ),
            "blob" => Arc::new(
                azure::build(azure::AzureConfig {
                    account: std::env::var("AZURE_STORAGE_ACCOUNT").unwrap_or_default(),
                    container: spec.container.clone(),
                    access_key: std::env::var("AZURE_STORAGE_KEY").ok(),
                    tenant_id: std::env::var("AZURE_TENANT_ID").ok(),
                    client_id: std::env::var("AZURE_CLIENT_ID").ok(),
                    client_secret: std::env::var("AZURE_CLIENT_SECRET").ok(),
                })
                .context("failed to build blob backend")?,
            ),
            other => bail!("unrecognized storage backend '{other}'"),
        };
        registry.register(tag, backend);
    }

    Ok(registry)
}
