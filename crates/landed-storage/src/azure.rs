use std::sync::Arc;

use object_store::azure::MicrosoftAzureBuilder;

use crate::error::StorageError;
use crate::objectstore::ObjectStoreBackend;

/// Credentials and container addressing for Azure Blob storage (§4.1
/// `"blob"` kind). Mirrors the teacher's `AzureDriverConfig` shape (account
/// + container + either a shared key or a service-principal triple), but
/// carries only the fields a storage backend needs — no subscription or
/// management-group provisioning fields, since this crate never provisions
/// infrastructure.
#[derive(Clone, Default)]
pub struct AzureConfig {
    pub account: String,
    pub container: String,
    pub access_key: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Builds an [`ObjectStoreBackend`] backed by Azure Blob. Prefers a shared
/// access key when present; falls back to service-principal (client
/// credentials) auth, matching the teacher's "SP first, else MSI/CLI"
/// fallback order in `azure.rs`.
pub fn build(config: AzureConfig) -> Result<ObjectStoreBackend, StorageError> {
    let mut builder = MicrosoftAzureBuilder::new()
        .with_account(&config.account)
        .with_container_name(&config.container);

    if let Some(key) = &config.access_key {
        builder = builder.with_access_key(key);
    } else if let (Some(tenant), Some(client_id), Some(secret)) =
        (&config.tenant_id, &config.client_id, &config.client_secret)
    {
        builder = builder
            .with_tenant_id(tenant)
            .with_client_id(client_id)
            .with_client_secret(secret);
    }

    let store = builder.build().map_err(|e| StorageError::Permanent {
        backend: "blob".to_string(),
        key: config.container.clone(),
        message: e.to_string(),
    })?;

    Ok(ObjectStoreBackend::new(Arc::new(store), "blob"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_shared_key() {
        let config = AzureConfig {
            account: "landedstorage".to_string(),
            container: "bronze".to_string(),
            access_key: Some("dGVzdGtleQ==".to_string()),
            ..Default::default()
        };
        assert!(build(config).is_ok());
    }
}
