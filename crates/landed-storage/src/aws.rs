use std::sync::Arc;

use object_store::aws::AmazonS3Builder;

use crate::error::StorageError;
use crate::objectstore::ObjectStoreBackend;

/// Credentials and bucket addressing for an S3-compatible backend (§4.1
/// `"object-store"` kind). Fields beyond `bucket`/`region` are optional so
/// the same config shape covers AWS S3 proper and S3-compatible endpoints
/// (MinIO, R2, ...) the way `storage.backend = "object-store"` implies one
/// registered tag rather than an AWS-specific one.
#[derive(Clone, Default)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Required for S3-compatible stores that don't support virtual-hosted
    /// addressing (MinIO, most on-prem gateways).
    pub path_style: bool,
}

/// Builds an [`ObjectStoreBackend`] backed by S3 (or an S3-compatible
/// endpoint). Credentials are taken from `S3Config` if present, otherwise
/// `object_store`'s own environment/IMDS credential chain applies.
pub fn build(config: S3Config) -> Result<ObjectStoreBackend, StorageError> {
    let mut builder = AmazonS3Builder::new().with_bucket_name(&config.bucket);

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if let Some(key) = &config.access_key_id {
        builder = builder.with_access_key_id(key);
    }
    if let Some(secret) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret);
    }
    if let Some(token) = &config.session_token {
        builder = builder.with_token(token);
    }
    if config.path_style {
        builder = builder.with_virtual_hosted_style_request(false);
    }

    let store = builder.build().map_err(|e| StorageError::Permanent {
        backend: "object-store".to_string(),
        key: config.bucket.clone(),
        message: e.to_string(),
    })?;

    Ok(ObjectStoreBackend::new(Arc::new(store), "object-store"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_minimal_config() {
        let config = S3Config { bucket: "landed-bronze".to_string(), ..Default::default() };
        assert!(build(config).is_ok());
    }
}
