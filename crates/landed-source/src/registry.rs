use std::collections::HashMap;
use std::sync::Arc;

use landed_domain::{ResilienceSpec, SourceSpec};
use landed_resilience::ResilienceRegistry;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::file::FileAdapter;
use crate::http::HttpAdapter;
use crate::sql::SqlAdapter;

type CustomFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Box<dyn SourceAdapter>, SourceError> + Send + Sync>;

/// Resolves a [`SourceSpec`] into a concrete adapter (§4.3, §9 "registration
/// is by string tag"). Built-in variants dispatch directly; `custom` looks up
/// a factory registered ahead of time by tag.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    custom: HashMap<String, CustomFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_custom<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn SourceAdapter>, SourceError> + Send + Sync + 'static,
    {
        self.custom.insert(tag.into(), Arc::new(factory));
    }

    pub fn build(
        &self,
        spec: &SourceSpec,
        identity: &str,
        resilience: &ResilienceSpec,
        resilience_registry: &Arc<ResilienceRegistry>,
    ) -> Result<Box<dyn SourceAdapter>, SourceError> {
        match spec {
            SourceSpec::Http {
                base_url,
                endpoint,
                method,
                headers,
                query_params,
                auth,
                pagination,
                record_path,
                prefetch_depth,
            } => Ok(Box::new(HttpAdapter::new(
                base_url.clone(),
                endpoint.clone(),
                method.clone(),
                headers.clone(),
                query_params.clone(),
                auth.clone(),
                pagination.clone(),
                record_path.clone(),
                *prefetch_depth,
                identity.to_string(),
                resilience.clone(),
                resilience_registry.clone(),
            ))),
            SourceSpec::Sql { connection_ref, query, watermark_column, last_watermark, batch_size, .. } => {
                Ok(Box::new(SqlAdapter::new(
                    connection_ref.clone(),
                    query.clone(),
                    watermark_column.clone(),
                    last_watermark.clone(),
                    *batch_size,
                    identity.to_string(),
                    resilience.clone(),
                    resilience_registry.clone(),
                )))
            }
            SourceSpec::File { glob, format, projection, row_limit } => {
                Ok(Box::new(FileAdapter::new(glob.clone(), *format, projection.clone(), *row_limit)))
            }
            SourceSpec::Custom { tag, params } => self
                .custom
                .get(tag)
                .ok_or_else(|| SourceError::UnknownCustomTag(tag.clone()))
                .and_then(|factory| factory(params)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::{FileFormat, HttpAuth, HttpPagination};

    #[test]
    fn builds_file_adapter_from_spec() {
        let registry = SourceRegistry::new();
        let spec = SourceSpec::File { glob: "*.csv".to_string(), format: FileFormat::Csv, projection: None, row_limit: None };
        let resilience_registry = Arc::new(ResilienceRegistry::new());
        let adapter = registry.build(&spec, "test", &ResilienceSpec::default(), &resilience_registry);
        assert!(adapter.is_ok());
    }

    #[test]
    fn unregistered_custom_tag_errors() {
        let registry = SourceRegistry::new();
        let spec = SourceSpec::Custom { tag: "missing".to_string(), params: serde_json::Value::Null };
        let resilience_registry = Arc::new(ResilienceRegistry::new());
        let result = registry.build(&spec, "test", &ResilienceSpec::default(), &resilience_registry);
        assert!(result.is_err());
    }

    #[test]
    fn http_spec_builds_adapter() {
        let registry = SourceRegistry::new();
        let spec = SourceSpec::Http {
            base_url: "https://example.com".to_string(),
            endpoint: "/things".to_string(),
            method: "GET".to_string(),
            headers: vec![],
            query_params: vec![],
            auth: HttpAuth::None,
            pagination: HttpPagination::None,
            record_path: "items".to_string(),
            prefetch_depth: None,
        };
        let resilience_registry = Arc::new(ResilienceRegistry::new());
        let adapter = registry.build(&spec, "test", &ResilienceSpec::default(), &resilience_registry);
        assert!(adapter.is_ok());
    }
}
