use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::StorageBackend;
use crate::error::StorageError;

/// Resolves a [`StorageBackend`] from a `storage.backend` tag. The runner
/// never constructs concrete backend types directly (§4.1 "Registry").
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    pub fn register(&mut self, tag: impl Into<String>, backend: Arc<dyn StorageBackend>) -> &mut Self {
        self.backends.insert(tag.into(), backend);
        self
    }

    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn StorageBackend>, StorageError> {
        self.backends.get(tag).cloned().ok_or_else(|| StorageError::Permanent {
            backend: tag.to_string(),
            key: String::new(),
            message: format!("no storage backend registered under tag '{tag}'"),
        })
    }

    pub fn registered_tags(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }
}
