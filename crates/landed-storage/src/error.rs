use thiserror::Error;

use landed_domain::ErrorKind;
use landed_resilience::ResilienceError;

/// §4.1 "Failure kinds": `auth`, `not-found`, `network`, `throttled`,
/// `permanent`, `unknown`. Only the first four are retriable.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("auth failed for backend '{backend}' key '{key}'")]
    Auth { backend: String, key: String },

    #[error("key '{key}' not found in backend '{backend}'")]
    NotFound { backend: String, key: String },

    #[error("network error in backend '{backend}' for key '{key}': {message}")]
    Network { backend: String, key: String, message: String },

    #[error("throttled by backend '{backend}' for key '{key}'")]
    Throttled { backend: String, key: String, retry_after_ms: Option<u64> },

    #[error("permanent error in backend '{backend}' for key '{key}': {message}")]
    Permanent { backend: String, key: String, message: String },

    #[error("unknown error in backend '{backend}' for key '{key}': {message}")]
    Unknown { backend: String, key: String, message: String },

    #[error("resilience error: {0}")]
    Resilience(#[from] ResilienceError),
}

impl StorageError {
    /// Every variant here escaped C1 (the storage backend), so — per §6's
    /// distinction between "extraction (source)" and "storage" failures —
    /// it reports as `ErrorKind::Storage` (exit code 3) regardless of the
    /// underlying network/auth/not-found/permanent sub-kind. The one
    /// exception is an explicit cancellation, which keeps its own kind so
    /// it still exits `5` instead of `3`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Resilience(ResilienceError::Cancelled) => ErrorKind::Cancelled,
            StorageError::Auth { .. }
            | StorageError::NotFound { .. }
            | StorageError::Network { .. }
            | StorageError::Throttled { .. }
            | StorageError::Permanent { .. }
            | StorageError::Unknown { .. }
            | StorageError::Resilience(_) => ErrorKind::Storage,
        }
    }
}

impl landed_resilience::Transient for StorageError {
    /// §4.2: only `network` and `throttled` retry; `auth`, `not-found`, and
    /// `permanent` propagate immediately, regardless of §4.1 listing them
    /// among backend failure kinds that carry a non-fatal classification.
    fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Network { .. } | StorageError::Throttled { .. })
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            StorageError::Throttled { retry_after_ms: Some(ms), .. } => {
                Some(std::time::Duration::from_millis(*ms))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_backend_failure_kind_maps_to_storage_exit_code() {
        let network = StorageError::Network { backend: "local".into(), key: "a".into(), message: "boom".into() };
        let auth = StorageError::Auth { backend: "local".into(), key: "a".into() };
        let not_found = StorageError::NotFound { backend: "local".into(), key: "a".into() };
        let permanent = StorageError::Permanent { backend: "local".into(), key: "a".into(), message: "boom".into() };
        let unknown = StorageError::Unknown { backend: "local".into(), key: "a".into(), message: "boom".into() };

        for err in [&network, &auth, &not_found, &permanent, &unknown] {
            assert_eq!(err.kind(), ErrorKind::Storage);
            assert_eq!(err.kind().exit_code(), 3);
        }
    }

    #[test]
    fn retry_exhaustion_on_a_storage_op_maps_to_storage_exit_code() {
        // §8: "Retry exhaustion on first attempt of an idempotent storage
        // op: exit code 3."
        let inner = StorageError::Network { backend: "local".into(), key: "a".into(), message: "boom".into() };
        let exhausted = StorageError::Resilience(ResilienceError::Exhausted {
            identity: "local.crm".into(),
            attempts: 1,
            source: Box::new(inner),
        });

        assert_eq!(exhausted.kind(), ErrorKind::Storage);
        assert_eq!(exhausted.kind().exit_code(), 3);
    }

    #[test]
    fn cancellation_during_a_storage_op_still_maps_to_cancelled() {
        let cancelled = StorageError::Resilience(ResilienceError::Cancelled);
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(cancelled.kind().exit_code(), 5);
    }
}
