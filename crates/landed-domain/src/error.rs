use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error taxonomy (§7). Every component surfaces failures through one
/// of these kinds so the CLI can map a run's worst error to an exit code
/// without inspecting component-local error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Auth,
    Network,
    Permanent,
    NotFound,
    Storage,
    CorruptManifest,
    DataQuality,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// §6 exit code table. `Network` and `Auth` are retryable by the caller
    /// but still map to the extraction failure code when they escape C2 from
    /// a source adapter. `Storage` is the dedicated code for failures that
    /// escape C1 (the storage backend) instead — §4.7 distinguishes
    /// "extraction (source)" failures from "storage" failures even though
    /// both can surface the same underlying network/auth/not-found kind.
    /// `Internal` deliberately sits outside 0-5: §6 says "any other non-zero
    /// value is an internal error," so it must never alias a reserved code.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Config => 1,
            ErrorKind::Auth | ErrorKind::Network | ErrorKind::NotFound | ErrorKind::Permanent => 2,
            ErrorKind::Storage => 3,
            ErrorKind::CorruptManifest | ErrorKind::DataQuality => 4,
            ErrorKind::Cancelled => 5,
            ErrorKind::Internal => 6,
        }
    }

    /// Whether C2's retry policy should ever attempt this kind again.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Auth)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Config => "config",
            ErrorKind::Auth => "auth",
            ErrorKind::Network => "network",
            ErrorKind::Permanent => "permanent",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::CorruptManifest => "corrupt_manifest",
            ErrorKind::DataQuality => "data_quality",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

/// A single-line error summary carrying enough context (§7) to diagnose a
/// failed run from logs alone: which component, which identifier, what kind.
#[derive(Debug, Error)]
#[error("{component}: {kind} ({identifier}): {message}")]
pub struct LandedError {
    pub kind: ErrorKind,
    pub component: &'static str,
    pub identifier: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl LandedError {
    pub fn new(
        kind: ErrorKind,
        component: &'static str,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            component,
            identifier: identifier.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec_table() {
        assert_eq!(ErrorKind::Config.exit_code(), 1);
        assert_eq!(ErrorKind::Network.exit_code(), 2);
        assert_eq!(ErrorKind::Auth.exit_code(), 2);
        assert_eq!(ErrorKind::NotFound.exit_code(), 2);
        assert_eq!(ErrorKind::Permanent.exit_code(), 2);
        assert_eq!(ErrorKind::Storage.exit_code(), 3);
        assert_eq!(ErrorKind::CorruptManifest.exit_code(), 4);
        assert_eq!(ErrorKind::DataQuality.exit_code(), 4);
        assert_eq!(ErrorKind::Cancelled.exit_code(), 5);
    }

    #[test]
    fn internal_never_aliases_a_reserved_exit_code() {
        assert!(!(0..=5).contains(&ErrorKind::Internal.exit_code()));
    }

    #[test]
    fn only_network_and_auth_are_retryable() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Auth.is_retryable());
        assert!(!ErrorKind::Permanent.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
    }

    #[test]
    fn display_is_single_line() {
        let err = LandedError::new(ErrorKind::NotFound, "landed-source", "crm.accounts", "missing cursor");
        let rendered = err.to_string();
        assert!(!rendered.contains('\n'));
        assert!(rendered.contains("not_found"));
    }
}
