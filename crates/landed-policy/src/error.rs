use landed_domain::ErrorKind;
use thiserror::Error;

/// A single policy-gate rejection (§4.9). `code` is a stable, machine-greppable
/// tag; `message` carries the human-readable detail.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("[{code}] {message}")]
    Violation { code: &'static str, message: String },

    #[error("{} policy violations", .0.len())]
    Multiple(Vec<PolicyError>),
}

impl PolicyError {
    pub fn violation(code: &'static str, message: impl Into<String>) -> Self {
        PolicyError::Violation { code, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }

    /// Flattens a `Multiple` into its leaves; a non-`Multiple` error flattens
    /// to itself. Used by callers that want one violation list regardless of
    /// how `validate` grouped them.
    pub fn into_violations(self) -> Vec<PolicyError> {
        match self {
            PolicyError::Multiple(errors) => errors,
            other => vec![other],
        }
    }
}
