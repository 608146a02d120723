use landed_domain::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BronzeError {
    #[error("policy gate rejected config: {0}")]
    Policy(#[from] landed_policy::PolicyError),

    #[error("write lease held by another non-stale run for '{partition}'")]
    LeaseHeld { partition: String },

    #[error("source error: {0}")]
    Source(#[from] landed_source::SourceError),

    #[error("chunk writer error: {0}")]
    Chunk(#[from] landed_chunk::ChunkError),

    #[error("manifest error: {0}")]
    Manifest(#[from] landed_manifest::ManifestError),

    #[error("storage error: {0}")]
    Storage(#[from] landed_storage::StorageError),

    #[error("run cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl BronzeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BronzeError::Policy(e) => e.kind(),
            BronzeError::LeaseHeld { .. } => ErrorKind::Permanent,
            BronzeError::Source(e) => e.kind(),
            BronzeError::Chunk(e) => e.kind(),
            BronzeError::Manifest(e) => e.kind(),
            BronzeError::Storage(e) => e.kind(),
            BronzeError::Cancelled => ErrorKind::Cancelled,
            BronzeError::Internal(_) => ErrorKind::Internal,
        }
    }
}
