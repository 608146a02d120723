use landed_domain::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SilverError {
    #[error("config has no silver spec")]
    MissingSpec,

    #[error("policy gate rejected config: {0}")]
    Policy(#[from] landed_policy::PolicyError),

    #[error("bronze partition manifest missing at '{partition}'")]
    BronzePartitionMissing { partition: String },

    #[error("bronze partition manifest corrupt at '{partition}': {reason}")]
    BronzePartitionCorrupt { partition: String, reason: String },

    #[error("bad record quarantine threshold exceeded: {bad} bad of {total} total")]
    DataQuality { bad: u64, total: u64 },

    #[error("model invariant violated: {0}")]
    Invariant(String),

    #[error("chunk writer error: {0}")]
    Chunk(#[from] landed_chunk::ChunkError),

    #[error("manifest error: {0}")]
    Manifest(#[from] landed_manifest::ManifestError),

    #[error("storage error: {0}")]
    Storage(#[from] landed_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("run cancelled")]
    Cancelled,
}

impl SilverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SilverError::MissingSpec => ErrorKind::Config,
            SilverError::Policy(e) => e.kind(),
            SilverError::BronzePartitionMissing { .. } => ErrorKind::NotFound,
            SilverError::BronzePartitionCorrupt { .. } => ErrorKind::CorruptManifest,
            SilverError::DataQuality { .. } => ErrorKind::DataQuality,
            SilverError::Invariant(_) => ErrorKind::Internal,
            SilverError::Chunk(e) => e.kind(),
            SilverError::Manifest(e) => e.kind(),
            SilverError::Storage(e) => e.kind(),
            SilverError::Io(_) | SilverError::Serde(_) => ErrorKind::Internal,
            SilverError::Cancelled => ErrorKind::Cancelled,
        }
    }
}
