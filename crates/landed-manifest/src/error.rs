use thiserror::Error;

use landed_domain::ErrorKind;
use landed_storage::StorageError;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("storage error reading manifest: {0}")]
    Storage(#[from] StorageError),

    #[error("manifest document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("local scratch file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt manifest for partition '{partition}': {reason}")]
    Corrupt { partition: String, reason: String },
}

impl ManifestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManifestError::Storage(e) => e.kind(),
            ManifestError::Serialization(_) | ManifestError::Corrupt { .. } => ErrorKind::CorruptManifest,
            ManifestError::Io(_) => ErrorKind::Internal,
        }
    }
}
