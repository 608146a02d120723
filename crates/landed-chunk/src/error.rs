use thiserror::Error;

use landed_domain::ErrorKind;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("storage error: {0}")]
    Storage(#[from] landed_storage::StorageError),

    #[error("manifest error: {0}")]
    Manifest(#[from] landed_manifest::ManifestError),

    #[error("chunk decode error: {0}")]
    Decode(String),
}

impl ChunkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChunkError::Storage(e) => e.kind(),
            ChunkError::Manifest(e) => e.kind(),
            ChunkError::Io(_)
            | ChunkError::Csv(_)
            | ChunkError::Arrow(_)
            | ChunkError::Parquet(_)
            | ChunkError::Decode(_) => ErrorKind::Internal,
        }
    }
}
