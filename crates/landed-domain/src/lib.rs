mod config;
mod error;
mod ids;
mod manifest;
mod model;
mod value;

pub use config::{
    ChunkFormat, ErrorHandlingSpec, ExtractionConfig, FileFormat, HttpAuth, HttpPagination,
    NormalizationSpec, OutputSpec, ResilienceSpec, SilverSpec, SourceSpec, StorageScope,
    StorageSpec,
};
pub use error::{ErrorKind, LandedError};
pub use ids::{DomainId, EntityId, IdentifierError, SystemId};
pub use manifest::{
    ChecksumsDocument, ChunkSummary, MetadataDocument, OwnershipMeta, SchemaColumn, SchemaSnapshot,
};
pub use model::{DeleteMode, EntityKind, HistoryMode, InputMode, LoadPattern, Model, SchemaMode};
pub use value::{ColumnType, Record, Value};
