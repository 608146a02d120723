use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{LoadPattern, Model};
use crate::value::ColumnType;

/// One column entry in a [`SchemaSnapshot`] (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub columns: Vec<SchemaColumn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnershipMeta {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub boundary: Option<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
}

/// Per-chunk entry carried inside the metadata document's chunk summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub file_name: String,
    pub record_count: u64,
    pub byte_count: u64,
}

/// The metadata sidecar document (§3, §6). One per partition, written once at
/// commit time, never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub system: String,
    pub entity: String,
    pub run_date: chrono::NaiveDate,
    pub load_pattern: LoadPattern,
    pub record_count: u64,
    pub chunk_count: u64,
    pub chunk_bytes_total: u64,
    pub duration_ms: u64,
    pub format_list: Vec<String>,
    pub run_id: String,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub ownership: Option<OwnershipMeta>,
    #[serde(default)]
    pub schema: Option<SchemaSnapshot>,
    #[serde(default)]
    pub chunks: Vec<ChunkSummary>,
    #[serde(default)]
    pub bronze_partition_ref: Option<String>,
    #[serde(default)]
    pub applied_model: Option<Model>,
    /// Which tie-break rule was used for a full-pass model, recorded per the
    /// open question in §9 so downstream consumers can tell.
    #[serde(default)]
    pub tie_break_rule: Option<String>,
}

/// The checksums sidecar document: `{ "<part-file-name>": "<hex-sha256>" }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumsDocument {
    pub entries: BTreeMap<String, String>,
}

impl ChecksumsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, hex_sha256: impl Into<String>) {
        self.entries.insert(file_name.into(), hex_sha256.into());
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(|s| s.as_str())
    }
}
