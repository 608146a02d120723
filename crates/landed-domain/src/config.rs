use serde::{Deserialize, Serialize};

use crate::ids::{DomainId, EntityId, SystemId};
use crate::model::{DeleteMode, EntityKind, HistoryMode, InputMode, LoadPattern, Model, SchemaMode};

/// The fully resolved intent of one run (§3 "Extraction config"). Produced by
/// `landed-config` from a parsed document; everything downstream of C9 takes
/// this type, never the raw document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub system: SystemId,
    pub entity: EntityId,
    pub run_date: chrono::NaiveDate,
    pub load_pattern: LoadPattern,
    pub source: SourceSpec,
    pub output: OutputSpec,
    pub resilience: ResilienceSpec,
    pub silver: Option<SilverSpec>,
    pub storage: StorageSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSpec {
    Http {
        base_url: String,
        endpoint: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: Vec<(String, String)>,
        #[serde(default)]
        query_params: Vec<(String, String)>,
        #[serde(default)]
        auth: HttpAuth,
        #[serde(default)]
        pagination: HttpPagination,
        record_path: String,
        #[serde(default)]
        prefetch_depth: Option<u32>,
    },
    Sql {
        driver: String,
        connection_ref: String,
        query: String,
        #[serde(default)]
        watermark_column: Option<String>,
        #[serde(default)]
        last_watermark: Option<String>,
        batch_size: u32,
    },
    File {
        glob: String,
        format: FileFormat,
        #[serde(default)]
        projection: Option<Vec<String>>,
        #[serde(default)]
        row_limit: Option<u64>,
    },
    Custom {
        tag: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HttpAuth {
    #[default]
    None,
    Bearer {
        token_env: String,
    },
    HeaderKey {
        header: String,
        token_env: String,
    },
    Basic {
        user_env: String,
        password_env: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HttpPagination {
    #[default]
    None,
    Offset {
        size: u32,
        offset_param: String,
        limit_param: String,
    },
    Page {
        page_param: String,
        size_param: String,
    },
    Cursor {
        next_field_path: String,
        request_param: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
    Columnar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkFormat {
    Columnar,
    Row,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    pub format_set: Vec<ChunkFormat>,
    #[serde(default)]
    pub compression: Option<String>,
    pub max_rows_per_chunk: u64,
    pub max_bytes_per_chunk: u64,
    #[serde(default)]
    pub parallel_workers: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceSpec {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub jitter_fraction: f64,
    pub breaker_threshold: u32,
    pub breaker_cooldown_s: u64,
    pub rate_limit_rps: f64,
    pub rate_limit_burst: u32,
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ResilienceSpec {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2.0,
            jitter_fraction: 0.2,
            breaker_threshold: 5,
            breaker_cooldown_s: 30,
            rate_limit_rps: 10.0,
            rate_limit_burst: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilverSpec {
    pub entity_kind: EntityKind,
    #[serde(default)]
    pub history_mode: Option<HistoryMode>,
    #[serde(default)]
    pub input_mode: Option<InputMode>,
    #[serde(default)]
    pub delete_mode: DeleteMode,
    #[serde(default)]
    pub schema_mode: SchemaMode,
    pub natural_keys: Vec<String>,
    #[serde(default)]
    pub event_ts_column: Option<String>,
    #[serde(default)]
    pub change_ts_column: Option<String>,
    #[serde(default)]
    pub order_column: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub partition_by: Vec<String>,
    #[serde(default)]
    pub model_choice: Option<Model>,
    #[serde(default)]
    pub normalization: NormalizationSpec,
    #[serde(default)]
    pub error_handling: ErrorHandlingSpec,
    /// Column whose value flags a delete tombstone (§4.8 "Delete
    /// semantics"). The distilled spec names the three `delete_mode`
    /// behaviors but not how a delete is recognized on the wire; left unset,
    /// no row is ever treated as a tombstone.
    #[serde(default)]
    pub delete_marker_column: Option<String>,
    /// Per-merge-run memory budget driving the external-sort bucket count
    /// (§4.8, §9 "Streaming large partitions"). Defaults applied by
    /// `landed-silver` when unset.
    #[serde(default)]
    pub external_sort_budget_bytes: Option<u64>,
    pub domain: DomainId,
    pub version: u32,
}

impl Default for DeleteMode {
    fn default() -> Self {
        DeleteMode::Ignore
    }
}

impl Default for SchemaMode {
    fn default() -> Self {
        SchemaMode::Strict
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationSpec {
    #[serde(default)]
    pub trim_strings: bool,
    #[serde(default)]
    pub empty_string_to_null: bool,
    #[serde(default)]
    pub rename: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHandlingSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_bad_records: Option<u64>,
    #[serde(default)]
    pub max_bad_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageScope {
    Onprem,
    Cloud,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSpec {
    pub backend: String,
    pub container: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub credential_ref: Option<String>,
    pub scope: StorageScope,
    #[serde(default)]
    pub boundary: Option<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_auth_defaults_to_none() {
        let auth: HttpAuth = Default::default();
        assert!(matches!(auth, HttpAuth::None));
    }

    #[test]
    fn resilience_spec_default_is_sane() {
        let r = ResilienceSpec::default();
        assert!(r.max_attempts >= 1);
        assert!(r.max_delay_ms >= r.base_delay_ms);
    }
}
