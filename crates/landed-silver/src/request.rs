use landed_domain::Model;

/// One Silver run's parameters, parallel to `landed_bronze::BronzeRunRequest`
/// — the config plus the run-scoped knobs that don't belong on disk.
#[derive(Debug, Clone)]
pub struct SilverRunRequest {
    pub run_id: String,
    pub storage_prefix: Option<String>,
    /// Overrides the bucket count the external-sort pass would otherwise
    /// derive from the Bronze partition's byte total and the configured
    /// memory budget (§4.8, §9).
    pub bucket_count: Option<usize>,
}

/// One written artifact leaf (e.g. `main`, or `current`/`history` for
/// `scd_type_2`, or `_errors`).
#[derive(Debug, Clone, Default)]
pub struct SilverLeafOutcome {
    pub artifact: String,
    pub path: String,
    pub record_count: u64,
    pub chunk_count: u64,
    pub byte_count: u64,
}

/// Result of one successful Silver run.
#[derive(Debug, Clone, Default)]
pub struct SilverRunOutcome {
    pub bronze_partition_ref: String,
    pub applied_model: Option<Model>,
    pub leaves: Vec<SilverLeafOutcome>,
    pub bad_record_count: u64,
    pub duration_ms: u64,
}
