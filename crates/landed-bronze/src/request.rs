use landed_domain::{ChunkSummary, SchemaColumn};

/// One Bronze run's parameters, resolved ahead of time by the caller (the
/// CLI's `bronze` subcommand): the config itself plus the run-scoped knobs
/// that don't belong in the on-disk config document.
#[derive(Debug, Clone)]
pub struct BronzeRunRequest {
    pub run_id: String,
    pub storage_prefix: Option<String>,
    /// How long a staging directory may sit unclaimed before a later run is
    /// allowed to reclaim it (§4.7 step 2, "stale = older than `T_stale`").
    pub stale_after: chrono::Duration,
    /// Bounded channel depth between the source adapter and the chunk
    /// writer (§4.7 step 4); falls back to the source spec's own
    /// `prefetch_depth` when unset.
    pub prefetch_depth: usize,
}

/// Result of one successful Bronze run (§4.7 steps 5-6).
#[derive(Debug, Clone)]
pub struct BronzeRunOutcome {
    pub partition_path: String,
    pub record_count: u64,
    pub chunk_count: u64,
    pub byte_count: u64,
    pub duration_ms: u64,
    pub cursor: Option<String>,
    pub schema: Vec<SchemaColumn>,
    pub chunks: Vec<ChunkSummary>,
}
