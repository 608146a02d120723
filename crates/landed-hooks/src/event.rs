use chrono::{DateTime, Utc};
use landed_domain::{ErrorKind, SchemaColumn};
use serde::Serialize;

/// The hook surface (§4.10): a small, fixed set of lifecycle events, each a
/// structured record. A sink sees these in emission order for a single run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HookEvent {
    RunStarted { run_id: String, at: DateTime<Utc>, system: String, entity: String },
    RunCompleted { run_id: String, at: DateTime<Utc>, record_count: u64, chunk_count: u64 },
    RunFailed { run_id: String, at: DateTime<Utc>, kind: ErrorKind, message: String },
    PartitionWritten { run_id: String, at: DateTime<Utc>, path: String, record_count: u64, chunk_count: u64, bytes: u64 },
    SchemaSnapshot { run_id: String, at: DateTime<Utc>, path: String, columns: Vec<SchemaColumn> },
}

impl HookEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::RunStarted { .. } => "run_started",
            HookEvent::RunCompleted { .. } => "run_completed",
            HookEvent::RunFailed { .. } => "run_failed",
            HookEvent::PartitionWritten { .. } => "partition_written",
            HookEvent::SchemaSnapshot { .. } => "schema_snapshot",
        }
    }
}
