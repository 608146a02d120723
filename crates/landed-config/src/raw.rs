use serde::Deserialize;

use landed_domain::{
    EntityId, LoadPattern, OutputSpec, ResilienceSpec, SilverSpec, SourceSpec, StorageSpec,
    SystemId,
};

/// One configuration document as loaded from disk. §6: "each document may
/// contain multiple sources."
#[derive(Debug, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub sources: Vec<RawExtraction>,
}

/// A single source entry, missing only the parameters an invocation
/// supplies (`run_date`, and optionally `load_pattern`).
#[derive(Debug, Deserialize)]
pub struct RawExtraction {
    pub system: SystemId,
    pub entity: EntityId,
    pub load_pattern: LoadPattern,
    pub source: SourceSpec,
    pub output: OutputSpec,
    #[serde(default)]
    pub resilience: ResilienceSpec,
    #[serde(default)]
    pub silver: Option<SilverSpec>,
    pub storage: StorageSpec,
}
