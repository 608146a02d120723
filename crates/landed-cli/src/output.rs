use landed_bronze::BronzeRunOutcome;
use landed_silver::SilverRunOutcome;
use tracing::info;

/// Logs a completed Bronze run's outcome (§4.7 step 6, §7 observability).
pub fn print_bronze_outcome(identity: &str, outcome: &BronzeRunOutcome) {
    info!(
        identity,
        partition = %outcome.partition_path,
        record_count = outcome.record_count,
        chunk_count = outcome.chunk_count,
        bytes = outcome.byte_count,
        duration_ms = outcome.duration_ms,
        cursor = outcome.cursor.as_deref().unwrap_or("-"),
        "bronze partition written"
    );
}

/// Logs a completed Silver run's outcome, one line per written leaf
/// (`main`, or `current`/`history`/`_errors` for models that split output).
pub fn print_silver_outcome(identity: &str, outcome: &SilverRunOutcome) {
    info!(
        identity,
        bronze_partition = %outcome.bronze_partition_ref,
        model = ?outcome.applied_model,
        bad_record_count = outcome.bad_record_count,
        duration_ms = outcome.duration_ms,
        "silver run complete"
    );
    for leaf in &outcome.leaves {
        info!(
            identity,
            artifact = %leaf.artifact,
            path = %leaf.path,
            record_count = leaf.record_count,
            chunk_count = leaf.chunk_count,
            bytes = leaf.byte_count,
            "silver leaf written"
        );
    }
}
