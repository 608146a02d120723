use landed_domain::Record;

use crate::model::ModelRow;

/// §4.8 `periodic_snapshot`: the curated artifact is an exact passthrough of
/// the Bronze input for that run date. No grouping, no ordering — every row
/// streams straight through.
pub fn apply(record: Record) -> ModelRow {
    ModelRow { artifact: "main", record }
}
