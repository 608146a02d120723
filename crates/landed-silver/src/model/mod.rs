pub mod dedupe;
pub mod incremental;
pub mod scd2;
pub mod snapshot;

use landed_domain::Record;

/// One transformed output row plus which logical artifact it belongs to.
/// Every model but `scd_type_2` produces only `"main"` (§4.8).
#[derive(Debug, Clone)]
pub struct ModelRow {
    pub artifact: &'static str,
    pub record: Record,
}
