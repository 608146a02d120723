//! Partition path planner (§4.4, C4). Pure functions: given the identifying
//! tuple for a Bronze or Silver partition, compute its storage key. No I/O,
//! no side effects — the runner calls these before touching a backend.

use chrono::NaiveDate;
use landed_domain::{DomainId, EntityId, LoadPattern, SystemId};

/// Bronze partition address: `[prefix]/system=<s>/table=<e>/pattern=<p>/dt=<date>/`.
#[derive(Debug, Clone)]
pub struct BronzePartition {
    pub system: SystemId,
    pub entity: EntityId,
    pub load_pattern: LoadPattern,
    pub run_date: NaiveDate,
}

impl BronzePartition {
    /// Storage key of the partition directory, with a trailing slash so it
    /// composes cleanly with chunk file names (`part-0001.parquet`, ...).
    pub fn path(&self, prefix: Option<&str>) -> String {
        let body = format!(
            "system={}/table={}/pattern={}/dt={}/",
            self.system,
            self.entity,
            self.load_pattern,
            self.run_date.format("%Y-%m-%d"),
        );
        join_prefix(prefix, &body)
    }

    /// The staging sibling directory used by the atomic commit protocol
    /// (§4.5 step 1): `partition_dir + ".staging-" + run_id`.
    pub fn staging_path(&self, prefix: Option<&str>, run_id: &str) -> String {
        let base = self.path(prefix);
        format!("{}.staging-{run_id}", base.trim_end_matches('/'))
    }
}

/// Silver partition address:
/// `[prefix]/domain=<d>/entity=<e>/v<n>/load_date=<date>/[k=v/]*`.
#[derive(Debug, Clone)]
pub struct SilverPartition {
    pub domain: DomainId,
    pub entity: EntityId,
    pub version: u32,
    pub load_date: NaiveDate,
    pub secondary: Vec<(String, String)>,
}

impl SilverPartition {
    pub fn path(&self, prefix: Option<&str>) -> String {
        let mut body = format!(
            "domain={}/entity={}/v{}/load_date={}/",
            self.domain,
            self.entity,
            self.version,
            self.load_date.format("%Y-%m-%d"),
        );
        for (k, v) in &self.secondary {
            body.push_str(&format!("{k}={v}/"));
        }
        join_prefix(prefix, &body)
    }

    pub fn staging_path(&self, prefix: Option<&str>, run_id: &str) -> String {
        let base = self.path(prefix);
        format!("{}.staging-{run_id}", base.trim_end_matches('/'))
    }
}

fn join_prefix(prefix: Option<&str>, body: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}/{body}", p.trim_end_matches('/')),
        _ => body.to_string(),
    }
}

/// Sequence number to chunk file name, per §3 ("named with a monotone
/// sequence ... no gaps"). `ext` is the format-specific extension
/// (`parquet`, `csv`).
pub fn chunk_file_name(sequence: u32, ext: &str) -> String {
    format!("part-{sequence:04}.{ext}")
}

pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const CHECKSUMS_FILE_NAME: &str = "checksums.json";

#[cfg(test)]
mod tests {
    use super::*;

    fn bronze() -> BronzePartition {
        BronzePartition {
            system: SystemId::new("crm").unwrap(),
            entity: EntityId::new("accounts").unwrap(),
            load_pattern: LoadPattern::Full,
            run_date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        }
    }

    #[test]
    fn bronze_path_matches_spec_layout() {
        assert_eq!(
            bronze().path(None),
            "system=crm/table=accounts/pattern=full/dt=2026-07-28/"
        );
    }

    #[test]
    fn bronze_path_honors_prefix() {
        assert_eq!(
            bronze().path(Some("s3://bucket/landing")),
            "s3://bucket/landing/system=crm/table=accounts/pattern=full/dt=2026-07-28/"
        );
    }

    #[test]
    fn staging_path_is_a_sibling_of_the_partition_dir() {
        let p = bronze().staging_path(None, "run-123");
        assert_eq!(p, "system=crm/table=accounts/pattern=full/dt=2026-07-28.staging-run-123");
    }

    #[test]
    fn silver_path_includes_secondary_partitions() {
        let sp = SilverPartition {
            domain: DomainId::new("sales").unwrap(),
            entity: EntityId::new("accounts").unwrap(),
            version: 1,
            load_date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            secondary: vec![("region".to_string(), "us".to_string())],
        };
        assert_eq!(
            sp.path(None),
            "domain=sales/entity=accounts/v1/load_date=2026-07-28/region=us/"
        );
    }

    #[test]
    fn chunk_file_name_is_zero_padded_and_gapless_by_construction() {
        assert_eq!(chunk_file_name(1, "parquet"), "part-0001.parquet");
        assert_eq!(chunk_file_name(42, "csv"), "part-0042.csv");
    }
}
