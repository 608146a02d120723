use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single record field value. Records are schema-on-read: the same field
/// name may carry different variants across rows within one extraction,
/// which is exactly what `ColumnType::Mixed` exists to describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Int(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Floating,
            Value::Str(_) => ColumnType::String,
            Value::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// An unordered mapping from field name to value. `BTreeMap` gives records a
/// canonical iteration order for free, which the lexicographic tie-breaker in
/// §4.8 and the manifest hash in landed-chunk both rely on.
pub type Record = BTreeMap<String, Value>;

/// The fixed type lattice schema snapshots are drawn from (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    Integer,
    Floating,
    String,
    Timestamp,
    Null,
    /// Observed heterogeneity: more than one non-null variant seen for this
    /// column across the extraction.
    Mixed,
}

impl ColumnType {
    /// Widen two observed types for the same column into the lattice's join.
    pub fn join(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::Null, other) | (other, ColumnType::Null) => other,
            _ => ColumnType::Mixed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_same_type_is_identity() {
        assert_eq!(ColumnType::Integer.join(ColumnType::Integer), ColumnType::Integer);
    }

    #[test]
    fn join_null_widens_to_other() {
        assert_eq!(ColumnType::Null.join(ColumnType::String), ColumnType::String);
    }

    #[test]
    fn join_distinct_nonnull_is_mixed() {
        assert_eq!(ColumnType::Integer.join(ColumnType::String), ColumnType::Mixed);
    }
}
