use landed_domain::{Record, Value};

use crate::model::ModelRow;

/// Column names, checked in order, that a source might already use to tag
/// the kind of change a row represents (§4.8 `incremental_merge`'s "derived
/// `change_type` column"). Left undeclared, every row defaults to `upsert`.
const OP_COLUMNS: &[&str] = &["op", "change_type", "operation"];

/// §4.8 `incremental_merge`: passes every row through as-is, deriving a
/// `change_type` column from whatever op-style column the source carries.
/// Ordering and ties are the caller's responsibility — the Bronze stream's
/// own delivery order is trusted (§4.8 "Input assumption: CDC deltas").
pub fn apply(mut record: Record) -> ModelRow {
    let change_type = OP_COLUMNS.iter().find_map(|col| record.get(*col)).map(classify).unwrap_or_else(|| "upsert".to_string());
    record.insert("change_type".to_string(), Value::Str(change_type));
    ModelRow { artifact: "main", record }
}

fn classify(value: &Value) -> String {
    let text = match value {
        Value::Str(s) => s.to_ascii_lowercase(),
        _ => return "upsert".to_string(),
    };
    match text.as_str() {
        "i" | "insert" | "c" | "create" => "insert".to_string(),
        "u" | "update" => "update".to_string(),
        "d" | "delete" => "delete".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_insert_from_an_op_column() {
        let mut r = Record::new();
        r.insert("op".to_string(), Value::Str("I".to_string()));
        let row = apply(r);
        assert_eq!(row.record.get("change_type"), Some(&Value::Str("insert".to_string())));
    }

    #[test]
    fn defaults_to_upsert_without_an_op_column() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(1));
        let row = apply(r);
        assert_eq!(row.record.get("change_type"), Some(&Value::Str("upsert".to_string())));
    }
}
