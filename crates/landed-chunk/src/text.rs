use landed_domain::Value;

/// Shared cell-to-text rendering used by both the columnar (dictionary
/// values) and row-delimited writers so a value reads identically in either
/// format.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Timestamp(t) => t.to_rfc3339(),
    }
}
