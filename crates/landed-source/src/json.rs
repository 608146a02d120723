use landed_domain::{Record, Value};

pub(crate) fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => match chrono::DateTime::parse_from_rfc3339(&s) {
            Ok(t) => Value::Timestamp(t.with_timezone(&chrono::Utc)),
            Err(_) => Value::Str(s),
        },
        other => Value::Str(other.to_string()),
    }
}

pub(crate) fn json_object_to_record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect(),
        other => {
            let mut record = Record::new();
            record.insert("value".to_string(), json_to_value(other));
            record
        }
    }
}

/// Dot-separated path navigation into a parsed JSON response body (§4.3
/// "response-body record extraction path"). An empty path selects the root.
pub(crate) fn navigate_record_path<'a>(root: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if path.is_empty() || path == "." {
        return Some(root);
    }
    let mut current = root;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigates_nested_path() {
        let body = serde_json::json!({"data": {"items": [1, 2, 3]}});
        let found = navigate_record_path(&body, "data.items").unwrap();
        assert_eq!(found.as_array().unwrap().len(), 3);
    }

    #[test]
    fn empty_path_selects_root() {
        let body = serde_json::json!([1, 2]);
        let found = navigate_record_path(&body, "").unwrap();
        assert!(found.is_array());
    }

    #[test]
    fn string_looking_like_timestamp_parses_as_timestamp() {
        let value = json_to_value(serde_json::json!("2024-01-01T00:00:00Z"));
        assert!(matches!(value, Value::Timestamp(_)));
    }
}
