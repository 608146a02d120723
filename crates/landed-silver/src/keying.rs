use landed_domain::{Record, Value};

const SEPARATOR: u8 = 0x1f; // ASCII unit separator

/// Canonical byte encoding of a record's natural-key tuple, used both to
/// choose an external-sort bucket and (as a string) to group rows sharing a
/// key back together once a bucket is read into memory (§4.8 "external-sort
/// strategy").
pub fn natural_key_bytes(record: &Record, natural_keys: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for key in natural_keys {
        let text = column_text(record, key);
        buf.extend_from_slice(text.as_bytes());
        buf.push(SEPARATOR);
    }
    buf
}

pub fn natural_key_string(record: &Record, natural_keys: &[String]) -> String {
    String::from_utf8_lossy(&natural_key_bytes(record, natural_keys)).into_owned()
}

/// Same rendering `landed_chunk`'s writers use for columnar/row-delimited
/// cells, duplicated here since it isn't exported across the crate
/// boundary — keying is a distinct concern from encoding.
pub fn column_text(record: &Record, column: &str) -> String {
    match record.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::Float(f)) => f.to_string(),
        Some(Value::Str(s)) => s.clone(),
        Some(Value::Timestamp(t)) => t.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_values_produce_the_same_string() {
        let mut a = Record::new();
        a.insert("id".to_string(), Value::Int(1));
        let mut b = Record::new();
        b.insert("id".to_string(), Value::Int(1));
        b.insert("extra".to_string(), Value::Str("ignored".to_string()));
        let keys = vec!["id".to_string()];
        assert_eq!(natural_key_string(&a, &keys), natural_key_string(&b, &keys));
    }

    #[test]
    fn different_key_values_produce_different_strings() {
        let mut a = Record::new();
        a.insert("id".to_string(), Value::Int(1));
        let mut b = Record::new();
        b.insert("id".to_string(), Value::Int(2));
        let keys = vec!["id".to_string()];
        assert_ne!(natural_key_string(&a, &keys), natural_key_string(&b, &keys));
    }
}
