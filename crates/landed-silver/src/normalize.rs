use std::collections::HashSet;

use landed_domain::{Record, SchemaMode, SilverSpec, Value};
use tracing::warn;

/// Fixed output columns a model may add on top of the source attributes
/// (§4.8): `scd_type_2`'s interval markers and `incremental_merge`'s derived
/// op tag. Always allowed under `schema_mode: strict`.
const RESERVED_COLUMNS: &[&str] = &["effective_from", "effective_to", "is_current", "change_type"];

fn known_columns(spec: &SilverSpec) -> HashSet<&str> {
    spec.natural_keys
        .iter()
        .map(String::as_str)
        .chain(spec.attributes.iter().map(String::as_str))
        .chain(spec.partition_by.iter().map(String::as_str))
        .chain(spec.event_ts_column.as_deref())
        .chain(spec.change_ts_column.as_deref())
        .chain(spec.order_column.as_deref())
        .chain(spec.delete_marker_column.as_deref())
        .chain(RESERVED_COLUMNS.iter().copied())
        .collect()
}

/// Applies §4.8's normalization step, after the model has produced a row and
/// before it's written: optional string trim / empty-to-null, the rename
/// map, then schema enforcement. Only declared columns are kept when
/// `attributes` is non-empty — the same "attributes: projection" role the
/// config loader's doc comments give the field.
pub fn normalize(mut record: Record, spec: &SilverSpec) -> Record {
    if spec.normalization.trim_strings || spec.normalization.empty_string_to_null {
        for value in record.values_mut() {
            if let Value::Str(s) = value {
                if spec.normalization.trim_strings {
                    *s = s.trim().to_string();
                }
                if spec.normalization.empty_string_to_null && s.is_empty() {
                    *value = Value::Null;
                }
            }
        }
    }

    for (from, to) in &spec.normalization.rename {
        if let Some(value) = record.remove(from) {
            record.insert(to.clone(), value);
        }
    }

    if !spec.attributes.is_empty() {
        let known = known_columns(spec);
        match spec.schema_mode {
            SchemaMode::Strict => record.retain(|k, _| known.contains(k.as_str())),
            SchemaMode::AllowNewColumns => {
                for key in record.keys() {
                    if !known.contains(key.as_str()) {
                        warn!(column = %key, "unknown column allowed under schema_mode=allow_new_columns");
                    }
                }
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::{DeleteMode, DomainId, EntityKind, ErrorHandlingSpec, NormalizationSpec};

    fn spec() -> SilverSpec {
        SilverSpec {
            entity_kind: EntityKind::State,
            history_mode: None,
            input_mode: None,
            delete_mode: DeleteMode::Ignore,
            schema_mode: SchemaMode::Strict,
            natural_keys: vec!["id".to_string()],
            event_ts_column: None,
            change_ts_column: None,
            order_column: None,
            attributes: vec!["name".to_string()],
            partition_by: vec![],
            model_choice: None,
            normalization: NormalizationSpec { trim_strings: true, empty_string_to_null: true, rename: vec![] },
            error_handling: ErrorHandlingSpec::default(),
            delete_marker_column: None,
            external_sort_budget_bytes: None,
            domain: DomainId::new("sales").unwrap(),
            version: 1,
        }
    }

    #[test]
    fn trims_and_nullifies_empty_strings() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(1));
        r.insert("name".to_string(), Value::Str("  bob  ".to_string()));
        let out = normalize(r, &spec());
        assert_eq!(out.get("name"), Some(&Value::Str("bob".to_string())));
    }

    #[test]
    fn strict_mode_drops_undeclared_columns() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(1));
        r.insert("name".to_string(), Value::Str("bob".to_string()));
        r.insert("mystery".to_string(), Value::Str("x".to_string()));
        let out = normalize(r, &spec());
        assert!(!out.contains_key("mystery"));
    }

    #[test]
    fn reserved_scd2_columns_survive_strict_mode() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(1));
        r.insert("effective_from".to_string(), Value::Int(1));
        r.insert("is_current".to_string(), Value::Bool(true));
        let out = normalize(r, &spec());
        assert!(out.contains_key("effective_from"));
        assert!(out.contains_key("is_current"));
    }
}
