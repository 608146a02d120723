use landed_domain::{ErrorHandlingSpec, Record, SilverSpec, Value};

/// A row is bad when any natural key or any declared `partition_by` column
/// is missing or null (§4.8 "Error handling": "a row is bad if any natural
/// key is null or a required column is missing" — `partition_by` columns
/// are required too, since a row with no partition value has nowhere to
/// land). Returns the reason, for logging and for the quarantined row's own
/// bookkeeping.
pub fn bad_record_reason(record: &Record, spec: &SilverSpec) -> Option<String> {
    for key in spec.natural_keys.iter().chain(spec.partition_by.iter()) {
        match record.get(key) {
            None => return Some(format!("required column '{key}' is missing")),
            Some(Value::Null) => return Some(format!("required column '{key}' is null")),
            _ => {}
        }
    }
    None
}

/// Checks the accumulated bad-row count against `error_handling`'s
/// thresholds (§4.8). Disabled error handling means any bad row is fatal
/// immediately — so a non-zero count always exceeds it.
pub fn enforce_threshold(bad: u64, total: u64, spec: &ErrorHandlingSpec) -> Result<(), (u64, u64)> {
    if bad == 0 {
        return Ok(());
    }
    if !spec.enabled {
        return Err((bad, total));
    }
    if let Some(max) = spec.max_bad_records {
        if bad > max {
            return Err((bad, total));
        }
    }
    if let Some(max_percent) = spec.max_bad_percent {
        let percent = if total == 0 { 100.0 } else { (bad as f64 / total as f64) * 100.0 };
        if percent > max_percent {
            return Err((bad, total));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::{DeleteMode, DomainId, EntityKind, NormalizationSpec, SchemaMode};

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
            attributes: vec![],
            partition_by: vec![],
            model_choice: None,
            normalization: NormalizationSpec::default(),
            error_handling: ErrorHandlingSpec::default(),
            delete_marker_column: None,
            external_sort_budget_bytes: None,
            domain: DomainId::new("sales").unwrap(),
            version: 1,
        }
    }

    #[test]
    fn missing_natural_key_is_bad() {
        let r = Record::new();
        assert!(bad_record_reason(&r, &spec()).is_some());
    }

    #[test]
    fn null_natural_key_is_bad() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Null);
        assert!(bad_record_reason(&r, &spec()).is_some());
    }

    #[test]
    fn present_natural_key_is_fine() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(1));
        assert!(bad_record_reason(&r, &spec()).is_none());
    }

    #[test]
    fn disabled_error_handling_fails_on_any_bad_row() {
        let spec = ErrorHandlingSpec { enabled: false, max_bad_records: None, max_bad_percent: None };
        assert!(enforce_threshold(1, 100, &spec).is_err());
    }

    #[test]
    fn enabled_error_handling_tolerates_rows_under_the_cap() {
        let spec = ErrorHandlingSpec { enabled: true, max_bad_records: Some(5), max_bad_percent: None };
        assert!(enforce_threshold(3, 100, &spec).is_ok());
        assert!(enforce_threshold(6, 100, &spec).is_err());
    }
}
