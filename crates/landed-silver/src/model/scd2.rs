use landed_domain::{DeleteMode, Record, SilverSpec, Value};

use crate::model::ModelRow;
use crate::tie_break::record_lexical_key;

/// One instant a row's interval can begin or end at. Keeps the original
/// `Value` so the output carries whatever type the source used — a real
/// `Timestamp`, or the bare `Int` counters the abstract CDC walkthroughs in
/// §8 use for readability.
#[derive(Clone)]
struct Instant {
    value: Value,
    key: i64,
}

fn to_instant(value: &Value) -> Option<Instant> {
    let key = match value {
        Value::Timestamp(t) => t.timestamp_micros(),
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        _ => return None,
    };
    Some(Instant { value: value.clone(), key })
}

/// A version's place in time: the row's own `effective_from` if the Bronze
/// feed already shaped it as current/history (input scenario 2 in §8),
/// otherwise `event_ts_column`, otherwise `change_ts_column`.
fn version_instant(record: &Record, spec: &SilverSpec) -> Option<Instant> {
    record
        .get("effective_from")
        .and_then(to_instant)
        .or_else(|| spec.event_ts_column.as_deref().and_then(|c| record.get(c)).and_then(to_instant))
        .or_else(|| spec.change_ts_column.as_deref().and_then(|c| record.get(c)).and_then(to_instant))
}

fn is_delete_marker(record: &Record, spec: &SilverSpec) -> bool {
    let Some(col) = spec.delete_marker_column.as_deref() else { return false };
    match record.get(col) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Str(s)) => matches!(s.to_ascii_lowercase().as_str(), "d" | "delete" | "deleted"),
        _ => false,
    }
}

fn close(attrs: Record, from: &Value, to: &Value, is_current: bool) -> Record {
    let mut row = attrs;
    row.insert("effective_from".to_string(), from.clone());
    row.insert("effective_to".to_string(), to.clone());
    row.insert("is_current".to_string(), Value::Bool(is_current));
    row
}

/// §4.8 `scd_type_2`: builds non-overlapping `[effective_from, effective_to)`
/// intervals for one natural-key group from its chronologically ordered
/// versions, applying `delete_mode` at each delete marker. Returns every
/// history row (oldest first, including the still-open one if any) and,
/// separately, the still-open row as the `current` artifact.
///
/// Rows with no discoverable version instant are dropped — the engine
/// routes them to quarantine before a group ever reaches this function, so
/// in practice this only strips rows that genuinely have nothing to place.
pub fn apply(mut versions: Vec<Record>, spec: &SilverSpec) -> (Vec<ModelRow>, Option<ModelRow>) {
    versions.retain(|r| version_instant(r, spec).is_some());
    versions.sort_by(|a, b| {
        let ka = version_instant(a, spec).expect("retained above");
        let kb = version_instant(b, spec).expect("retained above");
        ka.key.cmp(&kb.key).then_with(|| record_lexical_key(a).cmp(&record_lexical_key(b)))
    });

    let mut history = Vec::new();
    let mut open: Option<(Instant, Record)> = None;

    for record in versions {
        let ts = version_instant(&record, spec).expect("retained above");

        if is_delete_marker(&record, spec) && spec.delete_mode != DeleteMode::Ignore {
            if let Some((from, attrs)) = open.take() {
                history.push(ModelRow { artifact: "history", record: close(attrs, &from.value, &ts.value, false) });
            }
            if spec.delete_mode == DeleteMode::TombstoneEvent {
                let event_row = close(record, &ts.value, &ts.value, false);
                history.push(ModelRow { artifact: "history", record: event_row });
            }
            continue;
        }

        if let Some((from, attrs)) = open.take() {
            history.push(ModelRow { artifact: "history", record: close(attrs, &from.value, &ts.value, false) });
        }
        open = Some((ts, record));
    }

    let current = open.map(|(from, attrs)| {
        let record = close(attrs, &from.value, &Value::Null, true);
        ModelRow { artifact: "current", record }
    });

    if let Some(row) = &current {
        history.push(ModelRow { artifact: "history", record: row.record.clone() });
    }

    (history, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::{DomainId, EntityKind, ErrorHandlingSpec, NormalizationSpec, SchemaMode};

    fn base_spec(delete_mode: DeleteMode) -> SilverSpec {
        SilverSpec {
            entity_kind: EntityKind::State,
            history_mode: None,
            input_mode: None,
            delete_mode,
            schema_mode: SchemaMode::AllowNewColumns,
            natural_keys: vec!["id".to_string()],
            event_ts_column: Some("ts".to_string()),
            change_ts_column: None,
            order_column: None,
            attributes: vec![],
            partition_by: vec![],
            model_choice: None,
            normalization: NormalizationSpec::default(),
            error_handling: ErrorHandlingSpec::default(),
            delete_marker_column: Some("op".to_string()),
            external_sort_budget_bytes: None,
            domain: DomainId::new("sales").unwrap(),
            version: 1,
        }
    }

    fn row(id: i64, ts: i64, op: &str) -> Record {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(id));
        r.insert("ts".to_string(), Value::Int(ts));
        r.insert("op".to_string(), Value::Str(op.to_string()));
        r
    }

    #[test]
    fn cdc_stream_with_tombstone_state_closes_the_key_with_no_current() {
        // §8 scenario: insert at ts=1, update at ts=2, delete at ts=3.
        let spec = base_spec(DeleteMode::TombstoneState);
        let versions = vec![row(1, 1, "I"), row(1, 2, "U"), row(1, 3, "D")];

        let (history, current) = apply(versions, &spec);

        assert!(current.is_none());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].record.get("effective_from"), Some(&Value::Int(1)));
        assert_eq!(history[0].record.get("effective_to"), Some(&Value::Int(2)));
        assert_eq!(history[1].record.get("effective_from"), Some(&Value::Int(2)));
        assert_eq!(history[1].record.get("effective_to"), Some(&Value::Int(3)));
        assert_eq!(history[1].record.get("is_current"), Some(&Value::Bool(false)));
    }

    #[test]
    fn current_history_feed_builds_two_intervals_plus_an_open_current() {
        // §8 scenario: effective_from-tagged rows, no delete.
        let spec = base_spec(DeleteMode::Ignore);
        let mut v1 = Record::new();
        v1.insert("id".to_string(), Value::Int(1));
        v1.insert("effective_from".to_string(), Value::Int(1));
        v1.insert("value".to_string(), Value::Str("x".to_string()));
        let mut v2 = Record::new();
        v2.insert("id".to_string(), Value::Int(1));
        v2.insert("effective_from".to_string(), Value::Int(5));
        v2.insert("value".to_string(), Value::Str("y".to_string()));

        let (history, current) = apply(vec![v1, v2], &spec);

        assert!(current.is_some());
        let current = current.unwrap();
        assert_eq!(current.record.get("value"), Some(&Value::Str("y".to_string())));
        assert_eq!(current.record.get("effective_to"), Some(&Value::Null));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].record.get("effective_to"), Some(&Value::Int(5)));
    }
}
