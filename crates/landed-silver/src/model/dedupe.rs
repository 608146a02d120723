use landed_domain::{Record, SilverSpec};

use crate::model::ModelRow;
use crate::tie_break::select_winner;

/// §4.8 `full_merge_dedupe` / `scd_type_1`: collapse one natural-key group to
/// its single winning row per the tie-break rule (maximum `order_column`,
/// then `change_ts_column`, then lexicographic). Both models share this
/// logic — `scd_type_1` is just `full_merge_dedupe` without history, which
/// is exactly what this function already produces.
pub fn apply(group: Vec<Record>, spec: &SilverSpec) -> (ModelRow, &'static str) {
    let (index, rule) = select_winner(&group, spec.order_column.as_deref(), spec.change_ts_column.as_deref());
    let mut group = group;
    let record = group.swap_remove(index);
    (ModelRow { artifact: "main", record }, rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::{DeleteMode, DomainId, EntityKind, ErrorHandlingSpec, NormalizationSpec, SchemaMode, Value};

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
            order_column: Some("version".to_string()),
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
    fn keeps_only_the_highest_version_row() {
        let mut r1 = Record::new();
        r1.insert("id".to_string(), Value::Int(1));
        r1.insert("version".to_string(), Value::Int(1));
        let mut r2 = Record::new();
        r2.insert("id".to_string(), Value::Int(1));
        r2.insert("version".to_string(), Value::Int(2));

        let (row, _) = apply(vec![r1, r2], &spec());
        assert_eq!(row.record.get("version"), Some(&Value::Int(2)));
    }
}
