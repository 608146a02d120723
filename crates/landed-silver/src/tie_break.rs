use std::cmp::Ordering;

use landed_domain::{Record, Value};

/// Cross-type total order over `Value`: same-type values compare naturally;
/// differing types fall back to a fixed type rank. Used only to make the
/// tie-break rule in §4.8 total — it never governs what gets written.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    use Value::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Int(x), Int(y)) => x.cmp(y),
        (Float(x), Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Int(x), Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Float(x), Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Str(x), Str(y)) => x.cmp(y),
        (Timestamp(x), Timestamp(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Float(_) => 3,
        Value::Str(_) => 4,
        Value::Timestamp(_) => 5,
    }
}

/// Canonical lexicographic key for a whole record (§4.8 tie-break's final
/// level): `Record` is a `BTreeMap`, so JSON serialization already emits
/// fields in a deterministic order.
pub fn record_lexical_key(record: &Record) -> String {
    serde_json::to_string(record).unwrap_or_default()
}

/// Picks the winning row within one natural-key group: maximum
/// `order_column`, ties broken by `change_ts_column`, then by lexicographic
/// comparison of the whole record (§4.8 "Tie-break rule"). Returns the
/// winner's index and which level actually discriminated, for
/// `tie_break_rule` in the metadata document (§9 open question).
pub fn select_winner(group: &[Record], order_column: Option<&str>, change_ts_column: Option<&str>) -> (usize, &'static str) {
    let mut best = 0usize;
    let mut best_rule = "lexicographic";
    for i in 1..group.len() {
        let (ordering, rule) = compare_candidates(&group[i], &group[best], order_column, change_ts_column);
        if ordering == Ordering::Greater {
            best = i;
            best_rule = rule;
        }
    }
    (best, best_rule)
}

fn compare_candidates(
    a: &Record,
    b: &Record,
    order_column: Option<&str>,
    change_ts_column: Option<&str>,
) -> (Ordering, &'static str) {
    if let Some(col) = order_column {
        let ordering = compare_values(a.get(col).unwrap_or(&Value::Null), b.get(col).unwrap_or(&Value::Null));
        if ordering != Ordering::Equal {
            return (ordering, "order_column");
        }
    }
    if let Some(col) = change_ts_column {
        let ordering = compare_values(a.get(col).unwrap_or(&Value::Null), b.get(col).unwrap_or(&Value::Null));
        if ordering != Ordering::Equal {
            return (ordering, "change_ts_column");
        }
    }
    (record_lexical_key(a).cmp(&record_lexical_key(b)), "lexicographic")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn picks_maximum_order_column() {
        let group = vec![rec(&[("v", Value::Int(1)), ("ord", Value::Int(5))]), rec(&[("v", Value::Int(2)), ("ord", Value::Int(9))])];
        let (idx, rule) = select_winner(&group, Some("ord"), None);
        assert_eq!(idx, 1);
        assert_eq!(rule, "order_column");
    }

    #[test]
    fn falls_back_to_change_ts_on_order_column_tie() {
        let group = vec![
            rec(&[("v", Value::Int(1)), ("ord", Value::Int(5)), ("ts", Value::Int(100))]),
            rec(&[("v", Value::Int(2)), ("ord", Value::Int(5)), ("ts", Value::Int(200))]),
        ];
        let (idx, rule) = select_winner(&group, Some("ord"), Some("ts"));
        assert_eq!(idx, 1);
        assert_eq!(rule, "change_ts_column");
    }

    #[test]
    fn falls_back_to_lexicographic_with_no_configured_columns() {
        let group = vec![rec(&[("v", Value::Int(1))]), rec(&[("v", Value::Int(2))])];
        let (_, rule) = select_winner(&group, None, None);
        assert_eq!(rule, "lexicographic");
    }
}
