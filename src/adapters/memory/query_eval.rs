//! Evaluation of collection queries over in-memory documents.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::models::{
    CollectionQuery, Constraint, Direction, DocumentData, DocumentSnapshot,
};

/// Rank used to order values of different JSON types.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type rank first, then by value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_values(l, r))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

static NULL: Value = Value::Null;

fn field_or_null<'a>(data: &'a DocumentData, field: &str) -> &'a Value {
    data.get(field).unwrap_or(&NULL)
}

/// Run `query` against the documents of its collection.
///
/// Documents lacking the ordering field are excluded. Without an ordering
/// the result is in document id order. Equality filters apply before the
/// ordering; limits apply last.
pub fn evaluate(
    query: &CollectionQuery,
    documents: &BTreeMap<String, DocumentData>,
) -> Vec<DocumentSnapshot> {
    let mut matched: Vec<(&String, &DocumentData)> = documents
        .iter()
        .filter(|(_, data)| {
            query.constraints.iter().all(|constraint| match constraint {
                Constraint::WhereEquals { field, value } => data.get(field) == Some(value),
                Constraint::Limit { .. } => true,
            })
        })
        .collect();

    if let Some(order) = &query.order_by {
        matched.retain(|(_, data)| data.contains_key(&order.field));
        matched.sort_by(|(a_id, a), (b_id, b)| {
            let ord = compare_values(
                field_or_null(a, &order.field),
                field_or_null(b, &order.field),
            );
            let ord = match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            ord.then_with(|| a_id.cmp(b_id))
        });
    }

    let limit = query
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Limit { count } => Some(*count),
            Constraint::WhereEquals { .. } => None,
        })
        .min();

    matched
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(id, data)| {
            DocumentSnapshot::new(format!("{}/{id}", query.path), Some(data.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(entries: Value) -> BTreeMap<String, DocumentData> {
        entries
            .as_object()
            .unwrap()
            .iter()
            .map(|(id, data)| (id.clone(), data.as_object().unwrap().clone()))
            .collect()
    }

    fn ids(snapshots: &[DocumentSnapshot]) -> Vec<&str> {
        snapshots.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_order_desc_excludes_missing_field() {
        let documents = docs(json!({
            "a": {"createdAt": "2026-01-01T00:00:00Z"},
            "b": {"createdAt": "2026-03-01T00:00:00Z"},
            "c": {"name": "no timestamp"},
        }));
        let query = CollectionQuery::new("w").order_by("createdAt", Direction::Desc);

        assert_eq!(ids(&evaluate(&query, &documents)), vec!["b", "a"]);
    }

    #[test]
    fn test_where_equals_and_limit() {
        let documents = docs(json!({
            "a": {"exerciseId": "bench", "weight": 80},
            "b": {"exerciseId": "bench", "weight": 100},
            "c": {"exerciseId": "squat", "weight": 140},
        }));
        let query = CollectionQuery::new("prs")
            .order_by("weight", Direction::Desc)
            .where_equals("exerciseId", "bench")
            .limit(1);

        let result = evaluate(&query, &documents);
        assert_eq!(ids(&result), vec!["b"]);
        assert_eq!(result[0].path, "prs/b");
    }

    #[test]
    fn test_unordered_query_uses_id_order() {
        let documents = docs(json!({"z": {}, "m": {}, "a": {}}));
        let query = CollectionQuery::new("x");
        assert_eq!(ids(&evaluate(&query, &documents)), vec!["a", "m", "z"]);
    }

    #[test]
    fn test_compare_values_across_types() {
        assert_eq!(compare_values(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }
}
