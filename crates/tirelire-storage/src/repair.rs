//! Structural repair of stored and replicated JSON
//!
//! Document stores drop `null` members and hand sparse arrays back as
//! objects keyed by index. These helpers undo that before typed decoding,
//! and prepare outbound documents so that nothing is lost on the way out.

use serde_json::{Map, Number, Value};

/// Number of planned amounts per budget vector
pub const MONTHS_PER_YEAR: usize = 12;

/// Parse stored JSON text, tagging failures with the key
pub fn parse_json(key: &str, content: &str) -> crate::StorageResult<Value> {
    serde_json::from_str(content).map_err(|e| crate::StorageError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn index_keys(map: &Map<String, Value>) -> Option<Vec<usize>> {
    map.keys().map(|k| k.parse::<usize>().ok()).collect()
}

/// Length of the dense array an index-keyed object stands for.
///
/// Same rule as the remote store: every key is an index and more than half of
/// the slots up to the highest index are filled. Year-keyed maps (`"2025"`)
/// never qualify, and neither do indices too large to be a real position.
fn sparse_len(map: &Map<String, Value>) -> Option<usize> {
    if map.is_empty() {
        return None;
    }
    let indices = index_keys(map)?;
    let slots = indices.iter().copied().max()?.checked_add(1)?;
    let filled = indices.len().checked_mul(2)?;
    (filled > slots).then_some(slots)
}

/// Whether an object looks like an array that went through a sparse encoding
pub fn is_sparse_array(map: &Map<String, Value>) -> bool {
    sparse_len(map).is_some()
}

/// Recursively turn index-keyed objects back into dense arrays, with `null` in the gaps
pub fn densify(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(densify).collect()),
        Value::Object(map) => match sparse_len(&map) {
            Some(len) => {
                let mut dense = vec![Value::Null; len];
                for (key, item) in map {
                    if let Some(slot) = key.parse::<usize>().ok().and_then(|i| dense.get_mut(i)) {
                        *slot = densify(item);
                    }
                }
                Value::Array(dense)
            }
            None => Value::Object(map.into_iter().map(|(k, v)| (k, densify(v))).collect()),
        },
        other => other,
    }
}

/// Prepare a document for a store that rejects undefined members.
///
/// Object members holding `null` are removed; `null` inside arrays is kept so
/// positions survive, and arrays stay dense.
pub fn clean_for_remote(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(clean_for_remote).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, clean_for_remote(v)))
                .collect(),
        ),
        other => other,
    }
}

fn coerce_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64),
        _ => None,
    }
}

/// Force a stored budget vector into exactly twelve numbers.
///
/// Missing, `null` and non-numeric slots become `0`; numeric strings are
/// parsed; extra slots are cut. Returns the repaired vector and whether
/// anything had to change.
pub fn normalize_month_vector(value: &Value) -> (Value, bool) {
    let dense = densify(value.clone());
    let items = match dense {
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    let mut changed = !matches!(value, Value::Array(_)) || items.len() != MONTHS_PER_YEAR;
    let mut repaired = Vec::with_capacity(MONTHS_PER_YEAR);
    for slot in 0..MONTHS_PER_YEAR {
        let number = match items.get(slot) {
            Some(Value::Number(n)) => n.clone(),
            Some(other) => {
                changed = true;
                coerce_number(other).unwrap_or_else(|| Number::from(0))
            }
            None => Number::from(0),
        };
        repaired.push(Value::Number(number));
    }

    (Value::Array(repaired), changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_densify_index_object() {
        let value = json!({ "0": 10, "2": 30, "1": 20 });
        assert_eq!(densify(value), json!([10, 20, 30]));

        let gappy = json!({ "0": 1, "3": 4, "2": 3 });
        assert_eq!(densify(gappy), json!([1, null, 3, 4]));
    }

    #[test]
    fn test_densify_leaves_year_maps_alone() {
        let budgets = json!({ "2025": { "Revenus": {} }, "2026": {} });
        assert_eq!(densify(budgets.clone()), budgets);
    }

    #[test]
    fn test_densify_recurses() {
        let doc = json!({ "transactions": { "0": { "id": 1 }, "1": { "id": 2 } } });
        assert_eq!(densify(doc), json!({ "transactions": [{ "id": 1 }, { "id": 2 }] }));
    }

    #[test]
    fn test_densify_rejects_huge_indices() {
        let huge = json!({ "18446744073709551615": { "id": 1 } });
        assert_eq!(densify(huge.clone()), huge);

        let far = json!({ "0": 1, "4000000000": 2 });
        assert_eq!(densify(far.clone()), far);

        let (vector, changed) = normalize_month_vector(&json!({ "18446744073709551615": 5 }));
        assert!(changed);
        assert_eq!(vector, json!([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_clean_for_remote_drops_null_members() {
        let doc = json!({ "a": null, "b": [1, null, 3], "c": { "d": null, "e": "x" } });
        assert_eq!(clean_for_remote(doc), json!({ "b": [1, null, 3], "c": { "e": "x" } }));
    }

    #[test]
    fn test_normalize_month_vector() {
        let (ok, changed) = normalize_month_vector(&json!([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, -250]));
        assert!(!changed);
        assert_eq!(ok[11], json!(-250));

        let (short, changed) = normalize_month_vector(&json!([1, null, "2,5"]));
        assert!(changed);
        assert_eq!(short.as_array().unwrap().len(), 12);
        assert_eq!(short[1], json!(0));
        assert_eq!(short[2], json!(2.5));

        let (sparse, changed) = normalize_month_vector(&json!({ "0": 5, "1": 6 }));
        assert!(changed);
        assert_eq!(sparse[0], json!(5));
        assert_eq!(sparse[11], json!(0));

        let (garbage, _) = normalize_month_vector(&json!("oops"));
        assert_eq!(garbage, json!([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_parse_json_reports_key() {
        let err = parse_json("budgets", "{not json").unwrap_err();
        assert!(err.to_string().contains("budgets"));
    }
}
