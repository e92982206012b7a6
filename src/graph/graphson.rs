//! GraphSON 2.0 value unwrapping
//!
//! Typed values arrive as `{"@type": "g:Int64", "@value": 7}`. Collections are
//! wrapped the same way, and maps are flattened to alternating key/value lists.
//! Result handling only needs plain JSON.

use serde_json::{Map, Value};

/// Strip GraphSON type wrappers recursively.
pub fn unwrap(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if map.len() == 2 && map.contains_key("@type") && map.contains_key("@value") {
                let type_name = map
                    .get("@type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let inner = map.remove("@value").unwrap_or(Value::Null);
                return unwrap_typed(&type_name, inner);
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, unwrap(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap).collect()),
        other => other,
    }
}

fn unwrap_typed(type_name: &str, inner: Value) -> Value {
    match (type_name, inner) {
        ("g:Map", Value::Array(items)) => {
            let mut out = Map::new();
            let mut iter = items.into_iter();
            while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                let key = match unwrap(k) {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                out.insert(key, unwrap(v));
            }
            Value::Object(out)
        }
        (_, inner) => unwrap(inner),
    }
}

/// Flatten a response `result.data` payload into its items.
pub fn result_items(data: Value) -> Vec<Value> {
    match unwrap(data) {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
