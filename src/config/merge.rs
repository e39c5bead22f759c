//! Configuration merge logic
//!
//! Implements the layered merge with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        (_, overlay) => overlay,
    }
}

/// Merge multiple config layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Turn flat dotted keys into nested objects.
///
/// `{"connector.threads.max": 2}` becomes `{"connector": {"threads": {"max": 2}}}`.
/// Keys are applied in order, so a later key overrides an earlier prefix.
pub fn expand_dotted(properties: &BTreeMap<String, Value>) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in properties {
        let nested = key
            .rsplit('.')
            .fold(value.clone(), |inner, part| {
                let mut map = Map::new();
                map.insert(part.to_string(), inner);
                Value::Object(map)
            });
        root = deep_merge(root, nested);
    }
    root
}
