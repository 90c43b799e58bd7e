use serde_json::{Map, Value};

/// Recursive merge with jQuery `$.extend(true, target, source)` semantics:
/// objects merge by key and arrays merge by index, so a shorter source array
/// only overwrites the leading entries. Scalars (including `null`) replace.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match source {
        Value::Object(src) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(dst) = target {
                for (key, value) in src {
                    merge_slot(dst.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        Value::Array(src) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(dst) = target {
                for (i, value) in src.iter().enumerate() {
                    if i >= dst.len() {
                        dst.push(Value::Null);
                    }
                    merge_slot(&mut dst[i], value);
                }
            }
        }
        scalar => *target = scalar.clone(),
    }
}

fn merge_slot(slot: &mut Value, value: &Value) {
    match value {
        Value::Object(_) if !slot.is_object() => {
            *slot = Value::Object(Map::new());
            deep_merge(slot, value);
        }
        Value::Array(_) if !slot.is_array() => {
            *slot = Value::Array(Vec::new());
            deep_merge(slot, value);
        }
        Value::Object(_) | Value::Array(_) => deep_merge(slot, value),
        scalar => *slot = scalar.clone(),
    }
}
