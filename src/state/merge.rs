// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deep merge of partial states

use serde_json::Value;

/// Merge `partial` into `target`
///
/// Objects merge key by key, recursing where both sides hold an object.
/// Anything else in `partial` (scalars, arrays, null) replaces the target.
pub fn deep_merge(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(target), Value::Object(partial)) => {
            for (key, value) in partial {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, partial) => *target = partial,
    }
}
