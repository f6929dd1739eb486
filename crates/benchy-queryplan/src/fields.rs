//! Raw field lookup and numeric coercion
//!
//! Engines encode the same statistic under different keys and as numbers,
//! floats or numeric strings. These helpers implement the "first matching
//! candidate key" lookups and the lenient coercions used by every parser.
//! A value that is present but cannot be coerced yields `None`.

use serde_json::{Map, Value};

/// Returns the first candidate key that is present and not null
pub fn first_present<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find(|v| !v.is_null())
}

/// Returns the first candidate key holding a non-empty string
pub fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Returns the first candidate key holding a non-empty array
pub fn first_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| value.get(key).and_then(Value::as_array))
        .find(|arr| !arr.is_empty())
}

/// Copy of an object without the given keys; other values are cloned as is
pub fn without_keys(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// Coerces the first present candidate key to a row count
pub fn first_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    first_present(value, keys).and_then(coerce_u64)
}

/// Coerces a JSON number or numeric string to a non-negative integer.
///
/// Floats and float strings are truncated (`"1.9E2"` becomes 190).
pub fn coerce_u64(value: &Value) -> Option<u64> {
    let coerced = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_u64)),
        Value::String(s) => parse_u64(s),
        _ => None,
    };
    if coerced.is_none() {
        tracing::debug!(%value, "could not coerce field to a row count");
    }
    coerced
}

/// Parses a numeric string (integer or float notation) to a non-negative integer
pub fn parse_u64(text: &str) -> Option<u64> {
    let text = text.trim();
    text.parse::<u64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(float_to_u64))
}

/// Coerces a JSON number or numeric string to a signed integer id
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn float_to_u64(f: f64) -> Option<u64> {
    if f.is_finite() && f >= 0.0 {
        Some(f.trunc() as u64)
    } else {
        None
    }
}
