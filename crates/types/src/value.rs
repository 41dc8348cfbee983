//! Value validity rules
//!
//! Field values are `serde_json::Value`. JSON null doubles as the missing
//! marker throughout the toolkit.

use serde_json::Value;

/// A value is valid iff it is not the missing marker (null), not a
/// non-finite number, and not an empty string.
pub fn is_valid(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(f64::is_finite).unwrap_or(true),
        _ => true,
    }
}

/// Numeric view of a value, if it is a valid finite number.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Build a numeric JSON value; non-finite inputs become the missing marker.
pub fn number(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
