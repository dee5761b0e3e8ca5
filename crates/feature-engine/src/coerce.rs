//! Integer coercion for loosely typed JSON inputs

use serde_json::Value;

/// Parse a JSON value as an integer, returning `None` when it is absent or
/// not numeric.
///
/// Integers pass through, finite floats truncate toward zero, booleans map to
/// 1/0 and strings are trimmed before parsing as a signed decimal integer.
pub fn parse_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a JSON value as an integer, substituting `default` whenever it
/// cannot be parsed. Never fails.
pub fn coerce_int(value: Option<&Value>, default: i64) -> i64 {
    parse_int(value).unwrap_or(default)
}
