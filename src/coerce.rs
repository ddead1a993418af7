//! Lenient conversion of raw input into a column's declared [`DataType`].
//!
//! These functions are total: malformed input degrades to the type's default instead of
//! failing, so a single bad cell never aborts a large import.
//!
//! | type      | rule                                                   | fallback |
//! |-----------|--------------------------------------------------------|----------|
//! | `number`  | trimmed text parsed as a finite `f64`                  | `0`      |
//! | `boolean` | lowercase trimmed text is one of `true`, `1`, `yes`    | `false`  |
//! | `text`    | input as-is                                            | `""`     |

use crate::types::{DataType, Value};

/// Coerce raw cell text (or a missing cell) into `data_type`.
pub fn coerce(data_type: DataType, raw: Option<&str>) -> Value {
    let raw = raw.unwrap_or("");
    match data_type {
        DataType::Number => Value::Number(parse_number(raw)),
        DataType::Boolean => Value::Bool(parse_bool(raw)),
        DataType::Text => Value::Text(raw.to_owned()),
    }
}

/// Coerce an already-typed value into `data_type`.
///
/// Numbers stay numbers when finite, booleans become `1`/`0` for number columns, and every
/// other combination goes through the value's display string.
pub fn coerce_value(data_type: DataType, raw: &Value) -> Value {
    match (data_type, raw) {
        (DataType::Number, Value::Number(n)) => Value::Number(if n.is_finite() { *n } else { 0.0 }),
        (DataType::Number, Value::Bool(b)) => Value::Number(if *b { 1.0 } else { 0.0 }),
        (DataType::Boolean, Value::Bool(b)) => Value::Bool(*b),
        (_, Value::Null) => coerce(data_type, None),
        (_, other) => coerce(data_type, Some(&other.to_display_string())),
    }
}

fn parse_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
