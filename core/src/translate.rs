//! Field-level converters between the panel's string encodings and typed
//! values.
//!
//! The panel encodes numbers as strings, "no limit" as either `"unlimited"`
//! or an empty string depending on the field, and booleans with two separate
//! vocabularies (`ON`/`OFF` and `yes`/`no`). Every function here is pure and
//! total: malformed numbers become `0` and unrecognized flags become `false`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Public-model sentinel for "no quota limit".
pub const UNLIMITED: i64 = -1;

const UNLIMITED_WIRE: &str = "unlimited";

/// `""` and `"unlimited"` map to [`UNLIMITED`]; anything non-numeric maps to
/// `0`.
pub fn parse_number(raw: &str) -> i64 {
    if raw.is_empty() || raw == UNLIMITED_WIRE {
        return UNLIMITED;
    }
    raw.trim().parse().unwrap_or(0)
}

/// Inverse of [`parse_number`]. Fields that spell "no limit" as an empty
/// string pass `empty_for_unlimited = true`.
pub fn format_number(value: i64, empty_for_unlimited: bool) -> String {
    if value == UNLIMITED {
        if empty_for_unlimited {
            return String::new();
        }
        return UNLIMITED_WIRE.to_string();
    }
    value.to_string()
}

/// Case-insensitive: `ON`/`YES` are true, everything else is false.
pub fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("on") || raw.eq_ignore_ascii_case("yes")
}

pub fn format_on_off(value: bool) -> String {
    let word = if value { "ON" } else { "OFF" };
    word.to_string()
}

pub fn format_yes_no(value: bool) -> String {
    let word = if value { "yes" } else { "no" };
    word.to_string()
}

/// Lenient integer extraction for fields whose JSON type varies between
/// endpoints. Numeric strings and numbers convert, floats truncate, anything
/// else is `0`. Unlike [`parse_number`] an empty string is `0`, which matches
/// how the panel reports unused counters.
pub fn number_from_value(value: &Value) -> i64 {
    match value {
        Value::String(s) => s.trim().parse::<i64>().unwrap_or_else(|_| {
            s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0)
        }),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Lenient integer extraction from a string (the counterpart of
/// [`number_from_value`] for fields that are always strings).
pub fn number_from_str(raw: &str) -> i64 {
    number_from_value(&Value::String(raw.to_string()))
}

/// Usage fields arrive either as a bare value or as an object carrying the
/// figure under `"usage"`.
pub fn usage_from_value(value: &Value) -> i64 {
    match value {
        Value::Object(map) => map.get("usage").map(number_from_value).unwrap_or(0),
        other => number_from_value(other),
    }
}

/// Serde adapter for wire strings that some endpoints send as numbers,
/// booleans or `null`. Non-scalar values are kept as their JSON text.
pub fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// Like [`lenient_string`] for list fields: `null` and `""` become empty.
pub fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}
