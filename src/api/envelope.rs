//! The one place that knows the backend wraps payloads inconsistently.
//!
//! A payload may arrive bare, as `{"data": payload}`, or as
//! `{"data": {"data": payload}}` (paginated listings). Callers above this
//! module only ever see the typed payload.

use super::error::ApiError;
use serde::de::DeserializeOwned;
use serde_json::Value;

const MAX_WRAP_DEPTH: usize = 2;

fn has_data(map: &serde_json::Map<String, Value>) -> bool {
    map.get("data").is_some_and(|d| !d.is_null())
}

/// Decodes a listing. Non-list payloads decode as empty and items that do
/// not fit `T` are skipped.
pub fn list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    let mut v = value;
    for _ in 0..MAX_WRAP_DEPTH {
        match v {
            Value::Object(mut map) if has_data(&map) => {
                v = map.remove("data").unwrap_or(Value::Null);
            }
            other => {
                v = other;
                break;
            }
        }
    }
    match v {
        Value::Array(items) => Ok(super::types::lenient::each(items)),
        Value::Null => Ok(Vec::new()),
        other => {
            tracing::warn!(kind = value_kind(&other), "expected a list payload; treating as empty");
            Ok(Vec::new())
        }
    }
}

/// Decodes a single object, preferring the `data` member when present.
pub fn object<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    let inner = match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Top-level `message`, looking through one `data` wrapper.
pub fn message(value: &Value) -> Option<String> {
    value
        .get("message")
        .or_else(|| value.get("data").and_then(|d| d.get("message")))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
