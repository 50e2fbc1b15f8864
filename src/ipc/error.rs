use crate::api::ApiError;
use crate::views::ViewError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Unsolicited line pushed to the shell.
pub fn event(name: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "event": name,
        "result": result
    })
}

/// Per-field server messages, when the backend sent any.
pub fn api_details(e: &ApiError) -> Option<serde_json::Value> {
    match e {
        ApiError::Validation { fields, .. } if !fields.is_empty() => Some(json!({ "fields": fields })),
        ApiError::Server { status, .. } => Some(json!({ "status": status })),
        _ => None,
    }
}

pub fn view_details(e: &ViewError) -> Option<serde_json::Value> {
    match e {
        ViewError::Api(api) => api_details(api),
        ViewError::Validation(_) | ViewError::Locked(_) => None,
    }
}
