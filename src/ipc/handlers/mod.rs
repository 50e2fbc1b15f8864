pub mod admin;
pub mod attendance;
pub mod core;
pub mod scores;
pub mod session;
pub mod student;
pub mod teacher;

use crate::api::types::{Id, Term};
use crate::api::ApiError;
use crate::ipc::error::{api_details, err, ok, view_details};
use crate::ipc::types::{AppState, Request};
use crate::views::ViewError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    /// Client-side rule violation, reported before any network call.
    pub fn validation(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "validation_failed",
            message: message.into(),
            details: None,
        }
    }
}

impl From<ViewError> for HandlerErr {
    fn from(e: ViewError) -> Self {
        HandlerErr {
            code: e.code(),
            details: view_details(&e),
            message: e.to_string(),
        }
    }
}

impl From<ApiError> for HandlerErr {
    fn from(e: ApiError) -> Self {
        HandlerErr {
            code: e.code(),
            details: api_details(&e),
            message: e.to_string(),
        }
    }
}

pub(crate) type HandlerResult = Result<serde_json::Value, HandlerErr>;

pub(crate) fn respond(req: &Request, result: HandlerResult) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            tracing::debug!(code = e.code, "request failed: {}", e.message);
            e.response(&req.id)
        }
    }
}

pub(crate) fn to_json<T: Serialize>(v: &T) -> serde_json::Value {
    serde_json::to_value(v).unwrap_or(serde_json::Value::Null)
}

pub(crate) fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub(crate) fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Ids arrive as strings or numbers.
pub(crate) fn get_opt_id(params: &serde_json::Value, key: &str) -> Option<Id> {
    match params.get(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(Id::from(s.as_str())),
        serde_json::Value::Number(n) => Some(Id::from(n.to_string())),
        _ => None,
    }
}

pub(crate) fn get_required_id(params: &serde_json::Value, key: &str) -> Result<Id, HandlerErr> {
    get_opt_id(params, key).ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub(crate) fn get_opt_term(params: &serde_json::Value, key: &str) -> Result<Option<Term>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => serde_json::from_value::<Term>(v.clone())
            .map(Some)
            .map_err(|e| HandlerErr::bad_params(format!("{key}: {e}"))),
    }
}

pub(crate) fn parse_params<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, HandlerErr> {
    let v = if params.is_null() {
        serde_json::json!({})
    } else {
        params.clone()
    };
    serde_json::from_value(v).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

/// `message` when the server sent one, else `fallback`.
pub(crate) fn message_or(msg: Option<String>, fallback: &str) -> String {
    msg.unwrap_or_else(|| fallback.to_string())
}

/// Notifies the outcome of a write: `success` on success, the server's
/// message (else `failure`) on error.
pub(crate) fn report<T>(
    state: &AppState,
    result: Result<T, ApiError>,
    success: &str,
    failure: &str,
) -> Result<T, HandlerErr> {
    match result {
        Ok(v) => {
            state.notifier.success(success.to_string());
            Ok(v)
        }
        Err(e) => {
            state.notifier.error(e.user_message(failure));
            Err(e.into())
        }
    }
}

/// Reads only notify on failure.
pub(crate) fn fetch<T>(state: &AppState, result: Result<T, ApiError>, failure: &str) -> Result<T, HandlerErr> {
    result.map_err(|e| {
        state.notifier.error(e.user_message(failure));
        e.into()
    })
}

pub(crate) fn reject(state: &AppState, message: &str) -> HandlerErr {
    state.notifier.error(message.to_string());
    HandlerErr::validation(message)
}
