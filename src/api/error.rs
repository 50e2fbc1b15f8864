use std::collections::BTreeMap;
use thiserror::Error;

/// Failures at the REST boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// HTTP 401/403.
    #[error("unauthorized: {}", .message.as_deref().unwrap_or("session expired"))]
    Unauthorized { message: Option<String> },

    /// HTTP 429.
    #[error("rate limited: {}", .message.as_deref().unwrap_or("too many requests"))]
    RateLimited { message: Option<String> },

    /// HTTP 422 with optional per-field messages.
    #[error("rejected by server: {}", .message.as_deref().unwrap_or("validation failed"))]
    Validation {
        message: Option<String>,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("request failed"))]
    Server { status: u16, message: Option<String> },

    /// The body did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classifies a non-success response, keeping the server's message.
    pub fn from_status(status: u16, body: &[u8]) -> ApiError {
        let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
        let fields = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(|v| v.as_object())
            .map(|errors| {
                errors
                    .iter()
                    .map(|(k, v)| {
                        let msgs = match v {
                            serde_json::Value::Array(items) => items
                                .iter()
                                .filter_map(|m| m.as_str().map(str::to_string))
                                .collect(),
                            serde_json::Value::String(s) => vec![s.clone()],
                            _ => Vec::new(),
                        };
                        (k.clone(), msgs)
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message").or_else(|| v.get("error")))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| fields.values().flatten().next().cloned());

        match status {
            401 | 403 => ApiError::Unauthorized { message },
            429 => ApiError::RateLimited { message },
            422 => ApiError::Validation { message, fields },
            _ => ApiError::Server { status, message },
        }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::RateLimited { message }
            | ApiError::Validation { message, .. }
            | ApiError::Server { message, .. } => message.as_deref(),
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::Decode(_) => None,
        }
    }

    /// What the user sees: the server's message verbatim, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network_error",
            ApiError::Timeout(_) => "timeout",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Validation { .. } => "validation_failed",
            ApiError::Server { .. } => "server_error",
            ApiError::Decode(_) => "decode_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_kept_verbatim() {
        let e = ApiError::from_status(500, br#"{"message":"Score already exists for this term"}"#);
        assert_eq!(e.code(), "server_error");
        assert_eq!(
            e.user_message("Failed to save score"),
            "Score already exists for this term"
        );
    }

    #[test]
    fn field_errors_supply_a_message_when_top_level_is_missing() {
        let e = ApiError::from_status(422, br#"{"errors":{"exam_score":["The exam score may not be greater than 70."]}}"#);
        match &e {
            ApiError::Validation { fields, .. } => assert_eq!(fields["exam_score"].len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            e.user_message("fallback"),
            "The exam score may not be greater than 70."
        );
    }

    #[test]
    fn unreadable_bodies_use_the_fallback() {
        let e = ApiError::from_status(502, b"<html>Bad Gateway</html>");
        assert_eq!(e.user_message("Failed to load"), "Failed to load");
        let e = ApiError::Network("connection refused".into());
        assert_eq!(e.user_message("Failed to load"), "Failed to load");
    }

    #[test]
    fn status_classes_map_to_codes() {
        assert_eq!(ApiError::from_status(401, b"{}").code(), "unauthorized");
        assert_eq!(ApiError::from_status(429, b"{}").code(), "rate_limited");
        assert_eq!(ApiError::from_status(404, b"{}").code(), "server_error");
    }
}
