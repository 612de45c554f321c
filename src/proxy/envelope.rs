//! Uniform response envelope
//!
//! Every route boundary funnels through `success` or `error`; no handler
//! returns a raw, unwrapped body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    /// Numeric status, mirrors the HTTP status of the response
    pub code: u16,
    pub status: EnvelopeStatus,
    pub message: String,
    /// Payload on success, structured detail on error
    pub data: Value,
}

impl ApiEnvelope {
    pub fn success(data: Value) -> Self {
        Self::success_with("success", data)
    }

    pub fn success_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            code: 200,
            status: EnvelopeStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(code: u16, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            status: EnvelopeStatus::Error,
            message: message.into(),
            data,
        }
    }
}

impl IntoResponse for ApiEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let envelope = ApiEnvelope::success(json!({"ok": 1}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["code"], 200);
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "success");
        assert_eq!(value["data"]["ok"], 1);
    }

    #[test]
    fn test_error_shape() {
        let envelope = ApiEnvelope::error(401, "AUTH_REQUIRED", Value::Null);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["code"], 401);
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "AUTH_REQUIRED");
        assert!(value["data"].is_null());
    }

    #[test]
    fn test_custom_success_message() {
        let envelope = ApiEnvelope::success_with("panel key bound", Value::Null);
        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.status, EnvelopeStatus::Success);
        assert_eq!(envelope.message, "panel key bound");
    }
}
