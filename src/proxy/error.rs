//! Error types for the proxy service
//!
//! Inner components return `Result<_, ProxyError>`; the variants collapse to
//! an `ApiEnvelope` only when a response leaves a route boundary.

use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;

use crate::proxy::envelope::ApiEnvelope;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// Missing, invalid, or expired session
    #[error("AUTH_REQUIRED")]
    AuthRequired,

    /// Malformed bind request, or no binding for the requested panel type
    #[error("invalid panel binding: {0}")]
    InvalidBinding(String),

    /// Malformed proxy request parameters
    #[error("invalid request: {0}")]
    Validation(String),

    /// Outbound TLS validation failed and bypass was not requested
    #[error("upstream TLS certificate verification failed")]
    SslVerification { detail: String },

    /// Upstream panel returned a non-success response, or the transport
    /// failed without producing a status
    #[error("upstream panel request failed with status {status}")]
    Upstream { status: u16, body: Value },

    /// Outbound call exceeded its time bound
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// Anything unanticipated
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status carried to the caller
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthRequired => 401,
            Self::InvalidBinding(_) | Self::Validation(_) | Self::SslVerification { .. } => 400,
            Self::Upstream { status, .. } => {
                if (100..=599).contains(status) {
                    *status
                } else {
                    502
                }
            }
            Self::UpstreamTimeout => 504,
            Self::Internal(_) => 500,
        }
    }

    /// Structured detail exposed in the envelope `data` field
    pub fn detail(&self) -> Value {
        match self {
            Self::SslVerification { detail } => json!({
                "ignoreSslErrors": true,
                "hint": "set ignoreSslErrors to true to bypass certificate validation for this panel",
                "detail": detail,
            }),
            Self::Upstream { body, .. } => body.clone(),
            _ => Value::Null,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        // Server-side failures carry full detail into the log; client errors
        // stay at a lower severity without internals.
        if status >= 500 {
            tracing::error!("request failed ({}): {:?}", status, self);
        } else {
            tracing::warn!("request rejected ({}): {}", status, self);
        }

        ApiEnvelope::error(status, self.to_string(), self.detail()).into_response()
    }
}
