//! Auth gate
//!
//! Intercepts protected routes, validates the caller's session, and rejects
//! unauthenticated or expired traffic before it can reach the binding store
//! or the forwarder.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::proxy::error::ProxyError;
use crate::proxy::server::AppState;

pub const SESSION_COOKIE_NAME: &str = "panelproxy_session";
pub const SESSION_HEADER_NAME: &str = "x-session-id";

/// Validated session id, attached to the request extensions for downstream
/// handlers
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Paths that require an authenticated session
fn is_protected_path(path: &str) -> bool {
    // Login flow and auth status must stay reachable without a session
    if path.starts_with("/auth/") {
        return false;
    }

    // Health check
    if path == "/healthz" {
        return false;
    }

    // Everything else (binding, proxying) requires a session
    true
}

/// Extract the session token from the session cookie or the id header
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(value) = cookie.strip_prefix(&format!("{}=", SESSION_COOKIE_NAME)) {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    request
        .headers()
        .get(SESSION_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Session auth middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if !is_protected_path(&path) {
        return next.run(request).await;
    }

    if let Some(token) = extract_session_token(&request) {
        if state.sessions.is_valid(&token) {
            request.extensions_mut().insert(SessionToken(token));
            return next.run(request).await;
        }
        tracing::debug!("invalid or expired session token for {}", path);
    } else {
        tracing::debug!("no session token for {}", path);
    }

    tracing::info!("unauthenticated access to {}", path);
    ProxyError::AuthRequired.into_response()
}
