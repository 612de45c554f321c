//! Session lifecycle endpoints
//!
//! Login verifies a TOTP code against the operator's configured secret and
//! mints an authenticated session; logout destroys the session and every
//! panel binding it owns.

use axum::{extract::State, http::HeaderMap, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::modules::totp;
use crate::proxy::envelope::ApiEnvelope;
use crate::proxy::error::ProxyError;
use crate::proxy::middleware::auth::{SESSION_COOKIE_NAME, SESSION_HEADER_NAME};
use crate::proxy::server::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    /// 6-digit TOTP code
    pub code: String,
}

/// TOTP login - creates an authenticated session
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, ApiEnvelope), ProxyError> {
    let secret = state.config.totp_secret.trim();
    if secret.is_empty() {
        return Err(ProxyError::Validation(
            "two-factor secret is not configured".to_string(),
        ));
    }

    let now = chrono::Utc::now().timestamp();
    if !totp::verify_code(secret, &req.code, now) {
        tracing::warn!("failed TOTP login attempt");
        return Ok((
            jar,
            ApiEnvelope::error(401, "invalid verification code", Value::Null),
        ));
    }

    let ttl_seconds = state.config.session_ttl_hours * 3600;
    let token = state.sessions.create(true, ttl_seconds);

    let cookie = Cookie::build((SESSION_COOKIE_NAME, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(state.config.session_ttl_hours))
        .build();

    tracing::info!("login successful, session created");
    Ok((
        jar.add(cookie),
        ApiEnvelope::success(json!({ "sessionId": token })),
    ))
}

/// Logout - destroys the session and its panel bindings
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, ApiEnvelope) {
    if let Some(token) = presented_token(&headers, &jar) {
        state.bindings.clear(&token);
        state.sessions.destroy(&token);
        tracing::info!("session destroyed");
    }

    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (jar.add(cookie), ApiEnvelope::success_with("logged out", Value::Null))
}

/// Auth status for the presented token
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiEnvelope {
    let session = presented_token(&headers, &jar)
        .and_then(|token| state.sessions.get(&token))
        .filter(|s| state.sessions.is_valid(&s.session_id));

    match session {
        Some(session) => ApiEnvelope::success(json!({
            "authenticated": true,
            "expiresAt": session.expires_at,
        })),
        None => ApiEnvelope::success(json!({ "authenticated": false })),
    }
}

fn presented_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(SESSION_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}
