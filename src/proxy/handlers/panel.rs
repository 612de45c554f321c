//! Panel binding and request forwarding endpoints

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::proxy::envelope::ApiEnvelope;
use crate::proxy::error::ProxyError;
use crate::proxy::forwarder::{ProxyMethod, ProxyRequestSpec};
use crate::proxy::middleware::SessionToken;
use crate::proxy::panels::PanelType;
use crate::proxy::server::AppState;

#[derive(Deserialize)]
pub struct BindPanelKeyRequest {
    #[serde(rename = "type")]
    pub panel_type: String,
    pub url: String,
    pub key: String,
}

/// Bind (or overwrite) the caller's panel credentials
pub async fn bind_panel_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    Json(req): Json<BindPanelKeyRequest>,
) -> Result<ApiEnvelope, ProxyError> {
    let panel = parse_panel_type(&req.panel_type)?;

    state.bindings.bind(&session.0, panel, &req.url, &req.key)?;

    tracing::info!(panel = %panel, "panel key bound");
    Ok(ApiEnvelope::success_with("panel key bound", Value::Null))
}

#[derive(Deserialize)]
pub struct ProxyRequestBody {
    /// Panel-relative API path
    pub url: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(rename = "ignoreSslErrors", default)]
    pub ignore_ssl_errors: bool,
    #[serde(rename = "type", default)]
    pub panel_type: Option<String>,
}

/// Forward a POST request to the caller's bound panel
pub async fn proxy_request_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    Json(body): Json<ProxyRequestBody>,
) -> Result<ApiEnvelope, ProxyError> {
    let panel = parse_optional_panel_type(body.panel_type.as_deref())?;
    dispatch(
        &state,
        &session.0,
        panel,
        ProxyMethod::Post,
        body.url,
        body.params,
        body.ignore_ssl_errors,
    )
    .await
}

/// Forward a GET request to the caller's bound panel; every query pair
/// other than the reserved ones becomes a forwarded parameter
pub async fn proxy_request_get(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<ApiEnvelope, ProxyError> {
    let (panel, method, path, params, ignore_ssl) = parse_query_request(query, None)?;
    dispatch(&state, &session.0, panel, method, path, params, ignore_ssl).await
}

/// bt-only shorthand, POST
pub async fn btpanel_request_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    Json(body): Json<ProxyRequestBody>,
) -> Result<ApiEnvelope, ProxyError> {
    dispatch(
        &state,
        &session.0,
        PanelType::Bt,
        ProxyMethod::Post,
        body.url,
        body.params,
        body.ignore_ssl_errors,
    )
    .await
}

/// bt-only shorthand, GET
pub async fn btpanel_request_get(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<ApiEnvelope, ProxyError> {
    let (panel, method, path, params, ignore_ssl) =
        parse_query_request(query, Some(PanelType::Bt))?;
    dispatch(&state, &session.0, panel, method, path, params, ignore_ssl).await
}

/// Shared resolve-sign-dispatch path for all proxy routes
async fn dispatch(
    state: &AppState,
    session_id: &str,
    panel: PanelType,
    method: ProxyMethod,
    path: String,
    params: Map<String, Value>,
    ignore_ssl_errors: bool,
) -> Result<ApiEnvelope, ProxyError> {
    if path.trim().is_empty() {
        return Err(ProxyError::Validation(
            "missing required parameter: url".to_string(),
        ));
    }

    let binding = state
        .bindings
        .get(session_id, panel)
        .ok_or_else(|| {
            ProxyError::InvalidBinding(format!("no {} binding for this session", panel))
        })?;

    let spec = ProxyRequestSpec {
        method,
        path,
        params,
        panel_type: panel,
        ignore_ssl_errors,
    };

    let body = state.forwarder.forward(&binding, &spec).await?;
    Ok(ApiEnvelope::success(body))
}

fn parse_panel_type(value: &str) -> Result<PanelType, ProxyError> {
    PanelType::parse(value)
        .ok_or_else(|| ProxyError::Validation(format!("unknown panel type: {}", value)))
}

fn parse_optional_panel_type(value: Option<&str>) -> Result<PanelType, ProxyError> {
    match value {
        Some(v) => parse_panel_type(v),
        None => Ok(PanelType::Bt),
    }
}

type QueryRequest = (PanelType, ProxyMethod, String, Map<String, Value>, bool);

/// Pull the reserved keys (`url`, `ignoreSslErrors`, `type`) out of the
/// query string; the remainder is the forwarded parameter map.
fn parse_query_request(
    mut query: HashMap<String, String>,
    pinned_panel: Option<PanelType>,
) -> Result<QueryRequest, ProxyError> {
    let path = query.remove("url").unwrap_or_default();

    let ignore_ssl = query
        .remove("ignoreSslErrors")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    let panel = match pinned_panel {
        Some(panel) => {
            query.remove("type");
            panel
        }
        None => parse_optional_panel_type(query.remove("type").as_deref())?,
    };

    let params: Map<String, Value> = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    Ok((panel, ProxyMethod::Get, path, params, ignore_ssl))
}
