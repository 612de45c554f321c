//! Request forwarder
//!
//! Takes a resolved panel binding and a per-call request spec, attaches the
//! panel's signed credentials, performs the outbound call, and normalizes
//! the result. Upstream 2xx JSON passes through verbatim; the forwarder
//! never reinterprets panel-specific result codes.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};

use crate::proxy::binding::PanelBinding;
use crate::proxy::error::ProxyError;
use crate::proxy::panels::PanelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
}

/// Per-call request description; constructed from the inbound route and
/// discarded after the response.
pub struct ProxyRequestSpec {
    pub method: ProxyMethod,
    /// Panel-relative API path
    pub path: String,
    pub params: Map<String, Value>,
    pub panel_type: PanelType,
    /// Explicit operator opt-out of TLS verification for this call
    pub ignore_ssl_errors: bool,
}

pub struct RequestForwarder {
    client: Client,
    /// Certificate verification disabled; only ever used when the caller
    /// set `ignore_ssl_errors`
    insecure_client: Client,
}

impl RequestForwarder {
    pub fn new(timeout_secs: u64) -> Self {
        let client = base_builder(timeout_secs)
            .build()
            .expect("Failed to create HTTP client");

        let insecure_client = base_builder(timeout_secs)
            .danger_accept_invalid_certs(true)
            .build()
            .expect("Failed to create insecure HTTP client");

        Self {
            client,
            insecure_client,
        }
    }

    /// Sign and dispatch one call to the bound panel
    pub async fn forward(
        &self,
        binding: &PanelBinding,
        spec: &ProxyRequestSpec,
    ) -> Result<Value, ProxyError> {
        let now = chrono::Utc::now().timestamp();
        let signed = spec.panel_type.strategy().sign(&spec.params, &binding.api_key, now);

        let url = build_outbound_url(&binding.base_url, &spec.path);
        let pairs = encode_params(&signed.params);

        let client = if spec.ignore_ssl_errors {
            &self.insecure_client
        } else {
            &self.client
        };

        let request = match spec.method {
            ProxyMethod::Get => client.get(&url).query(&pairs),
            ProxyMethod::Post => client.post(&url).form(&pairs),
        }
        .headers(signed.headers);

        tracing::debug!(
            panel = %spec.panel_type,
            path = %spec.path,
            ignore_ssl = spec.ignore_ssl_errors,
            "dispatching panel request"
        );

        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(e, spec.ignore_ssl_errors))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ProxyError::Upstream {
            status: 502,
            body: Value::String(format!("failed to read upstream body: {}", e)),
        })?;

        // Panels answer JSON; anything else is carried as a string so the
        // envelope stays well-formed
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            Ok(body)
        } else {
            tracing::warn!(
                panel = %spec.panel_type,
                path = %spec.path,
                status = status.as_u16(),
                "upstream panel returned an error"
            );
            Err(ProxyError::Upstream {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn base_builder(timeout_secs: u64) -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(timeout_secs))
}

/// Map an outbound transport failure onto the error taxonomy. TLS
/// verification failures are only special-cased while bypass was not
/// requested; with the insecure client they cannot occur, and any residual
/// failure is an ordinary upstream error.
fn classify_send_error(err: reqwest::Error, bypass_requested: bool) -> ProxyError {
    if err.is_timeout() {
        return ProxyError::UpstreamTimeout;
    }

    if !bypass_requested && is_certificate_error(&err) {
        return ProxyError::SslVerification {
            detail: err.to_string(),
        };
    }

    ProxyError::Upstream {
        status: 502,
        body: Value::String(err.to_string()),
    }
}

/// Walk the error source chain looking for TLS certificate-failure markers.
/// reqwest does not expose the structured rustls error, so the chain text
/// is the most stable surface available.
fn is_certificate_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if has_certificate_marker(&e.to_string()) {
            return true;
        }
        source = e.source();
    }
    false
}

fn has_certificate_marker(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("certificate")
        || lower.contains("unknownissuer")
        || lower.contains("certnotvalidforname")
        || lower.contains("certexpired")
        || lower.contains("self signed")
        || lower.contains("self-signed")
}

fn build_outbound_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Flatten signed params into key/value pairs for the query string or form
/// body. Non-string values are carried as their JSON text.
fn encode_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_outbound_url() {
        assert_eq!(
            build_outbound_url("https://panel.example:8888", "/api/panel/get_sys_info"),
            "https://panel.example:8888/api/panel/get_sys_info"
        );
        assert_eq!(
            build_outbound_url("https://panel.example:8888/", "api/panel/get_sys_info"),
            "https://panel.example:8888/api/panel/get_sys_info"
        );
    }

    #[test]
    fn test_encode_params() {
        let mut params = Map::new();
        params.insert("action".to_string(), json!("get_sys_info"));
        params.insert("request_time".to_string(), json!(1_700_000_000));
        params.insert("force".to_string(), json!(true));
        params.insert("filter".to_string(), json!({"name": "web"}));

        let mut pairs = encode_params(&params);
        pairs.sort();

        assert!(pairs.contains(&("action".to_string(), "get_sys_info".to_string())));
        assert!(pairs.contains(&("request_time".to_string(), "1700000000".to_string())));
        assert!(pairs.contains(&("force".to_string(), "true".to_string())));
        assert!(pairs.contains(&("filter".to_string(), "{\"name\":\"web\"}".to_string())));
    }

    #[test]
    fn test_certificate_markers() {
        assert!(has_certificate_marker(
            "invalid peer certificate: UnknownIssuer"
        ));
        assert!(has_certificate_marker(
            "invalid peer certificate: certificate expired"
        ));
        assert!(has_certificate_marker("self signed certificate in chain"));
        assert!(!has_certificate_marker("connection refused"));
        assert!(!has_certificate_marker("dns error: no record"));
    }
}
