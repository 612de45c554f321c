//! 1Panel signing
//!
//! 1Panel authenticates API calls through headers rather than body
//! parameters: `1Panel-Timestamp` carries Unix seconds and `1Panel-Token`
//! is an MD5 digest of the literal product name, the API key, and the
//! timestamp. Request parameters pass through untouched.

use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};

use super::{md5_hex, PanelAuth, SignedCall};

const TOKEN_HEADER: &str = "1Panel-Token";
const TIMESTAMP_HEADER: &str = "1Panel-Timestamp";

pub struct OnePanelAuth;

impl PanelAuth for OnePanelAuth {
    fn sign(&self, params: &Map<String, Value>, api_key: &str, now_secs: i64) -> SignedCall {
        let token = md5_hex(&format!("1panel{}{}", api_key, now_secs));

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&token) {
            headers.insert(TOKEN_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&now_secs.to_string()) {
            headers.insert(TIMESTAMP_HEADER, value);
        }

        SignedCall {
            params: params.clone(),
            headers,
        }
    }
}
