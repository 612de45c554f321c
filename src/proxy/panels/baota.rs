//! baota panel signing
//!
//! The panel expects every API call to carry `request_time` (Unix seconds)
//! and `request_token`, an MD5 digest of the API key concatenated with the
//! decimal request time. The token is time-scoped; a call outside the
//! panel's tolerance window is rejected upstream and surfaces as a
//! forwarded-request failure.

use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use super::{md5_hex, PanelAuth, SignedCall};

pub struct BaotaAuth;

impl PanelAuth for BaotaAuth {
    fn sign(&self, params: &Map<String, Value>, api_key: &str, now_secs: i64) -> SignedCall {
        let token = md5_hex(&format!("{}{}", api_key, now_secs));

        let mut signed = params.clone();
        signed.insert("request_time".to_string(), Value::from(now_secs));
        signed.insert("request_token".to_string(), Value::from(token));

        SignedCall {
            params: signed,
            headers: HeaderMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const API_KEY: &str = "0123456789abcdef0123456789abcdef";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_known_token() {
        // md5("0123456789abcdef0123456789abcdef" + "1700000000")
        let signed = BaotaAuth.sign(&Map::new(), API_KEY, NOW);
        assert_eq!(signed.params["request_time"], json!(NOW));
        assert_eq!(
            signed.params["request_token"],
            json!("224dd730e3a37f3a004dbf08aaaef729")
        );
        assert!(signed.headers.is_empty());
    }

    #[test]
    fn test_deterministic_for_fixed_clock() {
        let mut params = Map::new();
        params.insert("action".to_string(), json!("get_sys_info"));

        let a = BaotaAuth.sign(&params, API_KEY, NOW);
        let b = BaotaAuth.sign(&params, API_KEY, NOW);
        assert_eq!(a.params, b.params);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let mut params = Map::new();
        params.insert("action".to_string(), json!("get_sys_info"));
        let before = params.clone();

        let signed = BaotaAuth.sign(&params, API_KEY, NOW);

        assert_eq!(params, before);
        assert!(signed.params.contains_key("request_token"));
        assert!(!params.contains_key("request_token"));
    }

    #[test]
    fn test_existing_params_preserved() {
        let mut params = Map::new();
        params.insert("limit".to_string(), json!(10));
        params.insert("p".to_string(), json!("1"));

        let signed = BaotaAuth.sign(&params, API_KEY, NOW);
        assert_eq!(signed.params["limit"], json!(10));
        assert_eq!(signed.params["p"], json!("1"));
        assert_eq!(signed.params.len(), 4);
    }

    #[test]
    fn test_token_depends_on_time() {
        let a = BaotaAuth.sign(&Map::new(), API_KEY, NOW);
        let b = BaotaAuth.sign(&Map::new(), API_KEY, NOW + 1);
        assert_ne!(a.params["request_token"], b.params["request_token"]);
    }
}
