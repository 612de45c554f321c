use serde::{Deserialize, Serialize};

/// Proxy service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Whether LAN access is allowed
    /// - false: loopback only, 127.0.0.1 (default, privacy first)
    /// - true: bind 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Listen port
    pub port: u16,

    /// Session validity after a successful login (hours)
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Outbound panel request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Base32 TOTP secret for the login flow; login is refused while empty
    #[serde(default)]
    pub totp_secret: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: 8046,
            session_ttl_hours: default_session_ttl_hours(),
            request_timeout: default_request_timeout(),
            totp_secret: String::new(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_request_timeout() -> u64 {
    30
}

impl ProxyConfig {
    /// Actual listen address for the configured access policy
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 8046);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.request_timeout, 30);
        assert!(config.totp_secret.is_empty());
        assert_eq!(config.get_bind_address(), "127.0.0.1");
    }

    #[test]
    fn test_lan_bind_address() {
        let config = ProxyConfig {
            allow_lan_access: true,
            ..Default::default()
        };
        assert_eq!(config.get_bind_address(), "0.0.0.0");
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ProxyConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.allow_lan_access);
        assert_eq!(config.request_timeout, 30);
    }
}
