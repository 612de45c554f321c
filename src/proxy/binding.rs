//! Panel binding store
//!
//! Maps (session, panel type) to the connection info of the panel the user
//! bound earlier. At most one binding per pair; bindings live only as long
//! as their owning session.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use url::Url;

use crate::proxy::error::ProxyError;
use crate::proxy::panels::PanelType;
use crate::proxy::session::SessionStore;

#[derive(Debug, Clone, Serialize)]
pub struct PanelBinding {
    pub session_id: String,
    pub panel_type: PanelType,
    /// Normalized origin, no trailing slash
    pub base_url: String,
    pub api_key: String,
    /// Epoch milliseconds
    pub bound_at: i64,
}

pub struct PanelBindingStore {
    bindings: DashMap<(String, PanelType), PanelBinding>,
    sessions: Arc<SessionStore>,
}

impl PanelBindingStore {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self {
            bindings: DashMap::new(),
            sessions,
        }
    }

    /// Upsert the binding for (session, panel type). A later bind for the
    /// same pair overwrites the earlier one.
    pub fn bind(
        &self,
        session_id: &str,
        panel_type: PanelType,
        base_url: &str,
        api_key: &str,
    ) -> Result<(), ProxyError> {
        if !self.sessions.is_valid(session_id) {
            return Err(ProxyError::InvalidBinding(
                "session is missing or expired".to_string(),
            ));
        }

        let base_url = normalize_base_url(base_url)?;

        if api_key.trim().is_empty() {
            return Err(ProxyError::InvalidBinding(
                "api key must not be empty".to_string(),
            ));
        }

        self.bindings.insert(
            (session_id.to_string(), panel_type),
            PanelBinding {
                session_id: session_id.to_string(),
                panel_type,
                base_url,
                api_key: api_key.trim().to_string(),
                bound_at: chrono::Utc::now().timestamp_millis(),
            },
        );

        Ok(())
    }

    pub fn get(&self, session_id: &str, panel_type: PanelType) -> Option<PanelBinding> {
        self.bindings
            .get(&(session_id.to_string(), panel_type))
            .map(|b| b.value().clone())
    }

    /// Remove every binding owned by the session (logout / expiry)
    pub fn clear(&self, session_id: &str) {
        self.bindings.retain(|(sid, _), _| sid != session_id);
    }
}

/// Validate and normalize the panel base URL: http(s) scheme, a host, and
/// no trailing slash so panel-relative paths concatenate cleanly.
fn normalize_base_url(raw: &str) -> Result<String, ProxyError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| ProxyError::InvalidBinding(format!("invalid panel url: {}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ProxyError::InvalidBinding(format!(
            "unsupported panel url scheme: {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(ProxyError::InvalidBinding(
            "panel url has no host".to_string(),
        ));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_session() -> (PanelBindingStore, String) {
        let sessions = Arc::new(SessionStore::new());
        let id = sessions.create(true, 3600);
        (PanelBindingStore::new(sessions), id)
    }

    #[test]
    fn test_bind_and_get() {
        let (store, session) = store_with_session();

        store
            .bind(&session, PanelType::Bt, "https://panel.example:8888", "k1")
            .unwrap();

        let binding = store.get(&session, PanelType::Bt).unwrap();
        assert_eq!(binding.base_url, "https://panel.example:8888");
        assert_eq!(binding.api_key, "k1");
    }

    #[test]
    fn test_rebind_overwrites() {
        let (store, session) = store_with_session();

        store
            .bind(&session, PanelType::Bt, "https://a.example", "old-key")
            .unwrap();
        store
            .bind(&session, PanelType::Bt, "https://b.example", "new-key")
            .unwrap();

        let binding = store.get(&session, PanelType::Bt).unwrap();
        assert_eq!(binding.base_url, "https://b.example");
        assert_eq!(binding.api_key, "new-key");
    }

    #[test]
    fn test_bindings_are_per_panel_type() {
        let (store, session) = store_with_session();

        store
            .bind(&session, PanelType::Bt, "https://bt.example", "k1")
            .unwrap();

        assert!(store.get(&session, PanelType::Bt).is_some());
        assert!(store.get(&session, PanelType::OnePanel).is_none());
    }

    #[test]
    fn test_bind_requires_valid_session() {
        let sessions = Arc::new(SessionStore::new());
        let store = PanelBindingStore::new(sessions.clone());

        let err = store
            .bind("no-such-session", PanelType::Bt, "https://a.example", "k")
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidBinding(_)));

        // Destroyed session is rejected too
        let id = sessions.create(true, 3600);
        sessions.destroy(&id);
        let err = store
            .bind(&id, PanelType::Bt, "https://a.example", "k")
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidBinding(_)));
    }

    #[test]
    fn test_bind_rejects_malformed_input() {
        let (store, session) = store_with_session();

        assert!(store
            .bind(&session, PanelType::Bt, "not a url", "k")
            .is_err());
        assert!(store
            .bind(&session, PanelType::Bt, "ftp://a.example", "k")
            .is_err());
        assert!(store
            .bind(&session, PanelType::Bt, "https://a.example", "  ")
            .is_err());
    }

    #[test]
    fn test_clear_removes_all_session_bindings() {
        let (store, session) = store_with_session();

        store
            .bind(&session, PanelType::Bt, "https://bt.example", "k1")
            .unwrap();
        store
            .bind(&session, PanelType::OnePanel, "https://op.example", "k2")
            .unwrap();

        store.clear(&session);
        assert!(store.get(&session, PanelType::Bt).is_none());
        assert!(store.get(&session, PanelType::OnePanel).is_none());
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(
            normalize_base_url("https://panel.example:8888/").unwrap(),
            "https://panel.example:8888"
        );
        assert_eq!(
            normalize_base_url("  http://10.0.0.2:8888  ").unwrap(),
            "http://10.0.0.2:8888"
        );
    }
}
