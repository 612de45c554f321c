//! In-memory session store
//!
//! Sessions are created by the login flow after TOTP confirmation and read
//! by the auth gate on every protected request. Keyed map, no cross-key
//! invariants; a durable backing store would slot in behind the same
//! interface for multi-instance deployments.

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds; the session is usable only strictly before this
    pub expires_at: i64,
    /// Set after 2FA confirmation
    pub authenticated: bool,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a session and return its opaque identifier
    pub fn create(&self, authenticated: bool, ttl_seconds: i64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        self.sessions.insert(
            token.clone(),
            Session {
                session_id: token.clone(),
                created_at: now,
                expires_at: now + ttl_seconds * 1000,
                authenticated,
            },
        );

        token
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    /// True iff the session exists, is authenticated, and has not expired
    pub fn is_valid(&self, session_id: &str) -> bool {
        match self.sessions.get(session_id) {
            Some(session) => {
                let now = chrono::Utc::now().timestamp_millis();
                session.authenticated && now < session.expires_at
            }
            None => false,
        }
    }

    /// Remove the session; destroying a missing id is a no-op
    pub fn destroy(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drop expired sessions, returning the removed ids so callers can
    /// release state keyed on them (panel bindings)
    pub fn cleanup_expired(&self) -> Vec<String> {
        let now = chrono::Utc::now().timestamp_millis();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            self.sessions.remove(id);
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new();
        let id = store.create(true, 3600);

        let session = store.get(&id).unwrap();
        assert_eq!(session.session_id, id);
        assert!(session.authenticated);
        assert_eq!(session.expires_at - session.created_at, 3600 * 1000);
    }

    #[test]
    fn test_is_valid() {
        let store = SessionStore::new();
        let id = store.create(true, 3600);
        assert!(store.is_valid(&id));
        assert!(!store.is_valid("no-such-session"));
    }

    #[test]
    fn test_unauthenticated_session_is_invalid() {
        let store = SessionStore::new();
        let id = store.create(false, 3600);
        assert!(!store.is_valid(&id));
    }

    #[test]
    fn test_expiry_boundary() {
        let store = SessionStore::new();
        let id = store.create(true, 3600);

        // Still valid just before the deadline
        let now = chrono::Utc::now().timestamp_millis();
        store.sessions.get_mut(&id).unwrap().expires_at = now + 60_000;
        assert!(store.is_valid(&id));

        // `now < expires_at` is strict: a session whose deadline has been
        // reached is already invalid
        store.sessions.get_mut(&id).unwrap().expires_at = now;
        assert!(!store.is_valid(&id));

        store.sessions.get_mut(&id).unwrap().expires_at = now - 1;
        assert!(!store.is_valid(&id));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let store = SessionStore::new();
        let id = store.create(true, 3600);

        store.destroy(&id);
        assert!(store.get(&id).is_none());
        // Second destroy of the same id is a no-op
        store.destroy(&id);
    }

    #[test]
    fn test_cleanup_expired() {
        let store = SessionStore::new();
        let live = store.create(true, 3600);
        let dead = store.create(true, 3600);

        let now = chrono::Utc::now().timestamp_millis();
        store.sessions.get_mut(&dead).unwrap().expires_at = now - 1;

        let removed = store.cleanup_expired();
        assert_eq!(removed, vec![dead.clone()]);
        assert!(store.get(&dead).is_none());
        assert!(store.get(&live).is_some());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let store = SessionStore::new();
        let a = store.create(true, 60);
        let b = store.create(true, 60);
        assert_ne!(a, b);
    }
}
