//! Server-side session store
//!
//! Wraps a session map owned by the host (one per visiting user) and
//! namespaces every key with a prefix, so this client's entries coexist
//! with whatever else the host keeps in the session. `flush` removes only
//! the prefixed keys.
//!
//! The host decides how the session map is materialized (cookie-backed,
//! database-backed); this store only marks it as started on first access so
//! the host knows when to emit its session cookie.

use super::PersistentStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Shared handle to the host-owned session map
pub type SessionHandle = Arc<RwLock<HashMap<String, Value>>>;

/// Session-backed [`PersistentStore`] with prefix namespacing
#[derive(Debug)]
pub struct SessionStore {
    session: SessionHandle,
    prefix: String,
    started: AtomicBool,
}

impl SessionStore {
    /// Lifetime, in seconds, the host should apply to its session cookie
    /// (14 days)
    pub const COOKIE_LIFETIME_SECS: u64 = 1_209_600;

    const DEFAULT_PREFIX: &'static str = "authflow";

    /// Create a store over the given session with the default prefix
    pub fn new(session: SessionHandle) -> Self {
        Self::with_prefix(session, Self::DEFAULT_PREFIX)
    }

    /// Create a store over the given session with a custom key prefix
    pub fn with_prefix(session: SessionHandle, prefix: impl Into<String>) -> Self {
        Self {
            session,
            prefix: prefix.into(),
            started: AtomicBool::new(false),
        }
    }

    /// Whether the backing session has been touched by this store
    pub fn started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key)
    }

    fn touch(&self) {
        if !self.started.swap(true, Ordering::Relaxed) {
            debug!(prefix = %self.prefix, "session store started");
        }
    }
}

impl PersistentStore for SessionStore {
    fn get(&self, key: &str, default: Value) -> Value {
        self.touch();
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.get(&self.namespaced(key)).cloned().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.touch();
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.insert(self.namespaced(key), value);
    }

    fn has(&self, key: &str) -> bool {
        self.touch();
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.contains_key(&self.namespaced(key))
    }

    fn delete(&mut self, key: &str) {
        self.touch();
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.remove(&self.namespaced(key));
    }

    fn flush(&mut self) {
        self.touch();
        let owned_prefix = format!("{}_", self.prefix);
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.retain(|key, _| !key.starts_with(&owned_prefix));
        debug!(prefix = %self.prefix, "session store flushed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> SessionHandle {
        Arc::new(RwLock::new(HashMap::new()))
    }

    #[test]
    fn test_keys_are_namespaced_in_the_backing_session() {
        let handle = session();
        let mut store = SessionStore::new(Arc::clone(&handle));
        store.set("access_token", json!("T"));

        let raw = handle.read().unwrap();
        assert!(raw.contains_key("authflow_access_token"));
        assert!(!raw.contains_key("access_token"));
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let store = SessionStore::new(session());
        assert_eq!(store.get("missing", json!("fallback")), json!("fallback"));
    }

    #[test]
    fn test_two_prefixes_do_not_collide() {
        let handle = session();
        let mut first = SessionStore::with_prefix(Arc::clone(&handle), "first");
        let mut second = SessionStore::with_prefix(Arc::clone(&handle), "second");

        first.set("access_token", json!("A"));
        second.set("access_token", json!("B"));

        assert_eq!(first.get("access_token", json!(null)), json!("A"));
        assert_eq!(second.get("access_token", json!(null)), json!("B"));
    }

    #[test]
    fn test_flush_removes_only_own_keys() {
        let handle = session();
        handle
            .write()
            .unwrap()
            .insert("cart_items".to_string(), json!(["book"]));

        let mut store = SessionStore::new(Arc::clone(&handle));
        store.set("access_token", json!("T"));
        store.set("scopes", json!(["read"]));
        store.flush();

        assert!(!store.has("access_token"));
        assert!(!store.has("scopes"));
        let raw = handle.read().unwrap();
        assert_eq!(
            raw.get("cart_items"),
            Some(&json!(["book"])),
            "foreign session entries must survive a flush"
        );
    }

    #[test]
    fn test_started_flips_on_first_access() {
        let store = SessionStore::new(session());
        assert!(!store.started());
        let _ = store.get("access_token", json!(null));
        assert!(store.started());
    }

    #[test]
    fn test_cookie_lifetime_is_fourteen_days() {
        assert_eq!(SessionStore::COOKIE_LIFETIME_SECS, 14 * 24 * 60 * 60);
    }
}
