//! In-memory store
//!
//! Backs the flow with a plain map. Used by tests and by hosts that manage
//! persistence elsewhere (e.g. machine-to-machine callers that re-login per
//! process).

use super::PersistentStore;
use serde_json::Value;
use std::collections::HashMap;

/// Map-backed [`PersistentStore`] with no external side effects
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn delete(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) {
        self.values.clear();
    }
}
