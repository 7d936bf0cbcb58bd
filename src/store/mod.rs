//! Session-scoped persistence for tokens and scopes
//!
//! The flow persists its tokens, granted scopes, and (optionally) the user
//! profile through the [`PersistentStore`] trait, so the backing medium is
//! swappable: a server-side session in production, a plain map in tests.
//!
//! Absent keys are never an error; `get` returns the caller-supplied
//! default. `flush` removes only the keys this store owns, never the rest
//! of the backing session.

use serde_json::Value;

pub mod memory;
pub mod session;

pub use memory::MemoryStore;
pub use session::{SessionHandle, SessionStore};

/// Fixed names of the persisted session entries.
pub mod keys {
    /// Bearer token presented on authenticated calls
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Token used to obtain a fresh access token
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Absolute expiry of the access token, epoch seconds
    pub const EXPIRES_AT: &str = "expires_at";
    /// Token scheme reported by the server (e.g. "Bearer")
    pub const TOKEN_TYPE: &str = "token_type";
    /// Cached user profile JSON
    pub const USER_INFO: &str = "user_info";
    /// Scopes granted to this session
    pub const SCOPES: &str = "scopes";

    /// Every persisted key, for flush assertions and audits
    pub const ALL: [&str; 6] = [
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        EXPIRES_AT,
        TOKEN_TYPE,
        USER_INFO,
        SCOPES,
    ];
}

/// Storage contract for flow state
///
/// Implementations may lazily initialize their backing medium on first
/// access (session stores typically do). No operation surfaces an error:
/// missing keys fall back to the caller's default.
pub trait PersistentStore: Send + Sync + std::fmt::Debug {
    /// Read a value, falling back to `default` when the key is absent
    fn get(&self, key: &str, default: Value) -> Value;

    /// Write a value under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: Value);

    /// Whether `key` currently holds a value
    fn has(&self, key: &str) -> bool;

    /// Remove `key`, if present
    fn delete(&mut self, key: &str);

    /// Remove every key this store owns
    fn flush(&mut self);
}
