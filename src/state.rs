//! Transient state carried across the redirect boundary
//!
//! The authorization-code flow needs a small amount of request-scoped data
//! (primarily the `return_to` URL) to survive the round trip through the
//! authorization server. [`TransferState`] encodes that data as
//! base64(JSON) and rides the OAuth `state` parameter, which the server
//! echoes back verbatim on callback.
//!
//! Decoding is deliberately forgiving: a missing or malformed token yields
//! an empty state rather than an error, because a hostile or truncated
//! `state` parameter must never take down the callback handler.

use crate::request::IncomingRequest;
use base64::Engine;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Transient key/value state round-tripped via the `state` parameter
///
/// Entries are kept in an ordered map so encoding is deterministic.
/// Merging drops falsy values (JSON `null`, `false`, `""`, `0`, empty
/// arrays and objects), which keeps repeated merges idempotent and stops
/// stale empty entries from accumulating across flow steps.
///
/// # Examples
///
/// ```
/// use authflow::TransferState;
///
/// let mut state = TransferState::new();
/// state.set_return_to("https://app.example.com/home");
///
/// let token = state.encode().expect("non-empty state encodes");
/// let decoded = TransferState::decode(&token);
/// assert_eq!(
///     decoded.return_to().as_deref(),
///     Some("https://app.example.com/home")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferState {
    entries: BTreeMap<String, Value>,
}

impl TransferState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw `state` token
    ///
    /// Malformed input (bad base64, bad JSON, or a non-object payload)
    /// yields an empty state.
    pub fn decode(raw: &str) -> Self {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(raw) {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!("state token is not valid base64, treating as empty");
                return Self::new();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Self {
                entries: map.into_iter().collect(),
            },
            Ok(_) | Err(_) => {
                warn!("state token did not decode to a JSON object, treating as empty");
                Self::new()
            }
        }
    }

    /// Decode the `state` query parameter of an inbound request
    ///
    /// A request without a `state` parameter yields an empty state.
    pub fn from_request(request: &IncomingRequest) -> Self {
        match request.query("state") {
            Some(raw) => Self::decode(raw),
            None => Self::new(),
        }
    }

    /// Union entries into this state, dropping falsy values
    pub fn merge(&mut self, entries: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in entries {
            if is_falsy(&value) {
                self.entries.remove(&key);
            } else {
                self.entries.insert(key, value);
            }
        }
    }

    /// Consume the state, yielding its entries for merging elsewhere
    pub fn into_entries(self) -> impl Iterator<Item = (String, Value)> {
        self.entries.into_iter()
    }

    /// Record the URL to resume at once the flow completes
    ///
    /// An empty URL clears any previous value instead of storing a blank.
    pub fn set_return_to(&mut self, url: &str) {
        self.merge([("return_to".to_string(), Value::String(url.to_string()))]);
    }

    /// Look up a single entry
    ///
    /// Returns `None` both when the state is empty and when the entry is
    /// absent from an otherwise populated state.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// The `return_to` entry, when present and a string
    pub fn return_to(&self) -> Option<String> {
        self.entries
            .get("return_to")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Whether the state carries no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the state as a base64(JSON) token
    ///
    /// Returns `None` when the state is empty, so callers omit the `state`
    /// parameter entirely rather than sending an empty token.
    pub fn encode(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let json = Value::Object(self.entries.clone().into_iter().collect());
        let bytes = serde_json::to_vec(&json).ok()?;
        Some(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// JSON values treated as absent when merging transient state.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
