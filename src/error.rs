//! Error types for Authflow
//!
//! This module defines all error types used throughout the library,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Authflow operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration validation, the authorization-code flow, token
/// exchange/refresh, and profile retrieval.
#[derive(Error, Debug)]
pub enum AuthflowError {
    /// Configuration-related errors (missing or malformed required fields)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token exchange rejected by the authorization server (status > 400)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Callback reported `invalid_scope`; lists requested scopes outside
    /// the published catalog and catalog scopes that were not requested
    #[error("Unauthorized scope(s): {scopes}")]
    UnauthorizedScope {
        /// Comma-joined diff of requested vs. catalog scopes
        scopes: String,
    },

    /// Unclassified `error` value on the callback request
    #[error("Authorization server error: {0}")]
    Server(String),

    /// A refreshed token was still rejected with 401; the session cannot
    /// be recovered without a new login
    #[error("Session unrecoverable: {0}")]
    SessionUnrecoverable(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL construction errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Authflow operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
