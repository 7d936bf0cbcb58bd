//! Configuration management for Authflow
//!
//! This module handles loading, parsing, and validating the client
//! configuration from files or programmatic construction.

use crate::error::{AuthflowError, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure for Authflow
///
/// Holds the authorization-server coordinates and flow options. The four
/// required fields identify this application to the server; the remaining
/// fields have conventional defaults and may be omitted from config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Authorization server host, without a URI scheme (e.g. "auth.example.com")
    pub domain: String,

    /// OAuth2 client identifier issued by the authorization server
    pub client_id: String,

    /// OAuth2 client secret issued by the authorization server
    pub client_secret: String,

    /// Absolute URL the authorization server redirects back to
    pub redirect_uri: String,

    /// API version segment used in resource routes
    #[serde(default = "default_version")]
    pub version: String,

    /// OAuth2 response type requested on the authorize redirect
    #[serde(default = "default_response_type")]
    pub response_type: String,

    /// How the authorization server delivers callback parameters
    #[serde(default)]
    pub response_mode: ResponseMode,

    /// Whether the fetched user profile is cached in the store
    #[serde(default = "default_persist_user")]
    pub persist_user: bool,

    /// Optional base URL override for every route (useful for tests and local mocks)
    ///
    /// When set, routes are built against this base instead of
    /// `https://{domain}`, which allows tests to point the client at a mock
    /// server.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Delivery mechanism for callback parameters
///
/// `Query` carries `code`/`error` in the callback query string; `FormPost`
/// carries them in a POSTed form body. The `state` parameter always arrives
/// in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Parameters in the callback query string
    #[default]
    Query,
    /// Parameters in a POSTed form body
    FormPost,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_response_type() -> String {
    "code".to_string()
}

fn default_persist_user() -> bool {
    true
}

impl Config {
    /// Create a configuration with the required fields and default options
    ///
    /// # Arguments
    ///
    /// * `domain` - Authorization server host (no scheme)
    /// * `client_id` - OAuth2 client identifier
    /// * `client_secret` - OAuth2 client secret
    /// * `redirect_uri` - Callback URL registered with the server
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            version: default_version(),
            response_type: default_response_type(),
            response_mode: ResponseMode::default(),
            persist_user: default_persist_user(),
            base_url: None,
        }
    }

    /// Load configuration from a YAML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthflowError::Configuration(format!("Failed to read config file: {}", e))
        })?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AuthflowError::Configuration(format!("Failed to parse config: {}", e)).into())
    }

    /// Validate the configuration
    ///
    /// Checks that every required field is present and that `domain` is a
    /// bare host. Called once by `AuthorizationClient::new`; a failure here
    /// is fatal and never recovered.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(AuthflowError::Configuration("domain is required".to_string()).into());
        }

        if self.domain.contains("://") {
            return Err(AuthflowError::Configuration(format!(
                "domain must not include a URI scheme: {}",
                self.domain
            ))
            .into());
        }

        if self.client_id.is_empty() {
            return Err(AuthflowError::Configuration("client_id is required".to_string()).into());
        }

        if self.client_secret.is_empty() {
            return Err(
                AuthflowError::Configuration("client_secret is required".to_string()).into(),
            );
        }

        if self.redirect_uri.is_empty() {
            return Err(
                AuthflowError::Configuration("redirect_uri is required".to_string()).into(),
            );
        }

        if self.version.is_empty() {
            return Err(AuthflowError::Configuration("version cannot be empty".to_string()).into());
        }

        Ok(())
    }
}
