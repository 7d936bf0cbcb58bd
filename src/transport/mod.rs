//! HTTP transport seam between the flow and the authorization server
//!
//! The flow talks to the authorization server exclusively through the
//! [`Transport`] trait, which exchanges plain [`TransportRequest`] /
//! [`TransportResponse`] values. Two rules shape the contract:
//!
//! - Non-2xx statuses are data, not faults. The flow branches on status
//!   codes (token rejected, profile 401, refresh failure), so the transport
//!   must hand them back instead of erroring. Only transport-level failures
//!   (connect, timeout, TLS) surface as errors.
//! - Response headers ride along, lower-cased, so the flow can record
//!   rate-limit headers as an observability side channel.

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpTransport;

/// One outbound call to the authorization server
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: reqwest::Method,
    /// Absolute target URL
    pub url: Url,
    /// Form-encoded body pairs, when present
    pub form: Option<Vec<(String, String)>>,
    /// Bearer token to inject as `Authorization: Bearer {token}`
    pub bearer: Option<String>,
    /// Extra headers merged into the request
    pub headers: HashMap<String, String>,
}

impl TransportRequest {
    /// Build a GET request
    pub fn get(url: Url) -> Self {
        Self {
            method: reqwest::Method::GET,
            url,
            form: None,
            bearer: None,
            headers: HashMap::new(),
        }
    }

    /// Build a POST request with a form-encoded body
    pub fn post_form(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: reqwest::Method::POST,
            url,
            form: Some(form),
            bearer: None,
            headers: HashMap::new(),
        }
    }

    /// Attach a bearer token
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Attach one extra header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Look up a form pair by key (primarily for test assertions)
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One response from the authorization server
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lower-cased
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: String,
}

impl TransportResponse {
    /// Build a response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Attach one header (name is lower-cased)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Parse the body as JSON, `None` when it is not valid JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Transport contract consumed by the flow
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Perform one HTTP call
    ///
    /// # Errors
    ///
    /// Returns an error only for transport-level failures; HTTP error
    /// statuses come back as a normal [`TransportResponse`]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}
