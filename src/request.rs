//! Inbound request snapshot
//!
//! The flow operations never read process-global request state; callers
//! hand them an [`IncomingRequest`] capturing the parts of the inbound
//! HTTP request the flow needs: scheme, host, request target, and the
//! parsed query/form parameters.

use crate::error::Result;
use std::collections::HashMap;
use url::Url;

/// Snapshot of one inbound HTTP request
///
/// # Examples
///
/// ```
/// use authflow::IncomingRequest;
///
/// let request = IncomingRequest::new("https", "app.example.com", "/callback?code=abc");
/// assert_eq!(request.query("code"), Some("abc"));
/// assert_eq!(request.current_url(), "https://app.example.com/callback?code=abc");
/// ```
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    scheme: String,
    host: String,
    target: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
}

impl IncomingRequest {
    /// Create a request snapshot from scheme, host, and request target
    ///
    /// The target is the raw path plus optional query string, as it appears
    /// in the request line (e.g. `/callback?code=abc&state=xyz`).
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        let query = match target.split_once('?') {
            Some((_, raw)) => parse_form_encoded(raw),
            None => HashMap::new(),
        };

        Self {
            scheme: scheme.into(),
            host: host.into(),
            target,
            query,
            form: HashMap::new(),
        }
    }

    /// Create a request snapshot from an absolute URL
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be parsed
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)?;
        let mut host = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            host.push_str(&format!(":{}", port));
        }
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(Self::new(url.scheme(), host, target))
    }

    /// Attach a form-encoded request body (for `form_post` callbacks)
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.form = parse_form_encoded(body);
        self
    }

    /// Look up a query parameter
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Look up a form-body parameter
    pub fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    /// Reconstruct the absolute URL of this request
    ///
    /// Used as the default `return_to` when the caller does not supply one.
    pub fn current_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.target)
    }
}

/// Parses a form-encoded string (query string or POST body) into a map.
fn parse_form_encoded(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
