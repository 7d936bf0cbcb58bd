//! reqwest-backed transport
//!
//! Production [`Transport`] implementation over a shared [`reqwest::Client`].
//! HTTP error statuses are returned as data; only connect/timeout/TLS
//! failures become errors. Response header names are lower-cased on the way
//! out so the flow's header lookups stay case-insensitive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Per-request timeout applied to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("authflow/", env!("CARGO_PKG_VERSION"));

/// HTTP transport over a shared reqwest client
///
/// # Examples
///
/// ```no_run
/// use authflow::HttpTransport;
///
/// let transport = HttpTransport::new();
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    /// Underlying reqwest HTTP client.
    http_client: Arc<reqwest::Client>,
    /// Static extra headers merged into every request.
    default_headers: HashMap<String, String>,
}

impl HttpTransport {
    /// Construct a transport with the default timeout and no extra headers
    ///
    /// No network I/O is performed at construction time.
    pub fn new() -> Self {
        Self::with_headers(HashMap::new())
    }

    /// Construct a transport that merges `headers` into every request
    ///
    /// # Arguments
    ///
    /// * `headers` - Extra headers added to every request
    pub fn with_headers(headers: HashMap<String, String>) -> Self {
        let http_client = Arc::new(
            reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        );

        Self {
            http_client,
            default_headers: headers,
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            headers.insert(
                name.as_str().to_lowercase(),
                value.to_str().unwrap_or("").to_string(),
            );
        }

        let body = response.text().await?;
        debug!(status, bytes = body.len(), "received response");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_succeeds() {
        let _transport = HttpTransport::new();
    }

    #[test]
    fn test_with_headers_keeps_defaults() {
        let mut headers = HashMap::new();
        headers.insert("X-Tenant".to_string(), "acme".to_string());
        let transport = HttpTransport::with_headers(headers);
        assert_eq!(
            transport.default_headers.get("X-Tenant").map(String::as_str),
            Some("acme")
        );
    }

    #[test]
    fn test_transport_is_object_safe() {
        let transport = HttpTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
