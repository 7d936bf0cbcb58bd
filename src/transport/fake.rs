//! In-process fake transport for unit tests
//!
//! Provides [`FakeTransport`] and [`FakeTransportHandle`], a pair that
//! replaces real network I/O in tests. Wire the [`FakeTransport`] into the
//! code under test; from the test side use the handle to:
//!
//! - script server responses ahead of time: `handle.script(...)`
//! - read back what the client sent: `handle.requests()`
//!
//! Responses are replayed in FIFO order, one per `send` call. A `send` with
//! no scripted response left is an error, which makes an unexpected extra
//! call fail the test instead of hanging it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Scripted [`Transport`] for use in tests
#[derive(Debug)]
pub struct FakeTransport {
    responses: Arc<Mutex<VecDeque<TransportResponse>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

/// Test-side handle for a [`FakeTransport`]
#[derive(Debug, Clone)]
pub struct FakeTransportHandle {
    responses: Arc<Mutex<VecDeque<TransportResponse>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl FakeTransport {
    /// Create a `(FakeTransport, FakeTransportHandle)` pair
    ///
    /// The transport goes into the code under test; the handle stays with
    /// the test to script responses and inspect recorded requests.
    pub fn new() -> (Self, FakeTransportHandle) {
        let responses = Arc::new(Mutex::new(VecDeque::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let transport = Self {
            responses: Arc::clone(&responses),
            requests: Arc::clone(&requests),
        };
        let handle = FakeTransportHandle {
            responses,
            requests,
        };

        (transport, handle)
    }
}

impl FakeTransportHandle {
    /// Queue a response for the next unmatched `send`
    pub fn script(&self, response: TransportResponse) {
        self.responses
            .lock()
            .expect("FakeTransport: response queue poisoned")
            .push_back(response);
    }

    /// Queue a JSON response with the given status
    pub fn script_json(&self, status: u16, body: serde_json::Value) {
        self.script(TransportResponse::new(status, body.to_string()));
    }

    /// All requests the client has sent, in order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .expect("FakeTransport: request log poisoned")
            .clone()
    }

    /// The most recent request the client sent
    ///
    /// # Panics
    ///
    /// Panics when no request has been recorded yet.
    pub fn last_request(&self) -> TransportRequest {
        self.requests()
            .pop()
            .expect("FakeTransport: no request recorded")
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let scripted = {
            let mut responses = self
                .responses
                .lock()
                .expect("FakeTransport: response queue poisoned");
            responses.pop_front()
        };

        let description = format!("{} {}", request.method, request.url);
        self.requests
            .lock()
            .expect("FakeTransport: request log poisoned")
            .push(request);

        match scripted {
            Some(response) => Ok(response),
            None => anyhow::bail!("FakeTransport: no scripted response for {}", description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_scripted_responses_replay_in_order() {
        let (transport, handle) = FakeTransport::new();
        handle.script(TransportResponse::new(200, "first"));
        handle.script(TransportResponse::new(401, "second"));

        let url = Url::parse("https://example.com/api/1.0/me").unwrap();
        let first = transport
            .send(TransportRequest::get(url.clone()))
            .await
            .unwrap();
        let second = transport.send(TransportRequest::get(url)).await.unwrap();

        assert_eq!(first.status, 200);
        assert_eq!(first.body, "first");
        assert_eq!(second.status, 401);
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let (transport, handle) = FakeTransport::new();
        handle.script_json(200, serde_json::json!({"ok": true}));

        let url = Url::parse("https://example.com/token").unwrap();
        let request = TransportRequest::post_form(
            url,
            vec![("grant_type".to_string(), "authorization_code".to_string())],
        );
        transport.send(request).await.unwrap();

        let recorded = handle.last_request();
        assert_eq!(recorded.method, reqwest::Method::POST);
        assert_eq!(
            recorded.form_value("grant_type"),
            Some("authorization_code")
        );
    }

    #[tokio::test]
    async fn test_unscripted_send_is_an_error() {
        let (transport, _handle) = FakeTransport::new();
        let url = Url::parse("https://example.com/token").unwrap();
        let result = transport.send(TransportRequest::get(url)).await;
        assert!(result.is_err(), "send without a scripted response must fail");
    }
}
