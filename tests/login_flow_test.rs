//! Login flow integration tests using wiremock
//!
//! Verifies the authorize-redirect side of the flow against a live scope
//! catalog endpoint:
//!
//! - The authorize redirect carries the client coordinates and the
//!   reconciled, space-joined scope list.
//! - Requested scopes missing from the published catalog are dropped
//!   silently; stored scopes survive.
//! - The `state` parameter round-trips the `return_to` URL.
//! - A callback reporting `error=invalid_scope` surfaces the scopes that
//!   differ between the session and the live catalog.

use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authflow::store::keys;
use authflow::{AuthflowError, MemoryStore, PersistentStore, TransferState};

mod common;

fn query_map(url: &url::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// An anonymous login reconciles the requested scopes against the catalog
/// and redirects to the authorize endpoint with the effective set.
#[tokio::test]
async fn test_login_redirects_with_reconciled_scopes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/scopes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["read:reports", "write:reports"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut client = common::client_for(&server);
    let redirect = client
        .login(
            &["read:reports", "write:reports", "admin:all"],
            &common::page_request(),
            None,
        )
        .await
        .expect("login must succeed")
        .expect("anonymous login must redirect");

    assert_eq!(redirect.url().path(), "/authorize");

    let params = query_map(redirect.url());
    assert_eq!(params.get("client_id").map(String::as_str), Some("client-1"));
    assert_eq!(
        params.get("redirect_uri").map(String::as_str),
        Some("https://app.example.com/callback")
    );
    assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
    assert_eq!(
        params.get("scope").map(String::as_str),
        Some("read:reports write:reports"),
        "admin:all is not in the catalog and must be dropped"
    );

    let state = TransferState::decode(params.get("state").expect("state must be present"));
    assert_eq!(
        state.return_to().as_deref(),
        Some("https://app.example.com/account"),
        "return_to must default to the current request URL"
    );

    assert_eq!(
        client.scopes(),
        vec!["read:reports", "write:reports"],
        "the effective scopes must be persisted for later flows"
    );

    server.verify().await;
}

/// An authenticated session never leaves the application: login is a no-op
/// and the catalog is not consulted.
#[tokio::test]
async fn test_login_is_noop_for_authenticated_session() {
    let server = MockServer::start().await;

    let mut client = common::authenticated_client_for(&server);
    let redirect = client
        .login(&["read:reports"], &common::page_request(), None)
        .await
        .expect("login must succeed");

    assert!(redirect.is_none(), "authenticated login must not redirect");
    assert!(
        server.received_requests().await.unwrap_or_default().is_empty(),
        "no request may reach the server"
    );
}

/// An explicit return_to overrides the current request URL in the state.
#[tokio::test]
async fn test_login_honors_explicit_return_to() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/scopes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["read:reports"])))
        .mount(&server)
        .await;

    let mut client = common::client_for(&server);
    let redirect = client
        .login(
            &["read:reports"],
            &common::page_request(),
            Some("https://app.example.com/dashboard"),
        )
        .await
        .expect("login must succeed")
        .expect("anonymous login must redirect");

    let params = query_map(redirect.url());
    let state = TransferState::decode(params.get("state").expect("state must be present"));
    assert_eq!(
        state.return_to().as_deref(),
        Some("https://app.example.com/dashboard")
    );
}

/// A failing catalog fetch yields an empty catalog, so every requested
/// scope is dropped and only previously stored scopes remain.
#[tokio::test]
async fn test_catalog_fetch_failure_drops_requested_scopes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/scopes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = MemoryStore::new();
    store.set(keys::SCOPES, json!(["read:reports"]));
    let mut client = common::client_with_store(common::config_for(&server), store);

    let redirect = client
        .login(&["write:reports"], &common::page_request(), None)
        .await
        .expect("login must succeed")
        .expect("anonymous login must redirect");

    let params = query_map(redirect.url());
    assert_eq!(
        params.get("scope").map(String::as_str),
        Some("read:reports"),
        "only the stored scope survives an unavailable catalog"
    );

    server.verify().await;
}

/// A callback carrying error=invalid_scope lists the symmetric difference
/// between the session's scopes and the live catalog, which also covers
/// scopes revoked server-side after login.
#[tokio::test]
async fn test_invalid_scope_callback_lists_differing_scopes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/scopes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["read:reports", "write:reports"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut store = MemoryStore::new();
    store.set(keys::SCOPES, json!(["read:reports", "legacy:scope"]));
    let mut client = common::client_with_store(common::config_for(&server), store);

    let err = client
        .callback(&common::callback_request("/callback?error=invalid_scope"))
        .await
        .expect_err("invalid_scope must fail the callback");

    match err.downcast_ref::<AuthflowError>() {
        Some(AuthflowError::UnauthorizedScope { scopes }) => {
            assert!(
                scopes.contains("legacy:scope") && scopes.contains("write:reports"),
                "both sides of the difference must be listed, got: {}",
                scopes
            );
            assert!(
                !scopes.contains("read:reports"),
                "scopes present on both sides must not be listed, got: {}",
                scopes
            );
        }
        other => panic!("expected UnauthorizedScope, got {:?}", other),
    }

    server.verify().await;
}

/// Any other callback error value surfaces as a server error without
/// touching the network.
#[tokio::test]
async fn test_other_callback_error_is_a_server_error() {
    let server = MockServer::start().await;

    let mut client = common::client_for(&server);
    let err = client
        .callback(&common::callback_request("/callback?error=access_denied"))
        .await
        .expect_err("a callback error must fail");

    match err.downcast_ref::<AuthflowError>() {
        Some(AuthflowError::Server(message)) => assert_eq!(message, "access_denied"),
        other => panic!("expected Server, got {:?}", other),
    }
}
