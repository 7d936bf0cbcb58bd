//! Login Roundtrip Example
//!
//! This example walks the whole authorization-code flow against an
//! embedded mock authorization server:
//! 1. An anonymous page hit turns into an authorize redirect
//! 2. The simulated server callback exchanges the code for tokens
//! 3. The user profile is fetched and served from the session
//! 4. The tokens are refreshed in place
//! 5. Logout clears the session and builds the provider redirect
//!
//! # Running
//!
//! ```bash
//! cargo run --example login_roundtrip
//! ```
//!
//! Enable debug logging to watch each flow step:
//! ```bash
//! RUST_LOG=authflow=debug cargo run --example login_roundtrip
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authflow::{
    AuthorizationClient, Config, HttpTransport, IncomingRequest, LogoutOptions, SessionHandle,
    SessionStore, UserOutcome,
};

/// Mounts the three endpoints the flow touches: the scope catalog, the
/// token endpoint, and the user-info endpoint.
async fn mount_authorization_server(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/1.0/scopes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["read:reports", "write:reports"])),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "demo-access-token",
            "refresh_token": "demo-refresh-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "demo-access-token-2",
            "expires_in": 7200
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "user-42",
                "email": "anna@example.com",
                "initials": "A.",
                "first_name": "Anna",
                "last_name_prefix": "van",
                "last_name": "Dam"
            }
        })))
        .mount(server)
        .await;
}

/// Builds the callback request the browser would deliver after the server
/// redirected back to the application.
fn simulate_server_callback(authorize_url: &Url) -> IncomingRequest {
    let state = authorize_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string());

    let mut callback = Url::parse("https://app.example.com/callback").expect("valid callback URL");
    {
        let mut pairs = callback.query_pairs_mut();
        pairs.append_pair("code", "demo-authorization-code");
        if let Some(token) = &state {
            pairs.append_pair("state", token);
        }
    }
    IncomingRequest::from_url(callback.as_str()).expect("valid callback request")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("authflow=info".parse().unwrap()),
        )
        .init();

    println!("Starting the embedded authorization server...");
    let server = MockServer::start().await;
    mount_authorization_server(&server).await;

    // Point every route at the embedded server instead of https://{domain}.
    let mut config = Config::new(
        "auth.example.com",
        "demo-client",
        "demo-secret",
        "https://app.example.com/callback",
    );
    config.base_url = Some(server.uri());

    let session: SessionHandle = Arc::new(RwLock::new(HashMap::new()));
    let mut client = AuthorizationClient::new(
        config,
        Box::new(SessionStore::new(Arc::clone(&session))),
        Box::new(HttpTransport::new()),
    )?;

    // Step 1: an anonymous page hit becomes an authorize redirect.
    let page = IncomingRequest::new("https", "app.example.com", "/reports");
    println!("\n[1] GET {} (anonymous)", page.current_url());
    let authorize = client
        .login(&["read:reports"], &page, None)
        .await?
        .expect("anonymous login redirects");
    println!("    -> Location: {}", authorize.location());

    // Step 2: the authorization server calls back with a code.
    let callback = simulate_server_callback(authorize.url());
    println!("\n[2] GET {} (server callback)", callback.current_url());
    let resume = client
        .callback(&callback)
        .await?
        .expect("the flow resumes where it started");
    println!("    -> Location: {}", resume.location());
    println!("    logged in: {}", client.is_logged_in());
    println!("    granted scopes: {}", client.scopes().join(" "));

    // Step 3: the resumed page reads the user profile.
    println!("\n[3] GET {} (authenticated)", page.current_url());
    match client.user(&page).await? {
        UserOutcome::Profile(profile) => {
            println!("    user id: {}", profile.id());
            println!("    full name: {}", profile.full_name());
            println!("    formal name: {}", profile.formal_name());
        }
        UserOutcome::Redirect(redirect) => {
            println!("    -> Location: {}", redirect.location());
        }
    }

    // Step 4: refresh the tokens in place.
    println!("\n[4] refreshing tokens");
    client.refresh(&page).await?;
    println!(
        "    access token: {}",
        client.access_token().unwrap_or_default()
    );

    // Step 5: log out and hand the browser to the provider.
    println!("\n[5] logging out");
    let goodbye = client.logout(&page, LogoutOptions::new().federated()).await?;
    println!("    -> Location: {}", goodbye.location());
    println!("    logged in: {}", client.is_logged_in());

    let leftover: Vec<String> = session
        .read()
        .expect("session lock")
        .keys()
        .cloned()
        .collect();
    println!("    session keys left behind: {:?}", leftover);

    Ok(())
}
