use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;
use wiremock::MockServer;

use authflow::store::keys;
use authflow::{
    AuthorizationClient, Config, HttpTransport, IncomingRequest, MemoryStore, PersistentStore,
};

/// Configuration whose routes all point at the given mock server.
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::new(
        "auth.example.com",
        "client-1",
        "secret-1",
        "https://app.example.com/callback",
    );
    config.base_url = Some(server.uri());
    config
}

#[allow(dead_code)]
pub fn client_for(server: &MockServer) -> AuthorizationClient {
    client_with_store(config_for(server), MemoryStore::new())
}

#[allow(dead_code)]
pub fn client_with_store(config: Config, store: MemoryStore) -> AuthorizationClient {
    AuthorizationClient::new(config, Box::new(store), Box::new(HttpTransport::new()))
        .expect("failed to build client")
}

/// A store seeded with an unexpired session.
#[allow(dead_code)]
pub fn authenticated_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.set(keys::ACCESS_TOKEN, json!("access-1"));
    store.set(keys::REFRESH_TOKEN, json!("refresh-1"));
    store.set(keys::TOKEN_TYPE, json!("Bearer"));
    store.set(
        keys::EXPIRES_AT,
        json!(chrono::Utc::now().timestamp() + 3600),
    );
    store.set(keys::SCOPES, json!(["read:reports"]));
    store
}

#[allow(dead_code)]
pub fn authenticated_client_for(server: &MockServer) -> AuthorizationClient {
    client_with_store(config_for(server), authenticated_store())
}

/// An ordinary application page request, used where a flow needs the
/// current URL.
#[allow(dead_code)]
pub fn page_request() -> IncomingRequest {
    IncomingRequest::new("https", "app.example.com", "/account")
}

#[allow(dead_code)]
pub fn callback_request(target: &str) -> IncomingRequest {
    IncomingRequest::new("https", "app.example.com", target)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
