//! Authorization-code flow state machine
//!
//! [`AuthorizationClient`] orchestrates the full browser flow against one
//! authorization server: building the authorize redirect, dispatching the
//! callback, exchanging the code for tokens, refreshing and verifying
//! tokens, fetching the user profile, and logging out. Session state lives
//! in an injected [`PersistentStore`]; network calls go through an injected
//! [`Transport`]; every operation that ends in a browser redirect returns a
//! [`Redirect`] value for the host to emit.
//!
//! The session state is implicit in the store: no access token means
//! anonymous, a token with a future `expires_at` means authenticated, a
//! token with an elapsed `expires_at` means expired. `is_logged_in` is the
//! lazy test; `verify` is the proactive one.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{Config, ResponseMode};
use crate::error::{AuthflowError, Result};
use crate::profile::UserProfile;
use crate::redirect::Redirect;
use crate::request::IncomingRequest;
use crate::routes::{Route, RouteTable};
use crate::state::TransferState;
use crate::store::{keys, PersistentStore};
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Refresh statuses that carry a (possibly partial) token payload.
const REFRESH_OK: [u16; 3] = [200, 201, 204];

/// Most recent rate-limit headers observed on any server response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Value of `X-RateLimit-Limit`
    pub limit: u64,
    /// Value of `X-RateLimit-Remaining`
    pub remaining: u64,
}

/// Options for [`AuthorizationClient::logout`]
#[derive(Debug, Clone, Default)]
pub struct LogoutOptions {
    /// URL to resume at after logout; the current request URL when absent
    pub return_to: Option<String>,
    /// Also terminate the user's single-sign-on session server-side
    pub federated: bool,
    /// Extra query parameters forwarded to the logout endpoint
    pub extra_params: Vec<(String, String)>,
}

impl LogoutOptions {
    /// Options with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume at `url` after logout instead of the current request URL
    pub fn with_return_to(mut self, url: impl Into<String>) -> Self {
        self.return_to = Some(url.into());
        self
    }

    /// Request federated logout
    pub fn federated(mut self) -> Self {
        self.federated = true;
        self
    }

    /// Forward one extra query parameter to the logout endpoint
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }
}

/// Result of [`AuthorizationClient::user`]
#[derive(Debug, Clone, PartialEq)]
pub enum UserOutcome {
    /// The authenticated user's profile
    Profile(UserProfile),
    /// The caller must emit this redirect first (login or session reset)
    Redirect(Redirect),
}

/// Token payload returned by the authorization-code exchange.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Token payload returned by a refresh; every field is optional and absent
/// fields leave the stored value untouched.
#[derive(Debug, Deserialize, Default)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// OAuth2 authorization-code client for one authorization server
///
/// One instance serves one inbound request/response cycle; it is not meant
/// to be shared across concurrent requests. The injected store carries the
/// durable session; the instance itself only holds transient transfer
/// state and rate-limit bookkeeping.
///
/// # Examples
///
/// ```
/// use authflow::{AuthorizationClient, Config, HttpTransport, MemoryStore};
///
/// let config = Config::new(
///     "auth.example.com",
///     "client-1",
///     "secret-1",
///     "https://app.example.com/callback",
/// );
/// let client = AuthorizationClient::new(
///     config,
///     Box::new(MemoryStore::new()),
///     Box::new(HttpTransport::new()),
/// )
/// .expect("valid configuration");
/// assert!(!client.is_logged_in());
/// ```
#[derive(Debug)]
pub struct AuthorizationClient {
    config: Config,
    routes: RouteTable,
    store: Box<dyn PersistentStore>,
    transport: Box<dyn Transport>,
    state: TransferState,
    rate_limit: Option<RateLimit>,
}

impl AuthorizationClient {
    /// Create a client over the given store and transport
    ///
    /// Validates the configuration and resolves the route table once.
    /// Performs no network I/O; hosts holding an existing session should
    /// call [`verify`](Self::verify) right after construction.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when required fields are missing or
    /// `domain` carries a URI scheme
    pub fn new(
        config: Config,
        store: Box<dyn PersistentStore>,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let routes = RouteTable::new(&config)?;

        Ok(Self {
            config,
            routes,
            store,
            transport,
            state: TransferState::new(),
            rate_limit: None,
        })
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resolved route table
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The stored access token, when present and non-empty
    pub fn access_token(&self) -> Option<String> {
        self.stored_string(keys::ACCESS_TOKEN)
    }

    /// The stored refresh token, when present and non-empty
    pub fn refresh_token(&self) -> Option<String> {
        self.stored_string(keys::REFRESH_TOKEN)
    }

    /// Scopes granted to this session
    pub fn scopes(&self) -> Vec<String> {
        match self.store.get(keys::SCOPES, json!([])) {
            Value::Array(scopes) => scopes
                .into_iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Most recent rate-limit headers observed on any server response
    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit
    }

    /// Whether the session is currently authenticated
    ///
    /// True only when an access token is stored and its expiry has not
    /// elapsed. An expired or anonymous session yields false.
    pub fn is_logged_in(&self) -> bool {
        let has_token = self.access_token().is_some();
        let expires_at = self
            .store
            .get(keys::EXPIRES_AT, json!(0))
            .as_i64()
            .unwrap_or(0);
        has_token && expires_at >= chrono::Utc::now().timestamp()
    }

    // -------------------------------------------------------------------
    // Flow operations
    // -------------------------------------------------------------------

    /// Start the authorization-code flow
    ///
    /// No-op (returns `None`) when the session is already authenticated.
    /// Otherwise reconciles the requested scopes against the server's
    /// published catalog, records where to resume, and returns the redirect
    /// to the authorize endpoint.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Scopes to request on top of those already granted
    /// * `request` - The inbound request, used for the default `return_to`
    /// * `return_to` - Overrides the URL to resume at after the flow
    ///
    /// # Errors
    ///
    /// Returns an error when the scope-catalog fetch fails at the
    /// transport level
    pub async fn login(
        &mut self,
        scopes: &[&str],
        request: &IncomingRequest,
        return_to: Option<&str>,
    ) -> Result<Option<Redirect>> {
        if self.is_logged_in() {
            debug!("login requested but session is already authenticated");
            return Ok(None);
        }

        let effective = self.set_authorization_scopes(scopes).await?;

        let resume_at = match return_to {
            Some(url) => url.to_string(),
            None => request.current_url(),
        };
        self.state.set_return_to(&resume_at);

        let mut redirect = Redirect::to(self.routes.url(Route::Authorize).as_str())?
            .with_param("client_id", &self.config.client_id)
            .with_param("redirect_uri", &self.config.redirect_uri)
            .with_param("response_type", &self.config.response_type)
            .with_param("scope", &effective.join(" "));
        if let Some(token) = self.state.encode() {
            redirect = redirect.with_param("state", &token);
        }

        info!(scopes = %effective.join(" "), "redirecting to authorization endpoint");
        Ok(Some(redirect))
    }

    /// Dispatch an authorization-server callback
    ///
    /// Handles, in order: `action=logout` (clear the session and resume),
    /// `action=token` (force a token exchange), an extractable
    /// authorization `code` (normal exchange), or nothing (no-op). An
    /// `error` parameter on the request surfaces as an error before any
    /// exchange is attempted.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized-scope error for `error=invalid_scope`, a
    /// server error for any other `error` value, and an unauthorized error
    /// when the token exchange is rejected
    pub async fn callback(&mut self, request: &IncomingRequest) -> Result<Option<Redirect>> {
        let echoed = TransferState::from_request(request);
        self.state.merge(echoed.into_entries());

        match request.query("action") {
            Some("logout") => {
                let target = self
                    .state
                    .return_to()
                    .unwrap_or_else(|| request.current_url());
                self.store.flush();
                info!("session cleared via logout action");
                return Ok(Some(Redirect::to(&target)?));
            }
            Some("token") => {
                let code = self.authorization_code(request).await?.unwrap_or_default();
                return self.exchange_code(&code, request).await;
            }
            _ => {}
        }

        match self.authorization_code(request).await? {
            Some(code) => self.exchange_code(&code, request).await,
            None => Ok(None),
        }
    }

    /// Extract the authorization code from a callback request
    ///
    /// Reads `code` from the query string or the form body depending on
    /// the configured response mode. Returns `None` when no code is
    /// present.
    ///
    /// # Errors
    ///
    /// Surfaces a callback `error` parameter: `invalid_scope` becomes an
    /// unauthorized-scope error listing the scopes that differ from the
    /// published catalog; anything else becomes a server error
    pub async fn authorization_code(
        &mut self,
        request: &IncomingRequest,
    ) -> Result<Option<String>> {
        let mode = self.config.response_mode;
        let param = |key: &str| match mode {
            ResponseMode::Query => request.query(key),
            ResponseMode::FormPost => request.form(key),
        };

        if let Some(error) = param("error") {
            let error = error.to_string();
            return Err(self.callback_error(&error).await);
        }

        Ok(param("code")
            .filter(|code| !code.is_empty())
            .map(str::to_string))
    }

    /// Refresh the session's tokens
    ///
    /// With both an access and a refresh token stored, posts a refresh
    /// grant and applies whichever token fields the response carries;
    /// a rejected refresh cascades into [`logout`](Self::logout) and
    /// returns its redirect. With a session but no refresh token this is a
    /// no-op. With no session at all it falls back to
    /// [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns an error when the refresh request fails at the transport
    /// level
    pub async fn refresh(&mut self, request: &IncomingRequest) -> Result<Option<Redirect>> {
        let refresh_token = match (self.access_token(), self.refresh_token()) {
            (Some(_), Some(token)) => token,
            (Some(_), None) => {
                debug!("refresh requested but no refresh token is stored");
                return Ok(None);
            }
            (None, _) => {
                debug!("refresh requested without a session, starting login");
                return self.login(&[], request, None).await;
            }
        };

        let form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
            ("scope".to_string(), self.scopes().join(" ")),
        ];
        let url = self.routes.url(Route::Refresh).clone();
        let response = self
            .send_recorded(TransportRequest::post_form(url, form))
            .await?;

        if !REFRESH_OK.contains(&response.status) {
            warn!(status = response.status, "token refresh rejected, clearing session");
            let redirect = self.logout(request, LogoutOptions::new()).await?;
            return Ok(Some(redirect));
        }

        let payload: RefreshResponse = response.json().map_or_else(RefreshResponse::default, |body| {
            serde_json::from_value(body).unwrap_or_default()
        });
        self.apply_refresh(payload);
        debug!("session tokens refreshed");
        Ok(None)
    }

    /// Proactively check that the stored token is still accepted
    ///
    /// No-op without a stored access token. A non-200 from the verify
    /// endpoint triggers [`refresh`](Self::refresh); the lazy expiry check
    /// in [`is_logged_in`](Self::is_logged_in) stays untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the verify request fails at the transport
    /// level
    pub async fn verify(&mut self, request: &IncomingRequest) -> Result<Option<Redirect>> {
        let token = match self.access_token() {
            Some(token) => token,
            None => return Ok(None),
        };

        let url = self.routes.url(Route::Verify).clone();
        let response = self
            .send_recorded(TransportRequest::get(url).with_bearer(token))
            .await?;

        if response.status == 200 {
            debug!("token verified");
            return Ok(None);
        }

        warn!(status = response.status, "token verification failed, refreshing");
        self.refresh(request).await
    }

    /// The authenticated user's profile
    ///
    /// Delegates to [`login`](Self::login) when the session is not
    /// authenticated. Otherwise serves the cached profile, or fetches it
    /// from the user-info endpoint: a 401 is retried once after a refresh,
    /// and a 401 on the retry means the session cannot be recovered.
    ///
    /// # Errors
    ///
    /// Returns a session-unrecoverable error when a refreshed token is
    /// still rejected, or a transport error when a fetch fails outright
    pub async fn user(&mut self, request: &IncomingRequest) -> Result<UserOutcome> {
        if !self.is_logged_in() {
            if let Some(redirect) = self.login(&[], request, None).await? {
                return Ok(UserOutcome::Redirect(redirect));
            }
        }

        if let Value::Object(cached) = self.store.get(keys::USER_INFO, Value::Null) {
            if !cached.is_empty() {
                debug!("serving cached user profile");
                return Ok(UserOutcome::Profile(UserProfile::new(Value::Object(cached))));
            }
        }

        let response = self.fetch_user_info().await?;
        match response.status {
            200 => Ok(UserOutcome::Profile(self.cache_profile(&response)?)),
            401 => {
                warn!("user info fetch returned 401, attempting refresh");
                if let Some(redirect) = self.refresh(request).await? {
                    return Ok(UserOutcome::Redirect(redirect));
                }

                let retry = self.fetch_user_info().await?;
                match retry.status {
                    200 => Ok(UserOutcome::Profile(self.cache_profile(&retry)?)),
                    401 => Err(AuthflowError::SessionUnrecoverable(
                        "user info fetch returned 401 after a token refresh".to_string(),
                    )
                    .into()),
                    status => {
                        warn!(status, "unexpected user info status after refresh");
                        Ok(UserOutcome::Profile(UserProfile::default()))
                    }
                }
            }
            status => {
                warn!(status, "unexpected user info status");
                Ok(UserOutcome::Profile(UserProfile::default()))
            }
        }
    }

    /// End the session
    ///
    /// Records where to resume, clears every persisted session key, and
    /// returns the redirect to the provider's logout endpoint. Federated
    /// logout additionally asks the server to terminate the user's
    /// single-sign-on session everywhere.
    ///
    /// # Errors
    ///
    /// Returns an error when the logout redirect URL cannot be built
    pub async fn logout(
        &mut self,
        request: &IncomingRequest,
        options: LogoutOptions,
    ) -> Result<Redirect> {
        let resume_at = options
            .return_to
            .unwrap_or_else(|| request.current_url());
        self.state.set_return_to(&resume_at);

        self.store.flush();

        let mut redirect = Redirect::to(self.routes.url(Route::Logout).as_str())?
            .with_param("client_id", &self.config.client_id);
        if let Some(token) = self.state.encode() {
            redirect = redirect.with_param("state", &token);
        }
        if options.federated {
            redirect = redirect.with_param("federated", "true");
        }
        for (key, value) in &options.extra_params {
            redirect = redirect.with_param(key, value);
        }

        info!(federated = options.federated, "logged out");
        Ok(redirect)
    }

    /// Reconcile and persist the session's authorization scopes
    ///
    /// Effective scopes are the union of stored and requested scopes,
    /// minus any requested scope missing from the server's published
    /// catalog (dropped silently). Stored scopes outside the catalog
    /// survive unless they were also requested.
    ///
    /// # Errors
    ///
    /// Returns an error when the catalog fetch fails at the transport
    /// level
    pub async fn set_authorization_scopes(&mut self, requested: &[&str]) -> Result<Vec<String>> {
        let catalog = self.fetch_scope_catalog().await?;

        let mut merged: Vec<String> = self.scopes();
        for scope in requested {
            if !merged.iter().any(|s| s == scope) {
                merged.push(scope.to_string());
            }
        }

        let dropped: Vec<&str> = requested
            .iter()
            .filter(|scope| !catalog.iter().any(|c| c == *scope))
            .copied()
            .collect();
        if !dropped.is_empty() {
            debug!(dropped = %dropped.join(" "), "requested scopes missing from catalog");
        }

        let effective: Vec<String> = merged
            .into_iter()
            .filter(|scope| !dropped.iter().any(|d| d == scope))
            .collect();

        self.store.set(keys::SCOPES, json!(effective));
        Ok(effective)
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    /// Exchange an authorization code for tokens.
    ///
    /// A 200 persists the token payload; a status above 400 is an
    /// unauthorized error carrying the server's `message` field when it
    /// has one. Other statuses persist nothing. Either non-error outcome
    /// ends in a redirect to the transfer state's `return_to`, when set.
    async fn exchange_code(
        &mut self,
        code: &str,
        request: &IncomingRequest,
    ) -> Result<Option<Redirect>> {
        let form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
            ("code".to_string(), code.to_string()),
            (
                "state".to_string(),
                request.query("state").unwrap_or_default().to_string(),
            ),
        ];

        let url = self.routes.url(Route::Token).clone();
        let response = self
            .send_recorded(TransportRequest::post_form(url, form))
            .await?;

        if response.status == 200 {
            let token: TokenResponse = serde_json::from_str(&response.body)?;
            self.persist_tokens(token);
            info!("session established");
        } else if response.status > 400 {
            return Err(self.unauthorized(&response));
        } else {
            warn!(status = response.status, "token exchange returned no tokens");
        }

        match self.state.return_to() {
            Some(target) => Ok(Some(Redirect::to(&target)?)),
            None => Ok(None),
        }
    }

    /// Build the error for a rejected token exchange.
    fn unauthorized(&self, response: &TransportResponse) -> anyhow::Error {
        let message = response
            .json()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status_line(response.status));
        warn!(status = response.status, %message, "token exchange rejected");
        AuthflowError::Unauthorized(message).into()
    }

    /// Classify a callback `error` parameter.
    async fn callback_error(&mut self, error: &str) -> anyhow::Error {
        if error != "invalid_scope" {
            warn!(%error, "callback reported a server error");
            return AuthflowError::Server(error.to_string()).into();
        }

        let requested = self.scopes();
        let catalog = match self.fetch_scope_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => return e,
        };

        let mut differing: Vec<String> = requested
            .iter()
            .filter(|scope| !catalog.contains(scope))
            .cloned()
            .collect();
        for scope in &catalog {
            if !requested.contains(scope) {
                differing.push(scope.clone());
            }
        }

        warn!(scopes = %differing.join(", "), "callback rejected the requested scopes");
        AuthflowError::UnauthorizedScope {
            scopes: differing.join(", "),
        }
        .into()
    }

    /// Fetch the server's published scope catalog; non-200 yields an
    /// empty catalog.
    async fn fetch_scope_catalog(&mut self) -> Result<Vec<String>> {
        let url = self.routes.url(Route::Scopes).clone();
        let mut transport_request = TransportRequest::get(url);
        if let Some(token) = self.access_token() {
            transport_request = transport_request.with_bearer(token);
        }
        let response = self.send_recorded(transport_request).await?;

        if response.status != 200 {
            warn!(status = response.status, "scope catalog fetch failed");
            return Ok(Vec::new());
        }

        let scopes = response
            .json()
            .map(unwrap_data_envelope)
            .and_then(|body| match body {
                Value::Array(scopes) => Some(
                    scopes
                        .into_iter()
                        .filter_map(|s| s.as_str().map(str::to_string))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        Ok(scopes)
    }

    async fn fetch_user_info(&mut self) -> Result<TransportResponse> {
        let url = self.routes.url(Route::UserInfo).clone();
        let mut transport_request = TransportRequest::get(url);
        if let Some(token) = self.access_token() {
            transport_request = transport_request.with_bearer(token);
        }
        self.send_recorded(transport_request).await
    }

    /// Parse a 200 user-info body and cache it when `persist_user` is on.
    fn cache_profile(&mut self, response: &TransportResponse) -> Result<UserProfile> {
        let body: Value = serde_json::from_str(&response.body)?;
        let profile = unwrap_data_envelope(body);

        if self.config.persist_user {
            self.store.set(keys::USER_INFO, profile.clone());
        }
        debug!("user profile fetched");
        Ok(UserProfile::new(profile))
    }

    fn persist_tokens(&mut self, token: TokenResponse) {
        let expires_at = chrono::Utc::now().timestamp() + token.expires_in.unwrap_or(0);

        self.store
            .set(keys::ACCESS_TOKEN, json!(token.access_token));
        self.store.set(keys::EXPIRES_AT, json!(expires_at));
        if let Some(refresh_token) = token.refresh_token {
            self.store.set(keys::REFRESH_TOKEN, json!(refresh_token));
        }
        if let Some(token_type) = token.token_type {
            self.store.set(keys::TOKEN_TYPE, json!(token_type));
        }
    }

    /// Apply a partial refresh payload; absent fields keep their stored
    /// values.
    fn apply_refresh(&mut self, payload: RefreshResponse) {
        if let Some(access_token) = payload.access_token {
            self.store.set(keys::ACCESS_TOKEN, json!(access_token));
        }
        if let Some(refresh_token) = payload.refresh_token {
            self.store.set(keys::REFRESH_TOKEN, json!(refresh_token));
        }
        if let Some(token_type) = payload.token_type {
            self.store.set(keys::TOKEN_TYPE, json!(token_type));
        }
        if let Some(expires_in) = payload.expires_in {
            let expires_at = chrono::Utc::now().timestamp() + expires_in;
            self.store.set(keys::EXPIRES_AT, json!(expires_at));
        }
    }

    /// Send a request and record any rate-limit headers on the response.
    async fn send_recorded(&mut self, request: TransportRequest) -> Result<TransportResponse> {
        let response = self.transport.send(request).await?;

        let limit = response
            .header("x-ratelimit-limit")
            .and_then(|v| v.parse().ok());
        let remaining = response
            .header("x-ratelimit-remaining")
            .and_then(|v| v.parse().ok());
        if let (Some(limit), Some(remaining)) = (limit, remaining) {
            self.rate_limit = Some(RateLimit { limit, remaining });
        }

        Ok(response)
    }

    fn stored_string(&self, key: &str) -> Option<String> {
        match self.store.get(key, Value::Null) {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Unwrap a top-level `data` envelope, passing other bodies through.
fn unwrap_data_envelope(body: Value) -> Value {
    match body.get("data") {
        Some(data) => data.clone(),
        None => body,
    }
}

fn status_line(status: u16) -> String {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    format!("{} {}", status, reason)
}
