//! Authorization server route resolution
//!
//! Logical endpoint names are a fixed enum; `RouteTable` resolves each of
//! them to an absolute URL exactly once, at construction, by substituting
//! the configured `domain` and `version` into the server's published path
//! templates. The table is immutable afterwards.

use crate::config::Config;
use crate::error::{AuthflowError, Result};
use url::Url;

/// Logical endpoint on the authorization server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Base for authenticated resource calls
    Api,
    /// Authorization redirect target
    Authorize,
    /// Provider logout redirect target
    Logout,
    /// Authorization-code exchange endpoint
    Token,
    /// Token refresh endpoint (shares the token path)
    Refresh,
    /// Proactive token liveness check
    Verify,
    /// Authenticated user profile
    UserInfo,
    /// Published scope catalog
    Scopes,
}

impl Route {
    /// All routes, in table order
    pub fn all() -> [Route; 8] {
        [
            Route::Api,
            Route::Authorize,
            Route::Logout,
            Route::Token,
            Route::Refresh,
            Route::Verify,
            Route::UserInfo,
            Route::Scopes,
        ]
    }
}

/// Resolved endpoint URLs for one authorization server
///
/// Built from a validated [`Config`]; every [`Route`] variant resolves, so
/// lookups are total and infallible.
#[derive(Debug, Clone)]
pub struct RouteTable {
    api: Url,
    authorize: Url,
    logout: Url,
    token: Url,
    refresh: Url,
    verify: Url,
    user_info: Url,
    scopes: Url,
}

impl RouteTable {
    /// Resolve the route table from configuration
    ///
    /// Routes resolve against `https://{domain}`, or against
    /// `Config::base_url` when set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the domain/version combination
    /// does not form valid URLs
    pub fn new(config: &Config) -> Result<Self> {
        let base = match &config.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", config.domain),
        };
        let version = &config.version;

        Ok(Self {
            api: parse_route(&format!("{}/api/{}", base, version))?,
            authorize: parse_route(&format!("{}/authorize", base))?,
            logout: parse_route(&format!("{}/logout", base))?,
            token: parse_route(&format!("{}/token", base))?,
            refresh: parse_route(&format!("{}/token", base))?,
            verify: parse_route(&format!("{}/api/{}/verify", base, version))?,
            user_info: parse_route(&format!("{}/api/{}/me", base, version))?,
            scopes: parse_route(&format!("{}/api/{}/scopes", base, version))?,
        })
    }

    /// Look up the resolved URL for a route
    pub fn url(&self, route: Route) -> &Url {
        match route {
            Route::Api => &self.api,
            Route::Authorize => &self.authorize,
            Route::Logout => &self.logout,
            Route::Token => &self.token,
            Route::Refresh => &self.refresh,
            Route::Verify => &self.verify,
            Route::UserInfo => &self.user_info,
            Route::Scopes => &self.scopes,
        }
    }
}

fn parse_route(raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|e| AuthflowError::Configuration(format!("Invalid route URL {}: {}", raw, e)).into())
}
