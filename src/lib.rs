//! Authflow - OAuth2 authorization-code client library
//!
//! This library drives the full authorization-code flow against a single
//! authorization server: login redirects, callback handling, token
//! exchange, refresh, verification, profile retrieval, and logout. It is
//! framework-agnostic: inbound requests are described with
//! [`IncomingRequest`] values and outbound redirects come back as
//! [`Redirect`] values, so any web stack can host it.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `client`: The authorization-code flow state machine
//! - `config`: Configuration management and validation
//! - `routes`: Authorization server endpoint resolution
//! - `store`: Session persistence behind the `PersistentStore` trait
//! - `transport`: HTTP abstraction behind the `Transport` trait
//! - `state`: Transient state round-tripped via the OAuth `state` parameter
//! - `profile`: Read-only accessors over the fetched user profile
//! - `request` / `redirect`: Framework-agnostic request and redirect values
//! - `error`: Error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use authflow::{
//!     AuthorizationClient, Config, HttpTransport, IncomingRequest, MemoryStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!     let mut client = AuthorizationClient::new(
//!         config,
//!         Box::new(MemoryStore::new()),
//!         Box::new(HttpTransport::new()),
//!     )?;
//!
//!     let request = IncomingRequest::new("https", "app.example.com", "/account");
//!     if let Some(redirect) = client.login(&["read:reports"], &request, None).await? {
//!         println!("Location: {}", redirect.location());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod profile;
pub mod redirect;
pub mod request;
pub mod routes;
pub mod state;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use client::{AuthorizationClient, LogoutOptions, RateLimit, UserOutcome};
pub use config::{Config, ResponseMode};
pub use error::{AuthflowError, Result};
pub use profile::UserProfile;
pub use redirect::Redirect;
pub use request::IncomingRequest;
pub use routes::{Route, RouteTable};
pub use state::TransferState;
pub use store::{MemoryStore, PersistentStore, SessionHandle, SessionStore};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
