//! Twitch OAuth 2.0 authorization code client.
//!
//! Builds the consent URL, trades the returned code for an access token
//! (once per client) and calls Helix with the token attached. A confidential
//! client: the client secret is required.

#[cfg(feature = "callback-server")]
mod callback;
mod client;
mod config;
mod csrf;
mod error;
mod scope;
mod secret;
mod types;

#[cfg(feature = "callback-server")]
pub use callback::CallbackServer;
pub use client::OAuthClient;
pub use config::{AUTHORIZE_URL, Credentials, Endpoints, OAuthClientConfig, TOKEN_URL, USERS_URL};
pub use csrf::CsrfState;
pub use error::OAuthError;
pub use reqwest::Method;
pub use scope::{SCOPE_SEPARATOR, Scopes};
pub use secret::Secret;
pub use types::{AuthorizationResponse, SessionState, TokenResponse, UserProfile};
