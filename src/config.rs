use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{OAuthError, Scopes, Secret};

pub const AUTHORIZE_URL: &str = "https://id.twitch.tv/oauth2/authorize";
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const USERS_URL: &str = "https://api.twitch.tv/helix/users";

const ENV_CLIENT_ID: &str = "TWITCH_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "TWITCH_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "TWITCH_REDIRECT_URI";
const ENV_TOKEN_URL: &str = "TWITCH_TOKEN_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub users: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize: AUTHORIZE_URL.to_string(),
            token: TOKEN_URL.to_string(),
            users: USERS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: Secret,
    pub redirect_uri: Option<String>,
    pub endpoints: Endpoints,
    pub scopes: Scopes,
    pub timeout: Option<Duration>,
}

impl OAuthClientConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: None,
            endpoints: Endpoints::default(),
            scopes: Scopes::default(),
            timeout: None,
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Scopes) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.endpoints.token = token_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), OAuthError> {
        if self.client_id.trim().is_empty() {
            return Err(OAuthError::configuration("you must provide a client id"));
        }
        if self.client_secret.is_empty() {
            return Err(OAuthError::configuration("you must provide a client secret"));
        }
        Ok(())
    }
}

/// Loose credential input, keyed the way deployments usually store it
/// (`CLIENT_ID`, `CLIENT_SECRET`, `REDIRECT_URI`, `TOKEN_URL`, `SCOPES`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub token_url: Option<String>,
    pub scopes: Option<Scopes>,
}

impl Credentials {
    pub fn from_toml_str(input: &str) -> Result<Self, OAuthError> {
        toml::from_str(input)
            .map_err(|err| OAuthError::configuration(format!("invalid credentials: {err}")))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, OAuthError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            client_id: lookup(ENV_CLIENT_ID),
            client_secret: lookup(ENV_CLIENT_SECRET),
            redirect_uri: lookup(ENV_REDIRECT_URI),
            token_url: lookup(ENV_TOKEN_URL),
            scopes: None,
        }
    }
}

impl TryFrom<Credentials> for OAuthClientConfig {
    type Error = OAuthError;

    fn try_from(credentials: Credentials) -> Result<Self, Self::Error> {
        let Credentials {
            client_id,
            client_secret,
            redirect_uri,
            token_url,
            scopes,
        } = credentials;

        let client_id = client_id
            .ok_or_else(|| OAuthError::configuration("you must provide a client id"))?;
        let client_secret = client_secret
            .ok_or_else(|| OAuthError::configuration("you must provide a client secret"))?;

        let mut config = OAuthClientConfig::new(client_id, client_secret);
        config.validate()?;
        config.redirect_uri = redirect_uri;
        if let Some(token_url) = token_url {
            config.endpoints.token = token_url;
        }
        if let Some(scopes) = scopes {
            config.scopes = scopes;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_client_id() {
        let credentials = Credentials {
            client_secret: Some("xyz".to_string()),
            ..Default::default()
        };
        let result = OAuthClientConfig::try_from(credentials);
        assert!(matches!(result, Err(OAuthError::Configuration(_))));
    }

    #[test]
    fn credentials_require_client_secret() {
        let credentials = Credentials {
            client_id: Some("abc".to_string()),
            ..Default::default()
        };
        let result = OAuthClientConfig::try_from(credentials);
        assert!(matches!(result, Err(OAuthError::Configuration(_))));
    }

    #[test]
    fn minimal_credentials_use_defaults() {
        let credentials = Credentials {
            client_id: Some("abc".to_string()),
            client_secret: Some("xyz".to_string()),
            ..Default::default()
        };
        let config = OAuthClientConfig::try_from(credentials).unwrap();
        assert_eq!(config.scopes.joined(), "user:read:email");
        assert_eq!(config.endpoints, Endpoints::default());
        assert!(config.redirect_uri.is_none());
    }

    #[test]
    fn parses_toml_credentials() {
        let credentials = Credentials::from_toml_str(
            r#"
            CLIENT_ID = "abc"
            CLIENT_SECRET = "xyz"
            REDIRECT_URI = "http://localhost:3000/callback"
            TOKEN_URL = "http://localhost:9999/token"

            [SCOPES]
            "user:read:email" = true
            "bits:read" = false
            "#,
        )
        .unwrap();
        let config = OAuthClientConfig::try_from(credentials).unwrap();
        assert_eq!(
            config.redirect_uri.as_deref(),
            Some("http://localhost:3000/callback")
        );
        assert_eq!(config.endpoints.token, "http://localhost:9999/token");
        assert_eq!(config.endpoints.users, USERS_URL);
        assert!(config.scopes.is_enabled("user:read:email"));
        assert!(!config.scopes.is_enabled("bits:read"));
    }

    #[test]
    fn toml_scope_order_is_kept() {
        let credentials = Credentials::from_toml_str(
            r#"
            CLIENT_ID = "abc"
            CLIENT_SECRET = "xyz"

            [SCOPES]
            "user:read:email" = true
            "bits:read" = true
            "channel:read:subscriptions" = false
            "analytics:read:extensions" = true
            "#,
        )
        .unwrap();
        let config = OAuthClientConfig::try_from(credentials).unwrap();
        assert_eq!(
            config.scopes.joined(),
            "user:read:email+bits:read+analytics:read:extensions"
        );
    }

    #[test]
    fn reads_credentials_from_lookup() {
        let credentials = Credentials::from_lookup(|key| match key {
            ENV_CLIENT_ID => Some("abc".to_string()),
            ENV_CLIENT_SECRET => Some("xyz".to_string()),
            _ => None,
        });
        assert_eq!(credentials.client_id.as_deref(), Some("abc"));
        assert!(credentials.redirect_uri.is_none());
    }

    #[test]
    fn empty_secret_fails_validation() {
        let config = OAuthClientConfig::new("abc", "");
        assert!(matches!(config.validate(), Err(OAuthError::Configuration(_))));
    }
}
