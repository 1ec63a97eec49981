use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::OAuthError;

/// Body of the users endpoint. Its shape belongs to the provider, so it is
/// kept as decoded JSON.
pub type UserProfile = serde_json::Value;

/// Where a client instance is in the code → token flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoCode,
    HaveCodeNoToken,
    HaveToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Reads `code` and `state` from the redirect the provider sent the user
    /// back to. A provider-side `error` takes precedence over a missing code.
    pub fn from_url(callback_url: &str) -> Result<Self, OAuthError> {
        let url = Url::parse(callback_url)?;
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(OAuthError::AuthorizationDenied {
                error,
                description: description.unwrap_or_default(),
            });
        }

        let code = code.ok_or(OAuthError::MissingAuthorizationCode)?;
        Ok(Self { code, state })
    }
}

/// Token endpoint body. Only `access_token` is required; everything else is
/// kept as sent, since providers disagree on the shape of `scope` and friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenResponse {
    /// Granted scopes, whether sent as a JSON array (Twitch) or a
    /// space-delimited string (RFC 6749).
    pub fn scopes(&self) -> Vec<&str> {
        match self.extra.get("scope") {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(serde_json::Value::as_str).collect()
            }
            Some(serde_json::Value::String(scope)) => scope.split_whitespace().collect(),
            _ => Vec::new(),
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.extra.get("refresh_token").and_then(serde_json::Value::as_str)
    }

    pub fn token_type(&self) -> Option<&str> {
        self.extra.get("token_type").and_then(serde_json::Value::as_str)
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.extra.get("expires_in").and_then(serde_json::Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_parses_query_params() {
        let response = AuthorizationResponse::from_url(
            "http://localhost/callback?code=abc123&state=s456&scope=user%3Aread%3Aemail",
        )
        .unwrap();
        assert_eq!(response.code, "abc123");
        assert_eq!(response.state.as_deref(), Some("s456"));
    }

    #[test]
    fn from_url_requires_code() {
        let result = AuthorizationResponse::from_url("http://localhost/callback?state=s456");
        assert!(matches!(result, Err(OAuthError::MissingAuthorizationCode)));
    }

    #[test]
    fn from_url_surfaces_provider_error() {
        let result = AuthorizationResponse::from_url(
            "http://localhost/callback?error=access_denied&error_description=The+user+denied+you+access",
        );
        match result {
            Err(OAuthError::AuthorizationDenied { error, description }) => {
                assert_eq!(error, "access_denied");
                assert_eq!(description, "The user denied you access");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn token_response_accepts_twitch_shape() {
        let json = r#"{
            "access_token": "tok123",
            "expires_in": 14124,
            "refresh_token": "ref456",
            "scope": ["user:read:email"],
            "token_type": "bearer"
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "tok123");
        assert_eq!(token.scopes(), vec!["user:read:email"]);
        assert_eq!(token.expires_in(), Some(14124));
        assert_eq!(token.refresh_token(), Some("ref456"));
        assert_eq!(token.token_type(), Some("bearer"));
    }

    #[test]
    fn token_response_needs_only_access_token() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"tok123"}"#).unwrap();
        assert_eq!(token.access_token, "tok123");
        assert!(token.scopes().is_empty());
        assert!(token.refresh_token().is_none());
    }

    #[test]
    fn token_response_tolerates_loose_optional_fields() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"tok123","scope":"user:read:email bits:read","expires_in":null,"token_type":7}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "tok123");
        assert_eq!(token.scopes(), vec!["user:read:email", "bits:read"]);
        assert_eq!(token.expires_in(), None);
        assert_eq!(token.token_type(), None);

        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"tok123","scope":null}"#).unwrap();
        assert!(token.scopes().is_empty());
    }

    #[test]
    fn token_response_requires_access_token() {
        let result = serde_json::from_str::<TokenResponse>(r#"{"scope":["user:read:email"]}"#);
        assert!(result.is_err());
    }
}
