use std::sync::{PoisonError, RwLock};

use reqwest::{
    Client, Method,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    AuthorizationResponse, CsrfState, OAuthClientConfig, OAuthError, Secret, SessionState,
    TokenResponse, UserProfile,
};

const TOKEN_ACCEPT: &str = "x-www-form-urlencoded";
const HELIX_ACCEPT: &str = "application/vnd.twitchtv.v3+json";
const CLIENT_ID_HEADER: &str = "client-id";

#[derive(Debug)]
pub struct OAuthClient {
    config: OAuthClientConfig,
    http: Client,
    authorization_code: RwLock<Option<Secret>>,
    // Held across the code exchange so concurrent callers wait for one result.
    access_token: Mutex<Option<Secret>>,
}

impl OAuthClient {
    pub fn new(config: OAuthClientConfig) -> Result<Self, OAuthError> {
        config.validate()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::from_parts(config, http))
    }

    pub fn with_http_client(config: OAuthClientConfig, http: Client) -> Result<Self, OAuthError> {
        config.validate()?;
        Ok(Self::from_parts(config, http))
    }

    fn from_parts(config: OAuthClientConfig, http: Client) -> Self {
        Self {
            config,
            http,
            authorization_code: RwLock::new(None),
            access_token: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    /// Consent URL to send the user to. Pure: the same configuration always
    /// yields the same string.
    pub fn authorization_url(&self) -> Result<String, OAuthError> {
        self.build_authorization_url(None)
    }

    pub fn authorization_url_with_state(&self, state: &CsrfState) -> Result<String, OAuthError> {
        self.build_authorization_url(Some(state.as_str()))
    }

    fn build_authorization_url(&self, state: Option<&str>) -> Result<String, OAuthError> {
        let mut url = Url::parse(&self.config.endpoints.authorize)?;
        {
            // Appends to any query already on an overridden endpoint.
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &self.config.client_id);
            if let Some(redirect_uri) = &self.config.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }
            pairs.append_pair("scope", &self.config.scopes.joined());
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.into())
    }

    pub fn set_authorization_code(&self, code: impl Into<String>) {
        let mut slot = self
            .authorization_code
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Secret::new(code));
    }

    /// Stores the code from a parsed redirect after checking its `state`
    /// against the one sent with the consent URL.
    pub fn set_authorization_response(
        &self,
        response: AuthorizationResponse,
        expected_state: Option<&CsrfState>,
    ) -> Result<(), OAuthError> {
        if let Some(expected) = expected_state {
            expected.verify(response.state.as_deref())?;
        }
        self.set_authorization_code(response.code);
        Ok(())
    }

    fn authorization_code(&self) -> Option<Secret> {
        self.authorization_code
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn session_state(&self) -> SessionState {
        if self.access_token.lock().await.is_some() {
            SessionState::HaveToken
        } else if self.authorization_code().is_some() {
            SessionState::HaveCodeNoToken
        } else {
            SessionState::NoCode
        }
    }

    /// Looks up a user by login name, exchanging the stored authorization
    /// code for an access token first if this instance has none yet.
    pub async fn fetch_user(&self, login: &str) -> Result<UserProfile, OAuthError> {
        self.authorized_request(Method::GET, &self.config.endpoints.users, &[("login", login)])
            .await
    }

    /// Authenticated call to any Helix endpoint. GET carries `params` in the
    /// query string; POST and PUT send them form-encoded. Other methods send
    /// no params.
    pub async fn authorized_request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, OAuthError> {
        let token = self.ensure_token().await?;
        let headers = self.authorized_headers(&token)?;

        let mut builder = self.http.request(method.clone(), endpoint).headers(headers);
        if method == Method::POST || method == Method::PUT {
            builder = builder.form(params);
        } else if method == Method::GET && !params.is_empty() {
            builder = builder.query(params);
        }

        debug!(%method, endpoint, "sending authorized request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OAuthError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| OAuthError::InvalidResponse {
            message: err.to_string(),
            body,
        })
    }

    async fn ensure_token(&self) -> Result<Secret, OAuthError> {
        let mut slot = self.access_token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let Some(code) = self.authorization_code() else {
            warn!("no authorization code set; cannot request an access token");
            return Err(OAuthError::MissingAuthorizationCode);
        };

        debug!("no access token, exchanging authorization code");
        match self.exchange_token(&code).await {
            Ok(response) => {
                info!(scopes = ?response.scopes(), "access token acquired");
                let token = Secret::new(response.access_token);
                *slot = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "token exchange failed");
                Err(err)
            }
        }
    }

    async fn exchange_token(&self, code: &Secret) -> Result<TokenResponse, OAuthError> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose()),
            ("code", code.expose()),
            ("grant_type", "authorization_code"),
        ];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            form.push(("redirect_uri", redirect_uri.as_str()));
        }

        let response = self
            .http
            .post(&self.config.endpoints.token)
            .header(ACCEPT, TOKEN_ACCEPT)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OAuthError::TokenExchange {
                message: format!("token endpoint returned {status}"),
                body,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|err| OAuthError::TokenExchange {
                message: format!("invalid token response: {err}"),
                body: body.clone(),
            })?;

        if token.access_token.is_empty() {
            return Err(OAuthError::TokenExchange {
                message: "token response carried an empty access token".to_string(),
                body,
            });
        }

        Ok(token)
    }

    fn authorized_headers(&self, token: &Secret) -> Result<HeaderMap, OAuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(HELIX_ACCEPT));
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            header_value(CLIENT_ID_HEADER, &self.config.client_id)?,
        );

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose())).map_err(
            |_| OAuthError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                value: "Bearer [REDACTED]".to_string(),
            },
        )?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, OAuthError> {
    HeaderValue::from_str(value).map_err(|_| OAuthError::InvalidHeader {
        name: name.to_string(),
        value: value.to_string(),
    })
}
