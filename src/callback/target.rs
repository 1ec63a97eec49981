use url::Url;

use crate::OAuthError;

/// The socket and path a redirect URI points at.
#[derive(Debug, Clone)]
pub(super) struct RedirectTarget {
    pub(super) host: String,
    pub(super) port: u16,
    pub(super) path: String,
}

impl RedirectTarget {
    pub(super) fn parse(redirect_uri: &str) -> Result<Self, OAuthError> {
        let url = Url::parse(redirect_uri)?;
        if url.scheme() != "http" {
            return Err(OAuthError::InvalidRedirectUri(format!(
                "callback server needs an http redirect uri, got {}",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| OAuthError::InvalidRedirectUri("redirect uri has no host".to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| OAuthError::InvalidRedirectUri("redirect uri has no port".to_string()))?;

        Ok(Self {
            host,
            port,
            path: url.path().to_string(),
        })
    }

    pub(super) fn callback_url(&self, query: &str) -> String {
        let mut url = format!("http://{}:{}{}", self.host, self.port, self.path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}
