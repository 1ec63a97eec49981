use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid redirect uri: {0}")]
    InvalidRedirectUri(String),

    #[error("invalid header: {name}={value}")]
    InvalidHeader { name: String, value: String },

    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, body: String },

    #[error("token exchange failed: {message}")]
    TokenExchange { message: String, body: String },

    #[error("no authorization code has been set")]
    MissingAuthorizationCode,

    #[error("authorization denied: {error} ({description})")]
    AuthorizationDenied { error: String, description: String },

    #[error("state mismatch (expected={expected}, received={received})")]
    StateMismatch { expected: String, received: String },

    #[cfg(feature = "callback-server")]
    #[error("callback server timed out after {timeout:?}")]
    CallbackTimeout { timeout: std::time::Duration },
}

impl OAuthError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
