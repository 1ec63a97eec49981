use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::OAuthError;

const STATE_BYTES: usize = 24;

/// Opaque `state` value echoed back by the provider on redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfState(String);

impl CsrfState {
    pub fn generate() -> Result<Self, OAuthError> {
        let mut bytes = [0u8; STATE_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| OAuthError::OsRng {
                message: err.to_string(),
            })?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fails with `StateMismatch` unless `received` is present and equal.
    pub fn verify(&self, received: Option<&str>) -> Result<(), OAuthError> {
        match received {
            Some(value) if value == self.0 => Ok(()),
            other => Err(OAuthError::StateMismatch {
                expected: self.0.clone(),
                received: other.unwrap_or_default().to_string(),
            }),
        }
    }
}
