use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Router, routing::get};
use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::oneshot;
use tracing::info;

use crate::{AuthorizationResponse, OAuthError};

use super::handler::{CallbackResult, CallbackState, callback, deliver, not_found};
use super::target::RedirectTarget;

/// Listens on the redirect URI's host and port until the provider sends the
/// user back with a code (or an error).
#[derive(Debug, Clone)]
pub struct CallbackServer {
    target: RedirectTarget,
    timeout: Option<Duration>,
}

impl CallbackServer {
    pub fn new(redirect_uri: &str) -> Result<Self, OAuthError> {
        Ok(Self {
            target: RedirectTarget::parse(redirect_uri)?,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Binds eagerly so the socket is ready before the browser is opened.
    pub fn bind(&self) -> Result<TcpListener, OAuthError> {
        let listener = TcpListener::bind((self.target.host.as_str(), self.target.port))?;
        listener.set_nonblocking(true)?;
        Ok(listener)
    }

    pub async fn wait(&self, listener: TcpListener) -> Result<AuthorizationResponse, OAuthError> {
        let (result_tx, result_rx) = oneshot::channel::<CallbackResult>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let result_tx = Arc::new(Mutex::new(Some(result_tx)));

        let state = CallbackState {
            target: self.target.clone(),
            result_tx: result_tx.clone(),
        };
        let app = Router::new()
            .route(&self.target.path, get(callback))
            .fallback(not_found)
            .with_state(state);

        let listener = TokioTcpListener::from_std(listener)?;
        info!(
            host = %self.target.host,
            port = self.target.port,
            path = %self.target.path,
            "waiting for authorization callback"
        );

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let server_handle = tokio::spawn(async move {
            if let Err(err) = server.await {
                deliver(&result_tx, Err(OAuthError::Io(err)));
            }
        });

        let result = self.receive(result_rx).await;

        let _ = shutdown_tx.send(());
        let _ = server_handle.await;
        result
    }

    pub async fn listen_once(&self) -> Result<AuthorizationResponse, OAuthError> {
        let listener = self.bind()?;
        self.wait(listener).await
    }

    async fn receive(
        &self,
        result_rx: oneshot::Receiver<CallbackResult>,
    ) -> Result<AuthorizationResponse, OAuthError> {
        let received = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, result_rx)
                .await
                .map_err(|_| OAuthError::CallbackTimeout { timeout })?,
            None => result_rx.await,
        };
        received.map_err(|_| OAuthError::InvalidResponse {
            message: "callback server stopped before a redirect arrived".to_string(),
            body: String::new(),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn times_out_without_callback() {
        let server = CallbackServer::new("http://127.0.0.1:0/callback")
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let listener = server.bind().unwrap();
        let result = server.wait(listener).await;
        assert!(matches!(result, Err(OAuthError::CallbackTimeout { .. })));
    }
}
