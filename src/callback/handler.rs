use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{AuthorizationResponse, OAuthError};

use super::target::RedirectTarget;
use super::{ERROR_HTML, SUCCESS_HTML};

pub(super) type CallbackResult = Result<AuthorizationResponse, OAuthError>;
pub(super) type SharedSender = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

#[derive(Clone)]
pub(super) struct CallbackState {
    pub(super) target: RedirectTarget,
    pub(super) result_tx: SharedSender,
}

/// Delivers the first result only; later callbacks are answered but dropped.
pub(super) fn deliver(result_tx: &SharedSender, result: CallbackResult) {
    let sender = result_tx
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(result);
    }
}

pub(super) async fn callback(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let query = query.unwrap_or_default();
    let callback_url = state.target.callback_url(&query);

    match AuthorizationResponse::from_url(&callback_url) {
        Ok(response) => {
            debug!("authorization code received on callback");
            deliver(&state.result_tx, Ok(response));
            (StatusCode::OK, Html(SUCCESS_HTML))
        }
        // Stray hits (favicon prefetch, manual reloads) keep the server waiting.
        Err(OAuthError::MissingAuthorizationCode) => (StatusCode::BAD_REQUEST, Html(ERROR_HTML)),
        Err(error) => {
            warn!(%error, "callback did not carry a usable authorization code");
            deliver(&state.result_tx, Err(error));
            (StatusCode::BAD_REQUEST, Html(ERROR_HTML))
        }
    }
}

pub(super) async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(ERROR_HTML))
}
