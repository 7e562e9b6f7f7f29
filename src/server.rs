use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::telegram::{decode_first, null_as_default, MessageSender, TelegramClient, Update};
use crate::updates;

const MISSING_PARAMS: &str = "You need to pass chat_id, key and text parameters.";
const WRONG_KEY: &str = "Wrong key.";

#[derive(Clone)]
pub struct AppState {
    /// Shared secret expected on `/api/messages`.
    key: Arc<str>,
    sender: Arc<dyn MessageSender>,
}

impl AppState {
    pub fn new(key: impl Into<Arc<str>>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            key: key.into(),
            sender,
        }
    }
}

/// Request body of `/api/messages`. Missing fields decode as empty and are
/// rejected afterwards with a fixed hint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiMessage {
    #[serde(deserialize_with = "null_as_default")]
    chat_id: String,
    #[serde(deserialize_with = "null_as_default")]
    text: String,
    #[serde(deserialize_with = "null_as_default")]
    key: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", any(handle_message))
        .route("/api/updates", any(handle_update))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(method: Method, uri: axum::http::Uri) -> StatusCode {
    debug!(%method, %uri, "No route");
    StatusCode::NOT_FOUND
}

#[tracing::instrument(name = "api_messages", skip_all, fields(%method))]
async fn handle_message(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let msg: ApiMessage = match decode_first(&body) {
        Ok(m) => m,
        Err(e) => {
            debug!("Rejecting /api/messages body: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    if msg.chat_id.is_empty() || msg.text.is_empty() || msg.key.is_empty() {
        return (StatusCode::BAD_REQUEST, MISSING_PARAMS).into_response();
    }

    if msg.key != *state.key {
        warn!(chat_id = %msg.chat_id, "Refusing /api/messages call with wrong key");
        return (StatusCode::FORBIDDEN, WRONG_KEY).into_response();
    }

    match state.sender.send_message(&msg.chat_id, &msg.text).await {
        Ok(()) => {
            info!(chat_id = %msg.chat_id, "Relayed message");
            StatusCode::OK.into_response()
        }
        Err(e) => {
            error!(chat_id = %msg.chat_id, "Relay failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Webhook target. Telegram only needs to know the update arrived, so the
/// answer is 200 whatever happens to the reply.
#[tracing::instrument(name = "api_updates", skip_all, fields(%method))]
async fn handle_update(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let update: Update = match decode_first(&body) {
        Ok(u) => u,
        Err(e) => {
            debug!("Rejecting /api/updates body: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    updates::process_update(state.sender.as_ref(), &update).await;

    StatusCode::OK.into_response()
}

/// Resolves once `signal` fires. If the signal handler could not be
/// installed the server keeps running until the process is killed.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for Ctrl-C, serving until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let sender = Arc::new(TelegramClient::new(&config.api_url, &config.bot.token));
    let state = AppState::new(config.bot.key.as_str(), sender);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .context("Server error")?;

    Ok(())
}
