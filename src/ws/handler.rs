//! Axum WebSocket upgrade handler.
//!
//! The bearer token rides in the handshake as the first negotiated
//! sub-protocol (a convention several streaming clients follow). The
//! handler resolves it to an identity *before* upgrading, so a bad
//! token is rejected with 401 and neither session loop ever starts. On
//! success the accepted sub-protocol is echoed back and the upgraded
//! socket is handed to a [`StreamingSession`].

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::HeaderMap;
use axum::http::header::SEC_WEBSOCKET_PROTOCOL;
use axum::response::{IntoResponse, Response};

use super::session::StreamingSession;
use crate::app_state::AppState;
use crate::error::GatewayError;

/// `GET /api/v1/streaming` — upgrade to a streaming session.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] when the handshake carries no
/// sub-protocol token or the token fails resolution.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, GatewayError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(GatewayError::Unauthorized(
            "missing sub-protocol token".to_string(),
        ));
    };
    let identity = state.token_resolver.resolve_identity(&token).await?;
    tracing::info!(%identity, "streaming session authorized");

    let session = StreamingSession::new(
        identity,
        Arc::clone(&state.timeline),
        state.poll_interval,
    );
    Ok(ws
        .protocols([token])
        .on_upgrade(move |socket| session.run(socket))
        .into_response())
}

/// Extracts the bearer token: the first entry of the requested
/// sub-protocol list.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(SEC_WEBSOCKET_PROTOCOL)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}
