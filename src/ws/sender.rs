//! Outbound half of the connection: the single send path.
//!
//! Every frame the server writes after the upgrade goes through
//! [`OutboundSender`], which serializes the event envelope and writes it
//! as one text frame. The sink sits behind a mutex so concurrent sends
//! can never interleave mid-frame, and every send checks the session's
//! active flag first — callers need not pre-check.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::Mutex;

use super::messages::StreamEvent;
use super::session::SessionState;
use crate::error::GatewayError;

/// Serializes event envelopes and writes them to the connection.
///
/// Generic over the sink so the session can hand it the write half of a
/// real WebSocket while unit tests hand it a channel.
pub struct OutboundSender<S> {
    state: Arc<SessionState>,
    sink: Mutex<S>,
}

impl<S> fmt::Debug for OutboundSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundSender").finish_non_exhaustive()
    }
}

impl<S> OutboundSender<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: fmt::Display,
{
    /// Creates a sender writing to `sink`, gated by `state`.
    pub fn new(state: Arc<SessionState>, sink: S) -> Self {
        Self {
            state,
            sink: Mutex::new(sink),
        }
    }

    /// Sends one event envelope as a text frame.
    ///
    /// A no-op returning `Ok(())` once the session is inactive.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the write fails; the
    /// session treats this as fatal.
    pub async fn send(
        &self,
        streams: Vec<String>,
        event: &str,
        payload: String,
    ) -> Result<(), GatewayError> {
        if !self.state.is_active() {
            return Ok(());
        }
        let envelope = StreamEvent {
            stream: streams,
            event: event.to_string(),
            payload,
        };
        let json = serde_json::to_string(&envelope)?;
        self.sink
            .lock()
            .await
            .send(Message::text(json))
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))
    }
}
