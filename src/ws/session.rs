//! Streaming session: one connection's lifetime.
//!
//! A [`StreamingSession`] owns everything scoped to a single upgraded
//! connection and drives its two halves concurrently:
//!
//! - the request reader, which consumes inbound frames and mutates the
//!   subscription registry, and
//! - the event poller, which periodically asks the timeline collaborator
//!   for new items and forwards them through the [`OutboundSender`].
//!
//! Both run under one `tokio::select!` supervision point inside
//! [`StreamingSession::run`]: whichever finishes first (client close,
//! transport error, collaborator failure) cancels the other at its next
//! await checkpoint, and `run` returns only after both have stopped.
//! Nothing outlives the session; no state survives the connection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

use super::messages::{StreamCommand, UPDATE_EVENT, USER_STREAM};
use super::sender::OutboundSender;
use super::subscription::{StreamParams, SubscriptionRegistry};
use crate::auth::Identity;
use crate::error::GatewayError;
use crate::timeline::TimelineService;

/// State shared between the reader and the poller.
///
/// The reader writes the registry while the poller only reads it, and
/// both sides read the active flag, so access goes through synchronized
/// accessors.
#[derive(Debug)]
pub struct SessionState {
    active: AtomicBool,
    subscriptions: RwLock<SubscriptionRegistry>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates an inactive state with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            subscriptions: RwLock::new(SubscriptionRegistry::new()),
        }
    }

    /// Returns `true` while the session is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the session live. Called once, after a successful upgrade.
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Marks the session finished. Idempotent; the outbound sender
    /// refuses to write once this has been called.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Inserts or replaces the subscription for `stream`.
    pub async fn subscribe(&self, stream: String, params: StreamParams) {
        self.subscriptions.write().await.insert(stream, params);
    }

    /// Removes the subscription for `stream`; absence is not an error.
    pub async fn unsubscribe(&self, stream: &str) {
        self.subscriptions.write().await.remove(stream);
    }

    /// Returns `true` if `stream` is currently subscribed.
    pub async fn is_subscribed(&self, stream: &str) -> bool {
        self.subscriptions.read().await.contains(stream)
    }
}

/// Owns one upgraded connection end-to-end.
#[derive(Debug)]
pub struct StreamingSession {
    identity: Identity,
    timeline: Arc<dyn TimelineService>,
    poll_interval: Duration,
    state: Arc<SessionState>,
}

impl StreamingSession {
    /// Creates a session for an already-resolved identity.
    #[must_use]
    pub fn new(
        identity: Identity,
        timeline: Arc<dyn TimelineService>,
        poll_interval: Duration,
    ) -> Self {
        // tokio intervals reject a zero period
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        Self {
            identity,
            timeline,
            poll_interval,
            state: Arc::new(SessionState::new()),
        }
    }

    /// Drives the session until the client disconnects or a fatal error
    /// occurs, then returns with both loops stopped and the session
    /// inactive.
    pub async fn run(self, socket: WebSocket) {
        let (ws_tx, ws_rx) = socket.split();
        let sender = OutboundSender::new(Arc::clone(&self.state), ws_tx);

        self.state.activate();
        let result = tokio::select! {
            res = read_requests(&self.state, ws_rx) => res,
            res = stream_events(
                &self.state,
                &sender,
                self.timeline.as_ref(),
                &self.identity,
                self.poll_interval,
            ) => res,
        };
        self.state.deactivate();

        match result {
            Ok(()) => {
                tracing::debug!(identity = %self.identity, "streaming session closed");
            }
            Err(error) => {
                tracing::warn!(identity = %self.identity, %error, "streaming session terminated");
            }
        }
    }
}

/// Inbound loop: one frame at a time, while the session is active.
///
/// Malformed JSON and unknown command types are logged and discarded —
/// a single bad message never closes the connection. A close frame or
/// end-of-stream exits normally; a transport read error is fatal.
async fn read_requests<F, E>(state: &SessionState, mut frames: F) -> Result<(), GatewayError>
where
    F: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    while state.is_active() {
        match frames.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<StreamCommand>(&text) {
                    Ok(command) => dispatch(state, command).await,
                    Err(error) => {
                        tracing::debug!(%error, frame = text.as_str(), "discarding malformed command");
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            // ping/pong are answered by the transport; binary is ignored
            Some(Ok(_)) => {}
            Some(Err(error)) => return Err(GatewayError::Transport(error.to_string())),
        }
    }
    Ok(())
}

/// Applies one decoded command to the subscription registry.
async fn dispatch(state: &SessionState, command: StreamCommand) {
    match command {
        StreamCommand::Subscribe { stream, params } => {
            tracing::debug!(%stream, "subscribe");
            state.subscribe(stream, params).await;
        }
        StreamCommand::Unsubscribe { stream } => {
            tracing::debug!(%stream, "unsubscribe");
            state.unsubscribe(&stream).await;
        }
    }
}

/// Outbound loop: fixed-cadence change detection and delivery.
///
/// Each cycle, while the session is active and `"user"` is subscribed,
/// queries the timeline for items created after the cursor and forwards
/// them in collaborator order. Other subscribed stream names are
/// accepted but never produce deliveries in the current scope. A query
/// or send failure is fatal to the session.
async fn stream_events<S>(
    state: &SessionState,
    sender: &OutboundSender<S>,
    timeline: &dyn TimelineService,
    identity: &Identity,
    poll_interval: Duration,
) -> Result<(), GatewayError>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: fmt::Display,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; consume it so every cycle
    // below starts with a full interval's wait
    ticker.tick().await;

    let mut cursor = Utc::now();
    while state.is_active() {
        ticker.tick().await;
        if !state.is_active() {
            break;
        }
        if !state.is_subscribed(USER_STREAM).await {
            continue;
        }

        let items = timeline.query_new_items(identity, cursor).await?;
        // next lower bound, captured strictly after the query returns
        let now = Utc::now();
        for item in items {
            sender
                .send(
                    vec![USER_STREAM.to_string()],
                    UPDATE_EVENT,
                    item.to_payload_json()?,
                )
                .await?;
        }
        cursor = now;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::timeline::TimelineItem;
    use crate::ws::messages::StreamEvent;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use futures_channel::mpsc;
    use futures_util::stream;
    use std::sync::Mutex;

    /// Timeline stub that replays scripted responses and records the
    /// `since` bound of every query.
    #[derive(Debug, Default)]
    struct ScriptedTimeline {
        responses: Mutex<Vec<Result<Vec<TimelineItem>, GatewayError>>>,
        since_seen: Mutex<Vec<DateTime<Utc>>>,
    }

    impl ScriptedTimeline {
        fn with_responses(responses: Vec<Result<Vec<TimelineItem>, GatewayError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                since_seen: Mutex::new(Vec::new()),
            }
        }

        fn query_count(&self) -> usize {
            self.since_seen.lock().map(|seen| seen.len()).unwrap_or(0)
        }

        fn since_values(&self) -> Vec<DateTime<Utc>> {
            self.since_seen
                .lock()
                .map(|seen| seen.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl TimelineService for ScriptedTimeline {
        async fn query_new_items(
            &self,
            _identity: &Identity,
            since: DateTime<Utc>,
        ) -> Result<Vec<TimelineItem>, GatewayError> {
            if let Ok(mut seen) = self.since_seen.lock() {
                seen.push(since);
            }
            match self.responses.lock() {
                Ok(mut responses) if !responses.is_empty() => responses.remove(0),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn text_frame(text: &str) -> Result<Message, axum::Error> {
        Ok(Message::text(text))
    }

    fn wired_sender(
        state: &Arc<SessionState>,
    ) -> (
        OutboundSender<mpsc::UnboundedSender<Message>>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        let (tx, rx) = mpsc::unbounded();
        (OutboundSender::new(Arc::clone(state), tx), rx)
    }

    async fn collect_envelopes(rx: mpsc::UnboundedReceiver<Message>) -> Vec<StreamEvent> {
        rx.filter_map(|message| async move {
            let Message::Text(text) = message else {
                return None;
            };
            serde_json::from_str::<StreamEvent>(&text).ok()
        })
        .collect()
        .await
    }

    #[tokio::test]
    async fn reader_applies_subscribe_and_unsubscribe() {
        let state = SessionState::new();
        state.activate();
        let frames = stream::iter(vec![
            text_frame(r#"{"type": "subscribe", "stream": "user", "list": "7"}"#),
            text_frame(r#"{"type": "subscribe", "stream": "public"}"#),
            text_frame(r#"{"type": "unsubscribe", "stream": "public"}"#),
            Ok(Message::Close(None)),
        ]);

        let result = read_requests(&state, frames).await;
        assert!(result.is_ok());
        assert!(state.is_subscribed("user").await);
        assert!(!state.is_subscribed("public").await);
    }

    #[tokio::test]
    async fn reader_survives_malformed_frames() {
        let state = SessionState::new();
        state.activate();
        let frames = stream::iter(vec![
            text_frame("{not json"),
            text_frame(r#"{"type": "dance", "stream": "user"}"#),
            text_frame(r#"{"type": "subscribe", "stream": "user"}"#),
            Ok(Message::Close(None)),
        ]);

        let result = read_requests(&state, frames).await;
        assert!(result.is_ok());
        assert!(state.is_subscribed("user").await, "valid frame after garbage still applies");
    }

    #[tokio::test]
    async fn reader_treats_unsubscribe_of_unknown_stream_as_noop() {
        let state = SessionState::new();
        state.activate();
        let frames = stream::iter(vec![
            text_frame(r#"{"type": "unsubscribe", "stream": "user"}"#),
            Ok(Message::Close(None)),
        ]);

        let result = read_requests(&state, frames).await;
        assert!(result.is_ok());
        assert!(!state.is_subscribed("user").await);
    }

    #[tokio::test]
    async fn reader_exits_immediately_when_inactive() {
        let state = SessionState::new();
        let frames = stream::pending::<Result<Message, axum::Error>>();

        let result = read_requests(&state, frames).await;
        assert!(result.is_ok(), "inactive session never waits for frames");
    }

    #[tokio::test]
    async fn reader_propagates_transport_errors() {
        let state = SessionState::new();
        state.activate();
        let frames = stream::iter(vec![Err::<Message, _>(axum::Error::new(
            std::io::Error::other("reset"),
        ))]);

        let result = read_requests(&state, frames).await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn poller_delivers_new_items_once() {
        let state = Arc::new(SessionState::new());
        state.activate();
        state.subscribe("user".to_string(), StreamParams::new()).await;
        let (sender, rx) = wired_sender(&state);
        let identity = Identity::new("alice");
        let item = TimelineItem::new(serde_json::json!({"content": "hello"}));
        let timeline = ScriptedTimeline::with_responses(vec![Ok(vec![item])]);

        let run = tokio::time::timeout(
            Duration::from_secs(30),
            stream_events(
                &state,
                &sender,
                &timeline,
                &identity,
                Duration::from_secs(5),
            ),
        )
        .await;
        assert!(run.is_err(), "poller keeps cycling until cancelled");
        drop(sender);

        let envelopes = collect_envelopes(rx).await;
        assert_eq!(envelopes.len(), 1, "the item is delivered exactly once");
        let Some(envelope) = envelopes.first() else {
            panic!("missing envelope");
        };
        assert_eq!(envelope.stream, vec!["user".to_string()]);
        assert_eq!(envelope.event, "update");
        assert_eq!(envelope.payload, r#"{"content":"hello"}"#);

        assert!(timeline.query_count() > 1, "cycles continue after delivery");
    }

    #[tokio::test(start_paused = true)]
    async fn poller_cursor_never_goes_backwards() {
        let state = Arc::new(SessionState::new());
        state.activate();
        state.subscribe("user".to_string(), StreamParams::new()).await;
        let (sender, _rx) = wired_sender(&state);
        let identity = Identity::new("alice");
        let timeline = ScriptedTimeline::default();

        let run = tokio::time::timeout(
            Duration::from_secs(30),
            stream_events(
                &state,
                &sender,
                &timeline,
                &identity,
                Duration::from_secs(5),
            ),
        )
        .await;
        assert!(run.is_err());

        let since = timeline.since_values();
        assert!(since.len() > 2);
        assert!(
            since.windows(2).all(|pair| match pair {
                [previous, next] => previous <= next,
                _ => true,
            }),
            "cursor must be non-decreasing even with zero items found"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poller_never_queries_without_user_subscription() {
        let state = Arc::new(SessionState::new());
        state.activate();
        state
            .subscribe("public".to_string(), StreamParams::new())
            .await;
        let (sender, mut rx) = wired_sender(&state);
        let identity = Identity::new("alice");
        let timeline = ScriptedTimeline::with_responses(vec![Ok(vec![TimelineItem::new(
            serde_json::json!({"content": "unseen"}),
        )])]);

        let run = tokio::time::timeout(
            Duration::from_secs(30),
            stream_events(
                &state,
                &sender,
                &timeline,
                &identity,
                Duration::from_secs(5),
            ),
        )
        .await;
        assert!(run.is_err());

        assert_eq!(timeline.query_count(), 0);
        assert!(rx.try_next().is_err(), "no frame without a user subscription");
    }

    #[tokio::test(start_paused = true)]
    async fn poller_stops_at_next_checkpoint_after_deactivation() {
        let state = Arc::new(SessionState::new());
        state.activate();
        state.subscribe("user".to_string(), StreamParams::new()).await;
        let (sender, rx) = wired_sender(&state);
        let identity = Identity::new("alice");
        let timeline = ScriptedTimeline::default();

        let (run, ()) = tokio::join!(
            stream_events(
                &state,
                &sender,
                &timeline,
                &identity,
                Duration::from_secs(5),
            ),
            async {
                tokio::time::sleep(Duration::from_secs(12)).await;
                state.deactivate();
            }
        );
        assert!(run.is_ok(), "deactivation ends the loop normally");
        drop(sender);
        assert!(collect_envelopes(rx).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn poller_treats_collaborator_failure_as_fatal() {
        let state = Arc::new(SessionState::new());
        state.activate();
        state.subscribe("user".to_string(), StreamParams::new()).await;
        let (sender, _rx) = wired_sender(&state);
        let identity = Identity::new("alice");
        let timeline = ScriptedTimeline::with_responses(vec![Err(GatewayError::Timeline(
            "collaborator down".to_string(),
        ))]);

        let result = stream_events(
            &state,
            &sender,
            &timeline,
            &identity,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(GatewayError::Timeline(_))));
    }
}
