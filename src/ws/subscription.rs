//! Per-connection subscription registry.
//!
//! Tracks which named streams a client is subscribed to, along with the
//! opaque parameters it passed. Scoped to one connection; destroyed with
//! the session. No threading model of its own — the session wraps it in
//! a lock.

use std::collections::HashMap;

/// Auxiliary subscription parameters, forwarded verbatim from the client.
pub type StreamParams = HashMap<String, serde_json::Value>;

/// The set of stream subscriptions for a single connection.
///
/// At most one subscription per stream name; a later subscribe to the
/// same name fully replaces the parameters.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    streams: HashMap<String, StreamParams>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or fully replaces the subscription for `stream`.
    pub fn insert(&mut self, stream: String, params: StreamParams) {
        self.streams.insert(stream, params);
    }

    /// Removes the subscription for `stream` if present; absence is not
    /// an error.
    pub fn remove(&mut self, stream: &str) {
        self.streams.remove(stream);
    }

    /// Returns `true` if `stream` is currently subscribed.
    #[must_use]
    pub fn contains(&self, stream: &str) -> bool {
        self.streams.contains_key(stream)
    }

    /// Returns the parameters stored for `stream`, if subscribed.
    #[must_use]
    pub fn params(&self, stream: &str) -> Option<&StreamParams> {
        self.streams.get(stream)
    }

    /// Returns the number of subscribed streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
