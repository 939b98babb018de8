//! WebSocket wire types: inbound commands and the outbound envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stream name carried by home-timeline subscriptions — the only stream
/// the poller currently delivers for.
pub const USER_STREAM: &str = "user";

/// Event kind for newly created timeline items.
pub const UPDATE_EVENT: &str = "update";

/// Commands a client can send, tagged by `"type"`.
///
/// Unknown types and malformed bodies fail deserialization; the request
/// reader logs and discards them without closing the connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamCommand {
    /// Subscribe to a named stream. Any extra fields are kept verbatim
    /// as subscription parameters.
    Subscribe {
        /// Stream name, e.g. `"user"`.
        stream: String,
        /// Auxiliary parameters, forwarded without interpretation.
        #[serde(flatten)]
        params: HashMap<String, serde_json::Value>,
    },
    /// Unsubscribe from a named stream. Unsubscribing a stream that was
    /// never subscribed is a no-op.
    Unsubscribe {
        /// Stream name.
        stream: String,
    },
}

/// Outbound event envelope, one per delivered item.
///
/// `payload` is double-encoded: the item is serialized to JSON and that
/// text is embedded as a JSON string value. Existing streaming clients
/// expect exactly this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Target stream names, in delivery order.
    pub stream: Vec<String>,
    /// Event kind, e.g. `"update"`.
    pub event: String,
    /// JSON-encoded item, itself carried as a string.
    pub payload: String,
}
