//! WebSocket layer: session lifecycle, message routing, subscriptions.
//!
//! The streaming endpoint at `/api/v1/streaming` upgrades a client
//! connection into a long-lived bidirectional channel carrying stream
//! subscriptions inbound and timeline update events outbound.

pub mod handler;
pub mod messages;
pub mod sender;
pub mod session;
pub mod subscription;
