//! # timeline-gateway
//!
//! WebSocket streaming gateway for a social-network server.
//!
//! This crate upgrades a client connection into a long-lived bidirectional
//! channel, lets the client subscribe to named event streams (e.g. the
//! `"user"` home timeline), and pushes newly created items as they appear.
//! Identity resolution and timeline computation are delegated to
//! collaborator traits — this service is a coordination layer.
//!
//! ## Architecture
//!
//! ```text
//! Client (WebSocket, bearer token as first sub-protocol)
//!     │
//!     ├── WS Handler (ws/handler)      token → Identity, upgrade
//!     ├── StreamingSession (ws/session)
//!     │       ├── Request Reader      inbound frames → commands
//!     │       └── Event Poller        cursor → timeline → envelopes
//!     │
//!     ├── SubscriptionRegistry (ws/subscription)
//!     ├── OutboundSender (ws/sender)
//!     │
//!     ├── TokenResolver (auth/)       opaque bearer-token lookup
//!     └── TimelineService (timeline/) opaque item query
//! ```

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod timeline;
pub mod ws;
