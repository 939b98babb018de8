//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenResolver;
use crate::timeline::TimelineService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Both collaborators are trait objects: the gateway ships in-memory
/// defaults, deployments plug in their own resolvers and timeline
/// backends.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Bearer-token lookup used during the handshake.
    pub token_resolver: Arc<dyn TokenResolver>,
    /// Timeline query service polled by each session.
    pub timeline: Arc<dyn TimelineService>,
    /// Cadence between poll cycles for every session.
    pub poll_interval: Duration,
}
