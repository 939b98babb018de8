//! timeline-gateway server entry point.
//!
//! Starts the Axum HTTP server with the streaming WebSocket endpoint.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use timeline_gateway::app_state::AppState;
use timeline_gateway::auth::{Identity, TokenResolver, TokenStore};
use timeline_gateway::config::GatewayConfig;
use timeline_gateway::timeline::{InMemoryTimeline, TimelineService};
use timeline_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting timeline-gateway");

    // Build collaborators: in-memory defaults seeded from configuration
    let token_store = Arc::new(TokenStore::new());
    for (token, handle) in &config.streaming_tokens {
        token_store
            .insert(token.clone(), Identity::new(handle.clone()))
            .await;
    }
    let token_resolver: Arc<dyn TokenResolver> = token_store;
    let timeline: Arc<dyn TimelineService> = Arc::new(InMemoryTimeline::new());

    // Build application state
    let app_state = AppState {
        token_resolver,
        timeline,
        poll_interval: config.poll_interval(),
    };

    // Build router
    let app = Router::new()
        .route("/api/v1/streaming", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
