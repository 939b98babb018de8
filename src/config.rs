//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Seconds between timeline poll cycles for each streaming session.
    pub poll_interval_secs: u64,

    /// Bearer tokens accepted at startup, as `token=handle` pairs.
    ///
    /// Deployments that resolve tokens elsewhere leave this empty and
    /// plug their own [`crate::auth::TokenResolver`] into the state.
    pub streaming_tokens: Vec<(String, String)>,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let poll_interval_secs = parse_env("POLL_INTERVAL_SECS", 5);

        let streaming_tokens = std::env::var("STREAMING_TOKENS")
            .map(|raw| parse_token_pairs(&raw))
            .unwrap_or_default();

        Ok(Self {
            listen_addr,
            poll_interval_secs,
            streaming_tokens,
        })
    }

    /// Returns the poll cadence as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a comma-separated `token=handle` list, skipping malformed
/// entries.
fn parse_token_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, handle) = pair.split_once('=')?;
            let token = token.trim();
            let handle = handle.trim();
            if token.is_empty() || handle.is_empty() {
                return None;
            }
            Some((token.to_string(), handle.to_string()))
        })
        .collect()
}
