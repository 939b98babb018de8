//! Bearer-token authentication seam.
//!
//! The gateway never validates credentials itself: it hands the bearer
//! token carried in the WebSocket handshake to a [`TokenResolver`] and
//! either gets back an [`Identity`] or rejects the connection. The
//! in-memory [`TokenStore`] is the default resolver, suitable for tests
//! and single-node deployments seeded from configuration.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::GatewayError;

/// The resolved principal behind a bearer token.
///
/// Used to scope timeline queries; the gateway treats it as opaque
/// beyond its identifier and display handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable identifier for the account.
    pub id: Uuid,
    /// Human-readable handle, used only for logging.
    pub handle: String,
}

impl Identity {
    /// Creates an identity with a fresh random id.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: handle.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handle)
    }
}

/// Opaque bearer-token lookup.
///
/// Implementations map a token value to an [`Identity`], failing for
/// tokens that are unknown or have been revoked.
#[async_trait]
pub trait TokenResolver: Send + Sync + fmt::Debug {
    /// Resolves a bearer token to the identity it authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] when the token is unknown
    /// or revoked.
    async fn resolve_identity(&self, token: &str) -> Result<Identity, GatewayError>;
}

/// A token's state inside the [`TokenStore`].
#[derive(Debug, Clone)]
struct TokenEntry {
    identity: Identity,
    revoked: bool,
}

/// In-memory token resolver.
///
/// Revocation keeps the entry but marks it unusable, so a revoked token
/// fails resolution the same way an unknown one does.
#[derive(Debug, Default)]
pub struct TokenStore {
    entries: RwLock<HashMap<String, TokenEntry>>,
}

impl TokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for the given identity, replacing any previous
    /// registration of the same token value.
    pub async fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.entries.write().await.insert(
            token.into(),
            TokenEntry {
                identity,
                revoked: false,
            },
        );
    }

    /// Marks a token as revoked. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(token) {
            entry.revoked = true;
        }
    }
}

#[async_trait]
impl TokenResolver for TokenStore {
    async fn resolve_identity(&self, token: &str) -> Result<Identity, GatewayError> {
        let entries = self.entries.read().await;
        match entries.get(token) {
            Some(entry) if !entry.revoked => Ok(entry.identity.clone()),
            Some(_) => Err(GatewayError::Unauthorized("token revoked".to_string())),
            None => Err(GatewayError::Unauthorized("unknown token".to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_resolves() {
        let store = TokenStore::new();
        let identity = Identity::new("alice");
        store.insert("tok-a", identity.clone()).await;

        let resolved = store.resolve_identity("tok-a").await;
        let Ok(resolved) = resolved else {
            panic!("expected resolution to succeed");
        };
        assert_eq!(resolved, identity);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let store = TokenStore::new();
        let result = store.resolve_identity("nope").await;
        assert!(matches!(result, Err(GatewayError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn revoked_token_is_unauthorized() {
        let store = TokenStore::new();
        store.insert("tok-b", Identity::new("bob")).await;
        store.revoke("tok-b").await;

        let result = store.resolve_identity("tok-b").await;
        assert!(matches!(result, Err(GatewayError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn revoking_unknown_token_is_a_noop() {
        let store = TokenStore::new();
        store.revoke("ghost").await;
    }
}
