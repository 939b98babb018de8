//! Timeline collaborator seam.
//!
//! The gateway does not compute timelines. Each poll cycle it asks a
//! [`TimelineService`] for the items created after the session's cursor
//! and forwards their serialized form verbatim. [`InMemoryTimeline`] is
//! the default implementation: embedders push items into it, the poller
//! reads them back out.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::GatewayError;

/// One timeline item.
///
/// The `status` body is opaque to the gateway: it is produced by the
/// timeline collaborator and forwarded to clients as a JSON string.
#[derive(Debug, Clone)]
pub struct TimelineItem {
    /// Item identifier.
    pub id: Uuid,
    /// Creation time, compared against the session cursor.
    pub created_at: DateTime<Utc>,
    /// Opaque serialized body, already in its client-facing shape.
    pub status: serde_json::Value,
}

impl TimelineItem {
    /// Creates an item with a fresh id, created now.
    #[must_use]
    pub fn new(status: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status,
        }
    }

    /// Serializes the item body to the payload string carried on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Serialization`] if the body cannot be
    /// rendered as JSON text.
    pub fn to_payload_json(&self) -> Result<String, GatewayError> {
        Ok(serde_json::to_string(&self.status)?)
    }
}

/// Opaque timeline query service.
#[async_trait]
pub trait TimelineService: Send + Sync + fmt::Debug {
    /// Returns the items belonging to `identity` created strictly after
    /// `since`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Timeline`] when the query cannot be
    /// answered; the calling session treats this as fatal.
    async fn query_new_items(
        &self,
        identity: &Identity,
        since: DateTime<Utc>,
    ) -> Result<Vec<TimelineItem>, GatewayError>;
}

/// In-memory timeline store keyed by identity.
#[derive(Debug, Default)]
pub struct InMemoryTimeline {
    items: RwLock<HashMap<Uuid, Vec<TimelineItem>>>,
}

impl InMemoryTimeline {
    /// Creates an empty timeline store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item to an identity's timeline.
    pub async fn push(&self, identity: &Identity, item: TimelineItem) {
        self.items
            .write()
            .await
            .entry(identity.id)
            .or_default()
            .push(item);
    }
}

#[async_trait]
impl TimelineService for InMemoryTimeline {
    async fn query_new_items(
        &self,
        identity: &Identity,
        since: DateTime<Utc>,
    ) -> Result<Vec<TimelineItem>, GatewayError> {
        let items = self.items.read().await;
        let mut found: Vec<TimelineItem> = items
            .get(&identity.id)
            .map(|timeline| {
                timeline
                    .iter()
                    .filter(|item| item.created_at > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|item| item.created_at);
        Ok(found)
    }
}
