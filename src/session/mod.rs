/// Ephemeral per-user state
///
/// Browse sessions point a viewer at a shop page; pending uploads hold an
/// item draft until the seller's file arrives. Neither is persisted.

pub mod clock;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::SessionRegistry;

use crate::catalog::ItemDraft;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Viewer's position in someone's shop
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseSession {
    pub viewer_id: String,
    pub owner_id: String,
    /// Zero-based
    pub page: u32,
    pub expires_at: DateTime<Utc>,
}

/// Draft waiting for its file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub uploader_id: String,
    pub draft: ItemDraft,
    pub expires_at: DateTime<Utc>,
}

impl BrowseSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

impl PendingUpload {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
