/// Session Registry - in-memory browse sessions and pending uploads
use crate::{
    catalog::ItemDraft,
    session::{BrowseSession, Clock, PendingUpload},
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Time-boxed per-user state, keyed by platform user id.
///
/// Each key is only written by its own user's actions, so per-key map
/// operations are all the coordination needed.
pub struct SessionRegistry {
    browse: DashMap<String, BrowseSession>,
    uploads: DashMap<String, PendingUpload>,
    clock: Arc<dyn Clock>,
    /// TTL for browse sessions (default: 15 minutes)
    browse_ttl: Duration,
    /// Window for the file to arrive (default: 5 minutes)
    upload_ttl: Duration,
}

impl SessionRegistry {
    /// Create a registry with the given TTLs
    pub fn new(
        clock: Arc<dyn Clock>,
        browse_ttl: std::time::Duration,
        upload_ttl: std::time::Duration,
    ) -> Self {
        Self {
            browse: DashMap::new(),
            uploads: DashMap::new(),
            clock,
            browse_ttl: to_chrono(browse_ttl),
            upload_ttl: to_chrono(upload_ttl),
        }
    }

    /// Open (or reopen) `owner_id`'s shop for `viewer_id` on the first page
    pub fn start_browse(&self, viewer_id: &str, owner_id: &str) -> BrowseSession {
        let session = BrowseSession {
            viewer_id: viewer_id.to_string(),
            owner_id: owner_id.to_string(),
            page: 0,
            expires_at: self.clock.now() + self.browse_ttl,
        };

        self.browse.insert(viewer_id.to_string(), session.clone());
        session
    }

    /// Live browse session, evicting it if it has expired
    pub fn get_browse(&self, viewer_id: &str) -> Option<BrowseSession> {
        let now = self.clock.now();
        self.browse.remove_if(viewer_id, |_, session| session.is_expired(now));
        self.browse.get(viewer_id).map(|session| session.clone())
    }

    /// Move the page by `delta` (never below zero) and refresh the TTL
    pub fn advance_page(&self, viewer_id: &str, delta: i32) -> Option<BrowseSession> {
        self.touch_browse(viewer_id, |session| {
            let page = i64::from(session.page) + i64::from(delta);
            session.page = page.clamp(0, i64::from(u32::MAX)) as u32;
        })
    }

    /// Extend a live session's TTL without moving the page
    pub fn refresh_browse(&self, viewer_id: &str) -> Option<BrowseSession> {
        self.touch_browse(viewer_id, |_| {})
    }

    fn touch_browse(
        &self,
        viewer_id: &str,
        update: impl FnOnce(&mut BrowseSession),
    ) -> Option<BrowseSession> {
        let now = self.clock.now();
        self.browse.remove_if(viewer_id, |_, session| session.is_expired(now));

        let mut session = self.browse.get_mut(viewer_id)?;
        update(&mut session);
        session.expires_at = now + self.browse_ttl;
        Some(session.clone())
    }

    /// Park an item draft until its file arrives, replacing any earlier draft
    pub fn start_upload(&self, uploader_id: &str, draft: ItemDraft) -> PendingUpload {
        let pending = PendingUpload {
            uploader_id: uploader_id.to_string(),
            draft,
            expires_at: self.clock.now() + self.upload_ttl,
        };

        self.uploads.insert(uploader_id.to_string(), pending.clone());
        pending
    }

    /// Live pending upload, left in place
    pub fn peek_upload(&self, uploader_id: &str) -> Option<PendingUpload> {
        let now = self.clock.now();
        self.uploads.remove_if(uploader_id, |_, pending| pending.is_expired(now));
        self.uploads.get(uploader_id).map(|pending| pending.clone())
    }

    /// Take the pending draft; expired drafts count as absent
    pub fn consume_upload(&self, uploader_id: &str) -> Option<ItemDraft> {
        let now = self.clock.now();
        let (_, pending) = self.uploads.remove(uploader_id)?;

        if pending.is_expired(now) {
            debug!(uploader = %uploader_id, "Discarded expired pending upload");
            return None;
        }

        Some(pending.draft)
    }

    /// Drop every expired browse session; returns how many were removed
    pub fn sweep_browse(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.browse.retain(|_, session| {
            let keep = !session.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    /// Drop every expired pending upload; returns how many were removed
    pub fn sweep_uploads(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.uploads.retain(|_, pending| {
            let keep = !pending.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    pub fn browse_count(&self) -> usize {
        self.browse.len()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn to_chrono(ttl: std::time::Duration) -> Duration {
    Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365))
}
