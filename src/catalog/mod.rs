/// Catalog - persistent users, shops, items, sales and votes

pub mod store;

pub use store::CatalogStore;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reputation is clamped into this range
pub const REPUTATION_MIN: i64 = -1000;
pub const REPUTATION_MAX: i64 = 1000;

/// Item details collected before the file is uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: String,
    pub price_sats: i64,
    pub amount: i64,
}

/// Uploaded file for a draft
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Purchase about to be recorded
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub buyer_id: String,
    pub seller_id: String,
    pub item_id: String,
    pub price_sats: i64,
    pub tx_id: Option<String>,
}

/// Thumbs up / thumbs down after a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Reputation change applied to the seller
    pub fn delta(self) -> i64 {
        match self {
            VoteDirection::Up => 5,
            VoteDirection::Down => -5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

/// Time left before another panel may be posted, if any
pub fn remaining_cooldown(last_post_ms: i64, now_ms: i64, cooldown: Duration) -> Option<Duration> {
    let elapsed = now_ms.saturating_sub(last_post_ms).max(0) as u64;
    let cooldown_ms = cooldown.as_millis() as u64;

    if elapsed >= cooldown_ms {
        return None;
    }

    // Whole seconds, rounded up
    let remaining_ms = cooldown_ms - elapsed;
    Some(Duration::from_secs(remaining_ms.div_ceil(1000)))
}
