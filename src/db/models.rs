/// Shop database models
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record; created lazily on the first shop-affecting action
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    /// Ledger card used when a buyer does not supply one
    #[serde(skip_serializing)]
    pub card_code: Option<String>,
    pub created_at: i64,
}

/// One shop per user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub user_id: String,
    pub reputation: i64,
    pub total_sales: i64,
    pub total_earned_sats: i64,
}

/// Listed item including its file payload
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub original_filename: String,
    pub price_sats: i64,
    pub size_bytes: i64,
    pub amount: i64,
    #[serde(skip)]
    pub file: Vec<u8>,
    pub created_at: i64,
}

/// Item row without the payload, used for listings
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub original_filename: String,
    pub price_sats: i64,
    pub size_bytes: i64,
    pub amount: i64,
    pub created_at: i64,
}

/// Immutable sale record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    /// Weak reference; the item row may be gone
    pub item_id: String,
    pub price_sats: i64,
    pub tx_id: Option<String>,
    pub created_at: i64,
}

/// At most one per purchase
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub purchase_id: String,
    pub voter_id: String,
    pub vote: i64,
}

impl From<Item> for ItemSummary {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            owner_id: item.owner_id,
            name: item.name,
            original_filename: item.original_filename,
            price_sats: item.price_sats,
            size_bytes: item.size_bytes,
            amount: item.amount,
            created_at: item.created_at,
        }
    }
}
