/// Delivery of purchased files
use crate::{
    db::models::Purchase,
    error::{ShopError, ShopResult},
    money,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// What the buyer receives after a successful purchase
#[derive(Debug, Clone)]
pub struct Delivery {
    pub purchase: Purchase,
    pub item_name: String,
    pub filename: String,
    pub file: Vec<u8>,
    pub receipt: String,
}

/// Receipt shown in the reply and the private copy
pub fn format_receipt(item_name: &str, price_sats: i64, tx_id: Option<&str>) -> String {
    format!(
        "🧾 **Purchase Complete**\nItem: {}\nPrice: {} coins\nTransaction: {}",
        item_name,
        money::format_sats(price_sats),
        tx_id.unwrap_or("N/A")
    )
}

/// Secondary, best-effort channel to the buyer (a DM on the chat platform)
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, recipient_id: &str, delivery: &Delivery) -> ShopResult<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    recipient_id: &'a str,
    content: &'a str,
    filename: &'a str,
    file_base64: String,
}

/// Hands private deliveries to the bot front-end over HTTP
#[derive(Clone)]
pub struct WebhookChannel {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> ShopResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Coin-Shop/0.1")
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ShopError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    async fn send(&self, recipient_id: &str, delivery: &Delivery) -> ShopResult<()> {
        let payload = WebhookPayload {
            recipient_id,
            content: &delivery.receipt,
            filename: &delivery.filename,
            file_base64: STANDARD.encode(&delivery.file),
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ShopError::Internal(format!("Private delivery failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ShopError::Internal(format!(
                "Private delivery rejected: {}",
                response.status()
            )));
        }

        debug!(recipient = %recipient_id, purchase = %delivery.purchase.id, "Private copy sent");
        Ok(())
    }
}
