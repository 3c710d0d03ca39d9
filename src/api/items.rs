/// Seller endpoints: listing items, uploading files, removing items, linking a card
use crate::{
    api::middleware::Actor,
    catalog::{FileUpload, ItemDraft},
    context::AppContext,
    db::models::ItemSummary,
    error::{ShopError, ShopResult},
    metrics, money,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Build item routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/items", post(add_item))
        .route("/items/upload/:filename", put(upload_file))
        .route("/items/:position", delete(remove_item))
        .route("/card", put(link_card))
}

/// Price as typed by the seller, either `"2.5"` or `2.5`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

impl PriceInput {
    fn to_sats(&self) -> ShopResult<i64> {
        match self {
            PriceInput::Text(text) => money::parse_coins(text),
            PriceInput::Number(number) => money::parse_coins(&number.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub price: PriceInput,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUploadResponse {
    pub draft: ItemDraft,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

/// Open an upload window for a new item
async fn add_item(
    State(ctx): State<AppContext>,
    actor: Actor,
    Json(request): Json<AddItemRequest>,
) -> ShopResult<Json<PendingUploadResponse>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ShopError::Validation("Item name cannot be empty.".to_string()));
    }

    let price_sats = request
        .price
        .to_sats()
        .map_err(|_| ShopError::Validation("Invalid price or amount.".to_string()))?;
    if price_sats <= 0 || request.amount <= 0 {
        return Err(ShopError::Validation("Invalid price or amount.".to_string()));
    }

    ctx.catalog.ensure_user(&actor.user_id).await?;

    let pending = ctx.sessions.start_upload(
        &actor.user_id,
        ItemDraft {
            name: name.to_string(),
            price_sats,
            amount: request.amount,
        },
    );

    let limits = &ctx.config.limits;
    Ok(Json(PendingUploadResponse {
        draft: pending.draft,
        expires_at: pending.expires_at,
        message: format!(
            "📤 Send the file now (max {}MB). You have {} minutes.",
            limits.max_upload_mb(),
            limits.upload_window_secs / 60
        ),
    }))
}

/// Attach the file to the pending draft and list the item
async fn upload_file(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(filename): Path<String>,
    body: Bytes,
) -> ShopResult<(StatusCode, Json<ItemSummary>)> {
    let pending = ctx
        .sessions
        .peek_upload(&actor.user_id)
        .ok_or(ShopError::NoPendingUpload)?;

    // Too large: the draft stays pending so the seller can retry
    let max_bytes = ctx.config.limits.max_upload_bytes;
    if body.len() > max_bytes {
        return Err(ShopError::FileTooLarge { max_bytes });
    }

    let filename = base_name(&filename)
        .ok_or_else(|| ShopError::Validation("Invalid file name.".to_string()))?;

    // A failed insert leaves the draft pending for another try
    let item = ctx
        .catalog
        .add_item(
            &actor.user_id,
            &pending.draft,
            FileUpload {
                filename,
                bytes: body.to_vec(),
            },
        )
        .await?;
    ctx.sessions.consume_upload(&actor.user_id);
    metrics::record_item_listed();

    Ok((StatusCode::CREATED, Json(ItemSummary::from(item))))
}

/// Remove the item at a listing position
async fn remove_item(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(position): Path<String>,
) -> ShopResult<Json<ItemSummary>> {
    let position: i64 = position
        .trim()
        .parse()
        .map_err(|_| ShopError::Validation("Invalid item number.".to_string()))?;

    let removed = ctx
        .catalog
        .remove_item_by_position(&actor.user_id, position)
        .await?;

    Ok(Json(removed))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCardRequest {
    pub card_code: String,
}

#[derive(Debug, Serialize)]
pub struct LinkCardResponse {
    pub linked: bool,
}

/// Store the card used when a purchase supplies none
async fn link_card(
    State(ctx): State<AppContext>,
    actor: Actor,
    Json(request): Json<LinkCardRequest>,
) -> ShopResult<Json<LinkCardResponse>> {
    ctx.catalog
        .set_card_code(&actor.user_id, &request.card_code)
        .await?;
    info!(user = %actor.user_id, "Card linked");

    Ok(Json(LinkCardResponse { linked: true }))
}

/// Last path component of an uploaded name
fn base_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("art.png").as_deref(), Some("art.png"));
        assert_eq!(base_name("dir/sub\\art.png").as_deref(), Some("art.png"));
        assert_eq!(base_name("folder/"), None);
        assert_eq!(base_name(".."), None);
    }

    #[test]
    fn test_price_input_accepts_text_and_numbers() {
        let text: AddItemRequest =
            serde_json::from_str(r#"{"name":"W","price":"2.5","amount":1}"#).unwrap();
        assert_eq!(text.price.to_sats().unwrap(), 250_000_000);

        let number: AddItemRequest =
            serde_json::from_str(r#"{"name":"W","price":2.5,"amount":1}"#).unwrap();
        assert_eq!(number.price.to_sats().unwrap(), 250_000_000);
    }
}
