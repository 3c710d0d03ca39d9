/// Buy endpoint
use crate::{api::middleware::Actor, context::AppContext, error::ShopResult};
use axum::{extract::State, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Build purchase routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/browse/buy", post(buy))
}

/// What the buy form collects
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    /// Item name or 1-based number
    pub item: String,
    pub card_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyResponse {
    pub purchase_id: String,
    pub item_name: String,
    pub price_sats: i64,
    pub tx_id: Option<String>,
    pub receipt: String,
    pub filename: String,
    pub file_base64: String,
}

async fn buy(
    State(ctx): State<AppContext>,
    actor: Actor,
    Json(request): Json<BuyRequest>,
) -> ShopResult<Json<BuyResponse>> {
    let delivery = ctx
        .orchestrator
        .purchase(&actor.user_id, &request.item, request.card_code.as_deref())
        .await?;

    Ok(Json(BuyResponse {
        purchase_id: delivery.purchase.id,
        item_name: delivery.item_name,
        price_sats: delivery.purchase.price_sats,
        tx_id: delivery.purchase.tx_id,
        receipt: delivery.receipt,
        filename: delivery.filename,
        file_base64: STANDARD.encode(&delivery.file),
    }))
}
