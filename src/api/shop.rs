/// Panel, shop browsing and voting endpoints
use crate::{
    api::middleware::Actor,
    catalog::{remaining_cooldown, VoteDirection},
    context::AppContext,
    error::{ShopError, ShopResult},
    metrics,
    session::BrowseSession,
    view::{render_listing, render_panel, ListingView, PanelView},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Build shop routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/panel", post(post_panel))
        .route("/shops/:owner_id/browse", post(open_shop))
        .route("/browse", get(current_page))
        .route("/browse/next", post(next_page))
        .route("/browse/prev", post(prev_page))
        .route("/browse/vote", post(vote))
}

/// Post the public panel, at most once per cooldown window
async fn post_panel(State(ctx): State<AppContext>, actor: Actor) -> ShopResult<Json<PanelView>> {
    ctx.catalog.ensure_user(&actor.user_id).await?;

    let now = ctx.clock.now_millis();
    if let Some(last_post) = ctx.catalog.panel_cooldown(&actor.user_id).await? {
        if let Some(remaining) =
            remaining_cooldown(last_post, now, ctx.config.limits.panel_cooldown())
        {
            return Err(ShopError::CooldownActive { remaining });
        }
    }

    ctx.catalog.touch_panel_cooldown(&actor.user_id, now).await?;
    debug!(owner = %actor.user_id, "Panel posted");

    Ok(Json(render_panel(&actor.user_id, &actor.display_name)))
}

/// Start browsing `owner_id`'s shop from the first page
async fn open_shop(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(owner_id): Path<String>,
) -> ShopResult<Json<ListingView>> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(ShopError::NotFound("Shop owner not found.".to_string()));
    }

    let session = ctx.sessions.start_browse(&actor.user_id, owner_id);
    Ok(Json(render_page(&ctx, &session).await?))
}

async fn current_page(State(ctx): State<AppContext>, actor: Actor) -> ShopResult<Json<ListingView>> {
    let session = ctx
        .sessions
        .refresh_browse(&actor.user_id)
        .ok_or(ShopError::SessionExpired)?;

    Ok(Json(render_page(&ctx, &session).await?))
}

async fn next_page(State(ctx): State<AppContext>, actor: Actor) -> ShopResult<Json<ListingView>> {
    turn_page(&ctx, &actor, 1).await
}

async fn prev_page(State(ctx): State<AppContext>, actor: Actor) -> ShopResult<Json<ListingView>> {
    turn_page(&ctx, &actor, -1).await
}

async fn turn_page(ctx: &AppContext, actor: &Actor, delta: i32) -> ShopResult<Json<ListingView>> {
    let session = ctx
        .sessions
        .advance_page(&actor.user_id, delta)
        .ok_or(ShopError::SessionExpired)?;

    Ok(Json(render_page(ctx, &session).await?))
}

/// Listing for the session's current page
async fn render_page(ctx: &AppContext, session: &BrowseSession) -> ShopResult<ListingView> {
    let page_size = ctx.config.limits.page_size;
    let offset = i64::from(session.page) * i64::from(page_size);

    let items = ctx
        .catalog
        .list_items(&session.owner_id, offset, i64::from(page_size))
        .await?;
    let reputation = ctx
        .catalog
        .get_shop(&session.owner_id)
        .await?
        .map(|shop| shop.reputation)
        .unwrap_or(0);

    Ok(render_listing(
        &session.owner_id,
        &items,
        session.page,
        page_size,
        reputation,
    ))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub purchase_id: String,
    pub vote: i64,
    pub reputation: i64,
    pub message: String,
}

/// Vote on the latest unvoted purchase from the shop being browsed
async fn vote(
    State(ctx): State<AppContext>,
    actor: Actor,
    Json(request): Json<VoteRequest>,
) -> ShopResult<Json<VoteResponse>> {
    let session = ctx
        .sessions
        .get_browse(&actor.user_id)
        .ok_or(ShopError::SessionExpired)?;

    let vote = ctx
        .catalog
        .cast_vote(&actor.user_id, &session.owner_id, request.direction)
        .await?;
    metrics::record_vote(request.direction.as_str());

    let reputation = ctx
        .catalog
        .get_shop(&session.owner_id)
        .await?
        .map(|shop| shop.reputation)
        .unwrap_or(0);

    let message = match request.direction {
        VoteDirection::Up => "✅ Positive vote recorded!",
        VoteDirection::Down => "⚠️ Negative vote recorded.",
    };

    Ok(Json(VoteResponse {
        purchase_id: vote.purchase_id,
        vote: vote.vote,
        reputation,
        message: message.to_string(),
    }))
}
