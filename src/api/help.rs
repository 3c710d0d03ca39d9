/// Help text endpoint
use crate::{context::AppContext, view::help_text};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/help", get(help))
}

#[derive(Debug, Serialize)]
pub struct HelpResponse {
    pub text: String,
}

async fn help(State(ctx): State<AppContext>) -> Json<HelpResponse> {
    Json(HelpResponse {
        text: help_text(&ctx.config.bot.name, &ctx.config.limits),
    })
}
