/// Authentication middleware and the acting-user extractor
use crate::{context::AppContext, error::ShopError};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Platform user the bot is acting for
pub const SHOP_USER_HEADER: &str = "x-shop-user";

/// Display name of that user, used on panels
pub const SHOP_USER_NAME_HEADER: &str = "x-shop-user-name";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Only the bot front-end holding the configured credential may call the API
pub async fn authenticate(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, ShopError> {
    let token = extract_bearer_token(req.headers())
        .ok_or_else(|| ShopError::Unauthorized("Missing authorization header".to_string()))?;

    if token != ctx.config.bot.token {
        return Err(ShopError::Unauthorized("Invalid bot credential".to_string()));
    }

    Ok(next.run(req).await)
}

/// Platform identity of the user behind a request
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let user_id = header(SHOP_USER_HEADER)
            .ok_or_else(|| ShopError::Unauthorized("Missing X-Shop-User header".to_string()))?;
        let display_name = header(SHOP_USER_NAME_HEADER).unwrap_or_else(|| user_id.clone());

        Ok(Actor {
            user_id,
            display_name,
        })
    }
}
