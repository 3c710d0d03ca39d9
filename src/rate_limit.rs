/// Rate Limiting System
use crate::{
    api::middleware::SHOP_USER_HEADER,
    config::RateLimitConfig,
    error::{ShopError, ShopResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as GovernorLimiter};
use std::{num::NonZeroU32, sync::Arc};

/// Per-user rate limiter keyed by the acting platform user
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    per_user: Arc<DefaultKeyedRateLimiter<String>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.per_user_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            enabled: config.enabled,
            per_user: Arc::new(GovernorLimiter::keyed(quota)),
        }
    }

    /// Check rate limit for one user
    pub fn check_user(&self, user_id: &str) -> ShopResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.per_user
            .check_key(&user_id.to_string())
            .map_err(|_| ShopError::RateLimitExceeded)
    }

    /// Forget users whose buckets have fully refilled
    pub fn prune(&self) -> usize {
        self.per_user.retain_recent();
        self.per_user.shrink_to_fit();
        self.per_user.len()
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ShopError> {
    let user = request
        .headers()
        .get(SHOP_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    ctx.rate_limiter.check_user(&user)?;

    Ok(next.run(request).await)
}
