/// Background task implementations
use crate::{context::AppContext, error::ShopResult, metrics};

/// Drop browse sessions past their TTL
pub fn sweep_browse_sessions(ctx: &AppContext) -> usize {
    let removed = ctx.sessions.sweep_browse();
    metrics::record_sweep("browse", removed, ctx.sessions.browse_count());
    removed
}

/// Drop drafts whose file never arrived
pub fn sweep_pending_uploads(ctx: &AppContext) -> usize {
    let removed = ctx.sessions.sweep_uploads();
    metrics::record_sweep("upload", removed, ctx.sessions.upload_count());
    removed
}

/// Forget rate-limit buckets of idle users; returns how many remain
pub fn prune_rate_limiter(ctx: &AppContext) -> usize {
    ctx.rate_limiter.prune()
}

/// Health check - verify the shop database answers
pub async fn health_check(ctx: &AppContext) -> ShopResult<()> {
    ctx.catalog.ping().await
}
