/// API routes and handlers
pub mod help;
pub mod items;
pub mod middleware;
pub mod purchase;
pub mod shop;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(shop::routes())
        .merge(purchase::routes())
        .merge(items::routes())
        .merge(help::routes())
}
