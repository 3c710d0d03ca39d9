/// HTTP server setup and routing
use crate::{
    api::middleware::authenticate,
    context::AppContext,
    error::{ShopError, ShopResult},
    metrics,
    rate_limit::rate_limit_middleware,
};
use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request, State},
    http::{header, HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Headroom over the upload limit so oversized files reach the handler
/// and get a proper FileTooLarge answer
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(crate::api::middleware::SHOP_USER_HEADER),
            HeaderName::from_static(crate::api::middleware::SHOP_USER_NAME_HEADER),
        ]);

    // Bot-facing API: bot credential first, then the per-user limiter
    let api = crate::api::routes()
        .route_layer(middleware::from_fn_with_state(ctx.clone(), rate_limit_middleware))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), authenticate));

    let body_limit = ctx.config.limits.max_upload_bytes + BODY_LIMIT_SLACK;

    Router::new()
        // Health check and metrics (no auth)
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(track_http_metrics))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler
async fn health_check(State(ctx): State<AppContext>) -> Response {
    match ctx.catalog.ping().await {
        Ok(()) => Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "browseSessions": ctx.sessions.browse_count(),
            "pendingUploads": ctx.sessions.upload_count(),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
                .into_response()
        }
    }
}

/// Prometheus text exposition
async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// Count requests by matched route
async fn track_http_metrics(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ShopResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("🛍️ {} listening on {}", ctx.config.bot.name, addr);
    info!("   Ledger: {}", ctx.config.ledger.base_url);
    info!("   Database: {}", ctx.config.storage.database.display());

    let app = build_router(ctx);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ShopError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ShopError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
