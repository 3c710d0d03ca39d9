/// Metrics for Coin Shop
///
/// Prometheus counters and gauges covering:
/// - HTTP requests
/// - Purchase outcomes and ledger calls
/// - Session registry size and sweeps
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 45.0]
    )
    .unwrap();

    // ========== Shop Metrics ==========

    /// Purchase attempts by terminal state
    pub static ref PURCHASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shop_purchases_total",
        "Purchase attempts by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Calls to the Coin ledger by endpoint and result
    pub static ref LEDGER_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shop_ledger_requests_total",
        "Ledger requests by endpoint and result",
        &["endpoint", "result"]
    )
    .unwrap();

    /// Items listed for sale
    pub static ref ITEMS_LISTED_TOTAL: IntCounter = register_int_counter!(
        "shop_items_listed_total",
        "Items listed for sale"
    )
    .unwrap();

    /// Votes by direction
    pub static ref VOTES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shop_votes_total",
        "Votes cast on purchases",
        &["direction"]
    )
    .unwrap();

    // ========== Session Metrics ==========

    /// Live browse sessions
    pub static ref BROWSE_SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "shop_browse_sessions_active",
        "Browse sessions currently held in memory"
    )
    .unwrap();

    /// Drafts waiting for their file
    pub static ref PENDING_UPLOADS_ACTIVE: IntGauge = register_int_gauge!(
        "shop_pending_uploads_active",
        "Pending uploads currently held in memory"
    )
    .unwrap();

    /// Entries removed by the sweeps
    pub static ref SESSIONS_SWEPT_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shop_sessions_swept_total",
        "Expired session entries removed by background sweeps",
        &["kind"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job runs by job and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record the outcome of a purchase attempt
pub fn record_purchase(outcome: &str) {
    PURCHASES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a ledger call
pub fn record_ledger_request(endpoint: &str, result: &str) {
    LEDGER_REQUESTS_TOTAL
        .with_label_values(&[endpoint, result])
        .inc();
}

pub fn record_item_listed() {
    ITEMS_LISTED_TOTAL.inc();
}

pub fn record_vote(direction: &str) {
    VOTES_TOTAL.with_label_values(&[direction]).inc();
}

/// Record a sweep and the registry sizes it left behind
pub fn record_sweep(kind: &str, removed: usize, remaining: usize) {
    SESSIONS_SWEPT_TOTAL
        .with_label_values(&[kind])
        .inc_by(removed as u64);

    match kind {
        "browse" => BROWSE_SESSIONS_ACTIVE.set(remaining as i64),
        "upload" => PENDING_UPLOADS_ACTIVE.set(remaining as i64),
        _ => {}
    }
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}
