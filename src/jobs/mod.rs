use crate::metrics;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

pub mod tasks;

/// Limiter buckets are pruned on this period
const RATE_LIMIT_PRUNE_SECS: u64 = 600;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        // Spawn sweep tasks
        tokio::spawn(Self::browse_session_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::pending_upload_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::rate_limit_prune_job(Arc::clone(&self)));

        // Spawn monitoring tasks
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Remove expired browse sessions (default every minute)
    async fn browse_session_sweep_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.jobs.session_sweep_secs;
        let mut interval = interval(Duration::from_secs(period));

        loop {
            interval.tick().await;

            let removed = tasks::sweep_browse_sessions(&scheduler.context);
            metrics::record_background_job("browse_sweep", "success");
            if removed > 0 {
                info!("Swept {} expired browse sessions", removed);
            }
        }
    }

    /// Remove pending uploads whose window closed (default every 30 seconds)
    async fn pending_upload_sweep_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.jobs.upload_sweep_secs;
        let mut interval = interval(Duration::from_secs(period));

        loop {
            interval.tick().await;

            let removed = tasks::sweep_pending_uploads(&scheduler.context);
            metrics::record_background_job("upload_sweep", "success");
            if removed > 0 {
                info!("Swept {} expired pending uploads", removed);
            }
        }
    }

    /// Drop idle rate-limit buckets (every 10 minutes)
    async fn rate_limit_prune_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(RATE_LIMIT_PRUNE_SECS));

        loop {
            interval.tick().await;

            let tracked = tasks::prune_rate_limiter(&scheduler.context);
            debug!("Rate limiter tracking {} users", tracked);
        }
    }

    /// Health check job (default every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.jobs.health_check_secs;
        let mut interval = interval(Duration::from_secs(period));

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    metrics::record_background_job("health_check", "success");
                }
                Err(e) => {
                    metrics::record_background_job("health_check", "failure");
                    error!("Health check failed: {}", e);
                }
            }
        }
    }
}
