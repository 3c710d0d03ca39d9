/// Application context and dependency injection
use crate::{
    catalog::CatalogStore,
    config::ShopConfig,
    db,
    error::ShopResult,
    ledger::{Ledger, LedgerClient},
    purchase::{DeliveryChannel, PurchaseOrchestrator, WebhookChannel},
    rate_limit::RateLimiter,
    session::{Clock, SessionRegistry, SystemClock},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ShopConfig>,
    pub db: SqlitePool,
    pub clock: Arc<dyn Clock>,
    pub catalog: CatalogStore,
    pub sessions: Arc<SessionRegistry>,
    pub ledger: Arc<dyn Ledger>,
    pub orchestrator: Arc<PurchaseOrchestrator>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ShopConfig) -> ShopResult<Self> {
        // Validate configuration
        config.validate()?;

        // Open the shop database and bring the schema up to date
        let db = db::open(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let ledger: Arc<dyn Ledger> = Arc::new(LedgerClient::new(&config.ledger)?);

        let private_channel: Option<Arc<dyn DeliveryChannel>> =
            match &config.delivery.dm_webhook_url {
                Some(url) => {
                    info!("Private deliveries go to {}", url);
                    Some(Arc::new(WebhookChannel::new(url.as_str(), config.bot.token.as_str())?))
                }
                None => None,
            };

        Ok(Self::with_components(
            config,
            db,
            ledger,
            Arc::new(SystemClock),
            private_channel,
        ))
    }

    /// Wire the services around already-built collaborators
    pub fn with_components(
        config: ShopConfig,
        db: SqlitePool,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        private_channel: Option<Arc<dyn DeliveryChannel>>,
    ) -> Self {
        let catalog = CatalogStore::new(db.clone());
        let sessions = Arc::new(SessionRegistry::new(
            clock.clone(),
            config.limits.browse_ttl(),
            config.limits.upload_window(),
        ));

        let mut orchestrator =
            PurchaseOrchestrator::new(catalog.clone(), sessions.clone(), ledger.clone());
        if let Some(channel) = private_channel {
            orchestrator = orchestrator.with_private_channel(channel);
        }

        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            db,
            clock,
            catalog,
            sessions,
            ledger,
            orchestrator: Arc::new(orchestrator),
            rate_limiter,
        }
    }
}
