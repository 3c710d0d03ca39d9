/// Configuration management for Coin Shop
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main shop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
    pub bot: BotConfig,
    pub limits: LimitsConfig,
    pub jobs: JobsConfig,
    pub rate_limit: RateLimitConfig,
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file, or `:memory:` for a throwaway store
    pub database: PathBuf,
}

/// Coin ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_step_ms: u64,
}

/// Chat bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    /// Credential the chat front-end presents as a bearer token
    pub token: String,
}

/// Marketplace limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub panel_cooldown_secs: u64,
    pub upload_window_secs: u64,
    pub browse_ttl_secs: u64,
    pub page_size: u32,
}

/// Background job intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub session_sweep_secs: u64,
    pub upload_sweep_secs: u64,
    pub health_check_secs: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_user_per_minute: u32,
    pub burst_size: u32,
}

/// Private-message delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Bot endpoint that forwards receipts to the buyer's DMs
    pub dm_webhook_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LimitsConfig {
    pub fn panel_cooldown(&self) -> Duration {
        Duration::from_secs(self.panel_cooldown_secs)
    }

    pub fn upload_window(&self) -> Duration {
        Duration::from_secs(self.upload_window_secs)
    }

    pub fn browse_ttl(&self) -> Duration {
        Duration::from_secs(self.browse_ttl_secs)
    }

    pub fn max_upload_mb(&self) -> usize {
        self.max_upload_bytes / (1024 * 1024)
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 3080,
            },
            storage: StorageConfig {
                database: PathBuf::from("./data/shop.sqlite"),
            },
            ledger: LedgerConfig {
                base_url: "https://bank.foxsrv.net".to_string(),
                timeout_secs: 15,
                max_retries: 2,
                retry_step_ms: 1000,
            },
            bot: BotConfig {
                name: "NFTs Shop".to_string(),
                token: String::new(),
            },
            limits: LimitsConfig {
                max_upload_bytes: 8 * 1024 * 1024,
                panel_cooldown_secs: 10 * 60,
                upload_window_secs: 5 * 60,
                browse_ttl_secs: 15 * 60,
                page_size: 5,
            },
            jobs: JobsConfig {
                session_sweep_secs: 60,
                upload_sweep_secs: 30,
                health_check_secs: 300,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                per_user_per_minute: 120,
                burst_size: 20,
            },
            delivery: DeliveryConfig {
                dm_webhook_url: None,
            },
            logging: LoggingConfig {
                level: "coin_shop=debug,tower_http=debug".to_string(),
            },
        }
    }
}

impl ShopConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ShopResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let hostname = env::var("SHOP_HOSTNAME").unwrap_or(defaults.service.hostname);
        let port = match env::var("SHOP_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ShopError::Validation("Invalid port number".to_string()))?,
            Err(_) => defaults.service.port,
        };

        let database = env::var("SHOP_DATABASE")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.database);

        let base_url = env::var("COIN_API_BASE")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.ledger.base_url);
        let timeout_secs = parse_or("COIN_API_TIMEOUT_SECS", defaults.ledger.timeout_secs);
        let max_retries = parse_or("COIN_API_MAX_RETRIES", defaults.ledger.max_retries);
        let retry_step_ms = parse_or("COIN_API_RETRY_STEP_MS", defaults.ledger.retry_step_ms);

        let bot_name = env::var("SHOP_BOT_NAME").unwrap_or(defaults.bot.name);
        let token = env::var("SHOP_BOT_TOKEN")
            .or_else(|_| env::var("DISCORD_TOKEN"))
            .unwrap_or_default();

        let max_upload_bytes = env::var("SHOP_MAX_FILE_MB")
            .ok()
            .and_then(|mb| mb.parse::<usize>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(defaults.limits.max_upload_bytes);
        let panel_cooldown_secs =
            parse_or("SHOP_PANEL_COOLDOWN_SECS", defaults.limits.panel_cooldown_secs);
        let upload_window_secs =
            parse_or("SHOP_UPLOAD_WINDOW_SECS", defaults.limits.upload_window_secs);
        let browse_ttl_secs = parse_or("SHOP_BROWSE_TTL_SECS", defaults.limits.browse_ttl_secs);
        let page_size = parse_or("SHOP_PAGE_SIZE", defaults.limits.page_size);

        let session_sweep_secs =
            parse_or("SHOP_SESSION_SWEEP_SECS", defaults.jobs.session_sweep_secs);
        let upload_sweep_secs = parse_or("SHOP_UPLOAD_SWEEP_SECS", defaults.jobs.upload_sweep_secs);
        let health_check_secs = parse_or("SHOP_HEALTH_CHECK_SECS", defaults.jobs.health_check_secs);

        let rate_limit_enabled = parse_or("SHOP_RATE_LIMITS_ENABLED", defaults.rate_limit.enabled);
        let per_user_per_minute = parse_or(
            "SHOP_RATE_LIMIT_PER_USER_PER_MINUTE",
            defaults.rate_limit.per_user_per_minute,
        );
        let burst_size = parse_or("SHOP_RATE_LIMIT_BURST", defaults.rate_limit.burst_size);

        let dm_webhook_url = env::var("SHOP_DM_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);

        Ok(ShopConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig { database },
            ledger: LedgerConfig {
                base_url,
                timeout_secs,
                max_retries,
                retry_step_ms,
            },
            bot: BotConfig {
                name: bot_name,
                token,
            },
            limits: LimitsConfig {
                max_upload_bytes,
                panel_cooldown_secs,
                upload_window_secs,
                browse_ttl_secs,
                page_size,
            },
            jobs: JobsConfig {
                session_sweep_secs,
                upload_sweep_secs,
                health_check_secs,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                per_user_per_minute,
                burst_size,
            },
            delivery: DeliveryConfig { dm_webhook_url },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ShopResult<()> {
        if self.bot.token.trim().is_empty() {
            return Err(ShopError::Validation(
                "Bot credential required (SHOP_BOT_TOKEN)".to_string(),
            ));
        }

        if self.ledger.base_url.is_empty() {
            return Err(ShopError::Validation("Ledger base URL cannot be empty".to_string()));
        }

        if self.limits.max_upload_bytes == 0 || self.limits.page_size == 0 {
            return Err(ShopError::Validation(
                "Upload limit and page size must be positive".to_string(),
            ));
        }

        if self.jobs.session_sweep_secs == 0
            || self.jobs.upload_sweep_secs == 0
            || self.jobs.health_check_secs == 0
        {
            return Err(ShopError::Validation(
                "Sweep intervals must be positive".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.per_user_per_minute == 0 || self.rate_limit.burst_size == 0)
        {
            return Err(ShopError::Validation(
                "Rate limit quota must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
