/// Coin Shop - file marketplace backend for a chat bot
///
/// Sellers list downloadable files priced in Coin, buyers browse shops page
/// by page and pay through the Coin ledger.
use coin_shop::{config::ShopConfig, context::AppContext, error::ShopResult, jobs, server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ShopResult<()> {
    // Load configuration
    let config = ShopConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "coin_shop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::new(ctx.clone())));
    scheduler.start();

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ______        _          _____ __
  / ____/___    (_)___     / ___// /_  ____  ____
 / /   / __ \  / / __ \    \__ \/ __ \/ __ \/ __ \
/ /___/ /_/ / / / / / /   ___/ / / / / /_/ / /_/ /
\____/\____/ /_/_/ /_/   /____/_/ /_/\____/ .___/
                                         /_/
        Coin Shop v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
