mod config;
mod server;
mod telegram;
mod updates;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tgrelay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Environment is read exactly once, before any request is served.
    let config = Config::from_env().context("Failed to load configuration from environment")?;

    info!("Configuration loaded");
    info!("  Telegram API: {}", config.api_url);
    info!("  Bind address: {}", config.bind_addr);

    server::serve(config).await
}
