mod bot;
mod config;
mod platform;
mod weather;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::WeatherBot;
use crate::config::Config;
use crate::platform::telegram;
use crate::weather::WeatherClient;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,weatherbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load configuration
    let env_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".env"));

    info!("Loading configuration from: {}", env_path.display());
    let config = Config::load(&env_path)
        .with_context(|| format!("Failed to load config from {}", env_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Weather endpoint: {}", config.weather.endpoint());
    info!(
        "  Units: {}, language: {}",
        config.weather.units, config.weather.lang
    );
    info!("  Weather timeout: {}s", config.weather.timeout_secs);

    let weather = WeatherClient::new(config.weather.clone())?;
    let weather_bot = Arc::new(WeatherBot::new(Arc::new(weather)));

    let bot = telegram::connect(&config.telegram).await?;

    info!("Bot is starting...");
    telegram::run(bot, weather_bot, &config.telegram).await?;

    Ok(())
}
