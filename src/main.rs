mod bot;
mod commands;
mod config;
mod keepalive;
mod memes;
mod platform;
mod scheduler;
mod spam;
mod whitelist;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Bot;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,billabot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; the default file is optional, a named one is not
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            let path = PathBuf::from("config.toml");
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                Config::load(&path)?
            } else {
                info!("No config.toml found, using built-in defaults");
                Config::default()
            }
        }
    };
    let token = config::discord_token()?;

    info!("Configuration loaded successfully");
    info!("  Owner: {}", config.discord.owner_id);
    info!("  Prefix: {}", config.discord.command_prefix);
    info!("  Welcome channel: {}", config.discord.welcome_channel_id);
    info!(
        "  Memes: {} x{} into {} at '{}'",
        config.memes.api_url,
        config.memes.batch_size,
        config.memes.channel_id,
        config.memes.cron
    );

    keepalive::spawn(config.keepalive.clone())?;

    let bot = Arc::new(Bot::new(&config)?);

    info!("Bot is starting...");
    let result = platform::discord::run(&token, Arc::clone(&bot)).await;

    if let Err(e) = bot.meme_job().shutdown().await {
        warn!("Failed to stop scheduler: {:#}", e);
    }
    result
}
