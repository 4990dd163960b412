//! Rental Listing Bot - Main Entry Point
//!
//! A Telegram bot where landlords publish apartments and renters search
//! them with filters.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use rental_listing_bot::commands::BotHandler;
use rental_listing_bot::config::{BotSettings, TelegramConfig};
use rental_listing_bot::geocoding::NominatimResolver;
use rental_listing_bot::listings::{JsonListingStore, ListingStore};
use rental_listing_bot::telegram::TelegramBot;

/// Telegram bot for apartment rental listings.
#[derive(Parser, Debug)]
#[command(name = "rental_bot")]
#[command(about = "Publish and search apartment rental listings on Telegram")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to the listings store (overrides `LISTINGS_PATH`).
    #[arg(long)]
    listings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(path) = args.listings {
        settings.listings_path = path;
    }

    if settings.bot_email == BotSettings::default().bot_email {
        warn!("BOT_EMAIL is not set; the geocoder may throttle anonymous clients");
    }

    let store = JsonListingStore::open(&settings.listings_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open listing store {}",
                settings.listings_path.display()
            )
        })?;

    match store.pending_review().await {
        Ok(pending) if !pending.is_empty() => {
            info!("{} listing(s) are waiting for address moderation", pending.len());
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to read moderation queue: {}", e),
    }

    let resolver = NominatimResolver::new(
        &settings.geocoder_url,
        &settings.bot_email,
        settings.geocoder_limit,
    )
    .context("Failed to create geocoder client")?;

    info!(
        "Geocoder: {} (up to {} candidates per lookup)",
        settings.geocoder_url, settings.geocoder_limit
    );

    let handler = Arc::new(BotHandler::new(store, resolver));

    info!("Starting rental bot...");
    TelegramBot::serve(&tg_config, Arc::clone(&handler), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down...");
    })
    .await
    .context("Telegram transport failed")?;

    info!(
        "Shut down ({} conversation(s) still in progress)",
        handler.session_count().await
    );
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
