//! Configuration module for the rental bot.
//!
//! Handles loading of Telegram API credentials and bot settings
//! (storage path, geocoder endpoint) from the environment.

mod settings;

pub use settings::{BotSettings, ConfigError, DEFAULT_GEOCODER_URL, TelegramConfig};
