//! Bot settings loaded from the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default Nominatim endpoint used for address lookups.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Bot token issued by `@BotFather`.
    pub bot_token: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("bot.session")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String, bot_token: String) -> Self {
        Self {
            api_id,
            api_hash,
            bot_token,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID`, `TG_API_HASH` and `TELEGRAM_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let bot_token = std::env::var("TELEGRAM_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("TELEGRAM_TOKEN"))?;
        if !looks_like_bot_token(&bot_token) {
            return Err(ConfigError::InvalidBotToken);
        }

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_path,
        })
    }
}

/// `@BotFather` tokens look like `123456:AA...`.
fn looks_like_bot_token(token: &str) -> bool {
    token
        .split_once(':')
        .is_some_and(|(id, secret)| {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
        })
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the listings JSON store.
    #[serde(default = "default_listings_path")]
    pub listings_path: PathBuf,

    /// Contact e-mail sent to the geocoder in the `User-Agent` header.
    #[serde(default = "default_bot_email")]
    pub bot_email: String,

    /// Base URL of the Nominatim-compatible geocoder.
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Maximum number of address candidates requested per lookup.
    #[serde(default = "default_geocoder_limit")]
    pub geocoder_limit: usize,
}

fn default_listings_path() -> PathBuf {
    PathBuf::from("listings.json")
}

fn default_bot_email() -> String {
    "default@example.com".to_owned()
}

fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_owned()
}

fn default_geocoder_limit() -> usize {
    10
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            listings_path: default_listings_path(),
            bot_email: default_bot_email(),
            geocoder_url: default_geocoder_url(),
            geocoder_limit: default_geocoder_limit(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            listings_path: std::env::var("LISTINGS_PATH")
                .map_or_else(|_| default_listings_path(), PathBuf::from),
            bot_email: std::env::var("BOT_EMAIL").unwrap_or_else(|_| default_bot_email()),
            geocoder_url: std::env::var("GEOCODER_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|_| default_geocoder_url()),
            geocoder_limit: std::env::var("GEOCODER_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&limit: &usize| limit > 0)
                .unwrap_or_else(default_geocoder_limit),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("TELEGRAM_TOKEN does not look like a bot token (expected <id>:<secret>)")]
    InvalidBotToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.listings_path, PathBuf::from("listings.json"));
        assert_eq!(settings.geocoder_url, DEFAULT_GEOCODER_URL);
        assert_eq!(settings.geocoder_limit, 10);
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned(), "1:token".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.session_path, PathBuf::from("bot.session"));
    }

    #[test]
    fn test_bot_token_shape() {
        assert!(looks_like_bot_token("123456:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(!looks_like_bot_token("no-colon"));
        assert!(!looks_like_bot_token("abc:secret"));
        assert!(!looks_like_bot_token("123:"));
    }
}
