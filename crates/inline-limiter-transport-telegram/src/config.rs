//! Telegram transport settings.

use config::ConfigError;
use inline_limiter_core::config::LimiterSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Initial delay before retrying a failed Bot API call.
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for the retry delay.
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Retries after the first attempt.
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Pause after the dispatcher stops, before the process exits.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(1);

fn default_health_ping_secs() -> u64 {
    60
}

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token (`BOT_TOKEN`).
    pub bot_token: String,
    /// Uptime-Kuma push URL (`KUMA_PUSH_URL`); no pings when unset.
    #[serde(default)]
    pub kuma_push_url: Option<String>,
    /// Seconds between two health pings.
    #[serde(default = "default_health_ping_secs")]
    pub health_ping_secs: u64,
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Limiter settings shared with the core.
    pub limiter: Arc<LimiterSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(limiter: LimiterSettings, telegram: TelegramSettings) -> Self {
        Self {
            limiter: Arc::new(limiter),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        inline_limiter_core::config::build_config()?.try_deserialize()
    }

    /// Push URL, if configured and not blank.
    #[must_use]
    pub fn health_url(&self) -> Option<&str> {
        self.kuma_push_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Delay between health pings, at least one second.
    #[must_use]
    pub fn health_ping_interval(&self) -> Duration {
        Duration::from_secs(self.health_ping_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::TelegramSettings;
    use config::Config;
    use std::time::Duration;

    #[test]
    fn test_token_only_uses_defaults() -> Result<(), config::ConfigError> {
        let settings: TelegramSettings = Config::builder()
            .set_override("bot_token", "123:abc")?
            .build()?
            .try_deserialize()?;

        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.health_url(), None);
        assert_eq!(settings.health_ping_interval(), Duration::from_secs(60));
        Ok(())
    }

    #[test]
    fn test_blank_push_url_is_ignored() {
        let mut settings = TelegramSettings {
            bot_token: "dummy".to_string(),
            kuma_push_url: Some("  ".to_string()),
            health_ping_secs: 0,
        };
        assert_eq!(settings.health_url(), None);
        assert_eq!(settings.health_ping_interval(), Duration::from_secs(1));

        settings.kuma_push_url = Some("https://kuma.example/api/push/x".to_string());
        assert_eq!(settings.health_url(), Some("https://kuma.example/api/push/x"));
    }
}
