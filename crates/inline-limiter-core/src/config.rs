//! Configuration and settings management
//!
//! Loads limiter settings from config files and environment variables and
//! defines the valid ranges for admin-provided limits.

use crate::setup::GroupSetup;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest accepted user burnout limit.
pub const BURNOUT_LIMIT_MIN: u32 = 0;
/// Largest accepted user burnout limit.
pub const BURNOUT_LIMIT_MAX: u32 = 13;
/// Smallest accepted user cooldown window in minutes.
pub const COOLDOWN_MINUTES_MIN: u32 = 5;
/// Largest accepted user cooldown window in minutes.
pub const COOLDOWN_MINUTES_MAX: u32 = 1440;
/// Smallest accepted bot burnout limit.
pub const BOT_BURNOUT_LIMIT_MIN: u32 = 1;
/// Largest accepted bot burnout limit.
pub const BOT_BURNOUT_LIMIT_MAX: u32 = 1440;
/// Smallest accepted bot cooldown window in minutes.
pub const BOT_COOLDOWN_MINUTES_MIN: u32 = 1;
/// Largest accepted bot cooldown window in minutes.
pub const BOT_COOLDOWN_MINUTES_MAX: u32 = 1440;

/// Decay tick period.
pub const DECAY_INTERVAL: Duration = Duration::from_secs(60);
/// Summary check period.
pub const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);
/// Delayed-action drain period.
pub const DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// Lifetime of the `/help` message.
pub const HELP_MESSAGE_TTL: Duration = Duration::from_secs(300);
/// Lifetime of usage replies and the command they answer.
pub const USAGE_MESSAGE_TTL: Duration = Duration::from_secs(60);

/// Persistence namespace for all records.
///
/// The record keys below avoid `inline`, `msg2delete` and `bot`: the
/// previous bot stored differently shaped records under those names in the
/// same namespace, and they are left untouched.
pub const DATA_NAMESPACE: &str = "data";
/// Record key for the group state collection.
pub const GROUPS_KEY: &str = "groups";
/// Record key for the delayed-action list.
pub const DELAYED_ACTIONS_KEY: &str = "delayed_actions";
/// Record key for the bot process stat.
pub const BOT_STAT_KEY: &str = "bot_stat";

/// Limiter settings loaded from config files and the environment
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimiterSettings {
    /// Directory holding the JSON records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Burnout limit applied to chats seen for the first time
    #[serde(default = "default_burnout_limit")]
    pub default_burnout_limit: u32,
    /// Cooldown window applied to chats seen for the first time
    #[serde(default = "default_cooldown_minutes")]
    pub default_cooldown_minutes: u32,
    /// Lifetime of burnout warnings in seconds
    #[serde(default = "default_warning_timeout_secs")]
    pub warning_timeout_secs: u64,
    /// Messages older than this are ignored (seconds)
    #[serde(default = "default_stale_message_secs")]
    pub stale_message_secs: i64,
    /// Lifetime of summary digests in hours
    #[serde(default = "default_summary_message_ttl_hours")]
    pub summary_message_ttl_hours: u64,
    /// Delay between two digest dispatches in milliseconds
    #[serde(default = "default_summary_pacing_ms")]
    pub summary_pacing_ms: u64,
    /// Silence period for repeated "admins only" replies in seconds
    #[serde(default = "default_denial_cooldown_secs")]
    pub denial_cooldown_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("db")
}

const fn default_burnout_limit() -> u32 {
    4
}

const fn default_cooldown_minutes() -> u32 {
    240
}

const fn default_warning_timeout_secs() -> u64 {
    15
}

const fn default_stale_message_secs() -> i64 {
    60
}

const fn default_summary_message_ttl_hours() -> u64 {
    6
}

const fn default_summary_pacing_ms() -> u64 {
    200
}

const fn default_denial_cooldown_secs() -> u64 {
    60
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_burnout_limit: default_burnout_limit(),
            default_cooldown_minutes: default_cooldown_minutes(),
            warning_timeout_secs: default_warning_timeout_secs(),
            stale_message_secs: default_stale_message_secs(),
            summary_message_ttl_hours: default_summary_message_ttl_hours(),
            summary_pacing_ms: default_summary_pacing_ms(),
            denial_cooldown_secs: default_denial_cooldown_secs(),
        }
    }
}

/// Build the layered configuration shared by every settings struct.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE env vars map to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl LimiterSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the default setup is out
    /// of the range admins may configure.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.validated()
    }

    /// Reject a default setup that `/setup` would refuse.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the valid ranges.
    pub fn validated(self) -> Result<Self, ConfigError> {
        GroupSetup::validated(self.default_burnout_limit, self.default_cooldown_minutes)
            .map_err(|e| ConfigError::Message(format!("default setup: {e}")))?;
        Ok(self)
    }

    /// Setup given to chats without a stored configuration
    #[must_use]
    pub const fn default_setup(&self) -> GroupSetup {
        GroupSetup {
            burnout_limit: self.default_burnout_limit,
            cooldown_minutes: self.default_cooldown_minutes,
        }
    }

    /// Lifetime of burnout warnings
    #[must_use]
    pub const fn warning_timeout(&self) -> Duration {
        Duration::from_secs(self.warning_timeout_secs)
    }

    /// Lifetime of summary digests
    #[must_use]
    pub const fn summary_message_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_message_ttl_hours * 3600)
    }

    /// Delay between two digest dispatches
    #[must_use]
    pub const fn summary_pacing(&self) -> Duration {
        Duration::from_millis(self.summary_pacing_ms)
    }
}
