//! Burnout counter shared by users and inline bots.
//!
//! A counter accumulates accepted inline messages. Its cooldown is armed when
//! the first message of an episode arrives and is then aged down by the decay
//! task; when it runs out the count starts over.

use crate::setup::BotLimit;
use serde::{Deserialize, Serialize};

/// Burnout state of one user or one inline bot within one chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounter {
    /// User id or bot username
    pub id: String,
    /// Inline messages accepted since the last reset
    #[serde(default)]
    pub count: u32,
    /// Minutes left until `count` resets
    #[serde(default)]
    pub cooldown: u32,
    /// Bot-specific limit; `None` for user counters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<BotLimit>,
    /// Whether the persistent burnout notice was sent this episode
    #[serde(default)]
    pub warned: bool,
}

impl EntityCounter {
    /// Counter for a user seen for the first time.
    #[must_use]
    pub fn user(id: impl Into<String>, cooldown: u32) -> Self {
        Self {
            id: id.into(),
            count: 0,
            cooldown,
            limit: None,
            warned: false,
        }
    }

    /// Counter for a bot that just got a limit.
    #[must_use]
    pub fn bot(id: impl Into<String>, limit: BotLimit) -> Self {
        Self {
            id: id.into(),
            count: 0,
            cooldown: 0,
            limit: Some(limit),
            warned: false,
        }
    }

    /// Count one accepted message, arming the cooldown on the first one.
    pub fn record_message(&mut self, window: u32) {
        self.count += 1;
        if self.count == 1 {
            self.cooldown = window;
        }
    }

    /// Whether the counter reached `limit`.
    #[must_use]
    pub const fn is_burned_out(&self, limit: u32) -> bool {
        self.count >= limit
    }

    /// Age the cooldown by one minute.
    ///
    /// A cooldown longer than `window` is first clamped to it (the window may
    /// have shrunk since it was armed). Reaching zero resets the episode.
    pub fn decay_one_minute(&mut self, window: u32) {
        self.cooldown = self.cooldown.min(window).saturating_sub(1);
        if self.cooldown == 0 {
            self.reset();
        }
    }

    /// Forget the current episode without touching the configuration.
    pub fn reset(&mut self) {
        self.count = 0;
        self.warned = false;
    }
}
