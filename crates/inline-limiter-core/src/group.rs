//! Per-chat limiter state.

use crate::counter::EntityCounter;
use crate::setup::{BotLimit, GroupSetup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of message for the rolling totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Accepted inline message
    Inline,
    /// Plain chat message
    Chat,
    /// Blocked inline message
    Blocked,
}

/// Verdict for one inline message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineDecision {
    /// The message stays
    Allowed,
    /// The sender reached the chat limit
    UserBurned {
        /// Minutes until the user's count resets
        cooldown: u32,
    },
    /// The inline bot reached its own limit
    BotBurned {
        /// Bot username
        bot: String,
        /// Minutes until the bot's count resets
        cooldown: u32,
        /// First detection in this episode
        first_warning: bool,
    },
}

/// Limiter state of one chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupState {
    /// Chat id
    pub chat_id: String,
    /// User-facing configuration
    #[serde(default)]
    pub setup: GroupSetup,
    #[serde(default)]
    users: HashMap<String, EntityCounter>,
    #[serde(default)]
    bots: HashMap<String, EntityCounter>,
    /// Accepted inline messages since the last summary
    #[serde(default)]
    pub inline_count: u32,
    /// Plain messages since the last summary
    #[serde(default)]
    pub chat_count: u32,
    /// Blocked inline messages since the last summary
    #[serde(default)]
    pub block_count: u32,
}

impl GroupState {
    /// Fresh state for a chat seen for the first time.
    #[must_use]
    pub fn new(chat_id: impl Into<String>, setup: GroupSetup) -> Self {
        Self {
            chat_id: chat_id.into(),
            setup,
            users: HashMap::new(),
            bots: HashMap::new(),
            inline_count: 0,
            chat_count: 0,
            block_count: 0,
        }
    }

    /// Look up a user counter, creating it with the chat window on miss.
    pub fn user_counter(&mut self, user_id: &str) -> &mut EntityCounter {
        let cooldown = self.setup.cooldown_minutes;
        self.users
            .entry(user_id.to_string())
            .or_insert_with(|| EntityCounter::user(user_id, cooldown))
    }

    /// Look up a bot counter. Bots without a limit have no counter.
    #[must_use]
    pub fn bot_counter(&self, bot: &str) -> Option<&EntityCounter> {
        self.bots.get(bot)
    }

    /// All bot counters, for display.
    pub fn bot_counters(&self) -> impl Iterator<Item = &EntityCounter> {
        self.bots.values()
    }

    /// Number of tracked users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Create a bot limit, or update the configuration of an existing one.
    pub fn set_bot_limit(&mut self, bot: &str, limit: BotLimit) {
        self.bots
            .entry(bot.to_string())
            .and_modify(|counter| counter.limit = Some(limit))
            .or_insert_with(|| EntityCounter::bot(bot, limit));
    }

    /// Drop a bot limit. Returns whether one existed.
    pub fn remove_bot_limit(&mut self, bot: &str) -> bool {
        self.bots.remove(bot).is_some()
    }

    /// Bump the rolling total for `kind`.
    pub fn classify(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Inline => self.inline_count += 1,
            MessageKind::Chat => self.chat_count += 1,
            MessageKind::Blocked => self.block_count += 1,
        }
    }

    /// Decide whether an inline message from `user_id` via `bot` may stay.
    ///
    /// User burnout is checked first and suppresses any bot accounting for
    /// the message. A burned bot is flagged as warned on first detection.
    pub fn evaluate_inline(&mut self, user_id: &str, bot: &str) -> InlineDecision {
        let limit = self.setup.burnout_limit;
        let window = self.setup.cooldown_minutes;

        let user = self.user_counter(user_id);
        if user.is_burned_out(limit) {
            let cooldown = user.cooldown;
            self.classify(MessageKind::Blocked);
            return InlineDecision::UserBurned { cooldown };
        }

        if let Some(counter) = self.bots.get_mut(bot) {
            let bot_limit = counter.limit.map_or(u32::MAX, |l| l.burnout_limit);
            if counter.is_burned_out(bot_limit) {
                let first_warning = !counter.warned;
                counter.warned = true;
                let decision = InlineDecision::BotBurned {
                    bot: counter.id.clone(),
                    cooldown: counter.cooldown,
                    first_warning,
                };
                self.classify(MessageKind::Blocked);
                return decision;
            }
        }

        self.user_counter(user_id).record_message(window);
        if let Some(counter) = self.bots.get_mut(bot) {
            let bot_window = counter.limit.map_or(0, |l| l.cooldown_minutes);
            counter.record_message(bot_window);
        }
        self.classify(MessageKind::Inline);
        InlineDecision::Allowed
    }

    /// One-line counter summary for logs.
    #[must_use]
    pub fn describe(&self, user_id: &str, bot: Option<&str>) -> String {
        let user_count = self.users.get(user_id).map_or(0, |u| u.count);
        let mut details = format!(
            "Chat {} User @{}:{}/{}",
            self.chat_id, user_id, user_count, self.setup.burnout_limit
        );
        if let Some(counter) = bot.and_then(|b| self.bots.get(b)) {
            let limit = counter.limit.map_or(0, |l| l.burnout_limit);
            details.push_str(&format!(" Bot @{}:{}/{}", counter.id, counter.count, limit));
        }
        details
    }

    /// Heatsink: forget every user and cool down every bot.
    pub fn reset_all_burnout(&mut self) {
        self.users.clear();
        for counter in self.bots.values_mut() {
            counter.reset();
        }
    }

    /// Zero the rolling totals after a summary.
    pub fn reset_rolling_counts(&mut self) {
        self.inline_count = 0;
        self.chat_count = 0;
        self.block_count = 0;
    }

    /// Age every armed cooldown by one minute.
    pub fn decay_one_minute(&mut self) {
        let window = self.setup.cooldown_minutes;
        for user in self.users.values_mut().filter(|u| u.cooldown > 0) {
            user.decay_one_minute(window);
        }
        for bot in self.bots.values_mut().filter(|b| b.cooldown > 0) {
            let bot_window = bot.limit.map_or(0, |l| l.cooldown_minutes);
            bot.decay_one_minute(bot_window);
        }
    }
}
