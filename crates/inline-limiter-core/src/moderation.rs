//! Inbound message moderation
//!
//! Every group message passes through [`Moderator::handle_message`]: inline
//! messages are judged against the chat's burnout limits, everything else is
//! counted as chat traffic and offered to the admin command parser.

use crate::admin::AdminCommand;
use crate::config::LimiterSettings;
use crate::denial::DenialCache;
use crate::group::{InlineDecision, MessageKind};
use crate::notify::Notifier;
use crate::registry::GroupRegistry;
use crate::utils::{escape_html, mention_html};
use chrono::{DateTime, Local, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Log target for per-message verdicts
pub const VERDICT_TARGET: &str = "inline_limiter::verdict";

const DENIAL_CACHE_CAPACITY: u64 = 10_000;

/// A chat message as seen by the limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the message was posted in
    pub chat_id: i64,
    /// Message id within the chat
    pub message_id: i32,
    /// Sender user id
    pub sender_id: i64,
    /// Sender display name
    pub sender_name: String,
    /// Posted in a group or supergroup
    pub is_group: bool,
    /// Text or caption
    pub text: Option<String>,
    /// Inline bot the message was sent through
    pub via_bot: Option<String>,
    /// Inline bot of the replied-to message, if any
    pub reply_to_via_bot: Option<String>,
    /// Send time
    pub sent_at: DateTime<Utc>,
}

/// Applies the limiter to inbound messages
pub struct Moderator {
    pub(crate) registry: Arc<GroupRegistry>,
    pub(crate) notifier: Notifier,
    pub(crate) denials: DenialCache,
    pub(crate) settings: Arc<LimiterSettings>,
}

impl Moderator {
    /// Create a moderator over shared state.
    #[must_use]
    pub fn new(
        registry: Arc<GroupRegistry>,
        notifier: Notifier,
        settings: Arc<LimiterSettings>,
    ) -> Self {
        let denials = DenialCache::new(
            Duration::from_secs(settings.denial_cooldown_secs),
            DENIAL_CACHE_CAPACITY,
        );
        Self {
            registry,
            notifier,
            denials,
            settings,
        }
    }

    /// Handle one inbound message at `now`.
    ///
    /// Returns the verdict for inline messages, `None` for anything else.
    pub async fn handle_message(
        &self,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Option<InlineDecision> {
        if now - msg.sent_at > TimeDelta::seconds(self.settings.stale_message_secs) {
            debug!(
                chat_id = msg.chat_id,
                message_id = msg.message_id,
                "Ignoring stale message"
            );
            return None;
        }

        if let Some(bot) = msg.via_bot.as_deref() {
            if msg.is_group {
                return Some(self.moderate_inline(msg, bot, now).await);
            }
            return None;
        }

        if msg.is_group {
            self.registry
                .lock()
                .await
                .get_or_create(&msg.chat_id.to_string())
                .classify(MessageKind::Chat);
        }

        if let Some(command) = msg.text.as_deref().and_then(AdminCommand::parse) {
            self.handle_command(msg, command).await;
        }
        None
    }

    async fn moderate_inline(
        &self,
        msg: &InboundMessage,
        bot: &str,
        now: DateTime<Utc>,
    ) -> InlineDecision {
        let user_id = msg.sender_id.to_string();
        let (decision, details) = {
            let mut table = self.registry.lock().await;
            let group = table.get_or_create(&msg.chat_id.to_string());
            let decision = group.evaluate_inline(&user_id, bot);
            (decision, group.describe(&user_id, Some(bot)))
        };

        let label = match decision {
            InlineDecision::Allowed => "[ALLOWED]",
            InlineDecision::UserBurned { .. } => "[BURNED](USER)",
            InlineDecision::BotBurned { .. } => "[BURNED](BOT)",
        };
        info!(target: VERDICT_TARGET, "{label} {details}");

        match &decision {
            InlineDecision::Allowed => {}
            InlineDecision::UserBurned { cooldown } => {
                self.notifier.delete(msg.chat_id, msg.message_id).await;
                let notice = format!(
                    "{}, your inline message burned out! It may take significant time for resetting. {cooldown} minutes left.",
                    mention_html(msg.sender_id, &msg.sender_name)
                );
                self.notifier
                    .send_self_destructing(msg.chat_id, &notice, self.settings.warning_timeout())
                    .await;
            }
            InlineDecision::BotBurned {
                bot,
                cooldown,
                first_warning,
            } => {
                self.notifier.delete(msg.chat_id, msg.message_id).await;
                let mut notice = format!(
                    "Bot @{} burned out! It may take significant time for resetting.",
                    escape_html(bot)
                );
                if *first_warning {
                    let until = now.with_timezone(&Local) + TimeDelta::minutes(i64::from(*cooldown));
                    notice.push_str(&format!(" Until {}.", until.format("%H:%M")));
                    self.notifier.send(msg.chat_id, &notice).await;
                } else {
                    notice.push_str(&format!(" {cooldown} minutes left."));
                    self.notifier
                        .send_self_destructing(
                            msg.chat_id,
                            &notice,
                            self.settings.warning_timeout(),
                        )
                        .await;
                }
            }
        }
        decision
    }
}
