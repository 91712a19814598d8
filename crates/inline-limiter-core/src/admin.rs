//! Admin commands
//!
//! `/help`, `/heatsink`, `/setup X,Y` and `/botlimit X,Y`, each optionally
//! addressed as `/command@BotName`. Only chat owners and administrators may
//! run them, and only inside groups.

use crate::config::{HELP_MESSAGE_TTL, USAGE_MESSAGE_TTL};
use crate::moderation::{InboundMessage, Moderator};
use crate::setup::{BotLimit, BotLimitChange, GroupSetup, SetupError};
use crate::utils::escape_html;
use lazy_regex::lazy_regex;
use std::fmt::Write;
use tracing::{info, warn};

/// A parsed admin command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Show usage and the current limits
    Help,
    /// Reset every burnout in the chat
    Heatsink,
    /// Set the chat's user limit; `None` asks for usage
    Setup(Option<(u32, u32)>),
    /// Set the limit of the replied-to inline bot; `None` asks for usage
    BotLimit(Option<(u32, u32)>),
}

fn numeric_args(caps: &regex::Captures<'_>) -> Option<(u32, u32)> {
    // Digit-only captures can only fail on overflow, which range checks reject.
    let arg = |i: usize| {
        caps.get(i)
            .map(|m| m.as_str().parse::<u32>().unwrap_or(u32::MAX))
    };
    Some((arg(1)?, arg(2)?))
}

impl AdminCommand {
    /// Parse a message text into a command.
    ///
    /// # Examples
    ///
    /// ```
    /// use inline_limiter_core::admin::AdminCommand;
    ///
    /// assert_eq!(AdminCommand::parse("/help@LimiterBot"), Some(AdminCommand::Help));
    /// assert_eq!(AdminCommand::parse("/setup 4, 240"), Some(AdminCommand::Setup(Some((4, 240)))));
    /// assert_eq!(AdminCommand::parse("/setup"), Some(AdminCommand::Setup(None)));
    /// assert_eq!(AdminCommand::parse("/setup 4"), None);
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        static RE_HELP: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"^/help(?:@\w+)?$");
        static RE_HEATSINK: lazy_regex::Lazy<regex::Regex> =
            lazy_regex!(r"^/heatsink(?:@\w+)?$");
        static RE_SETUP: lazy_regex::Lazy<regex::Regex> =
            lazy_regex!(r"^/setup(?:@\w+)?(?: (\d+),\s?(\d+))?$");
        static RE_BOTLIMIT: lazy_regex::Lazy<regex::Regex> =
            lazy_regex!(r"^/botlimit(?:@\w+)?(?: (\d+),\s?(\d+))?$");

        let text = text.trim();
        if RE_HELP.is_match(text) {
            return Some(Self::Help);
        }
        if RE_HEATSINK.is_match(text) {
            return Some(Self::Heatsink);
        }
        if let Some(caps) = RE_SETUP.captures(text) {
            return Some(Self::Setup(numeric_args(&caps)));
        }
        RE_BOTLIMIT
            .captures(text)
            .map(|caps| Self::BotLimit(numeric_args(&caps)))
    }
}

fn range_hint(error: &SetupError) -> String {
    let SetupError::OutOfRange { burnout, cooldown } = error;
    format!(
        "The valid X value is from {} to {}, and the valid Y value is from {} to {}",
        burnout.start(),
        burnout.end(),
        cooldown.start(),
        cooldown.end()
    )
}

fn setup_usage() -> String {
    format!(
        "Usage: <code>/setup &lt;X&gt;,&lt;Y&gt;</code>\nExample: <code>/setup 4,240</code>\n\n{}",
        range_hint(&GroupSetup::out_of_range())
    )
}

fn botlimit_usage() -> String {
    format!(
        "Usage: REPLY to the inline message <code>/botlimit &lt;X&gt;,&lt;Y&gt;</code>\n\
         Example: reply to message {{User via @InlineBot}} with <code>/botlimit 4,240</code>\n\n\
         {}\nSet the X and Y value to 0 would remove the limit of the bot.",
        range_hint(&BotLimit::out_of_range())
    )
}

impl Moderator {
    /// Run an admin command on behalf of the sender of `msg`.
    pub async fn handle_command(&self, msg: &InboundMessage, command: AdminCommand) {
        if !msg.is_group {
            self.notifier
                .send(msg.chat_id, "Command is only valid in a group.")
                .await;
            return;
        }
        if !self.is_admin(msg).await {
            if self.denials.should_send(msg.chat_id, msg.sender_id).await {
                self.notifier
                    .reply_self_destructing(
                        msg.chat_id,
                        msg.message_id,
                        "Only admins can use this command!",
                        self.settings.warning_timeout(),
                    )
                    .await;
                self.denials.mark_sent(msg.chat_id, msg.sender_id).await;
            }
            return;
        }

        info!(chat_id = msg.chat_id, user_id = msg.sender_id, ?command, "Admin command");
        match command {
            AdminCommand::Help => self.help(msg).await,
            AdminCommand::Heatsink => self.heatsink(msg).await,
            AdminCommand::Setup(None) => self.usage(msg, &setup_usage()).await,
            AdminCommand::Setup(Some((burnout, cooldown))) => {
                self.setup(msg, burnout, cooldown).await;
            }
            AdminCommand::BotLimit(args) => match (args, msg.reply_to_via_bot.as_deref()) {
                (Some((burnout, cooldown)), Some(bot)) => {
                    self.bot_limit(msg, bot, burnout, cooldown).await;
                }
                _ => self.usage(msg, &botlimit_usage()).await,
            },
        }
    }

    async fn is_admin(&self, msg: &InboundMessage) -> bool {
        match self
            .notifier
            .transport()
            .member_role(msg.chat_id, msg.sender_id)
            .await
        {
            Ok(role) => role.is_privileged(),
            Err(e) => {
                warn!(
                    "Failed to get role of {} in {}: {}",
                    msg.sender_id, msg.chat_id, e
                );
                false
            }
        }
    }

    async fn usage(&self, msg: &InboundMessage, text: &str) {
        self.notifier
            .reply_self_destructing(msg.chat_id, msg.message_id, text, USAGE_MESSAGE_TTL)
            .await;
    }

    async fn help(&self, msg: &InboundMessage) {
        let mut help = String::from(
            "This is inline message limiter.\n\
             The inline messages sent exceeding the specified number within the specified time will be deleted.\n\n\
             Command (admin only):\n\
             /help - display help message\n\
             /heatsink - immediately cooldown for everything\n\
             <code>/setup &lt;X&gt;,&lt;Y&gt;</code> - setting user burnout to be triggered by sending X inline messages in Y minutes\n\
             <code>/botlimit &lt;X&gt;,&lt;Y&gt;</code> - reply to the inline message to set the limit of the sender bot",
        );
        {
            let mut table = self.registry.lock().await;
            let group = table.get_or_create(&msg.chat_id.to_string());
            let _ = write!(
                help,
                "\n\nCurrent setup:\nUser allowed {} inline messages in {} minutes.",
                group.setup.burnout_limit, group.setup.cooldown_minutes
            );
            let mut bots: Vec<_> = group.bot_counters().collect();
            bots.sort_by(|a, b| a.id.cmp(&b.id));
            for bot in bots {
                if let Some(limit) = bot.limit {
                    let _ = write!(
                        help,
                        "\nBot @{} allowed {} messages in {} minutes.",
                        escape_html(&bot.id),
                        limit.burnout_limit,
                        limit.cooldown_minutes
                    );
                }
            }
        }
        self.notifier
            .send_self_destructing(msg.chat_id, &help, HELP_MESSAGE_TTL)
            .await;
    }

    async fn heatsink(&self, msg: &InboundMessage) {
        self.registry
            .lock()
            .await
            .get_or_create(&msg.chat_id.to_string())
            .reset_all_burnout();
        self.registry.checkpoint().await;
        self.notifier
            .reply(
                msg.chat_id,
                msg.message_id,
                "Everyone's burnout count has been reset.",
            )
            .await;
    }

    async fn setup(&self, msg: &InboundMessage, burnout: u32, cooldown: u32) {
        let setup = match GroupSetup::validated(burnout, cooldown) {
            Ok(setup) => setup,
            Err(e) => {
                self.notifier
                    .reply(msg.chat_id, msg.message_id, &escape_html(&e.to_string()))
                    .await;
                return;
            }
        };

        self.registry
            .lock()
            .await
            .get_or_create(&msg.chat_id.to_string())
            .setup = setup;
        self.registry.checkpoint().await;
        let reply = format!(
            "Setup update successful\nNow, user burnout is set to be triggered by sending more than <code>{burnout}</code> inline messages in <code>{cooldown}</code> minutes"
        );
        self.notifier
            .reply(msg.chat_id, msg.message_id, &reply)
            .await;
    }

    async fn bot_limit(&self, msg: &InboundMessage, bot: &str, burnout: u32, cooldown: u32) {
        let change = match BotLimit::validated(burnout, cooldown) {
            Ok(change) => change,
            Err(e) => {
                self.notifier
                    .reply(msg.chat_id, msg.message_id, &escape_html(&e.to_string()))
                    .await;
                return;
            }
        };

        let reply = {
            let mut table = self.registry.lock().await;
            let group = table.get_or_create(&msg.chat_id.to_string());
            match change {
                BotLimitChange::Set(limit) => {
                    group.set_bot_limit(bot, limit);
                    format!(
                        "Setup successful\nBot @{}'s limit is set to {} messages in {} minutes",
                        escape_html(bot),
                        limit.burnout_limit,
                        limit.cooldown_minutes
                    )
                }
                BotLimitChange::Remove => {
                    group.remove_bot_limit(bot);
                    "Remove bot limit successful".to_string()
                }
            }
        };
        self.registry.checkpoint().await;
        self.notifier
            .reply(msg.chat_id, msg.message_id, &reply)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use crate::transport::MemberRole;
    use chrono::Utc;

    fn command(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: -100,
            message_id: 50,
            sender_id: 9,
            sender_name: "Admin".into(),
            is_group: true,
            text: Some(text.into()),
            via_bot: None,
            reply_to_via_bot: None,
            sent_at: Utc::now(),
        }
    }

    fn admin_harness() -> Harness {
        let h = Harness::new();
        h.transport.set_role(-100, 9, MemberRole::Administrator);
        h
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(AdminCommand::parse("/heatsink"), Some(AdminCommand::Heatsink));
        assert_eq!(
            AdminCommand::parse("/botlimit@Limiter 0,0"),
            Some(AdminCommand::BotLimit(Some((0, 0))))
        );
        assert_eq!(AdminCommand::parse("/botlimit"), Some(AdminCommand::BotLimit(None)));
        assert_eq!(
            AdminCommand::parse("/setup 99999999999,5"),
            Some(AdminCommand::Setup(Some((u32::MAX, 5))))
        );
        assert_eq!(AdminCommand::parse("hello /help"), None);
        assert_eq!(AdminCommand::parse("/helpme"), None);
    }

    #[tokio::test]
    async fn test_private_chat_is_rejected() {
        let h = admin_harness();
        let mut msg = command("/help");
        msg.is_group = false;
        h.moderator().handle_command(&msg, AdminCommand::Help).await;

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Command is only valid in a group.");
    }

    #[tokio::test]
    async fn test_non_admin_denial_is_throttled() {
        let h = Harness::new();
        let moderator = h.moderator();
        let msg = command("/heatsink");
        moderator.handle_command(&msg, AdminCommand::Heatsink).await;
        moderator.handle_command(&msg, AdminCommand::Heatsink).await;

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Only admins can use this command!");
        assert_eq!(sent[0].reply_to, Some(50));
        assert_eq!(h.queue.len().await, 2, "denial and command self-destruct");
    }

    #[tokio::test]
    async fn test_setup_updates_group_and_persists() {
        let h = admin_harness();
        h.moderator()
            .handle_command(&command("/setup 2,30"), AdminCommand::Setup(Some((2, 30))))
            .await;

        let setup = h.registry.lock().await.get("-100").map(|g| g.setup);
        assert_eq!(
            setup,
            Some(GroupSetup {
                burnout_limit: 2,
                cooldown_minutes: 30
            })
        );
        let sent = h.transport.sent();
        assert!(sent[0].text.starts_with("Setup update successful"));

        let reloaded = crate::registry::GroupRegistry::load(
            h.settings.default_setup(),
            h.store.clone(),
        )
        .await;
        let stored = reloaded.lock().await.get("-100").map(|g| g.setup.burnout_limit);
        assert_eq!(stored, Some(2));
    }

    #[tokio::test]
    async fn test_setup_out_of_range_explains_ranges() {
        let h = admin_harness();
        h.moderator()
            .handle_command(&command("/setup 14,30"), AdminCommand::Setup(Some((14, 30))))
            .await;

        let sent = h.transport.sent();
        assert!(sent[0].text.starts_with("Invalid value."));
        assert!(sent[0].text.contains("from 0 to 13"));
        assert!(h.registry.lock().await.get("-100").is_none());
    }

    #[tokio::test]
    async fn test_setup_usage_self_destructs_with_command() {
        let h = admin_harness();
        h.moderator()
            .handle_command(&command("/setup"), AdminCommand::Setup(None))
            .await;

        let sent = h.transport.sent();
        assert!(sent[0].text.starts_with("Usage: "));
        assert_eq!(h.queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_botlimit_requires_replied_inline_message() {
        let h = admin_harness();
        h.moderator()
            .handle_command(&command("/botlimit 3,10"), AdminCommand::BotLimit(Some((3, 10))))
            .await;

        assert!(h.transport.sent()[0].text.starts_with("Usage: REPLY"));
    }

    #[tokio::test]
    async fn test_botlimit_set_and_remove() {
        let h = admin_harness();
        let moderator = h.moderator();
        let mut msg = command("/botlimit 3,10");
        msg.reply_to_via_bot = Some("gif".into());

        moderator
            .handle_command(&msg, AdminCommand::BotLimit(Some((3, 10))))
            .await;
        let limit = h
            .registry
            .lock()
            .await
            .get("-100")
            .and_then(|g| g.bot_counter("gif").and_then(|c| c.limit));
        assert_eq!(
            limit,
            Some(BotLimit {
                burnout_limit: 3,
                cooldown_minutes: 10
            })
        );

        moderator
            .handle_command(&msg, AdminCommand::BotLimit(Some((0, 0))))
            .await;
        let has_bot = h
            .registry
            .lock()
            .await
            .get("-100")
            .is_some_and(|g| g.bot_counter("gif").is_some());
        assert!(!has_bot);

        let sent = h.transport.sent();
        assert_eq!(
            sent[0].text,
            "Setup successful\nBot @gif's limit is set to 3 messages in 10 minutes"
        );
        assert_eq!(sent[1].text, "Remove bot limit successful");
    }

    #[tokio::test]
    async fn test_help_lists_bot_limits_in_order() {
        let h = admin_harness();
        {
            let mut table = h.registry.lock().await;
            let group = table.get_or_create("-100");
            for bot in ["zeta", "alpha"] {
                group.set_bot_limit(
                    bot,
                    BotLimit {
                        burnout_limit: 5,
                        cooldown_minutes: 15,
                    },
                );
            }
        }
        h.moderator()
            .handle_command(&command("/help"), AdminCommand::Help)
            .await;

        let text = &h.transport.sent()[0].text;
        assert!(text.contains("User allowed 4 inline messages in 240 minutes."));
        let alpha = text.find("Bot @alpha").expect("alpha listed");
        let zeta = text.find("Bot @zeta").expect("zeta listed");
        assert!(alpha < zeta);
        assert_eq!(h.queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_heatsink_resets_users() {
        let h = admin_harness();
        {
            let mut table = h.registry.lock().await;
            let group = table.get_or_create("-100");
            for _ in 0..4 {
                group.evaluate_inline("7", "gif");
            }
        }
        h.moderator()
            .handle_command(&command("/heatsink"), AdminCommand::Heatsink)
            .await;

        let mut table = h.registry.lock().await;
        let group = table.get_or_create("-100");
        assert_eq!(group.user_count(), 0);
        assert_eq!(
            h.transport.sent()[0].text,
            "Everyone's burnout count has been reset."
        );
    }
}
