//! Update handlers: message conversion, moderation and the join greeting.

use anyhow::{anyhow, Result};
use chrono::Utc;
use inline_limiter_core::moderation::{InboundMessage, Moderator};
use inline_limiter_core::notify::Notifier;
use teloxide::types::{Me, Message, User};
use tracing::info;

/// Greeting sent when the bot is added to a group.
pub const JOIN_GREETING: &str =
    "My pleasure to join the group! Inline messages will be limited by me.";

fn bot_name(bot: &User) -> String {
    bot.username.clone().unwrap_or_else(|| bot.id.to_string())
}

/// Convert a Telegram message; messages without a sender yield `None`.
#[must_use]
pub fn inbound_message(msg: &Message) -> Option<InboundMessage> {
    let from = msg.from.as_ref()?;
    Some(InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender_id: from.id.0.cast_signed(),
        sender_name: from.full_name(),
        is_group: msg.chat.is_group() || msg.chat.is_supergroup(),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        via_bot: msg.via_bot.as_ref().map(bot_name),
        reply_to_via_bot: msg
            .reply_to_message()
            .and_then(|reply| reply.via_bot.as_ref())
            .map(bot_name),
        sent_at: msg.date,
    })
}

/// Whether `msg` reports this bot joining the chat.
#[must_use]
pub fn is_bot_added(msg: &Message, me: &Me) -> bool {
    msg.new_chat_members()
        .is_some_and(|members| members.iter().any(|member| member.id == me.id))
}

/// Run a message through the limiter.
///
/// # Errors
///
/// Never fails today; the signature matches the other endpoints.
pub async fn moderate(msg: Message, moderator: &Moderator) -> Result<()> {
    if let Some(inbound) = inbound_message(&msg) {
        moderator.handle_message(&inbound, Utc::now()).await;
    }
    Ok(())
}

/// Say hello in a group the bot was just added to.
///
/// # Errors
///
/// Returns an error if the greeting could not be delivered.
pub async fn greet(msg: Message, notifier: &Notifier) -> Result<()> {
    info!(chat_id = msg.chat.id.0, "Added to a group");
    notifier
        .send(msg.chat.id.0, JOIN_GREETING)
        .await
        .map(|_| ())
        .ok_or_else(|| anyhow!("Greeting not delivered to {}", msg.chat.id))
}
