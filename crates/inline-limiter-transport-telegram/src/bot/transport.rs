//! Bot API binding of the core [`ChatTransport`].

use crate::bot::resilient::{
    delete_message_once, get_chat_member_resilient, send_message_resilient,
};
use async_trait::async_trait;
use inline_limiter_core::transport::{ChatTransport, MemberRole, TransportError};
use teloxide::types::{ChatId, ChatMemberKind, MessageId, UserId};
use teloxide::Bot;

/// Sends, deletes and looks up members through a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Map a Bot API member kind onto a limiter role.
#[must_use]
pub fn member_role(kind: &ChatMemberKind) -> MemberRole {
    if kind.is_owner() {
        MemberRole::Owner
    } else if kind.is_administrator() {
        MemberRole::Administrator
    } else if kind.is_banned() {
        MemberRole::Banned
    } else if kind.is_left() {
        MemberRole::Left
    } else if kind.is_restricted() {
        MemberRole::Restricted
    } else {
        MemberRole::Member
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, TransportError> {
        let msg = send_message_resilient(&self.bot, ChatId(chat_id), text, reply_to.map(MessageId))
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(msg.id.0)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        delete_message_once(&self.bot, ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| TransportError::Request(e.to_string()))
    }

    async fn member_role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole, TransportError> {
        let user = u64::try_from(user_id)
            .map_err(|_| TransportError::InvalidId(format!("user {user_id}")))?;
        let member = get_chat_member_resilient(&self.bot, ChatId(chat_id), UserId(user))
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(member_role(&member.kind))
    }
}
