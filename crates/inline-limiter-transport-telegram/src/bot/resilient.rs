//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Transient failures (network, I/O, flood control) of sends and member
//! lookups are retried with exponential backoff and jitter. API errors such as
//! "bot was blocked" fail immediately. Deletions are never retried.

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};
use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatMember, Message, MessageId, ParseMode, ReplyParameters, UserId};
use teloxide::RequestError;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Whether a failed request is worth retrying.
#[must_use]
pub fn is_transient(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Run a Bot API operation, retrying transient failures.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, is_transient)
        .await
        .map_err(|e| {
            if is_transient(&e) {
                warn!(
                    "Telegram API operation failed after {} retries: {}",
                    TELEGRAM_API_MAX_RETRIES, e
                );
            }
            e
        })
}

/// Send an HTML message, optionally as a reply, with automatic retry.
///
/// # Errors
///
/// Returns an error once retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    reply_to: Option<MessageId>,
) -> Result<Message> {
    retry_telegram_operation(move || async move {
        let mut req = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(id).allow_sending_without_reply());
        }
        req.await
    })
    .await
    .map_err(|e| anyhow!("Telegram send error: {e}"))
}

/// Delete a message with a single attempt.
///
/// Deletions are best-effort: a queued deletion that fails is dropped, and
/// retrying here would hold up the rest of the drain.
///
/// # Errors
///
/// Returns an error if the message cannot be deleted.
pub async fn delete_message_once(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> Result<()> {
    bot.delete_message(chat_id, msg_id)
        .await
        .map(|_| ())
        .map_err(|e| anyhow!("Telegram delete error: {e}"))
}

/// Look up a chat member with automatic retry.
///
/// # Errors
///
/// Returns an error once retries are exhausted.
pub async fn get_chat_member_resilient(
    bot: &Bot,
    chat_id: ChatId,
    user_id: UserId,
) -> Result<ChatMember> {
    retry_telegram_operation(move || async move { bot.get_chat_member(chat_id, user_id).await })
        .await
        .map_err(|e| anyhow!("Telegram get_chat_member error: {e}"))
}
