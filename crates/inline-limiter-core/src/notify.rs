//! Self-destructing notifications.

use crate::queue::DelayedActionQueue;
use crate::transport::ChatTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends bot messages and schedules their deletion
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn ChatTransport>,
    queue: Arc<DelayedActionQueue>,
}

impl Notifier {
    /// Create a notifier over a transport and a queue.
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, queue: Arc<DelayedActionQueue>) -> Self {
        Self { transport, queue }
    }

    /// Underlying transport
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    /// Send a message that stays. Returns its id, `None` if sending failed.
    pub async fn send(&self, chat_id: i64, text: &str) -> Option<i32> {
        self.deliver(chat_id, text, None).await
    }

    /// Reply to a message with a message that stays.
    pub async fn reply(&self, chat_id: i64, reply_to: i32, text: &str) -> Option<i32> {
        self.deliver(chat_id, text, Some(reply_to)).await
    }

    /// Send a message deleted after `ttl`.
    pub async fn send_self_destructing(
        &self,
        chat_id: i64,
        text: &str,
        ttl: Duration,
    ) -> Option<i32> {
        let message_id = self.deliver(chat_id, text, None).await?;
        if !ttl.is_zero() {
            self.queue.schedule(chat_id, message_id, ttl).await;
        }
        Some(message_id)
    }

    /// Reply to a message; both the reply and the original go after `ttl`.
    pub async fn reply_self_destructing(
        &self,
        chat_id: i64,
        reply_to: i32,
        text: &str,
        ttl: Duration,
    ) -> Option<i32> {
        let message_id = self.deliver(chat_id, text, Some(reply_to)).await?;
        self.queue.schedule(chat_id, reply_to, ttl).await;
        self.queue.schedule(chat_id, message_id, ttl).await;
        Some(message_id)
    }

    /// Delete a message right away; failures are logged only.
    pub async fn delete(&self, chat_id: i64, message_id: i32) {
        if let Err(e) = self.transport.delete_message(chat_id, message_id).await {
            warn!("Failed to delete message {message_id} in {chat_id}: {e}");
        }
    }

    async fn deliver(&self, chat_id: i64, text: &str, reply_to: Option<i32>) -> Option<i32> {
        match self.transport.send_message(chat_id, text, reply_to).await {
            Ok(message_id) => {
                debug!(chat_id, message_id, "[SEND MSG]");
                Some(message_id)
            }
            Err(e) => {
                warn!("Failed to send message to {chat_id}: {e}");
                None
            }
        }
    }
}
