//! Persisted delayed-deletion queue
//!
//! Every bot notice that should disappear is recorded here together with its
//! due time. The list is written to the store on every change so pending
//! deletions survive a restart; overdue entries fire on the first drain after
//! startup.

use crate::config::{DATA_NAMESPACE, DELAYED_ACTIONS_KEY, DRAIN_INTERVAL};
use crate::scheduler::PeriodicTask;
use crate::storage::{load_json, save_json, KvStore};
use crate::transport::ChatTransport;
use crate::utils::deadline_after;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// A message to delete once `due` has passed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedAction {
    /// Chat holding the message
    pub chat_id: i64,
    /// Message to delete
    pub message_id: i32,
    /// Deletion time
    pub due: DateTime<Utc>,
}

impl DelayedAction {
    /// Whether the action should fire at `now`
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Sole owner of the pending deletions
pub struct DelayedActionQueue {
    actions: Mutex<Vec<DelayedAction>>,
    store: Arc<dyn KvStore>,
}

impl DelayedActionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            store,
        }
    }

    /// Restore pending deletions; an unreadable record yields an empty queue.
    pub async fn load(store: Arc<dyn KvStore>) -> Self {
        let actions = match load_json::<Vec<DelayedAction>>(
            store.as_ref(),
            DATA_NAMESPACE,
            DELAYED_ACTIONS_KEY,
        )
        .await
        {
            Ok(actions) => actions.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load delayed actions, starting empty: {}", e);
                Vec::new()
            }
        };
        debug!("Loaded {} delayed actions", actions.len());
        Self {
            actions: Mutex::new(actions),
            store,
        }
    }

    /// Delete `message_id` once `timeout` has elapsed.
    pub async fn schedule(&self, chat_id: i64, message_id: i32, timeout: Duration) {
        self.schedule_at(chat_id, message_id, deadline_after(Utc::now(), timeout))
            .await;
    }

    /// Delete `message_id` at `due`.
    pub async fn schedule_at(&self, chat_id: i64, message_id: i32, due: DateTime<Utc>) {
        let mut actions = self.actions.lock().await;
        actions.push(DelayedAction {
            chat_id,
            message_id,
            due,
        });
        self.persist(&actions).await;
    }

    /// Number of pending deletions.
    pub async fn len(&self) -> usize {
        self.actions.lock().await.len()
    }

    /// Whether nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.actions.lock().await.is_empty()
    }

    /// Issue every deletion due at `now`. Returns how many were attempted.
    ///
    /// Due entries leave the queue before the deletes go out; a failed
    /// delete is logged and not retried.
    pub async fn drain(&self, transport: &dyn ChatTransport, now: DateTime<Utc>) -> usize {
        let due = {
            let mut actions = self.actions.lock().await;
            if !actions.iter().any(|a| a.is_due(now)) {
                return 0;
            }
            let (due, pending): (Vec<_>, Vec<_>) =
                actions.drain(..).partition(|a| a.is_due(now));
            *actions = pending;
            self.persist(&actions).await;
            due
        };

        for action in &due {
            match transport
                .delete_message(action.chat_id, action.message_id)
                .await
            {
                Ok(()) => debug!(
                    chat_id = action.chat_id,
                    message_id = action.message_id,
                    "[DELETE MSG]"
                ),
                Err(e) => warn!(
                    "Failed to delete message {} in {}: {}",
                    action.message_id, action.chat_id, e
                ),
            }
        }
        due.len()
    }

    async fn persist(&self, actions: &[DelayedAction]) {
        if let Err(e) = save_json(
            self.store.as_ref(),
            DATA_NAMESPACE,
            DELAYED_ACTIONS_KEY,
            &actions,
        )
        .await
        {
            error!("Failed to persist delayed actions: {}", e);
        }
    }
}

/// One-second drain of the delayed-action queue
pub struct DrainTask {
    queue: Arc<DelayedActionQueue>,
    transport: Arc<dyn ChatTransport>,
}

impl DrainTask {
    /// Create the drain task.
    #[must_use]
    pub fn new(queue: Arc<DelayedActionQueue>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { queue, transport }
    }
}

#[async_trait]
impl PeriodicTask for DrainTask {
    fn name(&self) -> &'static str {
        "delayed-action drain"
    }

    fn interval(&self) -> Duration {
        DRAIN_INTERVAL
    }

    async fn tick(&self) {
        self.queue.drain(self.transport.as_ref(), Utc::now()).await;
    }
}
