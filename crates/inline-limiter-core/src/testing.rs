//! Testing helpers.
//!
//! An in-memory [`ChatTransport`] that records every call, and a [`Harness`]
//! wiring it to a registry, queue and notifier over a [`MemoryStore`].

use crate::config::LimiterSettings;
use crate::moderation::Moderator;
use crate::notify::Notifier;
use crate::queue::DelayedActionQueue;
use crate::registry::GroupRegistry;
use crate::storage::{KvStore, MemoryStore};
use crate::transport::{ChatTransport, MemberRole, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A message sent through [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Target chat
    pub chat_id: i64,
    /// Assigned message id
    pub message_id: i32,
    /// Message text
    pub text: String,
    /// Replied-to message id
    pub reply_to: Option<i32>,
}

#[derive(Default)]
struct Recorded {
    sent: Vec<SentMessage>,
    deleted: Vec<(i64, i32)>,
    roles: HashMap<(i64, i64), MemberRole>,
    failing_deletes: HashSet<(i64, i32)>,
}

/// Transport fake that records sends and deletes.
///
/// Message ids start at 1000 and increase. Unknown members are
/// [`MemberRole::Member`].
pub struct RecordingTransport {
    state: Mutex<Recorded>,
    next_id: AtomicI32,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Recorded::default()),
            next_id: AtomicI32::new(1000),
        }
    }

    fn state(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give `user_id` a role in `chat_id`.
    pub fn set_role(&self, chat_id: i64, user_id: i64, role: MemberRole) {
        self.state().roles.insert((chat_id, user_id), role);
    }

    /// Make deleting this message fail.
    pub fn fail_delete(&self, chat_id: i64, message_id: i32) {
        self.state().failing_deletes.insert((chat_id, message_id));
    }

    /// Messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Successful deletions so far.
    #[must_use]
    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.state().deleted.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, TransportError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.state().sent.push(SentMessage {
            chat_id,
            message_id,
            text: text.to_string(),
            reply_to,
        });
        Ok(message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.failing_deletes.contains(&(chat_id, message_id)) {
            return Err(TransportError::Request("message can't be deleted".into()));
        }
        state.deleted.push((chat_id, message_id));
        Ok(())
    }

    async fn member_role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole, TransportError> {
        Ok(self
            .state()
            .roles
            .get(&(chat_id, user_id))
            .copied()
            .unwrap_or(MemberRole::Member))
    }
}

/// Registry, queue and notifier over a recording transport
pub struct Harness {
    /// Shared settings (defaults)
    pub settings: LimiterSettings,
    /// Backing store
    pub store: Arc<dyn KvStore>,
    /// Transport fake
    pub transport: Arc<RecordingTransport>,
    /// Group registry
    pub registry: Arc<GroupRegistry>,
    /// Delayed-action queue
    pub queue: Arc<DelayedActionQueue>,
    /// Notifier over `transport` and `queue`
    pub notifier: Notifier,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Harness over a fresh [`MemoryStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Harness over an existing store.
    #[must_use]
    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        let settings = LimiterSettings::default();
        let transport = Arc::new(RecordingTransport::new());
        let registry = Arc::new(GroupRegistry::new(settings.default_setup(), store.clone()));
        let queue = Arc::new(DelayedActionQueue::new(store.clone()));
        let notifier = Notifier::new(transport.clone(), queue.clone());
        Self {
            settings,
            store,
            transport,
            registry,
            queue,
            notifier,
        }
    }

    /// Moderator sharing this harness' state.
    #[must_use]
    pub fn moderator(&self) -> Moderator {
        Moderator::new(
            self.registry.clone(),
            self.notifier.clone(),
            Arc::new(self.settings.clone()),
        )
    }
}
