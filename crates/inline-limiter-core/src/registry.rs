//! Group registry
//!
//! Owns every [`GroupState`] behind a single async mutex. Message handlers,
//! admin commands and periodic tasks all go through [`GroupRegistry::lock`],
//! so counter updates are serialized.

use crate::config::{DATA_NAMESPACE, GROUPS_KEY};
use crate::group::GroupState;
use crate::setup::GroupSetup;
use crate::storage::{load_json, save_json, KvStore, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Group states keyed by chat id
pub struct GroupTable {
    groups: HashMap<String, GroupState>,
    default_setup: GroupSetup,
}

impl GroupTable {
    /// Get the state of a chat, creating it with the default setup on miss.
    pub fn get_or_create(&mut self, chat_id: &str) -> &mut GroupState {
        let setup = self.default_setup;
        self.groups.entry(chat_id.to_string()).or_insert_with(|| {
            info!("New group {chat_id}");
            GroupState::new(chat_id, setup)
        })
    }

    /// Get the state of a known chat.
    #[must_use]
    pub fn get(&self, chat_id: &str) -> Option<&GroupState> {
        self.groups.get(chat_id)
    }

    /// Iterate over every chat.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GroupState> {
        self.groups.values_mut()
    }

    /// Number of chats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no chat was seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn snapshot(&self) -> Vec<GroupState> {
        let mut groups: Vec<GroupState> = self.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.chat_id.cmp(&b.chat_id));
        groups
    }
}

/// Single owner of all group states
pub struct GroupRegistry {
    table: Mutex<GroupTable>,
    store: Arc<dyn KvStore>,
    /// Held across snapshot and write so snapshots land in order
    persist_lock: Mutex<()>,
}

impl GroupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(default_setup: GroupSetup, store: Arc<dyn KvStore>) -> Self {
        Self::from_groups(Vec::new(), default_setup, store)
    }

    /// Restore the registry from the store.
    ///
    /// A missing or unreadable record yields an empty registry. Groups stored
    /// without any setup get `default_setup`.
    pub async fn load(default_setup: GroupSetup, store: Arc<dyn KvStore>) -> Self {
        let groups = match load_json::<Vec<GroupState>>(store.as_ref(), DATA_NAMESPACE, GROUPS_KEY)
            .await
        {
            Ok(groups) => groups.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load groups, starting fresh: {}", e);
                Vec::new()
            }
        };
        info!("Loaded {} groups", groups.len());
        Self::from_groups(groups, default_setup, store)
    }

    fn from_groups(
        groups: Vec<GroupState>,
        default_setup: GroupSetup,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let groups = groups
            .into_iter()
            .map(|mut group| {
                if group.setup.is_unset() {
                    group.setup = default_setup;
                }
                (group.chat_id.clone(), group)
            })
            .collect();

        Self {
            table: Mutex::new(GroupTable {
                groups,
                default_setup,
            }),
            store,
            persist_lock: Mutex::new(()),
        }
    }

    /// Lock the group table. Do not hold the guard across transport calls.
    pub async fn lock(&self) -> MutexGuard<'_, GroupTable> {
        self.table.lock().await
    }

    /// Write a snapshot of every group.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn persist(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.lock().await.snapshot();
        save_json(self.store.as_ref(), DATA_NAMESPACE, GROUPS_KEY, &snapshot).await
    }

    /// Persist and log failures; in-memory state stays authoritative.
    pub async fn checkpoint(&self) {
        if let Err(e) = self.persist().await {
            error!("Failed to persist groups: {}", e);
        }
    }
}
