//! Cooldown decay.

use crate::config::DECAY_INTERVAL;
use crate::registry::GroupRegistry;
use crate::scheduler::PeriodicTask;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Ages every armed cooldown by one minute per tick
pub struct DecayTask {
    registry: Arc<GroupRegistry>,
}

impl DecayTask {
    /// Create the decay task.
    #[must_use]
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self { registry }
    }

    /// Decay every group once.
    pub async fn sweep(&self) {
        let mut table = self.registry.lock().await;
        for group in table.iter_mut() {
            group.decay_one_minute();
        }
    }
}

#[async_trait]
impl PeriodicTask for DecayTask {
    fn name(&self) -> &'static str {
        "cooldown decay"
    }

    fn interval(&self) -> Duration {
        DECAY_INTERVAL
    }

    async fn tick(&self) {
        self.sweep().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::InlineDecision;
    use crate::setup::GroupSetup;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_user_recovers_after_window() {
        let setup = GroupSetup {
            burnout_limit: 1,
            cooldown_minutes: 3,
        };
        let registry = Arc::new(GroupRegistry::new(setup, Arc::new(MemoryStore::new())));
        let decay = DecayTask::new(registry.clone());

        {
            let mut table = registry.lock().await;
            let group = table.get_or_create("-1");
            assert_eq!(group.evaluate_inline("7", "gif"), InlineDecision::Allowed);
            assert!(matches!(
                group.evaluate_inline("7", "gif"),
                InlineDecision::UserBurned { cooldown: 3 }
            ));
        }

        for _ in 0..2 {
            decay.sweep().await;
        }
        assert!(matches!(
            registry.lock().await.get_or_create("-1").evaluate_inline("7", "gif"),
            InlineDecision::UserBurned { cooldown: 1 }
        ));

        decay.sweep().await;
        assert_eq!(
            registry.lock().await.get_or_create("-1").evaluate_inline("7", "gif"),
            InlineDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_shrunk_setup_clamps_cooldown() {
        let setup = GroupSetup {
            burnout_limit: 4,
            cooldown_minutes: 240,
        };
        let registry = Arc::new(GroupRegistry::new(setup, Arc::new(MemoryStore::new())));
        {
            let mut table = registry.lock().await;
            let group = table.get_or_create("-1");
            group.evaluate_inline("7", "gif");
            group.setup.cooldown_minutes = 5;
        }

        DecayTask::new(registry.clone()).sweep().await;

        let mut table = registry.lock().await;
        assert_eq!(table.get_or_create("-1").user_counter("7").cooldown, 4);
    }
}
