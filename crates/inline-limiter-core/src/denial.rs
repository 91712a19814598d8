//! Flood protection for "admins only" replies
//!
//! Non-admins poking at admin commands get one self-destructing answer per
//! cooldown period; further attempts are silenced so the bot does not spam
//! the chat or trip Telegram's rate limits.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Remembers recent denials per chat member
#[derive(Clone)]
pub struct DenialCache {
    /// (chat_id, user_id) -> () with TTL equal to the cooldown
    cache: Cache<(i64, i64), ()>,
    silenced_count: Arc<AtomicU64>,
}

impl DenialCache {
    /// Creates a cache that allows one denial per `cooldown` and member
    ///
    /// # Examples
    ///
    /// ```
    /// use inline_limiter_core::denial::DenialCache;
    /// use std::time::Duration;
    ///
    /// let cache = DenialCache::new(Duration::from_secs(60), 10_000);
    /// assert_eq!(cache.silenced_count(), 0);
    /// ```
    #[must_use]
    pub fn new(cooldown: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(cooldown)
            .build();

        Self {
            cache,
            silenced_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a denial should be sent to this member now
    ///
    /// Only every 100th silenced attempt is logged.
    pub async fn should_send(&self, chat_id: i64, user_id: i64) -> bool {
        if self.cache.get(&(chat_id, user_id)).await.is_none() {
            return true;
        }

        let count = self.silenced_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 100 == 0 {
            debug!("Silenced {count} denials (recent: user {user_id} in {chat_id})");
        }
        false
    }

    /// Starts the cooldown after a denial went out
    pub async fn mark_sent(&self, chat_id: i64, user_id: i64) {
        self.cache.insert((chat_id, user_id), ()).await;
    }

    /// Total number of silenced attempts
    #[must_use]
    pub fn silenced_count(&self) -> u64 {
        self.silenced_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cooldown_blocks_second_denial() {
        let cache = DenialCache::new(Duration::from_secs(60), 100);

        assert!(cache.should_send(-1, 7).await);
        cache.mark_sent(-1, 7).await;
        assert!(!cache.should_send(-1, 7).await);
        assert_eq!(cache.silenced_count(), 1);
    }

    #[tokio::test]
    async fn test_members_and_chats_independent() {
        let cache = DenialCache::new(Duration::from_secs(60), 100);
        cache.mark_sent(-1, 7).await;

        assert!(cache.should_send(-1, 8).await);
        assert!(cache.should_send(-2, 7).await);
    }
}
