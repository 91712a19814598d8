//! Periodic usage digest
//!
//! Once a day every active chat gets a self-destructing report of how many
//! inline messages were allowed and blocked since the previous one. The
//! report drifts toward the 23:30 slot: after 12 hours it fires as soon as
//! local time is past 23:30, and after 24 hours it fires regardless.

use crate::config::{LimiterSettings, BOT_STAT_KEY, DATA_NAMESPACE, SUMMARY_INTERVAL};
use crate::notify::Notifier;
use crate::registry::GroupRegistry;
use crate::scheduler::PeriodicTask;
use crate::storage::{load_json, save_json, KvStore};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Process-wide reporting state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStat {
    /// When the last summary went out
    pub last_summary_sent_time: DateTime<Utc>,
}

/// Whether a summary is due at `now` given the previous one at `last`.
#[must_use]
pub fn is_due<Tz: TimeZone>(last: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    let elapsed = now.with_timezone(&Utc) - last;
    elapsed >= TimeDelta::hours(24)
        || (elapsed >= TimeDelta::hours(12) && now.hour() == 23 && now.minute() >= 30)
}

/// Counts reported for one chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDigest {
    /// Chat id
    pub chat_id: String,
    /// Every message seen
    pub total: u32,
    /// Accepted inline messages
    pub allowed: u32,
    /// Blocked inline messages
    pub blocked: u32,
}

impl GroupDigest {
    /// Render the digest covering `hours`.
    #[must_use]
    pub fn render(&self, hours: i64) -> String {
        format!(
            "In the past <code>{hours}</code> hours, there are <code>{}</code> msgs handled by this bot.\n\
             In the <code>{}</code> inline msgs, there are:\n\
             <code>{}</code> allowed\n\
             <code>{}</code> blocked",
            self.total,
            self.allowed + self.blocked,
            self.allowed,
            self.blocked
        )
    }
}

/// Sends digests and resets rolling counts
pub struct SummaryReporter {
    registry: Arc<GroupRegistry>,
    notifier: Notifier,
    store: Arc<dyn KvStore>,
    stat: Mutex<BotStat>,
    message_ttl: Duration,
    pacing: Duration,
}

impl SummaryReporter {
    /// Restore the reporter. Without a stored stat the last summary is
    /// assumed to be 12 hours old, so nothing fires right after first start.
    pub async fn load(
        registry: Arc<GroupRegistry>,
        notifier: Notifier,
        store: Arc<dyn KvStore>,
        settings: &LimiterSettings,
    ) -> Self {
        let stored = match load_json::<BotStat>(store.as_ref(), DATA_NAMESPACE, BOT_STAT_KEY).await
        {
            Ok(stat) => stat,
            Err(e) => {
                warn!("Failed to load bot stat: {}", e);
                None
            }
        };

        let reporter = Self {
            registry,
            notifier,
            store,
            stat: Mutex::new(stored.unwrap_or(BotStat {
                last_summary_sent_time: Utc::now() - TimeDelta::hours(12),
            })),
            message_ttl: settings.summary_message_ttl(),
            pacing: settings.summary_pacing(),
        };
        if stored.is_none() {
            reporter.persist_stat().await;
        }
        reporter
    }

    /// When the last summary went out.
    pub async fn last_sent(&self) -> DateTime<Utc> {
        self.stat.lock().await.last_summary_sent_time
    }

    /// Send digests for the period ending at `now`. Returns how many chats got one.
    pub async fn report(&self, now: DateTime<Utc>) -> usize {
        let last = self.last_sent().await;
        let elapsed_secs = (now - last).num_seconds().max(0);
        let hours = (elapsed_secs + 3599) / 3600;
        info!("--- {hours}H SUMMARY ---");

        let digests = self.collect().await;
        let mut sent = 0;
        for (i, digest) in digests.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pacing).await;
            }
            let Ok(chat_id) = digest.chat_id.parse::<i64>() else {
                warn!("Skipping summary for malformed chat id {}", digest.chat_id);
                continue;
            };
            if self
                .notifier
                .send_self_destructing(chat_id, &digest.render(hours), self.message_ttl)
                .await
                .is_some()
            {
                sent += 1;
            }
        }

        self.stat.lock().await.last_summary_sent_time = now;
        self.persist_stat().await;
        self.registry.checkpoint().await;
        sent
    }

    async fn collect(&self) -> Vec<GroupDigest> {
        let mut table = self.registry.lock().await;
        let mut digests = Vec::new();
        for group in table.iter_mut() {
            info!(
                "[{}] total:{} inline:{} block:{}",
                group.chat_id,
                group.chat_count + group.inline_count,
                group.inline_count,
                group.block_count
            );
            if group.inline_count > 0 {
                digests.push(GroupDigest {
                    chat_id: group.chat_id.clone(),
                    total: group.inline_count + group.block_count + group.chat_count,
                    allowed: group.inline_count,
                    blocked: group.block_count,
                });
            }
            group.reset_rolling_counts();
        }
        digests.sort_by(|a, b| a.chat_id.cmp(&b.chat_id));
        digests
    }

    async fn persist_stat(&self) {
        let stat = *self.stat.lock().await;
        if let Err(e) = save_json(self.store.as_ref(), DATA_NAMESPACE, BOT_STAT_KEY, &stat).await {
            error!("Failed to persist bot stat: {}", e);
        }
    }
}

#[async_trait]
impl PeriodicTask for SummaryReporter {
    fn name(&self) -> &'static str {
        "summary reporter"
    }

    fn interval(&self) -> Duration {
        SUMMARY_INTERVAL
    }

    async fn tick(&self) {
        if is_due(self.last_sent().await, &Local::now()) {
            self.report(Utc::now()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::spawn_periodic;
    use crate::storage::MemoryStore;
    use crate::testing::Harness;
    use chrono::FixedOffset;
    use tokio_util::sync::CancellationToken;

    fn local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .and_then(|tz| tz.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).single())
            .expect("valid local time")
    }

    #[test]
    fn test_fires_after_a_full_day_at_any_hour() {
        let now = local(10, 0);
        let last = now.with_timezone(&Utc) - TimeDelta::hours(25);
        assert!(is_due(last, &now));
    }

    #[test]
    fn test_fires_in_evening_slot_after_half_a_day() {
        let now = local(23, 31);
        let last = now.with_timezone(&Utc) - TimeDelta::hours(13);
        assert!(is_due(last, &now));
    }

    #[test]
    fn test_waits_outside_evening_slot() {
        let now = local(10, 0);
        let last = now.with_timezone(&Utc) - TimeDelta::hours(13);
        assert!(!is_due(last, &now));

        let early = local(23, 29);
        let last = early.with_timezone(&Utc) - TimeDelta::hours(13);
        assert!(!is_due(last, &early));

        let late = local(23, 45);
        let last = late.with_timezone(&Utc) - TimeDelta::hours(11);
        assert!(!is_due(last, &late));
    }

    #[test]
    fn test_digest_text() {
        let digest = GroupDigest {
            chat_id: "-1".into(),
            total: 10,
            allowed: 3,
            blocked: 2,
        };
        let text = digest.render(24);
        assert!(text.contains("past <code>24</code> hours"));
        assert!(text.contains("<code>10</code> msgs"));
        assert!(text.contains("<code>5</code> inline msgs"));
        assert!(text.contains("<code>3</code> allowed"));
        assert!(text.contains("<code>2</code> blocked"));
    }

    #[tokio::test]
    async fn test_first_run_creates_past_stat() {
        let h = Harness::new();
        let reporter = SummaryReporter::load(
            h.registry.clone(),
            h.notifier.clone(),
            h.store.clone(),
            &h.settings,
        )
        .await;

        let age = Utc::now() - reporter.last_sent().await;
        assert!(age >= TimeDelta::hours(12) && age < TimeDelta::hours(13));
        let stored: Option<BotStat> = load_json(h.store.as_ref(), DATA_NAMESPACE, BOT_STAT_KEY)
            .await
            .expect("stat readable");
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_report_sends_active_groups_and_resets_all() {
        let h = Harness::new();
        {
            let mut table = h.registry.lock().await;
            let active = table.get_or_create("-100");
            active.evaluate_inline("1", "gif");
            active.classify(crate::group::MessageKind::Chat);
            table.get_or_create("-200").classify(crate::group::MessageKind::Chat);
        }
        let reporter =
            SummaryReporter::load(h.registry.clone(), h.notifier.clone(), h.store.clone(), &h.settings)
                .await;
        let now = reporter.last_sent().await + TimeDelta::minutes(25 * 60 + 1);

        assert_eq!(reporter.report(now).await, 1);

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, -100);
        assert!(sent[0].text.contains("past <code>26</code> hours"));
        assert_eq!(h.queue.len().await, 1, "digest self-destructs");
        assert_eq!(reporter.last_sent().await, now);

        let table = h.registry.lock().await;
        for chat in ["-100", "-200"] {
            let group = table.get(chat).expect("group exists");
            assert_eq!((group.inline_count, group.chat_count, group.block_count), (0, 0, 0));
        }
    }

    #[tokio::test]
    async fn test_stat_survives_reload() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let h = Harness::with_store(store.clone());
        let reporter =
            SummaryReporter::load(h.registry.clone(), h.notifier.clone(), store.clone(), &h.settings)
                .await;
        let now = Utc::now();
        reporter.report(now).await;

        let reloaded =
            SummaryReporter::load(h.registry.clone(), h.notifier.clone(), store, &h.settings).await;
        assert_eq!(
            reloaded.last_sent().await.timestamp_millis(),
            now.timestamp_millis()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_tick_sends_overdue_summary() {
        let h = Harness::new();
        let last = Utc::now() - TimeDelta::hours(25);
        save_json(
            h.store.as_ref(),
            DATA_NAMESPACE,
            BOT_STAT_KEY,
            &BotStat {
                last_summary_sent_time: last,
            },
        )
        .await
        .expect("stat stored");
        h.registry
            .lock()
            .await
            .get_or_create("-100")
            .evaluate_inline("1", "gif");
        let reporter = Arc::new(
            SummaryReporter::load(h.registry.clone(), h.notifier.clone(), h.store.clone(), &h.settings)
                .await,
        );

        let cancel = CancellationToken::new();
        let handle = spawn_periodic(reporter.clone(), cancel.clone());
        tokio::time::sleep(SUMMARY_INTERVAL + Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.expect("task joins");

        assert!(reporter.last_sent().await > last);
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("past <code>26</code> hours"));
    }
}
