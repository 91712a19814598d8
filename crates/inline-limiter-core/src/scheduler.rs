//! Periodic task runner
//!
//! Each recurring activity (decay, summary, queue drain) is a
//! [`PeriodicTask`] with its own interval, spawned on the tokio runtime and
//! stopped through a shared cancellation token.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A recurring activity
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;
    /// Time between two ticks
    fn interval(&self) -> Duration;
    /// Run one tick
    async fn tick(&self);
}

/// Run `task` every `task.interval()` until `cancel` fires.
///
/// The first tick happens one interval after spawning. A slow tick delays the
/// following ones instead of bursting to catch up.
pub fn spawn_periodic(task: Arc<dyn PeriodicTask>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = task.interval();
        info!("Starting {} (every {:?})", task.name(), period);

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Stopping {}", task.name());
                    break;
                }
                _ = ticker.tick() => task.tick().await,
            }
        }
    })
}
