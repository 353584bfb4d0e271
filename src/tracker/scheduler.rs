//! Timer scheduling for the tracker.
//!
//! One explicit scheduler with cancellable handles, instead of chained
//! interval/timeout timers. Holders keep each handle in a named slot and
//! cancel it before re-arming, so repeated re-initialization never
//! accumulates duplicate timers.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Handle to one scheduled task. Dropping the handle does not cancel the
/// task; call `cancel`.
pub struct ScheduledHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TrackerScheduler;

impl TrackerScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Run `task` once after `delay`, unless cancelled first.
    pub fn schedule_once<F, Fut>(&self, delay: Duration, task: F) -> ScheduledHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => task().await,
                _ = child.cancelled() => {}
            }
        });

        ScheduledHandle { token, handle }
    }

    /// Run `task` every `period` until cancelled. The first run happens
    /// one full period after scheduling.
    pub fn schedule_repeating<F, Fut>(&self, period: Duration, mut task: F) -> ScheduledHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; consume that tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => task().await,
                    _ = child.cancelled() => break,
                }
            }
        });

        ScheduledHandle { token, handle }
    }
}
