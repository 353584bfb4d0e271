//! Best-effort sync between the local buffers and the server.
//!
//! Every push attempts an immediate fire-and-forget sync. Failed records
//! stay buffered and are retried by the 30 second flush loop (or the
//! next mutation); buffer capacity bounds retry growth.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisScores;
use crate::models::ConsumptionDraft;
use crate::tracker::scheduler::{ScheduledHandle, TrackerScheduler};

use super::{RingBuffer, ANALYSIS_HISTORY_CAP, CONSUMPTION_QUEUE_CAP};

pub const FLUSH_INTERVAL_SECS: u64 = 30;

/// One completed analysis, kept client-side for history and synced
/// opportunistically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    pub url: String,
    pub scores: AnalysisScores,
    pub analyzed_at: DateTime<Utc>,
}

/// Network boundary for the client. The server-side implementation maps
/// drafts onto `update_session` calls.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn sync_consumption(&self, draft: &ConsumptionDraft) -> Result<()>;
    async fn sync_analysis(&self, entry: &AnalysisEntry) -> Result<()>;
}

struct QueueState {
    analysis: RingBuffer<AnalysisEntry>,
    drafts: RingBuffer<ConsumptionDraft>,
    /// Authoritative flush cursor: the one place a flush attempt is
    /// recorded, shared by the interval loop and ad-hoc flushes.
    last_flush: Option<DateTime<Utc>>,
}

pub struct SyncQueue {
    state: Mutex<QueueState>,
    transport: Arc<dyn SyncTransport>,
    /// Serializes flush passes so the interval loop and push-triggered
    /// flushes never interleave over the same buffer head.
    flush_lock: tokio::sync::Mutex<()>,
    flush_task: Mutex<Option<ScheduledHandle>>,
}

impl SyncQueue {
    pub fn new(transport: Arc<dyn SyncTransport>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                analysis: RingBuffer::new(ANALYSIS_HISTORY_CAP),
                drafts: RingBuffer::new(CONSUMPTION_QUEUE_CAP),
                last_flush: None,
            }),
            transport,
            flush_lock: tokio::sync::Mutex::new(()),
            flush_task: Mutex::new(None),
        })
    }

    /// Buffer a draft and kick off an immediate best-effort sync.
    pub fn push_draft(self: &Arc<Self>, draft: ConsumptionDraft) {
        {
            let mut state = self.state.lock().unwrap();
            if state.drafts.push(draft).is_some() {
                warn!("consumption queue full, evicted oldest draft");
            }
        }
        self.spawn_flush();
    }

    pub fn push_analysis(self: &Arc<Self>, entry: AnalysisEntry) {
        {
            let mut state = self.state.lock().unwrap();
            if state.analysis.push(entry).is_some() {
                debug!("analysis history full, evicted oldest entry");
            }
        }
        self.spawn_flush();
    }

    fn spawn_flush(self: &Arc<Self>) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            queue.flush().await;
        });
    }

    /// Drain both buffers head-first, stopping a buffer on its first
    /// transport failure. Failed records stay put for the next pass.
    pub async fn flush(&self) {
        let _guard = self.flush_lock.lock().await;

        {
            let mut state = self.state.lock().unwrap();
            state.last_flush = Some(Utc::now());
        }

        loop {
            let Some(draft) = self.state.lock().unwrap().drafts.front().cloned() else {
                break;
            };
            match self.transport.sync_consumption(&draft).await {
                Ok(()) => {
                    self.state.lock().unwrap().drafts.pop_front();
                }
                Err(err) => {
                    debug!("consumption sync failed, will retry: {err:#}");
                    break;
                }
            }
        }

        loop {
            let Some(entry) = self.state.lock().unwrap().analysis.front().cloned() else {
                break;
            };
            match self.transport.sync_analysis(&entry).await {
                Ok(()) => {
                    self.state.lock().unwrap().analysis.pop_front();
                }
                Err(err) => {
                    debug!("analysis sync failed, will retry: {err:#}");
                    break;
                }
            }
        }
    }

    /// Start (or restart) the periodic flush loop. Restarting cancels the
    /// previous timer, so re-initialization never stacks intervals.
    pub fn start(self: &Arc<Self>, scheduler: &TrackerScheduler) {
        let queue = Arc::clone(self);
        let handle = scheduler.schedule_repeating(
            Duration::from_secs(FLUSH_INTERVAL_SECS),
            move || {
                let queue = Arc::clone(&queue);
                async move {
                    queue.flush().await;
                }
            },
        );

        let mut task = self.flush_task.lock().unwrap();
        if let Some(previous) = task.take() {
            previous.cancel();
        }
        *task = Some(handle);
    }

    pub fn stop(&self) {
        if let Some(handle) = self.flush_task.lock().unwrap().take() {
            handle.cancel();
        }
    }

    /// Best-effort drain on unload. Loss on abrupt termination is
    /// tolerated by design.
    pub async fn flush_now(&self) {
        self.flush().await;
    }

    pub fn pending_drafts(&self) -> usize {
        self.state.lock().unwrap().drafts.len()
    }

    pub fn pending_analysis(&self) -> usize {
        self.state.lock().unwrap().analysis.len()
    }

    pub fn last_flush(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().last_flush
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FlakyTransport {
        failing: AtomicBool,
        attempts: AtomicUsize,
        synced: AtomicUsize,
    }

    impl FlakyTransport {
        fn new(failing: bool) -> Arc<Self> {
            Arc::new(Self {
                failing: AtomicBool::new(failing),
                attempts: AtomicUsize::new(0),
                synced: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SyncTransport for FlakyTransport {
        async fn sync_consumption(&self, _draft: &ConsumptionDraft) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("offline");
            }
            self.synced.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn sync_analysis(&self, _entry: &AnalysisEntry) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("offline");
            }
            Ok(())
        }
    }

    fn draft(url: &str) -> ConsumptionDraft {
        ConsumptionDraft {
            content_type: ContentType::Article,
            url: Some(url.to_string()),
            title: None,
            time_spent_seconds: 30,
            scroll_depth_percent: 40.0,
            credibility_score: None,
            bias_score: None,
            captured_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn failed_sync_keeps_record_buffered_until_retry() {
        let transport = FlakyTransport::new(true);
        let queue = SyncQueue::new(transport.clone() as Arc<dyn SyncTransport>);

        queue.push_draft(draft("https://example.com/a"));
        queue.flush().await;
        assert_eq!(queue.pending_drafts(), 1);

        transport.failing.store(false, Ordering::SeqCst);
        queue.flush().await;
        assert_eq!(queue.pending_drafts(), 0);
        assert_eq!(transport.synced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sustained_offline_use_is_bounded_by_capacity() {
        let transport = FlakyTransport::new(true);
        let queue = SyncQueue::new(transport as Arc<dyn SyncTransport>);

        for i in 0..(CONSUMPTION_QUEUE_CAP + 25) {
            queue.push_draft(draft(&format!("https://example.com/{i}")));
        }
        queue.flush().await;
        assert_eq!(queue.pending_drafts(), CONSUMPTION_QUEUE_CAP);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_the_flush_loop_never_stacks_intervals() {
        let transport = FlakyTransport::new(true);
        let queue = SyncQueue::new(transport.clone() as Arc<dyn SyncTransport>);

        // one buffered draft that keeps failing, so every flush pass
        // makes exactly one transport attempt
        queue.push_draft(draft("https://example.com/a"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        let baseline = transport.attempts.load(Ordering::SeqCst);

        let scheduler = TrackerScheduler::new();
        queue.start(&scheduler);
        queue.start(&scheduler);
        queue.start(&scheduler);

        // a single live 30s timer ticks at 30, 60 and 90
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), baseline + 3);

        queue.stop();
    }

    #[tokio::test]
    async fn flush_records_the_cursor() {
        let transport = FlakyTransport::new(false);
        let queue = SyncQueue::new(transport as Arc<dyn SyncTransport>);
        assert!(queue.last_flush().is_none());
        queue.flush().await;
        assert!(queue.last_flush().is_some());
    }
}
