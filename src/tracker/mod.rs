//! Client-side activity tracker.
//!
//! Observes one page view at a time, never blocks the host: analysis and
//! sync are fire-and-forget through the scheduler and the sync queue.

pub mod bridge;
pub mod config;
pub mod extract;
pub mod page_view;
pub mod scheduler;

pub use bridge::{PageEvent, PageNode, PageSnapshot};
pub use config::TrackerConfig;
pub use page_view::PageViewTracker;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::analysis::AnalysisProvider;
use crate::buffer::{AnalysisEntry, SyncQueue};

use scheduler::{ScheduledHandle, TrackerScheduler};

pub struct Tracker {
    config: TrackerConfig,
    scheduler: TrackerScheduler,
    queue: Arc<SyncQueue>,
    provider: Arc<dyn AnalysisProvider>,
    view: Arc<Mutex<Option<PageViewTracker>>>,
    analysis_timer: std::sync::Mutex<Option<ScheduledHandle>>,
}

impl Tracker {
    pub fn new(
        config: TrackerConfig,
        queue: Arc<SyncQueue>,
        provider: Arc<dyn AnalysisProvider>,
    ) -> Arc<Self> {
        let scheduler = TrackerScheduler::new();
        queue.start(&scheduler);

        Arc::new(Self {
            config,
            scheduler,
            queue,
            provider,
            view: Arc::new(Mutex::new(None)),
            analysis_timer: std::sync::Mutex::new(None),
        })
    }

    /// Begin observing a new page view. Any previous view is closed out
    /// (its draft buffered) and its pending analysis timer cancelled, so
    /// navigation never leaks timers or double-logs.
    pub async fn open_page(self: &Arc<Self>, snapshot: PageSnapshot) {
        let now = Utc::now();

        {
            let mut slot = self.view.lock().await;
            if let Some(previous) = slot.as_mut() {
                previous.handle_event(PageEvent::Unloaded { at: now });
                if let Some(draft) = previous.take_draft(now) {
                    self.queue.push_draft(draft);
                }
            }
            *slot = Some(PageViewTracker::new(&snapshot, self.config.clone(), now));
        }

        self.arm_analysis_timer(snapshot.url);
    }

    /// Debounced, one-shot analysis request: fires once per page view,
    /// a few seconds after settle, and only if the view still shows the
    /// same URL and enough text.
    fn arm_analysis_timer(self: &Arc<Self>, url: String) {
        let delay = Duration::from_secs(self.config.analysis_debounce_secs);
        let view = Arc::clone(&self.view);
        let provider = Arc::clone(&self.provider);
        let queue = Arc::clone(&self.queue);

        let handle = self.scheduler.schedule_once(delay, move || async move {
            let text = {
                let mut slot = view.lock().await;
                match slot.as_mut() {
                    Some(current) if current.url() == url => current.claim_analysis(),
                    _ => None,
                }
            };
            let Some(text) = text else {
                return;
            };

            match provider.analyze(&text).await {
                Ok(scores) => {
                    let mut slot = view.lock().await;
                    if let Some(current) = slot.as_mut() {
                        if current.url() == url {
                            current.set_scores(scores);
                        }
                    }
                    queue.push_analysis(AnalysisEntry {
                        url,
                        scores,
                        analyzed_at: Utc::now(),
                    });
                }
                Err(err) => {
                    // Analysis is optional; consumption logging proceeds.
                    warn!("analysis request failed for {url}: {err:#}");
                }
            }
        });

        let mut timer = self.analysis_timer.lock().unwrap();
        if let Some(previous) = timer.take() {
            previous.cancel();
        }
        *timer = Some(handle);
    }

    pub async fn handle_event(&self, event: PageEvent) {
        let mut slot = self.view.lock().await;
        let Some(current) = slot.as_mut() else {
            return;
        };

        let hiding = matches!(
            event,
            PageEvent::VisibilityChanged { visible: false, .. } | PageEvent::Unloaded { .. }
        );
        current.handle_event(event);

        if hiding {
            if let Some(draft) = current.take_draft(event.at()) {
                self.queue.push_draft(draft);
            }
        }
    }

    /// Unload path: close the current view, drain the queue best-effort,
    /// stop timers.
    pub async fn shutdown(&self) {
        let now = Utc::now();
        {
            let mut slot = self.view.lock().await;
            if let Some(current) = slot.as_mut() {
                current.handle_event(PageEvent::Unloaded { at: now });
                debug!(
                    "closing page view {} with engagement {:.2}",
                    current.url(),
                    current.engagement_score()
                );
                if let Some(draft) = current.take_draft(now) {
                    self.queue.push_draft(draft);
                }
            }
            *slot = None;
        }

        if let Some(handle) = self.analysis_timer.lock().unwrap().take() {
            handle.cancel();
        }
        self.queue.stop();
        self.queue.flush_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisScores;
    use crate::buffer::SyncTransport;
    use crate::models::ConsumptionDraft;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        drafts: AtomicUsize,
        analyses: AtomicUsize,
    }

    #[async_trait]
    impl SyncTransport for CountingTransport {
        async fn sync_consumption(&self, _draft: &ConsumptionDraft) -> Result<()> {
            self.drafts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn sync_analysis(&self, _entry: &AnalysisEntry) -> Result<()> {
            self.analyses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::analysis::AnalysisProvider for CountingProvider {
        async fn analyze(&self, _text: &str) -> Result<AnalysisScores> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisScores::new(0.8, 0.3))
        }
    }

    fn article() -> PageSnapshot {
        let text = "lorem ".repeat(100);
        PageSnapshot {
            url: "https://news.example.com/story".into(),
            title: "Story".into(),
            author: None,
            publish_date: None,
            content_type_hint: None,
            body: PageNode::new("body")
                .with_child(PageNode::new("article").with_text(text.trim_end())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_fires_once_after_debounce() {
        let transport = Arc::new(CountingTransport {
            drafts: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
        });
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let queue = SyncQueue::new(transport.clone() as Arc<dyn SyncTransport>);
        let tracker = Tracker::new(TrackerConfig::default(), queue, provider.clone());

        tracker.open_page(article()).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // Nothing re-arms for the same page view
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        tracker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn navigating_before_debounce_cancels_the_pending_request() {
        let transport = Arc::new(CountingTransport {
            drafts: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
        });
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let queue = SyncQueue::new(transport.clone() as Arc<dyn SyncTransport>);
        let tracker = Tracker::new(TrackerConfig::default(), queue, provider.clone());

        tracker.open_page(article()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut second = article();
        second.url = "https://news.example.com/other".into();
        tracker.open_page(second).await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        // Only the second page's request fired
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        tracker.shutdown().await;
    }
}
