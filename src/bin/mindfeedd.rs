//! Single-user daemon wiring the full pipeline: the tracker feeds the
//! sync queue, a local transport replays drafts as `update_session`
//! calls, and a periodic loop runs the break check. Intended for local
//! runs and smoke testing; a real deployment puts the transport on the
//! network instead.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};

use mindfeed::analysis::NoopAnalysisProvider;
use mindfeed::buffer::{AnalysisEntry, SyncQueue, SyncTransport};
use mindfeed::models::ConsumptionDraft;
use mindfeed::tracker::scheduler::TrackerScheduler;
use mindfeed::tracker::{Tracker, TrackerConfig};
use mindfeed::{MindfeedApi, UpdateSessionRequest};

const BREAK_CHECK_INTERVAL_SECS: u64 = 60;

/// In-process transport: drafts land directly on the session API.
struct LocalTransport {
    api: Arc<MindfeedApi>,
    user_id: String,
}

#[async_trait]
impl SyncTransport for LocalTransport {
    async fn sync_consumption(&self, draft: &ConsumptionDraft) -> Result<()> {
        let request = UpdateSessionRequest {
            content_type: Some(draft.content_type.as_str().to_string()),
            time_spent: Some(draft.time_spent_seconds),
            credibility_score: draft.credibility_score,
            bias_score: draft.bias_score,
            content_url: draft.url.clone(),
            content_title: draft.title.clone(),
            scroll_depth_percent: Some(draft.scroll_depth_percent),
        };
        self.api
            .update_session(&self.user_id, request)
            .await
            .context("failed to apply consumption draft")?;
        Ok(())
    }

    async fn sync_analysis(&self, entry: &AnalysisEntry) -> Result<()> {
        info!(
            "analysis for {}: credibility {:.2}, bias {:.2}",
            entry.url, entry.scores.credibility_score, entry.scores.bias_score
        );
        Ok(())
    }
}

fn db_path() -> PathBuf {
    std::env::var_os("MINDFEED_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mindfeed.db"))
}

fn user_id() -> String {
    std::env::var("MINDFEED_USER").unwrap_or_else(|_| "local".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let user = user_id();
    let api = Arc::new(MindfeedApi::open(db_path())?);
    api.start_session(&user).await?;
    info!("session started for {user}");

    let transport = Arc::new(LocalTransport {
        api: Arc::clone(&api),
        user_id: user.clone(),
    });
    let queue = SyncQueue::new(transport as Arc<dyn SyncTransport>);
    let tracker = Tracker::new(TrackerConfig::default(), queue, Arc::new(NoopAnalysisProvider));

    // Log notifications as the evaluator emits them.
    let mut feed = api.subscribe_notifications(&user)?;
    tokio::spawn(async move {
        while let Ok(notification) = feed.recv().await {
            info!("[{}] {}", notification.title, notification.message);
        }
    });

    let scheduler = TrackerScheduler::new();
    let break_check = {
        let api = Arc::clone(&api);
        let user = user.clone();
        scheduler.schedule_repeating(Duration::from_secs(BREAK_CHECK_INTERVAL_SECS), move || {
            let api = Arc::clone(&api);
            let user = user.clone();
            async move {
                if let Err(err) = api.check_break(&user).await {
                    warn!("break check failed: {err}");
                }
            }
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    break_check.cancel();
    tracker.shutdown().await;
    if let Err(err) = api.end_session(&user).await {
        warn!("no session to end: {err}");
    }

    Ok(())
}
