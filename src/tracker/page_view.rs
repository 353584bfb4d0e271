//! Per-page-view engagement accounting.
//!
//! One `PageViewTracker` observes exactly one page view. Time accrues
//! only while the page is visible and within the idle window of the last
//! interaction; hiding flushes the current segment immediately and
//! becoming visible resumes from "now" with no retroactive credit.

use chrono::{DateTime, Duration, Utc};
use log::warn;

use crate::analysis::AnalysisScores;
use crate::models::{ActivitySample, ConsumptionDraft, ContentSnapshot};

use super::bridge::{PageEvent, PageSnapshot};
use super::config::TrackerConfig;
use super::extract::extract_content;

pub struct PageViewTracker {
    config: TrackerConfig,
    /// None when extraction failed; the page view is then never analyzed
    /// nor logged.
    content: Option<ContentSnapshot>,
    url: String,
    title: String,

    visible: bool,
    /// Start of the current visible segment; None while hidden or after
    /// unload.
    segment_start: Option<DateTime<Utc>>,
    last_interaction_at: DateTime<Utc>,
    last_event_at: DateTime<Utc>,
    /// Running maximum scroll fraction, monotonic for the page view.
    max_scroll_fraction: f64,
    accumulated_ms: i64,

    analysis_requested: bool,
    scores: Option<AnalysisScores>,
    draft_emitted: bool,
    finished: bool,
}

impl PageViewTracker {
    pub fn new(snapshot: &PageSnapshot, config: TrackerConfig, now: DateTime<Utc>) -> Self {
        let content = match extract_content(snapshot) {
            Ok(content) => Some(content),
            Err(err) => {
                // Never blocks browsing; the page view just goes untracked.
                warn!("content extraction failed for {}: {err:#}", snapshot.url);
                None
            }
        };

        Self {
            config,
            content,
            url: snapshot.url.clone(),
            title: snapshot.title.clone(),
            visible: true,
            segment_start: Some(now),
            last_interaction_at: now,
            last_event_at: now,
            max_scroll_fraction: 0.0,
            accumulated_ms: 0,
            analysis_requested: false,
            scores: None,
            draft_emitted: false,
            finished: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> Option<&ContentSnapshot> {
        self.content.as_ref()
    }

    pub fn accumulated_seconds(&self) -> i64 {
        self.accumulated_ms / 1000
    }

    pub fn sample(&self) -> ActivitySample {
        ActivitySample {
            timestamp: self.last_event_at,
            scroll_depth: (self.max_scroll_fraction * 100.0).clamp(0.0, 100.0),
            is_visible: self.visible,
            last_interaction_at: self.last_interaction_at,
        }
    }

    /// Credit the open segment up to `now`, capped at the idle window
    /// past the last interaction. Idle time past the cap is never
    /// credited retroactively.
    fn credit_segment(&mut self, now: DateTime<Utc>) {
        let Some(start) = self.segment_start else {
            return;
        };
        let idle_cap = self.last_interaction_at + Duration::seconds(self.config.idle_window_secs);
        let end = now.min(idle_cap);
        if end > start {
            self.accumulated_ms += (end - start).num_milliseconds();
        }
    }

    fn register_interaction(&mut self, now: DateTime<Utc>) {
        if self.visible {
            self.credit_segment(now);
            self.segment_start = Some(now);
        }
        self.last_interaction_at = now;
    }

    pub fn handle_event(&mut self, event: PageEvent) {
        if self.finished {
            return;
        }
        let now = event.at();
        self.last_event_at = now;

        match event {
            PageEvent::Scrolled { fraction, .. } => {
                let fraction = fraction.clamp(0.0, 1.0);
                if fraction > self.max_scroll_fraction {
                    self.max_scroll_fraction = fraction;
                }
                self.register_interaction(now);
            }
            PageEvent::PointerMoved { .. } | PageEvent::Clicked { .. } => {
                self.register_interaction(now);
            }
            PageEvent::VisibilityChanged { visible, .. } => {
                if visible && !self.visible {
                    // Resume timing from now
                    self.visible = true;
                    self.segment_start = Some(now);
                    self.last_interaction_at = now;
                } else if !visible && self.visible {
                    // Hiding flushes the current segment immediately
                    self.credit_segment(now);
                    self.visible = false;
                    self.segment_start = None;
                }
            }
            PageEvent::Unloaded { .. } => {
                self.credit_segment(now);
                self.segment_start = None;
                self.finished = true;
            }
        }
    }

    /// One-shot guard for the debounced analysis request. Returns the
    /// text to analyze the first time the page view qualifies, and never
    /// again.
    pub fn claim_analysis(&mut self) -> Option<String> {
        if self.analysis_requested {
            return None;
        }
        let content = self.content.as_ref()?;
        if content.full_text_len < self.config.min_analysis_chars {
            return None;
        }
        self.analysis_requested = true;
        Some(content.extracted_text.clone())
    }

    pub fn set_scores(&mut self, scores: AnalysisScores) {
        self.scores = Some(scores);
    }

    pub fn scores(&self) -> Option<AnalysisScores> {
        self.scores
    }

    /// Engagement heuristic in [0, 1]: weighted blend of raw time spent,
    /// scroll depth, and time spent relative to the estimated reading
    /// time.
    pub fn engagement_score(&self) -> f64 {
        let secs = self.accumulated_ms as f64 / 1000.0;
        let time_score = (secs / 300.0).min(1.0);
        let scroll_score = self.max_scroll_fraction;
        let reading_ratio = match self.content.as_ref() {
            Some(content) if content.estimated_reading_secs() > 0 => {
                (secs / content.estimated_reading_secs() as f64).min(1.0)
            }
            _ => 0.5,
        };

        (self.config.weight_time * time_score
            + self.config.weight_scroll * scroll_score
            + self.config.weight_reading_ratio * reading_ratio)
            .clamp(0.0, 1.0)
    }

    /// One draft per page view, and only when the view earned more than
    /// the logging threshold. Extraction failure or a page below the
    /// analysis text floor yields no draft.
    pub fn take_draft(&mut self, now: DateTime<Utc>) -> Option<ConsumptionDraft> {
        if self.draft_emitted {
            return None;
        }
        let content = self.content.as_ref()?;
        if content.full_text_len < self.config.min_analysis_chars {
            return None;
        }
        if self.accumulated_seconds() <= self.config.min_log_secs {
            return None;
        }

        self.draft_emitted = true;
        Some(ConsumptionDraft {
            content_type: content.content_type,
            url: Some(content.url.clone()),
            title: Some(self.title.clone()),
            time_spent_seconds: self.accumulated_seconds(),
            scroll_depth_percent: (self.max_scroll_fraction * 100.0).clamp(0.0, 100.0),
            credibility_score: self.scores.map(|s| s.credibility_score),
            bias_score: self.scores.map(|s| s.bias_score),
            captured_at: now,
        })
    }
}
