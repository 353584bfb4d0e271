use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentType;

/// Point-in-time reading of one page view's engagement signals.
/// Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySample {
    pub timestamp: DateTime<Utc>,
    /// Running maximum scroll depth, 0..=100.
    pub scroll_depth: f64,
    pub is_visible: bool,
    pub last_interaction_at: DateTime<Utc>,
}

/// What the tracker extracted from a page. Immutable once captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub author: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub content_type: ContentType,
    /// Word count over the full extracted text, before truncation.
    pub word_count: usize,
    /// Character length of the full extracted text.
    pub full_text_len: usize,
    /// Extracted text truncated for transmission (5000 chars max).
    pub extracted_text: String,
}

impl ContentSnapshot {
    /// Estimated reading time at 200 words per minute.
    pub fn estimated_reading_secs(&self) -> u64 {
        (self.word_count as u64 * 60) / 200
    }
}
