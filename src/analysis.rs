//! Analysis Provider boundary.
//!
//! Credibility/bias scoring is an external capability (an LLM-backed
//! service in production). The pipeline only depends on this narrow port;
//! latency and availability are the provider's problem, and any failure
//! here must never block consumption logging.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Scores returned by the Analysis Provider, clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisScores {
    pub credibility_score: f64,
    pub bias_score: f64,
}

impl AnalysisScores {
    pub fn new(credibility_score: f64, bias_score: f64) -> Self {
        Self {
            credibility_score: credibility_score.clamp(0.0, 1.0),
            bias_score: bias_score.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalysisScores>;
}

/// Provider that scores nothing useful. Used by the demo binary and tests
/// where wiring a real provider is beside the point.
pub struct NoopAnalysisProvider;

#[async_trait]
impl AnalysisProvider for NoopAnalysisProvider {
    async fn analyze(&self, _text: &str) -> Result<AnalysisScores> {
        Ok(AnalysisScores::new(0.5, 0.5))
    }
}
