//! Per-user threshold configuration.
//!
//! One row per user with upsert semantics. A missing row is not an error:
//! readers fall back to `ThresholdConfig::default()` without writing
//! anything.

use serde::{Deserialize, Serialize};

use super::ContentType;

/// A wellness goal the evaluator tracks against daily minutes in one
/// content type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WellnessGoal {
    pub tag: String,
    pub content_type: ContentType,
    pub daily_target_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub daily_time_limit_minutes: i64,
    pub daily_article_limit: i64,
    pub daily_video_limit: i64,
    pub daily_social_limit: i64,
    pub min_credibility_score: f64,
    pub max_bias_score: f64,
    pub break_reminders_enabled: bool,
    pub break_interval_minutes: i64,
    pub wellness_goals: Vec<WellnessGoal>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            daily_time_limit_minutes: 120,
            daily_article_limit: 20,
            daily_video_limit: 10,
            daily_social_limit: 50,
            min_credibility_score: 0.4,
            max_bias_score: 0.7,
            break_reminders_enabled: true,
            break_interval_minutes: 45,
            wellness_goals: Vec::new(),
        }
    }
}

impl ThresholdConfig {
    pub fn count_limit_for(&self, content_type: ContentType) -> Option<i64> {
        match content_type {
            ContentType::Article => Some(self.daily_article_limit),
            ContentType::Video => Some(self.daily_video_limit),
            ContentType::SocialPost => Some(self.daily_social_limit),
            ContentType::Podcast | ContentType::Webpage => None,
        }
    }
}

/// Validation functions applied on upsert.
pub mod validation {
    use anyhow::{bail, Result};

    use super::ThresholdConfig;

    pub fn validate_score(value: f64, field: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            bail!("{field} must be within [0, 1], got {value}");
        }
        Ok(())
    }

    pub fn validate_limit(value: i64, field: &str) -> Result<()> {
        if value <= 0 {
            bail!("{field} must be positive, got {value}");
        }
        Ok(())
    }

    pub fn validate_config(config: &ThresholdConfig) -> Result<()> {
        validate_limit(config.daily_time_limit_minutes, "daily_time_limit_minutes")?;
        validate_limit(config.daily_article_limit, "daily_article_limit")?;
        validate_limit(config.daily_video_limit, "daily_video_limit")?;
        validate_limit(config.daily_social_limit, "daily_social_limit")?;
        validate_limit(config.break_interval_minutes, "break_interval_minutes")?;
        validate_score(config.min_credibility_score, "min_credibility_score")?;
        validate_score(config.max_bias_score, "max_bias_score")?;

        for goal in &config.wellness_goals {
            if goal.tag.trim().is_empty() {
                bail!("wellness goal tag must not be empty");
            }
            validate_limit(goal.daily_target_minutes, "daily_target_minutes")?;
        }

        Ok(())
    }
}
