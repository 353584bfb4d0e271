use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::{from_str, to_string};

use crate::db::{connection::Database, helpers::invalid_data};
use crate::models::{
    preferences::validation::validate_config, ThresholdConfig, WellnessGoal,
};

fn row_to_config(row: &Row) -> Result<ThresholdConfig, rusqlite::Error> {
    let goals_json: String = row.get("wellness_goals_json")?;
    let wellness_goals: Vec<WellnessGoal> = from_str(&goals_json)
        .map_err(|err| invalid_data(anyhow::Error::new(err).context("wellness_goals_json")))?;

    Ok(ThresholdConfig {
        daily_time_limit_minutes: row.get("daily_time_limit_minutes")?,
        daily_article_limit: row.get("daily_article_limit")?,
        daily_video_limit: row.get("daily_video_limit")?,
        daily_social_limit: row.get("daily_social_limit")?,
        min_credibility_score: row.get("min_credibility_score")?,
        max_bias_score: row.get("max_bias_score")?,
        break_reminders_enabled: row.get("break_reminders_enabled")?,
        break_interval_minutes: row.get("break_interval_minutes")?,
        wellness_goals,
    })
}

impl Database {
    /// Stored preferences for a user, `None` when no row exists. Callers
    /// apply `ThresholdConfig::default()` themselves; reading never
    /// writes a row.
    pub async fn get_preferences(&self, user_id: &str) -> Result<Option<ThresholdConfig>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT daily_time_limit_minutes, daily_article_limit, daily_video_limit,
                        daily_social_limit, min_credibility_score, max_bias_score,
                        break_reminders_enabled, break_interval_minutes, wellness_goals_json
                 FROM content_preferences
                 WHERE user_id = ?1",
            )?;

            let result = stmt.query_row(params![user_id], row_to_config).optional()?;

            Ok(result)
        })
        .await
    }

    /// Insert or update a user's preferences. Validated before any write.
    pub async fn upsert_preferences(
        &self,
        user_id: &str,
        config: ThresholdConfig,
    ) -> Result<ThresholdConfig> {
        validate_config(&config)?;

        let user_id = user_id.to_string();
        let now = Utc::now().to_rfc3339();

        self.execute(move |conn| {
            let goals_json =
                to_string(&config.wellness_goals).context("failed to serialize wellness goals")?;

            conn.execute(
                "INSERT INTO content_preferences (
                    user_id, daily_time_limit_minutes, daily_article_limit,
                    daily_video_limit, daily_social_limit, min_credibility_score,
                    max_bias_score, break_reminders_enabled, break_interval_minutes,
                    wellness_goals_json, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                 ON CONFLICT(user_id) DO UPDATE SET
                     daily_time_limit_minutes = excluded.daily_time_limit_minutes,
                     daily_article_limit = excluded.daily_article_limit,
                     daily_video_limit = excluded.daily_video_limit,
                     daily_social_limit = excluded.daily_social_limit,
                     min_credibility_score = excluded.min_credibility_score,
                     max_bias_score = excluded.max_bias_score,
                     break_reminders_enabled = excluded.break_reminders_enabled,
                     break_interval_minutes = excluded.break_interval_minutes,
                     wellness_goals_json = excluded.wellness_goals_json,
                     updated_at = excluded.updated_at",
                params![
                    user_id,
                    config.daily_time_limit_minutes,
                    config.daily_article_limit,
                    config.daily_video_limit,
                    config.daily_social_limit,
                    config.min_credibility_score,
                    config.max_bias_score,
                    config.break_reminders_enabled,
                    config.break_interval_minutes,
                    goals_json,
                    now,
                ],
            )?;

            Ok(config)
        })
        .await
    }
}
