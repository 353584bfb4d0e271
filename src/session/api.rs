//! Public surface of the pipeline. Every call authorizes the caller,
//! validates its payload, and maps internal `anyhow` failures into the
//! structured [`ApiError`] shape.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::Database;
use crate::error::ApiError;
use crate::limits::{DailyAggregate, ThresholdEvaluator};
use crate::models::{
    preferences::validation, ConsumptionRecord, ContentType, Notification, Session,
    ThresholdConfig,
};
use crate::notify::{NotificationEmitter, NotificationFeed};

use super::coordinator::{SessionCoordinator, UpdateInput, UpdateOutcome};

const RECENT_RECORDS: u32 = 10;
const NOTIFICATION_PAGE: u32 = 50;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Raw payload of an update call, before validation. Field names match
/// the wire shape the clients send.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub content_type: Option<String>,
    pub time_spent: Option<i64>,
    pub credibility_score: Option<f64>,
    pub bias_score: Option<f64>,
    pub content_url: Option<String>,
    pub content_title: Option<String>,
    pub scroll_depth_percent: Option<f64>,
}

impl UpdateSessionRequest {
    fn into_input(self) -> ApiResult<UpdateInput> {
        let raw_type = self
            .content_type
            .ok_or_else(|| ApiError::validation("contentType is required"))?;
        let content_type =
            ContentType::parse(&raw_type).map_err(|err| ApiError::validation(format!("{err:#}")))?;

        let time_spent = self
            .time_spent
            .ok_or_else(|| ApiError::validation("timeSpent is required"))?;

        for (value, field) in [
            (self.credibility_score, "credibilityScore"),
            (self.bias_score, "biasScore"),
        ] {
            if let Some(score) = value {
                validation::validate_score(score, field)
                    .map_err(|err| ApiError::validation(format!("{err:#}")))?;
            }
        }

        if let Some(depth) = self.scroll_depth_percent {
            if !(0.0..=100.0).contains(&depth) {
                return Err(ApiError::validation(format!(
                    "scrollDepthPercent must be within [0, 100], got {depth}"
                )));
            }
        }

        Ok(UpdateInput {
            content_type,
            time_spent,
            credibility_score: self.credibility_score,
            bias_score: self.bias_score,
            url: self.content_url,
            title: self.content_title,
            scroll_depth_percent: self.scroll_depth_percent,
        })
    }
}

/// Today's consumption rolled up for the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStats {
    pub day: NaiveDate,
    pub total_minutes: i64,
    pub total_count: i64,
    pub article_count: i64,
    pub video_count: i64,
    pub social_post_count: i64,
    pub average_credibility: Option<f64>,
    pub average_bias: Option<f64>,
    pub recent: Vec<ConsumptionRecord>,
}

/// Facade wiring the coordinator, the evaluator, and the notification
/// feed over one database handle.
pub struct MindfeedApi {
    db: Database,
    coordinator: SessionCoordinator,
    evaluator: Arc<ThresholdEvaluator>,
    feed: Arc<NotificationFeed>,
}

impl MindfeedApi {
    pub fn open(db_path: PathBuf) -> ApiResult<Self> {
        let db = Database::new(db_path).map_err(ApiError::storage)?;
        Ok(Self::new(db))
    }

    pub fn new(db: Database) -> Self {
        let feed = Arc::new(NotificationFeed::new());
        let emitter = NotificationEmitter::new(db.clone(), Arc::clone(&feed));
        let evaluator = Arc::new(ThresholdEvaluator::new(db.clone(), emitter));
        let coordinator = SessionCoordinator::new(db.clone(), Arc::clone(&evaluator));
        Self {
            db,
            coordinator,
            evaluator,
            feed,
        }
    }

    fn authorize(&self, user_id: &str) -> ApiResult<()> {
        if user_id.trim().is_empty() {
            return Err(ApiError::auth("missing user id"));
        }
        Ok(())
    }

    pub async fn start_session(&self, user_id: &str) -> ApiResult<Session> {
        self.authorize(user_id)?;
        self.coordinator
            .start_session(user_id)
            .await
            .map_err(ApiError::internal)
    }

    pub async fn update_session(
        &self,
        user_id: &str,
        request: UpdateSessionRequest,
    ) -> ApiResult<UpdateOutcome> {
        self.authorize(user_id)?;
        let input = request.into_input()?;
        self.coordinator
            .update_session(user_id, input)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn end_session(&self, user_id: &str) -> ApiResult<Session> {
        self.authorize(user_id)?;
        self.coordinator
            .end_session(user_id)
            .await
            .map_err(|err| ApiError::not_found(format!("{err:#}")))
    }

    pub async fn session(&self, user_id: &str) -> ApiResult<Session> {
        self.authorize(user_id)?;
        Ok(self.coordinator.session_snapshot(user_id).await)
    }

    /// On-demand sweep of the time limit and the count limits, outside
    /// the per-update trigger. `content_type` narrows the count sweep.
    pub async fn check_limits(
        &self,
        user_id: &str,
        content_type: Option<&str>,
    ) -> ApiResult<Vec<Notification>> {
        self.authorize(user_id)?;

        let only = match content_type {
            Some(raw) => Some(
                ContentType::parse(raw)
                    .map_err(|err| ApiError::validation(format!("{err:#}")))?,
            ),
            None => None,
        };

        let mut emitted = self
            .evaluator
            .check_time_limit(user_id)
            .await
            .map_err(ApiError::storage)?;
        emitted.extend(
            self.evaluator
                .check_count_limits(user_id, only)
                .await
                .map_err(ApiError::storage)?,
        );
        Ok(emitted)
    }

    pub async fn check_break(&self, user_id: &str) -> ApiResult<Option<Notification>> {
        self.authorize(user_id)?;
        let session = self.coordinator.session_snapshot(user_id).await;
        self.evaluator
            .check_break(user_id, &session, Utc::now())
            .await
            .map_err(ApiError::storage)
    }

    pub async fn check_quality(&self, user_id: &str) -> ApiResult<Vec<Notification>> {
        self.authorize(user_id)?;
        self.evaluator
            .check_quality(user_id)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn check_wellness(&self, user_id: &str) -> ApiResult<Vec<Notification>> {
        self.authorize(user_id)?;
        self.evaluator
            .check_wellness(user_id)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn today_stats(&self, user_id: &str) -> ApiResult<TodayStats> {
        self.authorize(user_id)?;

        let day = Utc::now().date_naive();
        let records = self
            .db
            .get_consumption_for_day(user_id, day)
            .await
            .map_err(ApiError::storage)?;
        let aggregate = DailyAggregate::from_records(day, &records);

        let credibility: Vec<f64> = records.iter().filter_map(|r| r.credibility_score).collect();
        let bias: Vec<f64> = records.iter().filter_map(|r| r.bias_score).collect();
        let average = |values: &[f64]| {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        let recent = self
            .db
            .get_recent_consumption(user_id, RECENT_RECORDS)
            .await
            .map_err(ApiError::storage)?;

        Ok(TodayStats {
            day,
            total_minutes: aggregate.total_seconds / 60,
            total_count: aggregate.total_count,
            article_count: aggregate.count_for(ContentType::Article),
            video_count: aggregate.count_for(ContentType::Video),
            social_post_count: aggregate.count_for(ContentType::SocialPost),
            average_credibility: average(&credibility),
            average_bias: average(&bias),
            recent,
        })
    }

    /// Stored preferences, if the user has ever saved any. `None` means
    /// the evaluator is running on [`ThresholdConfig::default`].
    pub async fn preferences(&self, user_id: &str) -> ApiResult<Option<ThresholdConfig>> {
        self.authorize(user_id)?;
        self.db
            .get_preferences(user_id)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        config: ThresholdConfig,
    ) -> ApiResult<ThresholdConfig> {
        self.authorize(user_id)?;
        validation::validate_config(&config)
            .map_err(|err| ApiError::validation(format!("{err:#}")))?;
        self.db
            .upsert_preferences(user_id, config)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn notifications(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> ApiResult<Vec<Notification>> {
        self.authorize(user_id)?;
        self.db
            .list_notifications(user_id, unread_only, NOTIFICATION_PAGE)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn mark_notification_read(&self, user_id: &str, id: &str) -> ApiResult<()> {
        self.authorize(user_id)?;
        let changed = self
            .db
            .mark_notification_read(id, true)
            .await
            .map_err(ApiError::storage)?;
        if !changed {
            return Err(ApiError::not_found(format!("no notification {id}")));
        }
        Ok(())
    }

    pub async fn delete_notification(&self, user_id: &str, id: &str) -> ApiResult<()> {
        self.authorize(user_id)?;
        let changed = self
            .db
            .delete_notification(id)
            .await
            .map_err(ApiError::storage)?;
        if !changed {
            return Err(ApiError::not_found(format!("no notification {id}")));
        }
        Ok(())
    }

    /// Live stream of this user's notifications as the evaluator emits
    /// them. Slow consumers lose the oldest entries, not the newest.
    pub fn subscribe_notifications(
        &self,
        user_id: &str,
    ) -> ApiResult<broadcast::Receiver<Notification>> {
        self.authorize(user_id)?;
        Ok(self.feed.subscribe(user_id))
    }
}
