use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use log::debug;

use crate::db::Database;
use crate::models::{
    CheckKind, ContentType, Notification, Session, SessionState, ThresholdConfig,
};
use crate::notify::{DedupePolicy, NotificationEmitter};

use super::DailyAggregate;

/// Rolling window for the content-quality check.
const QUALITY_WINDOW: u32 = 10;
/// Scored records required before quality verdicts mean anything.
const MIN_QUALITY_SAMPLES: usize = 3;
/// Warning tier fires at this fraction of a limit.
const WARNING_RATIO: f64 = 0.8;
/// Hour (UTC) after which lagging wellness goals get a reminder.
const GOAL_REMINDER_HOUR: u32 = 18;

/// Compares a user's daily aggregates against their configured limits
/// and hands crossings to the emitter. Every check is independently
/// dedupe-gated; a condition that stays true keeps quiet until the day
/// rolls over.
pub struct ThresholdEvaluator {
    db: Database,
    emitter: NotificationEmitter,
}

impl ThresholdEvaluator {
    pub fn new(db: Database, emitter: NotificationEmitter) -> Self {
        Self { db, emitter }
    }

    /// Effective config: the stored row, or defaults without writing one.
    pub async fn config_for(&self, user_id: &str) -> Result<ThresholdConfig> {
        Ok(self
            .db
            .get_preferences(user_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn aggregate_today(&self, user_id: &str) -> Result<DailyAggregate> {
        let day = Utc::now().date_naive();
        let records = self.db.get_consumption_for_day(user_id, day).await?;
        Ok(DailyAggregate::from_records(day, &records))
    }

    /// Everything worth rechecking after one `update_session` call.
    /// Failures here must never fail the logging call; the coordinator
    /// invokes this fire-and-forget.
    pub async fn evaluate_on_update(
        &self,
        user_id: &str,
        content_type: ContentType,
    ) -> Result<Vec<Notification>> {
        let mut emitted = Vec::new();
        emitted.extend(self.check_time_limit(user_id).await?);
        emitted.extend(self.check_count_limits(user_id, Some(content_type)).await?);
        emitted.extend(self.check_quality(user_id).await?);
        Ok(emitted)
    }

    /// Daily time limit: warning tier in [80%, 100%), exceeded at 100%.
    pub async fn check_time_limit(&self, user_id: &str) -> Result<Vec<Notification>> {
        let config = self.config_for(user_id).await?;
        let aggregate = self.aggregate_today(user_id).await?;

        let limit = config.daily_time_limit_minutes as f64;
        let minutes = aggregate.minutes();
        let minutes_spent = aggregate.total_seconds / 60;

        let kind = if minutes >= limit {
            CheckKind::TimeLimitExceeded {
                minutes_spent,
                limit_minutes: config.daily_time_limit_minutes,
            }
        } else if minutes >= limit * WARNING_RATIO {
            CheckKind::TimeLimitWarning {
                minutes_spent,
                limit_minutes: config.daily_time_limit_minutes,
            }
        } else {
            return Ok(Vec::new());
        };

        Ok(self
            .emitter
            .emit(user_id, kind, DedupePolicy::Daily)
            .await?
            .into_iter()
            .collect())
    }

    /// Per-type daily count limits, same two-tier policy as the time
    /// limit. `only` narrows the sweep to the type that just changed.
    pub async fn check_count_limits(
        &self,
        user_id: &str,
        only: Option<ContentType>,
    ) -> Result<Vec<Notification>> {
        let config = self.config_for(user_id).await?;
        let aggregate = self.aggregate_today(user_id).await?;

        let capped = [
            ContentType::Article,
            ContentType::Video,
            ContentType::SocialPost,
        ];

        let mut emitted = Vec::new();
        for content_type in capped {
            if only.is_some_and(|ct| ct != content_type) {
                continue;
            }
            let Some(limit) = config.count_limit_for(content_type) else {
                continue;
            };

            let count = aggregate.count_for(content_type);
            let kind = if count >= limit {
                CheckKind::CountLimitExceeded {
                    content_type,
                    count,
                    limit,
                }
            } else if count as f64 >= limit as f64 * WARNING_RATIO {
                CheckKind::CountLimitWarning {
                    content_type,
                    count,
                    limit,
                }
            } else {
                continue;
            };

            if let Some(notification) =
                self.emitter.emit(user_id, kind, DedupePolicy::Daily).await?
            {
                emitted.push(notification);
            }
        }

        Ok(emitted)
    }

    /// Break reminder: fires when continuous active time since the last
    /// break notification (or session start) reaches the configured
    /// interval. Emitting resets the timer, so this check is gated by
    /// its own clock rather than the daily dedupe key.
    pub async fn check_break(
        &self,
        user_id: &str,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        let config = self.config_for(user_id).await?;
        if !config.break_reminders_enabled || session.state != SessionState::Active {
            return Ok(None);
        }
        let Some(started_at) = session.started_at else {
            return Ok(None);
        };

        let anchor = match self.db.last_break_notification_at(user_id).await? {
            Some(last) if last > started_at => last,
            _ => started_at,
        };

        let active_minutes = (now - anchor).num_minutes();
        if active_minutes < config.break_interval_minutes {
            debug!(
                "break check for {user_id}: {active_minutes}m of {}m",
                config.break_interval_minutes
            );
            return Ok(None);
        }

        self.emitter
            .emit(
                user_id,
                CheckKind::BreakReminder { active_minutes },
                DedupePolicy::TimerGated,
            )
            .await
    }

    /// Content quality over the last `QUALITY_WINDOW` scored records:
    /// average credibility below the floor, or average bias above the
    /// ceiling.
    pub async fn check_quality(&self, user_id: &str) -> Result<Vec<Notification>> {
        let config = self.config_for(user_id).await?;
        let records = self
            .db
            .get_recent_scored_consumption(user_id, QUALITY_WINDOW)
            .await?;

        let credibility: Vec<f64> = records.iter().filter_map(|r| r.credibility_score).collect();
        let bias: Vec<f64> = records.iter().filter_map(|r| r.bias_score).collect();

        let mut emitted = Vec::new();

        if credibility.len() >= MIN_QUALITY_SAMPLES {
            let average = credibility.iter().sum::<f64>() / credibility.len() as f64;
            if average < config.min_credibility_score {
                if let Some(notification) = self
                    .emitter
                    .emit(
                        user_id,
                        CheckKind::LowCredibility {
                            average,
                            threshold: config.min_credibility_score,
                        },
                        DedupePolicy::Daily,
                    )
                    .await?
                {
                    emitted.push(notification);
                }
            }
        }

        if bias.len() >= MIN_QUALITY_SAMPLES {
            let average = bias.iter().sum::<f64>() / bias.len() as f64;
            if average > config.max_bias_score {
                if let Some(notification) = self
                    .emitter
                    .emit(
                        user_id,
                        CheckKind::HighBias {
                            average,
                            threshold: config.max_bias_score,
                        },
                        DedupePolicy::Daily,
                    )
                    .await?
                {
                    emitted.push(notification);
                }
            }
        }

        Ok(emitted)
    }

    /// Wellness goals: achievement when today's minutes in the goal's
    /// content type reach the target; a reminder late in the day when
    /// progress is under half.
    pub async fn check_wellness(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.check_wellness_at(user_id, Utc::now()).await
    }

    pub(crate) async fn check_wellness_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>> {
        let config = self.config_for(user_id).await?;
        if config.wellness_goals.is_empty() {
            return Ok(Vec::new());
        }

        let aggregate = self.aggregate_today(user_id).await?;
        let mut emitted = Vec::new();

        for goal in &config.wellness_goals {
            let minutes = aggregate.seconds_for(goal.content_type) / 60;

            let kind = if minutes >= goal.daily_target_minutes {
                CheckKind::GoalAchieved {
                    tag: goal.tag.clone(),
                    minutes,
                    target_minutes: goal.daily_target_minutes,
                }
            } else if now.hour() >= GOAL_REMINDER_HOUR && minutes * 2 < goal.daily_target_minutes
            {
                CheckKind::GoalReminder {
                    tag: goal.tag.clone(),
                    minutes,
                    target_minutes: goal.daily_target_minutes,
                }
            } else {
                continue;
            };

            if let Some(notification) =
                self.emitter.emit(user_id, kind, DedupePolicy::Daily).await?
            {
                emitted.push(notification);
            }
        }

        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsumptionRecord, WellnessGoal};
    use crate::notify::NotificationFeed;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn temp_db() -> Database {
        let path = PathBuf::from(std::env::temp_dir())
            .join(format!("mindfeed-test-{}.db", uuid::Uuid::new_v4()));
        Database::new(path).expect("open test database")
    }

    fn evaluator(db: &Database) -> ThresholdEvaluator {
        let emitter = NotificationEmitter::new(db.clone(), Arc::new(NotificationFeed::new()));
        ThresholdEvaluator::new(db.clone(), emitter)
    }

    async fn log(
        db: &Database,
        content_type: ContentType,
        seconds: i64,
        credibility: Option<f64>,
        bias: Option<f64>,
    ) {
        let record = ConsumptionRecord {
            id: format!("cr_{}", uuid::Uuid::new_v4()),
            user_id: "u1".into(),
            content_type,
            url: None,
            title: None,
            time_spent_seconds: seconds,
            scroll_depth_percent: 0.0,
            credibility_score: credibility,
            bias_score: bias,
            consumed_at: Utc::now(),
        };
        db.insert_consumption(&record).await.unwrap();
    }

    async fn tight_limits(db: &Database) {
        let config = ThresholdConfig {
            daily_time_limit_minutes: 10,
            daily_article_limit: 3,
            ..ThresholdConfig::default()
        };
        db.upsert_preferences("u1", config).await.unwrap();
    }

    #[tokio::test]
    async fn time_warning_fires_in_the_eighty_percent_band() {
        let db = temp_db();
        tight_limits(&db).await;
        let eval = evaluator(&db);

        // 9 of 10 minutes: warning band, not exceeded
        log(&db, ContentType::Webpage, 540, None, None).await;
        let emitted = eval.check_time_limit("u1").await.unwrap();
        assert_eq!(emitted.len(), 1);
        assert!(matches!(
            emitted[0].kind,
            CheckKind::TimeLimitWarning { .. }
        ));

        // still in the band: silently skipped
        assert!(eval.check_time_limit("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crossing_into_exceeded_emits_a_second_notification() {
        let db = temp_db();
        tight_limits(&db).await;
        let eval = evaluator(&db);

        log(&db, ContentType::Webpage, 540, None, None).await;
        let first = eval.check_time_limit("u1").await.unwrap();
        assert!(matches!(first[0].kind, CheckKind::TimeLimitWarning { .. }));

        log(&db, ContentType::Webpage, 120, None, None).await;
        let second = eval.check_time_limit("u1").await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(matches!(
            second[0].kind,
            CheckKind::TimeLimitExceeded { .. }
        ));
    }

    #[tokio::test]
    async fn count_limit_tracks_one_content_type() {
        let db = temp_db();
        tight_limits(&db).await;
        let eval = evaluator(&db);

        for _ in 0..3 {
            log(&db, ContentType::Article, 60, None, None).await;
        }
        let emitted = eval
            .check_count_limits("u1", Some(ContentType::Article))
            .await
            .unwrap();
        assert_eq!(emitted.len(), 1);
        assert!(matches!(
            emitted[0].kind,
            CheckKind::CountLimitExceeded {
                content_type: ContentType::Article,
                count: 3,
                limit: 3,
            }
        ));

        // videos are untouched
        assert!(eval
            .check_count_limits("u1", Some(ContentType::Video))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn quality_check_needs_enough_scored_samples() {
        let db = temp_db();
        let eval = evaluator(&db);

        log(&db, ContentType::Article, 60, Some(0.1), None).await;
        log(&db, ContentType::Article, 60, Some(0.2), None).await;
        assert!(eval.check_quality("u1").await.unwrap().is_empty());

        log(&db, ContentType::Article, 60, Some(0.15), None).await;
        let emitted = eval.check_quality("u1").await.unwrap();
        assert_eq!(emitted.len(), 1);
        assert!(matches!(emitted[0].kind, CheckKind::LowCredibility { .. }));
    }

    #[tokio::test]
    async fn break_reminder_waits_for_the_interval() {
        let db = temp_db();
        let eval = evaluator(&db);

        let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut session = Session::inactive("u1".into());
        session.begin(started);

        // 30 minutes in: under the 45 minute default
        let early = eval
            .check_break("u1", &session, started + chrono::Duration::minutes(30))
            .await
            .unwrap();
        assert!(early.is_none());

        let due = eval
            .check_break("u1", &session, started + chrono::Duration::minutes(50))
            .await
            .unwrap();
        assert!(due.is_some());
    }

    #[tokio::test]
    async fn break_timer_resets_after_firing() {
        let db = temp_db();
        let eval = evaluator(&db);

        let now = Utc::now();
        let mut session = Session::inactive("u1".into());
        session.begin(now - chrono::Duration::minutes(50));

        let first = eval.check_break("u1", &session, now).await.unwrap();
        assert!(first.is_some());

        // firing moved the anchor; an immediate recheck stays quiet
        let recheck = eval.check_break("u1", &session, now).await.unwrap();
        assert!(recheck.is_none());

        // another full interval later it fires again
        let later = eval
            .check_break("u1", &session, now + chrono::Duration::minutes(50))
            .await
            .unwrap();
        assert!(later.is_some());
    }

    #[tokio::test]
    async fn wellness_goal_achievement_and_lagging_reminder() {
        let db = temp_db();
        let config = ThresholdConfig {
            wellness_goals: vec![
                WellnessGoal {
                    tag: "longform".into(),
                    content_type: ContentType::Article,
                    daily_target_minutes: 5,
                },
                WellnessGoal {
                    tag: "documentaries".into(),
                    content_type: ContentType::Video,
                    daily_target_minutes: 30,
                },
            ],
            ..ThresholdConfig::default()
        };
        db.upsert_preferences("u1", config).await.unwrap();
        let eval = evaluator(&db);

        log(&db, ContentType::Article, 360, None, None).await;

        let evening = Utc::now()
            .date_naive()
            .and_hms_opt(19, 0, 0)
            .unwrap()
            .and_utc();
        let emitted = eval.check_wellness_at("u1", evening).await.unwrap();
        assert_eq!(emitted.len(), 2);
        assert!(emitted
            .iter()
            .any(|n| matches!(&n.kind, CheckKind::GoalAchieved { tag, .. } if tag == "longform")));
        assert!(emitted.iter().any(
            |n| matches!(&n.kind, CheckKind::GoalReminder { tag, .. } if tag == "documentaries")
        ));
    }
}
