use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{debug, error, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::db::Database;
use crate::limits::ThresholdEvaluator;
use crate::models::{ConsumptionRecord, ContentType, Session, SessionState};

/// Validated payload of one `update_session` call.
#[derive(Debug, Clone)]
pub struct UpdateInput {
    pub content_type: ContentType,
    pub time_spent: i64,
    pub credibility_score: Option<f64>,
    pub bias_score: Option<f64>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub scroll_depth_percent: Option<f64>,
}

/// What one update call did. `evaluation` is the handle to the
/// background threshold sweep; callers that need its result (tests,
/// mostly) can await it, everyone else drops it.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub session: Session,
    pub logged: bool,
    pub record: Option<ConsumptionRecord>,
    pub evaluation: Option<JoinHandle<()>>,
}

/// Session state machine with a single logical writer per user. All
/// mutations for one user run under that user's slot lock, so concurrent
/// calls from multiple tabs apply in receipt order.
pub struct SessionCoordinator {
    db: Database,
    evaluator: Arc<ThresholdEvaluator>,
    slots: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionCoordinator {
    pub fn new(db: Database, evaluator: Arc<ThresholdEvaluator>) -> Self {
        Self {
            db,
            evaluator,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, user_id: &str) -> Arc<Mutex<Session>> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::inactive(user_id.to_string()))))
            .clone()
    }

    /// Idempotent: repeated calls while a session is Active are no-ops
    /// and never reset the accumulator. A start after an end begins a
    /// fresh one.
    pub async fn start_session(&self, user_id: &str) -> Result<Session> {
        let slot = self.slot(user_id).await;
        let mut session = slot.lock().await;

        if session.state == SessionState::Active {
            debug!("start_session for {user_id} while active, no-op");
            return Ok(session.clone());
        }

        session.begin(Utc::now());
        Ok(session.clone())
    }

    /// Append one consumption record, grow the accumulator, and trigger
    /// the threshold sweep in the background. Evaluator failure never
    /// fails this call.
    pub async fn update_session(&self, user_id: &str, input: UpdateInput) -> Result<UpdateOutcome> {
        let slot = self.slot(user_id).await;
        let mut session = slot.lock().await;
        let now = Utc::now();

        // Non-positive durations are dropped, not persisted and not
        // accumulated. Not an error: the tracker legitimately reports
        // zero for instantly-abandoned pages.
        if input.time_spent <= 0 {
            debug!(
                "dropping zero-duration consumption for {user_id} ({})",
                input.content_type.as_str()
            );
            return Ok(UpdateOutcome {
                session: session.clone(),
                logged: false,
                record: None,
                evaluation: None,
            });
        }

        let record = ConsumptionRecord {
            id: format!("cr_{}", uuid::Uuid::new_v4()),
            user_id: user_id.to_string(),
            content_type: input.content_type,
            url: input.url,
            title: input.title,
            time_spent_seconds: input.time_spent,
            scroll_depth_percent: input.scroll_depth_percent.unwrap_or(0.0).clamp(0.0, 100.0),
            credibility_score: input.credibility_score,
            bias_score: input.bias_score,
            consumed_at: now,
        };

        self.db.insert_consumption(&record).await?;

        match session.state {
            SessionState::Active => {
                session.accumulated_seconds += input.time_spent;
                session.last_heartbeat_at = Some(now);
            }
            // Late arrival racing an end_session: accepted and applied
            // to the just-closed session, which stays closed.
            SessionState::Ended => {
                session.accumulated_seconds += input.time_spent;
            }
            SessionState::Inactive => {
                warn!("consumption logged for {user_id} with no session started");
            }
        }

        let evaluation = {
            let evaluator = Arc::clone(&self.evaluator);
            let user_id = user_id.to_string();
            let content_type = input.content_type;
            tokio::spawn(async move {
                if let Err(err) = evaluator.evaluate_on_update(&user_id, content_type).await {
                    error!("threshold evaluation failed for {user_id}: {err:#}");
                }
            })
        };

        Ok(UpdateOutcome {
            session: session.clone(),
            logged: true,
            record: Some(record),
            evaluation: Some(evaluation),
        })
    }

    /// End the active session. Ending twice is a no-op; ending with no
    /// session at all is an error.
    pub async fn end_session(&self, user_id: &str) -> Result<Session> {
        let slot = self.slot(user_id).await;
        let mut session = slot.lock().await;

        match session.state {
            SessionState::Active => {
                session.end(Utc::now());
                Ok(session.clone())
            }
            SessionState::Ended => Ok(session.clone()),
            SessionState::Inactive => Err(anyhow!("no active session to end")),
        }
    }

    pub async fn session_snapshot(&self, user_id: &str) -> Session {
        let slot = self.slot(user_id).await;
        let session = slot.lock().await;
        session.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotificationEmitter, NotificationFeed};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn temp_db() -> Database {
        let path = PathBuf::from(std::env::temp_dir())
            .join(format!("mindfeed-test-{}.db", uuid::Uuid::new_v4()));
        Database::new(path).expect("open test database")
    }

    fn coordinator(db: &Database) -> SessionCoordinator {
        let emitter = NotificationEmitter::new(db.clone(), Arc::new(NotificationFeed::new()));
        let evaluator = Arc::new(ThresholdEvaluator::new(db.clone(), emitter));
        SessionCoordinator::new(db.clone(), evaluator)
    }

    fn article_update(seconds: i64) -> UpdateInput {
        UpdateInput {
            content_type: ContentType::Article,
            time_spent: seconds,
            credibility_score: None,
            bias_score: None,
            url: None,
            title: None,
            scroll_depth_percent: None,
        }
    }

    #[tokio::test]
    async fn repeated_start_does_not_reset_the_accumulator() {
        let db = temp_db();
        let coordinator = coordinator(&db);

        coordinator.start_session("u1").await.unwrap();
        let outcome = coordinator
            .update_session("u1", article_update(45))
            .await
            .unwrap();
        outcome.evaluation.unwrap().await.unwrap();
        assert_eq!(outcome.session.accumulated_seconds, 45);

        let again = coordinator.start_session("u1").await.unwrap();
        assert_eq!(again.state, SessionState::Active);
        assert_eq!(again.accumulated_seconds, 45);
    }

    #[tokio::test]
    async fn zero_duration_update_is_dropped_without_persisting() {
        let db = temp_db();
        let coordinator = coordinator(&db);

        coordinator.start_session("u1").await.unwrap();
        let outcome = coordinator
            .update_session("u1", article_update(0))
            .await
            .unwrap();
        assert!(!outcome.logged);
        assert!(outcome.record.is_none());
        assert_eq!(outcome.session.accumulated_seconds, 0);

        let records = db
            .get_consumption_for_day("u1", Utc::now().date_naive())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn late_update_lands_on_the_just_closed_session() {
        let db = temp_db();
        let coordinator = coordinator(&db);

        coordinator.start_session("u1").await.unwrap();
        coordinator
            .update_session("u1", article_update(30))
            .await
            .unwrap();
        let ended = coordinator.end_session("u1").await.unwrap();
        assert_eq!(ended.state, SessionState::Ended);

        let late = coordinator
            .update_session("u1", article_update(15))
            .await
            .unwrap();
        assert!(late.logged);
        assert_eq!(late.session.state, SessionState::Ended);
        assert_eq!(late.session.accumulated_seconds, 45);
    }

    #[tokio::test]
    async fn start_after_end_begins_a_fresh_accumulator() {
        let db = temp_db();
        let coordinator = coordinator(&db);

        coordinator.start_session("u1").await.unwrap();
        coordinator
            .update_session("u1", article_update(30))
            .await
            .unwrap();
        coordinator.end_session("u1").await.unwrap();

        let fresh = coordinator.start_session("u1").await.unwrap();
        assert_eq!(fresh.state, SessionState::Active);
        assert_eq!(fresh.accumulated_seconds, 0);
    }

    #[tokio::test]
    async fn ending_without_a_session_is_an_error() {
        let db = temp_db();
        let coordinator = coordinator(&db);
        assert!(coordinator.end_session("u1").await.is_err());
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let db = temp_db();
        let coordinator = coordinator(&db);

        coordinator.start_session("u1").await.unwrap();
        coordinator
            .update_session("u1", article_update(60))
            .await
            .unwrap();

        let other = coordinator.session_snapshot("u2").await;
        assert_eq!(other.state, SessionState::Inactive);
        assert_eq!(other.accumulated_seconds, 0);
    }
}
