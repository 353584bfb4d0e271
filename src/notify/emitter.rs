use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::info;

use crate::db::Database;
use crate::models::{CheckKind, Notification};

use super::NotificationFeed;

/// How an emission is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupePolicy {
    /// One notification per `(user, check_type, day)`. A condition that
    /// stays true is silently skipped until the date rolls over.
    Daily,
    /// No daily key; the caller's own timer is the gate (break
    /// reminders, which reset when they fire). Each firing leaves a
    /// timestamped mark as the timer anchor.
    TimerGated,
}

/// Persists notifications behind the dedupe key and pushes them onto the
/// per-user feed.
pub struct NotificationEmitter {
    db: Database,
    feed: Arc<NotificationFeed>,
}

impl NotificationEmitter {
    pub fn new(db: Database, feed: Arc<NotificationFeed>) -> Self {
        Self { db, feed }
    }

    pub fn feed(&self) -> &Arc<NotificationFeed> {
        &self.feed
    }

    /// Emit one notification unless its dedupe key is already claimed
    /// today. Returns `None` on a dedupe skip.
    pub async fn emit(
        &self,
        user_id: &str,
        kind: CheckKind,
        policy: DedupePolicy,
    ) -> Result<Option<Notification>> {
        let now = Utc::now();

        if policy == DedupePolicy::Daily {
            let claimed = self
                .db
                .try_claim_dedupe(user_id, &kind.dedupe_type(), now.date_naive())
                .await?;
            if !claimed {
                return Ok(None);
            }
        }

        let notification = Notification::from_kind(user_id, kind, now);
        self.db.insert_notification(&notification).await?;
        if policy == DedupePolicy::TimerGated {
            // Anchor for the caller's timer; survives notification deletion.
            self.db
                .record_timer_mark(user_id, &notification.kind.dedupe_type(), now)
                .await?;
        }
        self.feed.publish(&notification);

        info!(
            "notification {} ({}) emitted for user {user_id}",
            notification.id,
            notification.kind.dedupe_type()
        );

        Ok(Some(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;
    use std::path::PathBuf;

    fn temp_db() -> Database {
        let path = PathBuf::from(std::env::temp_dir())
            .join(format!("mindfeed-test-{}.db", uuid::Uuid::new_v4()));
        Database::new(path).expect("open test database")
    }

    #[tokio::test]
    async fn daily_policy_emits_once_per_day() {
        let db = temp_db();
        let emitter = NotificationEmitter::new(db, Arc::new(NotificationFeed::new()));

        let kind = CheckKind::TimeLimitExceeded {
            minutes_spent: 130,
            limit_minutes: 120,
        };

        let first = emitter
            .emit("u1", kind.clone(), DedupePolicy::Daily)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = emitter
            .emit("u1", kind, DedupePolicy::Daily)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn distinct_check_types_do_not_share_keys() {
        let db = temp_db();
        let emitter = NotificationEmitter::new(db, Arc::new(NotificationFeed::new()));

        let warning = emitter
            .emit(
                "u1",
                CheckKind::TimeLimitWarning {
                    minutes_spent: 100,
                    limit_minutes: 120,
                },
                DedupePolicy::Daily,
            )
            .await
            .unwrap();
        let exceeded = emitter
            .emit(
                "u1",
                CheckKind::TimeLimitExceeded {
                    minutes_spent: 125,
                    limit_minutes: 120,
                },
                DedupePolicy::Daily,
            )
            .await
            .unwrap();

        assert!(warning.is_some());
        assert!(exceeded.is_some());
    }

    #[tokio::test]
    async fn deletion_does_not_free_the_dedupe_key() {
        let db = temp_db();
        let emitter = NotificationEmitter::new(db.clone(), Arc::new(NotificationFeed::new()));

        let kind = CheckKind::CountLimitExceeded {
            content_type: ContentType::Article,
            count: 21,
            limit: 20,
        };

        let emitted = emitter
            .emit("u1", kind.clone(), DedupePolicy::Daily)
            .await
            .unwrap()
            .expect("first emission");
        assert!(db.delete_notification(&emitted.id).await.unwrap());

        let again = emitter.emit("u1", kind, DedupePolicy::Daily).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn deleting_a_break_reminder_keeps_the_timer_anchor() {
        let db = temp_db();
        let emitter = NotificationEmitter::new(db.clone(), Arc::new(NotificationFeed::new()));

        let emitted = emitter
            .emit(
                "u1",
                CheckKind::BreakReminder { active_minutes: 50 },
                DedupePolicy::TimerGated,
            )
            .await
            .unwrap()
            .expect("first emission");

        let anchor = db.last_break_notification_at("u1").await.unwrap();
        assert!(anchor.is_some());

        assert!(db.delete_notification(&emitted.id).await.unwrap());
        assert_eq!(db.last_break_notification_at("u1").await.unwrap(), anchor);
    }

    #[tokio::test]
    async fn timer_gated_policy_skips_the_daily_key() {
        let db = temp_db();
        let emitter = NotificationEmitter::new(db, Arc::new(NotificationFeed::new()));

        let first = emitter
            .emit(
                "u1",
                CheckKind::BreakReminder { active_minutes: 45 },
                DedupePolicy::TimerGated,
            )
            .await
            .unwrap();
        let second = emitter
            .emit(
                "u1",
                CheckKind::BreakReminder { active_minutes: 90 },
                DedupePolicy::TimerGated,
            )
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_some());
    }
}
