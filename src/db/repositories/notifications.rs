use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::{from_str, to_string};

use crate::db::{
    connection::Database,
    helpers::{invalid_data, parse_datetime, parse_optional_datetime},
};
use crate::models::{CheckKind, Notification, NotificationPriority};

fn priority_from_str(value: &str) -> Result<NotificationPriority> {
    match value {
        "low" => Ok(NotificationPriority::Low),
        "normal" => Ok(NotificationPriority::Normal),
        "high" => Ok(NotificationPriority::High),
        other => Err(anyhow::anyhow!("unknown notification priority '{other}'")),
    }
}

fn row_to_notification(row: &Row) -> Result<Notification, rusqlite::Error> {
    let kind_json: String = row.get("kind_json")?;
    let kind: CheckKind = from_str(&kind_json)
        .map_err(|err| invalid_data(anyhow::Error::new(err).context("kind_json")))?;
    let priority_str: String = row.get("priority")?;
    let created_at_str: String = row.get("created_at")?;
    let expires_at_str: Option<String> = row.get("expires_at")?;

    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        kind,
        title: row.get("title")?,
        message: row.get("message")?,
        priority: priority_from_str(&priority_str).map_err(invalid_data)?,
        read: row.get("read")?,
        expires_at: parse_optional_datetime(expires_at_str, "expires_at").map_err(invalid_data)?,
        created_at: parse_datetime(&created_at_str, "created_at").map_err(invalid_data)?,
    })
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, check_type, kind_json, title, message, priority, read, expires_at, created_at";

impl Database {
    /// Check-then-insert against the `(user, check_type, day)` dedupe
    /// key. Returns false when the key was already claimed today. The
    /// single DB worker thread serializes callers, so the race window
    /// the design tolerates never widens past one in-flight claim.
    pub async fn try_claim_dedupe(
        &self,
        user_id: &str,
        check_type: &str,
        day_key: NaiveDate,
    ) -> Result<bool> {
        let user_id = user_id.to_string();
        let check_type = check_type.to_string();
        let day_key = day_key.to_string();
        let now = Utc::now().to_rfc3339();

        self.execute(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT created_at FROM notification_marks
                     WHERE user_id = ?1 AND check_type = ?2 AND day_key = ?3",
                    params![user_id, check_type, day_key],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO notification_marks (user_id, check_type, day_key, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, check_type, day_key, now],
            )?;

            Ok(true)
        })
        .await
    }

    pub async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let record = notification.clone();
        self.execute(move |conn| {
            let kind_json =
                to_string(&record.kind).context("failed to serialize notification kind")?;

            conn.execute(
                "INSERT INTO notifications (
                    id, user_id, check_type, kind_json, title, message,
                    priority, read, expires_at, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.user_id,
                    record.kind.dedupe_type(),
                    kind_json,
                    record.title,
                    record.message,
                    record.priority.as_str(),
                    record.read,
                    record.expires_at.map(|dt| dt.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Notifications for a user, newest first, expired rows filtered out.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        let user_id = user_id.to_string();
        let now = Utc::now().to_rfc3339();

        self.execute(move |conn| {
            let query = format!(
                "SELECT {NOTIFICATION_COLUMNS}
                 FROM notifications
                 WHERE user_id = ?1
                   AND (expires_at IS NULL OR expires_at > ?2)
                   {}
                 ORDER BY created_at DESC
                 LIMIT ?3",
                if unread_only { "AND read = 0" } else { "" }
            );

            let mut stmt = conn.prepare(&query)?;
            let notifications = stmt
                .query_map(params![user_id, now, limit], row_to_notification)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(notifications)
        })
        .await
    }

    /// Flip the read flag. Returns false when no such notification exists.
    pub async fn mark_notification_read(&self, id: &str, read: bool) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = ?1 WHERE id = ?2",
                params![read, id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Delete a notification row. The dedupe mark stays, so the same
    /// check cannot re-emit that day.
    pub async fn delete_notification(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let changed =
                conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
    }

    /// Timestamped mark for a timer-gated firing. Written alongside the
    /// notification so deleting the row does not erase the timer anchor.
    pub async fn record_timer_mark(
        &self,
        user_id: &str,
        check_type: &str,
        at: chrono::DateTime<Utc>,
    ) -> Result<()> {
        let user_id = user_id.to_string();
        let check_type = check_type.to_string();
        let at = at.to_rfc3339();

        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO notification_marks (user_id, check_type, day_key, created_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![user_id, check_type, at],
            )?;
            Ok(())
        })
        .await
    }

    /// When the user's last break reminder fired, if ever. Read from the
    /// marks table, not the notifications themselves: dismissing the
    /// notification must not reset the break timer.
    pub async fn last_break_notification_at(
        &self,
        user_id: &str,
    ) -> Result<Option<chrono::DateTime<Utc>>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let raw: Option<String> = conn.query_row(
                "SELECT MAX(created_at) FROM notification_marks
                 WHERE user_id = ?1 AND check_type = 'break_reminder'",
                params![user_id],
                |row| row.get(0),
            )?;

            parse_optional_datetime(raw, "created_at")
        })
        .await
    }
}
