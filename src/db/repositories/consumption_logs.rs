use anyhow::{bail, Result};
use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{invalid_data, parse_datetime},
};
use crate::models::{ConsumptionRecord, ContentType};

fn row_to_record(row: &Row) -> Result<ConsumptionRecord, rusqlite::Error> {
    let content_type_str: String = row.get("content_type")?;
    let consumed_at_str: String = row.get("consumed_at")?;

    Ok(ConsumptionRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        content_type: ContentType::parse(&content_type_str).map_err(invalid_data)?,
        url: row.get("url")?,
        title: row.get("title")?,
        time_spent_seconds: row.get("time_spent_seconds")?,
        scroll_depth_percent: row.get("scroll_depth_percent")?,
        credibility_score: row.get("credibility_score")?,
        bias_score: row.get("bias_score")?,
        consumed_at: parse_datetime(&consumed_at_str, "consumed_at").map_err(invalid_data)?,
    })
}

const RECORD_COLUMNS: &str = "id, user_id, content_type, url, title, time_spent_seconds, \
     scroll_depth_percent, credibility_score, bias_score, consumed_at";

impl Database {
    pub async fn insert_consumption(&self, record: &ConsumptionRecord) -> Result<()> {
        // Append-only invariant: a non-positive duration never reaches disk.
        if record.time_spent_seconds <= 0 {
            bail!(
                "refusing to persist consumption record with time_spent_seconds = {}",
                record.time_spent_seconds
            );
        }

        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO consumption_logs (
                    id,
                    user_id,
                    content_type,
                    url,
                    title,
                    time_spent_seconds,
                    scroll_depth_percent,
                    credibility_score,
                    bias_score,
                    consumed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.user_id,
                    record.content_type.as_str(),
                    record.url,
                    record.title,
                    record.time_spent_seconds,
                    record.scroll_depth_percent,
                    record.credibility_score,
                    record.bias_score,
                    record.consumed_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// All of a user's records for one UTC calendar day, oldest first.
    pub async fn get_consumption_for_day(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<Vec<ConsumptionRecord>> {
        let user_id = user_id.to_string();
        let day_start = format!("{day}T00:00:00");
        let day_end = format!("{}T00:00:00", day.succ_opt().unwrap_or(day));

        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS}
                 FROM consumption_logs
                 WHERE user_id = ?1 AND consumed_at >= ?2 AND consumed_at < ?3
                 ORDER BY consumed_at ASC"
            ))?;

            let records = stmt
                .query_map(params![user_id, day_start, day_end], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(records)
        })
        .await
    }

    /// Most recent records for a user, newest first.
    pub async fn get_recent_consumption(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConsumptionRecord>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS}
                 FROM consumption_logs
                 WHERE user_id = ?1
                 ORDER BY consumed_at DESC
                 LIMIT ?2"
            ))?;

            let records = stmt
                .query_map(params![user_id, limit], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(records)
        })
        .await
    }

    /// Most recent records that carry analysis scores, newest first.
    /// Feeds the rolling content-quality window.
    pub async fn get_recent_scored_consumption(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConsumptionRecord>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS}
                 FROM consumption_logs
                 WHERE user_id = ?1
                   AND (credibility_score IS NOT NULL OR bias_score IS NOT NULL)
                 ORDER BY consumed_at DESC
                 LIMIT ?2"
            ))?;

            let records = stmt
                .query_map(params![user_id, limit], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(records)
        })
        .await
    }
}
