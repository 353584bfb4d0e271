use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{ConsumptionRecord, ContentType};

/// One day's consumption, folded fresh from raw records on every
/// evaluation. Daily volume is low enough that recomputing beats keeping
/// a separate aggregate table in sync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub total_seconds: i64,
    pub total_count: i64,
    counts: HashMap<ContentType, i64>,
    seconds_by_type: HashMap<ContentType, i64>,
}

impl DailyAggregate {
    pub fn from_records(day: NaiveDate, records: &[ConsumptionRecord]) -> Self {
        let mut counts: HashMap<ContentType, i64> = HashMap::new();
        let mut seconds_by_type: HashMap<ContentType, i64> = HashMap::new();
        let mut total_seconds = 0;

        for record in records {
            total_seconds += record.time_spent_seconds;
            *counts.entry(record.content_type).or_insert(0) += 1;
            *seconds_by_type.entry(record.content_type).or_insert(0) +=
                record.time_spent_seconds;
        }

        Self {
            day,
            total_seconds,
            total_count: records.len() as i64,
            counts,
            seconds_by_type,
        }
    }

    pub fn minutes(&self) -> f64 {
        self.total_seconds as f64 / 60.0
    }

    pub fn count_for(&self, content_type: ContentType) -> i64 {
        self.counts.get(&content_type).copied().unwrap_or(0)
    }

    pub fn seconds_for(&self, content_type: ContentType) -> i64 {
        self.seconds_by_type
            .get(&content_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<ContentType, i64> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(content_type: ContentType, seconds: i64) -> ConsumptionRecord {
        ConsumptionRecord {
            id: format!("cr_{}", uuid::Uuid::new_v4()),
            user_id: "u1".into(),
            content_type,
            url: None,
            title: None,
            time_spent_seconds: seconds,
            scroll_depth_percent: 0.0,
            credibility_score: None,
            bias_score: None,
            consumed_at: Utc::now(),
        }
    }

    #[test]
    fn folds_totals_and_per_type_counts() {
        let records = vec![
            record(ContentType::Article, 120),
            record(ContentType::Article, 60),
            record(ContentType::Video, 300),
        ];
        let agg = DailyAggregate::from_records(Utc::now().date_naive(), &records);

        assert_eq!(agg.total_seconds, 480);
        assert_eq!(agg.total_count, 3);
        assert_eq!(agg.minutes(), 8.0);
        assert_eq!(agg.count_for(ContentType::Article), 2);
        assert_eq!(agg.seconds_for(ContentType::Video), 300);
        assert_eq!(agg.count_for(ContentType::SocialPost), 0);
    }
}
