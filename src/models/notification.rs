//! Notification kinds and the persisted notification row.
//!
//! Each check kind is a tagged variant carrying its own payload, so the
//! emitter and its consumers cannot drift on a stringly-typed "type"
//! field. The dedupe type string is derived from the variant (plus the
//! content type or goal tag where one check fans out per key).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

/// Threshold check outcomes, one variant per check kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CheckKind {
    TimeLimitWarning {
        minutes_spent: i64,
        limit_minutes: i64,
    },
    TimeLimitExceeded {
        minutes_spent: i64,
        limit_minutes: i64,
    },
    CountLimitWarning {
        content_type: ContentType,
        count: i64,
        limit: i64,
    },
    CountLimitExceeded {
        content_type: ContentType,
        count: i64,
        limit: i64,
    },
    BreakReminder {
        active_minutes: i64,
    },
    LowCredibility {
        average: f64,
        threshold: f64,
    },
    HighBias {
        average: f64,
        threshold: f64,
    },
    GoalAchieved {
        tag: String,
        minutes: i64,
        target_minutes: i64,
    },
    GoalReminder {
        tag: String,
        minutes: i64,
        target_minutes: i64,
    },
}

impl CheckKind {
    /// Dedupe key component: one notification per
    /// `(user, dedupe_type, day)` for daily-gated checks.
    pub fn dedupe_type(&self) -> String {
        match self {
            CheckKind::TimeLimitWarning { .. } => "time_limit_warning".into(),
            CheckKind::TimeLimitExceeded { .. } => "time_limit_exceeded".into(),
            CheckKind::CountLimitWarning { content_type, .. } => {
                format!("count_limit_warning:{}", content_type.as_str())
            }
            CheckKind::CountLimitExceeded { content_type, .. } => {
                format!("count_limit_exceeded:{}", content_type.as_str())
            }
            CheckKind::BreakReminder { .. } => "break_reminder".into(),
            CheckKind::LowCredibility { .. } => "low_credibility".into(),
            CheckKind::HighBias { .. } => "high_bias".into(),
            CheckKind::GoalAchieved { tag, .. } => format!("goal_achieved:{tag}"),
            CheckKind::GoalReminder { tag, .. } => format!("goal_reminder:{tag}"),
        }
    }

    pub fn priority(&self) -> NotificationPriority {
        match self {
            CheckKind::TimeLimitExceeded { .. } | CheckKind::CountLimitExceeded { .. } => {
                NotificationPriority::High
            }
            CheckKind::TimeLimitWarning { .. }
            | CheckKind::CountLimitWarning { .. }
            | CheckKind::LowCredibility { .. }
            | CheckKind::HighBias { .. } => NotificationPriority::Normal,
            CheckKind::BreakReminder { .. }
            | CheckKind::GoalAchieved { .. }
            | CheckKind::GoalReminder { .. } => NotificationPriority::Low,
        }
    }

    pub fn title(&self) -> String {
        match self {
            CheckKind::TimeLimitWarning { .. } => "Approaching your daily time limit".into(),
            CheckKind::TimeLimitExceeded { .. } => "Daily time limit reached".into(),
            CheckKind::CountLimitWarning { content_type, .. } => {
                format!("Approaching your daily {} limit", content_type.as_str())
            }
            CheckKind::CountLimitExceeded { content_type, .. } => {
                format!("Daily {} limit reached", content_type.as_str())
            }
            CheckKind::BreakReminder { .. } => "Time for a break".into(),
            CheckKind::LowCredibility { .. } => "Low-credibility reading pattern".into(),
            CheckKind::HighBias { .. } => "High-bias reading pattern".into(),
            CheckKind::GoalAchieved { tag, .. } => format!("Goal reached: {tag}"),
            CheckKind::GoalReminder { tag, .. } => format!("Goal reminder: {tag}"),
        }
    }

    pub fn message(&self) -> String {
        match self {
            CheckKind::TimeLimitWarning {
                minutes_spent,
                limit_minutes,
            } => format!(
                "You've spent {minutes_spent} of your {limit_minutes} minute daily limit."
            ),
            CheckKind::TimeLimitExceeded {
                minutes_spent,
                limit_minutes,
            } => format!(
                "You've spent {minutes_spent} minutes today, past your {limit_minutes} minute limit."
            ),
            CheckKind::CountLimitWarning {
                content_type,
                count,
                limit,
            } => format!(
                "{count} of {limit} {} items today.",
                content_type.as_str()
            ),
            CheckKind::CountLimitExceeded {
                content_type,
                count,
                limit,
            } => format!(
                "{count} {} items today, past your limit of {limit}.",
                content_type.as_str()
            ),
            CheckKind::BreakReminder { active_minutes } => format!(
                "You've been reading for {active_minutes} minutes straight. Step away for a moment."
            ),
            CheckKind::LowCredibility { average, threshold } => format!(
                "Average credibility of your recent reading is {average:.2}, below your {threshold:.2} floor."
            ),
            CheckKind::HighBias { average, threshold } => format!(
                "Average bias of your recent reading is {average:.2}, above your {threshold:.2} ceiling."
            ),
            CheckKind::GoalAchieved {
                minutes,
                target_minutes,
                ..
            } => format!("{minutes} of {target_minutes} minutes. Nicely done."),
            CheckKind::GoalReminder {
                minutes,
                target_minutes,
                ..
            } => format!("Only {minutes} of {target_minutes} minutes so far today."),
        }
    }
}

/// A persisted, user-visible alert. Mutable only via the read-state
/// toggle or deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: CheckKind,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub read: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_kind(user_id: &str, kind: CheckKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("nt_{}", uuid::Uuid::new_v4()),
            user_id: user_id.to_string(),
            title: kind.title(),
            message: kind.message(),
            priority: kind.priority(),
            kind,
            read: false,
            expires_at: None,
            created_at,
        }
    }
}
