use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Inactive,
    Active,
    Ended,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Inactive => "Inactive",
            SessionState::Active => "Active",
            SessionState::Ended => "Ended",
        }
    }
}

/// Per-user engagement session. At most one Active session per user;
/// ended sessions never reopen, a later start begins a fresh accumulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub accumulated_seconds: i64,
}

impl Session {
    pub fn inactive(user_id: String) -> Self {
        Self {
            user_id,
            state: SessionState::Inactive,
            started_at: None,
            last_heartbeat_at: None,
            accumulated_seconds: 0,
        }
    }

    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::Active;
        self.started_at = Some(now);
        self.last_heartbeat_at = Some(now);
        self.accumulated_seconds = 0;
    }

    pub fn end(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::Ended;
        self.last_heartbeat_at = Some(now);
    }
}
