use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content a page view was classified as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Article,
    Video,
    Podcast,
    SocialPost,
    Webpage,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Video => "video",
            ContentType::Podcast => "podcast",
            ContentType::SocialPost => "social_post",
            ContentType::Webpage => "webpage",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "article" => Ok(ContentType::Article),
            "video" => Ok(ContentType::Video),
            "podcast" => Ok(ContentType::Podcast),
            "social_post" => Ok(ContentType::SocialPost),
            "webpage" => Ok(ContentType::Webpage),
            other => Err(anyhow!("unknown content type '{other}'")),
        }
    }
}

/// One logged content-engagement unit, append-only once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionRecord {
    pub id: String,
    pub user_id: String,
    pub content_type: ContentType,
    pub url: Option<String>,
    pub title: Option<String>,
    pub time_spent_seconds: i64,
    pub scroll_depth_percent: f64,
    pub credibility_score: Option<f64>,
    pub bias_score: Option<f64>,
    pub consumed_at: DateTime<Utc>,
}

/// Client-side record captured at page unload, queued for sync before it
/// becomes a `ConsumptionRecord` server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionDraft {
    pub content_type: ContentType,
    pub url: Option<String>,
    pub title: Option<String>,
    pub time_spent_seconds: i64,
    pub scroll_depth_percent: f64,
    pub credibility_score: Option<f64>,
    pub bias_score: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_round_trips_through_str() {
        for ct in [
            ContentType::Article,
            ContentType::Video,
            ContentType::Podcast,
            ContentType::SocialPost,
            ContentType::Webpage,
        ] {
            assert_eq!(ContentType::parse(ct.as_str()).unwrap(), ct);
        }
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        assert!(ContentType::parse("newsletter").is_err());
    }
}
