use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Broad failure classes surfaced at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Validation,
    Auth,
    NotFound,
    Storage,
    Internal,
}

/// Structured error returned by every public API call.
///
/// Carries the category, a human-readable message, and the moment the
/// failure was observed. Internal layers use `anyhow`; this is the shape
/// callers see.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub category: ErrorCategory,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Auth, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn storage(err: anyhow::Error) -> Self {
        Self::new(ErrorCategory::Storage, format!("{err:#}"))
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(ErrorCategory::Internal, format!("{err:#}"))
    }
}
