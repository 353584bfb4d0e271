//! Content-consumption monitoring and wellness notifications.
//!
//! The pipeline runs in four stages: the [`tracker`] turns page
//! snapshots and interaction events into consumption drafts, the
//! [`buffer`] queues drafts and analysis results for background sync,
//! the [`session`] coordinator persists records and drives the
//! [`limits`] evaluator, and the evaluator emits deduplicated wellness
//! notifications through [`notify`]. [`session::MindfeedApi`] ties the
//! stages together over one SQLite handle.

pub mod analysis;
pub mod buffer;
pub mod db;
pub mod error;
pub mod limits;
pub mod models;
pub mod notify;
pub mod session;
pub mod tracker;

pub use error::{ApiError, ErrorCategory};
pub use session::{MindfeedApi, TodayStats, UpdateSessionRequest};
