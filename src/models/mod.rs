//! Domain models shared across the pipeline.

pub mod activity;
pub mod consumption;
pub mod notification;
pub mod preferences;
pub mod session;

pub use activity::{ActivitySample, ContentSnapshot};
pub use consumption::{ConsumptionDraft, ConsumptionRecord, ContentType};
pub use notification::{CheckKind, Notification, NotificationPriority};
pub use preferences::{ThresholdConfig, WellnessGoal};
pub use session::{Session, SessionState};
