//! Session lifecycle and the public API surface.

mod api;
mod coordinator;

pub use api::{MindfeedApi, TodayStats, UpdateSessionRequest};
pub use coordinator::{SessionCoordinator, UpdateInput, UpdateOutcome};
