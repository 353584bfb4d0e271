//! Local buffering between the activity tracker and the network.
//!
//! Deliberately lossy: bounded ring buffers decouple tracking from
//! network reliability, and sustained offline use evicts the oldest
//! records instead of growing without bound.

mod ring;
pub mod sync_queue;

pub use ring::RingBuffer;
pub use sync_queue::{AnalysisEntry, SyncQueue, SyncTransport};

/// Capacity of the analysis-history buffer.
pub const ANALYSIS_HISTORY_CAP: usize = 100;
/// Capacity of the consumption-draft buffer.
pub const CONSUMPTION_QUEUE_CAP: usize = 500;
