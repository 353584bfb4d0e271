//! Notification persistence and the per-user real-time feed.

mod emitter;
mod feed;

pub use emitter::{DedupePolicy, NotificationEmitter};
pub use feed::NotificationFeed;
