use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;
use tokio::sync::broadcast;

use crate::models::Notification;

const FEED_CAPACITY: usize = 64;

/// Per-user publish/subscribe channel for freshly emitted notifications.
/// Clients reconcile by notification id; the transport beyond this
/// channel is out of scope.
#[derive(Default)]
pub struct NotificationFeed {
    channels: Mutex<HashMap<String, broadcast::Sender<Notification>>>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .subscribe()
    }

    /// Push one notification to the user's feed. Nobody listening is
    /// fine; persisted rows are the source of truth.
    pub fn publish(&self, notification: &Notification) {
        let channels = self.channels.lock().unwrap();
        if let Some(sender) = channels.get(&notification.user_id) {
            if sender.send(notification.clone()).is_err() {
                debug!(
                    "no live subscribers for user {}, feed push dropped",
                    notification.user_id
                );
            }
        }
    }
}
