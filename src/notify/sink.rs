use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::notification::Notification;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification for {user_id} rejected: {reason}")]
    Rejected { user_id: String, reason: String },
}

/// Append-only per-user message log.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, user_id: &str, message: &str) -> Result<Notification, NotifyError>;

    /// Newest first.
    fn for_user(&self, user_id: &str) -> Vec<Notification>;

    fn subscribe(&self) -> broadcast::Receiver<Notification>;
}

pub struct MemoryNotificationSink {
    inbox: DashMap<String, Vec<Notification>>,
    events_tx: broadcast::Sender<Notification>,
}

impl MemoryNotificationSink {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));
        Self {
            inbox: DashMap::new(),
            events_tx,
        }
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn notify(&self, user_id: &str, message: &str) -> Result<Notification, NotifyError> {
        if user_id.trim().is_empty() {
            return Err(NotifyError::Rejected {
                user_id: user_id.to_string(),
                reason: "empty recipient".to_string(),
            });
        }

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };

        self.inbox
            .entry(user_id.to_string())
            .or_default()
            .push(notification.clone());
        let _ = self.events_tx.send(notification.clone());

        Ok(notification)
    }

    fn for_user(&self, user_id: &str) -> Vec<Notification> {
        self.inbox
            .get(user_id)
            .map(|entry| entry.value().iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events_tx.subscribe()
    }
}
