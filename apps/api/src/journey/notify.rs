use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::journey::stage::Stage;

const RECENT_CAPACITY: usize = 20;
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// Transient message for the presentation layer ("toast").
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub stage: Stage,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Fans notifications out to live subscribers and keeps the latest few for
/// clients that poll.
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    recent: Mutex<VecDeque<Notification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_CAPACITY)),
        }
    }
}

impl Notifier {
    pub fn success(&self, stage: Stage) {
        self.publish(NotificationKind::Success, stage, format!("{} completed", stage.name()));
    }

    pub fn failure(&self, stage: Stage, error: &str) {
        self.publish(
            NotificationKind::Failure,
            stage,
            format!("{} failed: {error}", stage.name()),
        );
    }

    fn publish(&self, kind: NotificationKind, stage: Stage, message: String) {
        let notification = Notification {
            kind,
            stage,
            message,
            at: Utc::now(),
        };
        {
            let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
            if recent.len() == RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(notification.clone());
        }
        // No subscribers is fine.
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
