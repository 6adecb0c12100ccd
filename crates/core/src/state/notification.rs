use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification rate-limit bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationState {
    pub last_notification_time: Option<DateTime<Utc>>,
    pub notification_count: u64,
    pub notifications_suppressed: u64,
}

impl NotificationState {
    #[must_use]
    pub fn record_sent(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_notification_time: Some(now),
            notification_count: self.notification_count + 1,
            notifications_suppressed: self.notifications_suppressed,
        }
    }

    #[must_use]
    pub fn record_suppressed(&self) -> Self {
        Self {
            notifications_suppressed: self.notifications_suppressed + 1,
            ..self.clone()
        }
    }
}
