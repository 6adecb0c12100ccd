use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error counters and the one-shot alert latch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorState {
    /// Cumulative; only [`ErrorState::reset`] clears it.
    pub error_count: u64,
    /// Failures since the last successful cycle.
    pub consecutive_errors: u64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
    /// Set once per episode on a confirmed alert send.
    pub alert_sent: bool,
}

impl ErrorState {
    #[must_use]
    pub fn record_error(&self, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            error_count: self.error_count + 1,
            consecutive_errors: self.consecutive_errors + 1,
            last_error: Some(message.into()),
            last_error_time: Some(now),
            alert_sent: self.alert_sent,
        }
    }

    /// Ends the consecutive streak; history and the latch are kept.
    #[must_use]
    pub fn record_success(&self) -> Self {
        Self {
            consecutive_errors: 0,
            ..self.clone()
        }
    }

    /// Compares the cumulative count, not the streak, so isolated failures
    /// spread over a long uptime eventually alert too.
    pub fn should_send_alert(&self, threshold: u64) -> bool {
        self.error_count >= threshold && !self.alert_sent
    }

    #[must_use]
    pub fn mark_alert_sent(&self) -> Self {
        Self {
            alert_sent: true,
            ..self.clone()
        }
    }

    /// Operator reset. Never applied automatically.
    pub fn reset() -> Self {
        Self::default()
    }

    /// Fold a record persisted by an earlier run into this one.
    #[must_use]
    pub fn merged_with(&self, earlier: &ErrorState) -> Self {
        Self {
            error_count: self.error_count + earlier.error_count,
            consecutive_errors: self.consecutive_errors,
            last_error: self.last_error.clone().or_else(|| earlier.last_error.clone()),
            last_error_time: self.last_error_time.or(earlier.last_error_time),
            alert_sent: self.alert_sent || earlier.alert_sent,
        }
    }
}
