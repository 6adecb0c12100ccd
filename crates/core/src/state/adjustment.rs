use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last applied adjustment and the running total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentState {
    /// Set iff at least one adjustment has been recorded.
    pub last_adjustment_time: Option<DateTime<Utc>>,
    pub last_adjustment_ambient: Option<f64>,
    pub last_adjustment_target: Option<f64>,
    pub adjustment_count: u64,
}

impl AdjustmentState {
    /// The only mutator. Cooldown expiry is a function of time, not a transition.
    #[must_use]
    pub fn record_adjustment(&self, ambient: f64, new_target: f64, now: DateTime<Utc>) -> Self {
        Self {
            last_adjustment_time: Some(now),
            last_adjustment_ambient: Some(ambient),
            last_adjustment_target: Some(new_target),
            adjustment_count: self.adjustment_count + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sets_every_field_and_counts() {
        let now = Utc::now();
        let s0 = AdjustmentState::default();
        let s1 = s0.record_adjustment(72.0, 70.0, now);

        assert_eq!(s0.adjustment_count, 0);
        assert!(s0.last_adjustment_time.is_none());

        assert_eq!(s1.last_adjustment_time, Some(now));
        assert_eq!(s1.last_adjustment_ambient, Some(72.0));
        assert_eq!(s1.last_adjustment_target, Some(70.0));
        assert_eq!(s1.adjustment_count, 1);

        let s2 = s1.record_adjustment(68.0, 65.0, now);
        assert_eq!(s2.adjustment_count, 2);
        assert_eq!(s2.last_adjustment_target, Some(65.0));
    }
}
