//! Adjustment rule and time-window gates. No I/O, no clock reads.

use chrono::{DateTime, TimeDelta, Utc};

use crate::state::{AdjustmentState, NotificationState};

/// True iff `target - ambient < threshold`. Equality does not adjust.
pub fn should_adjust(ambient: f64, target: f64, threshold: f64) -> bool {
    (target - ambient) < threshold
}

pub fn calculate_new_target(ambient: f64, target: f64, threshold: f64, step: f64) -> f64 {
    if should_adjust(ambient, target, threshold) {
        target - step
    } else {
        target
    }
}

pub fn is_in_cooldown(state: &AdjustmentState, now: DateTime<Utc>, cooldown_secs: u64) -> bool {
    in_window(state.last_adjustment_time, now, cooldown_secs)
}

/// Whole seconds until the cooldown ends, 0 when not cooling down.
pub fn cooldown_remaining(state: &AdjustmentState, now: DateTime<Utc>, cooldown_secs: u64) -> u64 {
    window_remaining(state.last_adjustment_time, now, cooldown_secs)
}

/// Cooldown is checked first and overrides the temperature rule.
pub fn should_adjust_with_cooldown(
    ambient: f64,
    target: f64,
    state: &AdjustmentState,
    now: DateTime<Utc>,
    threshold: f64,
    cooldown_secs: u64,
) -> bool {
    if is_in_cooldown(state, now, cooldown_secs) {
        return false;
    }
    should_adjust(ambient, target, threshold)
}

pub fn is_rate_limited(state: &NotificationState, now: DateTime<Utc>, window_secs: u64) -> bool {
    in_window(state.last_notification_time, now, window_secs)
}

pub fn rate_limit_remaining(state: &NotificationState, now: DateTime<Utc>, window_secs: u64) -> u64 {
    window_remaining(state.last_notification_time, now, window_secs)
}

/// End of a window opened at `start`; `None` when it cannot be represented.
fn window_end(start: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    start.checked_add_signed(TimeDelta::try_seconds(secs)?)
}

fn in_window(start: Option<DateTime<Utc>>, now: DateTime<Utc>, secs: u64) -> bool {
    match start {
        None => false,
        Some(start) => match window_end(start, secs) {
            Some(end) => now < end,
            None => true,
        },
    }
}

fn window_remaining(start: Option<DateTime<Utc>>, now: DateTime<Utc>, secs: u64) -> u64 {
    let Some(start) = start else {
        return 0;
    };
    match window_end(start, secs) {
        Some(end) if now < end => u64::try_from((end - now).num_seconds()).unwrap_or(0),
        Some(_) => 0,
        None => secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> TimeDelta {
        TimeDelta::seconds(n)
    }

    #[test]
    fn threshold_is_strict() {
        assert!(should_adjust(72.0, 75.0, 5.0));
        assert!(!should_adjust(70.0, 75.0, 5.0));
        assert!(!should_adjust(60.0, 75.0, 5.0));
        // target below ambient is a negative differential
        assert!(should_adjust(80.0, 75.0, 5.0));
    }

    #[test]
    fn new_target_steps_down_only_when_triggered() {
        assert_eq!(calculate_new_target(72.0, 75.0, 5.0, 5.0), 70.0);
        assert_eq!(calculate_new_target(70.0, 75.0, 5.0, 5.0), 75.0);
        assert_eq!(calculate_new_target(74.0, 75.0, 5.0, 2.5), 72.5);
    }

    #[test]
    fn no_adjustment_means_no_cooldown() {
        let s = AdjustmentState::default();
        assert!(!is_in_cooldown(&s, t0(), 1800));
        assert_eq!(cooldown_remaining(&s, t0(), 1800), 0);
    }

    #[test]
    fn cooldown_window_is_half_open() {
        let s = AdjustmentState::default().record_adjustment(72.0, 70.0, t0());

        assert!(is_in_cooldown(&s, t0(), 1800));
        assert!(is_in_cooldown(&s, t0() + secs(1799), 1800));
        assert!(!is_in_cooldown(&s, t0() + secs(1800), 1800));
        assert!(!is_in_cooldown(&s, t0() + secs(5000), 1800));
    }

    #[test]
    fn cooldown_remaining_truncates() {
        let s = AdjustmentState::default().record_adjustment(72.0, 70.0, t0());
        assert_eq!(cooldown_remaining(&s, t0(), 1800), 1800);
        assert_eq!(cooldown_remaining(&s, t0() + TimeDelta::milliseconds(1500), 1800), 1798);
        assert_eq!(cooldown_remaining(&s, t0() + secs(1800), 1800), 0);
    }

    #[test]
    fn cooldown_overrides_temperature_rule() {
        let s = AdjustmentState::default().record_adjustment(72.0, 70.0, t0());
        let now = t0() + secs(60);
        // differential of -10 would normally adjust
        assert!(should_adjust(80.0, 70.0, 5.0));
        assert!(!should_adjust_with_cooldown(80.0, 70.0, &s, now, 5.0, 1800));
        assert!(should_adjust_with_cooldown(80.0, 70.0, &s, t0() + secs(1800), 5.0, 1800));
    }

    #[test]
    fn rate_limit_mirrors_cooldown() {
        let s = NotificationState::default();
        assert!(!is_rate_limited(&s, t0(), 3600));

        let s = s.record_sent(t0());
        assert!(is_rate_limited(&s, t0() + secs(3599), 3600));
        assert_eq!(rate_limit_remaining(&s, t0() + secs(600), 3600), 3000);
        assert!(!is_rate_limited(&s, t0() + secs(3600), 3600));
        assert_eq!(rate_limit_remaining(&s, t0() + secs(3600), 3600), 0);
    }

    #[test]
    fn five_events_in_one_window_send_once() {
        let mut s = NotificationState::default();
        for i in 0..5 {
            let now = t0() + secs(50 * i);
            s = if is_rate_limited(&s, now, 3600) {
                s.record_suppressed()
            } else {
                s.record_sent(now)
            };
        }
        assert_eq!(s.notification_count, 1);
        assert_eq!(s.notifications_suppressed, 4);
    }

    #[test]
    fn unrepresentable_window_stays_closed() {
        let s = AdjustmentState::default().record_adjustment(72.0, 70.0, t0());
        assert!(is_in_cooldown(&s, t0() + secs(10), u64::MAX));
    }
}
