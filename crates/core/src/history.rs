use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::types::{AdjustmentEvent, TemperatureReading};

/// 24 hours of one-minute polls.
pub const READING_HISTORY_CAP: usize = 1440;
pub const ADJUSTMENT_HISTORY_CAP: usize = 100;

/// Anything that can be filtered by time window.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for TemperatureReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for AdjustmentEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Bounded FIFO history. The oldest entry is evicted once `cap` is exceeded.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn with_cap(cap: usize) -> Self {
        Self { entries: VecDeque::with_capacity(cap.min(READING_HISTORY_CAP)), cap }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Most recent first, at most `limit` entries.
    pub fn latest(&self, limit: usize) -> Vec<T> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone + Timestamped> HistoryBuffer<T> {
    /// Entries at or after `cutoff`, in insertion order.
    pub fn since(&self, cutoff: DateTime<Utc>) -> Vec<T> {
        self.entries
            .iter()
            .filter(|e| e.timestamp() >= cutoff)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn reading(n: u32, at: DateTime<Utc>) -> TemperatureReading {
        TemperatureReading::new(60.0 + f64::from(n), 75.0, format!("t{n}"), at)
    }

    #[test]
    fn never_exceeds_cap_and_evicts_oldest() {
        let now = Utc::now();
        let mut buf = HistoryBuffer::with_cap(READING_HISTORY_CAP);
        for n in 0..1500 {
            buf.push(reading(n, now));
        }
        assert_eq!(buf.len(), READING_HISTORY_CAP);
        assert_eq!(buf.iter().next().unwrap().thermostat_id, "t60");
        assert_eq!(buf.last().unwrap().thermostat_id, "t1499");
    }

    #[test]
    fn latest_is_most_recent_first() {
        let mut buf = HistoryBuffer::with_cap(ADJUSTMENT_HISTORY_CAP);
        for n in 0..150 {
            buf.push(n);
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.latest(3), vec![149, 148, 147]);
        assert_eq!(buf.latest(500).len(), 100);
        assert!(buf.latest(0).is_empty());
    }

    #[test]
    fn since_filters_and_keeps_order() {
        let now = Utc::now();
        let mut buf = HistoryBuffer::with_cap(10);
        buf.push(reading(1, now - TimeDelta::hours(30)));
        buf.push(reading(2, now - TimeDelta::hours(2)));
        buf.push(reading(3, now - TimeDelta::minutes(5)));

        let recent = buf.since(now - TimeDelta::hours(24));
        let ids: Vec<_> = recent.iter().map(|r| r.thermostat_id.as_str()).collect();
        assert_eq!(ids, ["t2", "t3"]);
    }

    #[test]
    fn readings_come_back_unchanged() {
        let now = Utc::now();
        let mut original = reading(7, now);
        original.humidity = Some(44.0);
        original.hvac_mode = Some("HEAT".into());

        let mut buf = HistoryBuffer::with_cap(READING_HISTORY_CAP);
        buf.push(original.clone());
        assert_eq!(buf.since(now - TimeDelta::hours(1)), vec![original]);
    }
}
