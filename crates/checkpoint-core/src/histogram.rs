//! Completed-passenger counts per fixed interval of simulated time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::SimMillis;

/// Buckets keyed by interval start in whole seconds. Every interval up to the
/// current one exists once [`backfill`](Histogram::backfill) has run, so
/// quiet periods show as zero rather than a gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    interval_secs: u64,
    buckets: BTreeMap<u64, u32>,
}

impl Histogram {
    /// `interval_secs` is clamped to at least 1.
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval_secs: interval_secs.max(1),
            buckets: BTreeMap::new(),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Start of the interval containing `time`, in seconds.
    pub fn bucket_for(&self, time: SimMillis) -> u64 {
        let secs = time / 1000;
        secs - secs % self.interval_secs
    }

    /// Ensure every bucket from 0 through the one containing `time` exists.
    pub fn backfill(&mut self, time: SimMillis) {
        let current = self.bucket_for(time);
        // Buckets are always contiguous from 0, so resume after the last one.
        let mut start = self
            .buckets
            .last_key_value()
            .map_or(0, |(&last, _)| last + self.interval_secs);
        while start <= current {
            self.buckets.entry(start).or_insert(0);
            start += self.interval_secs;
        }
    }

    /// Count one completion at `time`.
    pub fn record(&mut self, time: SimMillis) {
        self.backfill(time);
        *self.buckets.entry(self.bucket_for(time)).or_insert(0) += 1;
    }

    pub fn buckets(&self) -> &BTreeMap<u64, u32> {
        &self.buckets
    }

    pub fn total(&self) -> u64 {
        self.buckets.values().map(|&n| u64::from(n)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_creates_empty_buckets() {
        let mut h = Histogram::new(30);
        h.backfill(95_000);
        let keys: Vec<u64> = h.buckets().keys().copied().collect();
        assert_eq!(keys, vec![0, 30, 60, 90]);
        assert_eq!(h.total(), 0);
    }

    #[test]
    fn record_lands_in_interval() {
        let mut h = Histogram::new(30);
        h.record(29_900);
        h.record(30_000);
        h.record(31_000);
        assert_eq!(h.buckets()[&0], 1);
        assert_eq!(h.buckets()[&30], 2);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn backfill_is_idempotent() {
        let mut h = Histogram::new(30);
        h.record(5_000);
        h.backfill(5_000);
        h.backfill(5_000);
        assert_eq!(h.buckets().len(), 1);
        assert_eq!(h.buckets()[&0], 1);
    }
}
