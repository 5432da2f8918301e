//! Two-stage scanning station shared by the body and bag scanners.
//!
//! A [`Scanner`] holds a `waiting` queue and a `processing` queue. Items are
//! admitted by the lane (which applies its own owner checks), then every
//! item in `processing` accrues elapsed time until it reaches the time it
//! needs. Completed items stay in `processing`, holding their slot, until the
//! lane takes them out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BodyScanTime;
use crate::fixed::{Fixed64, SimMillis, f64_secs_to_millis, percent_of};
use crate::id::Identified;
use crate::queue::{BoundedQueue, RejectReason};
use crate::rng::RandomSource;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long one item takes to scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanTiming {
    /// Constant time per item derived from a throughput.
    Throughput { items_per_minute: u32 },
    /// Drawn per item from a normal distribution, floored.
    Sampled(BodyScanTime),
}

impl ScanTiming {
    /// Milliseconds the next admitted item will need.
    pub fn draw<R: RandomSource>(&self, rng: &mut R) -> SimMillis {
        match self {
            ScanTiming::Throughput { items_per_minute } => {
                60_000 / SimMillis::from((*items_per_minute).max(1))
            }
            ScanTiming::Sampled(t) => {
                let secs = rng.normal(t.mean_secs, t.std_dev_secs).max(t.floor_secs);
                f64_secs_to_millis(secs).max(1)
            }
        }
    }
}

/// Elapsed versus required scan time for one item in `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub elapsed_ms: SimMillis,
    pub needed_ms: SimMillis,
}

impl ScanProgress {
    pub fn percent(&self) -> Fixed64 {
        percent_of(self.elapsed_ms, self.needed_ms)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.needed_ms
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, T::Id: Serialize",
    deserialize = "T: Deserialize<'de>, T::Id: Deserialize<'de>"
))]
pub struct Scanner<T: Identified> {
    pub waiting: BoundedQueue<T>,
    pub processing: BoundedQueue<T>,
    progress: BTreeMap<T::Id, ScanProgress>,
    pub timing: ScanTiming,
    /// A scanner that is not operational admits and advances nothing.
    pub operational: bool,
}

impl<T: Identified> Scanner<T> {
    pub fn new(
        waiting_capacity: usize,
        processing_capacity: usize,
        timing: ScanTiming,
        operational: bool,
    ) -> Self {
        Self {
            waiting: BoundedQueue::new(waiting_capacity),
            processing: BoundedQueue::new(processing_capacity),
            progress: BTreeMap::new(),
            timing,
            operational,
        }
    }

    /// Whether admission can run this tick.
    pub fn can_admit(&self) -> bool {
        self.operational && !self.processing.is_full() && !self.waiting.is_empty()
    }

    /// Move the front of `waiting` into `processing` with zero progress.
    ///
    /// Returns the admitted ID, `Ok(None)` when nothing is waiting, or why
    /// `processing` refused it (the item then stays at the front of `waiting`).
    pub fn admit_front(&mut self, needed_ms: SimMillis) -> Result<Option<T::Id>, RejectReason> {
        let Some(id) = self.waiting.transfer_front(&mut self.processing)? else {
            return Ok(None);
        };
        self.progress.insert(
            id.clone(),
            ScanProgress {
                elapsed_ms: 0,
                needed_ms,
            },
        );
        Ok(Some(id))
    }

    /// The item admitted most recently.
    pub fn last_admitted_mut(&mut self) -> Option<&mut T> {
        self.processing.back_mut()
    }

    /// Accrue `dt_ms` on every item still scanning.
    pub fn advance(&mut self, dt_ms: SimMillis) {
        if !self.operational {
            return;
        }
        for entry in self.progress.values_mut() {
            if !entry.is_complete() {
                entry.elapsed_ms = entry.elapsed_ms.saturating_add(dt_ms).min(entry.needed_ms);
            }
        }
    }

    pub fn progress(&self, id: &T::Id) -> Option<ScanProgress> {
        self.progress.get(id).copied()
    }

    /// Scan progress in percent, or `None` if the item is not in `processing`.
    pub fn percent(&self, id: &T::Id) -> Option<Fixed64> {
        self.progress.get(id).map(ScanProgress::percent)
    }

    pub fn is_complete(&self, id: &T::Id) -> bool {
        self.progress.get(id).is_some_and(ScanProgress::is_complete)
    }

    /// IDs of finished items, in `processing` order.
    pub fn completed_ids(&self) -> Vec<T::Id> {
        self.processing
            .iter()
            .map(|item| item.id())
            .filter(|id| self.is_complete(id))
            .cloned()
            .collect()
    }

    /// Remove an item from `processing` together with its progress entry.
    pub fn take(&mut self, id: &T::Id) -> Option<T> {
        let item = self.processing.remove_by_id(id)?;
        self.progress.remove(id);
        Some(item)
    }

    /// Move an item from `processing` to the back of `dest`, dropping its
    /// progress entry. A refused item keeps its slot and progress.
    pub fn release_to(&mut self, id: &T::Id, dest: &mut BoundedQueue<T>) -> Result<bool, RejectReason> {
        let moved = self.processing.transfer_by_id(id, dest)?;
        if moved {
            self.progress.remove(id);
        }
        Ok(moved)
    }

    /// Every item held by the scanner, `waiting` first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.waiting.iter().chain(self.processing.iter())
    }

    pub fn len(&self) -> usize {
        self.waiting.len() + self.processing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every progress entry belongs to an item in `processing` and vice versa.
    pub fn progress_consistent(&self) -> bool {
        self.progress.len() == self.processing.len()
            && self.processing.iter().all(|item| self.progress.contains_key(item.id()))
    }
}
