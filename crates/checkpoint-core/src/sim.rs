//! Simulation strategy and driver bookkeeping.
//!
//! The engine is parameterized by a [`SimulationStrategy`] that determines how
//! time advances. Both strategies run the same tick pipeline; they differ only
//! in how many ticks run per `advance()` call.

use std::hash::Hasher;

use crate::command_queue::Command;
use crate::error::ControlError;
use crate::fixed::{Fixed64, SimMillis};

// ---------------------------------------------------------------------------
// Simulation strategy
// ---------------------------------------------------------------------------

/// How the engine advances time. Chosen at engine construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SimulationStrategy {
    /// One tick per `advance()` call, whatever the elapsed time. The driver
    /// calls it at the tick rate. Deterministic by construction.
    Tick,

    /// Real-time mode. `advance(elapsed_ms)` accumulates wall time and runs
    /// as many fixed ticks as fit, up to the configured catch-up limit,
    /// carrying the remainder forward.
    Delta,
}

// ---------------------------------------------------------------------------
// Driver state
// ---------------------------------------------------------------------------

/// Wall-time accumulator for delta mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DriverState {
    /// Elapsed time not yet consumed by a tick. Always below one tick after
    /// `advance()` returns.
    pub accumulator_ms: SimMillis,
    /// Ticks dropped by the catch-up limit since the engine was created.
    pub total_skipped: u64,
}

impl DriverState {
    /// Add `elapsed_ms` and split the accumulator into ticks to run now and
    /// ticks to drop. The remainder below one tick is kept.
    pub fn plan(&mut self, elapsed_ms: SimMillis, tick_ms: SimMillis, max_ticks: u32) -> (u64, u64) {
        let tick_ms = tick_ms.max(1);
        self.accumulator_ms = self.accumulator_ms.saturating_add(elapsed_ms);
        let due = self.accumulator_ms / tick_ms;
        self.accumulator_ms %= tick_ms;
        let run = due.min(u64::from(max_ticks));
        let skipped = due - run;
        self.total_skipped += skipped;
        (run, skipped)
    }
}

// ---------------------------------------------------------------------------
// Advance result
// ---------------------------------------------------------------------------

/// Result of an `Engine::advance()` call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Number of ticks actually executed.
    pub steps_run: u64,
    /// Overdue ticks dropped by the catch-up limit.
    pub ticks_skipped: u64,
    /// Queued commands the engine refused, with the reason.
    pub rejected_commands: Vec<(Command, ControlError)>,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// 64-bit FNV-1a over the hashed state, for desync detection.
///
/// Integers are fed little-endian so the digest is identical on every
/// platform. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    /// Length-prefixed, so adjacent strings cannot alias.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write_i64(v.to_bits());
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StateHash {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &b| (h ^ u64::from(b)).wrapping_mul(Self::PRIME));
    }

    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.write(&v.to_le_bytes());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_carries_remainder() {
        let mut driver = DriverState::default();
        assert_eq!(driver.plan(250, 100, 10), (2, 0));
        assert_eq!(driver.accumulator_ms, 50);
        assert_eq!(driver.plan(50, 100, 10), (1, 0));
        assert_eq!(driver.accumulator_ms, 0);
    }

    #[test]
    fn plan_caps_catch_up_and_counts_skips() {
        let mut driver = DriverState::default();
        assert_eq!(driver.plan(5_030, 100, 10), (10, 40));
        assert_eq!(driver.accumulator_ms, 30);
        assert_eq!(driver.total_skipped, 40);
    }

    #[test]
    fn plan_below_one_tick_runs_nothing() {
        let mut driver = DriverState::default();
        assert_eq!(driver.plan(99, 100, 10), (0, 0));
        assert_eq!(driver.accumulator_ms, 99);
    }

    #[test]
    fn empty_hash_is_offset_basis() {
        assert_eq!(StateHash::new().finish(), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_str("passenger_0_1");

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_str("passenger_0_1");

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);

        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn string_boundaries_are_hashed() {
        let mut h1 = StateHash::new();
        h1.write_str("ab");
        h1.write_str("c");

        let mut h2 = StateHash::new();
        h2.write_str("a");
        h2.write_str("bc");

        assert_ne!(h1.finish(), h2.finish());
    }
}
