//! Error types for configuration, the control surface and pipeline integrity.

use serde::{Deserialize, Serialize};

use crate::fixed::SimMillis;
use crate::id::{BagId, LaneId, PassengerId};

/// A configuration that the engine refuses to build state from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick duration must be greater than zero")]
    ZeroTickDuration,
    #[error("tick duration {0} ms exceeds one minute")]
    TickTooLong(u64),
    #[error("histogram interval must be greater than zero")]
    ZeroHistogramInterval,
    #[error("main queue capacity must be greater than zero")]
    ZeroMainQueueCapacity,
    #[error("catch-up limit must allow at least one tick")]
    ZeroCatchUp,
    #[error("at least one security lane is required")]
    NoLanes,
    #[error("lane {lane}: {station} must be greater than zero")]
    ZeroCapacity { lane: usize, station: &'static str },
    #[error("lane {lane}: {bays} unloading bays exceed the unload queue capacity {capacity}")]
    BaysExceedUnloadQueue {
        lane: usize,
        bays: usize,
        capacity: usize,
    },
    #[error("lane {lane}: bag scanner throughput must be greater than zero")]
    ZeroThroughput { lane: usize },
    #[error("lane {lane}: body scan time must be finite with a non-negative spread and a positive floor")]
    InvalidScanTime { lane: usize },
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("lane {lane}: body scan time parameters must not exceed one hour")]
    ScanTimeTooLong { lane: usize },
    #[error("unload assist boost must be within [0, 100], got {0}")]
    InvalidAssistBoost(f64),
    #[error("passenger profile needs at least one nationality")]
    NoNationalities,
}

/// A control-surface call that left the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("passenger {0} is not in the main queue")]
    PassengerNotFound(PassengerId),
    #[error("{0} does not exist")]
    LaneNotFound(LaneId),
    #[error("{0} line is full")]
    LaneFull(LaneId),
    #[error("main queue is full")]
    MainQueueFull,
    #[error("passenger {0} already exists")]
    DuplicatePassenger(PassengerId),
    #[error("bag {0} is not in any lane or completed passenger")]
    BagNotFound(BagId),
    #[error("the game is over; reset to play again")]
    GameOver,
}

/// An inconsistency between a bag and its owner found by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum IntegrityError {
    #[error("{lane}: bag {bag} has no owner in the lane")]
    OrphanBag { lane: LaneId, bag: BagId },
}

/// An integrity error as it is kept in the game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    pub error: IntegrityError,
    pub message: String,
    /// Simulated time the error was detected.
    pub time: SimMillis,
}

impl RecordedError {
    pub fn new(error: IntegrityError, time: SimMillis) -> Self {
        Self {
            message: error.to_string(),
            error,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_error_keeps_message() {
        let error = IntegrityError::OrphanBag {
            lane: LaneId(0),
            bag: BagId("bag_1_2".into()),
        };
        let recorded = RecordedError::new(error.clone(), 4_200);
        assert_eq!(recorded.error, error);
        assert_eq!(recorded.time, 4_200);
        assert_eq!(recorded.message, "lane_1: bag bag_1_2 has no owner in the lane");
    }

    #[test]
    fn control_error_messages() {
        assert_eq!(ControlError::LaneFull(LaneId(1)).to_string(), "lane_2 line is full");
        assert_eq!(ControlError::MainQueueFull.to_string(), "main queue is full");
    }
}
