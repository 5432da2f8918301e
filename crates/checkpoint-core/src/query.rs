//! Read-only query API for inspecting simulation state.
//!
//! Provides snapshot types that aggregate lane state into convenient views
//! for rendering and UI. All types are owned copies -- no references into
//! internal engine storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::entity::{Bag, Passenger};
use crate::fixed::Fixed64;
use crate::id::{BagId, LaneId, PassengerId};
use crate::lane::SecurityLane;
use crate::rng::RandomSource;

// ---------------------------------------------------------------------------
// Lane snapshot
// ---------------------------------------------------------------------------

/// Occupancy and capacity of one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub len: usize,
    pub capacity: usize,
}

impl Occupancy {
    /// Fill level as a 0..1 fraction.
    pub fn utilization(&self) -> Fixed64 {
        if self.capacity == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::saturating_from_num(self.len as u64) / Fixed64::saturating_from_num(self.capacity as u64)
    }
}

/// Scan progress of an item currently in a scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSlot<Id> {
    pub id: Id,
    /// 0..=100.
    pub percent: Fixed64,
}

/// An aggregated, read-only view of one security lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub id: LaneId,
    pub name: String,
    pub lane_line: Occupancy,
    pub bag_drop_line: Occupancy,
    pub bag_drop_unload: Occupancy,
    /// Passengers actively unloading, against the bay count.
    pub active_unloaders: Occupancy,
    pub body_scan_line: Occupancy,
    pub body_scanner: Vec<ScanSlot<PassengerId>>,
    pub bag_scanner_waiting: Occupancy,
    pub bag_scanner: Vec<ScanSlot<BagId>>,
    pub bag_scanner_off_ramp: Occupancy,
    pub bag_pickup_area: Occupancy,
    pub body_scanner_operational: bool,
    pub bag_scanner_operational: bool,
    /// Passengers ever assigned to the lane.
    pub total_added: u64,
    /// Passengers currently anywhere in the lane.
    pub passenger_count: usize,
}

fn occupancy<T: crate::id::Identified>(queue: &crate::queue::BoundedQueue<T>) -> Occupancy {
    Occupancy {
        len: queue.len(),
        capacity: queue.capacity(),
    }
}

impl LaneSnapshot {
    pub fn of(lane: &SecurityLane) -> Self {
        Self {
            id: lane.id,
            name: lane.name.clone(),
            lane_line: occupancy(&lane.lane_line),
            bag_drop_line: occupancy(&lane.bag_drop_line),
            bag_drop_unload: occupancy(&lane.bag_drop_unload),
            active_unloaders: Occupancy {
                len: lane.active_unloaders(),
                capacity: lane.bag_unloading_bays,
            },
            body_scan_line: occupancy(lane.body_scan_line()),
            body_scanner: lane
                .body_scanner
                .processing
                .iter()
                .map(|p| ScanSlot {
                    id: p.id.clone(),
                    percent: lane.body_scanner.percent(&p.id).unwrap_or(Fixed64::ZERO),
                })
                .collect(),
            bag_scanner_waiting: occupancy(&lane.bag_scanner.waiting),
            bag_scanner: lane
                .bag_scanner
                .processing
                .iter()
                .map(|b| ScanSlot {
                    id: b.id.clone(),
                    percent: lane.bag_scanner.percent(&b.id).unwrap_or(Fixed64::ZERO),
                })
                .collect(),
            bag_scanner_off_ramp: occupancy(&lane.bag_scanner_off_ramp),
            bag_pickup_area: occupancy(&lane.bag_pickup_area),
            body_scanner_operational: lane.body_scanner.operational,
            bag_scanner_operational: lane.bag_scanner.operational,
            total_added: lane.total_added,
            passenger_count: lane.passenger_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine queries
// ---------------------------------------------------------------------------

impl<R: RandomSource> Engine<R> {
    pub fn lane_snapshot(&self, lane: LaneId) -> Option<LaneSnapshot> {
        self.state.lane(lane).map(LaneSnapshot::of)
    }

    pub fn lane_snapshots(&self) -> Vec<LaneSnapshot> {
        self.state.security_lanes.iter().map(LaneSnapshot::of).collect()
    }

    /// Passengers occupying a lane, in station order.
    pub fn passengers_in_lane(&self, lane: LaneId) -> Vec<&Passenger> {
        self.state
            .lane(lane)
            .map(|l| l.passengers().collect())
            .unwrap_or_default()
    }

    /// Every bag present in a lane, on a person or not.
    pub fn bags_in_lane(&self, lane: LaneId) -> Vec<&Bag> {
        self.state.lane(lane).map(SecurityLane::all_bags).unwrap_or_default()
    }

    /// Clearances per histogram bucket.
    pub fn histogram_buckets(&self) -> &BTreeMap<u64, u32> {
        self.state.histogram.buckets()
    }

    /// The lane with the fewest passengers whose line has room. Ties go to
    /// the lower lane ID.
    pub fn least_occupied_lane(&self) -> Option<LaneId> {
        self.state
            .security_lanes
            .iter()
            .filter(|lane| !lane.lane_line.is_full())
            .min_by_key(|lane| (lane.passenger_count(), lane.id))
            .map(|lane| lane.id)
    }
}
