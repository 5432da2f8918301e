//! State validation tools: invariant checks and state comparison.
//!
//! [`check_invariants`] walks a [`GameState`] and reports every capacity,
//! uniqueness, conservation, pairing and timestamp violation it finds. An
//! empty result means the state is consistent. [`diff_states`] compares two
//! states subsystem by subsystem for determinism checks.

use std::collections::BTreeMap;

use crate::entity::Passenger;
use crate::id::{BagId, Identified, LaneId, PassengerId};
use crate::lane::SecurityLane;
use crate::queue::BoundedQueue;
use crate::state::GameState;

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("{location} holds {len} items but its capacity is {capacity}")]
    OverCapacity {
        location: String,
        len: usize,
        capacity: usize,
    },
    #[error("{lane}: {active} passengers unloading with {bays} bays")]
    BaysExceeded {
        lane: LaneId,
        active: usize,
        bays: usize,
    },
    #[error("passenger {0} appears in more than one place")]
    DuplicatePassenger(PassengerId),
    #[error("bag {0} appears in more than one place")]
    DuplicateBag(BagId),
    #[error("{accounted} passengers accounted for but {spawned} spawned")]
    Conservation { accounted: u64, spawned: u64 },
    #[error("passenger {0} has a bag that is nowhere to be found")]
    MissingBag(PassengerId),
    #[error("bag {bag} is not in the same place as its owner")]
    Unpaired { bag: BagId },
    #[error("passenger {0} has timestamps out of journey order")]
    NonMonotonicJourney(PassengerId),
    #[error("completed passenger {0} has no clearance time")]
    NotCleared(PassengerId),
    #[error("{lane}: {scanner} scanner progress does not match its contents")]
    ScannerProgress { lane: LaneId, scanner: &'static str },
}

// ---------------------------------------------------------------------------
// Invariant checks
// ---------------------------------------------------------------------------

/// Every invariant violation in `state`.
pub fn check_invariants(state: &GameState) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_capacity(state, &mut violations);
    check_uniqueness(state, &mut violations);
    check_conservation(state, &mut violations);
    check_pairing(state, &mut violations);
    check_journeys(state, &mut violations);
    violations
}

/// Shorthand for an empty [`check_invariants`] result.
pub fn is_consistent(state: &GameState) -> bool {
    check_invariants(state).is_empty()
}

fn capacity_of<T: Identified>(location: String, queue: &BoundedQueue<T>, out: &mut Vec<Violation>) {
    if queue.len() > queue.capacity() {
        out.push(Violation::OverCapacity {
            location,
            len: queue.len(),
            capacity: queue.capacity(),
        });
    }
}

fn check_capacity(state: &GameState, out: &mut Vec<Violation>) {
    capacity_of("main_queue".into(), &state.main_queue, out);
    for lane in &state.security_lanes {
        let at = |station: &str| format!("{}.{station}", lane.id);
        capacity_of(at("lane_line"), &lane.lane_line, out);
        capacity_of(at("bag_drop_line"), &lane.bag_drop_line, out);
        capacity_of(at("bag_drop_unload"), &lane.bag_drop_unload, out);
        capacity_of(at("body_scan_line"), &lane.body_scanner.waiting, out);
        capacity_of(at("body_scanner"), &lane.body_scanner.processing, out);
        capacity_of(at("bag_scanner_waiting"), &lane.bag_scanner.waiting, out);
        capacity_of(at("bag_scanner"), &lane.bag_scanner.processing, out);
        capacity_of(at("bag_scanner_off_ramp"), &lane.bag_scanner_off_ramp, out);
        capacity_of(at("bag_pickup_area"), &lane.bag_pickup_area, out);

        let active = lane.active_unloaders();
        if active > lane.bag_unloading_bays {
            out.push(Violation::BaysExceeded {
                lane: lane.id,
                active,
                bays: lane.bag_unloading_bays,
            });
        }
        if !lane.body_scanner.progress_consistent() {
            out.push(Violation::ScannerProgress {
                lane: lane.id,
                scanner: "body",
            });
        }
        if !lane.bag_scanner.progress_consistent() {
            out.push(Violation::ScannerProgress {
                lane: lane.id,
                scanner: "bag",
            });
        }
    }
}

fn check_uniqueness(state: &GameState, out: &mut Vec<Violation>) {
    let mut passengers: BTreeMap<&PassengerId, usize> = BTreeMap::new();
    for passenger in state.all_passengers() {
        *passengers.entry(&passenger.id).or_default() += 1;
    }
    out.extend(
        passengers
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(id, _)| Violation::DuplicatePassenger(id.clone())),
    );

    let mut bags: BTreeMap<&BagId, usize> = BTreeMap::new();
    for bag in state.all_bags() {
        *bags.entry(&bag.id).or_default() += 1;
    }
    out.extend(
        bags.into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(id, _)| Violation::DuplicateBag(id.clone())),
    );
}

fn check_conservation(state: &GameState, out: &mut Vec<Violation>) {
    let accounted = state.passengers_accounted_for();
    if accounted != state.total_spawned {
        out.push(Violation::Conservation {
            accounted,
            spawned: state.total_spawned,
        });
    }
}

/// Outside a lane a passenger must carry their own bag. Inside a lane the
/// bag is either carried or in that lane's bag scanner or off-ramp.
fn check_pairing(state: &GameState, out: &mut Vec<Violation>) {
    for passenger in state.main_queue.iter().chain(state.completed.iter()) {
        check_carried(passenger, out);
    }
    for lane in &state.security_lanes {
        check_lane_pairing(lane, out);
    }
}

fn check_carried(passenger: &Passenger, out: &mut Vec<Violation>) {
    match &passenger.bag {
        Some(bag) if bag.passenger_id != passenger.id => {
            out.push(Violation::Unpaired { bag: bag.id.clone() });
        }
        Some(_) => {}
        None if passenger.has_bag => out.push(Violation::MissingBag(passenger.id.clone())),
        None => {}
    }
}

fn check_lane_pairing(lane: &SecurityLane, out: &mut Vec<Violation>) {
    let loose = || lane.bag_scanner.iter().chain(lane.bag_scanner_off_ramp.iter());

    for passenger in lane.passengers() {
        if passenger.bag.is_some() || !passenger.has_bag {
            check_carried(passenger, out);
            continue;
        }
        let own = passenger.id.bag_id();
        if !loose().any(|bag| bag.id == own) {
            out.push(Violation::MissingBag(passenger.id.clone()));
        }
    }
    for bag in loose() {
        if lane.find_passenger(&bag.passenger_id).is_none() {
            out.push(Violation::Unpaired { bag: bag.id.clone() });
        }
    }
}

fn check_journeys(state: &GameState, out: &mut Vec<Violation>) {
    for passenger in state.all_passengers() {
        if !passenger.journey.is_monotonic() {
            out.push(Violation::NonMonotonicJourney(passenger.id.clone()));
        }
    }
    for passenger in &state.completed {
        if !passenger.is_cleared() {
            out.push(Violation::NotCleared(passenger.id.clone()));
        }
    }
}

// ---------------------------------------------------------------------------
// State diff
// ---------------------------------------------------------------------------

/// Subsystems that differ between two states. Empty when identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub clock: bool,
    pub main_queue: bool,
    /// Lanes whose contents differ. Lanes present in only one state count.
    pub lanes: Vec<LaneId>,
    pub completed: bool,
    pub histogram: bool,
    pub phase: bool,
}

impl StateDiff {
    pub fn is_identical(&self) -> bool {
        *self == Self::default()
    }
}

/// Compare two states subsystem by subsystem.
pub fn diff_states(a: &GameState, b: &GameState) -> StateDiff {
    let lane_count = a.security_lanes.len().max(b.security_lanes.len());
    let lanes = (0..lane_count)
        .filter(|&i| a.security_lanes.get(i) != b.security_lanes.get(i))
        .map(|i| LaneId(i as u32))
        .collect();

    StateDiff {
        clock: a.time != b.time || a.tick != b.tick,
        main_queue: a.main_queue != b.main_queue,
        lanes,
        completed: a.completed != b.completed,
        histogram: a.histogram != b.histogram,
        phase: a.phase != b.phase || a.game_over != b.game_over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckpointConfig;
    use crate::entity::Bag;

    fn state() -> GameState {
        GameState::new(&CheckpointConfig::default())
    }

    fn passenger(n: u64) -> Passenger {
        let mut p = Passenger::new(PassengerId::generate(0, n));
        p.journey.spawned = Some(0);
        p
    }

    #[test]
    fn fresh_state_is_consistent() {
        assert!(is_consistent(&state()));
    }

    #[test]
    fn conservation_counts_every_location() {
        let mut state = state();
        state.main_queue.enqueue(passenger(1)).unwrap();
        assert_eq!(
            check_invariants(&state),
            vec![Violation::Conservation {
                accounted: 1,
                spawned: 0
            }]
        );
        state.total_spawned = 1;
        assert!(is_consistent(&state));
    }

    #[test]
    fn duplicate_across_locations_is_reported() {
        let mut state = state();
        state.main_queue.enqueue(passenger(1)).unwrap();
        state.security_lanes[0].lane_line.enqueue(passenger(1)).unwrap();
        state.total_spawned = 2;
        assert_eq!(
            check_invariants(&state),
            vec![Violation::DuplicatePassenger(PassengerId::generate(0, 1))]
        );
    }

    #[test]
    fn bag_in_scanner_pairs_with_owner_in_lane() {
        let mut state = state();
        let mut owner = passenger(1).with_bag(|_| {});
        let mut bag = owner.bag.take().unwrap();
        owner.bag_on_person = false;
        bag.is_unloaded = true;

        state.security_lanes[0].body_scanner.waiting.enqueue(owner).unwrap();
        state.security_lanes[0].bag_scanner.waiting.enqueue(bag).unwrap();
        state.total_spawned = 1;
        assert!(is_consistent(&state));
    }

    #[test]
    fn bag_without_owner_is_unpaired() {
        let mut state = state();
        let bag = Bag::new(&PassengerId::generate(0, 5));
        let bag_id = bag.id.clone();
        state.security_lanes[1].bag_scanner_off_ramp.enqueue(bag).unwrap();
        assert_eq!(check_invariants(&state), vec![Violation::Unpaired { bag: bag_id }]);
    }

    #[test]
    fn owner_without_bag_anywhere_is_reported() {
        let mut state = state();
        let mut owner = passenger(1).with_bag(|_| {});
        owner.bag = None;
        state.security_lanes[0].bag_pickup_area.enqueue(owner).unwrap();
        state.total_spawned = 1;
        assert_eq!(
            check_invariants(&state),
            vec![Violation::MissingBag(PassengerId::generate(0, 1))]
        );
    }

    #[test]
    fn out_of_order_journey_and_uncleared_completion() {
        let mut state = state();
        let mut p = passenger(1);
        p.journey.spawned = Some(500);
        p.journey.lane_assigned = Some(100);
        state.completed.push(p);
        state.total_spawned = 1;

        let violations = check_invariants(&state);
        assert!(violations.contains(&Violation::NonMonotonicJourney(PassengerId::generate(0, 1))));
        assert!(violations.contains(&Violation::NotCleared(PassengerId::generate(0, 1))));
    }

    #[test]
    fn diff_names_changed_subsystems() {
        let a = state();
        let mut b = a.clone();
        assert!(diff_states(&a, &b).is_identical());

        b.time = 100;
        b.security_lanes[1].total_added = 4;
        let diff = diff_states(&a, &b);
        assert!(diff.clock);
        assert_eq!(diff.lanes, vec![LaneId(1)]);
        assert!(!diff.main_queue);
        assert!(!diff.is_identical());
    }
}
