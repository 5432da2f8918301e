//! The root simulation state owned by the engine.

use serde::{Deserialize, Serialize};

use crate::config::CheckpointConfig;
use crate::entity::{Bag, Passenger};
use crate::error::RecordedError;
use crate::fixed::SimMillis;
use crate::histogram::Histogram;
use crate::id::{LaneId, PassengerId};
use crate::lane::SecurityLane;
use crate::queue::BoundedQueue;

/// Driver state. `GameOver` is terminal until the game is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Paused,
    Running,
    GameOver,
}

/// Recorded the moment the capacity timeout ends the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverSummary {
    /// Simulated time at game over.
    pub time: SimMillis,
    pub passengers_processed: usize,
    pub total_spawned: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub main_queue: BoundedQueue<Passenger>,
    pub security_lanes: Vec<SecurityLane>,
    /// Cleared passengers in clearance order.
    pub completed: Vec<Passenger>,

    /// Simulated milliseconds since the session started.
    pub time: SimMillis,
    /// Ticks run since the session started.
    pub tick: u64,
    /// Passengers per minute; 0 stops automatic spawning.
    pub spawn_rate: u32,
    pub last_spawn_time: SimMillis,
    /// Set while the main queue is continuously full.
    pub queue_at_capacity_start_time: Option<SimMillis>,

    pub phase: GamePhase,
    pub game_over: Option<GameOverSummary>,

    pub histogram: Histogram,
    pub errors: Vec<RecordedError>,
    /// Passengers ever created.
    pub total_spawned: u64,
}

impl GameState {
    /// Fresh state for a validated config.
    pub fn new(config: &CheckpointConfig) -> Self {
        Self {
            main_queue: BoundedQueue::new(config.main_queue_capacity),
            security_lanes: config
                .lanes
                .iter()
                .enumerate()
                .map(|(i, lane)| SecurityLane::new(LaneId(i as u32), lane))
                .collect(),
            completed: Vec::new(),
            time: 0,
            tick: 0,
            spawn_rate: config.initial_spawn_rate,
            last_spawn_time: 0,
            queue_at_capacity_start_time: None,
            phase: GamePhase::Paused,
            game_over: None,
            histogram: Histogram::new(config.histogram_interval_secs),
            errors: Vec::new(),
            total_spawned: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn lane(&self, id: LaneId) -> Option<&SecurityLane> {
        self.security_lanes.get(id.0 as usize)
    }

    pub fn lane_mut(&mut self, id: LaneId) -> Option<&mut SecurityLane> {
        self.security_lanes.get_mut(id.0 as usize)
    }

    /// Passengers currently inside any lane.
    pub fn passengers_in_lanes(&self) -> usize {
        self.security_lanes.iter().map(SecurityLane::passenger_count).sum()
    }

    /// Every passenger the state holds, wherever it is.
    pub fn all_passengers(&self) -> impl Iterator<Item = &Passenger> {
        self.main_queue
            .iter()
            .chain(self.security_lanes.iter().flat_map(|lane| lane.passengers()))
            .chain(self.completed.iter())
    }

    pub fn find_passenger(&self, id: &PassengerId) -> Option<&Passenger> {
        self.all_passengers().find(|p| &p.id == id)
    }

    /// Every bag the state holds, wherever it is.
    pub fn all_bags(&self) -> impl Iterator<Item = &Bag> {
        self.main_queue
            .iter()
            .filter_map(|p| p.bag.as_ref())
            .chain(self.security_lanes.iter().flat_map(|lane| lane.all_bags()))
            .chain(self.completed.iter().filter_map(|p| p.bag.as_ref()))
    }

    /// Main queue + lanes + completed. Equals `total_spawned` at all times.
    pub fn passengers_accounted_for(&self) -> u64 {
        (self.main_queue.len() + self.passengers_in_lanes() + self.completed.len()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_matches_config() {
        let config = CheckpointConfig::default();
        let state = GameState::new(&config);
        assert_eq!(state.phase, GamePhase::Paused);
        assert_eq!(state.main_queue.capacity(), 10);
        assert_eq!(state.security_lanes.len(), 2);
        assert_eq!(state.security_lanes[1].id, LaneId(1));
        assert_eq!(state.security_lanes[1].name, "LANE 2");
        assert_eq!(state.spawn_rate, 10);
        assert_eq!(state.passengers_accounted_for(), 0);
        assert!(state.game_over.is_none());
    }

    #[test]
    fn lane_lookup_by_id() {
        let state = GameState::new(&CheckpointConfig::default());
        assert!(state.lane(LaneId(0)).is_some());
        assert!(state.lane(LaneId(2)).is_none());
    }

    #[test]
    fn all_passengers_spans_every_location() {
        let mut state = GameState::new(&CheckpointConfig::default());
        let a = Passenger::new(PassengerId::generate(0, 1));
        let b = Passenger::new(PassengerId::generate(0, 2)).with_bag(|_| {});
        let c = Passenger::new(PassengerId::generate(0, 3));
        state.main_queue.enqueue(a).unwrap();
        state.security_lanes[0].lane_line.enqueue(b).unwrap();
        state.completed.push(c);

        assert_eq!(state.all_passengers().count(), 3);
        assert_eq!(state.all_bags().count(), 1);
        assert_eq!(state.passengers_accounted_for(), 3);
        assert!(state.find_passenger(&PassengerId::generate(0, 3)).is_some());
    }
}
