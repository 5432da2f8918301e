//! Stand-in for the player: moves passengers from the main queue into lanes.

use serde::Deserialize;
use tracing::debug;

use checkpoint_core::engine::Engine;
use checkpoint_core::id::LaneId;

/// How the autopilot picks a lane for the passenger at the front of the
/// main queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Routing {
    /// Lane with the fewest passengers anywhere in it; ties go to the lower
    /// lane.
    #[default]
    LeastOccupied,
    /// Cycle through lanes, skipping those whose lane line is full.
    RoundRobin,
    /// Never route. The main queue only drains through explicit control.
    Manual,
}

#[derive(Debug, Clone)]
pub struct Autopilot {
    routing: Routing,
    next_lane: usize,
}

impl Autopilot {
    pub fn new(routing: Routing) -> Self {
        Self {
            routing,
            next_lane: 0,
        }
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Assign passengers from the front of the main queue until the queue is
    /// empty or no lane can take another. Returns how many were assigned.
    pub fn route(&mut self, engine: &mut Engine) -> usize {
        let mut assigned = 0;
        while let Some(front) = engine.state().main_queue.peek() {
            let passenger = front.id.clone();
            let Some(lane) = self.pick(engine) else {
                break;
            };
            match engine.assign_passenger_to_lane(&passenger, lane) {
                Ok(()) => assigned += 1,
                Err(err) => {
                    debug!(%passenger, %lane, %err, "autopilot_assign_failed");
                    break;
                }
            }
        }
        assigned
    }

    fn pick(&mut self, engine: &Engine) -> Option<LaneId> {
        match self.routing {
            Routing::LeastOccupied => engine.least_occupied_lane(),
            Routing::RoundRobin => {
                let lanes = &engine.state().security_lanes;
                let count = lanes.len();
                let offset = (0..count)
                    .find(|k| !lanes[(self.next_lane + k) % count].lane_line.is_full())?;
                let index = (self.next_lane + offset) % count;
                self.next_lane = (index + 1) % count;
                Some(lanes[index].id)
            }
            Routing::Manual => None,
        }
    }
}
