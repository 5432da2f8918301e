//! Checkpoint Core -- the simulation engine for an airport security
//! checkpoint.
//!
//! Passengers spawn into a bounded main queue, are assigned to parallel
//! security lanes, and move through bag drop, unloading, body and bag
//! scanning, and bag pickup before they count as cleared. Every station is a
//! capacity-bounded queue; a full destination blocks the item in place.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] applies queued commands and, while
//! the game is running, advances the simulation by one fixed tick:
//!
//! 1. **Clock** -- Advance simulated time; backfill the clearance histogram.
//! 2. **Spawn** -- Spawn a passenger when the spawn interval has elapsed.
//! 3. **Lanes** -- Run the seven lane steps for every lane, in lane order:
//!    lane entry, bag drop, unloading, body scanner, body-scan routing, bag
//!    scanner, bag pickup.
//! 4. **Capacity** -- Track how long the main queue has been full and end
//!    the game when it stays full past the timeout.
//! 5. **Bookkeeping** -- Compute the state hash and deliver events.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns the [`state::GameState`] and the control
//!   surface (`spawn_passenger`, `assign_passenger_to_lane`, `start_game`,
//!   `pause_game`, `reset_game`, `set_spawn_rate`, `acknowledge_bag_alerts`).
//! - [`queue::BoundedQueue`] -- FIFO with a hard capacity and unique IDs.
//! - [`scanner::Scanner`] -- Waiting + processing stages with per-item progress.
//! - [`lane::SecurityLane`] -- One lane and its pipeline.
//! - [`config::CheckpointConfig`] -- Every tunable, with validated defaults.
//! - [`event::EventBus`] -- Typed events with buffered delivery.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for progress arithmetic.

pub mod alert;
pub mod command_queue;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod event;
pub mod fixed;
pub mod generator;
pub mod histogram;
pub mod id;
pub mod lane;
pub mod query;
pub mod queue;
pub mod rng;
pub mod scanner;
pub mod sim;
pub mod state;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
