//! Events and queries example: passive event listeners and the query API.
//!
//! Starts the default two-lane checkpoint, routes every arriving passenger to
//! the emptiest lane, registers passive event listeners, and prints lane
//! snapshots once a simulated minute has passed.
//!
//! Run with: `cargo run -p checkpoint-core --example events_and_queries`

use std::cell::RefCell;
use std::rc::Rc;

use checkpoint_core::config::CheckpointConfig;
use checkpoint_core::engine::Engine;
use checkpoint_core::event::{Event, EventKind};

fn main() {
    let mut engine = match Engine::new(CheckpointConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("invalid config: {err}");
            return;
        }
    };

    // --- Register passive event listeners ---

    let cleared = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&cleared);
    engine.on_passive(
        EventKind::PassengerCleared,
        Box::new(move |event| {
            if let Event::PassengerCleared {
                passenger,
                time_in_system,
                ..
            } = event
            {
                sink.borrow_mut().push((passenger.clone(), *time_in_system));
            }
        }),
    );

    let alerts = Rc::new(RefCell::new(0u32));
    let alert_sink = Rc::clone(&alerts);
    engine.on_passive(
        EventKind::BagScanCompleted,
        Box::new(move |event| {
            if let Event::BagScanCompleted { alerts, .. } = event
                && alerts.any()
            {
                *alert_sink.borrow_mut() += 1;
            }
        }),
    );

    // --- Run a simulated minute ---

    if let Err(err) = engine.start_game() {
        eprintln!("cannot start: {err}");
        return;
    }
    for _ in 0..600 {
        while let Some(lane) = engine.least_occupied_lane()
            && let Some(front) = engine.state().main_queue.peek()
        {
            let id = front.id.clone();
            if engine.assign_passenger_to_lane(&id, lane).is_err() {
                break;
            }
        }
        engine.step();
    }

    // --- Query the state ---

    println!("t = {} ms, phase {:?}", engine.state().time, engine.phase());
    for snap in engine.lane_snapshots() {
        println!(
            "{:>8}: line {}/{}, unloading {}/{}, body scan {}, bag belt {}/{}, pickup {}, total {}",
            snap.name,
            snap.lane_line.len,
            snap.lane_line.capacity,
            snap.active_unloaders.len,
            snap.active_unloaders.capacity,
            snap.body_scanner.len(),
            snap.bag_scanner_waiting.len,
            snap.bag_scanner_waiting.capacity,
            snap.bag_pickup_area.len,
            snap.total_added,
        );
    }
    for (passenger, time_in_system) in cleared.borrow().iter() {
        println!("cleared {passenger} after {:.1} s", *time_in_system as f64 / 1000.0);
    }
    println!("bags with alerts: {}", alerts.borrow());
    println!("histogram: {:?}", engine.histogram_buckets());
}
