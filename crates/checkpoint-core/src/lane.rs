//! One security lane and the seven-step pipeline that moves passengers and
//! bags through it each tick.
//!
//! # Stations
//!
//! ```text
//!                        +-> bag_drop_line -> bag_drop_unload --+
//! lane_line -------------+                         | bag         |
//!                        +-------------------------|-----------+-> body_scan_line
//!                                                  v                     |
//!                         bag_scanner.waiting -> bag_scanner       body_scanner
//!                                                  |                     |
//!                                          bag_scanner_off_ramp   bag_pickup_area
//!                                                  +------> reunite <----+
//! ```
//!
//! `body_scan_line` is the body scanner's `waiting` queue. Every move goes
//! through [`BoundedQueue`] and leaves the item where it was when refused.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert;
use crate::config::{AlertModel, LaneConfig, SecurityPolicy, UnloadAssist};
use crate::entity::{Bag, Passenger};
use crate::error::IntegrityError;
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, PERCENT_COMPLETE, SimMillis, f64_to_fixed64};
use crate::id::{BagId, LaneId, PassengerId};
use crate::queue::{BoundedQueue, RejectReason};
use crate::rng::RandomSource;
use crate::scanner::{ScanTiming, Scanner};

// ---------------------------------------------------------------------------
// Stations
// ---------------------------------------------------------------------------

/// Where a passenger is. Used in movement events and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Station {
    MainQueue,
    LaneLine,
    BagDropLine,
    BagDropUnload,
    BodyScanLine,
    BodyScanner,
    BagPickupArea,
    Completed,
}

fn tagged(
    station: Station,
    queue: &BoundedQueue<Passenger>,
) -> impl Iterator<Item = (Station, &Passenger)> {
    queue.iter().map(move |p| (station, p))
}

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

/// Everything a lane needs from the engine for one tick.
pub(crate) struct LaneTick<'a, R: RandomSource> {
    pub now: SimMillis,
    pub dt: SimMillis,
    pub rng: &'a mut R,
    pub alerts: &'a AlertModel,
    pub policy: &'a SecurityPolicy,
    pub assist: Option<&'a UnloadAssist>,
    pub events: &'a mut EventBus,
}

/// What a lane hands back to the engine after a tick.
#[derive(Debug, Default)]
pub(crate) struct LaneOutcome {
    /// Passengers that cleared security this tick, in clearance order.
    pub cleared: Vec<Passenger>,
    pub violations: Vec<IntegrityError>,
}

// ---------------------------------------------------------------------------
// SecurityLane
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityLane {
    pub id: LaneId,
    pub name: String,
    pub lane_line: BoundedQueue<Passenger>,
    pub bag_drop_line: BoundedQueue<Passenger>,
    pub bag_drop_unload: BoundedQueue<Passenger>,
    /// Passengers that may actively unload at once.
    pub bag_unloading_bays: usize,
    /// `waiting` is the body scan line.
    pub body_scanner: Scanner<Passenger>,
    pub bag_scanner: Scanner<Bag>,
    pub bag_scanner_off_ramp: BoundedQueue<Bag>,
    pub bag_pickup_area: BoundedQueue<Passenger>,
    /// Passengers ever assigned to this lane.
    pub total_added: u64,
}

impl SecurityLane {
    pub fn new(id: LaneId, config: &LaneConfig) -> Self {
        let name = if config.name.is_empty() {
            format!("LANE {}", id.0 + 1)
        } else {
            config.name.clone()
        };
        Self {
            id,
            name,
            lane_line: BoundedQueue::new(config.lane_line_capacity),
            bag_drop_line: BoundedQueue::new(config.bag_drop_line_capacity),
            bag_drop_unload: BoundedQueue::new(config.bag_drop_unload_capacity),
            bag_unloading_bays: config.bag_unloading_bays,
            body_scanner: Scanner::new(
                config.body_scan_line_capacity,
                config.body_scanner_capacity,
                ScanTiming::Sampled(config.body_scan_time.clone()),
                config.body_scanner_operational,
            ),
            bag_scanner: Scanner::new(
                config.bag_scanner_waiting_capacity,
                config.bag_scanner_capacity,
                ScanTiming::Throughput {
                    items_per_minute: config.bag_scanner_items_per_minute,
                },
                config.bag_scanner_operational,
            ),
            bag_scanner_off_ramp: BoundedQueue::new(config.bag_off_ramp_capacity),
            bag_pickup_area: BoundedQueue::new(config.bag_pickup_area_capacity),
            total_added: 0,
        }
    }

    pub fn body_scan_line(&self) -> &BoundedQueue<Passenger> {
        &self.body_scanner.waiting
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Every passenger in the lane with the station they occupy, front to
    /// back through the pipeline.
    pub fn passengers_with_station(&self) -> impl Iterator<Item = (Station, &Passenger)> {
        tagged(Station::LaneLine, &self.lane_line)
            .chain(tagged(Station::BagDropLine, &self.bag_drop_line))
            .chain(tagged(Station::BagDropUnload, &self.bag_drop_unload))
            .chain(tagged(Station::BodyScanLine, &self.body_scanner.waiting))
            .chain(tagged(Station::BodyScanner, &self.body_scanner.processing))
            .chain(tagged(Station::BagPickupArea, &self.bag_pickup_area))
    }

    /// Every passenger occupying the lane.
    pub fn passengers(&self) -> impl Iterator<Item = &Passenger> {
        self.passengers_with_station().map(|(_, p)| p)
    }

    pub fn passenger_count(&self) -> usize {
        self.lane_line.len()
            + self.bag_drop_line.len()
            + self.bag_drop_unload.len()
            + self.body_scanner.len()
            + self.bag_pickup_area.len()
    }

    /// Every bag present in the lane: carried by a passenger, queued for or
    /// inside the bag scanner, or waiting on the off-ramp.
    pub fn all_bags(&self) -> Vec<&Bag> {
        self.passengers()
            .filter_map(|p| p.bag.as_ref())
            .chain(self.bag_scanner.iter())
            .chain(self.bag_scanner_off_ramp.iter())
            .collect()
    }

    pub fn find_passenger(&self, id: &PassengerId) -> Option<&Passenger> {
        self.passengers().find(|p| &p.id == id)
    }

    fn find_passenger_mut(&mut self, id: &PassengerId) -> Option<&mut Passenger> {
        let Self {
            lane_line,
            bag_drop_line,
            bag_drop_unload,
            body_scanner,
            bag_pickup_area,
            ..
        } = self;
        lane_line
            .iter_mut()
            .chain(bag_drop_line.iter_mut())
            .chain(bag_drop_unload.iter_mut())
            .chain(body_scanner.waiting.iter_mut())
            .chain(body_scanner.processing.iter_mut())
            .chain(bag_pickup_area.iter_mut())
            .find(|p| &p.id == id)
    }

    /// The bag with `id`, wherever it is in the lane.
    pub fn find_bag_mut(&mut self, id: &BagId) -> Option<&mut Bag> {
        let Self {
            lane_line,
            bag_drop_line,
            bag_drop_unload,
            body_scanner,
            bag_scanner,
            bag_scanner_off_ramp,
            bag_pickup_area,
            ..
        } = self;
        lane_line
            .iter_mut()
            .chain(bag_drop_line.iter_mut())
            .chain(bag_drop_unload.iter_mut())
            .chain(body_scanner.waiting.iter_mut())
            .chain(body_scanner.processing.iter_mut())
            .chain(bag_pickup_area.iter_mut())
            .filter_map(|p| p.bag.as_mut())
            .chain(bag_scanner.waiting.iter_mut())
            .chain(bag_scanner.processing.iter_mut())
            .chain(bag_scanner_off_ramp.iter_mut())
            .find(|b| &b.id == id)
    }

    /// Passengers currently unloading (finished unloaders do not hold a bay).
    pub fn active_unloaders(&self) -> usize {
        self.bag_drop_unload
            .iter()
            .filter(|p| !p.has_finished_unloading())
            .count()
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Append a passenger to the lane line. Refused passengers are handed back.
    pub fn admit(&mut self, mut passenger: Passenger, now: SimMillis) -> Result<(), Passenger> {
        if self.lane_line.check_enqueue(&passenger.id).is_err() {
            return Err(passenger);
        }
        passenger.journey.lane_assigned = Some(now);
        self.lane_line.enqueue(passenger).map_err(|r| r.into_inner())?;
        self.total_added += 1;
        Ok(())
    }

    /// Move passenger `id` from `source` to the back of the lane line.
    ///
    /// `Ok(false)` when `source` does not hold the passenger. A refused
    /// passenger keeps its place in `source`.
    pub(crate) fn admit_from(
        &mut self,
        source: &mut BoundedQueue<Passenger>,
        id: &PassengerId,
        now: SimMillis,
    ) -> Result<bool, RejectReason> {
        if !source.transfer_by_id(id, &mut self.lane_line)? {
            return Ok(false);
        }
        if let Some(p) = self.lane_line.back_mut() {
            p.journey.lane_assigned = Some(now);
        }
        self.total_added += 1;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Run the seven pipeline steps in order.
    pub(crate) fn tick<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>) -> LaneOutcome {
        let mut outcome = LaneOutcome::default();
        self.step_lane_entry(ctx);
        self.step_bag_drop(ctx);
        self.step_unload(ctx);
        self.step_body_scanner(ctx);
        self.step_body_scan_completion(ctx, &mut outcome);
        self.step_bag_scanner(ctx, &mut outcome);
        self.step_bag_pickup(ctx, &mut outcome);
        outcome
    }

    fn moved<R: RandomSource>(
        &self,
        ctx: &mut LaneTick<'_, R>,
        passenger: PassengerId,
        from: Station,
        to: Station,
    ) {
        debug!(lane = %self.id, passenger = %passenger, ?from, ?to, "passenger_moved");
        ctx.events.emit(Event::PassengerMoved {
            passenger,
            lane: self.id,
            from,
            to,
            time: ctx.now,
        });
    }

    /// 1. Front of the lane line goes to bag drop (with bag) or straight to
    ///    the body scan line (without). A refused front blocks the line.
    fn step_lane_entry<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>) {
        let Some(front) = self.lane_line.peek() else {
            return;
        };
        let (dest, to) = if front.has_bag {
            (&mut self.bag_drop_line, Station::BagDropLine)
        } else {
            (&mut self.body_scanner.waiting, Station::BodyScanLine)
        };
        match self.lane_line.transfer_front(dest) {
            Ok(Some(id)) => {
                if to == Station::BodyScanLine
                    && let Some(p) = self.body_scanner.waiting.back_mut()
                {
                    p.journey.body_scanner_queue_joined = Some(ctx.now);
                }
                self.moved(ctx, id, Station::LaneLine, to);
            }
            Ok(None) => {}
            Err(reason) => debug!(lane = %self.id, ?to, %reason, "lane_line_blocked"),
        }
    }

    /// 2. Front of the bag drop line takes a free unloading bay.
    fn step_bag_drop<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>) {
        if self.bag_drop_line.is_empty() || self.active_unloaders() >= self.bag_unloading_bays {
            return;
        }
        match self.bag_drop_line.transfer_front(&mut self.bag_drop_unload) {
            Ok(Some(id)) => self.moved(ctx, id, Station::BagDropLine, Station::BagDropUnload),
            Ok(None) => {}
            Err(reason) => debug!(lane = %self.id, %reason, "unload_bays_full"),
        }
    }

    /// 3. Unloading progress, bag hand-off to the scanner belt, and moving
    ///    finished unloaders on to the body scan line.
    fn step_unload<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>) {
        let per_tick_divisor = Fixed64::from_num(10_000);
        for id in self.bag_drop_unload.ids() {
            let Some(passenger) = self.bag_drop_unload.find_by_id_mut(&id) else {
                continue;
            };

            if !passenger.has_finished_unloading() {
                if !passenger.unloading_bag {
                    passenger.unloading_bag = true;
                    passenger.unloading_progress = Fixed64::ZERO;
                    passenger.unloading_start_time = Some(ctx.now);
                    passenger.journey.bag_unload_started = Some(ctx.now);
                }

                // (100 + familiarity) / 10 percent per second.
                let speed = u64::from(passenger.security_familiarity) + 100;
                passenger.unloading_progress +=
                    Fixed64::saturating_from_num(speed.saturating_mul(ctx.dt)) / per_tick_divisor;

                if let Some(assist) = ctx.assist
                    && let Some(started) = passenger.unloading_start_time
                    && ctx.now.saturating_sub(started) > assist.threshold_ms
                    && passenger.unloading_progress < PERCENT_COMPLETE
                    && ctx.rng.chance(f64_to_fixed64(assist.chance))
                {
                    passenger.unloading_progress += f64_to_fixed64(assist.boost_percent);
                    debug!(lane = %self.id, passenger = %passenger.id, "unload_assisted");
                }

                if passenger.unloading_progress < PERCENT_COMPLETE {
                    continue;
                }
                passenger.unloading_progress = PERCENT_COMPLETE;

                if let Some(bag) = passenger.bag.take() {
                    let bag_id = bag.id.clone();
                    if let Err(rejected) = self.bag_scanner.waiting.enqueue(bag) {
                        // Belt is full: hold at 100 % with the bag still in hand.
                        passenger.bag = Some(rejected.item);
                        debug!(lane = %self.id, passenger = %passenger.id, reason = %rejected.reason, "bag_belt_full");
                        continue;
                    }
                    if let Some(bag) = self.bag_scanner.waiting.back_mut() {
                        bag.is_unloaded = true;
                    }
                    passenger.bag_on_person = false;
                    debug!(lane = %self.id, bag = %bag_id, "bag_unloaded");
                    ctx.events.emit(Event::BagUnloaded {
                        bag: bag_id,
                        lane: self.id,
                        time: ctx.now,
                    });
                }
                passenger.journey.bag_unload_completed = Some(ctx.now);
                passenger.clear_unloading();
            }

            match self
                .bag_drop_unload
                .transfer_by_id(&id, &mut self.body_scanner.waiting)
            {
                Ok(true) => {
                    if let Some(p) = self.body_scanner.waiting.back_mut() {
                        p.journey.body_scanner_queue_joined = Some(ctx.now);
                    }
                    self.moved(ctx, id, Station::BagDropUnload, Station::BodyScanLine);
                }
                Ok(false) => {}
                Err(reason) => debug!(lane = %self.id, passenger = %id, %reason, "body_scan_line_full"),
            }
        }
    }

    /// 4. Body scanner admission, then advancement.
    fn step_body_scanner<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>) {
        while self.body_scanner.can_admit() {
            let needed = self.body_scanner.timing.draw(ctx.rng);
            match self.body_scanner.admit_front(needed) {
                Ok(Some(id)) => {
                    if let Some(p) = self.body_scanner.last_admitted_mut() {
                        p.journey.body_scanner_started = Some(ctx.now);
                    }
                    self.moved(ctx, id, Station::BodyScanLine, Station::BodyScanner);
                }
                Ok(None) => break,
                Err(reason) => {
                    debug!(lane = %self.id, %reason, "body_scanner_refused");
                    break;
                }
            }
        }
        self.body_scanner.advance(ctx.dt);
    }

    /// 5. Scanned passengers without a bag clear security; the rest wait for
    ///    their bag in the pickup area (or stay in the scanner if it is full).
    fn step_body_scan_completion<R: RandomSource>(
        &mut self,
        ctx: &mut LaneTick<'_, R>,
        outcome: &mut LaneOutcome,
    ) {
        for id in self.body_scanner.completed_ids() {
            let Some(has_bag) = self.body_scanner.processing.find_by_id(&id).map(|p| p.has_bag) else {
                continue;
            };
            if has_bag {
                match self.body_scanner.release_to(&id, &mut self.bag_pickup_area) {
                    Ok(true) => {
                        if let Some(p) = self.bag_pickup_area.back_mut() {
                            p.journey.body_scanner_finished = Some(ctx.now);
                            p.journey.waiting_for_bag_started = Some(ctx.now);
                        }
                        self.body_scan_completed(ctx, &id);
                        self.moved(ctx, id, Station::BodyScanner, Station::BagPickupArea);
                    }
                    Ok(false) => {}
                    Err(reason) => debug!(lane = %self.id, passenger = %id, %reason, "pickup_area_full"),
                }
            } else if let Some(mut passenger) = self.body_scanner.take(&id) {
                passenger.journey.body_scanner_finished = Some(ctx.now);
                self.body_scan_completed(ctx, &id);
                self.clear(ctx, passenger, Station::BodyScanner, outcome);
            }
        }
    }

    fn body_scan_completed<R: RandomSource>(&self, ctx: &mut LaneTick<'_, R>, id: &PassengerId) {
        ctx.events.emit(Event::BodyScanCompleted {
            passenger: id.clone(),
            lane: self.id,
            time: ctx.now,
        });
    }

    /// 6. Bag scanner admission (with owner checks), advancement, completion
    ///    with alerting, and release to the off-ramp.
    fn step_bag_scanner<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>, outcome: &mut LaneOutcome) {
        while self.bag_scanner.can_admit() {
            let Some(front) = self.bag_scanner.waiting.peek() else {
                break;
            };
            let bag_id = front.id.clone();
            let owner_id = front.passenger_id.clone();
            if front.is_scan_claimed() {
                self.bag_scanner.waiting.dequeue();
                debug!(lane = %self.id, bag = %bag_id, "claimed_bag_dropped");
                continue;
            }
            if self.find_passenger(&owner_id).is_none() {
                outcome.violations.push(IntegrityError::OrphanBag {
                    lane: self.id,
                    bag: bag_id,
                });
                break;
            }

            let needed = self.bag_scanner.timing.draw(ctx.rng);
            match self.bag_scanner.admit_front(needed) {
                Ok(Some(_)) => {
                    if let Some(bag) = self.bag_scanner.last_admitted_mut() {
                        bag.is_being_scanned = true;
                        bag.scan_started_at = Some(ctx.now);
                    }
                    if let Some(owner) = self.find_passenger_mut(&owner_id) {
                        owner.journey.bag_scanner_started = Some(ctx.now);
                    }
                    debug!(lane = %self.id, bag = %bag_id, "bag_scan_started");
                    ctx.events.emit(Event::BagScanStarted {
                        bag: bag_id,
                        lane: self.id,
                        time: ctx.now,
                    });
                }
                Ok(None) => break,
                Err(reason) => {
                    debug!(lane = %self.id, bag = %bag_id, %reason, "bag_scanner_refused");
                    break;
                }
            }
        }

        self.bag_scanner.advance(ctx.dt);

        for bag_id in self.bag_scanner.completed_ids() {
            let Some(bag) = self.bag_scanner.processing.find_by_id_mut(&bag_id) else {
                continue;
            };
            if !bag.scan_complete {
                let alerts = alert::evaluate(bag, ctx.alerts, ctx.policy, ctx.rng);
                bag.scan_complete = true;
                bag.alerts = Some(alerts);
                bag.scan_completed_at = Some(ctx.now);
                let owner_id = bag.passenger_id.clone();
                if let Some(owner) = self.find_passenger_mut(&owner_id) {
                    owner.journey.bag_scanner_completed = Some(ctx.now);
                }
                debug!(lane = %self.id, bag = %bag_id, alert = alerts.any(), "bag_scan_completed");
                ctx.events.emit(Event::BagScanCompleted {
                    bag: bag_id.clone(),
                    lane: self.id,
                    alerts,
                    time: ctx.now,
                });
            }

            match self
                .bag_scanner
                .release_to(&bag_id, &mut self.bag_scanner_off_ramp)
            {
                Ok(true) => {
                    if let Some(bag) = self.bag_scanner_off_ramp.back_mut() {
                        bag.is_being_scanned = false;
                    }
                }
                Ok(false) => {}
                Err(reason) => debug!(lane = %self.id, bag = %bag_id, %reason, "off_ramp_full"),
            }
        }
    }

    /// 7. Passengers whose scanned bag is on the off-ramp take it and clear.
    fn step_bag_pickup<R: RandomSource>(&mut self, ctx: &mut LaneTick<'_, R>, outcome: &mut LaneOutcome) {
        for id in self.bag_pickup_area.ids() {
            let Some(bag_id) = self.bag_pickup_area.find_by_id(&id).and_then(Passenger::bag_id) else {
                continue;
            };
            let ready = self
                .bag_scanner_off_ramp
                .find_by_id(&bag_id)
                .is_some_and(|bag| bag.scan_complete);
            if !ready {
                continue;
            }
            let Some(bag) = self.bag_scanner_off_ramp.remove_by_id(&bag_id) else {
                continue;
            };
            let Some(mut passenger) = self.bag_pickup_area.remove_by_id(&id) else {
                continue;
            };
            passenger.bag = Some(bag);
            passenger.bag_on_person = true;
            passenger.journey.waiting_for_bag_finished = Some(ctx.now);
            self.clear(ctx, passenger, Station::BagPickupArea, outcome);
        }
    }

    fn clear<R: RandomSource>(
        &self,
        ctx: &mut LaneTick<'_, R>,
        mut passenger: Passenger,
        from: Station,
        outcome: &mut LaneOutcome,
    ) {
        passenger.journey.security_cleared = Some(ctx.now);
        let time_in_system = passenger.journey.time_in_system().unwrap_or_default();
        self.moved(ctx, passenger.id.clone(), from, Station::Completed);
        ctx.events.emit(Event::PassengerCleared {
            passenger: passenger.id.clone(),
            lane: self.id,
            time_in_system,
            time: ctx.now,
        });
        outcome.cleared.push(passenger);
    }
}
