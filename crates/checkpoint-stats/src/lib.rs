//! Session statistics for the checkpoint engine.
//!
//! Two views are provided:
//!
//! - [`SessionSummary`] is computed on demand from a [`GameState`]: how many
//!   passengers cleared, how many carried bags, what share of suspicious bags
//!   were investigated, and the average journey per stage.
//! - [`CheckpointStats`] listens to core events (`PassengerSpawned`,
//!   `PassengerCleared`, `BagScanCompleted`, `IntegrityViolation`) and keeps
//!   rolling throughput over a configurable tick window using [`Fixed64`]
//!   arithmetic.
//!
//! # Usage
//!
//! ```ignore
//! let mut stats = CheckpointStats::new(StatsConfig::default());
//! stats.process_event(&event);
//! stats.end_tick(engine.state().tick);
//! // Query metrics:
//! let per_minute = stats.clearances_per_minute(engine.config().tick_ms);
//! let summary = SessionSummary::from_state(engine.state());
//! ```

use std::collections::{HashMap, VecDeque};

use checkpoint_core::entity::Passenger;
use checkpoint_core::event::Event;
use checkpoint_core::fixed::{Fixed64, SimMillis};
use checkpoint_core::id::LaneId;
use checkpoint_core::state::GameState;

const MILLIS_PER_MINUTE: u64 = 60_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Window and history sizes.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for rolling averages (600 ticks is one simulated
    /// minute at the default tick length).
    pub window_size: u64,
    /// Maximum number of historical rate snapshots to retain.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 600,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// Bounded history of [`Fixed64`] samples for trend displays. A full buffer
/// forgets its oldest sample.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    samples: VecDeque<Fixed64>,
    capacity: usize,
}

impl RingBuffer {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: Fixed64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<Fixed64> {
        self.samples.back().copied()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Fixed64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Fixed64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// ---------------------------------------------------------------------------
// Rolling window counter
// ---------------------------------------------------------------------------

/// Per-tick counts over the last `size` closed ticks plus the open one.
#[derive(Debug, Clone)]
struct RollingWindow {
    closed: VecDeque<u64>,
    size: usize,
    /// Sum of `closed`.
    closed_sum: u64,
    open: u64,
}

impl RollingWindow {
    fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            closed: VecDeque::new(),
            size,
            closed_sum: 0,
            open: 0,
        }
    }

    fn add(&mut self, count: u64) {
        self.open += count;
    }

    /// Close the open tick.
    fn commit(&mut self) {
        if self.closed.len() == self.size
            && let Some(evicted) = self.closed.pop_front()
        {
            self.closed_sum -= evicted;
        }
        self.closed.push_back(self.open);
        self.closed_sum += self.open;
        self.open = 0;
    }

    fn total(&self) -> u64 {
        self.closed_sum + self.open
    }

    /// Mean per tick. The open tick counts only once something landed in it.
    fn rate(&self) -> Fixed64 {
        let ticks = self.closed.len() + usize::from(self.open > 0);
        if ticks == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::saturating_from_num(self.total()) / Fixed64::from_num(ticks)
    }
}

// ---------------------------------------------------------------------------
// Journey stages
// ---------------------------------------------------------------------------

/// A timed segment of a passenger's journey through the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Spawned until assigned to a lane.
    QueueWait,
    BagUnload,
    /// Runs in parallel with the passenger's own stages.
    BagScan,
    BodyScanQueue,
    BodyScan,
    WaitingForBag,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::QueueWait,
        Stage::BagUnload,
        Stage::BagScan,
        Stage::BodyScanQueue,
        Stage::BodyScan,
        Stage::WaitingForBag,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::QueueWait => "wait in main queue",
            Stage::BagUnload => "bag unload",
            Stage::BagScan => "bag scan",
            Stage::BodyScanQueue => "body scanner queue",
            Stage::BodyScan => "body scan",
            Stage::WaitingForBag => "waiting for bag",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

fn span(start: Option<SimMillis>, end: Option<SimMillis>) -> Option<SimMillis> {
    Some(end?.saturating_sub(start?))
}

/// Per-stage durations for one passenger. A stage is `None` when the
/// passenger has not finished it or never went through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyBreakdown {
    stages: [Option<SimMillis>; 6],
    /// Lane assignment to clearance.
    pub security_time: Option<SimMillis>,
    /// Spawn to clearance.
    pub time_in_system: Option<SimMillis>,
}

impl JourneyBreakdown {
    pub fn of(passenger: &Passenger) -> Self {
        let j = &passenger.journey;
        let mut stages = [None; 6];
        stages[Stage::QueueWait.index()] = span(j.spawned, j.lane_assigned);
        stages[Stage::BagUnload.index()] = span(j.bag_unload_started, j.bag_unload_completed);
        stages[Stage::BagScan.index()] = span(j.bag_scanner_started, j.bag_scanner_completed);
        stages[Stage::BodyScanQueue.index()] =
            span(j.body_scanner_queue_joined, j.body_scanner_started);
        stages[Stage::BodyScan.index()] = span(j.body_scanner_started, j.body_scanner_finished);
        stages[Stage::WaitingForBag.index()] =
            span(j.waiting_for_bag_started, j.waiting_for_bag_finished);
        Self {
            stages,
            security_time: span(j.lane_assigned, j.security_cleared),
            time_in_system: j.time_in_system(),
        }
    }

    pub fn get(&self, stage: Stage) -> Option<SimMillis> {
        self.stages[stage.index()]
    }
}

/// Mean duration per stage over a set of passengers. Each stage averages only
/// the passengers that have a duration for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageAverages {
    sums: [u64; 6],
    samples: [u64; 6],
}

impl StageAverages {
    pub fn from_passengers<'a>(passengers: impl IntoIterator<Item = &'a Passenger>) -> Self {
        let mut averages = Self::default();
        for passenger in passengers {
            averages.record(&JourneyBreakdown::of(passenger));
        }
        averages
    }

    pub fn record(&mut self, breakdown: &JourneyBreakdown) {
        for stage in Stage::ALL {
            if let Some(ms) = breakdown.get(stage) {
                self.sums[stage.index()] = self.sums[stage.index()].saturating_add(ms);
                self.samples[stage.index()] += 1;
            }
        }
    }

    pub fn average(&self, stage: Stage) -> Option<SimMillis> {
        let samples = self.samples[stage.index()];
        (samples > 0).then(|| self.sums[stage.index()] / samples)
    }

    pub fn samples(&self, stage: Stage) -> u64 {
        self.samples[stage.index()]
    }
}

// ---------------------------------------------------------------------------
// Session summary
// ---------------------------------------------------------------------------

/// Headline figures for a session, computed from the completed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub elapsed: SimMillis,
    pub total_spawned: u64,
    pub passengers_processed: usize,
    pub passengers_with_bags: usize,
    /// Cleared bags that carried a suspicious item.
    pub suspicious_bags: usize,
    /// Of those, bags whose suspicious-item alert was dealt with.
    pub suspicious_investigated: usize,
    pub average_time_in_system: Option<SimMillis>,
    pub stages: StageAverages,
}

impl SessionSummary {
    pub fn from_state(state: &GameState) -> Self {
        let completed = &state.completed;
        let bags = completed.iter().filter_map(|p| p.bag.as_ref());
        let (suspicious_bags, suspicious_investigated) = bags
            .filter(|bag| bag.has_suspicious_item)
            .fold((0, 0), |(seen, dealt), bag| {
                (seen + 1, dealt + usize::from(bag.suspicious_item_dealt_with))
            });

        let times: Vec<SimMillis> = completed
            .iter()
            .filter_map(|p| p.journey.time_in_system())
            .collect();
        let average_time_in_system = (!times.is_empty())
            .then(|| times.iter().sum::<SimMillis>() / times.len() as SimMillis);

        Self {
            elapsed: state.time,
            total_spawned: state.total_spawned,
            passengers_processed: completed.len(),
            passengers_with_bags: completed.iter().filter(|p| p.bag.is_some()).count(),
            suspicious_bags,
            suspicious_investigated,
            average_time_in_system,
            stages: StageAverages::from_passengers(completed),
        }
    }

    /// Share of suspicious bags that were investigated, 0 to 1. `None` when
    /// no suspicious bag has cleared yet.
    pub fn detection_ratio(&self) -> Option<Fixed64> {
        if self.suspicious_bags == 0 {
            return None;
        }
        Some(Fixed64::from_num(self.suspicious_investigated) / Fixed64::from_num(self.suspicious_bags))
    }

    /// Mean clearance rate over the whole session.
    pub fn passengers_per_minute(&self) -> Fixed64 {
        if self.elapsed == 0 {
            return Fixed64::ZERO;
        }
        let minutes = Fixed64::saturating_from_num(self.elapsed)
            / Fixed64::from_num(MILLIS_PER_MINUTE);
        Fixed64::saturating_from_num(self.passengers_processed) / minutes
    }
}

// ---------------------------------------------------------------------------
// CheckpointStats: event-driven rolling throughput
// ---------------------------------------------------------------------------

/// Rolling counters fed by engine events.
#[derive(Debug, Clone)]
pub struct CheckpointStats {
    config: StatsConfig,
    spawns: RollingWindow,
    clearances: RollingWindow,
    bag_scans: RollingWindow,
    lane_clearances: HashMap<LaneId, RollingWindow>,
    clearance_history: RingBuffer,
    total_spawned: u64,
    total_cleared: u64,
    total_alerts: u64,
    integrity_violations: u64,
    time_in_system_sum: u64,
    current_tick: u64,
}

impl CheckpointStats {
    pub fn new(config: StatsConfig) -> Self {
        let window = Self::window_len(&config);
        Self {
            spawns: RollingWindow::new(window),
            clearances: RollingWindow::new(window),
            bag_scans: RollingWindow::new(window),
            lane_clearances: HashMap::new(),
            clearance_history: RingBuffer::new(config.history_capacity),
            total_spawned: 0,
            total_cleared: 0,
            total_alerts: 0,
            integrity_violations: 0,
            time_in_system_sum: 0,
            current_tick: 0,
            config,
        }
    }

    fn window_len(config: &StatsConfig) -> usize {
        usize::try_from(config.window_size.max(1)).unwrap_or(usize::MAX)
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Tick passed to the last [`end_tick`](Self::end_tick).
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    // -- Event processing ---------------------------------------------------

    /// Count one delivered event into the open tick.
    pub fn process_event(&mut self, event: &Event) {
        match event {
            Event::PassengerSpawned { .. } => {
                self.spawns.add(1);
                self.total_spawned += 1;
            }

            Event::PassengerCleared {
                lane,
                time_in_system,
                ..
            } => {
                self.clearances.add(1);
                let window = Self::window_len(&self.config);
                self.lane_clearances
                    .entry(*lane)
                    .or_insert_with(|| RollingWindow::new(window))
                    .add(1);
                self.total_cleared += 1;
                self.time_in_system_sum = self.time_in_system_sum.saturating_add(*time_in_system);
            }

            Event::BagScanCompleted { alerts, .. } => {
                self.bag_scans.add(1);
                if alerts.any() {
                    self.total_alerts += 1;
                }
            }

            Event::IntegrityViolation { .. } => {
                self.integrity_violations += 1;
            }

            _ => {}
        }
    }

    pub fn process_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for event in events {
            self.process_event(event);
        }
    }

    /// Close tick `tick`: snapshot the clearance rate and roll every window.
    /// Call once per tick, after that tick's events.
    pub fn end_tick(&mut self, tick: u64) {
        self.current_tick = tick;
        self.clearance_history.push(self.clearances.rate());

        self.spawns.commit();
        self.clearances.commit();
        self.bag_scans.commit();
        for window in self.lane_clearances.values_mut() {
            window.commit();
        }
    }

    /// Drop all counters, as after a game reset.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    // -- Rates --------------------------------------------------------------

    /// Passengers cleared per tick, averaged over the window.
    pub fn clearance_rate(&self) -> Fixed64 {
        self.clearances.rate()
    }

    /// Passengers cleared per simulated minute, averaged over the window.
    pub fn clearances_per_minute(&self, tick_ms: u64) -> Fixed64 {
        per_minute(self.clearances.rate(), tick_ms)
    }

    pub fn lane_clearance_rate(&self, lane: LaneId) -> Fixed64 {
        self.lane_clearances
            .get(&lane)
            .map(RollingWindow::rate)
            .unwrap_or(Fixed64::ZERO)
    }

    /// Passengers cleared by `lane` within the window.
    pub fn lane_clearances_in_window(&self, lane: LaneId) -> u64 {
        self.lane_clearances.get(&lane).map_or(0, RollingWindow::total)
    }

    pub fn spawn_rate(&self) -> Fixed64 {
        self.spawns.rate()
    }

    pub fn bag_scan_rate(&self) -> Fixed64 {
        self.bag_scans.rate()
    }

    /// Per-tick clearance rate recorded at each end of tick, oldest first.
    pub fn clearance_history(&self) -> &RingBuffer {
        &self.clearance_history
    }

    // -- Totals -------------------------------------------------------------

    pub fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    pub fn total_cleared(&self) -> u64 {
        self.total_cleared
    }

    /// Scanned bags that raised at least one alert.
    pub fn total_alerts(&self) -> u64 {
        self.total_alerts
    }

    pub fn integrity_violations(&self) -> u64 {
        self.integrity_violations
    }

    pub fn average_time_in_system(&self) -> Option<SimMillis> {
        (self.total_cleared > 0).then(|| self.time_in_system_sum / self.total_cleared)
    }
}

/// Convert a per-tick rate into a per-minute rate.
pub fn per_minute(rate_per_tick: Fixed64, tick_ms: u64) -> Fixed64 {
    if tick_ms == 0 {
        return Fixed64::ZERO;
    }
    let ticks_per_minute = Fixed64::saturating_from_num(MILLIS_PER_MINUTE)
        / Fixed64::saturating_from_num(tick_ms);
    rate_per_tick.saturating_mul(ticks_per_minute)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_core::entity::BagAlerts;
    use checkpoint_core::fixed::f64_to_fixed64;
    use checkpoint_core::test_utils::*;

    fn small_config() -> StatsConfig {
        StatsConfig {
            window_size: 10,
            history_capacity: 16,
        }
    }

    fn assert_fixed_approx(actual: Fixed64, expected: f64, tolerance: f64) {
        let actual_f64: f64 = actual.to_num();
        assert!(
            (actual_f64 - expected).abs() < tolerance,
            "expected ~{expected}, got {actual_f64}"
        );
    }

    fn cleared(n: u64, lane: u32, time_in_system: SimMillis) -> Event {
        Event::PassengerCleared {
            passenger: passenger_id(n),
            lane: LaneId(lane),
            time_in_system,
            time: time_in_system,
        }
    }

    /// A cleared passenger with a fully stamped journey.
    fn finished(n: u64, bag: bool) -> Passenger {
        let mut p = if bag { with_bag(n, 0) } else { bagless(n, 0) };
        let j = &mut p.journey;
        j.lane_assigned = Some(2_000);
        if bag {
            j.bag_unload_started = Some(2_000);
            j.bag_unload_completed = Some(12_000);
            j.bag_scanner_started = Some(12_000);
            j.bag_scanner_completed = Some(18_000);
        }
        j.body_scanner_queue_joined = Some(12_000);
        j.body_scanner_started = Some(13_000);
        j.body_scanner_finished = Some(14_000);
        if bag {
            j.waiting_for_bag_started = Some(14_000);
            j.waiting_for_bag_finished = Some(18_000);
        }
        j.security_cleared = Some(if bag { 18_000 } else { 14_000 });
        p
    }

    // -----------------------------------------------------------------------
    // RingBuffer
    // -----------------------------------------------------------------------

    #[test]
    fn ring_buffer_wraps_oldest_first() {
        let mut buf = RingBuffer::new(3);
        assert_eq!(buf.latest(), None);
        for i in 1..=5 {
            buf.push(f64_to_fixed64(i as f64));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(
            buf.to_vec(),
            vec![f64_to_fixed64(3.0), f64_to_fixed64(4.0), f64_to_fixed64(5.0)]
        );
        assert_eq!(buf.latest(), Some(f64_to_fixed64(5.0)));

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.iter().len(), 0);
    }

    #[test]
    fn ring_buffer_partial_fill_iterates_in_order() {
        let mut buf = RingBuffer::new(4);
        buf.push(f64_to_fixed64(1.0));
        buf.push(f64_to_fixed64(2.0));
        assert_eq!(buf.to_vec(), vec![f64_to_fixed64(1.0), f64_to_fixed64(2.0)]);
    }

    // -----------------------------------------------------------------------
    // RollingWindow
    // -----------------------------------------------------------------------

    #[test]
    fn rolling_window_evicts_old_ticks() {
        let mut window = RollingWindow::new(3);
        for count in [3, 0, 0, 0] {
            window.add(count);
            window.commit();
        }
        assert_eq!(window.total(), 0);
        assert_eq!(window.rate(), Fixed64::ZERO);
    }

    #[test]
    fn rolling_window_includes_current_tick() {
        let mut window = RollingWindow::new(4);
        window.add(2);
        window.commit();
        window.add(4);
        assert_eq!(window.total(), 6);
        assert_fixed_approx(window.rate(), 3.0, 1e-9);
    }

    // -----------------------------------------------------------------------
    // Journey breakdown
    // -----------------------------------------------------------------------

    #[test]
    fn breakdown_of_bag_passenger() {
        let breakdown = JourneyBreakdown::of(&finished(1, true));
        assert_eq!(breakdown.get(Stage::QueueWait), Some(2_000));
        assert_eq!(breakdown.get(Stage::BagUnload), Some(10_000));
        assert_eq!(breakdown.get(Stage::BagScan), Some(6_000));
        assert_eq!(breakdown.get(Stage::BodyScanQueue), Some(1_000));
        assert_eq!(breakdown.get(Stage::BodyScan), Some(1_000));
        assert_eq!(breakdown.get(Stage::WaitingForBag), Some(4_000));
        assert_eq!(breakdown.security_time, Some(16_000));
        assert_eq!(breakdown.time_in_system, Some(18_000));
    }

    #[test]
    fn breakdown_skips_unvisited_stages() {
        let breakdown = JourneyBreakdown::of(&finished(1, false));
        assert_eq!(breakdown.get(Stage::BagUnload), None);
        assert_eq!(breakdown.get(Stage::WaitingForBag), None);
        assert_eq!(breakdown.get(Stage::BodyScan), Some(1_000));
    }

    #[test]
    fn breakdown_of_waiting_passenger_is_empty() {
        let breakdown = JourneyBreakdown::of(&bagless(1, 500));
        assert!(Stage::ALL.iter().all(|s| breakdown.get(*s).is_none()));
        assert_eq!(breakdown.time_in_system, None);
    }

    #[test]
    fn stage_averages_count_only_present_stages() {
        let passengers = [finished(1, true), finished(2, false)];
        let averages = StageAverages::from_passengers(&passengers);
        assert_eq!(averages.samples(Stage::BodyScan), 2);
        assert_eq!(averages.samples(Stage::BagUnload), 1);
        assert_eq!(averages.average(Stage::BagUnload), Some(10_000));
        assert_eq!(averages.average(Stage::QueueWait), Some(2_000));
        assert_eq!(StageAverages::default().average(Stage::BagScan), None);
    }

    // -----------------------------------------------------------------------
    // Session summary
    // -----------------------------------------------------------------------

    #[test]
    fn summary_of_fresh_state_is_empty() {
        let engine = test_engine(quiet_config(2), 1);
        let summary = SessionSummary::from_state(engine.state());
        assert_eq!(summary.passengers_processed, 0);
        assert_eq!(summary.average_time_in_system, None);
        assert_eq!(summary.detection_ratio(), None);
        assert_eq!(summary.passengers_per_minute(), Fixed64::ZERO);
    }

    #[test]
    fn summary_counts_bags_and_detection() {
        let engine = test_engine(quiet_config(1), 1);
        let mut state = engine.state().clone();
        let mut found = finished(1, true);
        if let Some(bag) = found.bag.as_mut() {
            bag.has_suspicious_item = true;
            bag.acknowledge_alerts();
        }
        let mut missed = finished(2, true);
        if let Some(bag) = missed.bag.as_mut() {
            bag.has_suspicious_item = true;
        }
        state.completed = vec![found, missed, finished(3, true), finished(4, false)];
        state.time = 60_000;

        let summary = SessionSummary::from_state(&state);
        assert_eq!(summary.passengers_processed, 4);
        assert_eq!(summary.passengers_with_bags, 3);
        assert_eq!(summary.suspicious_bags, 2);
        assert_eq!(summary.suspicious_investigated, 1);
        assert_fixed_approx(summary.detection_ratio().unwrap(), 0.5, 1e-9);
        assert_eq!(summary.average_time_in_system, Some((18_000 * 3 + 14_000) / 4));
        assert_fixed_approx(summary.passengers_per_minute(), 4.0, 1e-6);
        assert_eq!(summary.stages.samples(Stage::BagScan), 3);
    }

    // -----------------------------------------------------------------------
    // CheckpointStats
    // -----------------------------------------------------------------------

    #[test]
    fn clearances_tracked_globally_and_per_lane() {
        let mut stats = CheckpointStats::new(small_config());
        stats.process_events(&[cleared(1, 0, 10_000), cleared(2, 1, 20_000)]);
        stats.end_tick(1);
        stats.process_event(&cleared(3, 0, 30_000));
        stats.end_tick(2);

        assert_eq!(stats.total_cleared(), 3);
        assert_fixed_approx(stats.clearance_rate(), 1.5, 1e-9);
        assert_fixed_approx(stats.lane_clearance_rate(LaneId(0)), 1.0, 1e-9);
        assert_eq!(stats.lane_clearances_in_window(LaneId(1)), 1);
        assert_eq!(stats.lane_clearance_rate(LaneId(9)), Fixed64::ZERO);
        assert_eq!(stats.average_time_in_system(), Some(20_000));
        assert_eq!(stats.current_tick(), 2);
    }

    #[test]
    fn rate_decays_after_window_passes() {
        let mut stats = CheckpointStats::new(small_config());
        stats.process_event(&cleared(1, 0, 1_000));
        for tick in 1..=10 {
            stats.end_tick(tick);
        }
        assert!(stats.clearance_rate() > Fixed64::ZERO);
        stats.end_tick(11);
        assert_eq!(stats.clearance_rate(), Fixed64::ZERO);
        assert_eq!(stats.total_cleared(), 1);
    }

    #[test]
    fn per_minute_scales_by_tick_length() {
        let mut stats = CheckpointStats::new(small_config());
        stats.process_event(&cleared(1, 0, 1_000));
        stats.end_tick(1);
        // One clearance per 100 ms tick is 600 per minute.
        assert_fixed_approx(stats.clearances_per_minute(100), 600.0, 1e-6);
        assert_eq!(per_minute(Fixed64::ONE, 0), Fixed64::ZERO);
    }

    #[test]
    fn alerts_and_violations_counted() {
        let mut stats = CheckpointStats::new(small_config());
        let clean = Event::BagScanCompleted {
            bag: passenger_id(1).bag_id(),
            lane: LaneId(0),
            alerts: BagAlerts::default(),
            time: 0,
        };
        let flagged = Event::BagScanCompleted {
            bag: passenger_id(2).bag_id(),
            lane: LaneId(0),
            alerts: BagAlerts {
                liquids: true,
                ..Default::default()
            },
            time: 0,
        };
        stats.process_events(&[clean, flagged]);
        stats.end_tick(1);
        assert_eq!(stats.total_alerts(), 1);
        assert_fixed_approx(stats.bag_scan_rate(), 2.0, 1e-9);
        assert_eq!(stats.integrity_violations(), 0);
    }

    #[test]
    fn history_records_each_tick() {
        let mut stats = CheckpointStats::new(small_config());
        for tick in 1..=20 {
            if tick % 2 == 0 {
                stats.process_event(&cleared(tick, 0, 1_000));
            }
            stats.end_tick(tick);
        }
        assert_eq!(stats.clearance_history().len(), 16);
        assert!(stats.clearance_history().latest().is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let mut stats = CheckpointStats::new(small_config());
        stats.process_event(&cleared(1, 0, 1_000));
        stats.end_tick(1);
        stats.reset();
        assert_eq!(stats.total_cleared(), 0);
        assert!(stats.clearance_history().is_empty());
        assert_eq!(stats.config().window_size, 10);
    }

    #[test]
    fn engine_run_matches_summary() {
        let mut engine = test_engine(quiet_config(1), 3);
        let mut stats = CheckpointStats::new(StatsConfig::default());
        for n in 0..3 {
            enqueue_in_lane(&mut engine, bagless(n, 0), LaneId(0));
        }
        engine.start_game().unwrap();
        engine.run_ticks(100);

        for passenger in &engine.state().completed {
            stats.process_event(&Event::PassengerCleared {
                passenger: passenger.id.clone(),
                lane: LaneId(0),
                time_in_system: passenger.journey.time_in_system().unwrap_or(0),
                time: passenger.journey.security_cleared.unwrap_or(0),
            });
        }
        stats.end_tick(engine.state().tick);

        let summary = SessionSummary::from_state(engine.state());
        assert_eq!(summary.passengers_processed, 3);
        assert_eq!(stats.total_cleared(), 3);
        assert_eq!(stats.average_time_in_system(), summary.average_time_in_system);
    }
}
