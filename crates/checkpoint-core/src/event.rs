//! Typed checkpoint events and the bus that delivers them.
//!
//! Events are emitted while a tick runs (and by control-surface calls) and
//! delivered in batch at the end of the tick. Each event kind has its own
//! bounded [`EventBuffer`].
//!
//! Subscribers are passive: they observe events read-only, for audio, UI and
//! statistics collaborators. Anything that wants to change the checkpoint
//! goes through the command queue instead.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]; a suppressed
//! kind is neither buffered nor counted.

use std::collections::VecDeque;

use crate::entity::BagAlerts;
use crate::error::IntegrityError;
use crate::fixed::SimMillis;
use crate::id::{BagId, LaneId, PassengerId};
use crate::lane::Station;
use crate::state::GamePhase;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the simulated time they occurred at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Control surface --
    PassengerSpawned {
        passenger: PassengerId,
        has_bag: bool,
        time: SimMillis,
    },
    PassengerAssigned {
        passenger: PassengerId,
        lane: LaneId,
        time: SimMillis,
    },

    // -- Lane pipeline --
    PassengerMoved {
        passenger: PassengerId,
        lane: LaneId,
        from: Station,
        to: Station,
        time: SimMillis,
    },
    BagUnloaded {
        bag: BagId,
        lane: LaneId,
        time: SimMillis,
    },
    BagScanStarted {
        bag: BagId,
        lane: LaneId,
        time: SimMillis,
    },
    BagScanCompleted {
        bag: BagId,
        lane: LaneId,
        alerts: BagAlerts,
        time: SimMillis,
    },
    BodyScanCompleted {
        passenger: PassengerId,
        lane: LaneId,
        time: SimMillis,
    },
    PassengerCleared {
        passenger: PassengerId,
        lane: LaneId,
        /// Spawn to clearance.
        time_in_system: SimMillis,
        time: SimMillis,
    },

    // -- Game state --
    CapacityTimerStarted {
        time: SimMillis,
    },
    CapacityTimerReset {
        time: SimMillis,
    },
    GameOver {
        passengers_processed: usize,
        time: SimMillis,
    },
    IntegrityViolation {
        error: IntegrityError,
        time: SimMillis,
    },
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
        time: SimMillis,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PassengerSpawned,
    PassengerAssigned,
    PassengerMoved,
    BagUnloaded,
    BagScanStarted,
    BagScanCompleted,
    BodyScanCompleted,
    PassengerCleared,
    CapacityTimerStarted,
    CapacityTimerReset,
    GameOver,
    IntegrityViolation,
    PhaseChanged,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 13;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PassengerSpawned { .. } => EventKind::PassengerSpawned,
            Event::PassengerAssigned { .. } => EventKind::PassengerAssigned,
            Event::PassengerMoved { .. } => EventKind::PassengerMoved,
            Event::BagUnloaded { .. } => EventKind::BagUnloaded,
            Event::BagScanStarted { .. } => EventKind::BagScanStarted,
            Event::BagScanCompleted { .. } => EventKind::BagScanCompleted,
            Event::BodyScanCompleted { .. } => EventKind::BodyScanCompleted,
            Event::PassengerCleared { .. } => EventKind::PassengerCleared,
            Event::CapacityTimerStarted { .. } => EventKind::CapacityTimerStarted,
            Event::CapacityTimerReset { .. } => EventKind::CapacityTimerReset,
            Event::GameOver { .. } => EventKind::GameOver,
            Event::IntegrityViolation { .. } => EventKind::IntegrityViolation,
            Event::PhaseChanged { .. } => EventKind::PhaseChanged,
        }
    }

    /// Simulated time the event occurred at.
    pub fn time(&self) -> SimMillis {
        match self {
            Event::PassengerSpawned { time, .. }
            | Event::PassengerAssigned { time, .. }
            | Event::PassengerMoved { time, .. }
            | Event::BagUnloaded { time, .. }
            | Event::BagScanStarted { time, .. }
            | Event::BagScanCompleted { time, .. }
            | Event::BodyScanCompleted { time, .. }
            | Event::PassengerCleared { time, .. }
            | Event::CapacityTimerStarted { time }
            | Event::CapacityTimerReset { time }
            | Event::GameOver { time, .. }
            | Event::IntegrityViolation { time, .. }
            | Event::PhaseChanged { time, .. } => *time,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: bounded pending queue
// ---------------------------------------------------------------------------

/// Events of one kind waiting for delivery. Holds at most `capacity` events;
/// pushing onto a full buffer drops the oldest one.
#[derive(Debug)]
pub struct EventBuffer {
    pending: VecDeque<Event>,
    capacity: usize,
    /// Pushed since creation, dropped ones included.
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Oldest first.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Event> {
        self.pending.iter()
    }

    /// Drop pending events; `total_written` is kept.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// Observes delivered events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Subscriber-side predicate; events it rejects are skipped for that
/// subscriber only.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Delivery order between subscribers of the same kind. `Pre` runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct Subscriber {
    priority: SubscriberPriority,
    /// Registration sequence, breaks priority ties.
    seq: u64,
    filter: Option<EventFilter>,
    listener: PassiveListener,
}

impl Subscriber {
    fn accepts(&self, event: &Event) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(event))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Per-kind pending buffers, subscribers and suppression flags.
pub struct EventBus {
    /// Created lazily on the first emit of a kind.
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    /// Kept sorted by `(priority, seq)`.
    subscribers: [Vec<Subscriber>; EVENT_KIND_COUNT],
    buffer_capacity: usize,
    next_seq: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscriber_count: usize = self.subscribers.iter().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("subscribers", &subscriber_count)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// `buffer_capacity` bounds the pending events of each kind.
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: std::array::from_fn(|_| Vec::new()),
            buffer_capacity,
            next_seq: 0,
        }
    }

    /// Stop recording `kind`. Pending events of that kind are discarded.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Queue `event` for delivery at the end of the tick.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.buffer_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let list = &mut self.subscribers[kind.index()];
        let at = list.partition_point(|s| (s.priority, s.seq) <= (priority, seq));
        list.insert(
            at,
            Subscriber {
                priority,
                seq,
                filter,
                listener,
            },
        );
    }

    /// Hand every pending event to its kind's subscribers, oldest first,
    /// then empty the buffers. The engine calls this once per tick.
    pub fn deliver(&mut self) {
        for (buffer, subscribers) in self.buffers.iter_mut().zip(self.subscribers.iter_mut()) {
            let Some(buffer) = buffer.as_mut().filter(|b| !b.is_empty()) else {
                continue;
            };
            for event in buffer.iter() {
                for subscriber in subscribers.iter_mut().filter(|s| s.accepts(event)) {
                    (subscriber.listener)(event);
                }
            }
            buffer.clear();
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events of `kind` still waiting for delivery.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Events of `kind` emitted since the bus was created, including ones
    /// dropped from a full buffer.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Discard pending events. Subscribers and suppression stay.
    pub fn clear_all(&mut self) {
        self.buffers.iter_mut().flatten().for_each(EventBuffer::clear);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn spawned(n: u64, time: SimMillis) -> Event {
        Event::PassengerSpawned {
            passenger: PassengerId::generate(time, n),
            has_bag: n % 2 == 0,
            time,
        }
    }

    fn timer_started(time: SimMillis) -> Event {
        Event::CapacityTimerStarted { time }
    }

    #[test]
    fn event_buffer_push_and_iterate() {
        let mut buf = EventBuffer::new(8);
        buf.push(spawned(1, 100));
        buf.push(spawned(2, 200));

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.total_written(), 2);

        let events: Vec<&Event> = buf.iter().collect();
        assert_eq!(events, vec![&spawned(1, 100), &spawned(2, 200)]);
    }

    #[test]
    fn full_event_buffer_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        for i in 0..5u64 {
            buf.push(timer_started(i));
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);

        let times: Vec<SimMillis> = buf.iter().map(Event::time).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn event_buffer_clear_keeps_total() {
        let mut buf = EventBuffer::new(4);
        buf.push(timer_started(1));
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.iter().count(), 0);
        assert_eq!(buf.total_written(), 1);
    }

    #[test]
    fn event_buffer_iter_len_is_bounded() {
        let mut buf = EventBuffer::new(4);
        for i in 0..6 {
            buf.push(timer_started(i));
        }
        assert_eq!(buf.iter().len(), 4);
    }

    #[test]
    fn event_buffer_zero_capacity_clamped() {
        let mut buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(timer_started(1));
        buf.push(timer_started(2));
        assert_eq!(buf.iter().map(Event::time).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn emit_and_count() {
        let mut bus = EventBus::new(16);
        bus.emit(spawned(1, 0));
        bus.emit(spawned(2, 0));
        bus.emit(timer_started(5));

        assert_eq!(bus.buffered_count(EventKind::PassengerSpawned), 2);
        assert_eq!(bus.buffered_count(EventKind::CapacityTimerStarted), 1);
        assert_eq!(bus.buffered_count(EventKind::GameOver), 0);
        assert_eq!(bus.total_emitted(EventKind::PassengerSpawned), 2);
    }

    #[test]
    fn suppressed_events_are_not_buffered() {
        let mut bus = EventBus::new(16);
        bus.emit(spawned(1, 0));
        bus.suppress(EventKind::PassengerSpawned);
        assert!(bus.is_suppressed(EventKind::PassengerSpawned));
        assert!(bus.buffer(EventKind::PassengerSpawned).is_none());

        bus.emit(spawned(2, 0));
        assert_eq!(bus.buffered_count(EventKind::PassengerSpawned), 0);
        assert_eq!(bus.total_emitted(EventKind::PassengerSpawned), 0);
    }

    #[test]
    fn delivery_reaches_listeners_and_clears() {
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on_passive(
            EventKind::PassengerSpawned,
            Box::new(move |e| sink.borrow_mut().push(e.time())),
        );

        bus.emit(spawned(1, 100));
        bus.emit(spawned(2, 200));
        bus.emit(timer_started(300));
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![100, 200]);
        assert_eq!(bus.buffered_count(EventKind::PassengerSpawned), 0);
        assert_eq!(bus.buffered_count(EventKind::CapacityTimerStarted), 0);
        assert_eq!(bus.total_emitted(EventKind::PassengerSpawned), 2);

        bus.deliver();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn priorities_run_pre_normal_post() {
        let mut bus = EventBus::new(4);
        let order = Rc::new(RefCell::new(Vec::new()));
        for (priority, label) in [
            (SubscriberPriority::Post, "post"),
            (SubscriberPriority::Normal, "normal"),
            (SubscriberPriority::Pre, "pre"),
        ] {
            let sink = order.clone();
            bus.on_passive_filtered(
                EventKind::GameOver,
                priority,
                None,
                Box::new(move |_| sink.borrow_mut().push(label)),
            );
        }
        bus.emit(Event::GameOver {
            passengers_processed: 0,
            time: 0,
        });
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["pre", "normal", "post"]);
    }

    #[test]
    fn same_priority_preserves_registration_order() {
        let mut bus = EventBus::new(4);
        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let sink = order.clone();
            bus.on_passive(
                EventKind::CapacityTimerReset,
                Box::new(move |_| sink.borrow_mut().push(label)),
            );
        }
        bus.emit(Event::CapacityTimerReset { time: 1 });
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn filter_blocks_non_matching() {
        let mut bus = EventBus::new(8);
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        bus.on_passive_filtered(
            EventKind::PassengerSpawned,
            SubscriberPriority::Normal,
            Some(Box::new(|e| matches!(e, Event::PassengerSpawned { has_bag: true, .. }))),
            Box::new(move |_| *sink.borrow_mut() += 1),
        );
        for n in 0..4 {
            bus.emit(spawned(n, 0));
        }
        bus.deliver();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn clear_all_drops_pending_events() {
        let mut bus = EventBus::new(8);
        bus.emit(spawned(1, 0));
        bus.emit(timer_started(0));
        bus.clear_all();
        assert_eq!(bus.buffered_count(EventKind::PassengerSpawned), 0);
        assert_eq!(bus.buffered_count(EventKind::CapacityTimerStarted), 0);
    }

    #[test]
    fn kind_and_time_accessors() {
        let event = Event::PhaseChanged {
            from: GamePhase::Paused,
            to: GamePhase::Running,
            time: 700,
        };
        assert_eq!(event.kind(), EventKind::PhaseChanged);
        assert_eq!(event.time(), 700);
    }
}
