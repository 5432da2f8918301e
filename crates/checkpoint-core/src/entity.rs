//! Passengers, their bags, and the journey timestamps they accumulate.
//!
//! A [`Bag`] is created together with its [`Passenger`] and has exactly one
//! owner at any instant: the passenger (`passenger.bag`) until it is unloaded
//! onto the scanner belt, then one of the lane's bag stations, then the
//! passenger again once reunited at pickup.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, SimMillis};
use crate::id::{BagId, Identified, PassengerId};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentingGender {
    Male,
    Female,
    Ambiguous,
}

/// Highest value of [`Passenger::security_familiarity`].
pub const MAX_FAMILIARITY: u8 = 10;

// ---------------------------------------------------------------------------
// Bag
// ---------------------------------------------------------------------------

/// Alerts raised by the bag scanner when a bag finishes scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagAlerts {
    pub suspicious_item: bool,
    pub electronics: bool,
    pub liquids: bool,
}

impl BagAlerts {
    pub fn any(&self) -> bool {
        self.suspicious_item || self.electronics || self.liquids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    pub id: BagId,
    pub passenger_id: PassengerId,

    pub has_electronics: bool,
    pub has_suspicious_item: bool,
    pub has_liquids: bool,

    /// Set once an operator acknowledges the matching alert.
    pub suspicious_item_dealt_with: bool,
    pub electronics_alert_dealt_with: bool,
    pub liquids_alert_dealt_with: bool,

    pub is_unloaded: bool,
    pub is_being_scanned: bool,
    pub scan_complete: bool,
    /// `None` until the scan completes.
    pub alerts: Option<BagAlerts>,

    pub scan_started_at: Option<SimMillis>,
    pub scan_completed_at: Option<SimMillis>,
}

impl Bag {
    /// A fresh, unscanned bag for `owner`.
    pub fn new(owner: &PassengerId) -> Self {
        Self {
            id: owner.bag_id(),
            passenger_id: owner.clone(),
            has_electronics: false,
            has_suspicious_item: false,
            has_liquids: false,
            suspicious_item_dealt_with: false,
            electronics_alert_dealt_with: false,
            liquids_alert_dealt_with: false,
            is_unloaded: false,
            is_being_scanned: false,
            scan_complete: false,
            alerts: None,
            scan_started_at: None,
            scan_completed_at: None,
        }
    }

    /// Acknowledge every alert on this bag.
    pub fn acknowledge_alerts(&mut self) {
        self.suspicious_item_dealt_with = true;
        self.electronics_alert_dealt_with = true;
        self.liquids_alert_dealt_with = true;
    }

    /// Already picked up by (or finished in) a scanner.
    pub fn is_scan_claimed(&self) -> bool {
        self.is_being_scanned || self.scan_complete
    }
}

impl Identified for Bag {
    type Id = BagId;

    fn id(&self) -> &BagId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Journey
// ---------------------------------------------------------------------------

/// Timestamps (simulated milliseconds) recorded as a passenger moves through
/// the checkpoint. Each is set at most once, in journey order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    pub spawned: Option<SimMillis>,
    pub lane_assigned: Option<SimMillis>,
    pub bag_unload_started: Option<SimMillis>,
    pub bag_unload_completed: Option<SimMillis>,
    pub body_scanner_queue_joined: Option<SimMillis>,
    pub body_scanner_started: Option<SimMillis>,
    pub body_scanner_finished: Option<SimMillis>,
    pub waiting_for_bag_started: Option<SimMillis>,
    pub waiting_for_bag_finished: Option<SimMillis>,
    pub bag_scanner_started: Option<SimMillis>,
    pub bag_scanner_completed: Option<SimMillis>,
    pub security_cleared: Option<SimMillis>,
}

impl Journey {
    /// The passenger-side stamps in the order they are set. Bag scanner stamps
    /// run in parallel and are excluded.
    pub fn ordered_stamps(&self) -> [Option<SimMillis>; 10] {
        [
            self.spawned,
            self.lane_assigned,
            self.bag_unload_started,
            self.bag_unload_completed,
            self.body_scanner_queue_joined,
            self.body_scanner_started,
            self.body_scanner_finished,
            self.waiting_for_bag_started,
            self.waiting_for_bag_finished,
            self.security_cleared,
        ]
    }

    /// True when every present passenger-side stamp is non-decreasing.
    pub fn is_monotonic(&self) -> bool {
        let present: Vec<SimMillis> = self.ordered_stamps().into_iter().flatten().collect();
        present.windows(2).all(|w| w[0] <= w[1])
    }

    /// Time from spawn to clearance, when both are known.
    pub fn time_in_system(&self) -> Option<SimMillis> {
        Some(self.security_cleared?.saturating_sub(self.spawned?))
    }
}

// ---------------------------------------------------------------------------
// Passenger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: PassengerId,

    pub nationality: String,
    pub sex: Sex,
    pub presenting_gender: PresentingGender,
    /// 0 (first flight) to [`MAX_FAMILIARITY`] (frequent flyer).
    pub security_familiarity: u8,
    pub preferred_security_agent_gender: Option<Sex>,

    pub has_bag: bool,
    /// Present while the passenger physically holds the bag.
    pub bag: Option<Bag>,
    pub bag_on_person: bool,

    pub unloading_bag: bool,
    /// 0..=100 while unloading.
    pub unloading_progress: Fixed64,
    pub unloading_start_time: Option<SimMillis>,

    pub journey: Journey,
}

impl Passenger {
    /// A passenger with neutral attributes and no bag. Spawn control fills in
    /// the randomized fields.
    pub fn new(id: PassengerId) -> Self {
        Self {
            id,
            nationality: String::new(),
            sex: Sex::Female,
            presenting_gender: PresentingGender::Female,
            security_familiarity: 0,
            preferred_security_agent_gender: None,
            has_bag: false,
            bag: None,
            bag_on_person: false,
            unloading_bag: false,
            unloading_progress: Fixed64::ZERO,
            unloading_start_time: None,
            journey: Journey::default(),
        }
    }

    /// Give the passenger a bag built by `configure`.
    pub fn with_bag(mut self, configure: impl FnOnce(&mut Bag)) -> Self {
        let mut bag = Bag::new(&self.id);
        configure(&mut bag);
        self.has_bag = true;
        self.bag = Some(bag);
        self.bag_on_person = true;
        self
    }

    /// ID of the bag this passenger owns, wherever it currently is.
    pub fn bag_id(&self) -> Option<BagId> {
        self.has_bag.then(|| self.id.bag_id())
    }

    /// Bag is on the belt and unloading has been committed.
    pub fn has_finished_unloading(&self) -> bool {
        self.journey.bag_unload_completed.is_some()
    }

    /// Reset the transient unloading fields.
    pub(crate) fn clear_unloading(&mut self) {
        self.unloading_bag = false;
        self.unloading_progress = Fixed64::ZERO;
        self.unloading_start_time = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.journey.security_cleared.is_some()
    }
}

impl Identified for Passenger {
    type Id = PassengerId;

    fn id(&self) -> &PassengerId {
        &self.id
    }
}
