use serde::{Deserialize, Serialize};
use std::fmt;

const PASSENGER_PREFIX: &str = "passenger_";
const BAG_PREFIX: &str = "bag_";

/// Identifies a passenger. Format: `passenger_<spawn millis>_<random>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PassengerId(pub String);

impl PassengerId {
    /// Build the canonical ID from a spawn timestamp and a random suffix.
    pub fn generate(timestamp_ms: u64, suffix: u64) -> Self {
        Self(format!("{PASSENGER_PREFIX}{timestamp_ms}_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bag ID this passenger's bag carries. Deterministic, so a bag can
    /// always be matched back to its owner.
    pub fn bag_id(&self) -> BagId {
        let stem = self.0.strip_prefix(PASSENGER_PREFIX).unwrap_or(&self.0);
        BagId(format!("{BAG_PREFIX}{stem}"))
    }
}

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a bag. Derived from the owning passenger's ID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BagId(pub String);

impl BagId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a security lane. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LaneId(pub u32);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane_{}", self.0 + 1)
    }
}

/// Anything that can sit in a [`BoundedQueue`](crate::queue::BoundedQueue).
pub trait Identified {
    type Id: Clone + Eq + Ord + fmt::Debug + fmt::Display;

    fn id(&self) -> &Self::Id;
}
