//! The bounded FIFO used by every station.
//!
//! [`BoundedQueue`] is the single point of capacity enforcement for the whole
//! checkpoint: every station limit is checked here and nowhere else. A
//! rejected [`enqueue`](BoundedQueue::enqueue) hands the item back so the
//! caller can leave it where it was.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::id::Identified;

/// Why an enqueue was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("queue is at capacity")]
    Full,
    #[error("an item with the same id is already queued")]
    DuplicateId,
}

/// A refused item, returned to the caller untouched.
#[derive(Debug)]
pub struct Rejected<T> {
    pub item: T,
    pub reason: RejectReason,
}

impl<T> Rejected<T> {
    pub fn into_inner(self) -> T {
        self.item
    }
}

/// FIFO with a fixed capacity and unique-ID membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Identified> BoundedQueue<T> {
    /// Create an empty queue. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Whether an item with `id` would be accepted right now.
    pub fn check_enqueue(&self, id: &T::Id) -> Result<(), RejectReason> {
        if self.contains(id) {
            return Err(RejectReason::DuplicateId);
        }
        if self.is_full() {
            return Err(RejectReason::Full);
        }
        Ok(())
    }

    /// Append to the back. Rejected when full or when the ID is already present.
    pub fn enqueue(&mut self, item: T) -> Result<(), Rejected<T>> {
        match self.check_enqueue(item.id()) {
            Ok(()) => {
                self.items.push_back(item);
                Ok(())
            }
            Err(reason) => Err(Rejected { item, reason }),
        }
    }

    /// Move the front item to the back of `dest`.
    ///
    /// Returns the moved ID, `Ok(None)` when this queue is empty, or the reason
    /// `dest` refused it. A refused item stays at the front of this queue.
    pub fn transfer_front(&mut self, dest: &mut Self) -> Result<Option<T::Id>, RejectReason> {
        let Some(front) = self.items.front() else {
            return Ok(None);
        };
        dest.check_enqueue(front.id())?;
        let Some(item) = self.items.pop_front() else {
            return Ok(None);
        };
        let id = item.id().clone();
        dest.items.push_back(item);
        Ok(Some(id))
    }

    /// Move the item with `id` to the back of `dest`. Returns `Ok(false)` if no
    /// such item is queued here. A refused item keeps its position.
    pub fn transfer_by_id(&mut self, id: &T::Id, dest: &mut Self) -> Result<bool, RejectReason> {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return Ok(false);
        };
        dest.check_enqueue(id)?;
        let Some(item) = self.items.remove(index) else {
            return Ok(false);
        };
        dest.items.push_back(item);
        Ok(true)
    }

    /// Remove and return the front item.
    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Front item without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.front_mut()
    }

    /// Most recently enqueued item.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    pub fn find_by_id(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn find_by_id_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Remove the item with the given ID, preserving the order of the rest.
    pub fn remove_by_id(&mut self, id: &T::Id) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        self.items.remove(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Free slots left before the queue starts rejecting.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// IDs front to back, cloned so callers can mutate the queue while walking them.
    pub fn ids(&self) -> Vec<T::Id> {
        self.items.iter().map(|item| item.id().clone()).collect()
    }
}
