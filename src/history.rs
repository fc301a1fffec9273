//! Fixed-capacity history of the most recent items.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Errors that can occur when building a history buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// A history buffer must hold at least one item.
    #[error("History capacity must be greater than zero")]
    ZeroCapacity,
}

/// Slot storage guarded by the history lock.
#[derive(Debug)]
struct Ring<T> {
    /// Grows up to capacity, then slots are overwritten in place.
    slots: Vec<T>,
    /// Next slot to overwrite once full.
    cursor: usize,
}

/// Thread-safe circular store of the most recent `capacity` items.
///
/// Appending past capacity overwrites the oldest item. Readers always get a
/// copy in chronological order (oldest first).
#[derive(Debug)]
pub struct RingHistory<T> {
    capacity: NonZeroUsize,
    ring: Mutex<Ring<T>>,
}

impl<T: Clone> RingHistory<T> {
    /// Create a history holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        NonZeroUsize::new(capacity)
            .map(Self::with_capacity)
            .ok_or(HistoryError::ZeroCapacity)
    }

    /// Create a history with an already validated capacity.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            ring: Mutex::new(Ring {
                slots: Vec::with_capacity(capacity.get()),
                cursor: 0,
            }),
        }
    }

    /// Append an item, overwriting the oldest one when full.
    pub fn append(&self, item: T) {
        let capacity = self.capacity.get();
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);

        if ring.slots.len() < capacity {
            ring.slots.push(item);
        } else {
            let cursor = ring.cursor;
            ring.slots[cursor] = item;
        }
        ring.cursor = (ring.cursor + 1) % capacity;
    }

    /// Copy the contents out, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        let ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);

        if ring.slots.len() < self.capacity.get() {
            return ring.slots.clone();
        }

        let (newest, oldest) = ring.slots.split_at(ring.cursor);
        oldest.iter().chain(newest).cloned().collect()
    }

    /// Maximum number of items retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of items currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
