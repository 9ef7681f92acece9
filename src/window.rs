//! Bounded sliding window of samples.
//!
//! Implements a fixed-size ring buffer holding the most recent readings.
//! Follows NASA Power of 10: bounded resources, memory capped by capacity.

use std::collections::VecDeque;

use crate::errors::FeedError;

/// Default window capacity (the dashboard chart shows the last 20 readings).
pub const DEFAULT_CAPACITY: usize = 20;

/// A bounded FIFO window.
///
/// Appending to a full window evicts the oldest entry first, so memory use is
/// fixed for the lifetime of the feed regardless of how long it runs.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    /// Ring of entries (oldest at front, newest at back)
    items: VecDeque<T>,
    /// Maximum capacity
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Create a new window with the specified capacity.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] if capacity is zero.
    pub fn new(capacity: usize) -> Result<Self, FeedError> {
        if capacity == 0 {
            return Err(FeedError::Config("window capacity must be at least 1".into()));
        }

        // Storage grows with use; only the bound is fixed up front.
        Ok(Self {
            items: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        })
    }

    /// Append an entry, evicting and returning the oldest one if at capacity.
    pub fn append(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };

        self.items.push_back(item);

        // NASA Power of 10: assert postcondition
        debug_assert!(self.items.len() <= self.capacity);
        evicted
    }

    /// Fixed capacity chosen at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recently appended entry.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Clone> SlidingWindow<T> {
    /// Owned copy of the window contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
