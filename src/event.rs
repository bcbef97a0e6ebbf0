//! Collision Event Queue
//!
//! The solver turns every contact whose normal impulse crosses the reporting
//! threshold into a [`CollisionEvent`]. Events wait in a bounded FIFO until
//! the host drains them once per tick.
//!
//! The queue never grows past its capacity: pushing into a full queue drops
//! the oldest event and bumps the overflow counter. Events still queued when
//! the next step starts were never consumed; they are discarded and counted
//! as overflow as well.

use crate::body::BodyHandle;
use crate::math::{Fix64, Vec2Fix};

use alloc::collections::VecDeque;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A resolved contact reported to gameplay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionEvent {
    /// Lower-indexed body of the pair
    pub body_a: BodyHandle,
    /// Higher-indexed body of the pair
    pub body_b: BodyHandle,
    /// Contact point (world space)
    pub point: Vec2Fix,
    /// Contact normal (A to B)
    pub normal: Vec2Fix,
    /// Total normal impulse applied this tick
    pub impulse: Fix64,
    /// Tick in which the contact was resolved
    pub tick: u64,
}

impl CollisionEvent {
    /// True if `handle` is one of the two bodies
    #[inline]
    #[must_use]
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.body_a == handle || self.body_b == handle
    }

    /// The body on the other side of `handle`, if `handle` is involved
    #[must_use]
    pub fn other(&self, handle: BodyHandle) -> Option<BodyHandle> {
        if self.body_a == handle {
            Some(self.body_b)
        } else if self.body_b == handle {
            Some(self.body_a)
        } else {
            None
        }
    }
}

/// Event queue settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EventConfig {
    /// Maximum number of queued events
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Bounded FIFO of collision events
#[derive(Clone, Debug)]
pub struct EventQueue {
    events: VecDeque<CollisionEvent>,
    capacity: usize,
    /// Events lost to a full queue or to a missed drain
    overflow: u64,
    /// Subset of `overflow` lost to a missed drain
    stale: u64,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            overflow: 0,
            stale: 0,
        }
    }

    /// Append an event, dropping the oldest if the queue is full.
    /// Returns `true` if an event was dropped.
    pub fn push(&mut self, event: CollisionEvent) -> bool {
        let dropped = if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.overflow += 1;
            true
        } else {
            false
        };
        self.events.push_back(event);
        dropped
    }

    /// Take every queued event in FIFO order
    pub fn drain(&mut self) -> Vec<CollisionEvent> {
        self.events.drain(..).collect()
    }

    /// Discard events left over from the previous tick.
    /// Returns how many were discarded.
    pub fn discard_stale(&mut self) -> usize {
        let n = self.events.len();
        if n > 0 {
            self.events.clear();
            self.overflow += n as u64;
            self.stale += n as u64;
        }
        n
    }

    /// Queued events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &CollisionEvent> + '_ {
        self.events.iter()
    }

    /// Number of queued events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of queued events
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events lost (full queue plus missed drains)
    #[must_use]
    pub fn overflow_count(&self) -> u64 {
        self.overflow
    }

    /// Events lost because they were not drained before the next step
    #[must_use]
    pub fn stale_count(&self) -> u64 {
        self.stale
    }
}
