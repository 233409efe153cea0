//! Floor identifiers.
//!
//! A `FloorId` names one floor instance for as long as it lives in the cache.
//! Ids are handed out by a monotonically increasing 16-bit counter. When the
//! counter runs past `u16::MAX` it wraps back to 1 *without* checking whether
//! the old value is still referenced by a slot or a neighbor edge. That reuse
//! is a known limitation kept on purpose; callers can detect a collision but
//! the allocator never repairs one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle for one floor. `FloorId::NONE` (0) means "no floor".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FloorId(pub u16);

impl FloorId {
    pub const NONE: FloorId = FloorId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    /// `None` for the sentinel, the id otherwise.
    pub fn get(self) -> Option<FloorId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for FloorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "floor#none")
        } else {
            write!(f, "floor#{}", self.0)
        }
    }
}

/// Hands out floor ids. Allocation cannot fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorIdAllocator {
    next: u16,
    wraps: u32,
}

impl FloorIdAllocator {
    pub fn new() -> Self {
        Self { next: 1, wraps: 0 }
    }

    /// Start the counter at `next` (0 is bumped to 1). Used to resume a
    /// session and to exercise wraparound.
    pub fn starting_at(next: u16) -> Self {
        Self {
            next: next.max(1),
            wraps: 0,
        }
    }

    /// Return the next id and advance the counter, wrapping to 1 after
    /// `u16::MAX`.
    pub fn next_id(&mut self) -> FloorId {
        let id = FloorId(self.next);
        self.next = match self.next.checked_add(1) {
            Some(n) => n,
            None => {
                self.wraps += 1;
                1
            }
        };
        id
    }

    /// The value `next_id` will return next.
    pub fn peek(&self) -> FloorId {
        FloorId(self.next)
    }

    /// How many times the counter has wrapped.
    pub fn wraps(&self) -> u32 {
        self.wraps
    }
}

impl Default for FloorIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
