//! Default capacities and search bounds for the floor cache.
//!
//! These are the values a `CacheConfig` starts from; the engine may override
//! every one of them.

/// Number of floors held by the registry at once (cached + current).
pub const DEFAULT_SLOT_CAPACITY: usize = 10;

/// Largest slot table we can name on disk (`.F00` through `.F99`).
pub const MAX_SLOT_CAPACITY: usize = 99;

/// Companions carried across one transition, mount included.
pub const DEFAULT_ROSTER_CAPACITY: usize = 21;

/// Largest scatter radius tried when re-placing a companion.
pub const DEFAULT_PLACEMENT_RADIUS: i32 = 5;

/// Random scatter attempts per radius before widening the search.
pub const DEFAULT_PLACEMENT_ATTEMPTS: u32 = 1000;

/// First value of the recency clock, and the value `discard_all` resets to.
pub const INITIAL_RECENCY_MARK: u32 = 1;
