//! Delver Core - dungeon floor cache and transition controller
//!
//! Keeps a bounded set of visited dungeon floors, writes evicted floors to
//! per-slot scratch files and reads them back when the player returns.
//!
//! # Architecture
//!
//! Each floor is a [`components::Level`]: a tile grid plus a `hecs` world of
//! creatures and items.
//! - **Registry**: slot metadata and eviction live in `delver-logic`
//! - **Persistence**: bincode backing files, one per slot
//! - **Systems**: pet migration, connector bookkeeping, unique reconciliation
//! - **Transition**: `leave` then `enter`, driven by a `TransitionMode`
//!
//! # Example
//!
//! ```rust,no_run
//! use delver_core::prelude::*;
//!
//! let config = CacheConfig::default().with_save_dir("/tmp/delver");
//! let mut cache = FloorCache::with_defaults(config, false).expect("startup");
//!
//! cache.request_transition(TransitionMode::STAIRS_DOWN);
//! cache.request_transition(TransitionMode::STAIRS_DOWN);
//! let report = cache.request_transition(TransitionMode::STAIRS_UP);
//! assert_eq!(report.depth, 1);
//!
//! cache.shutdown();
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod systems;
pub mod transition;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::CacheConfig;
    pub use crate::engine::{ActiveFloor, FloorCache};
    pub use crate::error::*;
    pub use crate::transition::{ArrivalKind, TransitionReport};
    pub use delver_logic::ids::FloorId;
    pub use delver_logic::mode::TransitionMode;
}
