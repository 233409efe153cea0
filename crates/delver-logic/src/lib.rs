//! Pure floor-cache logic for Delver.
//!
//! This crate contains the parts of the multi-level dungeon cache that do not
//! touch the filesystem or the ECS world. Functions take plain data and return
//! results, so the eviction policy and the party rules are unit-testable on
//! their own and shared by the engine crate and the headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`constants`] | Default capacities and search bounds |
//! | [`geometry`] | Grid positions and roguelike distance |
//! | [`ids`] | `FloorId` handle and its wrapping allocator |
//! | [`mode`] | Transition mode bitset and travel direction |
//! | [`party`] | Which companions travel with the player |
//! | [`registry`] | Fixed-capacity slot table and recency eviction |
//! | [`stairs`] | Connector kinds and arrival-tile resolution |

pub mod constants;
pub mod geometry;
pub mod ids;
pub mod mode;
pub mod party;
pub mod registry;
pub mod stairs;
