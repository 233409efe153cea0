//! Component and level definitions.
//!
//! Components are pure data structs attached to entities in a level's
//! `hecs::World`. They have no behavior - that lives in systems.

mod creatures;
mod grid;
mod level;

pub use creatures::*;
pub use grid::*;
pub use level::*;
