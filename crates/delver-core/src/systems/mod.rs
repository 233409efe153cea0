//! Systems - logic that operates on a level's components

mod migration;
mod reconcile;
mod stairs;

pub use migration::*;
pub use reconcile::*;
pub use stairs::*;
