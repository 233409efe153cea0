//! Generation - procedural creation of floors.
//!
//! Level generation is an external collaborator of the floor cache: the
//! cache only asks for a level at a depth and treats the result as opaque.
//! [`CavernGenerator`] is the default implementation; [`build_dead_end`] is
//! the fallback used when a cached floor cannot be read back.

mod cavern;
mod dead_end;

pub use cavern::*;
pub use dead_end::*;

use delver_logic::ids::FloorId;
use rand::rngs::StdRng;

use crate::components::Level;

/// What the cache knows about the floor being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationContext {
    pub depth: i32,
    /// Slot id the level will live in (`NONE` for uncached floors).
    pub floor_id: FloorId,
    /// Bounded encounter (arena-like).
    pub encounter: bool,
}

impl GenerationContext {
    pub fn is_overworld(&self) -> bool {
        self.depth == 0 && !self.encounter
    }
}

/// Builds a fresh level. Injected into the cache at construction.
pub trait LevelGenerator {
    fn generate(&mut self, ctx: &GenerationContext, rng: &mut StdRng) -> Level;
}
