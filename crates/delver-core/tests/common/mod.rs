//! Common test utilities for floor cache tests
//!
//! A predictable generator (one open hall, fixed connectors, no creatures)
//! and helpers to open a cache in a temporary directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use delver_core::generation::{GenerationContext, LevelGenerator};
use delver_core::persistence::BincodeCodec;
use delver_core::prelude::*;
use delver_logic::geometry::Pos;
use delver_logic::stairs::ConnectorKind;
use rand::rngs::StdRng;

/// Square open hall. The player starts in the middle; an up staircase sits
/// near the top-left corner (dungeon floors only) and a down staircase near
/// the bottom-right.
pub struct OpenHallGenerator {
    pub size: i32,
}

impl OpenHallGenerator {
    pub fn up_stairs(&self) -> Pos {
        Pos::new(3, 3)
    }

    pub fn down_stairs(&self) -> Pos {
        Pos::new(self.size - 4, self.size - 4)
    }
}

impl LevelGenerator for OpenHallGenerator {
    fn generate(&mut self, ctx: &GenerationContext, _rng: &mut StdRng) -> Level {
        let mut level = Level::new(ctx.depth, self.size, self.size);
        level.carve_room(Pos::new(1, 1), Pos::new(self.size - 2, self.size - 2));
        level.player = Pos::new(self.size / 2, self.size / 2);
        if ctx.depth > 0 {
            level.place_connector(self.up_stairs(), Connector::new(ConnectorKind::Ascending));
        }
        level.place_connector(self.down_stairs(), Connector::new(ConnectorKind::Descending));
        level
    }
}

pub fn save_dir(root: &Path) -> PathBuf {
    root.join("save")
}

pub fn test_config(root: &Path, slots: usize) -> CacheConfig {
    CacheConfig {
        save_name: "hero".into(),
        ..CacheConfig::default()
    }
    .with_save_dir(save_dir(root))
    .with_slot_capacity(slots)
    .with_seed(42)
}

pub fn open_cache(root: &Path, slots: usize) -> FloorCache {
    open_hall_cache(test_config(root, slots), 40)
}

pub fn open_hall_cache(config: CacheConfig, size: i32) -> FloorCache {
    FloorCache::open(
        config,
        Box::new(OpenHallGenerator { size }),
        Box::new(BincodeCodec),
        false,
    )
    .expect("cache should open")
}

/// Stand the player on the first connector of `kind`.
pub fn step_onto(cache: &mut FloorCache, kind: ConnectorKind) -> bool {
    let site = cache.level().connectors_of(kind).first().copied();
    match site {
        Some(site) => {
            cache.level_mut().player = site.pos;
            true
        }
        None => false,
    }
}

/// Take the down staircase.
pub fn descend(cache: &mut FloorCache) -> TransitionReport {
    step_onto(cache, ConnectorKind::Descending);
    cache.request_transition(TransitionMode::STAIRS_DOWN)
}

/// Take the up staircase.
pub fn ascend(cache: &mut FloorCache) -> TransitionReport {
    step_onto(cache, ConnectorKind::Ascending);
    cache.request_transition(TransitionMode::STAIRS_UP)
}

/// Names of every pet on the current level.
pub fn pet_names(cache: &FloorCache) -> Vec<String> {
    let mut names: Vec<String> = cache
        .level()
        .world
        .query::<(&Pet, &Creature)>()
        .iter()
        .map(|(_, (_, c))| c.name.clone())
        .collect();
    names.sort();
    names
}
