//! Floor cache - the dungeon session that owns the registry and the live level

use std::path::PathBuf;

use delver_logic::ids::FloorId;
use delver_logic::registry::{Discarded, RegistryError, SlotRegistry};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::*;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::generation::{CavernGenerator, GenerationContext, LevelGenerator};
use crate::persistence::{BackingStore, BincodeCodec, LevelCodec};
use crate::systems::UniqueHomes;

/// The level the player is on.
///
/// A floor with no slot (the overworld, an encounter) has id `NONE`.
#[derive(Debug)]
pub struct ActiveFloor {
    pub floor_id: FloorId,
    pub level: Level,
    pub encounter: bool,
}

/// One dungeon session.
///
/// Holds the slot registry, the live level and the collaborators. All
/// floor changes go through [`FloorCache::request_transition`].
pub struct FloorCache {
    pub(crate) config: CacheConfig,
    pub(crate) registry: SlotRegistry,
    pub(crate) store: BackingStore,
    pub(crate) generator: Box<dyn LevelGenerator>,
    pub(crate) codec: Box<dyn LevelCodec>,
    pub(crate) active: ActiveFloor,
    pub(crate) unique_homes: UniqueHomes,
    /// Game turn, advanced by the caller.
    pub(crate) turn: u64,
    pub(crate) rng: StdRng,
}

impl FloorCache {
    /// Create a session standing on a fresh overworld.
    ///
    /// Does not touch the filesystem; call [`FloorCache::initialize`] (or
    /// use [`FloorCache::open`]) before the first transition.
    pub fn new(
        config: CacheConfig,
        mut generator: Box<dyn LevelGenerator>,
        codec: Box<dyn LevelCodec>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let overworld = GenerationContext {
            depth: 0,
            floor_id: FloorId::NONE,
            encounter: false,
        };
        let level = generator.generate(&overworld, &mut rng);

        Ok(Self {
            registry: SlotRegistry::new(config.slot_capacity),
            store: BackingStore::new(&config.save_dir, config.save_name.clone()),
            generator,
            codec,
            active: ActiveFloor {
                floor_id: FloorId::NONE,
                level,
                encounter: false,
            },
            unique_homes: UniqueHomes::new(),
            turn: 0,
            rng,
            config,
        })
    }

    /// `new` followed by `initialize`.
    pub fn open(
        config: CacheConfig,
        generator: Box<dyn LevelGenerator>,
        codec: Box<dyn LevelCodec>,
        force_cleanup: bool,
    ) -> Result<Self, CacheError> {
        let mut cache = Self::new(config, generator, codec)?;
        cache.initialize(force_cleanup)?;
        Ok(cache)
    }

    /// Open with the default cavern generator and bincode codec.
    pub fn with_defaults(config: CacheConfig, force_cleanup: bool) -> Result<Self, CacheError> {
        Self::open(
            config,
            Box::new(CavernGenerator::default()),
            Box::new(BincodeCodec),
            force_cleanup,
        )
    }

    /// Claim the backing paths of every slot.
    ///
    /// Fails with [`CacheError::StaleBackingFile`] if a file from another
    /// run is present and `force_cleanup` is not set. Returns how many stale
    /// files were deleted.
    pub fn initialize(&mut self, force_cleanup: bool) -> Result<usize, CacheError> {
        let removed = self.store.claim(self.registry.capacity(), force_cleanup)?;
        info!(
            "Floor cache ready: {} slots in {} (sign {}, {} stale files removed)",
            self.registry.capacity(),
            self.store.dir().display(),
            self.store.process_sign(),
            removed
        );
        Ok(removed)
    }

    /// Remove the backing files of every slot but the current one.
    ///
    /// The registry is left alone: a later visit to one of those floors
    /// finds no file and falls back to a dead end.
    pub fn shutdown(&mut self) -> usize {
        let current = self.active.floor_id;
        let mut removed = 0;
        for slot in self.registry.live_slots().filter(|s| s.floor_id != current) {
            self.store.remove(slot.backing_path_id);
            removed += 1;
        }
        info!("Floor cache shut down; released {} slot files", removed);
        removed
    }

    pub(crate) fn drop_backing(&mut self, discarded: &[Discarded]) {
        for gone in discarded {
            debug!("Freed slot {} ({})", gone.backing_path_id, gone.floor_id);
            self.store.remove(gone.backing_path_id);
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn active(&self) -> &ActiveFloor {
        &self.active
    }

    pub fn current_floor(&self) -> FloorId {
        self.active.floor_id
    }

    pub fn depth(&self) -> i32 {
        self.active.level.depth
    }

    pub fn level(&self) -> &Level {
        &self.active.level
    }

    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.active.level
    }

    pub fn in_encounter(&self) -> bool {
        self.active.encounter
    }

    /// Backing file of a live slot.
    pub fn backing_path(&self, floor_id: FloorId) -> Option<PathBuf> {
        self.registry
            .find_slot(floor_id)
            .map(|slot| self.store.path_for(slot.backing_path_id))
    }

    pub fn unique_home(&self, key: UniqueKey) -> Option<FloorId> {
        self.unique_homes.get(&key).copied()
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn advance_turns(&mut self, turns: u64) {
        self.turn += turns;
    }

    /// Check the registry invariants against the current floor.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.registry.validate(self.active.floor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> CacheConfig {
        CacheConfig::default().with_save_dir(dir).with_seed(42)
    }

    #[test]
    fn test_starts_on_overworld() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FloorCache::with_defaults(config(dir.path()), false).expect("open");
        assert_eq!(cache.current_floor(), FloorId::NONE);
        assert_eq!(cache.depth(), 0);
        assert_eq!(cache.registry().live_count(), 0);
        assert!(cache.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = FloorCache::with_defaults(config(dir.path()).with_slot_capacity(1), false);
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_turns_advance() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = FloorCache::with_defaults(config(dir.path()), false).expect("open");
        cache.advance_turns(10);
        cache.advance_turns(5);
        assert_eq!(cache.turn(), 15);
    }
}
