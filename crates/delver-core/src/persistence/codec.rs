//! Level serialization.
//!
//! Uses bincode for compact binary encoding of a whole level. Entity
//! components are captured individually into an [`EntityRecord`] and
//! reconstructed on decode; the same records carry companions across a
//! floor change.

use delver_logic::geometry::Pos;
use hecs::{Entity, EntityBuilder, World};
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::error::CodecError;

/// Version number for the level format (increment when it changes).
const LEVEL_VERSION: u32 = 1;

/// Serializer collaborator: turns a level into bytes and back.
///
/// Structural validation of stored content is entirely the codec's job; the
/// persistence layer treats the payload as opaque.
pub trait LevelCodec {
    fn encode(&self, level: &Level) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Level, CodecError>;
}

/// All possible components for an entity, serialized as optionals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    // Creature
    pub creature: Option<Creature>,
    pub pos: Option<GridPos>,
    pub health: Option<Health>,
    pub status: Option<Status>,

    // Allegiance
    pub pet: Option<Pet>,
    pub ridden: Option<Ridden>,
    pub subordinate: Option<Subordinate>,
    pub unique: Option<Unique>,

    // Objects
    pub item: Option<Item>,
    pub artifact: Option<Artifact>,
}

impl EntityRecord {
    /// Copy every known component of `entity`.
    pub fn capture(world: &World, entity: Entity) -> Option<Self> {
        let entity_ref = world.entity(entity).ok()?;
        let mut record = EntityRecord::default();

        if let Some(c) = entity_ref.get::<&Creature>() {
            record.creature = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&GridPos>() {
            record.pos = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Health>() {
            record.health = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Status>() {
            record.status = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Pet>() {
            record.pet = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Ridden>() {
            record.ridden = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Subordinate>() {
            record.subordinate = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Unique>() {
            record.unique = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Item>() {
            record.item = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Artifact>() {
            record.artifact = Some(*c);
        }

        Some(record)
    }

    /// Spawn an entity with all recorded components.
    pub fn spawn(self, world: &mut World) -> Entity {
        let mut builder = EntityBuilder::new();

        if let Some(c) = self.creature {
            builder.add(c);
        }
        if let Some(c) = self.pos {
            builder.add(c);
        }
        if let Some(c) = self.health {
            builder.add(c);
        }
        if let Some(c) = self.status {
            builder.add(c);
        }
        if let Some(c) = self.pet {
            builder.add(c);
        }
        if let Some(c) = self.ridden {
            builder.add(c);
        }
        if let Some(c) = self.subordinate {
            builder.add(c);
        }
        if let Some(c) = self.unique {
            builder.add(c);
        }
        if let Some(c) = self.item {
            builder.add(c);
        }
        if let Some(c) = self.artifact {
            builder.add(c);
        }

        world.spawn(builder.build())
    }

    pub fn name(&self) -> &str {
        self.creature
            .as_ref()
            .map(|c| c.name.as_str())
            .or_else(|| self.item.as_ref().map(|i| i.name.as_str()))
            .unwrap_or("something")
    }
}

/// Serializable snapshot of a whole level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub version: u32,
    pub depth: i32,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<Tile>,
    pub player: Pos,
    pub entities: Vec<EntityRecord>,
}

impl LevelRecord {
    pub fn capture(level: &Level) -> Self {
        let entities = level
            .world
            .iter()
            .filter_map(|e| EntityRecord::capture(&level.world, e.entity()))
            .collect();

        Self {
            version: LEVEL_VERSION,
            depth: level.depth,
            width: level.width,
            height: level.height,
            tiles: level.tiles().to_vec(),
            player: level.player,
            entities,
        }
    }

    /// Rebuild a level, checking the structure is sane.
    pub fn into_level(self) -> Result<Level, CodecError> {
        if self.version != LEVEL_VERSION {
            return Err(CodecError::VersionMismatch {
                expected: LEVEL_VERSION,
                found: self.version,
            });
        }
        let mut level = Level::from_parts(self.depth, self.width, self.height, self.tiles, self.player)
            .ok_or_else(|| {
                CodecError::Invalid(format!(
                    "tile count does not match {}x{}",
                    self.width, self.height
                ))
            })?;
        if !level.in_bounds(level.player) {
            return Err(CodecError::Invalid(format!(
                "player at ({}, {}) outside the level",
                level.player.x, level.player.y
            )));
        }
        for record in self.entities {
            if let Some(GridPos(pos)) = record.pos {
                if !level.in_bounds(pos) {
                    return Err(CodecError::Invalid(format!(
                        "{} at ({}, {}) outside the level",
                        record.name(),
                        pos.x,
                        pos.y
                    )));
                }
            }
            record.spawn(&mut level.world);
        }
        Ok(level)
    }
}

/// Default codec: bincode over a [`LevelRecord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl LevelCodec for BincodeCodec {
    fn encode(&self, level: &Level) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(&LevelRecord::capture(level))?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Level, CodecError> {
        let record: LevelRecord = bincode::deserialize(bytes)?;
        record.into_level()
    }
}
