//! Creature and item components.

use delver_logic::geometry::Pos;
use serde::{Deserialize, Serialize};

/// A living entity on the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    /// Race index into the monster table (opaque here).
    pub race: u32,
    pub name: String,
}

impl Creature {
    pub fn new(race: u32, name: impl Into<String>) -> Self {
        Self {
            race,
            name: name.into(),
        }
    }
}

/// Grid an entity stands or lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos(pub Pos);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
}

impl Health {
    pub fn full(max_hp: i32) -> Self {
        Self { hp: max_hp, max_hp }
    }
}

/// Timed conditions, in turns remaining (0 = not affected).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub confused: u16,
    pub stunned: u16,
    pub asleep: u16,
}

impl Status {
    pub fn is_confused(&self) -> bool {
        self.confused > 0
    }

    pub fn is_stunned(&self) -> bool {
        self.stunned > 0
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep > 0
    }
}

/// Marker: a companion under the player's control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet;

/// Marker: the companion the player is riding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ridden;

/// Summoned by, or following, another entity rather than the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subordinate {
    /// Race of the entity this one answers to.
    pub leader_race: u32,
}

/// A one-of-a-kind creature; `0` is its race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unique(pub u32);

/// An object lying on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub kind: u32,
    pub name: String,
}

/// A one-of-a-kind treasure; `0` is its artifact index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact(pub u32);

/// Identity shared by all copies of a one-of-a-kind entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniqueKey {
    Creature(u32),
    Artifact(u32),
}
