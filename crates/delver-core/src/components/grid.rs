//! Level grid: terrain and connectors.

use delver_logic::ids::FloorId;
use delver_logic::stairs::ConnectorKind;
use serde::{Deserialize, Serialize};

/// Base terrain of one grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    /// Outer boundary, never passable.
    PermanentWall,
    Wall,
    Floor,
}

/// A staircase, shaft or entrance on a floor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub kind: ConnectorKind,
    /// Shafts skip one extra level.
    pub shaft: bool,
    /// Floor this connector was last used to reach (`NONE` if never).
    pub destination: FloorId,
}

impl Connector {
    pub fn new(kind: ConnectorKind) -> Self {
        Self {
            kind,
            shaft: false,
            destination: FloorId::NONE,
        }
    }

    pub fn shaft(kind: ConnectorKind) -> Self {
        Self {
            shaft: true,
            ..Self::new(kind)
        }
    }

    pub fn leading_to(mut self, destination: FloorId) -> Self {
        self.destination = destination;
        self
    }
}

/// One grid of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: Terrain,
    pub connector: Option<Connector>,
}

impl Tile {
    pub const WALL: Tile = Tile {
        terrain: Terrain::Wall,
        connector: None,
    };
    pub const PERMANENT_WALL: Tile = Tile {
        terrain: Terrain::PermanentWall,
        connector: None,
    };
    pub const FLOOR: Tile = Tile {
        terrain: Terrain::Floor,
        connector: None,
    };

    pub fn is_passable(&self) -> bool {
        self.terrain == Terrain::Floor
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::WALL
    }
}
