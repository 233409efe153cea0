//! `Level`: one floor's grid, player position and entities.

use delver_logic::geometry::Pos;
use delver_logic::stairs::{ConnectorKind, ConnectorSite};
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::Rng;

use super::creatures::{Creature, GridPos, Health, Pet, Ridden, Status};
use super::grid::{Connector, Tile};

/// Widest or tallest level `Level::new` will build.
pub const MAX_LEVEL_SIDE: i32 = 1024;

/// Number of tiles in a `width` x `height` grid, or `None` when either side
/// is not positive or the product does not fit.
fn tile_count(width: i32, height: i32) -> Option<usize> {
    if width <= 0 || height <= 0 {
        return None;
    }
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)
}

/// The live content of one floor.
///
/// To the floor cache a level is opaque content handed between the
/// generation and serializer collaborators; the helpers here are what
/// migration and connector resolution need to read and place things.
pub struct Level {
    pub depth: i32,
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
    /// Where the player stands.
    pub player: Pos,
    /// All entities (creatures, items) on this level.
    pub world: World,
}

impl Level {
    /// A solid level: permanent walls on the border, rock inside. Each side
    /// is clamped to `3..=MAX_LEVEL_SIDE`.
    pub fn new(depth: i32, width: i32, height: i32) -> Self {
        let width = width.clamp(3, MAX_LEVEL_SIDE);
        let height = height.clamp(3, MAX_LEVEL_SIDE);
        let count = tile_count(width, height).unwrap_or_default();
        let mut level = Self {
            depth,
            width,
            height,
            tiles: vec![Tile::WALL; count],
            player: Pos::new(width / 2, height / 2),
            world: World::new(),
        };
        for x in 0..width {
            level.set_tile(Pos::new(x, 0), Tile::PERMANENT_WALL);
            level.set_tile(Pos::new(x, height - 1), Tile::PERMANENT_WALL);
        }
        for y in 0..height {
            level.set_tile(Pos::new(0, y), Tile::PERMANENT_WALL);
            level.set_tile(Pos::new(width - 1, y), Tile::PERMANENT_WALL);
        }
        level
    }

    /// Rebuild from raw parts. Returns `None` when the dimensions overflow
    /// or the tile count does not match them.
    pub fn from_parts(depth: i32, width: i32, height: i32, tiles: Vec<Tile>, player: Pos) -> Option<Self> {
        if tiles.len() != tile_count(width, height)? {
            return None;
        }
        Some(Self {
            depth,
            width,
            height,
            tiles,
            player,
            world: World::new(),
        })
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: Pos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: Pos) -> Option<&mut Tile> {
        let i = self.index(pos)?;
        Some(&mut self.tiles[i])
    }

    pub fn set_tile(&mut self, pos: Pos, tile: Tile) {
        if let Some(t) = self.tile_mut(pos) {
            *t = tile;
        }
    }

    /// Carve an open rectangle (inclusive corners), never touching the border.
    pub fn carve_room(&mut self, min: Pos, max: Pos) {
        for y in min.y.max(1)..=max.y.min(self.height - 2) {
            for x in min.x.max(1)..=max.x.min(self.width - 2) {
                self.set_tile(Pos::new(x, y), Tile::FLOOR);
            }
        }
    }

    pub fn is_passable(&self, pos: Pos) -> bool {
        self.tile(pos).map(Tile::is_passable).unwrap_or(false)
    }

    pub fn connector(&self, pos: Pos) -> Option<Connector> {
        self.tile(pos).and_then(|t| t.connector)
    }

    /// Put a connector on a floor grid (no-op on walls).
    pub fn place_connector(&mut self, pos: Pos, connector: Connector) -> bool {
        match self.tile_mut(pos) {
            Some(tile) if tile.is_passable() => {
                tile.connector = Some(connector);
                true
            }
            _ => false,
        }
    }

    pub fn remove_connector(&mut self, pos: Pos) -> Option<Connector> {
        self.tile_mut(pos).and_then(|t| t.connector.take())
    }

    /// All connectors of `kind`, in row-major order.
    pub fn connectors_of(&self, kind: ConnectorKind) -> Vec<ConnectorSite> {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, tile)| {
                let connector = tile.connector?;
                (connector.kind == kind).then(|| ConnectorSite {
                    pos: Pos::new(i as i32 % self.width, i as i32 / self.width),
                    destination: connector.destination,
                })
            })
            .collect()
    }

    /// A creature (not an item) stands on `pos`.
    pub fn creature_at(&self, pos: Pos) -> Option<Entity> {
        self.world
            .query::<(&Creature, &GridPos)>()
            .iter()
            .find(|(_, (_, at))| at.0 == pos)
            .map(|(entity, _)| entity)
    }

    /// Passable, not the player's grid, and no creature on it.
    pub fn can_occupy(&self, pos: Pos) -> bool {
        self.is_passable(pos) && pos != self.player && self.creature_at(pos).is_none()
    }

    /// A random grid a creature could stand on, without a connector.
    pub fn random_open_spot(&self, rng: &mut StdRng) -> Option<Pos> {
        let open: Vec<Pos> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Pos::new(x, y)))
            .filter(|&p| self.connector(p).is_none() && self.can_occupy(p))
            .collect();
        if open.is_empty() {
            None
        } else {
            Some(open[rng.gen_range(0..open.len())])
        }
    }

    pub fn spawn_creature(&mut self, creature: Creature, pos: Pos, max_hp: i32) -> Entity {
        self.world
            .spawn((creature, GridPos(pos), Health::full(max_hp), Status::default()))
    }

    pub fn spawn_pet(&mut self, creature: Creature, pos: Pos, max_hp: i32) -> Entity {
        let entity = self.spawn_creature(creature, pos, max_hp);
        let _ = self.world.insert_one(entity, Pet);
        entity
    }

    /// The creature the player is riding, if any.
    pub fn mount(&self) -> Option<Entity> {
        self.world
            .query::<&Ridden>()
            .iter()
            .map(|(entity, _)| entity)
            .next()
    }

    pub fn pet_count(&self) -> usize {
        self.world.query::<&Pet>().iter().count()
    }

    pub fn creature_count(&self) -> usize {
        self.world.query::<&Creature>().iter().count()
    }
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("depth", &self.depth)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("player", &self.player)
            .field("entities", &self.world.len())
            .finish()
    }
}
