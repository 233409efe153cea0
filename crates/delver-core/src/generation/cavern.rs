//! Default level generator: an open walled hall with pillars.

use delver_logic::geometry::Pos;
use delver_logic::stairs::ConnectorKind;
use rand::rngs::StdRng;
use rand::Rng;

use super::{GenerationContext, LevelGenerator};
use crate::components::*;

/// Configuration for the default generator.
#[derive(Debug, Clone)]
pub struct CavernGenerator {
    pub width: i32,
    pub height: i32,
    /// Chance per interior grid of a pillar.
    pub pillar_density: f32,
    /// Chance of a unique creature on a dungeon floor.
    pub unique_chance: f64,
    /// Chance of an artifact on a dungeon floor.
    pub artifact_chance: f64,
}

impl Default for CavernGenerator {
    fn default() -> Self {
        Self {
            width: 48,
            height: 20,
            pillar_density: 0.06,
            unique_chance: 0.125,
            artifact_chance: 0.1,
        }
    }
}

impl LevelGenerator for CavernGenerator {
    fn generate(&mut self, ctx: &GenerationContext, rng: &mut StdRng) -> Level {
        let mut level = Level::new(ctx.depth, self.width, self.height);
        level.carve_room(Pos::new(1, 1), Pos::new(self.width - 2, self.height - 2));

        for y in 2..self.height - 2 {
            for x in 2..self.width - 2 {
                if rng.gen::<f32>() < self.pillar_density {
                    level.set_tile(Pos::new(x, y), Tile::WALL);
                }
            }
        }

        if let Some(spot) = level.random_open_spot(rng) {
            level.player = spot;
        } else {
            let center = Pos::new(self.width / 2, self.height / 2);
            level.set_tile(center, Tile::FLOOR);
            level.player = center;
        }

        for kind in connector_layout(ctx, rng) {
            if let Some(spot) = level.random_open_spot(rng) {
                level.place_connector(spot, Connector::new(kind));
            }
        }

        populate(&mut level, ctx, rng, self);
        level
    }
}

/// Which connectors a floor gets.
fn connector_layout(ctx: &GenerationContext, rng: &mut StdRng) -> Vec<ConnectorKind> {
    if ctx.encounter {
        return vec![ConnectorKind::Entrance];
    }
    if ctx.is_overworld() {
        return vec![
            ConnectorKind::Descending,
            ConnectorKind::Entrance,
            ConnectorKind::Entrance,
        ];
    }
    let mut kinds = Vec::new();
    for _ in 0..rng.gen_range(1..=3) {
        kinds.push(ConnectorKind::Ascending);
    }
    for _ in 0..rng.gen_range(1..=3) {
        kinds.push(ConnectorKind::Descending);
    }
    kinds
}

fn populate(level: &mut Level, ctx: &GenerationContext, rng: &mut StdRng, config: &CavernGenerator) {
    if ctx.is_overworld() {
        return;
    }

    let hostiles = if ctx.encounter { 1 } else { 3 + ctx.depth / 2 };
    for _ in 0..hostiles {
        let Some(spot) = level.random_open_spot(rng) else {
            break;
        };
        let (race, name) = MONSTERS[rng.gen_range(0..MONSTERS.len())];
        let hp = 5 + ctx.depth * 3 + rng.gen_range(0..6);
        let entity = level.spawn_creature(Creature::new(race, name), spot, hp);
        if rng.gen_bool(0.3) {
            let _ = level.world.insert_one(
                entity,
                Status {
                    asleep: rng.gen_range(10..50),
                    ..Default::default()
                },
            );
        }
    }

    if ctx.encounter {
        return;
    }

    if rng.gen_bool(config.unique_chance) {
        if let Some(spot) = level.random_open_spot(rng) {
            let (race, name) = UNIQUES[rng.gen_range(0..UNIQUES.len())];
            let entity = level.spawn_creature(Creature::new(race, name), spot, 40 + ctx.depth * 5);
            let _ = level.world.insert_one(entity, Unique(race));
        }
    }

    if rng.gen_bool(config.artifact_chance) {
        if let Some(spot) = level.random_open_spot(rng) {
            let (index, name) = ARTIFACTS[rng.gen_range(0..ARTIFACTS.len())];
            level.world.spawn((
                Item {
                    kind: 100 + index,
                    name: name.to_string(),
                },
                Artifact(index),
                GridPos(spot),
            ));
        }
    }
}

// Sample tables - would be loaded from data files in production
static MONSTERS: &[(u32, &str)] = &[
    (1, "giant rat"),
    (2, "kobold"),
    (3, "cave spider"),
    (4, "jackal"),
    (5, "orc soldier"),
    (6, "floating eye"),
    (7, "rot grub"),
    (8, "cave bear"),
];

static UNIQUES: &[(u32, &str)] = &[
    (1001, "Grip, Farmer Maggot's Dog"),
    (1002, "Bullroarer the Hobbit"),
    (1003, "Wormtongue, Agent of Saruman"),
    (1004, "Lagduf, the Snaga"),
];

static ARTIFACTS: &[(u32, &str)] = &[
    (1, "the Phial of Galadriel"),
    (2, "the Star of Elendil"),
    (3, "the Arkenstone of Thrain"),
];
