//! One-of-a-kind bookkeeping and absence recovery for restored floors.

use std::collections::HashMap;

use delver_logic::ids::FloorId;
use hecs::Entity;
use log::debug;

use crate::components::*;

/// Home floor of each unique creature and artifact.
pub type UniqueHomes = HashMap<UniqueKey, FloorId>;

fn one_of_a_kind(level: &Level) -> Vec<(Entity, UniqueKey)> {
    let mut found: Vec<(Entity, UniqueKey)> = level
        .world
        .query::<&Unique>()
        .iter()
        .map(|(entity, unique)| (entity, UniqueKey::Creature(unique.0)))
        .collect();
    found.extend(
        level
            .world
            .query::<&Artifact>()
            .iter()
            .map(|(entity, artifact)| (entity, UniqueKey::Artifact(artifact.0))),
    );
    found
}

/// Remove uniques and artifacts whose home is another floor.
///
/// Returns how many entities were removed.
pub fn reconcile_uniques(level: &mut Level, floor_id: FloorId, homes: &UniqueHomes) -> usize {
    let strays: Vec<Entity> = one_of_a_kind(level)
        .into_iter()
        .filter(|(_, key)| matches!(homes.get(key), Some(&home) if home != floor_id))
        .map(|(entity, _)| entity)
        .collect();
    for &entity in &strays {
        let _ = level.world.despawn(entity);
    }
    if !strays.is_empty() {
        debug!("Removed {} one-of-a-kind entities homed elsewhere from {}", strays.len(), floor_id);
    }
    strays.len()
}

/// Record `floor_id` as the home of every unique and artifact on `level`.
///
/// Uncached floors (`NONE`) claim nothing.
pub fn claim_uniques(level: &Level, floor_id: FloorId, homes: &mut UniqueHomes) -> usize {
    if floor_id.is_none() {
        return 0;
    }
    let keys = one_of_a_kind(level);
    for (_, key) in &keys {
        homes.insert(*key, floor_id);
    }
    keys.len()
}

/// Creatures that were left alone for `elapsed` turns have recovered.
pub fn recover_after_absence(level: &mut Level, elapsed: u64) -> usize {
    if elapsed == 0 {
        return 0;
    }
    let mut recovered = 0;
    for (_, (health, status, pet)) in level
        .world
        .query_mut::<(&mut Health, Option<&mut Status>, Option<&Pet>)>()
    {
        if pet.is_some() {
            continue;
        }
        health.hp = health.max_hp;
        if let Some(status) = status {
            status.confused = 0;
            status.stunned = 0;
        }
        recovered += 1;
    }
    recovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_logic::geometry::Pos;

    fn level_with_unique() -> Level {
        let mut level = Level::new(3, 10, 10);
        level.carve_room(Pos::new(1, 1), Pos::new(8, 8));
        let grip = level.spawn_creature(Creature::new(1001, "Grip"), Pos::new(2, 2), 30);
        let _ = level.world.insert_one(grip, Unique(1001));
        level.world.spawn((
            Item {
                kind: 101,
                name: "Phial".into(),
            },
            Artifact(1),
            GridPos(Pos::new(3, 3)),
        ));
        level
    }

    #[test]
    fn test_claim_then_reconcile_elsewhere() {
        let mut homes = UniqueHomes::new();
        let level = level_with_unique();
        assert_eq!(claim_uniques(&level, FloorId(2), &mut homes), 2);
        assert_eq!(homes.get(&UniqueKey::Creature(1001)), Some(&FloorId(2)));

        let mut stale = level_with_unique();
        assert_eq!(reconcile_uniques(&mut stale, FloorId(5), &homes), 2);
        assert_eq!(stale.world.len(), 0);
    }

    #[test]
    fn test_reconcile_keeps_own_and_unclaimed() {
        let mut homes = UniqueHomes::new();
        homes.insert(UniqueKey::Creature(1001), FloorId(5));
        let mut level = level_with_unique();
        assert_eq!(reconcile_uniques(&mut level, FloorId(5), &homes), 0);
        assert_eq!(level.world.len(), 2);
    }

    #[test]
    fn test_uncached_floor_claims_nothing() {
        let mut homes = UniqueHomes::new();
        assert_eq!(claim_uniques(&level_with_unique(), FloorId::NONE, &mut homes), 0);
        assert!(homes.is_empty());
    }

    #[test]
    fn test_absence_heals_non_pets() {
        let mut level = Level::new(1, 10, 10);
        level.carve_room(Pos::new(1, 1), Pos::new(8, 8));
        let orc = level.spawn_creature(Creature::new(5, "orc"), Pos::new(2, 2), 20);
        let dog = level.spawn_pet(Creature::new(1, "dog"), Pos::new(3, 3), 20);
        for entity in [orc, dog] {
            let mut health = level.world.get::<&mut Health>(entity).expect("health");
            health.hp = 4;
        }
        {
            let mut status = level.world.get::<&mut Status>(orc).expect("status");
            status.confused = 9;
            status.asleep = 9;
        }

        assert_eq!(recover_after_absence(&mut level, 0), 0);
        assert_eq!(recover_after_absence(&mut level, 50), 1);

        assert_eq!(level.world.get::<&Health>(orc).expect("health").hp, 20);
        assert_eq!(level.world.get::<&Health>(dog).expect("health").hp, 4);
        let status = *level.world.get::<&Status>(orc).expect("status");
        assert_eq!(status.confused, 0);
        assert_eq!(status.asleep, 9);
    }
}
