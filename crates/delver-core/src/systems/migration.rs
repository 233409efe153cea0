//! Entity migration - carries the player's companions across a floor change.
//!
//! Companions are captured into plain [`EntityRecord`]s and despawned from
//! the departing level, so the roster outlives that level even if it is
//! discarded. Which companions travel is decided by
//! [`delver_logic::party::select_party`].

use delver_logic::geometry::Pos;
use delver_logic::party::{select_party, Candidate, MountCandidate};
use hecs::Entity;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::Rng;

use crate::components::*;
use crate::persistence::EntityRecord;

/// One captured companion.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub record: EntityRecord,
    pub is_mount: bool,
}

/// Companions in transit, mount first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_mount(&self) -> bool {
        self.entries.first().map(|e| e.is_mount).unwrap_or(false)
    }
}

/// Outcome of [`snapshot`].
#[derive(Debug, Clone, Default)]
pub struct Departure {
    pub roster: Roster,
    /// Pets that stay on the departing level, a dismounted mount included.
    pub left_behind: usize,
    /// Name of a subordinate mount the player had to get off.
    pub dismounted: Option<String>,
}

/// Outcome of [`place`].
#[derive(Debug, Clone, Default)]
pub struct Arrival {
    pub placed: usize,
    /// Names of companions that found no room.
    pub lost: Vec<String>,
}

fn is_subordinate(level: &Level, entity: Entity) -> bool {
    level
        .world
        .entity(entity)
        .map(|e| e.has::<Subordinate>())
        .unwrap_or(false)
}

/// Capture and remove the travelling companions from `level`.
///
/// With `mount_only` set (bounded encounters) nothing but the mount goes.
pub fn snapshot(level: &mut Level, capacity: usize, mount_only: bool) -> Departure {
    let player = level.player;
    let mount = level.mount();

    let mut pets: Vec<Entity> = Vec::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    for (entity, (_, at, status, subordinate)) in level
        .world
        .query::<(&Pet, &GridPos, Option<&Status>, Option<&Subordinate>)>()
        .iter()
    {
        if Some(entity) == mount {
            continue;
        }
        let status = status.copied().unwrap_or_default();
        pets.push(entity);
        candidates.push(Candidate {
            distance: player.distance(&at.0),
            confused: status.is_confused(),
            stunned: status.is_stunned(),
            asleep: status.is_asleep(),
            subordinate: subordinate.is_some(),
        });
    }

    let plan = select_party(
        mount.map(|m| MountCandidate {
            subordinate: is_subordinate(level, m),
        }),
        &candidates,
        capacity,
        mount_only,
    );

    let mut departure = Departure::default();
    let mut mount_stays = mount.is_some();

    if let Some(m) = mount {
        if plan.dismount {
            let _ = level.world.remove_one::<Ridden>(m);
            departure.dismounted = level
                .world
                .get::<&Creature>(m)
                .ok()
                .map(|c| c.name.clone());
            debug!("Dismounted before leaving; mount stays behind");
        } else if plan.take_mount {
            if let Some(record) = EntityRecord::capture(&level.world, m) {
                let _ = level.world.despawn(m);
                mount_stays = false;
                departure.roster.entries.push(RosterEntry {
                    record,
                    is_mount: true,
                });
            }
        }
    }

    for &index in &plan.members {
        let entity = pets[index];
        if let Some(record) = EntityRecord::capture(&level.world, entity) {
            let _ = level.world.despawn(entity);
            departure.roster.entries.push(RosterEntry {
                record,
                is_mount: false,
            });
        }
    }

    departure.left_behind = pets.len() - plan.members.len() + usize::from(mount_stays);
    debug!(
        "Snapshot: {} travelling, {} left behind",
        departure.roster.len(),
        departure.left_behind
    );
    departure
}

/// Every grid within `radius` of `center` a creature could stand on.
fn open_grids_within(level: &Level, center: Pos, radius: i32) -> Vec<Pos> {
    let mut found = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let pos = center.offset(dx, dy);
            if center.distance(&pos) <= radius as u32 && level.can_occupy(pos) {
                found.push(pos);
            }
        }
    }
    found
}

/// Mount goes right next to the player: radius 1 first, then wider.
fn mount_spot(level: &Level, radius: i32, rng: &mut StdRng) -> Option<Pos> {
    (1..=radius).find_map(|d| {
        let open = open_grids_within(level, level.player, d);
        (!open.is_empty()).then(|| open[rng.gen_range(0..open.len())])
    })
}

/// Random scatter around the player with a growing radius.
fn scatter_spot(level: &Level, radius: i32, attempts: u32, rng: &mut StdRng) -> Option<Pos> {
    let center = level.player;
    for d in 1..=radius {
        for _ in 0..attempts {
            let pos = center.offset(rng.gen_range(-d..=d), rng.gen_range(-d..=d));
            if center.distance(&pos) <= d as u32 && level.can_occupy(pos) {
                return Some(pos);
            }
        }
    }
    None
}

/// Re-create the roster around the player on `level`.
pub fn place(level: &mut Level, roster: Roster, rng: &mut StdRng, radius: i32, attempts: u32) -> Arrival {
    let mut arrival = Arrival::default();

    for entry in roster.entries {
        let spot = if entry.is_mount {
            mount_spot(level, radius, rng)
        } else {
            scatter_spot(level, radius, attempts, rng)
        };

        match spot {
            Some(pos) => {
                let mut record = entry.record;
                record.pos = Some(GridPos(pos));
                record.spawn(&mut level.world);
                arrival.placed += 1;
            }
            None => {
                warn!("No room for {} near {:?}; it is lost", entry.record.name(), level.player);
                arrival.lost.push(entry.record.name().to_string());
            }
        }
    }

    arrival
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn open_level() -> Level {
        let mut level = Level::new(1, 30, 30);
        level.carve_room(Pos::new(1, 1), Pos::new(28, 28));
        level.player = Pos::new(15, 15);
        level
    }

    #[test]
    fn test_snapshot_takes_nearest_pets() {
        let mut level = open_level();
        for i in 0..5 {
            level.spawn_pet(Creature::new(1, format!("dog{}", i)), Pos::new(16 + i, 15), 10);
        }
        let departure = snapshot(&mut level, 3, false);
        assert_eq!(departure.roster.len(), 3);
        assert_eq!(departure.left_behind, 2);
        let names: Vec<&str> = departure.roster.entries().iter().map(|e| e.record.name()).collect();
        assert_eq!(names, vec!["dog0", "dog1", "dog2"]);
        assert_eq!(level.pet_count(), 2);
    }

    #[test]
    fn test_snapshot_ignores_hostiles_and_sleepers() {
        let mut level = open_level();
        level.spawn_creature(Creature::new(9, "orc"), Pos::new(16, 15), 10);
        let sleeper = level.spawn_pet(Creature::new(1, "cat"), Pos::new(14, 15), 5);
        let _ = level.world.insert_one(
            sleeper,
            Status {
                asleep: 5,
                ..Default::default()
            },
        );
        let departure = snapshot(&mut level, 21, false);
        assert!(departure.roster.is_empty());
        assert_eq!(departure.left_behind, 1);
        assert_eq!(level.creature_count(), 2);
    }

    #[test]
    fn test_mount_goes_first_even_when_far() {
        let mut level = open_level();
        level.spawn_pet(Creature::new(1, "dog"), Pos::new(16, 15), 10);
        let horse = level.spawn_pet(Creature::new(2, "horse"), Pos::new(25, 25), 30);
        let _ = level.world.insert_one(horse, Ridden);

        let departure = snapshot(&mut level, 1, false);
        assert!(departure.roster.has_mount());
        assert_eq!(departure.roster.len(), 1);
        assert_eq!(departure.left_behind, 1);
    }

    #[test]
    fn test_subordinate_mount_is_dismounted() {
        let mut level = open_level();
        let steed = level.spawn_pet(Creature::new(2, "nightmare"), Pos::new(16, 15), 30);
        let _ = level.world.insert_one(steed, Ridden);
        let _ = level.world.insert_one(steed, Subordinate { leader_race: 77 });

        let departure = snapshot(&mut level, 21, false);
        assert!(departure.roster.is_empty());
        assert_eq!(departure.dismounted.as_deref(), Some("nightmare"));
        assert_eq!(departure.left_behind, 1);
        assert!(level.mount().is_none());
        assert_eq!(level.creature_count(), 1);
    }

    #[test]
    fn test_mount_only_context() {
        let mut level = open_level();
        level.spawn_pet(Creature::new(1, "dog"), Pos::new(16, 15), 10);
        let horse = level.spawn_pet(Creature::new(2, "horse"), Pos::new(14, 15), 30);
        let _ = level.world.insert_one(horse, Ridden);

        let departure = snapshot(&mut level, 21, true);
        assert_eq!(departure.roster.len(), 1);
        assert!(departure.roster.has_mount());
        assert_eq!(departure.left_behind, 1);
    }

    #[test]
    fn test_place_puts_mount_adjacent() {
        let mut source = open_level();
        let horse = source.spawn_pet(Creature::new(2, "horse"), Pos::new(3, 3), 30);
        let _ = source.world.insert_one(horse, Ridden);
        let departure = snapshot(&mut source, 21, false);

        let mut target = open_level();
        target.player = Pos::new(5, 5);
        let mut rng = StdRng::seed_from_u64(42);
        let arrival = place(&mut target, departure.roster, &mut rng, 5, 1000);
        assert_eq!(arrival.placed, 1);
        let mount = target.mount().expect("mount placed");
        let at = target.world.get::<&GridPos>(mount).expect("has position").0;
        assert_eq!(target.player.distance(&at), 1);
    }

    #[test]
    fn test_place_reports_lost_companions() {
        let mut source = open_level();
        for i in 0..4 {
            source.spawn_pet(Creature::new(1, format!("rat{}", i)), Pos::new(16, 14 + i), 3);
        }
        let departure = snapshot(&mut source, 21, false);
        assert_eq!(departure.roster.len(), 4);

        // Two open grids next to the player, nothing else.
        let mut cramped = Level::new(1, 5, 3);
        cramped.carve_room(Pos::new(1, 1), Pos::new(3, 1));
        cramped.player = Pos::new(2, 1);
        let mut rng = StdRng::seed_from_u64(7);
        let arrival = place(&mut cramped, departure.roster, &mut rng, 3, 50);
        assert_eq!(arrival.placed, 2);
        assert_eq!(arrival.lost.len(), 2);
        assert_eq!(cramped.pet_count(), 2);
    }
}
