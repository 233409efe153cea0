//! Transition controller - `leave` then `enter`.
//!
//! A transition is driven by one [`TransitionMode`] value passed through
//! both halves. The controller may add `NO_RETURN` or `RANDOM_PLACE` while
//! the transition runs (persist failure, missing connector, dead end); it
//! never removes a flag. Every failure ends in a defined state: the
//! departing slot discarded, or the player standing in a dead-end room.

use delver_logic::ids::FloorId;
use delver_logic::mode::{Direction, TransitionMode};
use delver_logic::registry::{Allocation, SlotContent};
use delver_logic::stairs::Resolution;
use log::{debug, info, warn};

use crate::components::Level;
use crate::engine::{ActiveFloor, FloorCache};
use crate::error::{PersistError, RestoreError};
use crate::generation::{build_dead_end, GenerationContext};
use crate::systems::*;

/// How the destination level came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalKind {
    /// Built by the generator.
    Generated,
    /// Read back from its backing file.
    Restored,
    /// The backing file was unreadable; a walled room stands in.
    DeadEnd,
}

/// What happened during one transition. Informational only.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport {
    pub from: FloorId,
    pub to: FloorId,
    /// Depth of the destination.
    pub depth: i32,
    pub requested: TransitionMode,
    /// Mode after escalation.
    pub mode: TransitionMode,
    pub arrival: ArrivalKind,
    pub persist_failed: bool,
    /// Every slot was discarded on the way to the overworld.
    pub flushed: bool,
    /// Floors evicted to make room.
    pub evicted: Vec<FloorId>,
    pub pets_carried: usize,
    pub pets_left_behind: usize,
    pub pets_lost: Vec<String>,
    /// Messages for the player.
    pub notices: Vec<String>,
}

impl TransitionReport {
    fn new(from: FloorId, requested: TransitionMode) -> Self {
        Self {
            from,
            to: FloorId::NONE,
            depth: 0,
            requested,
            mode: requested,
            arrival: ArrivalKind::Generated,
            persist_failed: false,
            flushed: false,
            evicted: Vec::new(),
            pets_carried: 0,
            pets_left_behind: 0,
            pets_lost: Vec::new(),
            notices: Vec::new(),
        }
    }
}

/// State handed from `leave` to `enter`.
struct Outbound {
    mode: TransitionMode,
    /// Floor just left, whether or not its slot survived.
    origin: FloorId,
    /// Slot of the floor just left, `NONE` if it was discarded or uncached.
    from: FloorId,
    from_depth: i32,
    dest: FloorId,
    dest_depth: i32,
    encounter: bool,
    roster: Roster,
}

impl FloorCache {
    /// Move the player to another floor.
    ///
    /// Always completes; failures degrade to a no-return transition or a
    /// dead-end arrival, both recorded in the report.
    pub fn request_transition(&mut self, mode: TransitionMode) -> TransitionReport {
        let mut report = TransitionReport::new(self.active.floor_id, mode);
        let outbound = self.leave(mode, &mut report);
        self.enter(outbound, &mut report);
        info!(
            "Transition {:?}: {} -> {} (depth {}, {:?})",
            report.mode, report.from, report.to, report.depth, report.arrival
        );
        report
    }

    /// Destination the player already knows about, if still cached.
    fn known_destination(&self, mode: TransitionMode, dest_depth: i32) -> FloorId {
        if mode.contains(TransitionMode::RANDOM_CONNECT) {
            return FloorId::NONE;
        }
        let direction = mode.direction();
        let current = self.active.floor_id;
        let is_live_at_depth = |id: FloorId| {
            id != current
                && self
                    .registry
                    .find_slot(id)
                    .map(|slot| slot.dungeon_depth == dest_depth)
                    .unwrap_or(false)
        };

        let level = &self.active.level;
        let on_departure_kind = level
            .connector(level.player)
            .map(|c| c.kind == direction.departure_kind())
            .unwrap_or(false);
        let marked = departure_destination(level);
        if on_departure_kind && is_live_at_depth(marked) {
            return marked;
        }

        if !mode.contains(TransitionMode::SHAFT) && direction != Direction::Lateral {
            let edge = self.registry.neighbor(self.active.floor_id, direction);
            if is_live_at_depth(edge) {
                return edge;
            }
        }
        FloorId::NONE
    }

    fn leave(&mut self, requested: TransitionMode, report: &mut TransitionReport) -> Outbound {
        let mut mode = requested;
        let from_encounter = self.active.encounter;
        let to_encounter = mode.contains(TransitionMode::ENCOUNTER);
        if to_encounter {
            mode |= TransitionMode::NO_RETURN;
        }
        let from_depth = self.active.level.depth;
        let dest_depth = mode.apply_depth(from_depth);
        let leaving_dungeon = dest_depth == 0 && from_depth > 0;
        let dest_cacheable = dest_depth > 0 && !to_encounter;

        // Companions first, so they are not persisted with the level.
        let departure = snapshot(
            &mut self.active.level,
            self.config.roster_capacity,
            from_encounter || to_encounter,
        );
        report.pets_left_behind = departure.left_behind;
        if let Some(name) = departure.dismounted {
            report.notices.push(format!("You dismount from {}.", name));
        }

        let origin = self.active.floor_id;
        let departing_cacheable = !from_encounter && from_depth > 0;
        if departing_cacheable
            && origin.is_none()
            && !mode.contains(TransitionMode::NO_RETURN)
            && !leaving_dungeon
        {
            let alloc = self.registry.allocate_slot(FloorId::NONE, from_depth);
            self.note_allocation(alloc, report);
            self.registry.set_content(alloc.floor_id, SlotContent::Active);
            self.active.floor_id = alloc.floor_id;
        }
        let mut from = self.active.floor_id;

        let known = if dest_cacheable {
            self.known_destination(mode, dest_depth)
        } else {
            FloorId::NONE
        };

        if leaving_dungeon {
            let discarded = self.registry.discard_all();
            info!("Returning to the overworld; flushed {} floors", discarded.len());
            self.drop_backing(&discarded);
            report.flushed = true;
            from = FloorId::NONE;
        } else if mode.contains(TransitionMode::NO_RETURN) && from.is_some() {
            if let Some(gone) = self.registry.discard_one(from) {
                debug!("No return: discarding {}", from);
                self.drop_backing(&[gone]);
            }
            from = FloorId::NONE;
        }

        let dest = if !dest_cacheable {
            FloorId::NONE
        } else if known.is_some() {
            known
        } else {
            let alloc = self.registry.allocate_slot(from, dest_depth);
            self.note_allocation(alloc, report);
            alloc.floor_id
        };

        if from.is_some() {
            if !mode.contains(TransitionMode::RANDOM_CONNECT) && dest.is_some() {
                let level = &self.active.level;
                let departs_here = level
                    .connector(level.player)
                    .map(|c| c.kind == mode.direction().departure_kind())
                    .unwrap_or(false);
                if departs_here {
                    mark_departure(&mut self.active.level, dest);
                }
            }

            if let Err(e) = self.persist_active(from) {
                warn!("Could not save {}: {}; the way back is lost", from, e);
                mode |= TransitionMode::NO_RETURN;
                report.persist_failed = true;
                if let Some(gone) = self.registry.discard_one(from) {
                    self.drop_backing(&[gone]);
                }
                from = FloorId::NONE;
            }
        }

        Outbound {
            mode,
            origin,
            from,
            from_depth,
            dest,
            dest_depth,
            encounter: to_encounter,
            roster: departure.roster,
        }
    }

    fn note_allocation(&mut self, alloc: Allocation, report: &mut TransitionReport) {
        debug!(
            "Allocated {} in slot {}",
            alloc.floor_id, alloc.backing_path_id
        );
        if alloc.collides {
            warn!(
                "Floor id {} reused while still referenced (id space wrapped {} times)",
                alloc.floor_id,
                self.registry.allocator().wraps()
            );
        }
        if let Some(evicted) = alloc.evicted {
            debug!("Evicted {} from slot {}", evicted.floor_id, evicted.backing_path_id);
            self.store.remove(evicted.backing_path_id);
            report.evicted.push(evicted.floor_id);
        }
    }

    /// Write the live level into the slot of `floor_id`.
    fn persist_active(&mut self, floor_id: FloorId) -> Result<(), PersistError> {
        let backing_path_id = match self.registry.find_slot(floor_id) {
            Some(slot) => slot.backing_path_id,
            None => return Ok(()),
        };
        let payload = self.codec.encode(&self.active.level)?;
        self.store.persist(backing_path_id, floor_id, payload)?;

        let turn = self.turn;
        if let Some(slot) = self.registry.find_slot_mut(floor_id) {
            slot.content = SlotContent::Stored;
            slot.last_visit_turn = turn;
        }
        self.registry.touch(floor_id);
        Ok(())
    }

    /// Read a stored floor back; the file is gone afterwards either way.
    fn restore_stored(&mut self, floor_id: FloorId, backing_path_id: usize) -> Result<Level, RestoreError> {
        let result = self
            .store
            .restore(backing_path_id, floor_id)
            .and_then(|bytes| self.codec.decode(&bytes).map_err(RestoreError::from));
        self.store.remove(backing_path_id);
        result
    }

    fn enter(&mut self, out: Outbound, report: &mut TransitionReport) {
        let mut mode = out.mode;
        let direction = mode.direction();

        let stored = self
            .registry
            .find_slot(out.dest)
            .filter(|slot| slot.content == SlotContent::Stored)
            .map(|slot| (slot.backing_path_id, slot.last_visit_turn));

        let (mut level, restored_at) = match stored {
            Some((backing_path_id, last_visit)) => match self.restore_stored(out.dest, backing_path_id) {
                Ok(level) => (level, Some(last_visit)),
                Err(e) => {
                    warn!("Could not restore {}: {}; falling back to a dead end", out.dest, e);
                    let severed = self.registry.sever(out.dest);
                    debug!("Severed {} edges into {}", severed, out.dest);
                    report.notices.push("The way back is blocked.".to_string());
                    mode |= TransitionMode::NO_RETURN;
                    report.arrival = ArrivalKind::DeadEnd;
                    (build_dead_end(out.dest_depth), None)
                }
            },
            None => {
                let ctx = GenerationContext {
                    depth: out.dest_depth,
                    floor_id: out.dest,
                    encounter: out.encounter,
                };
                (self.generator.generate(&ctx, &mut self.rng), None)
            }
        };

        if let Some(last_visit) = restored_at {
            report.arrival = ArrivalKind::Restored;
            let removed = reconcile_uniques(&mut level, out.dest, &self.unique_homes);
            if removed > 0 {
                debug!("{} one-of-a-kind entities left {}", removed, out.dest);
            }
            recover_after_absence(&mut level, self.turn.saturating_sub(last_visit));

            if !mode.contains(TransitionMode::RANDOM_PLACE) {
                let known = if mode.contains(TransitionMode::RANDOM_CONNECT) {
                    FloorId::NONE
                } else {
                    out.origin
                };
                match arrival_site(&level, direction, known, &mut self.rng) {
                    Resolution::Fixed(pos) | Resolution::Random(pos) => level.player = pos,
                    Resolution::Unconnected => {
                        debug!("No {:?} connector on {}", direction.arrival_kind(), out.dest);
                        clear_arrival_marker(&mut level);
                        mode |= TransitionMode::NO_RETURN | TransitionMode::RANDOM_PLACE;
                    }
                }
            }
            if mode.contains(TransitionMode::NO_RETURN) && !mode.contains(TransitionMode::RANDOM_PLACE) {
                let arrival_kind = direction.arrival_kind();
                let player = level.player;
                if level.connector(player).map(|c| c.kind == arrival_kind).unwrap_or(false) {
                    level.remove_connector(player);
                    report.notices.push("The stairs behind you are blocked.".to_string());
                }
            }
        } else if report.arrival == ArrivalKind::Generated
            && !mode.intersects(TransitionMode::NO_RETURN | TransitionMode::RANDOM_PLACE)
        {
            create_return_connector(&mut level, direction, out.from);
        }

        if mode.contains(TransitionMode::RANDOM_PLACE) && report.arrival != ArrivalKind::DeadEnd {
            if let Some(spot) = level.random_open_spot(&mut self.rng) {
                level.player = spot;
            }
        }

        if out.dest.is_some() {
            let turn = self.turn;
            if let Some(slot) = self.registry.find_slot_mut(out.dest) {
                slot.content = SlotContent::Active;
                slot.last_visit_turn = turn;
            }
            self.registry.touch(out.dest);
        }

        let adjacent = (out.dest_depth - out.from_depth).abs() == 1;
        if out.from.is_some()
            && out.dest.is_some()
            && adjacent
            && direction != Direction::Lateral
            && !mode.contains(TransitionMode::NO_RETURN)
        {
            self.registry.link(out.from, direction, out.dest);
            self.registry.link(out.dest, direction.opposite(), out.from);
        }

        let placed = place(
            &mut level,
            out.roster,
            &mut self.rng,
            self.config.placement_radius,
            self.config.placement_attempts,
        );
        report.pets_carried = placed.placed;
        for name in &placed.lost {
            report.notices.push(format!("You have lost sight of {}.", name));
        }
        report.pets_lost = placed.lost;

        claim_uniques(&level, out.dest, &mut self.unique_homes);

        report.to = out.dest;
        report.depth = out.dest_depth;
        report.mode = mode;
        self.active = ActiveFloor {
            floor_id: out.dest,
            level,
            encounter: out.encounter,
        };
    }
}
