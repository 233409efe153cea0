//! Fixed-capacity floor slot registry and its eviction policy.
//!
//! The registry is a small arena of `FloorSlot`s addressed by index. Each
//! live slot is tagged with the `FloorId` that owns it, a stable
//! `backing_path_id` (the index, never reassigned), and a `recency_mark`
//! from a strictly increasing clock. When every slot is taken, the slot with
//! the smallest mark that is not the current floor is evicted.
//!
//! The registry never touches the filesystem. Operations that free a slot
//! return a [`Discarded`] record so the caller can drop the backing file.
//!
//! Invariants kept here:
//! - at most `capacity` slots are live;
//! - recency marks of live slots are pairwise distinct;
//! - neighbor edges pointing at a discarded floor are cleared.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::INITIAL_RECENCY_MARK;
use crate::ids::{FloorId, FloorIdAllocator};
use crate::mode::Direction;

/// Where a slot's level content currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotContent {
    /// Id reserved but the level has never been built.
    Unvisited,
    /// The live in-memory level is this slot's content; nothing on disk.
    Active,
    /// Content was persisted to the backing file.
    Stored,
}

/// Metadata for one cached or active floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorSlot {
    pub floor_id: FloorId,
    pub backing_path_id: usize,
    pub dungeon_depth: i32,
    pub upper_neighbor: FloorId,
    pub lower_neighbor: FloorId,
    pub last_visit_turn: u64,
    pub recency_mark: u32,
    pub content: SlotContent,
}

impl FloorSlot {
    fn free(backing_path_id: usize) -> Self {
        Self {
            floor_id: FloorId::NONE,
            backing_path_id,
            dungeon_depth: 0,
            upper_neighbor: FloorId::NONE,
            lower_neighbor: FloorId::NONE,
            last_visit_turn: 0,
            recency_mark: 0,
            content: SlotContent::Unvisited,
        }
    }

    pub fn is_free(&self) -> bool {
        self.floor_id.is_none()
    }

    /// Neighbor edge in `direction` (always `NONE` for lateral travel).
    pub fn neighbor(&self, direction: Direction) -> FloorId {
        match direction {
            Direction::Up => self.upper_neighbor,
            Direction::Down => self.lower_neighbor,
            Direction::Lateral => FloorId::NONE,
        }
    }
}

/// A slot that was freed; the caller owns cleanup of its backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discarded {
    pub floor_id: FloorId,
    pub backing_path_id: usize,
    pub content: SlotContent,
}

/// Result of `allocate_slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub floor_id: FloorId,
    pub backing_path_id: usize,
    /// Slot that had to be evicted to make room.
    pub evicted: Option<Discarded>,
    /// The new id is still referenced by another slot or edge (only possible
    /// after the allocator wrapped). Reported, never repaired.
    pub collides: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{count} live slots exceed capacity {capacity}")]
    OverCapacity { count: usize, capacity: usize },
    #[error("recency mark {mark} shared by {first} and {second}")]
    DuplicateMark {
        mark: u32,
        first: FloorId,
        second: FloorId,
    },
    #[error("{count} slots claim the current floor {floor}")]
    CurrentAliased { floor: FloorId, count: usize },
    #[error("current floor {floor} still has stored content")]
    CurrentStored { floor: FloorId },
    #[error("{floor} is active but is not the current floor")]
    StrayActive { floor: FloorId },
}

/// The slot table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRegistry {
    slots: Vec<FloorSlot>,
    ids: FloorIdAllocator,
    clock: u32,
}

impl SlotRegistry {
    pub fn new(capacity: usize) -> Self {
        Self::with_allocator(capacity, FloorIdAllocator::new())
    }

    pub fn with_allocator(capacity: usize, ids: FloorIdAllocator) -> Self {
        Self {
            slots: (0..capacity).map(FloorSlot::free).collect(),
            ids,
            clock: INITIAL_RECENCY_MARK,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Next recency mark that will be stamped.
    pub fn clock(&self) -> u32 {
        self.clock
    }

    pub fn allocator(&self) -> &FloorIdAllocator {
        &self.ids
    }

    /// All slots, free ones included, in index order.
    pub fn slots(&self) -> &[FloorSlot] {
        &self.slots
    }

    pub fn live_slots(&self) -> impl Iterator<Item = &FloorSlot> {
        self.slots.iter().filter(|s| !s.is_free())
    }

    pub fn live_count(&self) -> usize {
        self.live_slots().count()
    }

    /// Linear lookup. `None` for the sentinel or an unknown id.
    pub fn find_slot(&self, id: FloorId) -> Option<&FloorSlot> {
        if id.is_none() {
            return None;
        }
        self.slots.iter().find(|s| s.floor_id == id)
    }

    pub fn find_slot_mut(&mut self, id: FloorId) -> Option<&mut FloorSlot> {
        if id.is_none() {
            return None;
        }
        self.slots.iter_mut().find(|s| s.floor_id == id)
    }

    pub fn contains(&self, id: FloorId) -> bool {
        self.find_slot(id).is_some()
    }

    fn tick(&mut self) -> u32 {
        let mark = self.clock;
        self.clock += 1;
        mark
    }

    /// The slot `allocate_slot` would evict: smallest mark among live slots
    /// other than `current`, lowest index on a tie.
    pub fn eviction_candidate(&self, current: FloorId) -> Option<&FloorSlot> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_free() && (current.is_none() || s.floor_id != current))
            .min_by_key(|(idx, s)| (s.recency_mark, *idx))
            .map(|(_, s)| s)
    }

    /// Claim a slot for a new floor at `dungeon_depth`.
    ///
    /// Uses a free slot when there is one; otherwise evicts the least
    /// recently current slot other than `current_floor`. The new slot gets a
    /// fresh id, cleared edges, `Unvisited` content and the next mark.
    ///
    /// # Panics
    ///
    /// Panics if every slot belongs to `current_floor`, which cannot happen
    /// with a capacity of two or more.
    pub fn allocate_slot(&mut self, current_floor: FloorId, dungeon_depth: i32) -> Allocation {
        let index = match self.slots.iter().position(FloorSlot::is_free) {
            Some(index) => index,
            None => self
                .eviction_candidate(current_floor)
                .map(|s| s.backing_path_id)
                .unwrap_or_else(|| {
                    panic!(
                        "no evictable floor slot (capacity {}, current {current_floor})",
                        self.slots.len()
                    )
                }),
        };

        let evicted = if self.slots[index].is_free() {
            None
        } else {
            let victim = self.slots[index].floor_id;
            self.discard_one(victim)
        };

        let floor_id = self.ids.next_id();
        let collides = self.is_referenced(floor_id);
        let mark = self.tick();
        let slot = &mut self.slots[index];
        *slot = FloorSlot::free(index);
        slot.floor_id = floor_id;
        slot.dungeon_depth = dungeon_depth;
        slot.recency_mark = mark;

        Allocation {
            floor_id,
            backing_path_id: index,
            evicted,
            collides,
        }
    }

    fn is_referenced(&self, id: FloorId) -> bool {
        self.slots.iter().any(|s| {
            !s.is_free() && (s.floor_id == id || s.upper_neighbor == id || s.lower_neighbor == id)
        })
    }

    /// Re-stamp the recency mark of `id`. Returns false for an unknown id.
    pub fn touch(&mut self, id: FloorId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mark = self.tick();
        self.slots[index].recency_mark = mark;
        true
    }

    fn index_of(&self, id: FloorId) -> Option<usize> {
        if id.is_none() {
            return None;
        }
        self.slots.iter().position(|s| s.floor_id == id)
    }

    pub fn set_content(&mut self, id: FloorId, content: SlotContent) {
        if let Some(slot) = self.find_slot_mut(id) {
            slot.content = content;
        }
    }

    /// Record that `from`'s edge in `direction` leads to `to`.
    pub fn link(&mut self, from: FloorId, direction: Direction, to: FloorId) {
        if let Some(slot) = self.find_slot_mut(from) {
            match direction {
                Direction::Up => slot.upper_neighbor = to,
                Direction::Down => slot.lower_neighbor = to,
                Direction::Lateral => {}
            }
        }
    }

    /// Live neighbor of `id` in `direction`, or `NONE` if unknown or gone.
    pub fn neighbor(&self, id: FloorId, direction: Direction) -> FloorId {
        let target = self
            .find_slot(id)
            .map(|s| s.neighbor(direction))
            .unwrap_or(FloorId::NONE);
        if self.contains(target) {
            target
        } else {
            FloorId::NONE
        }
    }

    /// Clear every edge that points at `id`. Returns how many were cleared.
    pub fn sever(&mut self, id: FloorId) -> usize {
        if id.is_none() {
            return 0;
        }
        let mut cleared = 0;
        for slot in self.slots.iter_mut().filter(|s| !s.is_free()) {
            if slot.upper_neighbor == id {
                slot.upper_neighbor = FloorId::NONE;
                cleared += 1;
            }
            if slot.lower_neighbor == id {
                slot.lower_neighbor = FloorId::NONE;
                cleared += 1;
            }
        }
        cleared
    }

    /// Reset one slot to free and clear edges pointing at it.
    pub fn discard_one(&mut self, id: FloorId) -> Option<Discarded> {
        let index = self.index_of(id)?;
        let slot = &self.slots[index];
        let discarded = Discarded {
            floor_id: slot.floor_id,
            backing_path_id: slot.backing_path_id,
            content: slot.content,
        };
        self.slots[index] = FloorSlot::free(index);
        self.sever(id);
        Some(discarded)
    }

    /// Free every slot and reset the recency clock.
    pub fn discard_all(&mut self) -> Vec<Discarded> {
        let discarded = self
            .slots
            .iter()
            .filter(|s| !s.is_free())
            .map(|s| Discarded {
                floor_id: s.floor_id,
                backing_path_id: s.backing_path_id,
                content: s.content,
            })
            .collect();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = FloorSlot::free(index);
        }
        self.clock = INITIAL_RECENCY_MARK;
        discarded
    }

    /// Check capacity, unique marks and the current-slot invariant.
    pub fn validate(&self, current: FloorId) -> Result<(), RegistryError> {
        let live: Vec<&FloorSlot> = self.live_slots().collect();
        if live.len() > self.capacity() {
            return Err(RegistryError::OverCapacity {
                count: live.len(),
                capacity: self.capacity(),
            });
        }

        for (i, a) in live.iter().enumerate() {
            if let Some(b) = live[i + 1..].iter().find(|b| b.recency_mark == a.recency_mark) {
                return Err(RegistryError::DuplicateMark {
                    mark: a.recency_mark,
                    first: a.floor_id,
                    second: b.floor_id,
                });
            }
        }

        if current.is_some() {
            let owners: Vec<&&FloorSlot> = live.iter().filter(|s| s.floor_id == current).collect();
            if owners.len() > 1 {
                return Err(RegistryError::CurrentAliased {
                    floor: current,
                    count: owners.len(),
                });
            }
            if owners.iter().any(|s| s.content == SlotContent::Stored) {
                return Err(RegistryError::CurrentStored { floor: current });
            }
        }

        if let Some(stray) = live
            .iter()
            .find(|s| s.content == SlotContent::Active && s.floor_id != current)
        {
            return Err(RegistryError::StrayActive {
                floor: stray.floor_id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize) -> (SlotRegistry, Vec<FloorId>) {
        let mut reg = SlotRegistry::new(capacity);
        let ids = (0..capacity)
            .map(|depth| reg.allocate_slot(FloorId::NONE, depth as i32 + 1).floor_id)
            .collect();
        (reg, ids)
    }

    #[test]
    fn test_find_slot_sentinel_and_unknown() {
        let (reg, ids) = filled(3);
        assert!(reg.find_slot(FloorId::NONE).is_none());
        assert!(reg.find_slot(FloorId(99)).is_none());
        assert_eq!(reg.find_slot(ids[1]).map(|s| s.dungeon_depth), Some(2));
    }

    #[test]
    fn test_allocate_uses_free_slots_first() {
        let (reg, ids) = filled(4);
        assert_eq!(reg.live_count(), 4);
        assert_eq!(ids, vec![FloorId(1), FloorId(2), FloorId(3), FloorId(4)]);
        for (i, slot) in reg.slots().iter().enumerate() {
            assert_eq!(slot.backing_path_id, i);
        }
    }

    #[test]
    fn test_evicts_oldest_non_current() {
        let (mut reg, ids) = filled(3);
        // The oldest slot is the current floor, so the next oldest goes.
        let alloc = reg.allocate_slot(ids[0], 9);
        let evicted = alloc.evicted.expect("full registry must evict");
        assert_eq!(evicted.floor_id, ids[1]);
        assert!(reg.contains(ids[0]));
        assert!(!reg.contains(ids[1]));
        assert_eq!(alloc.backing_path_id, evicted.backing_path_id);
        assert_eq!(reg.live_count(), 3);
    }

    #[test]
    fn test_touch_protects_from_eviction() {
        let (mut reg, ids) = filled(3);
        assert!(reg.touch(ids[0]));
        let alloc = reg.allocate_slot(FloorId::NONE, 5);
        assert_eq!(alloc.evicted.map(|d| d.floor_id), Some(ids[1]));
    }

    #[test]
    fn test_tie_breaks_on_lowest_index() {
        let (mut reg, ids) = filled(3);
        for slot in reg.slots.iter_mut() {
            slot.recency_mark = 7;
        }
        assert_eq!(reg.eviction_candidate(FloorId::NONE).map(|s| s.floor_id), Some(ids[0]));
        assert_eq!(reg.eviction_candidate(ids[0]).map(|s| s.floor_id), Some(ids[1]));
    }

    #[test]
    fn test_discard_clears_edges() {
        let (mut reg, ids) = filled(3);
        reg.link(ids[0], Direction::Down, ids[1]);
        reg.link(ids[1], Direction::Up, ids[0]);
        reg.link(ids[2], Direction::Up, ids[1]);

        let gone = reg.discard_one(ids[1]).expect("slot exists");
        assert_eq!(gone.floor_id, ids[1]);
        assert_eq!(reg.find_slot(ids[0]).map(|s| s.lower_neighbor), Some(FloorId::NONE));
        assert_eq!(reg.find_slot(ids[2]).map(|s| s.upper_neighbor), Some(FloorId::NONE));
        assert!(reg.discard_one(ids[1]).is_none());
    }

    #[test]
    fn test_neighbor_ignores_dead_edges() {
        let (mut reg, ids) = filled(2);
        reg.link(ids[0], Direction::Down, FloorId(40));
        assert_eq!(reg.neighbor(ids[0], Direction::Down), FloorId::NONE);
        reg.link(ids[0], Direction::Down, ids[1]);
        assert_eq!(reg.neighbor(ids[0], Direction::Down), ids[1]);
        assert_eq!(reg.neighbor(ids[0], Direction::Lateral), FloorId::NONE);
    }

    #[test]
    fn test_discard_all_resets_clock() {
        let (mut reg, _) = filled(5);
        assert!(reg.clock() > INITIAL_RECENCY_MARK);
        let gone = reg.discard_all();
        assert_eq!(gone.len(), 5);
        assert_eq!(reg.live_count(), 0);
        assert_eq!(reg.clock(), INITIAL_RECENCY_MARK);
        // Ids keep counting after a flush.
        assert_eq!(reg.allocate_slot(FloorId::NONE, 1).floor_id, FloorId(6));
    }

    #[test]
    fn test_collision_reported_after_wrap() {
        let mut reg = SlotRegistry::with_allocator(3, FloorIdAllocator::starting_at(u16::MAX));
        let last = reg.allocate_slot(FloorId::NONE, 1);
        assert_eq!(last.floor_id, FloorId(u16::MAX));
        assert!(!last.collides);
        let wrapped = reg.allocate_slot(FloorId::NONE, 2);
        assert_eq!(wrapped.floor_id, FloorId(1));
        assert!(!wrapped.collides);
        reg.link(last.floor_id, Direction::Down, FloorId(2));
        let third = reg.allocate_slot(FloorId::NONE, 3);
        assert_eq!(third.floor_id, FloorId(2));
        assert!(third.collides);
    }

    #[test]
    fn test_validate_catches_stored_current() {
        let (mut reg, ids) = filled(2);
        reg.set_content(ids[0], SlotContent::Active);
        assert!(reg.validate(ids[0]).is_ok());
        assert_eq!(
            reg.validate(ids[1]),
            Err(RegistryError::StrayActive { floor: ids[0] })
        );
        reg.set_content(ids[0], SlotContent::Stored);
        assert_eq!(
            reg.validate(ids[0]),
            Err(RegistryError::CurrentStored { floor: ids[0] })
        );
    }

    #[test]
    #[should_panic(expected = "no evictable floor slot")]
    fn test_single_slot_cannot_evict_current() {
        let mut reg = SlotRegistry::new(1);
        let only = reg.allocate_slot(FloorId::NONE, 1).floor_id;
        reg.allocate_slot(only, 2);
    }
}
