//! Property tests for the slot registry.
//!
//! Drives arbitrary sequences of allocate / touch / discard operations and
//! checks capacity, mark uniqueness and the eviction choice after each step.

use delver_logic::ids::FloorId;
use delver_logic::mode::Direction;
use delver_logic::registry::{SlotContent, SlotRegistry};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    /// Allocate a floor and make it current.
    Descend,
    /// Re-enter an existing floor (index modulo live count).
    Revisit(usize),
    /// Discard a non-current floor.
    Burn(usize),
    /// Leave the dungeon.
    Flush,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => Just(Op::Descend),
        3 => any::<usize>().prop_map(Op::Revisit),
        1 => any::<usize>().prop_map(Op::Burn),
        1 => Just(Op::Flush),
    ]
}

fn live_ids(reg: &SlotRegistry) -> Vec<FloorId> {
    reg.live_slots().map(|s| s.floor_id).collect()
}

proptest! {
    #[test]
    fn registry_invariants_hold(capacity in 2usize..12, ops in prop::collection::vec(op(), 1..200)) {
        let mut reg = SlotRegistry::new(capacity);
        let mut current = FloorId::NONE;
        let mut depth = 0;

        for op in ops {
            match op {
                Op::Descend => {
                    let expected_victim = if reg.live_count() == capacity {
                        reg.eviction_candidate(current).map(|s| s.floor_id)
                    } else {
                        None
                    };
                    depth += 1;
                    let alloc = reg.allocate_slot(current, depth);
                    prop_assert_eq!(alloc.evicted.map(|d| d.floor_id), expected_victim);
                    if current.is_some() {
                        prop_assert_ne!(alloc.evicted.map(|d| d.floor_id), Some(current));
                        reg.set_content(current, SlotContent::Stored);
                        reg.touch(current);
                        reg.link(current, Direction::Down, alloc.floor_id);
                    }
                    reg.set_content(alloc.floor_id, SlotContent::Active);
                    reg.touch(alloc.floor_id);
                    current = alloc.floor_id;
                }
                Op::Revisit(i) => {
                    let ids = live_ids(&reg);
                    if !ids.is_empty() {
                        let next = ids[i % ids.len()];
                        if current.is_some() && current != next {
                            reg.set_content(current, SlotContent::Stored);
                            reg.touch(current);
                        }
                        reg.set_content(next, SlotContent::Active);
                        reg.touch(next);
                        current = next;
                    }
                }
                Op::Burn(i) => {
                    let ids: Vec<FloorId> = live_ids(&reg).into_iter().filter(|id| *id != current).collect();
                    if !ids.is_empty() {
                        let victim = ids[i % ids.len()];
                        prop_assert!(reg.discard_one(victim).is_some());
                        for slot in reg.live_slots() {
                            prop_assert_ne!(slot.upper_neighbor, victim);
                            prop_assert_ne!(slot.lower_neighbor, victim);
                        }
                    }
                }
                Op::Flush => {
                    reg.discard_all();
                    current = FloorId::NONE;
                    depth = 0;
                    prop_assert_eq!(reg.live_count(), 0);
                    prop_assert_eq!(reg.clock(), 1);
                }
            }

            prop_assert!(reg.live_count() <= capacity);
            prop_assert!(reg.validate(current).is_ok(), "{:?}", reg.validate(current));

            if let Some(candidate) = reg.eviction_candidate(current) {
                let min = reg
                    .live_slots()
                    .filter(|s| s.floor_id != current)
                    .map(|s| s.recency_mark)
                    .min();
                prop_assert_eq!(Some(candidate.recency_mark), min);
            }
        }
    }
}

#[test]
fn evicted_floor_is_the_least_recent() {
    let mut reg = SlotRegistry::new(10);
    let mut current = FloorId::NONE;
    let mut visited = Vec::new();
    for depth in 1..=10 {
        let alloc = reg.allocate_slot(current, depth);
        if current.is_some() {
            reg.touch(current);
        }
        reg.touch(alloc.floor_id);
        current = alloc.floor_id;
        visited.push(current);
    }
    assert_eq!(reg.live_count(), 10);

    let alloc = reg.allocate_slot(current, 11);
    assert_eq!(alloc.evicted.map(|d| d.floor_id), Some(visited[0]));
    assert!(reg.find_slot(visited[0]).is_none());
    assert_eq!(reg.live_count(), 10);
}
