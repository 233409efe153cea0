//! Party selection: which companions follow the player to the next floor.
//!
//! The engine describes every companion on the departing level as a
//! [`Candidate`]; [`select_party`] decides who travels. The rules:
//!
//! - the mount is taken first, unless it is itself subordinate to another
//!   entity, in which case the player dismounts and it stays behind;
//! - remaining places go to eligible companions, nearest first (ties keep
//!   the order the candidates were given in);
//! - confused, stunned or sleeping companions stay, and so does anything
//!   following another entity (only root companions travel);
//! - in a bounded-encounter context only the mount travels.

/// One companion on the departing level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub distance: u32,
    pub confused: bool,
    pub stunned: bool,
    pub asleep: bool,
    pub subordinate: bool,
}

impl Candidate {
    pub fn can_follow(&self) -> bool {
        !(self.confused || self.stunned || self.asleep || self.subordinate)
    }
}

/// The player's mount as seen at departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountCandidate {
    pub subordinate: bool,
}

/// Outcome of party selection. Indices refer to the candidate slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyPlan {
    /// The mount travels (always first in the roster).
    pub take_mount: bool,
    /// The mount was subordinate and the player dismounts.
    pub dismount: bool,
    /// Companions that travel, nearest first.
    pub members: Vec<usize>,
    /// Eligible companions that did not fit in the roster.
    pub overflow: Vec<usize>,
}

impl PartyPlan {
    pub fn len(&self) -> usize {
        self.members.len() + usize::from(self.take_mount)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Choose the travelling party.
pub fn select_party(
    mount: Option<MountCandidate>,
    candidates: &[Candidate],
    capacity: usize,
    mount_only: bool,
) -> PartyPlan {
    let mut plan = PartyPlan::default();

    if let Some(mount) = mount {
        if mount.subordinate {
            plan.dismount = true;
        } else if capacity > 0 {
            plan.take_mount = true;
        }
    }

    if mount_only {
        return plan;
    }

    let mut eligible: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].can_follow())
        .collect();
    eligible.sort_by_key(|&i| (candidates[i].distance, i));

    let room = capacity.saturating_sub(usize::from(plan.take_mount));
    let split = room.min(eligible.len());
    plan.overflow = eligible.split_off(split);
    plan.members = eligible;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet(distance: u32) -> Candidate {
        Candidate {
            distance,
            confused: false,
            stunned: false,
            asleep: false,
            subordinate: false,
        }
    }

    #[test]
    fn test_nearest_first() {
        let pets = [pet(5), pet(1), pet(3)];
        let plan = select_party(None, &pets, 21, false);
        assert_eq!(plan.members, vec![1, 2, 0]);
        assert!(plan.overflow.is_empty());
    }

    #[test]
    fn test_ineligible_stay_behind() {
        let mut pets = [pet(1), pet(2), pet(3), pet(4), pet(5)];
        pets[0].confused = true;
        pets[1].stunned = true;
        pets[2].asleep = true;
        pets[3].subordinate = true;
        let plan = select_party(None, &pets, 21, false);
        assert_eq!(plan.members, vec![4]);
    }

    #[test]
    fn test_capacity_counts_mount() {
        let pets: Vec<Candidate> = (1..=5).map(pet).collect();
        let plan = select_party(Some(MountCandidate { subordinate: false }), &pets, 3, false);
        assert!(plan.take_mount);
        assert_eq!(plan.members, vec![0, 1]);
        assert_eq!(plan.overflow, vec![2, 3, 4]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_subordinate_mount_dismounts() {
        let plan = select_party(Some(MountCandidate { subordinate: true }), &[pet(1)], 21, false);
        assert!(!plan.take_mount);
        assert!(plan.dismount);
        assert_eq!(plan.members, vec![0]);
    }

    #[test]
    fn test_mount_only_context() {
        let pets = [pet(1), pet(2)];
        let plan = select_party(Some(MountCandidate { subordinate: false }), &pets, 21, true);
        assert!(plan.take_mount);
        assert!(plan.members.is_empty());
        assert!(plan.overflow.is_empty());

        let none = select_party(None, &pets, 21, true);
        assert!(none.is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let pets = [pet(2), pet(1), pet(2), pet(1)];
        let plan = select_party(None, &pets, 3, false);
        assert_eq!(plan.members, vec![1, 3, 0]);
        assert_eq!(plan.overflow, vec![2]);
    }
}
