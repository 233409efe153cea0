//! Transition modes.
//!
//! A transition is described by one `TransitionMode` value passed explicitly
//! through `leave` and `enter`. Nothing about a transition is kept in ambient
//! state between calls; the controller may only *add* flags (escalating to
//! no-return or random placement) while a transition is under way.

use bitflags::bitflags;

use crate::stairs::ConnectorKind;

bitflags! {
    /// How the player is moving between floors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TransitionMode: u16 {
        /// Move one level up.
        const UP = 1 << 0;
        /// Move one level down.
        const DOWN = 1 << 1;
        /// Shaft: one extra level in the chosen direction.
        const SHAFT = 1 << 2;
        /// Arrive on a random grid instead of a connector.
        const RANDOM_PLACE = 1 << 3;
        /// Level teleport / trap door: the destination is a fresh floor and
        /// the arrival connector is not trusted.
        const RANDOM_CONNECT = 1 << 4;
        /// Burn the bridge: the departing floor is discarded.
        const NO_RETURN = 1 << 5;
        /// The destination is a bounded encounter (arena-like, never cached).
        const ENCOUNTER = 1 << 6;
    }
}

impl TransitionMode {
    pub const STAIRS_UP: Self = Self::UP;
    pub const STAIRS_DOWN: Self = Self::DOWN;
    pub const SHAFT_UP: Self = Self::UP.union(Self::SHAFT);
    pub const SHAFT_DOWN: Self = Self::DOWN.union(Self::SHAFT);
    pub const TRAP_DOOR: Self = Self::DOWN
        .union(Self::RANDOM_PLACE)
        .union(Self::RANDOM_CONNECT);
    pub const TELEPORT_LEVEL_UP: Self = Self::UP
        .union(Self::RANDOM_PLACE)
        .union(Self::RANDOM_CONNECT);
    pub const TELEPORT_LEVEL_DOWN: Self = Self::DOWN
        .union(Self::RANDOM_PLACE)
        .union(Self::RANDOM_CONNECT);
    pub const ENTER_ENCOUNTER: Self = Self::ENCOUNTER;
    /// Building or quest entrance on the same depth.
    pub const LATERAL: Self = Self::empty();

    pub fn direction(self) -> Direction {
        if self.contains(Self::DOWN) {
            Direction::Down
        } else if self.contains(Self::UP) {
            Direction::Up
        } else {
            Direction::Lateral
        }
    }

    /// Signed change in dungeon depth.
    pub fn depth_delta(self) -> i32 {
        let step = if self.contains(Self::SHAFT) { 2 } else { 1 };
        match self.direction() {
            Direction::Down => step,
            Direction::Up => -step,
            Direction::Lateral => 0,
        }
    }

    /// Destination depth from `depth`, never above the overworld (0).
    pub fn apply_depth(self, depth: i32) -> i32 {
        (depth + self.depth_delta()).max(0)
    }
}

/// Which way a transition goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Lateral,
}

impl Direction {
    /// Connector the player stands on to travel this way.
    pub fn departure_kind(self) -> ConnectorKind {
        match self {
            Direction::Up => ConnectorKind::Ascending,
            Direction::Down => ConnectorKind::Descending,
            Direction::Lateral => ConnectorKind::Entrance,
        }
    }

    /// Connector on the destination that leads back to where we came from.
    pub fn arrival_kind(self) -> ConnectorKind {
        match self {
            Direction::Up => ConnectorKind::Descending,
            Direction::Down => ConnectorKind::Ascending,
            Direction::Lateral => ConnectorKind::Entrance,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Lateral => Direction::Lateral,
        }
    }
}
