//! Grid positions and distance.

use serde::{Deserialize, Serialize};

/// A grid coordinate on a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Roguelike approximate distance: the longer axis plus half the shorter.
    pub fn distance(&self, other: &Pos) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        if dy > dx {
            dy + (dx >> 1)
        } else {
            dx + (dy >> 1)
        }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Pos {
        Pos::new(self.x + dx, self.y + dy)
    }

    /// The eight surrounding grids, clockwise from north.
    pub fn neighbors(&self) -> [Pos; 8] {
        [
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(1, 0),
            self.offset(1, 1),
            self.offset(0, 1),
            self.offset(-1, 1),
            self.offset(-1, 0),
            self.offset(-1, -1),
        ]
    }
}
