//! Fallback floor for unrecoverable cached content.

use delver_logic::geometry::Pos;

use crate::components::Level;

const DEAD_END_WIDTH: i32 = 7;
const DEAD_END_HEIGHT: i32 = 5;

/// A single walled room with no connectors; the player stands in the middle.
pub fn build_dead_end(depth: i32) -> Level {
    let mut level = Level::new(depth, DEAD_END_WIDTH, DEAD_END_HEIGHT);
    level.carve_room(
        Pos::new(1, 1),
        Pos::new(DEAD_END_WIDTH - 2, DEAD_END_HEIGHT - 2),
    );
    level.player = Pos::new(DEAD_END_WIDTH / 2, DEAD_END_HEIGHT / 2);
    level
}
