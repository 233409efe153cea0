//! Connector bookkeeping on live levels.

use delver_logic::ids::FloorId;
use delver_logic::mode::Direction;
use delver_logic::stairs::{resolve, Resolution};
use rand::rngs::StdRng;

use crate::components::*;

/// Find where to put the player arriving on `level` by travelling
/// `direction`. `known` is the floor just left, or `NONE` when the
/// connection must not be trusted.
pub fn arrival_site(level: &Level, direction: Direction, known: FloorId, rng: &mut StdRng) -> Resolution {
    let sites = level.connectors_of(direction.arrival_kind());
    resolve(&sites, known, rng)
}

/// Remember that the connector under the player leads to `destination`.
pub fn mark_departure(level: &mut Level, destination: FloorId) -> bool {
    let player = level.player;
    match level.tile_mut(player).and_then(|t| t.connector.as_mut()) {
        Some(connector) => {
            connector.destination = destination;
            true
        }
        None => false,
    }
}

/// Where the connector under the player leads, if it is remembered.
pub fn departure_destination(level: &Level) -> FloorId {
    level
        .connector(level.player)
        .map(|c| c.destination)
        .unwrap_or(FloorId::NONE)
}

/// Put a connector back to `origin` under the player on a new level.
pub fn create_return_connector(level: &mut Level, direction: Direction, origin: FloorId) -> bool {
    let connector = Connector::new(direction.arrival_kind()).leading_to(origin);
    level.place_connector(level.player, connector)
}

/// Forget where the connector under the player leads.
pub fn clear_arrival_marker(level: &mut Level) {
    mark_departure(level, FloorId::NONE);
}
