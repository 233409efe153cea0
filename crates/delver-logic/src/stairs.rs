//! Connector kinds and arrival-tile resolution.
//!
//! When the player arrives on a restored floor we look for the connector that
//! leads back to where they came from. A connector whose remembered
//! destination is the departed floor wins outright; otherwise one matching
//! connector is picked uniformly at random. With no match at all the caller
//! must downgrade the transition to no-return with random placement.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Pos;
use crate::ids::FloorId;

/// What a connector tile does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorKind {
    /// Leads up (staircase or shaft).
    Ascending,
    /// Leads down (staircase or shaft).
    Descending,
    /// Building or quest entrance on the same depth.
    Entrance,
}

/// A connector tile of the wanted kind found on the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorSite {
    pub pos: Pos,
    pub destination: FloorId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The connector remembered as leading to the known neighbor.
    Fixed(Pos),
    /// No remembered connector; picked at random among matches.
    Random(Pos),
    /// No connector of the wanted kind on this level.
    Unconnected,
}

impl Resolution {
    pub fn pos(self) -> Option<Pos> {
        match self {
            Resolution::Fixed(pos) | Resolution::Random(pos) => Some(pos),
            Resolution::Unconnected => None,
        }
    }
}

/// Pick the arrival connector among `sites`.
///
/// `known` is the neighbor we came from (`NONE` when the connection must not
/// be trusted, e.g. after a level teleport).
pub fn resolve(sites: &[ConnectorSite], known: FloorId, rng: &mut impl Rng) -> Resolution {
    if known.is_some() {
        if let Some(site) = sites.iter().find(|s| s.destination == known) {
            return Resolution::Fixed(site.pos);
        }
    }
    if sites.is_empty() {
        return Resolution::Unconnected;
    }
    let pick = rng.gen_range(0..sites.len());
    Resolution::Random(sites[pick].pos)
}
