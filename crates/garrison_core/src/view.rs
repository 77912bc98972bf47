//! Read-only snapshots for the presentation layer.

use serde::{Deserialize, Serialize};

use crate::building::{Building, BuildingId};
use crate::factions::{Faction, Side};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::troop::{TroopId, TroopUnit};

/// What a renderer needs to draw one building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingView {
    /// Stable handle.
    pub id: BuildingId,
    /// Center.
    pub position: Vec2Fixed,
    /// Owner.
    pub faction: Faction,
    /// Garrison.
    pub troops: u32,
    /// Level.
    pub level: u8,
    /// Upgrade completion in `[0, 1]`, zero when idle.
    #[serde(with = "fixed_serde")]
    pub upgrade_progress: Fixed,
    /// Whether the player currently has this building selected.
    pub selected: bool,
}

impl BuildingView {
    /// Snapshot `building`.
    #[must_use]
    pub fn new(building: &Building, selected: bool) -> Self {
        Self {
            id: building.id(),
            position: building.position(),
            faction: building.faction(),
            troops: building.troops(),
            level: building.level(),
            upgrade_progress: building.upgrade_progress(),
            selected,
        }
    }

    /// Whether the player can command this building.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.faction.is_player_owned()
    }
}

/// What a renderer needs to draw one troop unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopView {
    /// Unit handle.
    pub id: TroopId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Owner.
    pub owner: Side,
}

impl From<&TroopUnit> for TroopView {
    fn from(unit: &TroopUnit) -> Self {
        Self {
            id: unit.id,
            position: unit.position,
            owner: unit.owner,
        }
    }
}
