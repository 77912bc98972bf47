//! Events emitted by the simulation for the presentation layer.
//!
//! The core never calls into rendering or UI code. Everything cosmetic
//! (flashes, shakes, tweens, the end-of-match modal) reacts to these
//! events, drained from the match after each tick.

use serde::{Deserialize, Serialize};

use crate::building::BuildingId;
use crate::factions::{Faction, Side};
use crate::troop::TroopId;

/// Why a troop unit was removed without reaching a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Arrived at a point with no building in capture range.
    NoBuilding,
    /// Position update failed.
    Fault,
}

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A building produced troops.
    SoldierGenerated {
        /// Producing building.
        building: BuildingId,
        /// Troops produced this tick.
        count: u32,
    },
    /// An upgrade was paid for and started.
    UpgradeStarted {
        /// Upgrading building.
        building: BuildingId,
        /// Troops spent.
        cost: u32,
    },
    /// An upgrade finished.
    UpgradeCompleted {
        /// Upgraded building.
        building: BuildingId,
        /// Level reached.
        level: u8,
    },
    /// Troops left a building towards another.
    TroopsDispatched {
        /// Sending side.
        side: Side,
        /// Source building.
        source: BuildingId,
        /// Destination building.
        target: BuildingId,
        /// Troops committed.
        count: u32,
    },
    /// A staggered spawn materialized a troop unit.
    TroopSpawned {
        /// New unit.
        troop: TroopId,
        /// Owning side.
        side: Side,
    },
    /// A troop unit vanished without resolving against a building.
    TroopDiscarded {
        /// Removed unit.
        troop: TroopId,
        /// Why.
        reason: DiscardReason,
    },
    /// A building changed hands.
    BuildingCaptured {
        /// Captured building.
        building: BuildingId,
        /// Previous owner.
        previous: Faction,
        /// New owner.
        new_owner: Side,
    },
    /// The match reached a terminal state. Emitted exactly once.
    MatchEnded {
        /// Winning side.
        winner: Side,
    },
}

/// Events generated during one simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number the events belong to.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
}

impl TickEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The winner, if the match ended this tick.
    #[must_use]
    pub fn winner(&self) -> Option<Side> {
        self.events.iter().find_map(|e| match e {
            GameEvent::MatchEnded { winner } => Some(*winner),
            _ => None,
        })
    }
}
