//! Results of player and AI commands.
//!
//! Commands never fail with an error. An invalid command leaves the
//! match untouched and reports why through [`IgnoreReason`].

use serde::{Deserialize, Serialize};

use crate::building::{BuildingId, UpgradeRequest};
use crate::dispatch::DispatchRejection;

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The command changed the match.
    Accepted,
    /// The command was ignored; nothing changed.
    Ignored(IgnoreReason),
}

impl CommandOutcome {
    /// Whether the command was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Why a command was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The match already has a winner.
    MatchOver,
    /// No building with this handle.
    UnknownBuilding(BuildingId),
    /// The building is not owned by the commanding side.
    NotOwned(BuildingId),
    /// `order_selected` without a selection.
    NoSelection,
    /// Source and target are the same building.
    SameBuilding,
    /// The source garrison is empty.
    NoTroops,
    /// Upgrade already running.
    AlreadyUpgrading,
    /// Building is at the level cap.
    MaxLevel,
    /// Garrison cannot pay for the upgrade.
    InsufficientTroops {
        /// Troops required.
        required: u32,
        /// Troops available.
        available: u32,
    },
    /// Upgrades are switched off by the rules.
    UpgradesDisabled,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchOver => write!(f, "match is over"),
            Self::UnknownBuilding(id) => write!(f, "unknown building {id}"),
            Self::NotOwned(id) => write!(f, "building {id} is not yours"),
            Self::NoSelection => write!(f, "nothing selected"),
            Self::SameBuilding => write!(f, "source and target are the same building"),
            Self::NoTroops => write!(f, "no troops to send"),
            Self::AlreadyUpgrading => write!(f, "already upgrading"),
            Self::MaxLevel => write!(f, "already at max level"),
            Self::InsufficientTroops {
                required,
                available,
            } => write!(f, "upgrade needs {required} troops, have {available}"),
            Self::UpgradesDisabled => write!(f, "upgrades are disabled"),
        }
    }
}

impl IgnoreReason {
    /// Map a dispatch rejection; `source` names the building for ownership errors.
    #[must_use]
    pub const fn from_dispatch(rejection: DispatchRejection, source: BuildingId) -> Self {
        match rejection {
            DispatchRejection::UnknownBuilding(id) => Self::UnknownBuilding(id),
            DispatchRejection::SameBuilding => Self::SameBuilding,
            DispatchRejection::NotOwner => Self::NotOwned(source),
            DispatchRejection::NoTroops => Self::NoTroops,
        }
    }

    /// Map a refused upgrade request. `None` when the upgrade started.
    #[must_use]
    pub const fn from_upgrade(request: UpgradeRequest, building: BuildingId) -> Option<Self> {
        match request {
            UpgradeRequest::Started { .. } => None,
            UpgradeRequest::AlreadyUpgrading => Some(Self::AlreadyUpgrading),
            UpgradeRequest::MaxLevel => Some(Self::MaxLevel),
            UpgradeRequest::InsufficientTroops {
                required,
                available,
            } => Some(Self::InsufficientTroops {
                required,
                available,
            }),
            UpgradeRequest::Neutral => Some(Self::NotOwned(building)),
            UpgradeRequest::Disabled => Some(Self::UpgradesDisabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_mapping() {
        let id = BuildingId(2);
        assert_eq!(IgnoreReason::from_upgrade(UpgradeRequest::Started { cost: 5 }, id), None);
        assert_eq!(
            IgnoreReason::from_upgrade(UpgradeRequest::Neutral, id),
            Some(IgnoreReason::NotOwned(id))
        );
    }

    #[test]
    fn test_display_names_building() {
        let reason = IgnoreReason::from_dispatch(DispatchRejection::NotOwner, BuildingId(4));
        assert_eq!(reason.to_string(), "building #4 is not yours");
        assert!(CommandOutcome::Accepted.is_accepted());
        assert!(!CommandOutcome::Ignored(reason).is_accepted());
    }
}
