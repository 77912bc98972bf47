//! Faction definitions.
//!
//! Every building belongs to exactly one [`Faction`]. Troop units only
//! ever belong to one of the two fighting [`Side`]s.

use serde::{Deserialize, Serialize};

/// Ownership tag of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Faction {
    /// The human player.
    Player,
    /// The AI opponent.
    Enemy,
    /// Unclaimed buildings. Never generates troops.
    #[default]
    Neutral,
}

impl Faction {
    /// All factions, in aggregate-table order.
    pub const ALL: [Self; 3] = [Self::Player, Self::Enemy, Self::Neutral];

    /// The fighting side owning this faction, if any.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Player => Some(Side::Player),
            Self::Enemy => Some(Side::Enemy),
            Self::Neutral => None,
        }
    }

    /// Whether the human player owns this building.
    #[must_use]
    pub const fn is_player_owned(self) -> bool {
        matches!(self, Self::Player)
    }

    /// Whether buildings of this faction generate troops and can be upgraded.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Neutral)
    }

    /// Display name for logs and reports.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
            Self::Neutral => "Neutral",
        }
    }
}

/// One of the two fighting sides. Troop units are always owned by a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The human player.
    Player,
    /// The AI opponent.
    Enemy,
}

impl Side {
    /// Both sides.
    pub const BOTH: [Self; 2] = [Self::Player, Self::Enemy];

    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// The building faction this side owns.
    #[must_use]
    pub const fn faction(self) -> Faction {
        match self {
            Self::Player => Faction::Player,
            Self::Enemy => Faction::Enemy,
        }
    }

    /// Whether a building of `faction` belongs to this side.
    #[must_use]
    pub fn owns(self, faction: Faction) -> bool {
        faction == self.faction()
    }
}

impl From<Side> for Faction {
    fn from(side: Side) -> Self {
        side.faction()
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.faction().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_round_trip() {
        for side in Side::BOTH {
            assert_eq!(Faction::from(side).side(), Some(side));
        }
        assert_eq!(Faction::Neutral.side(), None);
    }

    #[test]
    fn test_opponent() {
        assert_eq!(Side::Player.opponent(), Side::Enemy);
        assert_eq!(Side::Enemy.opponent().opponent(), Side::Enemy);
    }

    #[test]
    fn test_derived_views() {
        assert!(Faction::Player.is_player_owned());
        assert!(!Faction::Enemy.is_player_owned());
        assert!(!Faction::Neutral.is_active());
        assert!(Side::Enemy.owns(Faction::Enemy));
        assert!(!Side::Enemy.owns(Faction::Neutral));
    }
}
