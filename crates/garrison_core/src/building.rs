//! Buildings: garrison, troop generation and upgrades.
//!
//! A building is a plain record owned by the match. It never talks to
//! other buildings; arrivals are applied to it by the combat resolver and
//! dispatches withdraw from it through [`Building::withdraw`].

use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;
use crate::factions::{Faction, Side};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Stable handle of a building: its index in the match's building list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

impl BuildingId {
    /// Index into the building list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BuildingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An upgrade in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeState {
    /// Time spent upgrading so far.
    #[serde(with = "fixed_serde")]
    pub progress_ms: Fixed,
    /// Time the upgrade needs in total.
    #[serde(with = "fixed_serde")]
    pub required_ms: Fixed,
}

impl UpgradeState {
    /// Completion ratio in `[0, 1]`.
    #[must_use]
    pub fn ratio(&self) -> Fixed {
        if self.required_ms <= Fixed::ZERO {
            return Fixed::ONE;
        }
        (self.progress_ms / self.required_ms).min(Fixed::ONE)
    }
}

/// What happened to a building during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildingTick {
    /// Troops generated this tick.
    pub generated: u32,
    /// New level, if an upgrade finished this tick.
    pub upgraded_to: Option<u8>,
}

/// Result of an upgrade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeRequest {
    /// Upgrade started; `cost` troops were deducted.
    Started {
        /// Troops spent.
        cost: u32,
    },
    /// An upgrade is already running.
    AlreadyUpgrading,
    /// The building is at the level cap.
    MaxLevel,
    /// Not enough troops to pay for the upgrade.
    InsufficientTroops {
        /// Troops required.
        required: u32,
        /// Troops available.
        available: u32,
    },
    /// Neutral buildings cannot be upgraded.
    Neutral,
    /// Upgrades are disabled by the rules.
    Disabled,
}

/// Result of one troop unit arriving at a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Friendly unit joined the garrison.
    Reinforced,
    /// Hostile unit was absorbed by the garrison.
    Repelled,
    /// Hostile unit outnumbered the garrison; ownership changed.
    Captured {
        /// Owner before the capture.
        previous: Faction,
    },
}

/// A capturable building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    id: BuildingId,
    position: Vec2Fixed,
    faction: Faction,
    troops: u32,
    /// Time accumulated towards the next generated troop.
    #[serde(with = "fixed_serde")]
    generation_ms: Fixed,
    level: u8,
    upgrade: Option<UpgradeState>,
}

impl Building {
    /// Create a level-1 building.
    #[must_use]
    pub fn new(id: BuildingId, position: Vec2Fixed, faction: Faction, troops: u32) -> Self {
        Self {
            id,
            position,
            faction,
            troops,
            generation_ms: Fixed::ZERO,
            level: 1,
            upgrade: None,
        }
    }

    /// Set the starting level. Neutral buildings stay at level 1.
    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = if self.faction.is_active() {
            level.max(1)
        } else {
            1
        };
        self
    }

    /// Stable handle.
    #[must_use]
    pub const fn id(&self) -> BuildingId {
        self.id
    }

    /// World position of the building center.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Current owner.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Current garrison.
    #[must_use]
    pub const fn troops(&self) -> u32 {
        self.troops
    }

    /// Current level (1-based).
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Time banked towards the next generated troop.
    #[must_use]
    pub const fn generation_progress_ms(&self) -> Fixed {
        self.generation_ms
    }

    /// Upgrade in progress, if any.
    #[must_use]
    pub const fn upgrade(&self) -> Option<&UpgradeState> {
        self.upgrade.as_ref()
    }

    /// Whether an upgrade is running.
    #[must_use]
    pub const fn is_upgrading(&self) -> bool {
        self.upgrade.is_some()
    }

    /// Upgrade completion ratio, zero when idle.
    #[must_use]
    pub fn upgrade_progress(&self) -> Fixed {
        self.upgrade.map_or(Fixed::ZERO, |u| u.ratio())
    }

    /// Whether the human player can select and command this building.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.faction.is_player_owned()
    }

    /// Advance generation or upgrade progress by `elapsed_ms`.
    pub fn tick(&mut self, elapsed_ms: Fixed, rules: &RulesConfig) -> BuildingTick {
        let mut result = BuildingTick::default();

        if let Some(upgrade) = self.upgrade.as_mut() {
            upgrade.progress_ms = upgrade.progress_ms.saturating_add(elapsed_ms);
            if upgrade.progress_ms >= upgrade.required_ms {
                self.upgrade = None;
                self.level = self.level.saturating_add(1).min(rules.max_level);
                result.upgraded_to = Some(self.level);
            }
            return result;
        }

        if !self.faction.is_active() {
            return result;
        }

        let interval = rules.generation_interval(self.level);
        self.generation_ms = self.generation_ms.saturating_add(elapsed_ms);
        while self.generation_ms >= interval {
            self.generation_ms -= interval;
            self.troops = self.troops.saturating_add(1);
            result.generated += 1;
        }
        result
    }

    /// Try to start an upgrade, paying for it from the garrison.
    pub fn start_upgrade(&mut self, rules: &RulesConfig) -> UpgradeRequest {
        if !rules.upgrades_enabled {
            return UpgradeRequest::Disabled;
        }
        if !self.faction.is_active() {
            return UpgradeRequest::Neutral;
        }
        if self.upgrade.is_some() {
            return UpgradeRequest::AlreadyUpgrading;
        }
        if self.level >= rules.max_level {
            return UpgradeRequest::MaxLevel;
        }
        let cost = rules.upgrade_cost(self.level);
        if self.troops < cost {
            return UpgradeRequest::InsufficientTroops {
                required: cost,
                available: self.troops,
            };
        }

        self.troops -= cost;
        self.upgrade = Some(UpgradeState {
            progress_ms: Fixed::ZERO,
            required_ms: Fixed::from_num(rules.upgrade_duration_ms),
        });
        UpgradeRequest::Started { cost }
    }

    /// Change ownership.
    ///
    /// A new owner starts with a fresh generation timer and loses any
    /// upgrade in progress. Neutral buildings drop back to level 1.
    pub fn set_faction(&mut self, faction: Faction) {
        if self.faction == faction {
            return;
        }
        self.faction = faction;
        self.upgrade = None;
        self.generation_ms = Fixed::ZERO;
        if !faction.is_active() {
            self.level = 1;
        }
    }

    /// Remove up to `count` troops from the garrison, returning how many left.
    pub fn withdraw(&mut self, count: u32) -> u32 {
        let taken = count.min(self.troops);
        self.troops -= taken;
        taken
    }

    /// Apply one arriving troop unit owned by `side`.
    pub fn receive_arrival(&mut self, side: Side) -> Arrival {
        if side.owns(self.faction) {
            self.troops = self.troops.saturating_add(1);
            return Arrival::Reinforced;
        }

        // A negative remainder is never stored: it becomes the attacker's garrison.
        let remaining = i64::from(self.troops) - 1;
        match u32::try_from(remaining) {
            Ok(garrison) => {
                self.troops = garrison;
                Arrival::Repelled
            }
            Err(_) => {
                let previous = self.faction;
                self.set_faction(side.faction());
                self.troops = u32::try_from(remaining.unsigned_abs()).unwrap_or(u32::MAX);
                Arrival::Captured { previous }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building(faction: Faction, troops: u32) -> Building {
        Building::new(BuildingId(0), Vec2Fixed::from_ints(100, 100), faction, troops)
    }

    fn ms(v: u32) -> Fixed {
        Fixed::from_num(v)
    }

    #[test]
    fn test_generation_carries_overshoot() {
        let rules = RulesConfig::default();
        let mut b = building(Faction::Player, 0);

        let tick = b.tick(ms(2500), &rules);

        assert_eq!(tick.generated, 2);
        assert_eq!(b.troops(), 2);
        assert_eq!(b.generation_progress_ms(), ms(500));

        // The banked 500ms plus another 500ms completes a third troop.
        assert_eq!(b.tick(ms(500), &rules).generated, 1);
        assert_eq!(b.generation_progress_ms(), Fixed::ZERO);
    }

    #[test]
    fn test_neutral_never_generates() {
        let rules = RulesConfig::default();
        let mut b = building(Faction::Neutral, 4);
        assert_eq!(b.tick(ms(10_000), &rules).generated, 0);
        assert_eq!(b.troops(), 4);
    }

    #[test]
    fn test_level_speeds_up_generation() {
        let rules = RulesConfig::default();
        let mut b = building(Faction::Enemy, 0).with_level(2);
        // 850ms interval at level 2
        assert_eq!(b.tick(ms(1700), &rules).generated, 2);
    }

    #[test]
    fn test_neutral_level_is_clamped() {
        let b = building(Faction::Neutral, 0).with_level(3);
        assert_eq!(b.level(), 1);
    }

    #[test]
    fn test_upgrade_lifecycle() {
        let rules = RulesConfig::default();
        let mut b = building(Faction::Player, 12);

        assert_eq!(b.start_upgrade(&rules), UpgradeRequest::Started { cost: 5 });
        assert_eq!(b.troops(), 7);
        assert!(b.is_upgrading());
        assert_eq!(b.start_upgrade(&rules), UpgradeRequest::AlreadyUpgrading);

        // No generation while upgrading.
        let tick = b.tick(ms(1500), &rules);
        assert_eq!(tick.generated, 0);
        assert_eq!(b.upgrade_progress(), Fixed::from_num(0.5));

        let tick = b.tick(ms(1500), &rules);
        assert_eq!(tick.upgraded_to, Some(2));
        assert_eq!(b.level(), 2);
        assert!(!b.is_upgrading());
        assert_eq!(b.upgrade_progress(), Fixed::ZERO);
    }

    #[test]
    fn test_upgrade_rejections() {
        let rules = RulesConfig::default();

        let mut poor = building(Faction::Player, 4);
        assert_eq!(
            poor.start_upgrade(&rules),
            UpgradeRequest::InsufficientTroops {
                required: 5,
                available: 4
            }
        );
        assert_eq!(poor.troops(), 4);

        let mut capped = building(Faction::Player, 100).with_level(3);
        assert_eq!(capped.start_upgrade(&rules), UpgradeRequest::MaxLevel);

        let mut neutral = building(Faction::Neutral, 100);
        assert_eq!(neutral.start_upgrade(&rules), UpgradeRequest::Neutral);

        let flat = RulesConfig {
            upgrades_enabled: false,
            ..RulesConfig::default()
        };
        let mut b = building(Faction::Player, 100);
        assert_eq!(b.start_upgrade(&flat), UpgradeRequest::Disabled);
    }

    #[test]
    fn test_reinforcement() {
        let mut b = building(Faction::Player, 3);
        assert_eq!(b.receive_arrival(Side::Player), Arrival::Reinforced);
        assert_eq!(b.troops(), 4);
    }

    #[test]
    fn test_capture_after_garrison_exhausted() {
        let mut b = building(Faction::Neutral, 5);
        let mut captured = 0;
        for _ in 0..8 {
            if let Arrival::Captured { previous } = b.receive_arrival(Side::Enemy) {
                assert_eq!(previous, Faction::Neutral);
                captured += 1;
            }
        }
        assert_eq!(captured, 1);
        assert_eq!(b.faction(), Faction::Enemy);
        assert_eq!(b.troops(), 3);
    }

    #[test]
    fn test_capture_cancels_upgrade() {
        let rules = RulesConfig::default();
        let mut b = building(Faction::Player, 5);
        b.start_upgrade(&rules);
        assert_eq!(b.troops(), 0);

        assert!(matches!(b.receive_arrival(Side::Enemy), Arrival::Captured { .. }));
        assert!(!b.is_upgrading());
        assert_eq!(b.level(), 1);
        assert_eq!(b.troops(), 1);
    }

    #[test]
    fn test_withdraw_clamps() {
        let mut b = building(Faction::Player, 3);
        assert_eq!(b.withdraw(10), 3);
        assert_eq!(b.troops(), 0);
        assert_eq!(b.withdraw(1), 0);
    }
}
