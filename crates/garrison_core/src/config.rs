//! Tunable rules and AI difficulty presets.
//!
//! Every constant of the simulation lives in [`RulesConfig`]. Values are
//! plain integers (milliseconds, world units, percentages) so rule files
//! stay readable as RON; they are converted to fixed-point at use sites.
//!
//! # Example RON
//!
//! ```ron
//! RulesConfig(
//!     base_generation_interval_ms: 1000,
//!     spawn_delay_ms: 80,
//! )
//! ```
//!
//! Omitted fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{percent, Fixed};

/// Largest accepted radius, separation, jitter or threat radius, in world units.
pub const MAX_RULE_DISTANCE: u32 = 4096;
/// Largest accepted interval or duration.
pub const MAX_RULE_DURATION_MS: u32 = 3_600_000;
/// Fastest accepted troop speed, in world units per second.
pub const MAX_TROOP_SPEED: u32 = 100_000;
/// Largest accepted AI margin or chance percentage.
pub const MAX_TUNING_PERCENT: u32 = 10_000;

fn at_most(name: &str, value: u32, max: u32) -> Result<()> {
    if value > max {
        return Err(GameError::InvalidConfig(format!("{name} must be at most {max}, got {value}")));
    }
    Ok(())
}

/// Simulation rules shared by every building, troop and AI in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Generation interval of a level-1 building.
    pub base_generation_interval_ms: u32,
    /// Interval multiplier applied per level above 1 (85 = 0.85^(level-1)).
    pub level_speedup_percent: u32,
    /// When false, intervals are flat and upgrade requests are ignored.
    pub upgrades_enabled: bool,
    /// Highest reachable building level.
    pub max_level: u8,
    /// Upgrade cost is `upgrade_cost_per_level * current_level` troops.
    pub upgrade_cost_per_level: u32,
    /// Time an upgrade takes to complete.
    pub upgrade_duration_ms: u32,
    /// Troop unit speed in world units per second.
    pub troop_speed: u32,
    /// A unit has arrived when closer than this to its target point.
    pub arrival_radius: u32,
    /// An arrival resolves against a building within this radius of the target point.
    pub capture_radius: u32,
    /// Minimum distance between two building centers.
    pub min_building_separation: u32,
    /// Delay between two consecutive spawns of one dispatch.
    pub spawn_delay_ms: u32,
    /// Inner radius of the spawn band around the source building.
    pub spawn_radius_min: u32,
    /// Outer radius of the spawn band around the source building.
    pub spawn_radius_max: u32,
    /// Maximum per-axis offset applied to each unit's target point.
    pub target_jitter: u32,
    /// Share of the source garrison a player order sends.
    pub order_send_percent: u32,
    /// Constants of the AI scoring heuristic.
    pub ai: AiTuning,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            base_generation_interval_ms: 1000,
            level_speedup_percent: 85,
            upgrades_enabled: true,
            max_level: 3,
            upgrade_cost_per_level: 5,
            upgrade_duration_ms: 3000,
            troop_speed: 200,
            arrival_radius: 10,
            capture_radius: 50,
            min_building_separation: 100,
            spawn_delay_ms: 50,
            spawn_radius_min: 20,
            spawn_radius_max: 35,
            target_jitter: 20,
            order_send_percent: 100,
            ai: AiTuning::default(),
        }
    }
}

impl RulesConfig {
    /// Parse rules from RON, then validate them.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let rules: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            what: "rules".to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.base_generation_interval_ms == 0 {
            return Err(GameError::InvalidConfig(
                "base_generation_interval_ms must be positive".to_string(),
            ));
        }
        if self.level_speedup_percent == 0 || self.level_speedup_percent > 100 {
            return Err(GameError::InvalidConfig(
                "level_speedup_percent must be in 1..=100".to_string(),
            ));
        }
        if self.max_level == 0 {
            return Err(GameError::InvalidConfig("max_level must be at least 1".to_string()));
        }
        if self.troop_speed == 0 {
            return Err(GameError::InvalidConfig("troop_speed must be positive".to_string()));
        }
        if self.spawn_radius_min > self.spawn_radius_max {
            return Err(GameError::InvalidConfig(format!(
                "spawn radius band is inverted: {} > {}",
                self.spawn_radius_min, self.spawn_radius_max
            )));
        }
        if self.order_send_percent == 0 || self.order_send_percent > 100 {
            return Err(GameError::InvalidConfig(
                "order_send_percent must be in 1..=100".to_string(),
            ));
        }
        if self.ai.threat_radius == 0 || self.ai.threat_troop_norm == 0 {
            return Err(GameError::InvalidConfig(
                "ai threat radius and troop norm must be positive".to_string(),
            ));
        }
        self.validate_bounds()
    }

    /// Upper bounds that keep squared distances and timers inside `Fixed`.
    fn validate_bounds(&self) -> Result<()> {
        for (name, value) in [
            ("arrival_radius", self.arrival_radius),
            ("capture_radius", self.capture_radius),
            ("min_building_separation", self.min_building_separation),
            ("spawn_radius_max", self.spawn_radius_max),
            ("target_jitter", self.target_jitter),
            ("ai.threat_radius", self.ai.threat_radius),
        ] {
            at_most(name, value, MAX_RULE_DISTANCE)?;
        }
        for (name, value) in [
            ("base_generation_interval_ms", self.base_generation_interval_ms),
            ("upgrade_duration_ms", self.upgrade_duration_ms),
            ("spawn_delay_ms", self.spawn_delay_ms),
        ] {
            at_most(name, value, MAX_RULE_DURATION_MS)?;
        }
        for (name, value) in [
            ("ai.expand_margin_percent", self.ai.expand_margin_percent),
            ("ai.attack_margin_percent", self.ai.attack_margin_percent),
            ("ai.send_margin_percent", self.ai.send_margin_percent),
            ("ai.upgrade_chance_percent", self.ai.upgrade_chance_percent),
        ] {
            at_most(name, value, MAX_TUNING_PERCENT)?;
        }
        at_most("troop_speed", self.troop_speed, MAX_TROOP_SPEED)?;
        if self
            .upgrade_cost_per_level
            .checked_mul(u32::from(self.max_level))
            .is_none()
        {
            return Err(GameError::InvalidConfig(format!(
                "upgrade_cost_per_level {} overflows at level {}",
                self.upgrade_cost_per_level, self.max_level
            )));
        }
        Ok(())
    }

    /// Generation interval in milliseconds for a building at `level`.
    ///
    /// `base * (speedup)^(level - 1)`, flat when upgrades are disabled.
    /// Never shorter than 1 ms.
    #[must_use]
    pub fn generation_interval(&self, level: u8) -> Fixed {
        let mut interval = Fixed::saturating_from_num(self.base_generation_interval_ms);
        if !self.upgrades_enabled {
            return interval.max(Fixed::ONE);
        }
        let speedup = percent(self.level_speedup_percent);
        for _ in 1..level {
            interval *= speedup;
        }
        interval.max(Fixed::ONE)
    }

    /// Troops required to start an upgrade from `level`.
    #[must_use]
    pub fn upgrade_cost(&self, level: u8) -> u32 {
        self.upgrade_cost_per_level.saturating_mul(u32::from(level))
    }

    /// Squared arrival radius.
    #[must_use]
    pub fn arrival_radius_sq(&self) -> Fixed {
        squared(self.arrival_radius)
    }

    /// Squared capture radius.
    #[must_use]
    pub fn capture_radius_sq(&self) -> Fixed {
        squared(self.capture_radius)
    }

    /// Squared minimum building separation.
    #[must_use]
    pub fn min_separation_sq(&self) -> Fixed {
        squared(self.min_building_separation)
    }
}

fn squared(value: u32) -> Fixed {
    let v = Fixed::saturating_from_num(value);
    v.saturating_mul(v)
}

/// Constants of the AI scoring heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Opposing buildings within this distance contribute to threat.
    pub threat_radius: u32,
    /// Garrison size that counts as one full unit of threat.
    pub threat_troop_norm: u32,
    /// Own garrison must exceed neutral garrison times this (120 = 1.2).
    pub expand_margin_percent: u32,
    /// Own garrison must exceed opposing garrison times this (150 = 1.5).
    pub attack_margin_percent: u32,
    /// Troops sent are the target garrison times this, rounded up.
    pub send_margin_percent: u32,
    /// Per-building chance of trying an upgrade on a decision pass.
    pub upgrade_chance_percent: u32,
    /// An upgrade is only considered above this garrison.
    pub upgrade_min_troops: u32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            threat_radius: 300,
            threat_troop_norm: 30,
            expand_margin_percent: 120,
            attack_margin_percent: 150,
            send_margin_percent: 150,
            upgrade_chance_percent: 10,
            upgrade_min_troops: 15,
        }
    }
}

/// AI difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    /// Slow, cautious opponent.
    Easy,
    /// Default opponent.
    #[default]
    Medium,
    /// Fast, aggressive opponent.
    Hard,
}

impl Difficulty {
    /// Behavior parameters for this difficulty.
    #[must_use]
    pub const fn profile(self) -> AiProfile {
        match self {
            Self::Easy => AiProfile {
                decision_interval_ms: 2000,
                aggressiveness_percent: 40,
                expansion_priority_percent: 60,
                min_keep_percent: 50,
            },
            Self::Medium => AiProfile {
                decision_interval_ms: 1000,
                aggressiveness_percent: 70,
                expansion_priority_percent: 80,
                min_keep_percent: 30,
            },
            Self::Hard => AiProfile {
                decision_interval_ms: 500,
                aggressiveness_percent: 90,
                expansion_priority_percent: 90,
                min_keep_percent: 20,
            },
        }
    }

    /// Lowercase name used by the CLI and protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(GameError::DataParseError {
                what: "difficulty".to_string(),
                message: format!("unknown difficulty '{other}'"),
            }),
        }
    }
}

/// Behavior parameters of one AI controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Time between decision passes.
    pub decision_interval_ms: u32,
    /// Probability of attacking when a target exists.
    pub aggressiveness_percent: u32,
    /// Probability of expanding when a neutral target exists.
    pub expansion_priority_percent: u32,
    /// Share of the garrison held back at full threat.
    pub min_keep_percent: u32,
}

impl AiProfile {
    /// Aggressiveness as a fraction.
    #[must_use]
    pub fn aggressiveness(&self) -> Fixed {
        percent(self.aggressiveness_percent)
    }

    /// Expansion priority as a fraction.
    #[must_use]
    pub fn expansion_priority(&self) -> Fixed {
        percent(self.expansion_priority_percent)
    }

    /// Minimum soldiers to keep as a fraction.
    #[must_use]
    pub fn min_soldiers_to_keep(&self) -> Fixed {
        percent(self.min_keep_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_generation_interval_levels() {
        let rules = RulesConfig::default();
        assert_eq!(rules.generation_interval(1), Fixed::from_num(1000));
        assert_eq!(rules.generation_interval(2), Fixed::from_num(850));
        let level3 = rules.generation_interval(3);
        assert!((level3 - Fixed::from_num(722.5)).abs() < Fixed::from_num(0.001));
    }

    #[test]
    fn test_interval_floor_is_one_ms() {
        let rules = RulesConfig {
            base_generation_interval_ms: 10,
            level_speedup_percent: 1,
            max_level: 200,
            ..RulesConfig::default()
        };
        assert!(rules.validate().is_ok());
        assert_eq!(rules.generation_interval(200), Fixed::ONE);
    }

    #[test]
    fn test_flat_interval_without_upgrades() {
        let rules = RulesConfig {
            upgrades_enabled: false,
            ..RulesConfig::default()
        };
        assert_eq!(rules.generation_interval(3), Fixed::from_num(1000));
    }

    #[test]
    fn test_upgrade_cost() {
        let rules = RulesConfig::default();
        assert_eq!(rules.upgrade_cost(1), 5);
        assert_eq!(rules.upgrade_cost(2), 10);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let rules = RulesConfig::from_ron_str("RulesConfig(spawn_delay_ms: 80)").unwrap();
        assert_eq!(rules.spawn_delay_ms, 80);
        assert_eq!(rules.troop_speed, 200);
        assert_eq!(rules.ai.threat_radius, 300);
    }

    #[test]
    fn test_invalid_ron_rejected() {
        let inverted = "RulesConfig(spawn_radius_min: 50, spawn_radius_max: 10)";
        let err = RulesConfig::from_ron_str(inverted).unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));

        let err = RulesConfig::from_ron_str("not ron at all (").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_oversized_radius_rejected() {
        let err = RulesConfig::from_ron_str("RulesConfig(capture_radius: 60000)").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(ref m) if m.contains("capture_radius")));

        let edge = format!("RulesConfig(capture_radius: {MAX_RULE_DISTANCE})");
        let rules = RulesConfig::from_ron_str(&edge).unwrap();
        let r = Fixed::from_num(MAX_RULE_DISTANCE);
        assert_eq!(rules.capture_radius_sq(), r * r);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for ron in [
            "RulesConfig(arrival_radius: 46341)",
            "RulesConfig(target_jitter: 5000)",
            "RulesConfig(spawn_radius_min: 10, spawn_radius_max: 99999)",
            "RulesConfig(upgrade_duration_ms: 4000000000)",
            "RulesConfig(troop_speed: 4000000000)",
            "RulesConfig(upgrade_cost_per_level: 4000000000)",
            "RulesConfig(ai: (send_margin_percent: 4000000000))",
        ] {
            let err = RulesConfig::from_ron_str(ron).unwrap_err();
            assert!(matches!(err, GameError::InvalidConfig(_)), "{ron}: {err:?}");
        }
    }

    #[test]
    fn test_unvalidated_rules_saturate() {
        let rules = RulesConfig {
            capture_radius: 60_000,
            upgrade_cost_per_level: u32::MAX,
            ..RulesConfig::default()
        };
        assert_eq!(rules.capture_radius_sq(), Fixed::MAX);
        assert_eq!(rules.upgrade_cost(2), u32::MAX);
    }

    #[test]
    fn test_difficulty_presets() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(Difficulty::Easy.profile().decision_interval_ms, 2000);
        assert_eq!(Difficulty::Hard.profile().decision_interval_ms, 500);
        assert_eq!(Difficulty::Medium.profile().aggressiveness(), percent(70));
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("brutal".parse::<Difficulty>().is_err());
    }
}
