//! Timer-driven AI opponent.
//!
//! Every decision interval the controller walks the buildings its side
//! owns and picks one action per building: upgrade, expand into a neutral
//! building, attack an opposing one, or hold. Decisions are returned as
//! values; the match applies them through the same paths player commands
//! use.
//!
//! # Scoring
//!
//! - threat: `sum (1 - d/radius) * (troops/norm)` over opposing buildings in
//!   range, capped at 1
//! - expansion: `1000/(d+1) * 20/(troops+1)` over neutral buildings the
//!   garrison outnumbers by the expand margin
//! - attack: `1000/(d+1) * 30/(troops+1) * level*2` over opposing buildings
//!   the garrison outnumbers by the attack margin

use serde::{Deserialize, Serialize};

use crate::building::{Building, BuildingId};
use crate::config::{AiProfile, AiTuning, Difficulty, RulesConfig};
use crate::factions::{Faction, Side};
use crate::math::{fixed_serde, percent, Fixed};
use crate::rng::SimRng;

/// One action chosen by an AI decision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiDecision {
    /// Send `count` troops from `source` to `target`.
    Dispatch {
        /// Sending building.
        source: BuildingId,
        /// Target building.
        target: BuildingId,
        /// Troops to send.
        count: u32,
    },
    /// Start an upgrade.
    Upgrade(BuildingId),
}

/// A scored candidate target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetScore {
    /// Candidate building.
    pub building: BuildingId,
    /// Its garrison when scored.
    pub troops: u32,
    /// Higher is better.
    pub score: Fixed,
}

fn troops_fixed(troops: u32) -> Fixed {
    Fixed::saturating_from_num(troops)
}

/// Threat against `own` from `side`'s opponent, in `[0, 1]`.
#[must_use]
pub fn threat_level(
    own: &Building,
    buildings: &[Building],
    side: Side,
    tuning: &AiTuning,
) -> Fixed {
    let radius = Fixed::from_num(tuning.threat_radius);
    let norm = Fixed::from_num(tuning.threat_troop_norm);
    let opponent = side.opponent().faction();

    let mut threat = Fixed::ZERO;
    for other in buildings.iter().filter(|b| b.faction() == opponent) {
        let d = own.position().distance(other.position());
        if d >= radius {
            continue;
        }
        let weight = (Fixed::ONE - d / radius) * (troops_fixed(other.troops()) / norm);
        threat = threat.saturating_add(weight);
        if threat >= Fixed::ONE {
            return Fixed::ONE;
        }
    }
    threat
}

fn sort_descending(targets: &mut [TargetScore]) {
    targets.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.building.cmp(&b.building))
    });
}

fn proximity(own: &Building, other: &Building) -> Fixed {
    let d = own.position().distance(other.position());
    Fixed::from_num(1000) / (d + Fixed::ONE)
}

/// Neutral buildings `own` can take, best first.
#[must_use]
pub fn expansion_targets(
    own: &Building,
    buildings: &[Building],
    tuning: &AiTuning,
) -> Vec<TargetScore> {
    let margin = percent(tuning.expand_margin_percent);
    let strength = troops_fixed(own.troops());

    let mut targets: Vec<_> = buildings
        .iter()
        .filter(|b| b.faction() == Faction::Neutral)
        .filter(|b| strength > troops_fixed(b.troops()).saturating_mul(margin))
        .map(|b| TargetScore {
            building: b.id(),
            troops: b.troops(),
            score: proximity(own, b)
                * (Fixed::from_num(20) / (troops_fixed(b.troops()) + Fixed::ONE)),
        })
        .collect();
    sort_descending(&mut targets);
    targets
}

/// Opposing buildings `own` can attack, best first.
#[must_use]
pub fn attack_targets(
    own: &Building,
    buildings: &[Building],
    side: Side,
    tuning: &AiTuning,
) -> Vec<TargetScore> {
    let margin = percent(tuning.attack_margin_percent);
    let strength = troops_fixed(own.troops());
    let opponent = side.opponent().faction();

    let mut targets: Vec<_> = buildings
        .iter()
        .filter(|b| b.faction() == opponent)
        .filter(|b| strength > troops_fixed(b.troops()).saturating_mul(margin))
        .map(|b| {
            let weakness = Fixed::from_num(30) / (troops_fixed(b.troops()) + Fixed::ONE);
            let value = Fixed::from_num(u32::from(b.level()) * 2);
            TargetScore {
                building: b.id(),
                troops: b.troops(),
                score: proximity(own, b) * weakness * value,
            }
        })
        .collect();
    sort_descending(&mut targets);
    targets
}

/// Most troops a building may send: `max(1, floor(troops * (1 - keep * threat)))`.
#[must_use]
pub fn sendable_cap(troops: u32, keep: Fixed, threat: Fixed) -> u32 {
    let share = (Fixed::ONE - keep * threat).clamp(Fixed::ZERO, Fixed::ONE);
    let cap = (troops_fixed(troops) * share).floor();
    cap.checked_to_num::<u32>().unwrap_or(troops).max(1)
}

/// Troops to send against a garrison: `max(1, min(cap, ceil(garrison * margin)))`.
#[must_use]
pub fn send_amount(cap: u32, target_troops: u32, send_margin: Fixed) -> u32 {
    let wanted = troops_fixed(target_troops).saturating_mul(send_margin).ceil();
    let wanted = wanted.checked_to_num::<u32>().unwrap_or(u32::MAX);
    wanted.min(cap).max(1)
}

/// AI opponent for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiController {
    side: Side,
    difficulty: Difficulty,
    profile: AiProfile,
    #[serde(with = "fixed_serde")]
    timer_ms: Fixed,
}

impl AiController {
    /// Create a controller playing `side`.
    #[must_use]
    pub const fn new(side: Side, difficulty: Difficulty) -> Self {
        Self {
            side,
            difficulty,
            profile: difficulty.profile(),
            timer_ms: Fixed::ZERO,
        }
    }

    /// Side this controller plays.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Current difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Current behavior parameters.
    #[must_use]
    pub const fn profile(&self) -> &AiProfile {
        &self.profile
    }

    /// Switch difficulty. The decision timer keeps running.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.profile = difficulty.profile();
    }

    /// Restart the decision timer.
    pub fn reset(&mut self) {
        self.timer_ms = Fixed::ZERO;
    }

    /// Advance the decision timer; runs at most one decision pass.
    ///
    /// Whole intervals beyond the first are dropped, so a long tick is
    /// not followed by catch-up passes on the next frames.
    pub fn update(
        &mut self,
        elapsed_ms: Fixed,
        buildings: &[Building],
        rules: &RulesConfig,
        rng: &mut SimRng,
    ) -> Vec<AiDecision> {
        let interval = Fixed::from_num(self.profile.decision_interval_ms);
        self.timer_ms = self.timer_ms.saturating_add(elapsed_ms);
        if self.timer_ms < interval {
            return Vec::new();
        }
        self.timer_ms %= interval;
        self.decide(buildings, rules, rng)
    }

    /// Run one decision pass over every building this side owns.
    pub fn decide(
        &self,
        buildings: &[Building],
        rules: &RulesConfig,
        rng: &mut SimRng,
    ) -> Vec<AiDecision> {
        let faction = self.side.faction();
        let mut decisions = Vec::new();

        for own in buildings
            .iter()
            .filter(|b| b.faction() == faction && !b.is_upgrading() && b.troops() > 1)
        {
            if let Some(decision) = self.decide_for(own, buildings, rules, rng) {
                tracing::debug!(side = %self.side, building = %own.id(), ?decision, "AI decision");
                decisions.push(decision);
            }
        }
        decisions
    }

    fn decide_for(
        &self,
        own: &Building,
        buildings: &[Building],
        rules: &RulesConfig,
        rng: &mut SimRng,
    ) -> Option<AiDecision> {
        let tuning = &rules.ai;
        let threat = threat_level(own, buildings, self.side, tuning);
        let cap = sendable_cap(own.troops(), self.profile.min_soldiers_to_keep(), threat);
        if cap <= 1 {
            return None;
        }

        if rules.upgrades_enabled
            && own.level() < rules.max_level
            && own.troops() > tuning.upgrade_min_troops
            && rng.chance(percent(tuning.upgrade_chance_percent))
        {
            return Some(AiDecision::Upgrade(own.id()));
        }

        let send_margin = percent(tuning.send_margin_percent);

        let expansions = expansion_targets(own, buildings, tuning);
        if let Some(best) = expansions.first() {
            if rng.chance(self.profile.expansion_priority()) {
                return Some(AiDecision::Dispatch {
                    source: own.id(),
                    target: best.building,
                    count: send_amount(cap, best.troops, send_margin),
                });
            }
        }

        let attacks = attack_targets(own, buildings, self.side, tuning);
        if let Some(best) = attacks.first() {
            if rng.chance(self.profile.aggressiveness()) {
                return Some(AiDecision::Dispatch {
                    source: own.id(),
                    target: best.building,
                    count: send_amount(cap, best.troops, send_margin),
                });
            }
        }

        None
    }
}
