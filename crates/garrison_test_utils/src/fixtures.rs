//! Test fixtures and helpers.
//!
//! Pre-built layouts, rules and matches for consistent testing.

use garrison_core::prelude::*;

/// Default rules with generation slowed to a crawl.
///
/// Garrisons stay exactly where a test put them unless troops arrive.
#[must_use]
pub fn frozen_rules() -> RulesConfig {
    RulesConfig {
        base_generation_interval_ms: 1_000_000,
        ..RulesConfig::default()
    }
}

/// Player base, enemy base and one neutral building on a line.
///
/// Handles: `#0` player at (100, 200), `#1` enemy at (700, 200),
/// `#2` neutral at (400, 200).
#[must_use]
pub fn duel_layout(player: u32, enemy: u32, neutral: u32) -> MapLayout {
    MapLayout {
        width: 800,
        height: 400,
        buildings: vec![
            BuildingPlacement::new(100, 200, Faction::Player, player),
            BuildingPlacement::new(700, 200, Faction::Enemy, enemy),
            BuildingPlacement::new(400, 200, Faction::Neutral, neutral),
        ],
    }
}

/// A duel under [`frozen_rules`].
///
/// # Panics
///
/// Never for the fixed layout; panics only if the fixture itself is broken.
#[must_use]
pub fn frozen_duel(player: u32, enemy: u32, neutral: u32, seed: u64) -> Match {
    Match::new(frozen_rules(), duel_layout(player, enemy, neutral), seed)
        .expect("duel layout is valid")
}

/// Standard map, default rules, medium opponent.
///
/// # Panics
///
/// Panics only if the standard layout is broken.
#[must_use]
pub fn standard_match(seed: u64) -> Match {
    Match::new(RulesConfig::default(), MapLayout::standard(), seed)
        .expect("standard layout is valid")
}

/// Standard map with AI controllers on both sides.
#[must_use]
pub fn ai_duel(seed: u64, player: Difficulty, enemy: Difficulty) -> Match {
    let mut game = standard_match(seed).with_autopilot(player);
    game.set_difficulty(enemy);
    game
}

/// Tick `game` for `total_ms` in steps of `step_ms`, collecting every event.
pub fn run_for(game: &mut Match, total_ms: u32, step_ms: u32) -> Vec<GameEvent> {
    let step = step_ms.max(1);
    let mut events = Vec::new();
    let mut left = total_ms;
    while left > 0 {
        let dt = step.min(left);
        events.extend(game.tick(dt).events);
        left -= dt;
    }
    events
}

/// Sum of every garrison owned by `faction`.
#[must_use]
pub fn garrison_total(game: &Match, faction: Faction) -> u32 {
    game.buildings()
        .iter()
        .filter(|b| b.faction() == faction)
        .map(Building::troops)
        .sum()
}
