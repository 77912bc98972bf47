//! Run complete matches without an external controller.
//!
//! Used by `simulate`, `batch` and `verify`: both sides are driven by AI
//! controllers and the match runs until a side wins or the time limit
//! is reached.

use garrison_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};

/// Default game-time limit: 10 minutes.
pub const DEFAULT_MAX_DURATION_MS: u64 = 10 * 60 * 1000;

/// Default tick length, roughly 60 ticks per second.
pub const DEFAULT_TICK_MS: u32 = 16;

/// How to run one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Identifier copied into the metrics.
    pub game_id: String,
    /// Match seed.
    pub seed: u64,
    /// Game-time limit.
    pub max_duration_ms: u64,
    /// Milliseconds per tick.
    pub tick_ms: u32,
    /// Player autopilot; falls back to the scenario's, then medium.
    pub autopilot: Option<Difficulty>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_id: "game_0".to_string(),
            seed: 0,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            tick_ms: DEFAULT_TICK_MS,
            autopilot: None,
        }
    }
}

impl GameConfig {
    /// Config for `seed` with default limits.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            game_id: format!("game_{seed}"),
            seed,
            ..Default::default()
        }
    }
}

/// Play one AI-vs-AI match of `scenario` to completion.
pub fn run_game(scenario: &Scenario, config: &GameConfig) -> Result<GameMetrics, ScenarioError> {
    let mut game = scenario.build_match_with_seed(config.seed)?;
    let autopilot = config
        .autopilot
        .or(scenario.autopilot)
        .unwrap_or(Difficulty::Medium);
    game.set_autopilot(Some(autopilot));

    let tick_ms = config.tick_ms.max(1);
    let mut collector = MetricsCollector::new(&config.game_id, &scenario.name, config.seed);

    while !game.is_over() && game.clock_ms() < config.max_duration_ms {
        let events = game.tick(tick_ms);
        collector.observe(&game, &events);
    }

    let metrics = collector.finish(&game);
    match metrics.winner {
        Some(winner) => tracing::debug!(
            game_id = %config.game_id,
            %winner,
            duration_ms = metrics.duration_ms,
            "Game finished"
        ),
        None => tracing::debug!(
            game_id = %config.game_id,
            duration_ms = metrics.duration_ms,
            "Game hit time limit"
        ),
    }
    Ok(metrics)
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed checked.
    pub seed: u64,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Final tick of each run.
    pub ticks: Vec<u64>,
}

impl VerifyReport {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1]) && self.ticks.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run the same match `runs` times and compare final states.
pub fn verify_determinism(
    scenario: &Scenario,
    config: &GameConfig,
    runs: u32,
) -> Result<VerifyReport, ScenarioError> {
    let mut report = VerifyReport {
        seed: config.seed,
        hashes: Vec::new(),
        ticks: Vec::new(),
    };
    for run in 0..runs {
        let metrics = run_game(scenario, config)?;
        tracing::debug!(run, hash = metrics.final_state_hash, "Verification run");
        report.hashes.push(metrics.final_state_hash);
        report.ticks.push(metrics.duration_ticks);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(seed: u64) -> GameConfig {
        GameConfig {
            max_duration_ms: 20_000,
            ..GameConfig::with_seed(seed)
        }
    }

    #[test]
    fn test_run_game_respects_time_limit() {
        let metrics = run_game(&Scenario::standard(), &short(3)).unwrap();
        assert!(metrics.duration_ms <= 20_000 + u64::from(DEFAULT_TICK_MS));
        assert_eq!(metrics.game_id, "game_3");
        assert_eq!(metrics.scenario, "standard");
        if metrics.winner.is_none() {
            assert!(metrics.duration_ms >= 20_000);
        }
    }

    #[test]
    fn test_run_game_is_repeatable() {
        let a = run_game(&Scenario::standard(), &short(9)).unwrap();
        let b = run_game(&Scenario::standard(), &short(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_both_sides_play() {
        let metrics = run_game(&Scenario::standard(), &short(5)).unwrap();
        assert!(metrics.player.generated > 0);
        assert!(metrics.enemy.generated > 0);
        assert!(metrics.player.dispatched > 0);
        assert!(metrics.enemy.dispatched > 0);
    }

    #[test]
    fn test_verify_determinism() {
        let config = GameConfig {
            max_duration_ms: 5_000,
            ..GameConfig::with_seed(12345)
        };
        let report = verify_determinism(&Scenario::generated(), &config, 3).unwrap();
        assert_eq!(report.hashes.len(), 3);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_mismatched_report() {
        let report = VerifyReport {
            seed: 1,
            hashes: vec![1, 2],
            ticks: vec![10, 10],
        };
        assert!(!report.is_deterministic());
    }
}
