//! Batch match runner for balance testing.
//!
//! Runs many AI-vs-AI matches in parallel using rayon and collects
//! their metrics into a JSON report.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use garrison_core::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::game_runner::{run_game, GameConfig, DEFAULT_MAX_DURATION_MS, DEFAULT_TICK_MS};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to play.
    pub scenario: Scenario,
    /// Number of matches.
    pub game_count: u32,
    /// Worker threads (0 = rayon default).
    pub parallel_games: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Game-time limit per match.
    pub max_duration_ms: u64,
    /// Milliseconds per tick.
    pub tick_ms: u32,
    /// Player autopilot override.
    pub autopilot: Option<Difficulty>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::standard(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            tick_ms: DEFAULT_TICK_MS,
            autopilot: None,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` matches of `scenario`.
    #[must_use]
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the game-time limit.
    #[must_use]
    pub fn with_duration(mut self, max_duration_ms: u64) -> Self {
        self.max_duration_ms = max_duration_ms;
        self
    }

    fn game_config(&self, index: u32) -> GameConfig {
        let seed = self.seed_start.wrapping_add(u64::from(index));
        GameConfig {
            game_id: format!("game_{seed}"),
            seed,
            max_duration_ms: self.max_duration_ms,
            tick_ms: self.tick_ms,
            autopilot: self.autopilot,
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-match metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
    /// Matches that could not be played.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Default report path inside `dir`.
    #[must_use]
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join("batch_results.json")
    }
}

/// A match that failed to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Run a batch of matches.
#[allow(clippy::cast_precision_loss)]
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        scenario = %config.scenario.name,
        games = config.game_count,
        "Starting batch run"
    );

    let play = |i: u32| {
        let game_config = config.game_config(i);
        let result = run_game(&config.scenario, &game_config).map_err(|e| {
            warn!(game = i, error = %e, "Game failed");
            BatchError {
                game_index: i,
                seed: game_config.seed,
                message: e.to_string(),
            }
        });
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % 10 == 0 {
            debug!("Progress: {}/{}", done, config.game_count);
        }
        result
    };

    let results: Vec<Result<GameMetrics, BatchError>> = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(|| (0..config.game_count).into_par_iter().map(play).collect()),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool; using the global pool");
                (0..config.game_count).into_par_iter().map(play).collect()
            }
        }
    } else {
        (0..config.game_count).into_par_iter().map(play).collect()
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioMap;

    fn quick(count: u32) -> BatchConfig {
        BatchConfig::new(Scenario::standard(), count).with_duration(5_000)
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert_eq!(config.scenario.name, "standard");
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(Scenario::generated(), 500)
            .with_seed(12345)
            .with_duration(60_000);

        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.game_config(2).seed, 12347);
        assert_eq!(config.game_config(2).game_id, "game_12347");
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(quick(6));

        assert_eq!(results.games.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 6);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_batch_matches_single_runs() {
        let mut config = quick(3).with_seed(40);
        config.parallel_games = 2;
        let results = run_batch(config.clone());

        for (i, game) in (0u32..).zip(&results.games) {
            let single = run_game(&config.scenario, &config.game_config(i)).unwrap();
            assert_eq!(game, &single);
        }
    }

    #[test]
    fn test_failed_games_are_collected() {
        let mut scenario = Scenario::standard();
        scenario.map = ScenarioMap::Fixed(MapLayout {
            width: 100,
            height: 100,
            buildings: Vec::new(),
        });
        let results = run_batch(BatchConfig::new(scenario, 2));

        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 2);
        assert_eq!(results.errors[1].seed, 1);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(quick(2));

        let dir = tempfile::tempdir().unwrap();
        let path = BatchResults::default_path(dir.path());

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config.scenario.name, "standard");
    }
}
