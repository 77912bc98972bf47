//! Match metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches the events of one match tick by tick;
//! [`GameMetrics`] is the per-match record it produces and
//! [`BatchSummary`] aggregates many of them.

use garrison_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Metrics for one side in a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Troops produced by generation.
    pub generated: u32,
    /// Troops committed through dispatches.
    pub dispatched: u32,
    /// Buildings captured.
    pub captures: u32,
    /// Buildings lost to the other side.
    pub buildings_lost: u32,
    /// Upgrades started.
    pub upgrades: u32,
    /// Buildings owned at the end.
    pub final_buildings: usize,
    /// Troop total at the end.
    pub final_troops: u32,
    /// Largest number of buildings held at once.
    pub peak_buildings: usize,
    /// Game time of the first capture.
    pub first_capture_ms: Option<u64>,
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks played.
    pub duration_ticks: u64,
    /// Game time played.
    pub duration_ms: u64,
    /// Winning side (None = time limit reached).
    pub winner: Option<Side>,
    /// Player metrics.
    pub player: SideMetrics,
    /// Enemy metrics.
    pub enemy: SideMetrics,
    /// Units discarded without resolving.
    pub discarded: u32,
    /// Times the side with more troops changed.
    pub lead_changes: u32,
    /// Final state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create an empty record.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Metrics for `side`.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideMetrics {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }
}

/// Accumulates [`GameMetrics`] while a match runs.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: GameMetrics,
    leader: Option<Side>,
}

impl MetricsCollector {
    /// Start collecting for a match.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            metrics: GameMetrics::new(game_id, scenario, seed),
            leader: None,
        }
    }

    /// Record the events of one tick. `game` is the state after that tick.
    pub fn observe(&mut self, game: &Match, events: &TickEvents) {
        for event in &events.events {
            if let GameEvent::BuildingCaptured {
                previous, new_owner, ..
            } = event
            {
                let winner = self.metrics.side_mut(*new_owner);
                if winner.first_capture_ms.is_none() {
                    winner.first_capture_ms = Some(game.clock_ms());
                }
                if let Some(loser) = previous.side() {
                    self.metrics.side_mut(loser).buildings_lost += 1;
                }
            }
        }

        for side in Side::BOTH {
            let held = game.owned_count(side.faction());
            let metrics = self.metrics.side_mut(side);
            metrics.peak_buildings = metrics.peak_buildings.max(held);
        }

        let aggregates = game.aggregates();
        let leader = match aggregates.player.cmp(&aggregates.enemy) {
            std::cmp::Ordering::Greater => Some(Side::Player),
            std::cmp::Ordering::Less => Some(Side::Enemy),
            std::cmp::Ordering::Equal => self.leader,
        };
        if self.leader.is_some() && leader != self.leader {
            self.metrics.lead_changes += 1;
        }
        self.leader = leader;
    }

    /// Fill in the final figures from `game` and return the record.
    #[must_use]
    pub fn finish(mut self, game: &Match) -> GameMetrics {
        let stats = game.stats();
        let aggregates = game.aggregates();
        for side in Side::BOTH {
            let counters = stats.side(side);
            let held = game.owned_count(side.faction());
            let metrics = self.metrics.side_mut(side);
            metrics.generated = counters.generated;
            metrics.dispatched = counters.dispatched;
            metrics.captures = counters.captures;
            metrics.upgrades = counters.upgrades;
            metrics.final_buildings = held;
            metrics.final_troops = aggregates.get(side.faction());
            metrics.peak_buildings = metrics.peak_buildings.max(held);
        }
        self.metrics.discarded = stats.discarded;
        self.metrics.duration_ticks = game.tick_count();
        self.metrics.duration_ms = game.clock_ms();
        self.metrics.winner = game.winner();
        self.metrics.final_state_hash = game.state_hash();
        self.metrics
    }
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches included.
    pub total_games: usize,
    /// Matches the player side won.
    pub player_wins: usize,
    /// Matches the enemy side won.
    pub enemy_wins: usize,
    /// Matches stopped at the time limit.
    pub unfinished: usize,
    /// Player wins over decided matches.
    pub player_win_rate: f64,
    /// Mean game time of decided matches.
    pub avg_decided_duration_ms: f64,
    /// Mean captures per match, both sides.
    pub avg_captures: f64,
    /// Mean lead changes per match.
    pub avg_lead_changes: f64,
}

impl BatchSummary {
    /// Summarize `games`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        let total_games = games.len();
        let player_wins = games
            .iter()
            .filter(|g| g.winner == Some(Side::Player))
            .count();
        let enemy_wins = games
            .iter()
            .filter(|g| g.winner == Some(Side::Enemy))
            .count();
        let decided = player_wins + enemy_wins;

        let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };
        let decided_ms: u64 = games
            .iter()
            .filter(|g| g.winner.is_some())
            .map(|g| g.duration_ms)
            .sum();
        let captures: u32 = games
            .iter()
            .map(|g| g.player.captures + g.enemy.captures)
            .sum();
        let lead_changes: u32 = games.iter().map(|g| g.lead_changes).sum();

        Self {
            total_games,
            player_wins,
            enemy_wins,
            unfinished: total_games - decided,
            player_win_rate: mean(player_wins as f64, decided),
            avg_decided_duration_ms: mean(decided_ms as f64, decided),
            avg_captures: mean(f64::from(captures), total_games),
            avg_lead_changes: mean(f64::from(lead_changes), total_games),
        }
    }
}
