//! JSON protocol for headless match control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controlling agent
//! **Output (stdout):** Responses, events and state snapshots
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. The agent sends commands as JSON lines
//! 3. Each command produces one or more responses
//! 4. When a side wins, `{"type":"game_over",...}` is emitted exactly once
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"order","source":0,"target":2}
//! <- {"type":"ack","cmd":"order"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"events","tick":60,"events":[...]}
//! <- {"type":"ack","cmd":"tick"}
//! -> {"cmd":"upgrade","building":1}
//! <- {"type":"ignored","cmd":"upgrade","reason":"building #1 is not yours"}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":60,"clock_ms":960,...}
//! ```

use garrison_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (agent -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the match by `count` ticks (default: 1).
    Tick {
        /// Number of ticks.
        #[serde(default = "default_tick_count")]
        count: u32,
        /// Milliseconds per tick; the runner default when omitted.
        #[serde(default)]
        ms: Option<u32>,
    },

    /// Query current match state without advancing time.
    Query,

    /// Select a player building.
    Select {
        /// Building handle.
        building: u32,
    },

    /// Send troops from `source` to `target`.
    Order {
        /// Sending building.
        source: u32,
        /// Destination building.
        target: u32,
    },

    /// Send troops from the selected building to `target`.
    OrderSelected {
        /// Destination building.
        target: u32,
    },

    /// Start upgrading a player building.
    Upgrade {
        /// Building handle.
        building: u32,
    },

    /// Change the opponent difficulty (`easy`, `medium`, `hard`).
    SetDifficulty {
        /// Difficulty name.
        difficulty: String,
    },

    /// Restart the match from its initial layout.
    Reset,

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> agent)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
    },

    /// A command was applied.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// A well-formed command was rejected by the match; nothing changed.
    Ignored {
        /// Command name.
        cmd: String,
        /// Why it was ignored.
        reason: String,
    },

    /// The line could not be processed.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, when the line parsed.
        cmd: Option<String>,
    },

    /// Full match state.
    State(Box<MatchState>),

    /// Events raised while ticking.
    Events {
        /// Tick after the batch.
        tick: u64,
        /// Events in order.
        events: Vec<GameEvent>,
    },

    /// The match has ended.
    GameOver {
        /// Outcome from the player's point of view.
        result: GameResult,
        /// Ticks played.
        ticks: u64,
        /// Game time played.
        clock_ms: u64,
        /// Match counters.
        stats: MatchStats,
    },

    /// State hash for determinism verification.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash of the simulation state.
        hash: u64,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Snapshot of the whole match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Current tick.
    pub tick: u64,
    /// Game time in milliseconds.
    pub clock_ms: u64,
    /// Every building in handle order.
    pub buildings: Vec<BuildingState>,
    /// Every live troop unit.
    pub troops: Vec<TroopState>,
    /// Troop totals per faction.
    pub aggregates: Aggregates,
    /// Troops dispatched but not yet spawned.
    pub pending_spawns: usize,
    /// Selected building.
    pub selection: Option<u32>,
    /// Opponent difficulty.
    pub difficulty: String,
    /// Match status.
    pub status: GameStatus,
    /// State hash.
    pub hash: u64,
}

impl MatchState {
    /// Capture the state of `game`.
    #[must_use]
    pub fn capture(game: &Match) -> Self {
        Self {
            tick: game.tick_count(),
            clock_ms: game.clock_ms(),
            buildings: game.building_views().iter().map(BuildingState::from).collect(),
            troops: game.troop_views().iter().map(TroopState::from).collect(),
            aggregates: game.aggregates(),
            pending_spawns: game.pending_spawns(),
            selection: game.selection().map(|id| id.0),
            difficulty: game.difficulty().as_str().to_string(),
            status: GameStatus::of(game),
            hash: game.state_hash(),
        }
    }
}

/// State of a single building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingState {
    /// Handle.
    pub id: u32,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Owner.
    pub faction: Faction,
    /// Garrison.
    pub troops: u32,
    /// Level.
    pub level: u8,
    /// Upgrade completion in `[0, 1]`.
    pub upgrade_progress: f64,
    /// Selected by the player.
    pub selected: bool,
}

impl From<&BuildingView> for BuildingState {
    fn from(view: &BuildingView) -> Self {
        Self {
            id: view.id.0,
            x: view.position.x.to_num(),
            y: view.position.y.to_num(),
            faction: view.faction,
            troops: view.troops,
            level: view.level,
            upgrade_progress: view.upgrade_progress.to_num(),
            selected: view.selected,
        }
    }
}

/// State of a single troop unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopState {
    /// Handle.
    pub id: u64,
    /// Position x.
    pub x: f64,
    /// Position y.
    pub y: f64,
    /// Owner.
    pub owner: Side,
}

impl From<&TroopView> for TroopState {
    fn from(view: &TroopView) -> Self {
        Self {
            id: view.id,
            x: view.position.x.to_num(),
            y: view.position.y.to_num(),
            owner: view.owner,
        }
    }
}

/// Current match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// No winner yet.
    InProgress,
    /// The player won.
    Victory,
    /// The enemy won.
    Defeat,
}

impl GameStatus {
    /// Status of `game`.
    #[must_use]
    pub fn of(game: &Match) -> Self {
        match game.winner() {
            None => Self::InProgress,
            Some(Side::Player) => Self::Victory,
            Some(Side::Enemy) => Self::Defeat,
        }
    }
}

/// Match result from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    /// The player won.
    Victory,
    /// The enemy won.
    Defeat,
}

impl From<Side> for GameResult {
    fn from(winner: Side) -> Self {
        match winner {
            Side::Player => Self::Victory,
            Side::Enemy => Self::Defeat,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Map a command outcome to `ack` or `ignored`.
    #[must_use]
    pub fn outcome(cmd: &str, outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Accepted => Self::ack(cmd),
            CommandOutcome::Ignored(reason) => Self::Ignored {
                cmd: cmd.to_string(),
                reason: reason.to_string(),
            },
        }
    }

    /// Full state of `game`.
    #[must_use]
    pub fn state(game: &Match) -> Self {
        Self::State(Box::new(MatchState::capture(game)))
    }

    /// Game-over summary of `game`, if it has a winner.
    #[must_use]
    pub fn game_over(game: &Match) -> Option<Self> {
        game.winner().map(|winner| Self::GameOver {
            result: winner.into(),
            ticks: game.tick_count(),
            clock_ms: game.clock_ms(),
            stats: *game.stats(),
        })
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name for acknowledgments.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Select { .. } => "select",
            Self::Order { .. } => "order",
            Self::OrderSelected { .. } => "order_selected",
            Self::Upgrade { .. } => "upgrade",
            Self::SetDifficulty { .. } => "set_difficulty",
            Self::Reset => "reset",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
