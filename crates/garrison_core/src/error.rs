//! Error types for the game simulation.
//!
//! Only construction, configuration and snapshot operations can fail.
//! Player and AI commands never produce a [`GameError`]; they are either
//! accepted or ignored (see [`crate::command::CommandOutcome`]).

use thiserror::Error;

use crate::building::BuildingId;

/// Result type alias using [`GameError`].
pub type Result<T, E = GameError> = std::result::Result<T, E>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid building handle.
    #[error("Invalid building ID: {0}")]
    InvalidBuildingId(BuildingId),

    /// A building was placed too close to an existing one.
    #[error("Building at ({x}, {y}) is within {min_separation} units of building {existing}")]
    PlacementTooClose {
        /// X coordinate of the rejected placement.
        x: i32,
        /// Y coordinate of the rejected placement.
        y: i32,
        /// The building it collides with.
        existing: BuildingId,
        /// Required minimum separation in world units.
        min_separation: u32,
    },

    /// A layout produced no buildings.
    #[error("Layout '{0}' contains no buildings")]
    EmptyLayout(String),

    /// Rules configuration rejected.
    #[error("Invalid rules configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse {what}: {message}")]
    DataParseError {
        /// What was being parsed (rules, layout, ...).
        what: String,
        /// Error message.
        message: String,
    },

    /// Snapshot (de)serialization failure.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
