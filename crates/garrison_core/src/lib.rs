//! # Garrison Core
//!
//! Simulation core of a real-time territory-capture game.
//!
//! Buildings generate troops, troops march between buildings, and
//! buildings change hands when their garrison runs out. This crate holds
//! the whole ruleset and nothing else:
//! - No rendering or input
//! - No IO beyond parsing RON strings handed to it
//! - No floating-point math (uses fixed-point)
//! - No system randomness (a seeded generator travels with the match)
//!
//! ## Crate Structure
//!
//! - [`building`] - Garrison, generation and upgrades
//! - [`troop`] - Moving troop units
//! - [`combat`] - Arrival resolution and captures
//! - [`dispatch`] - Staggered troop dispatch
//! - [`ai`] - AI opponent
//! - [`world`] - Match state and the tick loop
//! - [`layout`] - Starting maps
//! - [`config`] - Rules and difficulty presets

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod building;
pub mod combat;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod factions;
pub mod layout;
pub mod math;
pub mod rng;
pub mod troop;
pub mod view;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiController, AiDecision};
    pub use crate::building::{Building, BuildingId};
    pub use crate::command::{CommandOutcome, IgnoreReason};
    pub use crate::config::{AiProfile, AiTuning, Difficulty, RulesConfig};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{DiscardReason, GameEvent, TickEvents};
    pub use crate::factions::{Faction, Side};
    pub use crate::layout::{generate_layout, BuildingPlacement, LayoutConfig, MapLayout};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::troop::{TroopId, TroopUnit};
    pub use crate::view::{BuildingView, TroopView};
    pub use crate::world::{Aggregates, Match, MatchStats, SideStats};
}
