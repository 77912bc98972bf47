//! Scenario loading and configuration.
//!
//! Scenarios define the starting map, rules and AI setup of a headless
//! match. They are RON files:
//!
//! ```ron
//! (
//!     name: "Crossroads",
//!     description: "Three neutrals on the center line",
//!     seed: 7,
//!     map: Fixed((
//!         width: 800,
//!         height: 400,
//!         buildings: [
//!             (x: 100, y: 200, faction: Player, troops: 10),
//!             (x: 700, y: 200, faction: Enemy, troops: 10),
//!             (x: 400, y: 200, faction: Neutral, troops: 8),
//!         ],
//!     )),
//!     rules: Some((base_generation_interval_ms: 800)),
//!     difficulty: Hard,
//!     autopilot: Some(Medium),
//! )
//! ```
//!
//! Every field except `name` may be omitted.

use std::path::Path;

use garrison_core::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario describes an invalid match.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// Where a scenario's buildings come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScenarioMap {
    /// [`MapLayout::standard`].
    #[default]
    Standard,
    /// Procedurally generated from the match seed.
    Generated(LayoutConfig),
    /// An explicit list of placements.
    Fixed(MapLayout),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Match seed when none is given on the command line.
    #[serde(default)]
    pub seed: u64,
    /// Starting buildings.
    #[serde(default)]
    pub map: ScenarioMap,
    /// Rules override; omitted fields keep their defaults.
    #[serde(default)]
    pub rules: Option<RulesConfig>,
    /// Opponent difficulty.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// AI difficulty for the player side, if the player is automated.
    #[serde(default)]
    pub autopilot: Option<Difficulty>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::standard()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        tracing::debug!(name = %scenario.name, path = %path.display(), "Loaded scenario");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Resolve a built-in scenario name or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// A built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "generated" => Some(Self::generated()),
            _ => None,
        }
    }

    /// The standard two-base map against a medium opponent.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            description: "Two bases and six neutral buildings".to_string(),
            seed: 0,
            map: ScenarioMap::Standard,
            rules: None,
            difficulty: Difficulty::Medium,
            autopilot: None,
        }
    }

    /// A procedurally generated symmetric map.
    #[must_use]
    pub fn generated() -> Self {
        Self {
            name: "generated".to_string(),
            description: "Symmetric map generated from the seed".to_string(),
            map: ScenarioMap::Generated(LayoutConfig::default()),
            ..Self::standard()
        }
    }

    /// Rules with the override applied.
    #[must_use]
    pub fn rules(&self) -> RulesConfig {
        self.rules.clone().unwrap_or_default()
    }

    /// The starting layout for `seed`.
    pub fn layout(&self, seed: u64) -> Result<MapLayout, ScenarioError> {
        let layout = match &self.map {
            ScenarioMap::Standard => MapLayout::standard(),
            ScenarioMap::Generated(config) => generate_layout(config, &self.rules(), seed)?,
            ScenarioMap::Fixed(layout) => layout.clone(),
        };
        Ok(layout)
    }

    /// Build a match with the scenario's own seed.
    pub fn build_match(&self) -> Result<Match, ScenarioError> {
        self.build_match_with_seed(self.seed)
    }

    /// Build a match with `seed`.
    pub fn build_match_with_seed(&self, seed: u64) -> Result<Match, ScenarioError> {
        let mut game = Match::new(self.rules(), self.layout(seed)?, seed)?;
        game.set_difficulty(self.difficulty);
        game.set_autopilot(self.autopilot);
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CROSSROADS: &str = r#"(
        name: "Crossroads",
        seed: 7,
        map: Fixed((
            width: 800,
            height: 400,
            buildings: [
                (x: 100, y: 200, faction: Player, troops: 10),
                (x: 700, y: 200, faction: Enemy, troops: 10, level: 2),
                (x: 400, y: 200, faction: Neutral, troops: 8),
            ],
        )),
        rules: Some((base_generation_interval_ms: 800)),
        difficulty: Hard,
        autopilot: Some(Easy),
    )"#;

    #[test]
    fn test_parse_full_scenario() {
        let scenario = Scenario::from_ron_str(CROSSROADS).unwrap();
        assert_eq!(scenario.name, "Crossroads");
        assert_eq!(scenario.seed, 7);
        assert_eq!(scenario.difficulty, Difficulty::Hard);
        assert_eq!(scenario.autopilot, Some(Difficulty::Easy));
        assert_eq!(scenario.rules().base_generation_interval_ms, 800);
        assert_eq!(
            scenario.rules().max_level,
            RulesConfig::default().max_level
        );
    }

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_ron_str(r#"(name: "bare")"#).unwrap();
        assert_eq!(scenario.map, ScenarioMap::Standard);
        assert_eq!(scenario.difficulty, Difficulty::Medium);
        assert!(scenario.autopilot.is_none());
        assert_eq!(scenario.rules(), RulesConfig::default());
    }

    #[test]
    fn test_build_match_applies_settings() {
        let scenario = Scenario::from_ron_str(CROSSROADS).unwrap();
        let game = scenario.build_match().unwrap();

        assert_eq!(game.buildings().len(), 3);
        assert_eq!(game.buildings()[1].level(), 2);
        assert_eq!(game.seed(), 7);
        assert_eq!(game.difficulty(), Difficulty::Hard);
        assert_eq!(game.autopilot(), Some(Difficulty::Easy));
    }

    #[test]
    fn test_generated_map_depends_on_seed() {
        let scenario = Scenario::generated();
        let a = scenario.layout(1).unwrap();
        let b = scenario.layout(1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.count(Faction::Player), 1);
        assert_eq!(a.count(Faction::Enemy), 1);
    }

    #[test]
    fn test_invalid_layout_is_reported() {
        let ron = r#"(
            name: "cramped",
            map: Fixed((
                width: 400,
                height: 400,
                buildings: [
                    (x: 100, y: 100, faction: Player, troops: 10),
                    (x: 110, y: 100, faction: Enemy, troops: 10),
                ],
            )),
        )"#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert!(matches!(
            scenario.build_match(),
            Err(ScenarioError::Invalid(GameError::PlacementTooClose { .. }))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CROSSROADS.as_bytes()).unwrap();

        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.name, "Crossroads");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Scenario::load(dir.path().join("nope.ron"));
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_bad_ron() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"(name: ").unwrap();
        assert!(matches!(
            Scenario::load(file.path()),
            Err(ScenarioError::ParseError(_))
        ));
    }

    #[test]
    fn test_resolve_builtin() {
        assert_eq!(Scenario::resolve("standard").unwrap(), Scenario::standard());
        assert_eq!(Scenario::resolve("generated").unwrap().name, "generated");
    }
}
