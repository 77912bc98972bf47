//! Map layouts: where buildings stand when a match starts.
//!
//! A layout is plain data. It can be written by hand (RON), taken from
//! the built-in [`MapLayout::standard`] preset, or generated from a seed
//! with [`generate_layout`], which mirrors every placement through the
//! map center so both sides start on equal terms.

use serde::{Deserialize, Serialize};

use crate::building::{Building, BuildingId};
use crate::config::RulesConfig;
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{Fixed, Vec2Fixed};
use crate::rng::SimRng;

/// Largest accepted map width, map height or coordinate magnitude.
pub const MAX_MAP_EXTENT: u32 = 10_000;

fn default_level() -> u8 {
    1
}

/// One building in a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingPlacement {
    /// World x coordinate of the center.
    pub x: i32,
    /// World y coordinate of the center.
    pub y: i32,
    /// Starting owner.
    pub faction: Faction,
    /// Starting garrison.
    pub troops: u32,
    /// Starting level (ignored for neutral buildings).
    #[serde(default = "default_level")]
    pub level: u8,
}

impl BuildingPlacement {
    /// A level-1 placement.
    #[must_use]
    pub const fn new(x: i32, y: i32, faction: Faction, troops: u32) -> Self {
        Self {
            x,
            y,
            faction,
            troops,
            level: 1,
        }
    }

    /// Center as a fixed-point vector.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.x, self.y)
    }
}

/// The starting state of a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayout {
    /// Map width in world units.
    pub width: u32,
    /// Map height in world units.
    pub height: u32,
    /// Buildings in handle order.
    pub buildings: Vec<BuildingPlacement>,
}

impl MapLayout {
    /// The default two-base map with six neutral buildings.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            width: 1024,
            height: 768,
            buildings: vec![
                BuildingPlacement::new(150, 384, Faction::Player, 10),
                BuildingPlacement::new(874, 384, Faction::Enemy, 10),
                BuildingPlacement::new(320, 180, Faction::Neutral, 5),
                BuildingPlacement::new(704, 588, Faction::Neutral, 5),
                BuildingPlacement::new(320, 588, Faction::Neutral, 8),
                BuildingPlacement::new(704, 180, Faction::Neutral, 8),
                BuildingPlacement::new(512, 300, Faction::Neutral, 15),
                BuildingPlacement::new(512, 468, Faction::Neutral, 15),
            ],
        }
    }

    /// Parse a layout from RON and check it against `rules`.
    pub fn from_ron_str(ron: &str, rules: &RulesConfig) -> Result<Self> {
        let layout: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            what: "layout".to_string(),
            message: e.to_string(),
        })?;
        layout.validate(rules)?;
        Ok(layout)
    }

    /// Reject empty or oversized layouts and buildings closer than the
    /// minimum separation.
    ///
    /// Sizes and coordinates are capped at [`MAX_MAP_EXTENT`], which keeps
    /// every squared distance on the map inside `Fixed`.
    pub fn validate(&self, rules: &RulesConfig) -> Result<()> {
        if self.buildings.is_empty() {
            return Err(GameError::EmptyLayout(format!("{}x{}", self.width, self.height)));
        }
        if self.width > MAX_MAP_EXTENT || self.height > MAX_MAP_EXTENT {
            return Err(GameError::InvalidConfig(format!(
                "map {}x{} exceeds {MAX_MAP_EXTENT} units",
                self.width, self.height
            )));
        }
        if let Some(far) = self.buildings.iter().find(|p| {
            p.x.unsigned_abs() > MAX_MAP_EXTENT || p.y.unsigned_abs() > MAX_MAP_EXTENT
        }) {
            return Err(GameError::InvalidConfig(format!(
                "building at ({}, {}) lies beyond {MAX_MAP_EXTENT} units",
                far.x, far.y
            )));
        }
        let min_sq = rules.min_separation_sq();
        for (i, placement) in self.buildings.iter().enumerate() {
            let pos = placement.position();
            if let Some(existing) = self.buildings[..i]
                .iter()
                .position(|other| other.position().distance_squared(pos) < min_sq)
            {
                return Err(GameError::PlacementTooClose {
                    x: placement.x,
                    y: placement.y,
                    existing: handle(existing)?,
                    min_separation: rules.min_building_separation,
                });
            }
        }
        Ok(())
    }

    /// Instantiate the buildings, handles assigned in list order.
    pub fn build(&self, rules: &RulesConfig) -> Result<Vec<Building>> {
        self.validate(rules)?;
        self.buildings
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Ok(Building::new(handle(i)?, p.position(), p.faction, p.troops).with_level(p.level))
            })
            .collect()
    }

    /// Number of buildings each faction starts with.
    #[must_use]
    pub fn count(&self, faction: Faction) -> usize {
        self.buildings.iter().filter(|b| b.faction == faction).count()
    }
}

fn handle(index: usize) -> Result<BuildingId> {
    u32::try_from(index)
        .map(BuildingId)
        .map_err(|_| GameError::InvalidConfig(format!("too many buildings: {index}")))
}

/// Parameters for [`generate_layout`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Map width in world units.
    pub width: u32,
    /// Map height in world units.
    pub height: u32,
    /// Distance kept between buildings and the map edge.
    pub padding: u32,
    /// Mirrored pairs of neutral buildings.
    pub neutral_pairs: u32,
    /// Starting garrison of each base.
    pub base_troops: u32,
    /// Smallest neutral garrison.
    pub neutral_troops_min: u32,
    /// Largest neutral garrison.
    pub neutral_troops_max: u32,
    /// Placement attempts per neutral pair before giving up on it.
    pub attempts_per_pair: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            padding: 80,
            neutral_pairs: 4,
            base_troops: 10,
            neutral_troops_min: 3,
            neutral_troops_max: 15,
            attempts_per_pair: 32,
        }
    }
}

/// Generate a layout with 180-degree rotational symmetry.
///
/// Bases face each other near the left and right edges. Each neutral
/// building has a twin mirrored through the center with the same
/// garrison. Pairs that cannot be placed within `attempts_per_pair` tries
/// are skipped, so the result may hold fewer neutrals than requested.
pub fn generate_layout(config: &LayoutConfig, rules: &RulesConfig, seed: u64) -> Result<MapLayout> {
    let mut rng = SimRng::new(seed);
    let width = i32::try_from(config.width)
        .map_err(|_| GameError::InvalidConfig("layout width too large".to_string()))?;
    let height = i32::try_from(config.height)
        .map_err(|_| GameError::InvalidConfig("layout height too large".to_string()))?;
    let padding = i32::try_from(config.padding)
        .map_err(|_| GameError::InvalidConfig("layout padding too large".to_string()))?;
    if 2 * padding >= width || 2 * padding >= height {
        return Err(GameError::InvalidConfig(
            "layout padding leaves no room for buildings".to_string(),
        ));
    }

    let mirror = |x: i32, y: i32| (width - x, height - y);
    let min_sq = rules.min_separation_sq();
    let fits = |placed: &[BuildingPlacement], x: i32, y: i32| {
        let pos = Vec2Fixed::from_ints(x, y);
        placed
            .iter()
            .all(|p| p.position().distance_squared(pos) >= min_sq)
    };

    let band = Fixed::from_num(padding / 2);
    let base_x = padding + rng.range(Fixed::ZERO, band).to_num::<i32>();
    let base_y = height / 2 + rng.range(-band, band).to_num::<i32>();
    let (enemy_x, enemy_y) = mirror(base_x, base_y);

    let mut buildings = vec![
        BuildingPlacement::new(base_x, base_y, Faction::Player, config.base_troops),
        BuildingPlacement::new(enemy_x, enemy_y, Faction::Enemy, config.base_troops),
    ];

    let troops_min = Fixed::from_num(config.neutral_troops_min);
    let troops_max = Fixed::from_num(config.neutral_troops_max) + Fixed::ONE;

    for pair in 0..config.neutral_pairs {
        let mut placed = false;
        for _ in 0..config.attempts_per_pair {
            let x = rng
                .range(Fixed::from_num(padding), Fixed::from_num(width - padding))
                .to_num::<i32>();
            let y = rng
                .range(Fixed::from_num(padding), Fixed::from_num(height - padding))
                .to_num::<i32>();
            let (mx, my) = mirror(x, y);

            let twin_gap =
                Vec2Fixed::from_ints(x, y).distance_squared(Vec2Fixed::from_ints(mx, my));
            if twin_gap < min_sq || !fits(&buildings, x, y) || !fits(&buildings, mx, my) {
                continue;
            }

            let troops = rng.range(troops_min, troops_max).to_num::<u32>();
            buildings.push(BuildingPlacement::new(x, y, Faction::Neutral, troops));
            buildings.push(BuildingPlacement::new(mx, my, Faction::Neutral, troops));
            placed = true;
            break;
        }
        if !placed {
            tracing::debug!(pair, seed, "Skipped neutral pair: no free spot");
        }
    }

    let layout = MapLayout {
        width: config.width,
        height: config.height,
        buildings,
    };
    layout.validate(rules)?;
    tracing::debug!(seed, buildings = layout.buildings.len(), "Generated layout");
    Ok(layout)
}
