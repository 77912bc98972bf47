//! Arrival resolution: reinforcement, attrition and capture.
//!
//! Every arriving troop unit is worth exactly one soldier. It joins a
//! friendly garrison or removes one defender; when the defenders run out
//! the building changes hands.

use crate::building::{Arrival, Building, BuildingId};
use crate::factions::{Faction, Side};
use crate::math::{Fixed, Vec2Fixed};
use crate::troop::TroopUnit;

/// Outcome of resolving one arrived troop unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Friendly garrison grew by one.
    Reinforced(BuildingId),
    /// Hostile garrison shrank by one.
    Repelled(BuildingId),
    /// The building changed hands.
    Captured {
        /// Captured building.
        building: BuildingId,
        /// Owner before the capture.
        previous: Faction,
        /// New owner.
        new_owner: Side,
    },
    /// No building near the unit's target point.
    NoBuilding,
}

/// First building (in list order) whose center lies within the capture radius of `point`.
#[must_use]
pub fn building_at(
    buildings: &[Building],
    point: Vec2Fixed,
    capture_radius_sq: Fixed,
) -> Option<usize> {
    buildings
        .iter()
        .position(|b| b.position().distance_squared(point) < capture_radius_sq)
}

/// Apply an arrived unit to the building at its target point.
///
/// The caller removes the unit afterwards regardless of the outcome.
pub fn resolve_arrival(
    buildings: &mut [Building],
    unit: &TroopUnit,
    capture_radius_sq: Fixed,
) -> Resolution {
    let Some(index) = building_at(buildings, unit.target, capture_radius_sq) else {
        return Resolution::NoBuilding;
    };
    let building = &mut buildings[index];
    let id = building.id();

    match building.receive_arrival(unit.owner) {
        Arrival::Reinforced => Resolution::Reinforced(id),
        Arrival::Repelled => Resolution::Repelled(id),
        Arrival::Captured { previous } => {
            tracing::info!(
                building = %id,
                previous = %previous,
                new_owner = %unit.owner,
                garrison = building.troops(),
                "Building captured"
            );
            Resolution::Captured {
                building: id,
                previous,
                new_owner: unit.owner,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture_sq() -> Fixed {
        Fixed::from_num(2500)
    }

    fn arrival(owner: Side, at: Vec2Fixed) -> TroopUnit {
        TroopUnit::new(7, owner, BuildingId(0), at, at, Fixed::from_num(200))
    }

    fn world() -> Vec<Building> {
        vec![
            Building::new(BuildingId(0), Vec2Fixed::from_ints(100, 100), Faction::Player, 2),
            Building::new(BuildingId(1), Vec2Fixed::from_ints(300, 100), Faction::Neutral, 5),
        ]
    }

    #[test]
    fn test_friendly_arrival_reinforces() {
        let mut buildings = world();
        let unit = arrival(Side::Player, Vec2Fixed::from_ints(110, 90));
        assert_eq!(
            resolve_arrival(&mut buildings, &unit, capture_sq()),
            Resolution::Reinforced(BuildingId(0))
        );
        assert_eq!(buildings[0].troops(), 3);
    }

    #[test]
    fn test_neutral_five_falls_to_eight() {
        let mut buildings = world();
        let unit = arrival(Side::Enemy, Vec2Fixed::from_ints(300, 100));

        let results: Vec<_> = (0..8)
            .map(|_| resolve_arrival(&mut buildings, &unit, capture_sq()))
            .collect();

        let captures = results
            .iter()
            .filter(|r| matches!(r, Resolution::Captured { .. }))
            .count();
        assert_eq!(captures, 1);
        assert_eq!(
            results[5],
            Resolution::Captured {
                building: BuildingId(1),
                previous: Faction::Neutral,
                new_owner: Side::Enemy,
            }
        );
        assert_eq!(buildings[1].faction(), Faction::Enemy);
        assert_eq!(buildings[1].troops(), 3);
    }

    #[test]
    fn test_open_ground_is_discarded() {
        let mut buildings = world();
        let unit = arrival(Side::Player, Vec2Fixed::from_ints(200, 300));
        assert_eq!(resolve_arrival(&mut buildings, &unit, capture_sq()), Resolution::NoBuilding);
        assert_eq!(buildings[0].troops(), 2);
        assert_eq!(buildings[1].troops(), 5);
    }

    #[test]
    fn test_first_building_in_range_wins() {
        // Overlapping capture circles only arise from hand-built lists.
        let buildings = vec![
            Building::new(BuildingId(0), Vec2Fixed::from_ints(0, 0), Faction::Neutral, 1),
            Building::new(BuildingId(1), Vec2Fixed::from_ints(40, 0), Faction::Neutral, 1),
        ];
        let point = Vec2Fixed::from_ints(20, 0);
        assert_eq!(building_at(&buildings, point, capture_sq()), Some(0));
    }
}
