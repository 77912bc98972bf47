//! Troop units: single soldiers travelling between buildings.

use serde::{Deserialize, Serialize};

use crate::building::BuildingId;
use crate::factions::Side;
use crate::math::{Fixed, Vec2Fixed, MS_PER_SECOND};

/// Unique identifier of a troop unit within a match.
pub type TroopId = u64;

/// Outcome of advancing one troop unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TroopStep {
    /// Still travelling.
    Moving,
    /// Within the arrival radius of its target point.
    Reached,
    /// Position update overflowed; the unit must be discarded.
    Fault,
}

/// A soldier moving in a straight line at constant velocity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopUnit {
    /// Unique identifier.
    pub id: TroopId,
    /// Owning side.
    pub owner: Side,
    /// Building this unit was sent to (for in-flight accounting).
    pub destination: BuildingId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Target point (jittered around the destination).
    pub target: Vec2Fixed,
    /// Velocity in world units per second, fixed at creation.
    pub velocity: Vec2Fixed,
    /// False once the unit has arrived or was invalidated.
    pub alive: bool,
}

impl TroopUnit {
    /// Create a unit heading from `source` to `target` at `speed` units per second.
    ///
    /// A unit whose source and target coincide gets zero velocity and
    /// reports [`TroopStep::Reached`] on its first tick.
    #[must_use]
    pub fn new(
        id: TroopId,
        owner: Side,
        destination: BuildingId,
        source: Vec2Fixed,
        target: Vec2Fixed,
        speed: Fixed,
    ) -> Self {
        let velocity = (target - source).normalize().scale(speed);
        Self {
            id,
            owner,
            destination,
            position: source,
            target,
            velocity,
            alive: true,
        }
    }

    /// Advance the unit by `elapsed_ms` and test for arrival.
    ///
    /// A step at least as long as the remaining distance lands the unit on
    /// its target. Otherwise it arrives once the squared distance to the
    /// target drops below `arrival_radius_sq`. Any overflow is a fault.
    pub fn tick(&mut self, elapsed_ms: Fixed, arrival_radius_sq: Fixed) -> TroopStep {
        if self.velocity.is_zero() {
            return TroopStep::Reached;
        }

        let Some(delta) = self.velocity.checked_scale(elapsed_ms / MS_PER_SECOND) else {
            return TroopStep::Fault;
        };
        let Some(remaining_sq) = self.position.checked_distance_squared(self.target) else {
            return TroopStep::Fault;
        };
        // Overshoot: an oversized step saturates and still lands on the target.
        if delta.dot(delta) >= remaining_sq {
            self.position = self.target;
            return TroopStep::Reached;
        }

        let Some(next) = self.position.checked_add(delta) else {
            return TroopStep::Fault;
        };
        self.position = next;

        match self.position.checked_distance_squared(self.target) {
            None => TroopStep::Fault,
            Some(d) if d < arrival_radius_sq => TroopStep::Reached,
            Some(_) => TroopStep::Moving,
        }
    }
}
