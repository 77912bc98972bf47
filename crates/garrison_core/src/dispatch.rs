//! Dispatch service: turning part of a garrison into a stream of troops.
//!
//! A dispatch deducts the troops from the source immediately and
//! schedules one spawn per soldier on the [`SpawnQueue`], staggered by
//! the configured delay. The queue is keyed by virtual match time, so
//! tests advance it deterministically with ordinary ticks.
//!
//! Soldiers waiting in the queue are already committed: aggregate
//! counts include them through [`SpawnQueue::pending_for`], so totals
//! do not dip between the dispatch and the last spawn.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::building::{Building, BuildingId};
use crate::config::RulesConfig;
use crate::factions::Side;
use crate::math::{Fixed, Vec2Fixed};
use crate::rng::SimRng;

/// A soldier waiting to appear on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSpawn {
    /// Match time at which the soldier appears.
    pub due_ms: u64,
    /// Tiebreak for spawns due at the same time (FIFO).
    pub sequence: u64,
    /// Owning side.
    pub side: Side,
    /// Building the soldier was sent from.
    pub source: BuildingId,
    /// Building the soldier is sent to.
    pub destination: BuildingId,
    /// Jittered spawn point near the source.
    pub spawn_at: Vec2Fixed,
    /// Jittered target point near the destination.
    pub target: Vec2Fixed,
}

// Min-heap on (due_ms, sequence): BinaryHeap is a max-heap, so reverse.
impl Ord for PendingSpawn {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for PendingSpawn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered queue of scheduled spawns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnQueue {
    heap: BinaryHeap<PendingSpawn>,
    next_sequence: u64,
}

impl SpawnQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a spawn. The sequence number is assigned here.
    pub fn schedule(&mut self, mut spawn: PendingSpawn) {
        spawn.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(spawn);
    }

    /// Remove and return every spawn due at or before `now_ms`, earliest first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<PendingSpawn> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|s| s.due_ms <= now_ms) {
            if let Some(spawn) = self.heap.pop() {
                due.push(spawn);
            }
        }
        due
    }

    /// Number of scheduled spawns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Soldiers committed by `side` that have not spawned yet.
    #[must_use]
    pub fn pending_for(&self, side: Side) -> u32 {
        let count = self.heap.iter().filter(|s| s.side == side).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Drop every scheduled spawn.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Scheduled spawns in queue order (for hashing and inspection).
    #[must_use]
    pub fn sorted(&self) -> Vec<&PendingSpawn> {
        let mut spawns: Vec<_> = self.heap.iter().collect();
        spawns.sort_by(|a, b| b.cmp(a));
        spawns
    }
}

/// A request to move troops from one building to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOrder {
    /// Side issuing the order; must own the source.
    pub side: Side,
    /// Building to send from.
    pub source: BuildingId,
    /// Building to send to.
    pub target: BuildingId,
    /// Troops requested; clamped to the source garrison.
    pub count: u32,
}

/// Receipt for an accepted dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTicket {
    /// The order as executed.
    pub order: DispatchOrder,
    /// Troops actually committed (after clamping).
    pub sent: u32,
    /// Match time at which the last soldier spawns.
    pub last_spawn_ms: u64,
}

/// Why a dispatch did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchRejection {
    /// Source or target handle does not exist.
    UnknownBuilding(BuildingId),
    /// Source and target are the same building.
    SameBuilding,
    /// The ordering side does not own the source.
    NotOwner,
    /// Nothing left to send after clamping.
    NoTroops,
}

/// Execute a dispatch order.
///
/// Deducts the clamped count from the source right away and schedules
/// one spawn per soldier, `rules.spawn_delay_ms` apart starting at `now_ms`.
pub fn dispatch(
    order: DispatchOrder,
    buildings: &mut [Building],
    queue: &mut SpawnQueue,
    rng: &mut SimRng,
    rules: &RulesConfig,
    now_ms: u64,
) -> Result<DispatchTicket, DispatchRejection> {
    if order.source == order.target {
        return Err(DispatchRejection::SameBuilding);
    }
    let target_pos = buildings
        .get(order.target.index())
        .map(Building::position)
        .ok_or(DispatchRejection::UnknownBuilding(order.target))?;
    let source = buildings
        .get_mut(order.source.index())
        .ok_or(DispatchRejection::UnknownBuilding(order.source))?;

    if !order.side.owns(source.faction()) {
        return Err(DispatchRejection::NotOwner);
    }
    let count = order.count.min(source.troops());
    if count == 0 {
        return Err(DispatchRejection::NoTroops);
    }

    let sent = source.withdraw(count);
    let source_pos = source.position();

    let mut direction = (target_pos - source_pos).normalize();
    if direction.is_zero() {
        direction = Vec2Fixed::new(Fixed::ONE, Fixed::ZERO);
    }

    let delay = u64::from(rules.spawn_delay_ms);
    let radius_min = Fixed::from_num(rules.spawn_radius_min);
    let radius_max = Fixed::from_num(rules.spawn_radius_max);
    let jitter = Fixed::from_num(rules.target_jitter);

    for i in 0..u64::from(sent) {
        let spawn_at = source_pos + arc_offset(direction, radius_min, radius_max, rng);
        let target = target_pos
            + Vec2Fixed::new(rng.signed_unit() * jitter, rng.signed_unit() * jitter);
        queue.schedule(PendingSpawn {
            due_ms: now_ms + i * delay,
            sequence: 0,
            side: order.side,
            source: order.source,
            destination: order.target,
            spawn_at,
            target,
        });
    }

    tracing::debug!(
        side = %order.side,
        source = %order.source,
        target = %order.target,
        requested = order.count,
        sent,
        "Dispatch scheduled"
    );

    Ok(DispatchTicket {
        order,
        sent,
        last_spawn_ms: now_ms + u64::from(sent - 1) * delay,
    })
}

/// Random offset in a 90-degree arc centred on `direction`, at a distance
/// within `[radius_min, radius_max)`.
fn arc_offset(
    direction: Vec2Fixed,
    radius_min: Fixed,
    radius_max: Fixed,
    rng: &mut SimRng,
) -> Vec2Fixed {
    // Bending the heading by up to one perpendicular unit spans ±45°.
    let bend = direction.perpendicular().scale(rng.signed_unit());
    let heading = (direction + bend).normalize();
    heading.scale(rng.range(radius_min, radius_max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Faction;

    fn two_buildings(troops: u32) -> Vec<Building> {
        vec![
            Building::new(BuildingId(0), Vec2Fixed::from_ints(100, 100), Faction::Player, troops),
            Building::new(BuildingId(1), Vec2Fixed::from_ints(400, 100), Faction::Neutral, 5),
        ]
    }

    fn order(count: u32) -> DispatchOrder {
        DispatchOrder {
            side: Side::Player,
            source: BuildingId(0),
            target: BuildingId(1),
            count,
        }
    }

    #[test]
    fn test_dispatch_deducts_and_schedules() {
        let rules = RulesConfig::default();
        let mut buildings = two_buildings(10);
        let mut queue = SpawnQueue::new();
        let mut rng = SimRng::new(1);

        let ticket =
            dispatch(order(4), &mut buildings, &mut queue, &mut rng, &rules, 1000).unwrap();

        assert_eq!(ticket.sent, 4);
        assert_eq!(buildings[0].troops(), 6);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.pending_for(Side::Player), 4);
        assert_eq!(ticket.last_spawn_ms, 1000 + 3 * 50);
    }

    #[test]
    fn test_dispatch_clamps_to_garrison() {
        let rules = RulesConfig::default();
        let mut buildings = two_buildings(3);
        let mut queue = SpawnQueue::new();
        let mut rng = SimRng::new(1);

        let ticket = dispatch(order(50), &mut buildings, &mut queue, &mut rng, &rules, 0).unwrap();
        assert_eq!(ticket.sent, 3);
        assert_eq!(buildings[0].troops(), 0);
    }

    #[test]
    fn test_dispatch_rejections() {
        let rules = RulesConfig::default();
        let mut queue = SpawnQueue::new();
        let mut rng = SimRng::new(1);

        let mut empty = two_buildings(0);
        assert_eq!(
            dispatch(order(5), &mut empty, &mut queue, &mut rng, &rules, 0),
            Err(DispatchRejection::NoTroops)
        );

        let mut buildings = two_buildings(5);
        let same = DispatchOrder {
            target: BuildingId(0),
            ..order(1)
        };
        assert_eq!(
            dispatch(same, &mut buildings, &mut queue, &mut rng, &rules, 0),
            Err(DispatchRejection::SameBuilding)
        );

        let foreign = DispatchOrder {
            side: Side::Enemy,
            ..order(1)
        };
        assert_eq!(
            dispatch(foreign, &mut buildings, &mut queue, &mut rng, &rules, 0),
            Err(DispatchRejection::NotOwner)
        );

        let missing = DispatchOrder {
            target: BuildingId(9),
            ..order(1)
        };
        assert_eq!(
            dispatch(missing, &mut buildings, &mut queue, &mut rng, &rules, 0),
            Err(DispatchRejection::UnknownBuilding(BuildingId(9)))
        );

        assert!(queue.is_empty());
        assert_eq!(buildings[0].troops(), 5);
    }

    #[test]
    fn test_spawn_jitter_bounds() {
        let rules = RulesConfig::default();
        let mut buildings = two_buildings(40);
        let mut queue = SpawnQueue::new();
        let mut rng = SimRng::new(99);
        dispatch(order(40), &mut buildings, &mut queue, &mut rng, &rules, 0).unwrap();

        let source = buildings[0].position();
        let target = buildings[1].position();
        let max_r = Fixed::from_num(rules.spawn_radius_max) + Fixed::ONE;
        let min_r = Fixed::from_num(rules.spawn_radius_min) - Fixed::ONE;
        let jitter = Fixed::from_num(rules.target_jitter);

        for spawn in queue.sorted() {
            let offset = spawn.spawn_at - source;
            let r = offset.length();
            assert!(r >= min_r && r <= max_r, "spawn radius {r:?} out of band");
            // Target lies along +x, so a 90° arc keeps x ahead of |y|.
            assert!(offset.x + Fixed::ONE >= offset.y.abs());

            let t = spawn.target - target;
            assert!(t.x.abs() <= jitter && t.y.abs() <= jitter);
        }
    }

    #[test]
    fn test_queue_drains_in_time_order() {
        let mut queue = SpawnQueue::new();
        for due in [300, 100, 200, 100] {
            queue.schedule(PendingSpawn {
                due_ms: due,
                sequence: 0,
                side: Side::Enemy,
                source: BuildingId(0),
                destination: BuildingId(1),
                spawn_at: Vec2Fixed::ZERO,
                target: Vec2Fixed::ZERO,
            });
        }

        let first = queue.drain_due(150);
        assert_eq!(first.len(), 2);
        assert!(first[0].sequence < first[1].sequence);

        let rest = queue.drain_due(1000);
        assert_eq!(rest.iter().map(|s| s.due_ms).collect::<Vec<_>>(), vec![200, 300]);
        assert!(queue.is_empty());
    }
}
