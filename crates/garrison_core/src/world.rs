//! Match state and the per-tick simulation loop.
//!
//! A [`Match`] owns every building, troop unit and scheduled spawn. It is
//! driven by an external clock through [`Match::tick`] and commanded
//! through explicit methods; nothing in it is global.
//!
//! # Tick order
//!
//! 1. Buildings generate troops or progress upgrades
//! 2. Live troop units move
//! 3. Due spawns become troop units, advanced by the rest of the tick
//! 4. Arrived units are resolved against buildings
//! 5. AI controllers run their decision timers
//! 6. Aggregates are recomputed and the terminal condition checked
//!
//! # Example
//!
//! ```
//! use garrison_core::prelude::*;
//!
//! let mut game = Match::new(RulesConfig::default(), MapLayout::standard(), 7).unwrap();
//! game.issue_order(BuildingId(0), BuildingId(2));
//! let events = game.tick(50);
//! assert_eq!(events.tick, 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{AiController, AiDecision};
use crate::building::{Building, BuildingId, UpgradeRequest};
use crate::combat::{resolve_arrival, Resolution};
use crate::command::{CommandOutcome, IgnoreReason};
use crate::config::{Difficulty, RulesConfig};
use crate::dispatch::{dispatch, DispatchOrder, SpawnQueue};
use crate::error::{GameError, Result};
use crate::events::{DiscardReason, GameEvent, TickEvents};
use crate::factions::{Faction, Side};
use crate::layout::MapLayout;
use crate::math::Fixed;
use crate::rng::SimRng;
use crate::troop::{TroopId, TroopStep, TroopUnit};
use crate::view::{BuildingView, TroopView};

/// Total troops per faction: garrisons, live units and unspawned dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregates {
    /// Player total.
    pub player: u32,
    /// Enemy total.
    pub enemy: u32,
    /// Neutral garrisons.
    pub neutral: u32,
}

impl Aggregates {
    /// Total for `faction`.
    #[must_use]
    pub const fn get(&self, faction: Faction) -> u32 {
        match faction {
            Faction::Player => self.player,
            Faction::Enemy => self.enemy,
            Faction::Neutral => self.neutral,
        }
    }

    fn add(&mut self, faction: Faction, count: u32) {
        let slot = match faction {
            Faction::Player => &mut self.player,
            Faction::Enemy => &mut self.enemy,
            Faction::Neutral => &mut self.neutral,
        };
        *slot = slot.saturating_add(count);
    }
}

/// Running counters for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideStats {
    /// Troops produced by generation.
    pub generated: u32,
    /// Troops committed through dispatches.
    pub dispatched: u32,
    /// Buildings captured.
    pub captures: u32,
    /// Upgrades started.
    pub upgrades: u32,
}

/// Counters collected over a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchStats {
    /// Player counters.
    pub player: SideStats,
    /// Enemy counters.
    pub enemy: SideStats,
    /// Units discarded without resolving.
    pub discarded: u32,
}

impl MatchStats {
    /// Counters for `side`.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideStats {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideStats {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }
}

/// One running match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    rules: RulesConfig,
    layout: MapLayout,
    seed: u64,
    buildings: Vec<Building>,
    troops: Vec<TroopUnit>,
    spawns: SpawnQueue,
    rng: SimRng,
    opponent: AiController,
    autopilot: Option<AiController>,
    selection: Option<BuildingId>,
    tick: u64,
    clock_ms: u64,
    next_troop_id: TroopId,
    aggregates: Aggregates,
    winner: Option<Side>,
    stats: MatchStats,
    /// Events raised by commands between ticks.
    #[serde(skip)]
    pending_events: Vec<GameEvent>,
}

impl Match {
    /// Start a match on `layout` with a medium-difficulty opponent.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules are invalid or the layout is empty or
    /// has buildings closer than the minimum separation.
    pub fn new(rules: RulesConfig, layout: MapLayout, seed: u64) -> Result<Self> {
        rules.validate()?;
        let buildings = layout.build(&rules)?;

        let mut game = Self {
            rules,
            layout,
            seed,
            buildings,
            troops: Vec::new(),
            spawns: SpawnQueue::new(),
            rng: SimRng::new(seed),
            opponent: AiController::new(Side::Enemy, Difficulty::default()),
            autopilot: None,
            selection: None,
            tick: 0,
            clock_ms: 0,
            next_troop_id: 0,
            aggregates: Aggregates::default(),
            winner: None,
            stats: MatchStats::default(),
            pending_events: Vec::new(),
        };
        game.recompute_aggregates();
        tracing::info!(seed, buildings = game.buildings.len(), "Match started");
        Ok(game)
    }

    /// Let an AI controller play the player side as well.
    #[must_use]
    pub fn with_autopilot(mut self, difficulty: Difficulty) -> Self {
        self.set_autopilot(Some(difficulty));
        self
    }

    /// Start a fresh match on the initial layout with the initial seed.
    ///
    /// Live units and pending spawns are dropped together, so no
    /// dispatch half-survives. Difficulty settings are kept.
    pub fn reset(&mut self) {
        self.buildings = match self.layout.build(&self.rules) {
            Ok(buildings) => buildings,
            Err(e) => {
                // The layout was validated in `new`; only a later rules edit can get here.
                tracing::warn!(error = %e, "Layout no longer valid; match emptied");
                Vec::new()
            }
        };
        self.troops.clear();
        self.spawns.clear();
        self.rng = SimRng::new(self.seed);
        self.opponent.reset();
        if let Some(autopilot) = self.autopilot.as_mut() {
            autopilot.reset();
        }
        self.selection = None;
        self.tick = 0;
        self.clock_ms = 0;
        self.next_troop_id = 0;
        self.winner = None;
        self.stats = MatchStats::default();
        self.pending_events.clear();
        self.recompute_aggregates();
        tracing::info!(seed = self.seed, "Match reset");
    }

    /// Drop every building, unit and scheduled spawn.
    ///
    /// The match stays valid and tickable; it simply has nothing in it.
    pub fn teardown(&mut self) {
        self.buildings.clear();
        self.troops.clear();
        self.spawns.clear();
        self.selection = None;
        self.pending_events.clear();
        self.recompute_aggregates();
        tracing::debug!("Match torn down");
    }

    /// Advance the match by `elapsed_ms` of game time.
    ///
    /// Does nothing once the match has a winner.
    pub fn tick(&mut self, elapsed_ms: u32) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending_events);
        if self.winner.is_some() {
            return TickEvents {
                tick: self.tick,
                events,
            };
        }

        self.tick += 1;
        self.clock_ms += u64::from(elapsed_ms);
        let dt = Fixed::saturating_from_num(elapsed_ms);

        self.tick_buildings(dt, &mut events);
        let mut arrived = self.tick_troops(dt, &mut events);
        self.spawn_due(&mut arrived, &mut events);
        self.resolve_arrivals(arrived, &mut events);
        self.run_ai(dt, &mut events);

        self.recompute_aggregates();
        if let Some(winner) = self.check_terminal() {
            events.push(GameEvent::MatchEnded { winner });
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Match state hash");
        }

        TickEvents {
            tick: self.tick,
            events,
        }
    }

    fn tick_buildings(&mut self, dt: Fixed, events: &mut Vec<GameEvent>) {
        for building in &mut self.buildings {
            let result = building.tick(dt, &self.rules);
            if result.generated > 0 {
                if let Some(side) = building.faction().side() {
                    let stats = self.stats.side_mut(side);
                    stats.generated = stats.generated.saturating_add(result.generated);
                }
                events.push(GameEvent::SoldierGenerated {
                    building: building.id(),
                    count: result.generated,
                });
            }
            if let Some(level) = result.upgraded_to {
                tracing::debug!(building = %building.id(), level, "Upgrade completed");
                events.push(GameEvent::UpgradeCompleted {
                    building: building.id(),
                    level,
                });
            }
        }
    }

    /// Move live units; returns the ones that reached their target.
    fn tick_troops(&mut self, dt: Fixed, events: &mut Vec<GameEvent>) -> Vec<TroopUnit> {
        let arrival_sq = self.rules.arrival_radius_sq();
        let mut arrived = Vec::new();
        for mut unit in std::mem::take(&mut self.troops) {
            match unit.tick(dt, arrival_sq) {
                TroopStep::Moving => self.troops.push(unit),
                TroopStep::Reached => arrived.push(unit),
                TroopStep::Fault => self.discard_faulty(&unit, events),
            }
        }
        arrived
    }

    fn discard_faulty(&mut self, unit: &TroopUnit, events: &mut Vec<GameEvent>) {
        tracing::warn!(
            troop = unit.id,
            side = %unit.owner,
            "Troop position overflowed; unit discarded"
        );
        self.stats.discarded += 1;
        events.push(GameEvent::TroopDiscarded {
            troop: unit.id,
            reason: DiscardReason::Fault,
        });
    }

    /// Materialize due spawns. Each new unit first moves for the part of
    /// the tick after its due time.
    fn spawn_due(&mut self, arrived: &mut Vec<TroopUnit>, events: &mut Vec<GameEvent>) {
        let speed = Fixed::from_num(self.rules.troop_speed);
        let arrival_sq = self.rules.arrival_radius_sq();

        for spawn in self.spawns.drain_due(self.clock_ms) {
            let id = self.next_troop_id;
            self.next_troop_id += 1;
            let mut unit = TroopUnit::new(
                id,
                spawn.side,
                spawn.destination,
                spawn.spawn_at,
                spawn.target,
                speed,
            );
            events.push(GameEvent::TroopSpawned {
                troop: id,
                side: spawn.side,
            });

            let late = Fixed::saturating_from_num(self.clock_ms - spawn.due_ms);
            match unit.tick(late, arrival_sq) {
                TroopStep::Moving => self.troops.push(unit),
                TroopStep::Reached => arrived.push(unit),
                TroopStep::Fault => self.discard_faulty(&unit, events),
            }
        }
    }

    fn resolve_arrivals(&mut self, arrived: Vec<TroopUnit>, events: &mut Vec<GameEvent>) {
        let capture_sq = self.rules.capture_radius_sq();
        for mut unit in arrived {
            unit.alive = false;
            match resolve_arrival(&mut self.buildings, &unit, capture_sq) {
                Resolution::Reinforced(_) | Resolution::Repelled(_) => {}
                Resolution::Captured {
                    building,
                    previous,
                    new_owner,
                } => {
                    self.stats.side_mut(new_owner).captures += 1;
                    if self.selection == Some(building) && new_owner != Side::Player {
                        self.selection = None;
                    }
                    events.push(GameEvent::BuildingCaptured {
                        building,
                        previous,
                        new_owner,
                    });
                }
                Resolution::NoBuilding => {
                    tracing::debug!(
                        troop = unit.id,
                        "Arrival with no building in range; unit discarded"
                    );
                    self.stats.discarded += 1;
                    events.push(GameEvent::TroopDiscarded {
                        troop: unit.id,
                        reason: DiscardReason::NoBuilding,
                    });
                }
            }
        }
    }

    fn run_ai(&mut self, dt: Fixed, events: &mut Vec<GameEvent>) {
        let decisions = self
            .opponent
            .update(dt, &self.buildings, &self.rules, &mut self.rng);
        self.apply_decisions(Side::Enemy, &decisions, events);

        if let Some(autopilot) = self.autopilot.as_mut() {
            let decisions = autopilot.update(dt, &self.buildings, &self.rules, &mut self.rng);
            self.apply_decisions(Side::Player, &decisions, events);
        }
    }

    fn apply_decisions(
        &mut self,
        side: Side,
        decisions: &[AiDecision],
        events: &mut Vec<GameEvent>,
    ) {
        for decision in decisions {
            let outcome = match *decision {
                AiDecision::Dispatch { source, target, count } => {
                    self.send(side, source, target, count, events)
                }
                AiDecision::Upgrade(building) => self.upgrade(side, building, events),
            };
            if let CommandOutcome::Ignored(reason) = outcome {
                tracing::debug!(%side, ?decision, %reason, "AI decision dropped");
            }
        }
    }

    fn send(
        &mut self,
        side: Side,
        source: BuildingId,
        target: BuildingId,
        count: u32,
        events: &mut Vec<GameEvent>,
    ) -> CommandOutcome {
        let order = DispatchOrder {
            side,
            source,
            target,
            count,
        };
        match dispatch(
            order,
            &mut self.buildings,
            &mut self.spawns,
            &mut self.rng,
            &self.rules,
            self.clock_ms,
        ) {
            Ok(ticket) => {
                let stats = self.stats.side_mut(side);
                stats.dispatched = stats.dispatched.saturating_add(ticket.sent);
                events.push(GameEvent::TroopsDispatched {
                    side,
                    source,
                    target,
                    count: ticket.sent,
                });
                CommandOutcome::Accepted
            }
            Err(rejection) => {
                CommandOutcome::Ignored(IgnoreReason::from_dispatch(rejection, source))
            }
        }
    }

    fn upgrade(
        &mut self,
        side: Side,
        id: BuildingId,
        events: &mut Vec<GameEvent>,
    ) -> CommandOutcome {
        let Some(building) = self.buildings.get_mut(id.index()) else {
            return CommandOutcome::Ignored(IgnoreReason::UnknownBuilding(id));
        };
        if !side.owns(building.faction()) {
            return CommandOutcome::Ignored(IgnoreReason::NotOwned(id));
        }
        let request = building.start_upgrade(&self.rules);
        if let Some(reason) = IgnoreReason::from_upgrade(request, id) {
            return CommandOutcome::Ignored(reason);
        }
        if let UpgradeRequest::Started { cost } = request {
            self.stats.side_mut(side).upgrades += 1;
            events.push(GameEvent::UpgradeStarted { building: id, cost });
        }
        CommandOutcome::Accepted
    }

    fn player_command(
        &mut self,
        name: &str,
        command: impl FnOnce(&mut Self) -> CommandOutcome,
    ) -> CommandOutcome {
        let outcome = if self.winner.is_some() {
            CommandOutcome::Ignored(IgnoreReason::MatchOver)
        } else {
            command(self)
        };
        match outcome {
            CommandOutcome::Accepted => {
                self.recompute_aggregates();
                tracing::debug!(command = name, "Command accepted");
            }
            CommandOutcome::Ignored(reason) => {
                tracing::debug!(command = name, %reason, "Command ignored");
            }
        }
        outcome
    }

    /// Select a player-owned building as the source of the next order.
    pub fn select_building(&mut self, id: BuildingId) -> CommandOutcome {
        self.player_command("select_building", |game| {
            let Some(building) = game.buildings.get(id.index()) else {
                return CommandOutcome::Ignored(IgnoreReason::UnknownBuilding(id));
            };
            if !building.is_interactive() {
                return CommandOutcome::Ignored(IgnoreReason::NotOwned(id));
            }
            game.selection = Some(id);
            CommandOutcome::Accepted
        })
    }

    /// Forget the current selection.
    pub fn clear_selection(&mut self) -> CommandOutcome {
        self.player_command("clear_selection", |game| {
            if game.selection.take().is_none() {
                return CommandOutcome::Ignored(IgnoreReason::NoSelection);
            }
            CommandOutcome::Accepted
        })
    }

    /// Send troops from a player building to any other building.
    ///
    /// Sends `order_send_percent` of the source garrison (at least one troop).
    pub fn issue_order(&mut self, source: BuildingId, target: BuildingId) -> CommandOutcome {
        self.player_command("issue_order", |game| {
            let available = game
                .buildings
                .get(source.index())
                .map_or(0, Building::troops);
            let count = order_amount(available, game.rules.order_send_percent);
            let mut events = Vec::new();
            let outcome = game.send(Side::Player, source, target, count, &mut events);
            game.pending_events.append(&mut events);
            outcome
        })
    }

    /// Order from the selected building, clearing the selection.
    pub fn order_selected(&mut self, target: BuildingId) -> CommandOutcome {
        let selection = if self.winner.is_none() {
            self.selection.take()
        } else {
            None
        };
        match selection {
            Some(source) => self.issue_order(source, target),
            None => self.player_command("order_selected", |_| {
                CommandOutcome::Ignored(IgnoreReason::NoSelection)
            }),
        }
    }

    /// Start an upgrade on a player building.
    pub fn request_upgrade(&mut self, id: BuildingId) -> CommandOutcome {
        self.player_command("request_upgrade", |game| {
            let mut events = Vec::new();
            let outcome = game.upgrade(Side::Player, id, &mut events);
            game.pending_events.append(&mut events);
            outcome
        })
    }

    /// Change the opponent's difficulty. Takes effect on its next decision.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> CommandOutcome {
        self.opponent.set_difficulty(difficulty);
        tracing::debug!(difficulty = difficulty.as_str(), "Opponent difficulty changed");
        CommandOutcome::Accepted
    }

    /// Enable or disable the AI playing the player side.
    pub fn set_autopilot(&mut self, difficulty: Option<Difficulty>) {
        self.autopilot = difficulty.map(|d| AiController::new(Side::Player, d));
    }

    /// Recompute per-faction totals from garrisons, live units and pending spawns.
    pub fn recompute_aggregates(&mut self) {
        let mut totals = Aggregates::default();
        for building in &self.buildings {
            totals.add(building.faction(), building.troops());
        }
        for unit in &self.troops {
            totals.add(unit.owner.faction(), 1);
        }
        for side in Side::BOTH {
            totals.add(side.faction(), self.spawns.pending_for(side));
        }
        self.aggregates = totals;
    }

    /// Decide the match if one side has lost every building.
    ///
    /// Returns the winner the first time the match ends and `None` on
    /// every later call. Both sides at zero buildings does not end it.
    pub fn check_terminal(&mut self) -> Option<Side> {
        if self.winner.is_some() {
            return None;
        }
        let owned = |side: Side| self.buildings.iter().filter(|b| side.owns(b.faction())).count();
        let (player, enemy) = (owned(Side::Player), owned(Side::Enemy));

        let winner = match (player, enemy) {
            (p, 0) if p > 0 => Side::Player,
            (0, e) if e > 0 => Side::Enemy,
            _ => return None,
        };
        self.winner = Some(winner);
        tracing::info!(%winner, tick = self.tick, clock_ms = self.clock_ms, "Match ended");
        Some(winner)
    }

    /// Take events raised by commands since the last tick.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Rules in force.
    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Layout the match started from.
    #[must_use]
    pub const fn layout(&self) -> &MapLayout {
        &self.layout
    }

    /// Seed the match started from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// All buildings in handle order.
    #[must_use]
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// One building by handle.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidBuildingId`] for an unknown handle.
    pub fn building(&self, id: BuildingId) -> Result<&Building> {
        self.buildings
            .get(id.index())
            .ok_or(GameError::InvalidBuildingId(id))
    }

    /// Live troop units.
    #[must_use]
    pub fn troops(&self) -> &[TroopUnit] {
        &self.troops
    }

    /// Soldiers dispatched but not yet spawned.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.spawns.len()
    }

    /// Current totals.
    #[must_use]
    pub const fn aggregates(&self) -> Aggregates {
        self.aggregates
    }

    /// Winner, once decided.
    #[must_use]
    pub const fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Whether the match has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Selected building, if any.
    #[must_use]
    pub const fn selection(&self) -> Option<BuildingId> {
        self.selection
    }

    /// Opponent difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.opponent.difficulty()
    }

    /// Autopilot difficulty, if the player side is AI-controlled.
    #[must_use]
    pub fn autopilot(&self) -> Option<Difficulty> {
        self.autopilot.as_ref().map(AiController::difficulty)
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Game time elapsed in milliseconds.
    #[must_use]
    pub const fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Counters collected so far.
    #[must_use]
    pub const fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Buildings owned by `faction`.
    #[must_use]
    pub fn owned_count(&self, faction: Faction) -> usize {
        self.buildings.iter().filter(|b| b.faction() == faction).count()
    }

    /// Render snapshots of every building.
    #[must_use]
    pub fn building_views(&self) -> Vec<BuildingView> {
        self.buildings
            .iter()
            .map(|b| BuildingView::new(b, self.selection == Some(b.id())))
            .collect()
    }

    /// Render snapshots of every live troop unit.
    #[must_use]
    pub fn troop_views(&self) -> Vec<TroopView> {
        self.troops.iter().map(TroopView::from).collect()
    }

    /// Hash of the simulation state.
    ///
    /// Two matches with the same rules, layout, seed and command stream
    /// hash identically after every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.clock_ms.hash(&mut hasher);
        self.winner.hash(&mut hasher);
        self.selection.hash(&mut hasher);

        self.buildings.len().hash(&mut hasher);
        for b in &self.buildings {
            b.id().hash(&mut hasher);
            b.faction().hash(&mut hasher);
            b.troops().hash(&mut hasher);
            b.level().hash(&mut hasher);
            b.generation_progress_ms().to_bits().hash(&mut hasher);
            b.upgrade_progress().to_bits().hash(&mut hasher);
        }

        self.troops.len().hash(&mut hasher);
        for unit in &self.troops {
            unit.id.hash(&mut hasher);
            unit.owner.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.target.hash(&mut hasher);
        }

        for spawn in self.spawns.sorted() {
            spawn.due_ms.hash(&mut hasher);
            spawn.side.hash(&mut hasher);
            spawn.destination.hash(&mut hasher);
            spawn.spawn_at.hash(&mut hasher);
            spawn.target.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the match into a bincode snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize match: {e}")))
    }

    /// Restore a match from a bincode snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid snapshot.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize match: {e}")))
    }
}

/// Troops a player order sends from a garrison of `available`.
fn order_amount(available: u32, send_percent: u32) -> u32 {
    let share = u64::from(available) * u64::from(send_percent) / 100;
    u32::try_from(share).unwrap_or(available).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BuildingPlacement;
    use crate::math::Vec2Fixed;

    fn duel(player: u32, enemy: u32) -> MapLayout {
        MapLayout {
            width: 800,
            height: 400,
            buildings: vec![
                BuildingPlacement::new(100, 200, Faction::Player, player),
                BuildingPlacement::new(700, 200, Faction::Enemy, enemy),
                BuildingPlacement::new(400, 200, Faction::Neutral, 5),
            ],
        }
    }

    fn quiet_rules() -> RulesConfig {
        // Generation far slower than any test runs.
        RulesConfig {
            base_generation_interval_ms: 1_000_000,
            ..RulesConfig::default()
        }
    }

    // An enemy garrison of 1 never acts: the AI skips single-troop buildings.
    fn new_match(player: u32, enemy: u32) -> Match {
        Match::new(quiet_rules(), duel(player, enemy), 3).unwrap()
    }

    fn run(game: &mut Match, ms: u32, step: u32) -> Vec<GameEvent> {
        let mut all = Vec::new();
        let mut left = ms;
        while left > 0 {
            let dt = step.min(left);
            all.extend(game.tick(dt).events);
            left -= dt;
        }
        all
    }

    #[test]
    fn test_new_rejects_empty_layout() {
        let layout = MapLayout {
            width: 10,
            height: 10,
            buildings: Vec::new(),
        };
        assert!(Match::new(RulesConfig::default(), layout, 1).is_err());
    }

    #[test]
    fn test_new_rejects_far_apart_buildings() {
        let layout = MapLayout {
            width: 1024,
            height: 768,
            buildings: vec![
                BuildingPlacement::new(0, 500, Faction::Player, 10),
                BuildingPlacement::new(60_000, 500, Faction::Enemy, 10),
            ],
        };
        assert!(matches!(
            Match::new(RulesConfig::default(), layout, 1),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_selection_commands() {
        let mut game = new_match(10, 1);

        assert_eq!(
            game.select_building(BuildingId(1)),
            CommandOutcome::Ignored(IgnoreReason::NotOwned(BuildingId(1)))
        );
        assert_eq!(
            game.select_building(BuildingId(9)),
            CommandOutcome::Ignored(IgnoreReason::UnknownBuilding(BuildingId(9)))
        );
        assert!(game.select_building(BuildingId(0)).is_accepted());
        assert_eq!(game.selection(), Some(BuildingId(0)));
        assert!(game.building_views()[0].selected);

        assert!(game.clear_selection().is_accepted());
        assert_eq!(game.selection(), None);
        assert_eq!(
            game.order_selected(BuildingId(2)),
            CommandOutcome::Ignored(IgnoreReason::NoSelection)
        );
    }

    #[test]
    fn test_order_selected_sends_and_clears() {
        let mut game = new_match(10, 1);
        game.select_building(BuildingId(0));

        assert!(game.order_selected(BuildingId(2)).is_accepted());
        assert_eq!(game.selection(), None);
        assert_eq!(game.buildings()[0].troops(), 0);
        assert_eq!(game.pending_spawns(), 10);
        assert_eq!(
            game.drain_events(),
            vec![GameEvent::TroopsDispatched {
                side: Side::Player,
                source: BuildingId(0),
                target: BuildingId(2),
                count: 10,
            }]
        );
    }

    #[test]
    fn test_aggregates_hold_through_dispatch() {
        let mut game = new_match(10, 1);
        assert_eq!(game.aggregates().player, 10);

        game.issue_order(BuildingId(0), BuildingId(1));
        assert_eq!(game.aggregates().player, 10);

        // Spawns trickle out over 450ms; the total never dips meanwhile.
        for _ in 0..10 {
            game.tick(50);
            assert_eq!(game.aggregates().player, 10);
        }
        assert_eq!(game.pending_spawns(), 0);
        assert_eq!(game.troops().len(), 10);
    }

    #[test]
    fn test_dispatch_captures_neutral() {
        let mut game = new_match(10, 1);
        game.issue_order(BuildingId(0), BuildingId(2));

        // 300 units at 200/s, plus the stagger.
        let events = run(&mut game, 2500, 50);

        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameEvent::TroopSpawned { .. }))
            .count();
        assert_eq!(spawned, 10);
        assert!(events.contains(&GameEvent::BuildingCaptured {
            building: BuildingId(2),
            previous: Faction::Neutral,
            new_owner: Side::Player,
        }));
        assert_eq!(game.buildings()[2].faction(), Faction::Player);
        assert_eq!(game.buildings()[2].troops(), 5);
        assert!(game.troops().is_empty());
        assert_eq!(game.stats().player.captures, 1);
    }

    #[test]
    fn test_large_ticks_still_resolve() {
        let mut game = new_match(10, 1);
        game.issue_order(BuildingId(0), BuildingId(2));

        // One huge tick: every spawn is late and overshoots its target.
        let events = game.tick(5000).events;
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::BuildingCaptured { .. })));
        assert!(game.troops().is_empty());
        assert_eq!(game.buildings()[2].troops(), 5);
    }

    #[test]
    fn test_faulty_unit_is_discarded_others_resolve() {
        let mut game = new_match(10, 1);
        game.issue_order(BuildingId(0), BuildingId(2));

        // Every spawn is out by 450ms; none has covered the 300 units yet.
        game.tick(500);
        assert_eq!(game.troops().len(), 10);

        let mut broken = game.troops[0].clone();
        broken.id = 999;
        broken.position = Vec2Fixed::new(Fixed::MAX - Fixed::ONE, Fixed::ZERO);
        game.troops.push(broken);

        let events = run(&mut game, 2500, 50);
        let faults: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::TroopDiscarded { reason: DiscardReason::Fault, .. }))
            .collect();
        assert_eq!(
            faults,
            vec![&GameEvent::TroopDiscarded {
                troop: 999,
                reason: DiscardReason::Fault,
            }]
        );
        assert_eq!(game.stats().discarded, 1);

        // The ten healthy units still arrive and take the neutral.
        assert!(game.troops().is_empty());
        assert_eq!(game.buildings()[2].faction(), Faction::Player);
        assert_eq!(game.buildings()[2].troops(), 5);
        assert_eq!(game.aggregates().player, 5);
    }

    #[test]
    fn test_terminal_fires_once_and_freezes() {
        let mut game = new_match(30, 1);
        game.issue_order(BuildingId(0), BuildingId(1));

        let events = run(&mut game, 5000, 50);
        let endings: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::MatchEnded { .. }))
            .collect();
        assert_eq!(endings, vec![&GameEvent::MatchEnded { winner: Side::Player }]);
        assert_eq!(game.winner(), Some(Side::Player));

        let frozen_tick = game.tick_count();
        let hash = game.state_hash();
        assert!(game.tick(1000).is_empty());
        assert_eq!(game.tick_count(), frozen_tick);
        assert_eq!(game.state_hash(), hash);
        assert_eq!(game.check_terminal(), None);
        assert_eq!(
            game.issue_order(BuildingId(1), BuildingId(2)),
            CommandOutcome::Ignored(IgnoreReason::MatchOver)
        );
    }

    #[test]
    fn test_both_sides_empty_is_not_terminal() {
        let mut game = new_match(10, 1);
        game.teardown();
        assert!(game.buildings().is_empty());
        assert_eq!(game.check_terminal(), None);
        assert!(game.tick(100).is_empty());
        assert_eq!(game.aggregates(), Aggregates::default());
    }

    #[test]
    fn test_reset_restores_layout() {
        let mut game = new_match(10, 1);
        game.set_difficulty(Difficulty::Easy);
        let initial = game.state_hash();
        game.issue_order(BuildingId(0), BuildingId(2));
        run(&mut game, 300, 50);
        assert!(!game.troops().is_empty());

        game.reset();
        assert_eq!(game.state_hash(), initial);
        assert!(game.troops().is_empty());
        assert_eq!(game.pending_spawns(), 0);
        assert_eq!(game.buildings()[0].troops(), 10);
        assert_eq!(game.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn test_upgrade_command() {
        let mut game = new_match(12, 1);
        assert!(game.request_upgrade(BuildingId(0)).is_accepted());
        assert_eq!(
            game.drain_events(),
            vec![GameEvent::UpgradeStarted {
                building: BuildingId(0),
                cost: 5
            }]
        );
        assert_eq!(
            game.request_upgrade(BuildingId(0)),
            CommandOutcome::Ignored(IgnoreReason::AlreadyUpgrading)
        );
        assert_eq!(
            game.request_upgrade(BuildingId(1)),
            CommandOutcome::Ignored(IgnoreReason::NotOwned(BuildingId(1)))
        );

        let events = run(&mut game, 3000, 100);
        assert!(events.contains(&GameEvent::UpgradeCompleted {
            building: BuildingId(0),
            level: 2
        }));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut game = new_match(10, 1);
        game.issue_order(BuildingId(0), BuildingId(2));
        run(&mut game, 200, 50);

        let bytes = game.serialize().unwrap();
        let mut restored = Match::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), game.state_hash());
        assert_eq!(restored.aggregates(), game.aggregates());

        run(&mut game, 1000, 50);
        run(&mut restored, 1000, 50);
        assert_eq!(restored.state_hash(), game.state_hash());
    }

    #[test]
    fn test_order_amount() {
        assert_eq!(order_amount(10, 100), 10);
        assert_eq!(order_amount(10, 50), 5);
        assert_eq!(order_amount(1, 50), 1);
    }
}
