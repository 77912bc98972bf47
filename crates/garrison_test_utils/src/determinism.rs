//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical
//! results given the same rules, layout, seed and command stream.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism a match must avoid:
//!
//! - **Floating-point math**: we use fixed-point arithmetic via
//!   [`garrison_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: the match keeps buildings and units in
//!   vectors and the spawn queue is ordered by `(due, sequence)`.
//!
//! - **System randomness**: dispatch jitter and AI rolls draw from the
//!   seeded generator the match owns.
//!
//! Commands are replayed from a [`Script`]: a list of [`ScriptStep`]s
//! interleaving ticks and player commands.

use std::thread;

use garrison_core::prelude::*;
use serde::{Deserialize, Serialize};

/// One step of a scripted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Advance the match by this many milliseconds.
    Tick(u32),
    /// `select_building`.
    Select(u32),
    /// `issue_order(source, target)`.
    Order(u32, u32),
    /// `order_selected(target)`.
    OrderSelected(u32),
    /// `request_upgrade`.
    Upgrade(u32),
    /// `set_difficulty`.
    SetDifficulty(Difficulty),
}

impl ScriptStep {
    /// Apply this step to `game`.
    pub fn apply(self, game: &mut Match) {
        match self {
            Self::Tick(ms) => {
                game.tick(ms);
            }
            Self::Select(id) => {
                game.select_building(BuildingId(id));
            }
            Self::Order(source, target) => {
                game.issue_order(BuildingId(source), BuildingId(target));
            }
            Self::OrderSelected(target) => {
                game.order_selected(BuildingId(target));
            }
            Self::Upgrade(id) => {
                game.request_upgrade(BuildingId(id));
            }
            Self::SetDifficulty(difficulty) => {
                game.set_difficulty(difficulty);
            }
        }
    }
}

/// A command stream to replay against a match.
pub type Script = Vec<ScriptStep>;

/// `count` ticks of `ms` each.
#[must_use]
pub fn ticks(count: usize, ms: u32) -> Script {
    vec![ScriptStep::Tick(ms); count]
}

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps replayed.
    pub steps: usize,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, steps: usize) -> Self {
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
        Self {
            is_deterministic,
            hashes,
            steps,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the match was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run `script` against fresh matches from `setup` and compare final hashes.
pub fn verify_determinism<F>(runs: usize, setup: F, script: &[ScriptStep]) -> DeterminismResult
where
    F: Fn() -> Match,
{
    let hashes = (0..runs).map(|_| play(&setup, script)).collect();
    DeterminismResult::from_hashes(hashes, script.len())
}

/// Same as [`verify_determinism`], with every run on its own thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn verify_determinism_parallel<F>(
    runs: usize,
    setup: F,
    script: &[ScriptStep],
) -> DeterminismResult
where
    F: Fn() -> Match + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..runs).map(|_| s.spawn(|| play(&setup, script))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("determinism worker panicked"))
            .collect()
    });
    DeterminismResult::from_hashes(hashes, script.len())
}

fn play<F: Fn() -> Match>(setup: &F, script: &[ScriptStep]) -> u64 {
    let mut game = setup();
    for step in script {
        step.apply(&mut game);
    }
    game.state_hash()
}

/// Replay `script` on two matches side by side, returning the index of
/// the first step after which their hashes differ.
///
/// `Some(0)` means the initial states already differ.
pub fn find_first_divergence<F>(setup: F, script: &[ScriptStep]) -> Option<usize>
where
    F: Fn() -> Match,
{
    let mut a = setup();
    let mut b = setup();
    if a.state_hash() != b.state_hash() {
        return Some(0);
    }
    for (i, step) in script.iter().enumerate() {
        step.apply(&mut a);
        step.apply(&mut b);
        if a.state_hash() != b.state_hash() {
            tracing::debug!(step = i + 1, ?step, "Matches diverged");
            return Some(i + 1);
        }
    }
    None
}

/// Snapshot halfway through `script`, restore, and check the restored
/// match finishes the script in the same state as an uninterrupted run.
pub fn verify_snapshot_determinism<F>(setup: F, script: &[ScriptStep]) -> bool
where
    F: Fn() -> Match,
{
    let (head, tail) = script.split_at(script.len() / 2);
    let mut game = setup();
    for step in head {
        step.apply(&mut game);
    }

    let Ok(bytes) = game.serialize() else {
        return false;
    };
    let Ok(mut restored) = Match::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != game.state_hash() {
        return false;
    }

    for step in tail {
        step.apply(&mut game);
        step.apply(&mut restored);
    }
    restored.state_hash() == game.state_hash()
}

/// Proptest strategies for match testing.
pub mod strategies {
    use garrison_core::prelude::*;
    use proptest::prelude::*;

    use super::ScriptStep;

    /// A difficulty level.
    pub fn arb_difficulty() -> impl Strategy<Value = Difficulty> {
        prop_oneof![
            Just(Difficulty::Easy),
            Just(Difficulty::Medium),
            Just(Difficulty::Hard),
        ]
    }

    /// A tick length between one frame at 240 Hz and a 2 second hitch.
    pub fn arb_tick_ms() -> impl Strategy<Value = u32> {
        prop_oneof![4 => 4u32..50, 1 => 50u32..2000]
    }

    /// One script step addressing buildings `0..building_count`.
    ///
    /// Out-of-range handles are generated on purpose: commands must
    /// ignore them.
    pub fn arb_step(building_count: u32) -> impl Strategy<Value = ScriptStep> {
        let id = 0..=building_count;
        prop_oneof![
            6 => arb_tick_ms().prop_map(ScriptStep::Tick),
            1 => id.clone().prop_map(ScriptStep::Select),
            2 => (id.clone(), id.clone()).prop_map(|(s, t)| ScriptStep::Order(s, t)),
            1 => id.clone().prop_map(ScriptStep::OrderSelected),
            1 => id.prop_map(ScriptStep::Upgrade),
            1 => arb_difficulty().prop_map(ScriptStep::SetDifficulty),
        ]
    }

    /// A script of up to `max_len` steps.
    pub fn arb_script(
        building_count: u32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<ScriptStep>> {
        prop::collection::vec(arb_step(building_count), 1..max_len)
    }

    /// A layout of buildings on a 150-unit grid, so the minimum separation
    /// always holds. The first cell is the player, the second the enemy.
    pub fn arb_layout(max_neutrals: usize) -> impl Strategy<Value = MapLayout> {
        (
            1u32..40,
            1u32..40,
            prop::collection::vec(0u32..30, 0..=max_neutrals),
        )
            .prop_map(|(player, enemy, neutrals)| {
                let cell = |i: usize| {
                    let i = i32::try_from(i).unwrap_or(0);
                    (100 + (i % 6) * 150, 100 + (i / 6) * 150)
                };
                let mut buildings = Vec::new();
                let (x, y) = cell(0);
                buildings.push(BuildingPlacement::new(x, y, Faction::Player, player));
                let (x, y) = cell(1);
                buildings.push(BuildingPlacement::new(x, y, Faction::Enemy, enemy));
                for (i, troops) in neutrals.into_iter().enumerate() {
                    let (x, y) = cell(i + 2);
                    buildings.push(BuildingPlacement::new(x, y, Faction::Neutral, troops));
                }
                MapLayout {
                    width: 1000,
                    height: 1000,
                    buildings,
                }
            })
    }
}
