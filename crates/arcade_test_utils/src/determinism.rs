//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, analytics and cross-platform tests all assume a run is fully
//! reproducible. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`arcade_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Stores and tables are ordered maps; systems iterate in entity order.
//!
//! - **Unseeded randomness**: Aim spread, strafe sides and profile variance
//!   all draw from the run's seeded `ChaCha8Rng`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (weapons, AI, bombs)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full skirmishes are reproducible
//! 4. **Parallel tests**: Running N simulations on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arcade_core::simulation::Simulation;
use arcade_core::time::TickDelta;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use arcade_core::simulation::Simulation;
/// use arcade_core::time::TickDelta;
/// use arcade_test_utils::determinism::verify_determinism;
/// use arcade_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(
///     3,
///     60,
///     || skirmish(42).0,
///     |sim: &mut Simulation| sim.tick(TickDelta::from_millis(16)),
///     |sim: &Simulation| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for [`Simulation`].
///
/// Runs the simulation twice with identical setup and fixed `tick_ms`
/// steps, and reports whether the final state hashes match exactly.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64, tick_ms: u32) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim: &mut Simulation| sim.tick(TickDelta::from_millis(tick_ms)),
        |sim: &Simulation| sim.state_hash(),
    );
    result.is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Each thread builds its own simulation; the context is single-threaded
/// and never crosses a thread boundary. This catches non-determinism that
/// only shows up under different memory layouts or thread scheduling.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64, tick_ms: u32) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick(TickDelta::from_millis(tick_ms));
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// simulations start to differ.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, tick_ms: u32) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    // Check initial state
    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    let dt = TickDelta::from_millis(tick_ms);
    for tick in 1..=num_ticks {
        sim1.tick(dt);
        sim2.tick(dt);

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use arcade_core::data::{AiRole, BombKind, WeaponId};
    use arcade_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// Generate a coordinate inside a 20-tile fixture arena.
    ///
    /// Range: 0 to 639
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (0i32..640i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a tick duration in milliseconds, up to the default cap.
    pub fn arb_tick_ms() -> impl Strategy<Value = u32> {
        1u32..=250u32
    }

    /// Generate a sequence of tick durations.
    pub fn arb_tick_sequence(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(arb_tick_ms(), 1..max_len)
    }

    /// Generate an AI role.
    pub fn arb_ai_role() -> impl Strategy<Value = AiRole> {
        prop_oneof![
            Just(AiRole::Grunt),
            Just(AiRole::Flanker),
            Just(AiRole::Sniper),
            Just(AiRole::Rusher),
        ]
    }

    /// Generate a bomb kind.
    pub fn arb_bomb_kind() -> impl Strategy<Value = BombKind> {
        prop_oneof![
            Just(BombKind::Proximity),
            Just(BombKind::Timed),
            Just(BombKind::Remote),
        ]
    }

    /// Generate one of the builtin weapon ids.
    pub fn arb_weapon_id() -> impl Strategy<Value = WeaponId> {
        prop::sample::select(vec![
            "gun-01", "gun-02", "gun-03", "gun-04", "gun-05", "gun-06", "gun-07", "gun-08", "sniper-gun",
            "autocannon",
        ])
        .prop_map(WeaponId::from)
    }

    /// A scripted input for the player.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TestInput {
        /// Press or release the trigger.
        Trigger(bool),
        /// Request a weapon switch.
        Switch(WeaponId),
        /// Drop a bomb at the player's feet.
        Bomb(BombKind),
        /// Do nothing this tick.
        Wait,
    }

    /// Generate a single input.
    pub fn arb_input() -> impl Strategy<Value = TestInput> {
        prop_oneof![
            any::<bool>().prop_map(TestInput::Trigger),
            arb_weapon_id().prop_map(TestInput::Switch),
            arb_bomb_kind().prop_map(TestInput::Bomb),
            Just(TestInput::Wait),
        ]
    }

    /// Generate a sequence of inputs.
    pub fn arb_input_sequence(max_len: usize) -> impl Strategy<Value = Vec<TestInput>> {
        proptest::collection::vec(arb_input(), 0..max_len)
    }

    /// Generate health values (1-1000).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..1000u32
    }

    /// Generate damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..100u32
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::TestInput;
    use super::*;
    use crate::fixtures::{enemy_params, skirmish, tile_center, ArenaBuilder};
    use arcade_core::data::AiRole;
    use proptest::prelude::*;

    fn apply(sim: &mut Simulation, actor: arcade_core::ecs::EntityId, input: &TestInput) {
        match input {
            TestInput::Trigger(held) => {
                let _ = sim.set_trigger(actor, *held);
            }
            TestInput::Switch(next) => {
                let _ = sim.request_weapon_switch(actor, next.clone());
            }
            TestInput::Bomb(kind) => {
                if let Some(at) = sim.context().position(actor) {
                    let _ = sim.place_bomb(actor, at, *kind);
                }
            }
            TestInput::Wait => {}
        }
    }

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_arena_determinism() {
        assert!(verify_simulation_determinism(|| ArenaBuilder::new(8, 8).build(), 100, 16));
    }

    #[test]
    fn test_skirmish_determinism() {
        assert!(verify_simulation_determinism(|| skirmish(42).0, 200, 16));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert_eq!(find_first_divergence(|| skirmish(7).0, 120, 33), None);
    }

    #[test]
    fn test_seed_changes_outcome() {
        let run = |seed| {
            verify_determinism(
                1,
                50,
                || skirmish(seed).0,
                |sim: &mut Simulation| sim.tick(TickDelta::from_millis(16)),
                |sim: &Simulation| sim.state_hash(),
            )
        };
        let (a, b) = (run(1), run(2));
        assert_ne!(a.hashes, b.hashes);
    }

    #[test]
    fn test_unique_hashes_reports_divergence() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![3, 1, 3],
            ticks: 10,
        };
        assert_eq!(result.unique_hashes(), vec![1, 3]);
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
    }

    // =========================================================================
    // Parallel tests
    // =========================================================================

    #[test]
    fn test_parallel_skirmish_simulations() {
        let result = run_parallel_simulations(|| skirmish(99).0, 4, 150, 16);
        assert_eq!(result.num_sims, 4);
        result.assert_deterministic();
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        /// Any tick sequence replays to the same state.
        #[test]
        fn prop_tick_sequences_are_replayable(steps in strategies::arb_tick_sequence(40)) {
            let run = || {
                let (mut sim, _) = skirmish(5);
                for &ms in &steps {
                    sim.tick(TickDelta::from_millis(ms));
                }
                sim.state_hash()
            };
            prop_assert_eq!(run(), run());
        }

        /// Random player inputs produce identical results when replayed.
        #[test]
        fn prop_input_sequences_are_replayable(inputs in strategies::arb_input_sequence(30)) {
            let run = || {
                let (mut sim, placed) = skirmish(11);
                for input in &inputs {
                    apply(&mut sim, placed.actor, input);
                    sim.tick(TickDelta::from_millis(33));
                }
                sim.state_hash()
            };
            prop_assert_eq!(run(), run());
        }

        /// Any role spawned anywhere stays deterministic.
        #[test]
        fn prop_random_spawns_are_deterministic(
            role in strategies::arb_ai_role(),
            at in strategies::arb_vec2_position(),
        ) {
            let setup = move || {
                let mut sim = ArenaBuilder::new(20, 20).seed(3).build();
                sim.spawn_actor(enemy_params(tile_center(10, 10)));
                let _ = sim.spawn_ai(role, enemy_params(at));
                sim
            };
            prop_assert!(verify_simulation_determinism(setup, 60, 16));
        }
    }

    #[test]
    fn test_roles_cover_stock_profiles() {
        let (sim, _) = skirmish(1);
        for role in [AiRole::Grunt, AiRole::Flanker, AiRole::Sniper, AiRole::Rusher] {
            assert!(sim.context().defs.ai_profile(role).is_ok());
        }
    }
}
