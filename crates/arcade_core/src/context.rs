//! Simulation context.
//!
//! Everything a system may touch during a tick lives here: the component
//! store, the event bus, the static definitions, the seeded RNG, the
//! terrain collaborators and the designated actor. One context belongs to
//! one simulation run; nothing is process-wide.

use std::cell::RefCell;
use std::rc::Rc;

use crate::components::Position;
use crate::data::{AiRole, Definitions, ResolvedAiProfile, SimConfig};
use crate::ecs::{ComponentStore, EntityId};
use crate::error::Result;
use crate::events::EventBus;
use crate::math::{Fixed, Vec2Fixed};
use crate::rng::{seeded, SimRng};
use crate::terrain::{TerrainMap, TileHealthStore};
use crate::time::TickDelta;

/// Shared tile health handle. Damage resolution mutates it from a bus
/// listener, so it is reference counted.
pub type SharedTileHealth = Rc<RefCell<dyn TileHealthStore>>;

/// State shared by every system in a run.
pub struct SimContext {
    /// Entities and their records.
    pub store: ComponentStore,
    /// Event channel.
    pub bus: EventBus,
    /// Read-only tuning tables.
    pub defs: Definitions,
    /// Run configuration.
    pub config: SimConfig,
    /// The only randomness source.
    pub rng: SimRng,
    /// Tilemap.
    pub terrain: Box<dyn TerrainMap>,
    /// Destructible tile health.
    pub tile_health: SharedTileHealth,
    /// Entity the AI hunts and interactions are measured from.
    pub actor: Option<EntityId>,
    /// Simulation clock in milliseconds.
    pub clock_ms: Fixed,
    /// Ticks run so far.
    pub tick: u64,
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("store", &self.store)
            .field("bus", &self.bus)
            .field("actor", &self.actor)
            .field("clock_ms", &self.clock_ms)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl SimContext {
    /// Context for a new run.
    #[must_use]
    pub fn new(
        defs: Definitions,
        config: SimConfig,
        terrain: Box<dyn TerrainMap>,
        tile_health: SharedTileHealth,
    ) -> Self {
        Self {
            store: ComponentStore::new(),
            bus: EventBus::new(config.event_log_capacity),
            rng: seeded(config.seed),
            defs,
            config,
            terrain,
            tile_health,
            actor: None,
            clock_ms: Fixed::ZERO,
            tick: 0,
        }
    }

    /// Advance the clock and tick counter.
    pub fn advance_clock(&mut self, dt: TickDelta) {
        self.clock_ms += dt.millis();
        self.tick += 1;
        self.bus.set_clock(self.clock_ms);
    }

    /// Position of an entity, if it has one.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec2Fixed> {
        self.store.get::<Position>(id).map(|p| p.value)
    }

    /// Position of the designated actor.
    #[must_use]
    pub fn actor_position(&self) -> Option<Vec2Fixed> {
        self.actor.and_then(|id| self.position(id))
    }

    /// Resolve an AI profile for a new unit using the run's difficulty,
    /// wave and variance.
    pub fn resolve_ai(&mut self, role: AiRole) -> Result<ResolvedAiProfile> {
        let profile = self.defs.ai_profile(role)?;
        let mods = self.defs.difficulty(self.config.difficulty);
        Ok(profile.resolve(
            &mods,
            &self.defs.wave_scaling,
            self.config.wave,
            self.defs.instance_variance,
            &mut self.rng,
        ))
    }

    /// Context over an open 20 × 20 grid of 32-unit tiles.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use crate::terrain::{TileCell, TileGrid, TileHealthTracker};

        let grid = TileGrid::new(20, 20, Fixed::from_num(32), TileCell::open("grass"));
        Self::new(
            Definitions::builtin(),
            SimConfig::with_seed(7),
            Box::new(grid),
            Rc::new(RefCell::new(TileHealthTracker::new())),
        )
    }
}
