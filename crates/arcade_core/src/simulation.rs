//! Simulation facade.
//!
//! [`Simulation`] owns one run's [`SimContext`] and the system pipeline,
//! with the stock systems registered at fixed priorities. The host game
//! loop calls [`Simulation::tick`] once per frame and forwards player input
//! through the command methods.
//!
//! # Determinism
//!
//! All state advanced here is fixed-point, every iteration is in ascending
//! entity order and the only randomness is the context's seeded RNG. Two
//! simulations built from the same definitions, config and terrain and fed
//! the same ticks and commands report the same [`Simulation::state_hash`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use arcade_core::data::{Definitions, SimConfig};
//! use arcade_core::math::{Fixed, Vec2Fixed};
//! use arcade_core::simulation::{Simulation, SpawnParams};
//! use arcade_core::terrain::{TileCell, TileGrid, TileHealthTracker};
//! use arcade_core::time::TickDelta;
//!
//! let grid = TileGrid::new(16, 16, Fixed::from_num(32), TileCell::open("grass"));
//! let mut sim = Simulation::new(
//!     Definitions::builtin(),
//!     SimConfig::with_seed(1),
//!     Box::new(grid),
//!     Rc::new(RefCell::new(TileHealthTracker::new())),
//! );
//! sim.spawn_actor(SpawnParams::at(Vec2Fixed::from_ints(64, 64)));
//! sim.tick(TickDelta::from_millis(16));
//! assert_eq!(sim.tick_count(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::ai::AiSystem;
use crate::beam::BeamSystem;
use crate::bomb::{self, BombSystem};
use crate::collision::CollisionSystem;
use crate::components::{Ai, Aim, Collider, Health, Heading, Mobility, Position, TileObjectLink, Velocity, Weapon};
use crate::context::{SharedTileHealth, SimContext};
use crate::damage::{install_tile_damage, EntityDamageSystem};
use crate::data::{AiRole, BombKind, Definitions, SimConfig, WeaponId};
use crate::ecs::EntityId;
use crate::error::{GameError, Result};
use crate::events::EventRecord;
use crate::interaction::InteractionSystem;
use crate::math::{Fixed, Vec2Fixed};
use crate::projectile::{resolve_contact, Contact, ContactOutcome, ProjectileSystem};
use crate::rng::random_sign;
use crate::scheduler::Scheduler;
use crate::terrain::{TerrainMap, TileCoord};
use crate::time::TickDelta;
use crate::weapon::{self, WeaponSystem};

/// Optional components for a spawned body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnParams {
    /// World position.
    pub position: Vec2Fixed,
    /// Maximum health; `None` means the body cannot be damaged.
    pub health: Option<u32>,
    /// Hit radius for the built-in collision system.
    pub collider_radius: Option<Fixed>,
    /// Top speed; `None` means the body never moves on its own.
    pub max_speed: Option<Fixed>,
    /// Equipped weapon.
    pub weapon: Option<WeaponId>,
}

impl SpawnParams {
    /// Bare body at `position`.
    #[must_use]
    pub fn at(position: Vec2Fixed) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// One simulation run.
///
/// # System Execution Order
///
/// | priority | system          |
/// |----------|-----------------|
/// | 10       | ai              |
/// | 20       | weapon          |
/// | 25       | collision       |
/// | 30       | projectile      |
/// | 35       | bomb            |
/// | 40       | beam            |
/// | 50       | entity_damage   |
/// | 60       | interaction     |
///
/// Tile damage is resolved by a `projectile:hit` listener the moment the
/// hit is reported.
pub struct Simulation {
    ctx: SimContext,
    scheduler: Scheduler,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("ctx", &self.ctx)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Simulation {
    /// Create a run with the stock systems registered.
    #[must_use]
    pub fn new(
        defs: Definitions,
        config: SimConfig,
        terrain: Box<dyn TerrainMap>,
        tile_health: SharedTileHealth,
    ) -> Self {
        let ctx = SimContext::new(defs, config, terrain, tile_health);
        install_tile_damage(&ctx.bus, Rc::clone(&ctx.tile_health));

        let mut scheduler = Scheduler::new();
        scheduler.add_system(Box::new(AiSystem::new()));
        scheduler.add_system(Box::new(WeaponSystem));
        scheduler.add_system(Box::new(CollisionSystem));
        scheduler.add_system(Box::new(ProjectileSystem));
        scheduler.add_system(Box::new(BombSystem));
        scheduler.add_system(Box::new(BeamSystem));
        scheduler.add_system(Box::new(EntityDamageSystem::install(&ctx.bus)));
        scheduler.add_system(Box::new(InteractionSystem));

        Self { ctx, scheduler }
    }

    /// The run's context.
    #[must_use]
    pub const fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Mutable access to the run's context.
    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    /// The system pipeline, for registering or disabling systems.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.ctx.tick
    }

    /// Simulation clock in milliseconds.
    #[must_use]
    pub const fn clock_ms(&self) -> Fixed {
        self.ctx.clock_ms
    }

    /// Advance the simulation by `dt`, capped at the configured maximum.
    pub fn tick(&mut self, dt: TickDelta) {
        let dt = dt.capped(self.ctx.config.max_tick());
        self.ctx.advance_clock(dt);
        self.scheduler.run(&mut self.ctx, dt);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.ctx.tick, state_hash = hash, "Simulation state hash");
        }
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Spawn a body with the requested components.
    pub fn spawn(&mut self, params: SpawnParams) -> EntityId {
        let store = &mut self.ctx.store;
        let id = store.create();
        store.attach(id, Position::new(params.position));
        store.attach(id, Velocity::ZERO);
        store.attach(id, Heading::default());
        store.attach(id, Aim::default());
        if let Some(max) = params.health {
            store.attach(id, Health::new(max));
        }
        if let Some(radius) = params.collider_radius {
            store.attach(id, Collider { radius });
        }
        if let Some(max_speed) = params.max_speed {
            store.attach(id, Mobility { max_speed });
        }
        if let Some(def) = params.weapon {
            store.attach(id, Weapon::new(def));
        }
        id
    }

    /// Spawn the body the AI hunts and interactions are measured from.
    pub fn spawn_actor(&mut self, params: SpawnParams) -> EntityId {
        let id = self.spawn(params);
        self.ctx.actor = Some(id);
        id
    }

    /// Spawn an AI unit of `role`, resolving its profile for the run's
    /// difficulty and wave.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownAiRole`] if no profile exists for `role`,
    /// or [`GameError::UnknownWeapon`] for an unknown weapon.
    pub fn spawn_ai(&mut self, role: AiRole, params: SpawnParams) -> Result<EntityId> {
        if let Some(def) = &params.weapon {
            self.ctx.defs.weapon(def)?;
        }
        let profile = self.ctx.resolve_ai(role)?;
        let strafe = random_sign(&mut self.ctx.rng);
        let id = self.spawn(params);
        self.ctx.store.attach(id, Ai::new(role, profile, strafe));
        Ok(id)
    }

    /// Spawn an AI unit that holds `offset` (in the lead's frame) relative
    /// to `lead` while chasing.
    ///
    /// # Errors
    ///
    /// As [`Simulation::spawn_ai`], plus [`GameError::EntityNotFound`] if
    /// the lead does not exist.
    pub fn spawn_squad_member(
        &mut self,
        role: AiRole,
        params: SpawnParams,
        lead: EntityId,
        offset: Vec2Fixed,
    ) -> Result<EntityId> {
        if !self.ctx.store.is_alive(lead) {
            return Err(GameError::EntityNotFound(lead));
        }
        let id = self.spawn_ai(role, params)?;
        if let Some(ai) = self.ctx.store.get_mut::<Ai>(id) {
            ai.squad_lead = Some(lead);
            ai.formation_offset = offset;
        }
        Ok(id)
    }

    /// Spawn the interaction probe for a tile object anchored at `anchor`.
    pub fn spawn_tile_object(
        &mut self,
        anchor: TileCoord,
        object_id: impl Into<String>,
        interaction: impl Into<String>,
    ) -> EntityId {
        let position = self.ctx.terrain.tile_center(anchor);
        let id = self.ctx.store.create();
        self.ctx.store.attach(id, Position::new(position));
        self.ctx.store.attach(
            id,
            TileObjectLink {
                anchor,
                object_id: object_id.into(),
                interaction: interaction.into(),
            },
        );
        id
    }

    /// Remove an entity and all its components.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the entity does not exist.
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        if !self.ctx.store.is_alive(id) {
            return Err(GameError::EntityNotFound(id));
        }
        self.ctx.store.destroy(id);
        if self.ctx.actor == Some(id) {
            self.ctx.actor = None;
        }
        Ok(())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Move an entity, e.g. after the host's physics step.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if the entity has no position.
    pub fn set_position(&mut self, id: EntityId, position: Vec2Fixed) -> Result<()> {
        let pos = self
            .ctx
            .store
            .get_mut::<Position>(id)
            .ok_or(GameError::MissingComponent {
                entity: id,
                component: "position",
            })?;
        pos.value = position;
        Ok(())
    }

    /// Point an entity's turret at a world position.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if the entity has no position.
    pub fn aim_at(&mut self, id: EntityId, point: Vec2Fixed) -> Result<()> {
        let from = self.ctx.position(id).ok_or(GameError::MissingComponent {
            entity: id,
            component: "position",
        })?;
        self.ctx.store.attach(id, Aim::at(from, point));
        Ok(())
    }

    /// Hold or release an entity's trigger.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if the entity has no weapon.
    pub fn set_trigger(&mut self, id: EntityId, held: bool) -> Result<()> {
        weapon::set_trigger(&mut self.ctx, id, held)
    }

    /// Start switching an entity's weapon to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownWeapon`] or [`GameError::MissingComponent`].
    pub fn request_weapon_switch(&mut self, id: EntityId, next: WeaponId) -> Result<()> {
        weapon::request_switch(&mut self.ctx, id, next)
    }

    /// Report a contact detected by the host's physics.
    pub fn report_collision(&mut self, projectile: EntityId, contact: Contact) -> ContactOutcome {
        resolve_contact(&mut self.ctx, projectile, contact)
    }

    /// Place a bomb.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownBombKind`] if `kind` has no definition.
    pub fn place_bomb(&mut self, owner: EntityId, position: Vec2Fixed, kind: BombKind) -> Result<EntityId> {
        bomb::place_bomb(&mut self.ctx, owner, position, kind)
    }

    /// Detonate one bomb now. Returns `false` if it had already gone off.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if `id` is not a bomb.
    pub fn detonate_bomb(&mut self, id: EntityId) -> Result<bool> {
        bomb::detonate_bomb(&mut self.ctx, id)
    }

    /// Set off every armed remote bomb owned by `owner`.
    pub fn trigger_remote_bombs(&mut self, owner: EntityId) -> usize {
        bomb::trigger_remote_bombs(&mut self.ctx, owner)
    }

    /// Remove all bombs without detonating them.
    pub fn clear_bombs(&mut self) -> usize {
        bomb::clear_bombs(&mut self.ctx)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Take every logged event, oldest first.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.ctx.bus.drain()
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Covers the tick counter, the clock, the RNG position and every
    /// component record. Two runs with identical state produce identical
    /// hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.ctx.tick.hash(&mut hasher);
        self.ctx.clock_ms.to_bits().hash(&mut hasher);
        self.ctx.rng.get_word_pos().hash(&mut hasher);
        self.ctx.actor.hash(&mut hasher);
        self.ctx.store.hash_into(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::components::{AiState, Projectile};
    use crate::events::{EventKind, GameEvent};
    use crate::terrain::{TileCell, TileGrid, TileHealthTracker};

    fn sim_with(grid: TileGrid, tracker: TileHealthTracker, seed: u64) -> Simulation {
        Simulation::new(
            Definitions::builtin(),
            SimConfig::with_seed(seed),
            Box::new(grid),
            Rc::new(RefCell::new(tracker)),
        )
    }

    fn open_sim(seed: u64) -> Simulation {
        let grid = TileGrid::new(20, 20, Fixed::from_num(32), TileCell::open("grass"));
        sim_with(grid, TileHealthTracker::new(), seed)
    }

    fn kinds(records: &[EventRecord]) -> Vec<EventKind> {
        records.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_stock_systems_in_priority_order() {
        let mut sim = open_sim(1);
        assert_eq!(
            sim.scheduler_mut().names(),
            vec!["ai", "weapon", "collision", "projectile", "bomb", "beam", "entity_damage", "interaction"]
        );
    }

    #[test]
    fn test_tick_caps_long_steps() {
        let mut sim = open_sim(1);
        sim.tick(TickDelta::from_millis(1000));
        sim.tick(TickDelta::from_millis(100));
        assert_eq!(sim.tick_count(), 2);
        assert_eq!(sim.clock_ms(), Fixed::from_num(350));
    }

    #[test]
    fn test_despawn_unknown_entity() {
        let mut sim = open_sim(1);
        let id = sim.spawn(SpawnParams::default());
        assert!(sim.despawn(id).is_ok());
        assert!(matches!(sim.despawn(id), Err(GameError::EntityNotFound(_))));
    }

    #[test]
    fn test_spawn_ai_unknown_weapon() {
        let mut sim = open_sim(1);
        let params = SpawnParams {
            weapon: Some("gun-99".into()),
            ..SpawnParams::default()
        };
        assert!(matches!(
            sim.spawn_ai(AiRole::Grunt, params),
            Err(GameError::UnknownWeapon(_))
        ));
    }

    #[test]
    fn test_squad_member_requires_lead() {
        let mut sim = open_sim(1);
        let result = sim.spawn_squad_member(AiRole::Grunt, SpawnParams::default(), 42, Vec2Fixed::ZERO);
        assert!(matches!(result, Err(GameError::EntityNotFound(42))));
    }

    #[test]
    fn test_shot_into_destructible_tile() {
        let mut grid = TileGrid::new(20, 20, Fixed::from_num(32), TileCell::open("grass"));
        grid.set_cell(TileCoord::new(3, 8), TileCell::wall("crate", true));
        let mut tracker = TileHealthTracker::new();
        tracker.track(TileCoord::new(3, 8), 100);
        let mut sim = sim_with(grid, tracker, 3);

        let tank = sim.spawn_actor(SpawnParams {
            weapon: Some("gun-03".into()),
            ..SpawnParams::at(Vec2Fixed::from_ints(100, 100))
        });
        assert!(sim.set_trigger(tank, true).is_ok());
        sim.tick(TickDelta::from_millis(16));

        let shell = sim
            .context()
            .store
            .iter::<Projectile>()
            .map(|(id, _)| id)
            .next()
            .expect("shot fired");
        let outcome = sim.report_collision(
            shell,
            Contact::Tile {
                tile: TileCoord::new(3, 8),
                position: Vec2Fixed::from_ints(256, 100),
            },
        );
        assert_eq!(outcome, ContactOutcome::Destroyed);

        let events = sim.drain_events();
        assert_eq!(
            kinds(&events),
            vec![EventKind::WeaponFired, EventKind::ProjectileHit, EventKind::TileDamaged]
        );
        assert!(matches!(
            events[2].event,
            GameEvent::TileDamaged { remaining: 20, damage: 80, .. }
        ));
    }

    #[test]
    fn test_actor_walks_into_interaction_radius() {
        let mut sim = open_sim(1);
        let actor = sim.spawn_actor(SpawnParams::at(Vec2Fixed::from_ints(16, 16)));
        sim.spawn_tile_object(TileCoord::new(0, 4), "door-01", "door");

        sim.tick(TickDelta::from_millis(16));
        assert!(sim.drain_events().is_empty());

        // Tile (0, 4) centres on (144, 16); the default radius is 48.
        assert!(sim.set_position(actor, Vec2Fixed::from_ints(100, 16)).is_ok());
        sim.tick(TickDelta::from_millis(16));
        assert_eq!(kinds(&sim.drain_events()), vec![EventKind::ObjectInteract]);
    }

    #[test]
    fn test_ai_hunts_actor() {
        let mut sim = open_sim(5);
        sim.spawn_actor(SpawnParams {
            health: Some(100),
            ..SpawnParams::at(Vec2Fixed::from_ints(300, 100))
        });
        let sniper = sim
            .spawn_ai(
                AiRole::Sniper,
                SpawnParams {
                    weapon: Some("sniper-gun".into()),
                    ..SpawnParams::at(Vec2Fixed::from_ints(100, 100))
                },
            )
            .expect("builtin role");

        for _ in 0..3 {
            sim.tick(TickDelta::from_millis(50));
        }
        let state = sim.context().store.get::<Ai>(sniper).map(|ai| ai.state);
        assert_eq!(state, Some(AiState::Engage));
    }

    #[test]
    fn test_same_seed_same_hash() {
        let run = |seed| {
            let mut sim = open_sim(seed);
            sim.spawn_actor(SpawnParams::at(Vec2Fixed::from_ints(400, 400)));
            for role in [AiRole::Grunt, AiRole::Flanker, AiRole::Rusher] {
                let params = SpawnParams {
                    max_speed: Some(Fixed::from_num(60)),
                    weapon: Some("gun-02".into()),
                    ..SpawnParams::at(Vec2Fixed::from_ints(64, 64))
                };
                sim.spawn_ai(role, params).expect("builtin role");
            }
            for _ in 0..20 {
                sim.tick(TickDelta::from_millis(33));
            }
            sim.state_hash()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }
}
