//! Event bus.
//!
//! Every channel is one [`GameEvent`] variant with a fixed payload. The bus
//! delivers synchronously, in registration order, to the listeners that
//! were registered when [`EventBus::fire`] was called, and keeps a bounded
//! log for analytics draining.
//!
//! Listeners receive the bus itself so they can fire follow-up events
//! (damage resolution turns `projectile:hit` into `tile:damaged`). The bus
//! uses interior mutability for this; it is single-threaded by
//! construction.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::components::{AiState, SwitchPhase};
use crate::data::{BombKind, WeaponId};
use crate::ecs::EntityId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::terrain::TileCoord;

/// Default number of retained log entries.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Channel name of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// `weapon:fired`
    WeaponFired,
    /// `weapon:charging`
    WeaponCharging,
    /// `weapon:overheated`
    WeaponOverheated,
    /// `weapon:switch`
    WeaponSwitch,
    /// `projectile:hit`
    ProjectileHit,
    /// `projectile:hit:entity`
    ProjectileHitEntity,
    /// `projectile:bounce`
    ProjectileBounce,
    /// `beam:fired`
    BeamFired,
    /// `splash:detonated`
    SplashDetonated,
    /// `splash:entity:hit`
    SplashEntityHit,
    /// `bomb:placed`
    BombPlaced,
    /// `bomb:armed`
    BombArmed,
    /// `bomb:exploded`
    BombExploded,
    /// `tile:damaged`
    TileDamaged,
    /// `tile:destroyed`
    TileDestroyed,
    /// `object:interact`
    ObjectInteract,
    /// `ai:state`
    AiState,
    /// `entity:damaged`
    EntityDamaged,
    /// `entity:killed`
    EntityKilled,
}

impl EventKind {
    /// Wire name of the channel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WeaponFired => "weapon:fired",
            Self::WeaponCharging => "weapon:charging",
            Self::WeaponOverheated => "weapon:overheated",
            Self::WeaponSwitch => "weapon:switch",
            Self::ProjectileHit => "projectile:hit",
            Self::ProjectileHitEntity => "projectile:hit:entity",
            Self::ProjectileBounce => "projectile:bounce",
            Self::BeamFired => "beam:fired",
            Self::SplashDetonated => "splash:detonated",
            Self::SplashEntityHit => "splash:entity:hit",
            Self::BombPlaced => "bomb:placed",
            Self::BombArmed => "bomb:armed",
            Self::BombExploded => "bomb:exploded",
            Self::TileDamaged => "tile:damaged",
            Self::TileDestroyed => "tile:destroyed",
            Self::ObjectInteract => "object:interact",
            Self::AiState => "ai:state",
            Self::EntityDamaged => "entity:damaged",
            Self::EntityKilled => "entity:killed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a splash detonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplashSource {
    /// A splash shell landed.
    Shell,
    /// A bomb exploded.
    Bomb,
}

/// A combat outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A weapon fired one shot (any number of projectiles or one beam).
    WeaponFired {
        /// Firing entity.
        owner: EntityId,
        /// Weapon fired.
        weapon: WeaponId,
        /// Muzzle position.
        origin: Vec2Fixed,
        /// Aim direction.
        direction: Vec2Fixed,
        /// Spawned projectile or beam entities.
        spawned: Vec<EntityId>,
    },
    /// Charge progress of a held charge weapon.
    WeaponCharging {
        /// Holding entity.
        owner: EntityId,
        /// Weapon charging.
        weapon: WeaponId,
        /// Charge in `[0, 1]`.
        #[serde(with = "fixed_serde")]
        charge_ratio: Fixed,
    },
    /// A continuous weapon reached heat capacity.
    WeaponOverheated {
        /// Firing entity.
        owner: EntityId,
        /// Weapon locked out.
        weapon: WeaponId,
    },
    /// A weapon swap entered a new phase.
    WeaponSwitch {
        /// Switching entity.
        owner: EntityId,
        /// Phase entered.
        phase: SwitchPhase,
        /// Weapon in hand after the transition.
        weapon: WeaponId,
    },
    /// Something struck a tile.
    ProjectileHit {
        /// Projectile entity; `None` for beams.
        projectile: Option<EntityId>,
        /// Firing entity.
        owner: EntityId,
        /// Tile struck.
        tile: TileCoord,
        /// World position of the impact.
        position: Vec2Fixed,
        /// Raw damage.
        damage: u32,
        /// Whether the tile object can be damaged.
        destructible: bool,
        /// Weapon responsible.
        weapon: WeaponId,
    },
    /// A projectile or beam struck an entity.
    ProjectileHitEntity {
        /// Projectile entity; `None` for beams.
        projectile: Option<EntityId>,
        /// Firing entity.
        owner: EntityId,
        /// Entity struck.
        target: EntityId,
        /// World position of the impact.
        position: Vec2Fixed,
        /// Raw damage.
        damage: u32,
    },
    /// A projectile spent one bounce.
    ProjectileBounce {
        /// Projectile entity.
        projectile: EntityId,
        /// Where it bounced.
        position: Vec2Fixed,
        /// Bounces left.
        bounces_remaining: u32,
    },
    /// A beam was spawned.
    BeamFired {
        /// Beam entity.
        beam: EntityId,
        /// Firing entity.
        owner: EntityId,
        /// Muzzle.
        start: Vec2Fixed,
        /// End point.
        end: Vec2Fixed,
        /// Number of hits along the beam.
        hits: u32,
    },
    /// An area blast went off.
    SplashDetonated {
        /// Responsible entity.
        owner: EntityId,
        /// Centre of the blast.
        position: Vec2Fixed,
        /// Blast radius.
        #[serde(with = "fixed_serde")]
        radius: Fixed,
        /// Damage at the centre.
        damage: u32,
        /// Shell or bomb.
        source: SplashSource,
    },
    /// An entity took blast damage.
    SplashEntityHit {
        /// Responsible entity.
        owner: EntityId,
        /// Entity hit.
        target: EntityId,
        /// Target position.
        position: Vec2Fixed,
        /// Damage after falloff.
        damage: u32,
        /// Falloff factor in `[0, 1]`.
        #[serde(with = "fixed_serde")]
        falloff: Fixed,
    },
    /// A bomb was placed.
    BombPlaced {
        /// Bomb entity.
        bomb: EntityId,
        /// Placing entity.
        owner: EntityId,
        /// Trigger mechanism.
        kind: BombKind,
        /// Placement position.
        position: Vec2Fixed,
    },
    /// A bomb finished arming.
    BombArmed {
        /// Bomb entity.
        bomb: EntityId,
        /// Trigger mechanism.
        kind: BombKind,
    },
    /// A bomb exploded.
    BombExploded {
        /// Bomb entity.
        bomb: EntityId,
        /// Placing entity.
        owner: EntityId,
        /// Trigger mechanism.
        kind: BombKind,
        /// Blast centre.
        position: Vec2Fixed,
        /// Set off by another bomb's chain.
        chained: bool,
    },
    /// A destructible tile lost health.
    TileDamaged {
        /// Tile hit.
        tile: TileCoord,
        /// Impact position.
        position: Vec2Fixed,
        /// Health left.
        remaining: u32,
        /// Damage applied.
        damage: u32,
    },
    /// A destructible tile reached zero health.
    TileDestroyed {
        /// Tile destroyed.
        tile: TileCoord,
        /// Impact position.
        position: Vec2Fixed,
    },
    /// The actor is within reach of an interactive object.
    ObjectInteract {
        /// Object entity.
        entity: EntityId,
        /// Anchor tile.
        anchor: TileCoord,
        /// Object identifier.
        object_id: String,
        /// Interaction type.
        interaction: String,
        /// Squared actor distance.
        #[serde(with = "fixed_serde")]
        distance_sq: Fixed,
    },
    /// An AI changed state.
    AiStateChanged {
        /// AI entity.
        entity: EntityId,
        /// Previous state.
        from: AiState,
        /// New state.
        to: AiState,
    },
    /// An entity lost health.
    EntityDamaged {
        /// Damaged entity.
        entity: EntityId,
        /// Responsible entity.
        source: EntityId,
        /// Damage applied.
        damage: u32,
        /// Health left.
        remaining: u32,
    },
    /// An entity's health reached zero.
    EntityKilled {
        /// Killed entity.
        entity: EntityId,
        /// Responsible entity.
        source: EntityId,
    },
}

impl GameEvent {
    /// Channel of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::WeaponFired { .. } => EventKind::WeaponFired,
            Self::WeaponCharging { .. } => EventKind::WeaponCharging,
            Self::WeaponOverheated { .. } => EventKind::WeaponOverheated,
            Self::WeaponSwitch { .. } => EventKind::WeaponSwitch,
            Self::ProjectileHit { .. } => EventKind::ProjectileHit,
            Self::ProjectileHitEntity { .. } => EventKind::ProjectileHitEntity,
            Self::ProjectileBounce { .. } => EventKind::ProjectileBounce,
            Self::BeamFired { .. } => EventKind::BeamFired,
            Self::SplashDetonated { .. } => EventKind::SplashDetonated,
            Self::SplashEntityHit { .. } => EventKind::SplashEntityHit,
            Self::BombPlaced { .. } => EventKind::BombPlaced,
            Self::BombArmed { .. } => EventKind::BombArmed,
            Self::BombExploded { .. } => EventKind::BombExploded,
            Self::TileDamaged { .. } => EventKind::TileDamaged,
            Self::TileDestroyed { .. } => EventKind::TileDestroyed,
            Self::ObjectInteract { .. } => EventKind::ObjectInteract,
            Self::AiStateChanged { .. } => EventKind::AiState,
            Self::EntityDamaged { .. } => EventKind::EntityDamaged,
            Self::EntityKilled { .. } => EventKind::EntityKilled,
        }
    }

    /// Check payload constraints.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            Self::WeaponCharging { charge_ratio, .. }
                if *charge_ratio < Fixed::ZERO || *charge_ratio > Fixed::ONE =>
            {
                Err("charge_ratio outside [0, 1]")
            }
            Self::SplashDetonated { radius, .. } if *radius < Fixed::ZERO => {
                Err("negative splash radius")
            }
            Self::SplashEntityHit { falloff, .. }
                if *falloff < Fixed::ZERO || *falloff > Fixed::ONE =>
            {
                Err("falloff outside [0, 1]")
            }
            Self::ObjectInteract { distance_sq, .. } if *distance_sq < Fixed::ZERO => {
                Err("negative distance")
            }
            Self::AiStateChanged { from, to, .. } if from == to => Err("state did not change"),
            Self::WeaponFired { spawned, .. } if spawned.is_empty() => {
                Err("shot spawned nothing")
            }
            _ => Ok(()),
        }
    }
}

/// A logged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Channel name.
    pub kind: EventKind,
    /// Simulation clock when fired, in milliseconds.
    pub timestamp_ms: u64,
    /// The event.
    pub event: GameEvent,
}

/// Handle returned by [`EventBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Listener callback. Receives the event and the bus for follow-up fires.
pub type Listener = Rc<dyn Fn(&GameEvent, &EventBus)>;

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    callback: Listener,
}

/// Named publish/subscribe channel with a bounded log.
pub struct EventBus {
    listeners: RefCell<Vec<ListenerEntry>>,
    log: RefCell<VecDeque<EventRecord>>,
    capacity: usize,
    next_listener: Cell<u64>,
    now_ms: Cell<Fixed>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.borrow().len())
            .field("logged", &self.log.borrow().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl EventBus {
    /// Bus retaining at most `capacity` log entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            log: RefCell::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity,
            next_listener: Cell::new(0),
            now_ms: Cell::new(Fixed::ZERO),
        }
    }

    /// Log capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the clock used to timestamp log entries.
    pub fn set_clock(&self, now_ms: Fixed) {
        self.now_ms.set(now_ms);
    }

    /// Register a listener for `kind`.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&GameEvent, &EventBus) + 'static) -> ListenerId {
        self.register(kind, false, Rc::new(listener))
    }

    /// Register a listener that is removed after its first delivery.
    pub fn once(
        &self,
        kind: EventKind,
        listener: impl Fn(&GameEvent, &EventBus) + 'static,
    ) -> ListenerId {
        self.register(kind, true, Rc::new(listener))
    }

    fn register(&self, kind: EventKind, once: bool, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            kind,
            once,
            callback,
        });
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Remove every listener.
    pub fn clear_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Log and deliver an event.
    ///
    /// Invalid payloads are dropped with a warning. Listeners registered or
    /// removed during delivery do not affect this delivery.
    pub fn fire(&self, event: GameEvent) {
        let kind = event.kind();
        if let Err(reason) = event.validate() {
            tracing::warn!(event = kind.as_str(), reason, "Rejected malformed event");
            return;
        }

        if self.capacity > 0 {
            let mut log = self.log.borrow_mut();
            while log.len() >= self.capacity {
                log.pop_front();
            }
            log.push_back(EventRecord {
                kind,
                timestamp_ms: self.now_ms.get().max(Fixed::ZERO).to_num::<u64>(),
                event: event.clone(),
            });
        }

        let targets: Vec<Listener> = {
            let mut listeners = self.listeners.borrow_mut();
            let targets = listeners
                .iter()
                .filter(|entry| entry.kind == kind)
                .map(|entry| Rc::clone(&entry.callback))
                .collect();
            listeners.retain(|entry| !(entry.once && entry.kind == kind));
            targets
        };

        for listener in targets {
            listener(&event, self);
        }
    }

    /// Empty the log and return its contents.
    pub fn drain(&self) -> Vec<EventRecord> {
        std::mem::take(&mut *self.log.borrow_mut()).into()
    }

    /// Snapshot of the log.
    #[must_use]
    pub fn log(&self) -> Vec<EventRecord> {
        self.log.borrow().iter().cloned().collect()
    }

    /// Logged events of one kind.
    #[must_use]
    pub fn events_of(&self, kind: EventKind) -> Vec<GameEvent> {
        self.log
            .borrow()
            .iter()
            .filter(|record| record.kind == kind)
            .map(|record| record.event.clone())
            .collect()
    }

    /// Number of logged events.
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.borrow().len()
    }

    /// Discard the log.
    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}
