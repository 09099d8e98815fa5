//! Component definitions.
//!
//! Components are pure data. Behaviour lives in the systems that query
//! them; the few helper methods here only maintain a component's own
//! invariants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::{AiRole, BombKind, ResolvedAiProfile, WeaponId};
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::math::{fixed_serde, option_fixed_serde, Fixed, Vec2Fixed};
use crate::terrain::TileCoord;

macro_rules! components {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::new($name);
            }
        )*
    };
}

components! {
    Position => "position",
    Velocity => "velocity",
    Heading => "heading",
    Aim => "aim",
    Health => "health",
    Collider => "collider",
    Mobility => "mobility",
    Ai => "ai",
    Weapon => "weapon",
    Projectile => "projectile",
    Beam => "beam",
    Bomb => "bomb",
    TileObjectLink => "tile_object_link",
}

// ============================================================================
// Spatial
// ============================================================================

/// Position in world space. Owned and integrated outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// World position.
    pub value: Vec2Fixed,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(value: Vec2Fixed) -> Self {
        Self { value }
    }

    /// The origin.
    pub const ORIGIN: Self = Self {
        value: Vec2Fixed::ZERO,
    };
}

/// Velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Velocity vector.
    pub value: Vec2Fixed,
}

impl Velocity {
    /// Create a velocity.
    #[must_use]
    pub const fn new(value: Vec2Fixed) -> Self {
        Self { value }
    }

    /// Zero velocity.
    pub const ZERO: Self = Self {
        value: Vec2Fixed::ZERO,
    };

    /// Speed in world units per second.
    #[must_use]
    pub fn speed(&self) -> Fixed {
        self.value.length()
    }
}

/// Facing of a hull, as a unit vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Heading {
    /// Unit direction.
    pub direction: Vec2Fixed,
}

impl Default for Heading {
    fn default() -> Self {
        Self {
            direction: Vec2Fixed::new(Fixed::ONE, Fixed::ZERO),
        }
    }
}

/// Turret aim. Weapons fire along `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aim {
    /// Unit firing direction.
    pub direction: Vec2Fixed,
    /// Aim point, used by splash weapons to time their landing.
    pub target: Option<Vec2Fixed>,
}

impl Default for Aim {
    fn default() -> Self {
        Self {
            direction: Vec2Fixed::new(Fixed::ONE, Fixed::ZERO),
            target: None,
        }
    }
}

impl Aim {
    /// Aim from `from` at `point`.
    #[must_use]
    pub fn at(from: Vec2Fixed, point: Vec2Fixed) -> Self {
        let direction = (point - from).normalize();
        Self {
            direction: if direction.is_zero() {
                Self::default().direction
            } else {
                direction
            },
            target: Some(point),
        }
    }
}

/// Circular hit area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collider {
    /// Radius in world units.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

impl Collider {
    /// Whether `point` lies inside the collider centred at `center`.
    #[must_use]
    pub fn contains(&self, center: Vec2Fixed, point: Vec2Fixed) -> bool {
        center.distance_squared(point) <= self.radius * self.radius
    }
}

/// Top speed of a mobile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mobility {
    /// Units per second on neutral ground.
    #[serde(with = "fixed_serde")]
    pub max_speed: Fixed,
}

// ============================================================================
// Health
// ============================================================================

/// Hit points of a damageable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Health has reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }
}

// ============================================================================
// AI
// ============================================================================

/// Behavioural state of an AI unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// No target sensed.
    #[default]
    Idle,
    /// Closing on the target.
    Chase,
    /// Within fire range, shooting.
    Engage,
}

impl AiState {
    /// Lowercase name used in events and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Chase => "chase",
            Self::Engage => "engage",
        }
    }
}

/// AI brain. The target is always the simulation's designated actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ai {
    /// Current state.
    pub state: AiState,
    /// Archetype the parameters were resolved from.
    pub role: AiRole,
    /// Resolved combat parameters.
    pub params: ResolvedAiProfile,
    /// Seconds until the first shot is allowed in engage.
    #[serde(with = "fixed_serde")]
    pub reaction_timer: Fixed,
    /// Seconds until the turret re-aims while chasing.
    #[serde(with = "fixed_serde")]
    pub retarget_timer: Fixed,
    /// Strafe and flank direction, `1` or `-1`.
    pub strafe_sign: i8,
    /// Squad lead this unit follows, if any.
    pub squad_lead: Option<EntityId>,
    /// Slot offset in the lead's local frame (+x is the lead's heading).
    pub formation_offset: Vec2Fixed,
}

impl Ai {
    /// Idle brain with resolved parameters.
    #[must_use]
    pub fn new(role: AiRole, params: ResolvedAiProfile, strafe_sign: i8) -> Self {
        Self {
            state: AiState::Idle,
            role,
            reaction_timer: params.reaction_time,
            retarget_timer: Fixed::ZERO,
            params,
            strafe_sign: if strafe_sign < 0 { -1 } else { 1 },
            squad_lead: None,
            formation_offset: Vec2Fixed::ZERO,
        }
    }

    /// Follow `lead` at `offset` in the lead's frame.
    #[must_use]
    pub fn with_squad(mut self, lead: EntityId, offset: Vec2Fixed) -> Self {
        self.squad_lead = Some(lead);
        self.formation_offset = offset;
        self
    }
}

// ============================================================================
// Weapons
// ============================================================================

/// Progress of a weapon swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SwitchPhase {
    /// Not switching.
    #[default]
    None,
    /// Retracting the current weapon.
    Stowing,
    /// Extending the new weapon.
    Drawing,
}

impl SwitchPhase {
    /// Lowercase name used in events and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stowing => "stowing",
            Self::Drawing => "drawing",
        }
    }
}

/// Mounted weapon state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Weapon {
    /// Active weapon definition.
    pub def: WeaponId,
    /// Seconds until the next shot.
    #[serde(with = "fixed_serde")]
    pub cooldown_remaining: Fixed,
    /// Trigger input for this tick.
    pub trigger_held: bool,
    /// Charge accumulated while holding, in milliseconds.
    #[serde(with = "fixed_serde")]
    pub charge_elapsed_ms: Fixed,
    /// A charge is building.
    pub is_charging: bool,
    /// Shots fired since spawn.
    pub shot_count: u32,
    /// Heat in `[0, capacity]`.
    #[serde(with = "fixed_serde")]
    pub heat_current: Fixed,
    /// Locked out after reaching heat capacity.
    pub is_overheated: bool,
    /// Seconds of lockout left; non-zero only while overheated.
    #[serde(with = "fixed_serde")]
    pub overheat_remaining: Fixed,
    /// A continuous beam fired this tick.
    pub beam_active: bool,
    /// Firing time not yet batched into a damage beam, in milliseconds.
    #[serde(with = "fixed_serde")]
    pub beam_accum_ms: Fixed,
    /// Swap progress.
    pub switch_phase: SwitchPhase,
    /// Milliseconds spent in the current switch phase.
    #[serde(with = "fixed_serde")]
    pub switch_elapsed_ms: Fixed,
    /// Weapon to draw once stowing completes.
    pub pending_def: Option<WeaponId>,
}

impl Weapon {
    /// Ready-to-fire weapon.
    #[must_use]
    pub fn new(def: WeaponId) -> Self {
        Self {
            def,
            cooldown_remaining: Fixed::ZERO,
            trigger_held: false,
            charge_elapsed_ms: Fixed::ZERO,
            is_charging: false,
            shot_count: 0,
            heat_current: Fixed::ZERO,
            is_overheated: false,
            overheat_remaining: Fixed::ZERO,
            beam_active: false,
            beam_accum_ms: Fixed::ZERO,
            switch_phase: SwitchPhase::None,
            switch_elapsed_ms: Fixed::ZERO,
            pending_def: None,
        }
    }

    /// Firing gate: off cooldown, not switching, not overheated.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.cooldown_remaining <= Fixed::ZERO
            && self.switch_phase == SwitchPhase::None
            && !self.is_overheated
    }

    /// Queue a swap to `next`.
    ///
    /// From idle this enters `Stowing` with a fresh timer and returns `true`.
    /// While already switching only the pending weapon is replaced and the
    /// current phase keeps its elapsed time. Any charge in progress is lost.
    pub fn request_switch(&mut self, next: WeaponId) -> bool {
        self.is_charging = false;
        self.charge_elapsed_ms = Fixed::ZERO;
        self.pending_def = Some(next);
        if self.switch_phase == SwitchPhase::None {
            self.switch_phase = SwitchPhase::Stowing;
            self.switch_elapsed_ms = Fixed::ZERO;
            true
        } else {
            false
        }
    }
}

/// In-flight projectile bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Weapon that fired it.
    pub weapon: WeaponId,
    /// Firing entity; never hit by its own projectile.
    pub owner: EntityId,
    /// Damage per hit.
    pub damage: u32,
    /// Seconds in flight.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Distance flown.
    #[serde(with = "fixed_serde")]
    pub distance_traveled: Fixed,
    /// Seconds before expiry.
    #[serde(with = "fixed_serde")]
    pub lifetime: Fixed,
    /// Distance before expiry.
    #[serde(with = "option_fixed_serde")]
    pub max_range: Option<Fixed>,
    /// Tile bounces left.
    pub bounces_remaining: u32,
    /// Entity pass-throughs left.
    pub pierces_remaining: u32,
    /// Entities already hit; each is hit at most once.
    pub hit_entities: BTreeSet<EntityId>,
    /// Blast radius for splash shells.
    #[serde(with = "option_fixed_serde")]
    pub splash_radius: Option<Fixed>,
    /// Landing point for splash shells.
    pub splash_target: Option<Vec2Fixed>,
}

impl Projectile {
    /// Splash shells ignore contacts and resolve on landing.
    #[must_use]
    pub fn is_splash(&self) -> bool {
        self.splash_radius.is_some()
    }
}

/// One hit along a beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeamHit {
    /// Where the beam struck.
    pub position: Vec2Fixed,
    /// Entity struck, if any.
    pub target: Option<EntityId>,
    /// Tile struck, if any.
    pub tile: Option<TileCoord>,
}

/// Hitscan beam. Hits are resolved once at spawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Beam {
    /// Firing entity.
    pub owner: EntityId,
    /// Weapon that fired it.
    pub weapon: WeaponId,
    /// Muzzle position.
    pub start: Vec2Fixed,
    /// Where the beam stopped.
    pub end: Vec2Fixed,
    /// Hits in order along the beam.
    pub hits: Vec<BeamHit>,
    /// Seconds visible so far.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Seconds before removal.
    #[serde(with = "fixed_serde")]
    pub max_duration: Fixed,
    /// Render layers.
    pub layer_count: u8,
    /// Damage carried by this beam.
    pub damage: u32,
}

// ============================================================================
// Bombs
// ============================================================================

/// Bomb lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BombState {
    /// Placed, not yet live.
    #[default]
    Arming,
    /// Live; waiting for its trigger.
    Armed,
    /// Exploded; removed on the next update.
    Detonating,
}

/// Placed explosive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bomb {
    /// Trigger mechanism.
    pub kind: BombKind,
    /// Placing entity.
    pub owner: EntityId,
    /// Lifecycle state.
    pub state: BombState,
    /// Milliseconds in the current state.
    #[serde(with = "fixed_serde")]
    pub elapsed_ms: Fixed,
    /// Set once, when the bomb explodes.
    pub detonated: bool,
}

impl Bomb {
    /// Freshly placed bomb.
    #[must_use]
    pub const fn new(kind: BombKind, owner: EntityId) -> Self {
        Self {
            kind,
            owner,
            state: BombState::Arming,
            elapsed_ms: Fixed::ZERO,
            detonated: false,
        }
    }
}

// ============================================================================
// Terrain links
// ============================================================================

/// Back-reference from an interactive object to its terrain anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileObjectLink {
    /// Anchor tile.
    pub anchor: TileCoord,
    /// Object identifier on the tile.
    pub object_id: String,
    /// Interaction type; selects the trigger radius.
    pub interaction: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_saturates() {
        let mut health = Health::new(30);
        assert_eq!(health.apply_damage(20), 20);
        assert_eq!(health.apply_damage(20), 10);
        assert!(health.is_dead());
    }

    #[test]
    fn test_weapon_gate() {
        let mut weapon = Weapon::new("gun-01".into());
        assert!(weapon.can_fire());
        weapon.cooldown_remaining = Fixed::from_num(1);
        assert!(!weapon.can_fire());
        weapon.cooldown_remaining = Fixed::ZERO;
        weapon.is_overheated = true;
        assert!(!weapon.can_fire());
    }

    #[test]
    fn test_switch_request_while_switching_keeps_timer() {
        let mut weapon = Weapon::new("gun-01".into());
        assert!(weapon.request_switch("gun-02".into()));
        weapon.switch_elapsed_ms = Fixed::from_num(120);
        assert!(!weapon.request_switch("gun-03".into()));
        assert_eq!(weapon.switch_phase, SwitchPhase::Stowing);
        assert_eq!(weapon.switch_elapsed_ms, Fixed::from_num(120));
        assert_eq!(weapon.pending_def, Some(WeaponId::from("gun-03")));
        assert!(!weapon.can_fire());
    }

    #[test]
    fn test_collider_boundary_inclusive() {
        let collider = Collider {
            radius: Fixed::from_num(5),
        };
        assert!(collider.contains(Vec2Fixed::ZERO, Vec2Fixed::from_ints(3, 4)));
        assert!(!collider.contains(Vec2Fixed::ZERO, Vec2Fixed::from_ints(4, 4)));
    }

    #[test]
    fn test_aim_at_same_point_keeps_default_direction() {
        let p = Vec2Fixed::from_ints(5, 5);
        assert_eq!(Aim::at(p, p).direction, Aim::default().direction);
    }
}
