//! Projectile lifecycle.
//!
//! Flight itself is integrated outside the core; this module keeps the
//! budgets: lifetime and range expiry, bounces against tiles, and pierces
//! through entities. Contacts are reported through [`resolve_contact`],
//! either by the in-crate [`crate::collision::CollisionSystem`] or by an
//! embedding game's own physics.

use crate::components::{Heading, Position, Projectile, Velocity};
use crate::context::SimContext;
use crate::data::WeaponId;
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::events::{GameEvent, SplashSource};
use crate::math::{Fixed, Vec2Fixed};
use crate::scheduler::System;
use crate::terrain::TileCoord;
use crate::time::TickDelta;

/// Parameters of one projectile to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectileShot {
    /// Firing entity.
    pub owner: EntityId,
    /// Weapon fired.
    pub weapon: WeaponId,
    /// Muzzle position.
    pub origin: Vec2Fixed,
    /// Unit flight direction.
    pub direction: Vec2Fixed,
    /// Speed in units per second.
    pub speed: Fixed,
    /// Damage per hit.
    pub damage: u32,
    /// Seconds before expiry.
    pub lifetime: Fixed,
    /// Distance before expiry.
    pub max_range: Option<Fixed>,
    /// Tile bounces.
    pub bounces: u32,
    /// Entity pass-throughs.
    pub pierces: u32,
    /// Blast radius for splash shells.
    pub splash_radius: Option<Fixed>,
    /// Landing point for splash shells.
    pub splash_target: Option<Vec2Fixed>,
}

/// Create a projectile entity. It becomes visible to systems next tick.
pub fn spawn_projectile(ctx: &mut SimContext, shot: ProjectileShot) -> EntityId {
    let id = ctx.store.create();
    ctx.store.attach(id, Position::new(shot.origin));
    ctx.store.attach(id, Velocity::new(shot.direction * shot.speed));
    ctx.store.attach(
        id,
        Heading {
            direction: shot.direction,
        },
    );
    ctx.store.attach(
        id,
        Projectile {
            weapon: shot.weapon,
            owner: shot.owner,
            damage: shot.damage,
            elapsed: Fixed::ZERO,
            distance_traveled: Fixed::ZERO,
            lifetime: shot.lifetime,
            max_range: shot.max_range,
            bounces_remaining: shot.bounces,
            pierces_remaining: shot.pierces,
            hit_entities: std::collections::BTreeSet::new(),
            splash_radius: shot.splash_radius,
            splash_target: shot.splash_target,
        },
    );
    id
}

/// A reported collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// The projectile reached a blocking tile.
    Tile {
        /// Tile struck.
        tile: TileCoord,
        /// Impact position.
        position: Vec2Fixed,
    },
    /// The projectile overlapped an entity.
    Entity {
        /// Entity struck.
        target: EntityId,
        /// Impact position.
        position: Vec2Fixed,
    },
}

/// What a contact did to the projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// No effect (owner, repeat target, splash shell, or gone).
    Ignored,
    /// One bounce spent; the caller reflects the velocity.
    Bounced,
    /// The entity was hit and one pierce spent.
    Pierced,
    /// The hit consumed the projectile.
    Destroyed,
}

/// Apply a contact to a projectile's budgets and emit the hit events.
pub fn resolve_contact(ctx: &mut SimContext, projectile: EntityId, contact: Contact) -> ContactOutcome {
    if ctx.store.is_pending_destroy(projectile) {
        return ContactOutcome::Ignored;
    }
    let Some(proj) = ctx.store.get_mut::<Projectile>(projectile) else {
        return ContactOutcome::Ignored;
    };
    if proj.is_splash() {
        return ContactOutcome::Ignored;
    }

    match contact {
        Contact::Entity { target, position } => {
            if target == proj.owner || !proj.hit_entities.insert(target) {
                return ContactOutcome::Ignored;
            }
            let owner = proj.owner;
            let damage = proj.damage;
            let outcome = if proj.pierces_remaining > 0 {
                proj.pierces_remaining -= 1;
                ContactOutcome::Pierced
            } else {
                ContactOutcome::Destroyed
            };
            ctx.bus.fire(GameEvent::ProjectileHitEntity {
                projectile: Some(projectile),
                owner,
                target,
                position,
                damage,
            });
            if outcome == ContactOutcome::Destroyed {
                ctx.store.destroy(projectile);
            }
            outcome
        }
        Contact::Tile { tile, position } => {
            if proj.bounces_remaining > 0 {
                proj.bounces_remaining -= 1;
                let bounces_remaining = proj.bounces_remaining;
                ctx.bus.fire(GameEvent::ProjectileBounce {
                    projectile,
                    position,
                    bounces_remaining,
                });
                return ContactOutcome::Bounced;
            }
            let event = GameEvent::ProjectileHit {
                projectile: Some(projectile),
                owner: proj.owner,
                tile,
                position,
                damage: proj.damage,
                destructible: ctx.terrain.is_destructible(tile),
                weapon: proj.weapon.clone(),
            };
            ctx.store.destroy(projectile);
            ctx.bus.fire(event);
            ContactOutcome::Destroyed
        }
    }
}

const REQUIRED: &[ComponentKind] = &[Projectile::KIND, Position::KIND];

/// Advances projectile clocks and expires spent projectiles.
#[derive(Debug, Default)]
pub struct ProjectileSystem;

enum Expiry {
    Alive,
    Range,
    Lifetime(Option<(EntityId, Fixed, u32)>),
}

impl System for ProjectileSystem {
    fn name(&self) -> &str {
        "projectile"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        30
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta) {
        let secs = dt.secs();
        for &id in entities {
            let speed = ctx.store.get::<Velocity>(id).map_or(Fixed::ZERO, Velocity::speed);
            let Some(position) = ctx.position(id) else {
                continue;
            };
            let Some(proj) = ctx.store.get_mut::<Projectile>(id) else {
                continue;
            };

            proj.elapsed += secs;
            proj.distance_traveled += speed * secs;

            let expiry = if proj.max_range.is_some_and(|range| proj.distance_traveled >= range) {
                Expiry::Range
            } else if proj.elapsed >= proj.lifetime {
                Expiry::Lifetime(proj.splash_radius.map(|radius| (proj.owner, radius, proj.damage)))
            } else {
                Expiry::Alive
            };

            match expiry {
                Expiry::Alive => {}
                Expiry::Range => {
                    tracing::trace!(projectile = id, "Projectile out of range");
                    ctx.store.destroy(id);
                }
                Expiry::Lifetime(splash) => {
                    if let Some((owner, radius, damage)) = splash {
                        ctx.bus.fire(GameEvent::SplashDetonated {
                            owner,
                            position,
                            radius,
                            damage,
                            source: SplashSource::Shell,
                        });
                    }
                    ctx.store.destroy(id);
                }
            }
        }
    }
}
