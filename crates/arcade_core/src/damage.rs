//! Damage resolution.
//!
//! Tile damage is resolved inside the `projectile:hit` listener, since the
//! tile health store is shared with it. Entity damage needs the component
//! store, so its listeners only queue requests and [`EntityDamageSystem`]
//! applies them during its pass.

use std::cell::RefCell;
use std::rc::Rc;

use crate::components::Health;
use crate::context::{SharedTileHealth, SimContext};
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::events::{EventBus, EventKind, GameEvent, ListenerId};
use crate::math::{clamp01, Fixed, Vec2Fixed};
use crate::scheduler::System;
use crate::time::TickDelta;

/// Subscribe tile damage resolution to `projectile:hit`.
///
/// Hits on non-destructible or untracked tiles are ignored. Others emit
/// `tile:damaged` with the health left, or `tile:destroyed` at zero.
pub fn install_tile_damage(bus: &EventBus, tile_health: SharedTileHealth) -> ListenerId {
    bus.on(EventKind::ProjectileHit, move |event, bus| {
        let GameEvent::ProjectileHit {
            tile,
            position,
            damage,
            destructible,
            ..
        } = *event
        else {
            return;
        };
        if !destructible {
            return;
        }

        let remaining = {
            let mut health = tile_health.borrow_mut();
            if !health.is_tracked(tile) {
                return;
            }
            health.apply_damage(tile, damage)
        };

        if remaining == 0 {
            tracing::debug!(row = tile.row, col = tile.col, "Tile destroyed");
            bus.fire(GameEvent::TileDestroyed { tile, position });
        } else {
            bus.fire(GameEvent::TileDamaged {
                tile,
                position,
                remaining,
                damage,
            });
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DamageRequest {
    Direct {
        source: EntityId,
        target: EntityId,
        damage: u32,
    },
    Splash {
        source: EntityId,
        center: Vec2Fixed,
        radius: Fixed,
        damage: u32,
    },
}

const REQUIRED: &[ComponentKind] = &[Health::KIND];

/// Applies projectile, beam and splash damage to [`Health`].
///
/// Splash damage falls off linearly from the centre (`1 − d/r`) and never
/// hurts the entity responsible for the blast. An entity whose health
/// reaches zero emits `entity:killed` and is destroyed.
#[derive(Debug)]
pub struct EntityDamageSystem {
    inbox: Rc<RefCell<Vec<DamageRequest>>>,
}

impl EntityDamageSystem {
    /// Create the system and subscribe its inbox to hit events on `bus`.
    #[must_use]
    pub fn install(bus: &EventBus) -> Self {
        let inbox = Rc::new(RefCell::new(Vec::new()));

        let direct = Rc::clone(&inbox);
        bus.on(EventKind::ProjectileHitEntity, move |event, _| {
            if let GameEvent::ProjectileHitEntity {
                owner,
                target,
                damage,
                ..
            } = *event
            {
                direct.borrow_mut().push(DamageRequest::Direct {
                    source: owner,
                    target,
                    damage,
                });
            }
        });

        let splash = Rc::clone(&inbox);
        bus.on(EventKind::SplashDetonated, move |event, _| {
            if let GameEvent::SplashDetonated {
                owner,
                position,
                radius,
                damage,
                ..
            } = *event
            {
                splash.borrow_mut().push(DamageRequest::Splash {
                    source: owner,
                    center: position,
                    radius,
                    damage,
                });
            }
        });

        Self { inbox }
    }

    /// Requests waiting for the next pass.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}

impl System for EntityDamageSystem {
    fn name(&self) -> &str {
        "entity_damage"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        50
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], _dt: TickDelta) {
        let requests = std::mem::take(&mut *self.inbox.borrow_mut());
        for request in requests {
            match request {
                DamageRequest::Direct {
                    source,
                    target,
                    damage,
                } => apply(ctx, source, target, damage),
                DamageRequest::Splash {
                    source,
                    center,
                    radius,
                    damage,
                } => splash(ctx, entities, source, center, radius, damage),
            }
        }
    }
}

fn splash(
    ctx: &mut SimContext,
    entities: &[EntityId],
    source: EntityId,
    center: Vec2Fixed,
    radius: Fixed,
    damage: u32,
) {
    let radius_sq = radius * radius;
    for &target in entities {
        if target == source {
            continue;
        }
        let Some(position) = ctx.position(target) else {
            continue;
        };
        let dist_sq = position.distance_squared(center);
        if dist_sq > radius_sq {
            continue;
        }
        let falloff = if radius > Fixed::ZERO {
            clamp01(Fixed::ONE - center.distance(position) / radius)
        } else {
            Fixed::ONE
        };
        let amount = (Fixed::from_num(damage) * falloff).round().to_num::<u32>();

        ctx.bus.fire(GameEvent::SplashEntityHit {
            owner: source,
            target,
            position,
            damage: amount,
            falloff,
        });
        if amount > 0 {
            apply(ctx, source, target, amount);
        }
    }
}

fn apply(ctx: &mut SimContext, source: EntityId, target: EntityId, damage: u32) {
    if ctx.store.is_pending_destroy(target) {
        return;
    }
    let Some(health) = ctx.store.get_mut::<Health>(target) else {
        tracing::trace!(entity = target, "Hit on entity without health");
        return;
    };
    if health.is_dead() {
        return;
    }
    let dealt = health.apply_damage(damage);
    let remaining = health.current;

    if remaining == 0 {
        tracing::debug!(entity = target, source, "Entity killed");
        ctx.bus.fire(GameEvent::EntityKilled {
            entity: target,
            source,
        });
        ctx.store.destroy(target);
    } else {
        ctx.bus.fire(GameEvent::EntityDamaged {
            entity: target,
            source,
            damage: dealt,
            remaining,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Position;
    use crate::events::SplashSource;
    use crate::math::ratio;
    use crate::terrain::{TileCoord, TileHealthTracker};

    fn tile_hit(destructible: bool, damage: u32) -> GameEvent {
        GameEvent::ProjectileHit {
            projectile: Some(1),
            owner: 2,
            tile: TileCoord::new(3, 4),
            position: Vec2Fixed::from_ints(140, 110),
            damage,
            destructible,
            weapon: "gun-01".into(),
        }
    }

    fn run(ctx: &mut SimContext, system: &mut EntityDamageSystem) {
        ctx.store.begin_tick();
        let entities = ctx.store.query(system.required());
        ctx.store.begin_pass();
        system.update(ctx, &entities, TickDelta::from_millis(16));
        ctx.store.end_pass();
    }

    fn body(ctx: &mut SimContext, x: i32, y: i32, hp: u32) -> EntityId {
        let id = ctx.store.create();
        ctx.store.attach(id, Position::new(Vec2Fixed::from_ints(x, y)));
        ctx.store.attach(id, Health::new(hp));
        id
    }

    // ========================================================================
    // Tiles
    // ========================================================================

    #[test]
    fn test_tile_damage_then_destroy() {
        let mut tracker = TileHealthTracker::new();
        tracker.track(TileCoord::new(3, 4), 50);
        let health: SharedTileHealth = Rc::new(RefCell::new(tracker));
        let bus = EventBus::default();
        install_tile_damage(&bus, Rc::clone(&health));

        bus.fire(tile_hit(true, 20));
        assert!(matches!(
            bus.events_of(EventKind::TileDamaged).as_slice(),
            [GameEvent::TileDamaged { remaining: 30, damage: 20, .. }]
        ));

        bus.fire(tile_hit(true, 40));
        assert_eq!(bus.events_of(EventKind::TileDestroyed).len(), 1);
        assert!(!health.borrow().is_tracked(TileCoord::new(3, 4)));

        // Destroyed tiles are no longer tracked; further hits do nothing.
        bus.fire(tile_hit(true, 40));
        assert_eq!(bus.events_of(EventKind::TileDestroyed).len(), 1);
    }

    #[test]
    fn test_indestructible_hit_ignored() {
        let mut tracker = TileHealthTracker::new();
        tracker.track(TileCoord::new(3, 4), 50);
        let health: SharedTileHealth = Rc::new(RefCell::new(tracker));
        let bus = EventBus::default();
        install_tile_damage(&bus, Rc::clone(&health));

        bus.fire(tile_hit(false, 20));
        assert_eq!(health.borrow().health(TileCoord::new(3, 4)), 50);
        assert_eq!(bus.log_len(), 1);
    }

    // ========================================================================
    // Entities
    // ========================================================================

    #[test]
    fn test_direct_hit_damages_then_kills() {
        let mut ctx = SimContext::for_tests();
        let mut system = EntityDamageSystem::install(&ctx.bus);
        let target = body(&mut ctx, 0, 0, 30);

        let hit = |damage| GameEvent::ProjectileHitEntity {
            projectile: None,
            owner: 99,
            target,
            position: Vec2Fixed::ZERO,
            damage,
        };
        ctx.bus.fire(hit(20));
        assert_eq!(system.pending(), 1);
        run(&mut ctx, &mut system);
        assert_eq!(ctx.store.get::<Health>(target).map(|h| h.current), Some(10));

        ctx.bus.fire(hit(20));
        ctx.bus.fire(hit(20));
        run(&mut ctx, &mut system);
        assert!(!ctx.store.is_alive(target));
        assert_eq!(ctx.bus.events_of(EventKind::EntityKilled).len(), 1);
        assert_eq!(ctx.bus.events_of(EventKind::EntityDamaged).len(), 1);
    }

    #[test]
    fn test_splash_falloff_and_owner_immunity() {
        let mut ctx = SimContext::for_tests();
        let mut system = EntityDamageSystem::install(&ctx.bus);
        let owner = body(&mut ctx, 100, 100, 200);
        let near = body(&mut ctx, 150, 100, 200);
        let edge = body(&mut ctx, 200, 100, 200);
        let outside = body(&mut ctx, 201, 100, 200);

        ctx.bus.fire(GameEvent::SplashDetonated {
            owner,
            position: Vec2Fixed::from_ints(100, 100),
            radius: Fixed::from_num(100),
            damage: 120,
            source: SplashSource::Bomb,
        });
        run(&mut ctx, &mut system);

        let hp = |id| ctx.store.get::<Health>(id).map(|h| h.current);
        assert_eq!(hp(owner), Some(200));
        assert_eq!(hp(near), Some(140));
        assert_eq!(hp(outside), Some(200));

        let falloffs: Vec<(EntityId, Fixed)> = ctx
            .bus
            .events_of(EventKind::SplashEntityHit)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::SplashEntityHit { target, falloff, .. } => Some((target, falloff)),
                _ => None,
            })
            .collect();
        assert_eq!(falloffs, vec![(near, ratio(1, 2)), (edge, Fixed::ZERO)]);
        assert_eq!(hp(edge), Some(200));
    }
}
