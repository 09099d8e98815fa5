//! Built-in contact detection for projectiles.
//!
//! Games with their own physics report contacts through
//! [`resolve_contact`] directly and leave this system unregistered.

use crate::components::{Collider, Health, Position, Projectile, Velocity};
use crate::context::SimContext;
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::math::Vec2Fixed;
use crate::projectile::{resolve_contact, Contact, ContactOutcome};
use crate::scheduler::System;
use crate::time::TickDelta;

const REQUIRED: &[ComponentKind] = &[Projectile::KIND, Position::KIND, Velocity::KIND];

/// Detects projectile contacts with blocking tiles and entity colliders.
///
/// A bounce steps the projectile back to where it was last tick and
/// reflects the velocity on the axis that crossed into the wall.
#[derive(Debug, Default)]
pub struct CollisionSystem;

impl System for CollisionSystem {
    fn name(&self) -> &str {
        "collision"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        25
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta) {
        let targets: Vec<(EntityId, Vec2Fixed, Collider)> = ctx
            .store
            .query(&[Collider::KIND, Position::KIND, Health::KIND])
            .into_iter()
            .filter_map(|id| Some((id, ctx.position(id)?, *ctx.store.get::<Collider>(id)?)))
            .collect();

        for &id in entities {
            let Some(proj) = ctx.store.get::<Projectile>(id) else {
                continue;
            };
            if proj.is_splash() {
                continue;
            }
            let Some(position) = ctx.position(id) else {
                continue;
            };
            let Some(velocity) = ctx.store.get::<Velocity>(id).map(|v| v.value) else {
                continue;
            };

            let Some(tile) = ctx.terrain.world_to_tile(position) else {
                tracing::trace!(projectile = id, "Projectile left the map");
                ctx.store.destroy(id);
                continue;
            };

            if ctx.terrain.blocks_projectiles(tile) {
                let outcome = resolve_contact(ctx, id, Contact::Tile { tile, position });
                if outcome == ContactOutcome::Bounced {
                    let previous = position - velocity * dt.secs();
                    bounce(ctx, id, previous, position, velocity);
                }
                continue;
            }

            for &(target, center, collider) in &targets {
                if !collider.contains(center, position) {
                    continue;
                }
                let outcome = resolve_contact(ctx, id, Contact::Entity { target, position });
                if outcome == ContactOutcome::Destroyed {
                    break;
                }
            }
        }
    }
}

fn bounce(ctx: &mut SimContext, id: EntityId, previous: Vec2Fixed, current: Vec2Fixed, velocity: Vec2Fixed) {
    let blocked = |point: Vec2Fixed| {
        ctx.terrain
            .world_to_tile(point)
            .map_or(true, |tile| ctx.terrain.blocks_projectiles(tile))
    };
    let crossed_x = blocked(Vec2Fixed::new(current.x, previous.y));
    let crossed_y = blocked(Vec2Fixed::new(previous.x, current.y));

    let reflected = match (crossed_x, crossed_y) {
        (true, false) => Vec2Fixed::new(-velocity.x, velocity.y),
        (false, true) => Vec2Fixed::new(velocity.x, -velocity.y),
        _ => -velocity,
    };

    if let Some(pos) = ctx.store.get_mut::<Position>(id) {
        pos.value = previous;
    }
    if let Some(vel) = ctx.store.get_mut::<Velocity>(id) {
        vel.value = reflected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::math::Fixed;
    use crate::projectile::{spawn_projectile, ProjectileShot};
    use crate::terrain::{TileCell, TileCoord, TileGrid};

    fn walled_ctx() -> SimContext {
        let mut grid = TileGrid::new(20, 20, Fixed::from_num(32), TileCell::open("grass"));
        for row in 0..20 {
            grid.set_cell(TileCoord::new(row, 10), TileCell::wall("crate", true));
        }
        let mut ctx = SimContext::for_tests();
        ctx.terrain = Box::new(grid);
        ctx
    }

    fn shell(ctx: &mut SimContext, at: Vec2Fixed, bounces: u32, pierces: u32) -> EntityId {
        spawn_projectile(
            ctx,
            ProjectileShot {
                owner: 999,
                weapon: "gun-04".into(),
                origin: at,
                direction: Vec2Fixed::from_ints(1, 0),
                speed: Fixed::from_num(400),
                damage: 40,
                lifetime: Fixed::from_num(3),
                max_range: None,
                bounces,
                pierces,
                splash_radius: None,
                splash_target: None,
            },
        )
    }

    fn run(ctx: &mut SimContext, ms: u32) {
        let mut system = CollisionSystem;
        ctx.store.begin_tick();
        let entities = ctx.store.query(system.required());
        ctx.store.begin_pass();
        system.update(ctx, &entities, TickDelta::from_millis(ms));
        ctx.store.end_pass();
    }

    #[test]
    fn test_bounce_reflects_x_and_steps_back() {
        let mut ctx = walled_ctx();
        // Tile column 10 spans x in [320, 352).
        let p = shell(&mut ctx, Vec2Fixed::from_ints(330, 100), 1, 0);
        run(&mut ctx, 125);

        assert!(ctx.store.is_alive(p));
        assert_eq!(ctx.position(p), Some(Vec2Fixed::from_ints(280, 100)));
        assert_eq!(
            ctx.store.get::<Velocity>(p).map(|v| v.value),
            Some(Vec2Fixed::from_ints(-400, 0))
        );
        assert_eq!(ctx.bus.events_of(EventKind::ProjectileBounce).len(), 1);
    }

    #[test]
    fn test_wall_without_bounces_destroys() {
        let mut ctx = walled_ctx();
        let p = shell(&mut ctx, Vec2Fixed::from_ints(330, 100), 0, 0);
        run(&mut ctx, 50);
        assert!(!ctx.store.is_alive(p));
        assert_eq!(ctx.bus.events_of(EventKind::ProjectileHit).len(), 1);
    }

    #[test]
    fn test_entity_contact_hits_once_per_target() {
        let mut ctx = SimContext::for_tests();
        let target = ctx.store.create();
        ctx.store.attach(target, Position::new(Vec2Fixed::from_ints(100, 100)));
        ctx.store.attach(target, Health::new(50));
        ctx.store.attach(target, Collider { radius: Fixed::from_num(16) });
        let p = shell(&mut ctx, Vec2Fixed::from_ints(105, 100), 0, 1);

        run(&mut ctx, 16);
        run(&mut ctx, 16);
        assert!(ctx.store.is_alive(p));
        assert_eq!(ctx.bus.events_of(EventKind::ProjectileHitEntity).len(), 1);
        assert_eq!(
            ctx.store.get::<Projectile>(p).map(|p| p.pierces_remaining),
            Some(0)
        );
    }

    #[test]
    fn test_off_map_projectile_removed() {
        let mut ctx = SimContext::for_tests();
        let p = shell(&mut ctx, Vec2Fixed::from_ints(-5, 100), 0, 0);
        run(&mut ctx, 16);
        assert!(!ctx.store.is_alive(p));
        assert!(ctx.bus.log().is_empty());
    }
}
