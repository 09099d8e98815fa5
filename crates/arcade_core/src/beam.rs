//! Hitscan beams.
//!
//! A beam resolves its hits once, at spawn, by marching along the aim line
//! in fixed steps. The beam entity then only lives long enough for
//! renderers to draw it.

use crate::components::{Beam, BeamHit, Collider, Health, Position};
use crate::context::SimContext;
use crate::data::WeaponId;
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::events::GameEvent;
use crate::math::{Fixed, Vec2Fixed};
use crate::scheduler::System;
use crate::time::TickDelta;

/// Raycast sample spacing in world units.
pub const RAYCAST_STEP: i32 = 4;

/// Where a raycast stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaycastResult {
    /// End of the ray.
    pub end: Vec2Fixed,
    /// First thing struck, if any.
    pub hit: Option<BeamHit>,
    /// Whether a struck tile is destructible.
    pub destructible: bool,
}

/// March from `start` along `direction` up to `max_range`.
///
/// Stops at the first blocking tile, the first entity (other than `owner`)
/// whose collider contains the sample point, or the map edge. Bodies
/// spawned earlier in the same tick are solid too.
#[must_use]
pub fn raycast(
    ctx: &SimContext,
    owner: EntityId,
    start: Vec2Fixed,
    direction: Vec2Fixed,
    max_range: Fixed,
) -> RaycastResult {
    let targets: Vec<(EntityId, Vec2Fixed, Collider)> = ctx
        .store
        .iter::<Collider>()
        .filter(|&(id, _)| id != owner && ctx.store.has::<Health>(id))
        .filter_map(|(id, collider)| {
            let pos = ctx.store.get::<Position>(id)?.value;
            Some((id, pos, *collider))
        })
        .collect();

    let step = Fixed::from_num(RAYCAST_STEP);
    let mut traveled = Fixed::ZERO;
    while traveled < max_range {
        traveled += step;
        let sample = start + direction * traveled;

        let Some(tile) = ctx.terrain.world_to_tile(sample) else {
            return RaycastResult {
                end: sample,
                hit: None,
                destructible: false,
            };
        };
        if ctx.terrain.blocks_projectiles(tile) {
            return RaycastResult {
                end: sample,
                hit: Some(BeamHit {
                    position: sample,
                    target: None,
                    tile: Some(tile),
                }),
                destructible: ctx.terrain.is_destructible(tile),
            };
        }
        if let Some((target, _, _)) = targets
            .iter()
            .find(|(_, pos, collider)| collider.contains(*pos, sample))
        {
            return RaycastResult {
                end: sample,
                hit: Some(BeamHit {
                    position: sample,
                    target: Some(*target),
                    tile: None,
                }),
                destructible: false,
            };
        }
    }

    RaycastResult {
        end: start + direction * max_range,
        hit: None,
        destructible: false,
    }
}

/// Parameters of one beam to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamShot {
    /// Firing entity.
    pub owner: EntityId,
    /// Weapon fired.
    pub weapon: WeaponId,
    /// Muzzle.
    pub start: Vec2Fixed,
    /// Unit direction.
    pub direction: Vec2Fixed,
    /// Raycast cutoff.
    pub max_range: Fixed,
    /// Visible duration in milliseconds.
    pub persist_ms: u32,
    /// Render layers.
    pub layer_count: u8,
    /// Damage applied to whatever the beam strikes.
    pub damage: u32,
}

/// Resolve a beam's hits, emit them and create the beam entity.
pub fn spawn_beam(ctx: &mut SimContext, shot: BeamShot) -> EntityId {
    let ray = raycast(ctx, shot.owner, shot.start, shot.direction, shot.max_range);
    let hits: Vec<BeamHit> = ray.hit.into_iter().collect();

    let id = ctx.store.create();
    ctx.store.attach(
        id,
        Beam {
            owner: shot.owner,
            weapon: shot.weapon.clone(),
            start: shot.start,
            end: ray.end,
            hits: hits.clone(),
            elapsed: Fixed::ZERO,
            max_duration: Fixed::from_num(shot.persist_ms) / Fixed::from_num(1000),
            layer_count: shot.layer_count,
            damage: shot.damage,
        },
    );

    ctx.bus.fire(GameEvent::BeamFired {
        beam: id,
        owner: shot.owner,
        start: shot.start,
        end: ray.end,
        hits: hits.len() as u32,
    });

    for hit in hits {
        match (hit.target, hit.tile) {
            (Some(target), _) => ctx.bus.fire(GameEvent::ProjectileHitEntity {
                projectile: None,
                owner: shot.owner,
                target,
                position: hit.position,
                damage: shot.damage,
            }),
            (None, Some(tile)) => ctx.bus.fire(GameEvent::ProjectileHit {
                projectile: None,
                owner: shot.owner,
                tile,
                position: hit.position,
                damage: shot.damage,
                destructible: ray.destructible,
                weapon: shot.weapon.clone(),
            }),
            (None, None) => {}
        }
    }
    id
}

const REQUIRED: &[ComponentKind] = &[Beam::KIND];

/// Expires beams after their visible duration.
#[derive(Debug, Default)]
pub struct BeamSystem;

impl System for BeamSystem {
    fn name(&self) -> &str {
        "beam"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        40
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta) {
        for &id in entities {
            let Some(beam) = ctx.store.get_mut::<Beam>(id) else {
                continue;
            };
            beam.elapsed += dt.secs();
            if beam.elapsed >= beam.max_duration {
                ctx.store.destroy(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::terrain::{TileCell, TileCoord, TileGrid};

    fn shot(owner: EntityId) -> BeamShot {
        BeamShot {
            owner,
            weapon: "gun-06".into(),
            start: Vec2Fixed::from_ints(48, 48),
            direction: Vec2Fixed::from_ints(1, 0),
            max_range: Fixed::from_num(400),
            persist_ms: 120,
            layer_count: 3,
            damage: 6,
        }
    }

    fn target(ctx: &mut SimContext, x: i32, y: i32) -> EntityId {
        let id = ctx.store.create();
        ctx.store.attach(id, Position::new(Vec2Fixed::from_ints(x, y)));
        ctx.store.attach(id, Health::new(100));
        ctx.store.attach(id, Collider { radius: Fixed::from_num(10) });
        id
    }

    #[test]
    fn test_beam_stops_at_first_entity() {
        let mut ctx = SimContext::for_tests();
        let near = target(&mut ctx, 150, 48);
        let _far = target(&mut ctx, 250, 48);
        ctx.store.begin_tick();

        let ray = raycast(&ctx, 1, Vec2Fixed::from_ints(48, 48), Vec2Fixed::from_ints(1, 0), Fixed::from_num(400));
        let hit = ray.hit.expect("beam should hit");
        assert_eq!(hit.target, Some(near));
        assert_eq!(ray.end, Vec2Fixed::from_ints(140, 48));
    }

    #[test]
    fn test_body_spawned_this_tick_blocks_beam() {
        let mut ctx = SimContext::for_tests();
        ctx.store.begin_tick();
        let fresh = target(&mut ctx, 150, 48);
        assert!(ctx.store.query(&[Collider::KIND]).is_empty());

        let ray = raycast(&ctx, 1, Vec2Fixed::from_ints(48, 48), Vec2Fixed::from_ints(1, 0), Fixed::from_num(400));
        assert_eq!(ray.hit.and_then(|hit| hit.target), Some(fresh));
        assert_eq!(ray.end, Vec2Fixed::from_ints(140, 48));
    }

    #[test]
    fn test_owner_is_transparent() {
        let mut ctx = SimContext::for_tests();
        let owner = target(&mut ctx, 60, 48);
        ctx.store.begin_tick();
        let ray = raycast(&ctx, owner, Vec2Fixed::from_ints(48, 48), Vec2Fixed::from_ints(1, 0), Fixed::from_num(100));
        assert!(ray.hit.is_none());
        assert_eq!(ray.end, Vec2Fixed::from_ints(148, 48));
    }

    #[test]
    fn test_beam_hits_wall_and_emits_tile_hit() {
        let mut grid = TileGrid::new(20, 20, Fixed::from_num(32), TileCell::open("grass"));
        grid.set_cell(TileCoord::new(1, 5), TileCell::wall("brick", true));
        let mut ctx = SimContext::for_tests();
        ctx.terrain = Box::new(grid);

        let beam = spawn_beam(&mut ctx, shot(1));
        let record = ctx.store.get::<Beam>(beam).expect("beam entity");
        assert_eq!(record.end, Vec2Fixed::from_ints(160, 48));
        assert_eq!(record.hits.len(), 1);

        let hits = ctx.bus.events_of(EventKind::ProjectileHit);
        assert!(matches!(
            hits.as_slice(),
            [GameEvent::ProjectileHit { projectile: None, destructible: true, damage: 6, .. }]
        ));
        assert_eq!(ctx.bus.events_of(EventKind::BeamFired).len(), 1);
    }

    #[test]
    fn test_beam_expires_after_persist() {
        let mut ctx = SimContext::for_tests();
        let beam = spawn_beam(&mut ctx, BeamShot { persist_ms: 250, ..shot(1) });
        let mut system = BeamSystem;
        ctx.store.begin_tick();
        let entities = ctx.store.query(system.required());
        system.update(&mut ctx, &entities, TickDelta::from_millis(125));
        assert!(ctx.store.is_alive(beam));
        system.update(&mut ctx, &entities, TickDelta::from_millis(125));
        assert!(!ctx.store.is_alive(beam));
    }
}
