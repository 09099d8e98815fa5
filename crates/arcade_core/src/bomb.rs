//! Placed explosives.
//!
//! Bombs arm after `arm_ms`, then wait for their trigger: an entity in
//! range (proximity), a fuse (timed) or a command (remote). Remote bombs
//! chain to every armed bomb within their chain radius. A bomb's
//! `detonated` guard is set before any chain is followed, so cyclic chain
//! graphs explode each bomb once.

use crate::components::{Bomb, BombState, Health, Position};
use crate::context::SimContext;
use crate::data::BombKind;
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::error::{GameError, Result};
use crate::events::{GameEvent, SplashSource};
use crate::math::{Fixed, Vec2Fixed};
use crate::scheduler::System;
use crate::time::TickDelta;

/// Place a bomb of `kind` at `position` for `owner`.
pub fn place_bomb(
    ctx: &mut SimContext,
    owner: EntityId,
    position: Vec2Fixed,
    kind: BombKind,
) -> Result<EntityId> {
    ctx.defs.bomb(kind)?;
    let id = ctx.store.create();
    ctx.store.attach(id, Position::new(position));
    ctx.store.attach(id, Bomb::new(kind, owner));
    ctx.bus.fire(GameEvent::BombPlaced {
        bomb: id,
        owner,
        kind,
        position,
    });
    Ok(id)
}

/// Detonate a bomb on command, whatever its state.
///
/// Returns `false` if it had already gone off.
pub fn detonate_bomb(ctx: &mut SimContext, bomb: EntityId) -> Result<bool> {
    let state = ctx
        .store
        .get::<Bomb>(bomb)
        .ok_or(GameError::MissingComponent {
            entity: bomb,
            component: Bomb::KIND.name(),
        })?;
    if state.detonated {
        return Ok(false);
    }
    detonate(ctx, bomb);
    Ok(true)
}

/// Detonate every armed remote bomb placed by `owner`. Returns how many
/// were set off directly (chained bombs are not counted).
pub fn trigger_remote_bombs(ctx: &mut SimContext, owner: EntityId) -> usize {
    let ready: Vec<EntityId> = ctx
        .store
        .iter::<Bomb>()
        .filter(|(_, b)| {
            b.owner == owner && b.kind == BombKind::Remote && b.state == BombState::Armed && !b.detonated
        })
        .map(|(id, _)| id)
        .collect();

    let mut triggered = 0;
    for id in ready {
        // An earlier bomb in this batch may have chained into this one.
        if ctx.store.get::<Bomb>(id).is_some_and(|b| !b.detonated) {
            detonate(ctx, id);
            triggered += 1;
        }
    }
    triggered
}

/// Remove every bomb without detonating it. Returns how many were removed.
pub fn clear_bombs(ctx: &mut SimContext) -> usize {
    let bombs: Vec<EntityId> = ctx.store.iter::<Bomb>().map(|(id, _)| id).collect();
    for &id in &bombs {
        ctx.store.destroy(id);
    }
    bombs.len()
}

/// Explode `first` and follow its chain.
fn detonate(ctx: &mut SimContext, first: EntityId) {
    let mut pending = vec![(first, false)];

    while let Some((id, chained)) = pending.pop() {
        let Some(position) = ctx.position(id) else {
            continue;
        };
        let Some(bomb) = ctx.store.get_mut::<Bomb>(id) else {
            continue;
        };
        if bomb.detonated {
            continue;
        }
        bomb.detonated = true;
        bomb.state = BombState::Detonating;
        bomb.elapsed_ms = Fixed::ZERO;
        let (kind, owner) = (bomb.kind, bomb.owner);

        let Ok(def) = ctx.defs.bomb(kind) else {
            tracing::trace!(bomb = id, %kind, "Bomb without definition fizzled");
            continue;
        };
        let (damage, radius, chain_radius) = (def.damage, def.splash_radius, def.chain_radius);

        tracing::debug!(bomb = id, %kind, chained, "Bomb detonated");
        ctx.bus.fire(GameEvent::SplashDetonated {
            owner,
            position,
            radius,
            damage,
            source: SplashSource::Bomb,
        });
        ctx.bus.fire(GameEvent::BombExploded {
            bomb: id,
            owner,
            kind,
            position,
            chained,
        });

        let Some(chain_radius) = chain_radius.filter(|_| kind == BombKind::Remote) else {
            continue;
        };
        let reach_sq = chain_radius * chain_radius;
        for (other, other_bomb) in ctx.store.iter::<Bomb>() {
            if other == id || other_bomb.detonated || other_bomb.state != BombState::Armed {
                continue;
            }
            let in_reach = ctx
                .position(other)
                .is_some_and(|p| p.distance_squared(position) <= reach_sq);
            if in_reach {
                pending.push((other, true));
            }
        }
    }
}

const REQUIRED: &[ComponentKind] = &[Bomb::KIND, Position::KIND];

/// Advances bomb arming, fuses and proximity triggers.
#[derive(Debug, Default)]
pub struct BombSystem;

impl System for BombSystem {
    fn name(&self) -> &str {
        "bomb"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        35
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta) {
        let bodies: Vec<(EntityId, Vec2Fixed)> = ctx
            .store
            .query(&[Position::KIND, Health::KIND])
            .into_iter()
            .filter_map(|id| Some((id, ctx.position(id)?)))
            .collect();

        for &id in entities {
            let Some(position) = ctx.position(id) else {
                continue;
            };
            let Some(bomb) = ctx.store.get::<Bomb>(id).copied() else {
                continue;
            };
            if bomb.state == BombState::Detonating {
                ctx.store.destroy(id);
                continue;
            }
            if bomb.detonated {
                continue;
            }
            let Ok(def) = ctx.defs.bomb(bomb.kind) else {
                tracing::trace!(bomb = id, kind = %bomb.kind, "Skipping bomb without definition");
                continue;
            };
            let (arm_ms, fuse_ms, trigger_radius) = (def.arm_ms, def.fuse_ms, def.trigger_radius);

            let mut next = bomb;
            next.elapsed_ms += dt.millis();

            let trigger = match next.state {
                BombState::Arming => {
                    let arm = Fixed::from_num(arm_ms);
                    if next.elapsed_ms >= arm {
                        next.state = BombState::Armed;
                        next.elapsed_ms = Fixed::ZERO;
                        tracing::debug!(bomb = id, kind = %next.kind, "Bomb armed");
                        ctx.bus.fire(GameEvent::BombArmed {
                            bomb: id,
                            kind: next.kind,
                        });
                    }
                    false
                }
                BombState::Armed => match next.kind {
                    BombKind::Timed => {
                        fuse_ms.is_some_and(|fuse| next.elapsed_ms >= Fixed::from_num(fuse))
                    }
                    BombKind::Proximity => trigger_radius.is_some_and(|radius| {
                        let reach_sq = radius * radius;
                        bodies.iter().any(|&(body, at)| {
                            body != next.owner && at.distance_squared(position) <= reach_sq
                        })
                    }),
                    BombKind::Remote => false,
                },
                BombState::Detonating => false,
            };

            if let Some(slot) = ctx.store.get_mut::<Bomb>(id) {
                *slot = next;
            }
            if trigger {
                detonate(ctx, id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use proptest::prelude::*;

    use super::*;
    use crate::events::EventKind;

    fn run(ctx: &mut SimContext, ms: u32) {
        let mut system = BombSystem;
        ctx.store.begin_tick();
        let entities = ctx.store.query(system.required());
        ctx.store.begin_pass();
        system.update(ctx, &entities, TickDelta::from_millis(ms));
        ctx.store.end_pass();
    }

    fn state(ctx: &SimContext, id: EntityId) -> Option<BombState> {
        ctx.store.get::<Bomb>(id).map(|b| b.state)
    }

    fn exploded(ctx: &SimContext) -> Vec<EntityId> {
        ctx.bus
            .events_of(EventKind::BombExploded)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::BombExploded { bomb, .. } => Some(bomb),
                _ => None,
            })
            .collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn test_timed_bomb_scenario() {
        let mut ctx = SimContext::for_tests();
        let bomb = place_bomb(&mut ctx, 1, Vec2Fixed::from_ints(100, 100), BombKind::Timed).expect("place");

        let mut t = 0;
        while t < 3500 {
            let expected = if t < 500 { BombState::Arming } else { BombState::Armed };
            assert_eq!(state(&ctx, bomb), Some(expected), "t = {t}");
            run(&mut ctx, 100);
            t += 100;
        }
        assert_eq!(state(&ctx, bomb), Some(BombState::Detonating));
        assert!(ctx.store.get::<Bomb>(bomb).is_some_and(|b| b.detonated));
        assert_eq!(exploded(&ctx), vec![bomb]);
        assert_eq!(ctx.bus.events_of(EventKind::BombArmed).len(), 1);

        run(&mut ctx, 100);
        assert!(!ctx.store.is_alive(bomb));
        assert_eq!(exploded(&ctx).len(), 1);
    }

    #[test]
    fn test_fuse_starts_when_armed() {
        let mut ctx = SimContext::for_tests();
        let bomb = place_bomb(&mut ctx, 1, Vec2Fixed::ZERO, BombKind::Timed).expect("place");

        // 100 ms past the 500 ms arm time is dropped, not put on the fuse.
        run(&mut ctx, 600);
        assert_eq!(state(&ctx, bomb), Some(BombState::Armed));
        assert_eq!(ctx.store.get::<Bomb>(bomb).map(|b| b.elapsed_ms), Some(Fixed::ZERO));

        run(&mut ctx, 2999);
        assert_eq!(state(&ctx, bomb), Some(BombState::Armed));
        run(&mut ctx, 1);
        assert_eq!(state(&ctx, bomb), Some(BombState::Detonating));
    }

    #[test]
    fn test_chained_bombs_removed_on_next_update() {
        let mut ctx = SimContext::for_tests();
        // The chain runs from the later bomb back to the earlier one.
        let early = place_bomb(&mut ctx, 2, Vec2Fixed::from_ints(100, 100), BombKind::Remote).expect("early");
        let late = place_bomb(&mut ctx, 1, Vec2Fixed::from_ints(150, 100), BombKind::Remote).expect("late");
        run(&mut ctx, 250);

        assert_eq!(trigger_remote_bombs(&mut ctx, 1), 1);
        assert_eq!(state(&ctx, early), Some(BombState::Detonating));
        assert_eq!(state(&ctx, late), Some(BombState::Detonating));

        run(&mut ctx, 16);
        assert!(!ctx.store.is_alive(early));
        assert!(!ctx.store.is_alive(late));
        assert_eq!(exploded(&ctx).len(), 2);
    }

    #[test]
    fn test_proximity_ignores_owner() {
        let mut ctx = SimContext::for_tests();
        let owner = ctx.store.create();
        ctx.store.attach(owner, Position::new(Vec2Fixed::from_ints(100, 100)));
        ctx.store.attach(owner, Health::new(100));
        let bomb = place_bomb(&mut ctx, owner, Vec2Fixed::from_ints(110, 100), BombKind::Proximity)
            .expect("place");

        for _ in 0..20 {
            run(&mut ctx, 100);
        }
        assert_eq!(state(&ctx, bomb), Some(BombState::Armed));

        let victim = ctx.store.create();
        ctx.store.attach(victim, Position::new(Vec2Fixed::from_ints(170, 100)));
        ctx.store.attach(victim, Health::new(100));
        run(&mut ctx, 100);
        // Trigger radius 60 is inclusive.
        assert_eq!(state(&ctx, bomb), Some(BombState::Detonating));
    }

    #[test]
    fn test_remote_waits_for_command_and_chains() {
        let mut ctx = SimContext::for_tests();
        let a = place_bomb(&mut ctx, 1, Vec2Fixed::from_ints(100, 100), BombKind::Remote).expect("a");
        let b = place_bomb(&mut ctx, 1, Vec2Fixed::from_ints(200, 100), BombKind::Timed).expect("b");
        let far = place_bomb(&mut ctx, 1, Vec2Fixed::from_ints(400, 100), BombKind::Remote).expect("c");
        let other_owner = place_bomb(&mut ctx, 2, Vec2Fixed::from_ints(100, 300), BombKind::Remote)
            .expect("d");
        for _ in 0..6 {
            run(&mut ctx, 100);
        }
        assert_eq!(state(&ctx, a), Some(BombState::Armed));

        assert_eq!(trigger_remote_bombs(&mut ctx, 1), 2);
        let mut hit = exploded(&ctx);
        hit.sort_unstable();
        assert_eq!(hit, vec![a, b, far]);
        assert_eq!(state(&ctx, other_owner), Some(BombState::Armed));

        let chained: Vec<bool> = ctx
            .bus
            .events_of(EventKind::BombExploded)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::BombExploded { bomb, chained, .. } if bomb == b => Some(chained),
                _ => None,
            })
            .collect();
        assert_eq!(chained, vec![true]);
    }

    #[test]
    fn test_detonate_command_is_one_shot() {
        let mut ctx = SimContext::for_tests();
        let bomb = place_bomb(&mut ctx, 1, Vec2Fixed::ZERO, BombKind::Remote).expect("place");
        assert!(detonate_bomb(&mut ctx, bomb).expect("first"));
        assert!(!detonate_bomb(&mut ctx, bomb).expect("second"));
        assert_eq!(ctx.bus.events_of(EventKind::SplashDetonated).len(), 1);

        let not_a_bomb = ctx.store.create();
        assert!(matches!(
            detonate_bomb(&mut ctx, not_a_bomb),
            Err(GameError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_clear_bombs() {
        let mut ctx = SimContext::for_tests();
        place_bomb(&mut ctx, 1, Vec2Fixed::ZERO, BombKind::Timed).expect("place");
        place_bomb(&mut ctx, 1, Vec2Fixed::ZERO, BombKind::Remote).expect("place");
        assert_eq!(clear_bombs(&mut ctx), 2);
        assert_eq!(ctx.store.iter::<Bomb>().count(), 0);
        assert!(exploded(&ctx).is_empty());
    }

    #[test]
    fn test_unknown_bomb_kind_rejected() {
        let mut ctx = SimContext::for_tests();
        ctx.defs.bombs.remove(&BombKind::Timed);
        assert!(matches!(
            place_bomb(&mut ctx, 1, Vec2Fixed::ZERO, BombKind::Timed),
            Err(GameError::UnknownBombKind(_))
        ));
    }

    // ========================================================================
    // Properties
    // ========================================================================

    proptest! {
        /// Every bomb reachable through the chain graph explodes exactly once.
        #[test]
        fn prop_chain_detonates_each_bomb_once(
            spots in proptest::collection::vec((0i32..600, 0i32..600), 2..12)
        ) {
            let mut ctx = SimContext::for_tests();
            let ids: Vec<EntityId> = spots
                .iter()
                .map(|&(x, y)| {
                    place_bomb(&mut ctx, 1, Vec2Fixed::from_ints(x, y), BombKind::Remote).expect("place")
                })
                .collect();
            run(&mut ctx, 250);

            let at: BTreeMap<EntityId, Vec2Fixed> = ids
                .iter()
                .zip(&spots)
                .map(|(&id, &(x, y))| (id, Vec2Fixed::from_ints(x, y)))
                .collect();
            let reach_sq = Fixed::from_num(150 * 150);
            let mut expected = BTreeSet::from([ids[0]]);
            let mut frontier = vec![ids[0]];
            while let Some(from) = frontier.pop() {
                for (&to, &pos) in &at {
                    if pos.distance_squared(at[&from]) <= reach_sq && expected.insert(to) {
                        frontier.push(to);
                    }
                }
            }

            detonate_bomb(&mut ctx, ids[0]).expect("detonate");
            let hits = exploded(&ctx);
            let unique: BTreeSet<EntityId> = hits.iter().copied().collect();
            prop_assert_eq!(unique.len(), hits.len());
            prop_assert_eq!(unique, expected);
        }

        /// Bomb clocks never run backwards within a state.
        #[test]
        fn prop_elapsed_monotonic(steps in proptest::collection::vec(1u32..250, 1..30)) {
            let mut ctx = SimContext::for_tests();
            let bomb = place_bomb(&mut ctx, 1, Vec2Fixed::ZERO, BombKind::Remote).expect("place");
            let mut last = (BombState::Arming, Fixed::ZERO);
            for ms in steps {
                run(&mut ctx, ms);
                let b = *ctx.store.get::<Bomb>(bomb).expect("bomb");
                prop_assert!(b.elapsed_ms >= Fixed::ZERO);
                if b.state == last.0 {
                    prop_assert!(b.elapsed_ms >= last.1);
                }
                last = (b.state, b.elapsed_ms);
            }
        }
    }
}
