//! Actor proximity to interactive tile objects.

use crate::components::{Position, TileObjectLink};
use crate::context::SimContext;
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::events::GameEvent;
use crate::scheduler::System;
use crate::time::TickDelta;

const REQUIRED: &[ComponentKind] = &[TileObjectLink::KIND, Position::KIND];

/// Emits `object:interact` every tick the actor is within an object's
/// interaction radius (boundary inclusive).
#[derive(Debug, Default)]
pub struct InteractionSystem;

impl System for InteractionSystem {
    fn name(&self) -> &str {
        "interaction"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        60
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], _dt: TickDelta) {
        let Some(actor) = ctx.actor_position() else {
            return;
        };
        let tile_size = ctx.terrain.tile_size();

        for &id in entities {
            let (Some(link), Some(position)) = (ctx.store.get::<TileObjectLink>(id), ctx.position(id)) else {
                continue;
            };
            let radius = ctx.defs.interaction_radius(&link.interaction, tile_size);
            let distance_sq = actor.distance_squared(position);
            if distance_sq > radius * radius {
                continue;
            }
            let event = GameEvent::ObjectInteract {
                entity: id,
                anchor: link.anchor,
                object_id: link.object_id.clone(),
                interaction: link.interaction.clone(),
                distance_sq,
            };
            ctx.bus.fire(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::events::EventKind;
    use crate::math::{Fixed, Vec2Fixed};
    use crate::terrain::TileCoord;

    fn object(ctx: &mut SimContext, at: Vec2Fixed, interaction: &str) -> EntityId {
        let id = ctx.store.create();
        ctx.store.attach(id, Position::new(at));
        ctx.store.attach(
            id,
            TileObjectLink {
                anchor: TileCoord::new(2, 2),
                object_id: "crate-01".into(),
                interaction: interaction.into(),
            },
        );
        id
    }

    fn run(ctx: &mut SimContext) {
        let mut system = InteractionSystem;
        ctx.store.begin_tick();
        let entities = ctx.store.query(system.required());
        system.update(ctx, &entities, TickDelta::from_millis(16));
    }

    #[test]
    fn test_no_actor_no_events() {
        let mut ctx = SimContext::for_tests();
        object(&mut ctx, Vec2Fixed::ZERO, "pickup");
        run(&mut ctx);
        assert_eq!(ctx.bus.log_len(), 0);
    }

    #[test]
    fn test_role_radius_selects_threshold() {
        let mut ctx = SimContext::for_tests();
        ctx.defs.interaction_radii.insert("door".into(), Fixed::from_num(20));
        let actor = ctx.store.create();
        ctx.store.attach(actor, Position::new(Vec2Fixed::from_ints(100, 100)));
        ctx.actor = Some(actor);

        let door = object(&mut ctx, Vec2Fixed::from_ints(130, 100), "door");
        // Default is 1.5 tiles of 32 = 48 units.
        let pickup = object(&mut ctx, Vec2Fixed::from_ints(148, 100), "pickup");
        run(&mut ctx);

        let hits: Vec<EntityId> = ctx
            .bus
            .events_of(EventKind::ObjectInteract)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::ObjectInteract { entity, .. } => Some(entity),
                _ => None,
            })
            .collect();
        assert!(!hits.contains(&door));
        assert_eq!(hits, vec![pickup]);
    }

    proptest! {
        /// Fires exactly when the squared distance is within the squared radius.
        #[test]
        fn prop_radius_boundary(dx in -80i32..80, dy in -80i32..80, radius in 1i32..64) {
            let mut ctx = SimContext::for_tests();
            ctx.defs.interaction_radii.insert("lever".into(), Fixed::from_num(radius));
            let actor = ctx.store.create();
            ctx.store.attach(actor, Position::new(Vec2Fixed::from_ints(300, 300)));
            ctx.actor = Some(actor);
            object(&mut ctx, Vec2Fixed::from_ints(300 + dx, 300 + dy), "lever");
            run(&mut ctx);

            let inside = dx * dx + dy * dy <= radius * radius;
            prop_assert_eq!(ctx.bus.events_of(EventKind::ObjectInteract).len(), usize::from(inside));
        }

        /// Points exactly on the radius count as in range.
        #[test]
        fn prop_exact_radius_inclusive(radius in 1i32..64, axis in any::<bool>()) {
            let mut ctx = SimContext::for_tests();
            ctx.defs.interaction_radii.insert("lever".into(), Fixed::from_num(radius));
            let actor = ctx.store.create();
            ctx.store.attach(actor, Position::new(Vec2Fixed::from_ints(300, 300)));
            ctx.actor = Some(actor);
            let offset = if axis { Vec2Fixed::from_ints(radius, 0) } else { Vec2Fixed::from_ints(0, -radius) };
            object(&mut ctx, Vec2Fixed::from_ints(300, 300) + offset, "lever");
            run(&mut ctx);
            prop_assert_eq!(ctx.bus.events_of(EventKind::ObjectInteract).len(), 1);
        }
    }
}
