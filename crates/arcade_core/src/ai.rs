//! AI behaviour: state machine, steering and trigger control.
//!
//! Every AI unit hunts the simulation's designated actor. Per tick:
//! 1. The state machine takes at most one step: `Idle → Chase` once the
//!    target is known, `Chase → Engage` inside fire range with a clear sight
//!    line, `Engage → Chase` past `fire_range × disengage_multiplier` or when
//!    sight is lost.
//! 2. Movement: chasers follow the shared flow field (or their squad slot),
//!    engaged units hold their preferred range and strafe.
//! 3. The unit aims and holds or releases its weapon trigger. The weapon
//!    system, which runs later in the tick, decides whether a shot happens.

use crate::components::{Ai, AiState, Aim, Heading, Mobility, Position, Velocity, Weapon};
use crate::context::SimContext;
use crate::data::ResolvedAiProfile;
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::events::GameEvent;
use crate::flow_field::FlowField;
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::rng::signed_unit;
use crate::scheduler::System;
use crate::terrain::terrain_speed_modifier;
use crate::time::{count_down, TickDelta};

const REQUIRED: &[ComponentKind] = &[Ai::KIND, Position::KIND];

/// Drives every entity with an [`Ai`] brain.
///
/// Owns the flow field toward the actor's tile and rebuilds it once the
/// actor has moved `flow_recompute_tiles` tiles.
#[derive(Debug, Default)]
pub struct AiSystem {
    flow: FlowField,
}

impl AiSystem {
    /// System with an empty flow field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current flow field.
    #[must_use]
    pub const fn flow_field(&self) -> &FlowField {
        &self.flow
    }
}

/// What one unit does this tick.
struct Intent {
    /// Unit movement direction, zero to stand still.
    heading: Vec2Fixed,
    speed: Fixed,
    /// Aim to apply, if the turret moves this tick.
    aim: Option<Aim>,
    fire: bool,
}

impl System for AiSystem {
    fn name(&self) -> &str {
        "ai"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        10
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta) {
        let Some(target) = ctx.actor_position() else {
            tracing::trace!("AI target has no position");
            for &id in entities {
                if let Some(weapon) = ctx.store.get_mut::<Weapon>(id) {
                    weapon.trigger_held = false;
                }
            }
            return;
        };

        if let Some(goal) = ctx.terrain.world_to_tile(target) {
            if self.flow.needs_recompute(goal, ctx.config.flow_recompute_tiles) {
                self.flow.compute(ctx.terrain.as_ref(), goal);
            }
        }

        let neighbours: Vec<(EntityId, Vec2Fixed)> = entities
            .iter()
            .filter_map(|&id| Some((id, ctx.position(id)?)))
            .collect();

        for &id in entities {
            let Some(position) = ctx.position(id) else {
                continue;
            };
            let Some(mut ai) = ctx.store.get::<Ai>(id).cloned() else {
                continue;
            };

            let distance = position.distance(target);
            let entered = step_state(ctx, id, &mut ai, position, target, distance);

            let max_speed = ctx.store.get::<Mobility>(id).map_or(Fixed::ZERO, |m| m.max_speed);
            let speed =
                max_speed * terrain_speed_modifier(ctx.terrain.as_ref(), &ctx.defs.terrain_costs, position);
            let separation = separation(
                id,
                position,
                &neighbours,
                ctx.config.separation_radius,
                ctx.config.separation_weight,
            );

            let intent = match ai.state {
                AiState::Idle => Intent {
                    heading: Vec2Fixed::ZERO,
                    speed: Fixed::ZERO,
                    aim: None,
                    fire: false,
                },
                AiState::Chase => self.chase(ctx, &mut ai, position, target, distance, speed, separation, dt),
                AiState::Engage => engage(ctx, &mut ai, position, target, distance, speed, separation, entered, dt),
            };

            apply_intent(ctx, id, intent);
            if let Some(slot) = ctx.store.get_mut::<Ai>(id) {
                *slot = ai;
            }
        }
    }
}

impl AiSystem {
    fn chase(
        &self,
        ctx: &mut SimContext,
        ai: &mut Ai,
        position: Vec2Fixed,
        target: Vec2Fixed,
        distance: Fixed,
        speed: Fixed,
        separation: Vec2Fixed,
        dt: TickDelta,
    ) -> Intent {
        let heading = match formation_heading(ctx, ai, position) {
            Some(heading) => heading,
            None => {
                let toward = ctx
                    .terrain
                    .world_to_tile(position)
                    .and_then(|tile| self.flow.direction(tile))
                    .unwrap_or_else(|| (target - position).normalize());
                let offset = ai.params.chase_offset_angle * Fixed::from_num(ai.strafe_sign);
                let toward = if offset == Fixed::ZERO { toward } else { toward.rotate(offset) };
                (toward + separation).normalize()
            }
        };

        let mut aim = None;
        ai.retarget_timer = count_down(ai.retarget_timer, dt.secs());
        if ai.retarget_timer == Fixed::ZERO {
            ai.retarget_timer = ai.params.retarget_interval;
            aim = Some(Aim::at(position, target));
        }

        let fire = ai.params.fire_on_move
            && distance < ai.params.fire_range * ctx.config.disengage_multiplier
            && ctx.terrain.line_of_sight(position, target);
        if fire {
            aim = Some(spread_aim(ctx, &ai.params, position, target));
        }

        Intent {
            heading,
            speed,
            aim,
            fire,
        }
    }
}

/// Take at most one state-machine step. Returns whether `Engage` was
/// entered this tick.
fn step_state(
    ctx: &mut SimContext,
    id: EntityId,
    ai: &mut Ai,
    position: Vec2Fixed,
    target: Vec2Fixed,
    distance: Fixed,
) -> bool {
    let next = match ai.state {
        AiState::Idle => AiState::Chase,
        AiState::Chase
            if distance < ai.params.fire_range && ctx.terrain.line_of_sight(position, target) =>
        {
            AiState::Engage
        }
        AiState::Engage
            if distance > ai.params.fire_range * ctx.config.disengage_multiplier
                || !ctx.terrain.line_of_sight(position, target) =>
        {
            AiState::Chase
        }
        state => state,
    };
    if next == ai.state {
        return false;
    }

    let from = ai.state;
    ai.state = next;
    tracing::debug!(entity = id, from = from.as_str(), to = next.as_str(), "AI state change");
    ctx.bus.fire(GameEvent::AiStateChanged {
        entity: id,
        from,
        to: next,
    });
    if next == AiState::Engage {
        ai.reaction_timer = ai.params.reaction_time;
        return true;
    }
    false
}

fn engage(
    ctx: &mut SimContext,
    ai: &mut Ai,
    position: Vec2Fixed,
    target: Vec2Fixed,
    distance: Fixed,
    speed: Fixed,
    separation: Vec2Fixed,
    entered: bool,
    dt: TickDelta,
) -> Intent {
    let params = &ai.params;
    let to_target = (target - position).normalize();

    // Strafers circle at preferred range; everyone else closes in.
    let engage_speed = speed * params.engage_speed_fraction;
    let heading = if engage_speed <= Fixed::ZERO {
        Vec2Fixed::ZERO
    } else if params.engage_strafe_rate > Fixed::ZERO {
        let range_diff = distance - params.preferred_range;
        let radial = if range_diff.abs() > params.preferred_range / Fixed::from_num(10) {
            if range_diff > Fixed::ZERO {
                to_target
            } else {
                -to_target
            }
        } else {
            Vec2Fixed::ZERO
        };
        let tangent = to_target.perp() * Fixed::from_num(ai.strafe_sign);
        (tangent + radial * ratio(1, 2) + separation).normalize()
    } else {
        (to_target + separation).normalize()
    };

    if !entered {
        ai.reaction_timer = count_down(ai.reaction_timer, dt.secs());
    }
    let fire = ai.reaction_timer == Fixed::ZERO;
    let aim = if fire {
        spread_aim(ctx, &ai.params, position, target)
    } else {
        Aim::at(position, target)
    };

    Intent {
        heading,
        speed: engage_speed,
        aim: Some(aim),
        fire,
    }
}

/// Heading toward the squad slot, or `None` when the unit is not in a
/// formation. A unit already on its slot stands still.
fn formation_heading(ctx: &SimContext, ai: &mut Ai, position: Vec2Fixed) -> Option<Vec2Fixed> {
    let lead = ai.squad_lead?;
    let Some(lead_position) = ctx.position(lead) else {
        tracing::debug!(lead, "Squad lead gone, breaking formation");
        ai.squad_lead = None;
        return None;
    };
    let facing = ctx.store.get::<Heading>(lead).copied().unwrap_or_default().direction;
    let slot = lead_position + ai.formation_offset.rotate_into(facing);
    let to_slot = slot - position;
    if to_slot.length() > ctx.config.slot_reach_radius {
        Some(to_slot.normalize())
    } else {
        Some(Vec2Fixed::ZERO)
    }
}

/// Push away from nearby AI units, scaled by `weight`.
fn separation(
    id: EntityId,
    position: Vec2Fixed,
    neighbours: &[(EntityId, Vec2Fixed)],
    radius: Fixed,
    weight: Fixed,
) -> Vec2Fixed {
    let radius_sq = radius * radius;
    let mut push = Vec2Fixed::ZERO;
    for &(other, other_position) in neighbours {
        if other == id {
            continue;
        }
        let away = position - other_position;
        let dist_sq = away.dot(away);
        if dist_sq > Fixed::ZERO && dist_sq < radius_sq {
            push += away.normalize();
        }
    }
    push.normalize() * weight
}

/// Aim at `target` with a random error of up to `max_spread · (1 − accuracy)`.
fn spread_aim(ctx: &mut SimContext, params: &ResolvedAiProfile, from: Vec2Fixed, target: Vec2Fixed) -> Aim {
    let mut aim = Aim::at(from, target);
    let max_error = params.max_spread * (Fixed::ONE - params.accuracy);
    if max_error > Fixed::ZERO {
        aim.direction = aim.direction.rotate(max_error * signed_unit(&mut ctx.rng));
    }
    aim
}

fn apply_intent(ctx: &mut SimContext, id: EntityId, intent: Intent) {
    if let Some(velocity) = ctx.store.get_mut::<Velocity>(id) {
        velocity.value = intent.heading * intent.speed;
    }
    if !intent.heading.is_zero() && intent.speed > Fixed::ZERO {
        if let Some(heading) = ctx.store.get_mut::<Heading>(id) {
            heading.direction = intent.heading;
        }
    }
    if let Some(aim) = intent.aim {
        ctx.store.attach(id, aim);
    }
    if let Some(weapon) = ctx.store.get_mut::<Weapon>(id) {
        weapon.trigger_held = intent.fire;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::{AiRole, WeaponId};
    use crate::events::EventKind;
    use crate::terrain::{TileCell, TileCoord, TileGrid};
    use crate::weapon::WeaponSystem;

    fn run_system(ctx: &mut SimContext, system: &mut dyn System, dt: TickDelta) {
        let entities = ctx.store.query(system.required());
        ctx.store.begin_pass();
        system.update(ctx, &entities, dt);
        ctx.store.end_pass();
    }

    fn tick(ctx: &mut SimContext, ai: &mut AiSystem, ms: u32) {
        ctx.store.begin_tick();
        run_system(ctx, ai, TickDelta::from_millis(ms));
    }

    fn with_actor(ctx: &mut SimContext, at: Vec2Fixed) -> EntityId {
        let actor = ctx.store.create();
        ctx.store.attach(actor, Position::new(at));
        ctx.actor = Some(actor);
        actor
    }

    fn unit(ctx: &mut SimContext, role: AiRole, at: Vec2Fixed) -> EntityId {
        let params = ctx.defs.ai_profile(role).map(|p| p.unscaled()).expect("builtin role");
        let id = ctx.store.create();
        ctx.store.attach(id, Position::new(at));
        ctx.store.attach(id, Velocity::ZERO);
        ctx.store.attach(id, Heading::default());
        ctx.store.attach(id, Ai::new(role, params, 1));
        id
    }

    fn state(ctx: &SimContext, id: EntityId) -> Option<AiState> {
        ctx.store.get::<Ai>(id).map(|ai| ai.state)
    }

    fn velocity(ctx: &SimContext, id: EntityId) -> Option<Vec2Fixed> {
        ctx.store.get::<Velocity>(id).map(|v| v.value)
    }

    // ========================================================================
    // State machine
    // ========================================================================

    #[test]
    fn test_one_transition_per_tick() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(250, 100));
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));

        tick(&mut ctx, &mut system, 125);
        assert_eq!(state(&ctx, grunt), Some(AiState::Chase));
        tick(&mut ctx, &mut system, 125);
        assert_eq!(state(&ctx, grunt), Some(AiState::Engage));

        let transitions: Vec<(AiState, AiState)> = ctx
            .bus
            .events_of(EventKind::AiState)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::AiStateChanged { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![(AiState::Idle, AiState::Chase), (AiState::Chase, AiState::Engage)]
        );
    }

    #[test]
    fn test_reaction_timer_gates_first_shot() {
        let mut ctx = SimContext::for_tests();
        let mut ai_system = AiSystem::new();
        let mut weapons = WeaponSystem;
        with_actor(&mut ctx, Vec2Fixed::from_ints(250, 100));
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));
        ctx.store.attach(grunt, Weapon::new(WeaponId::from("gun-03")));

        // Tick 1 chases, tick 2 engages and arms the 0.5 s timer, which then
        // runs out on tick 6.
        let mut fired_at = Vec::new();
        for n in 1..=6 {
            ctx.store.begin_tick();
            let dt = TickDelta::from_millis(125);
            run_system(&mut ctx, &mut ai_system, dt);
            run_system(&mut ctx, &mut weapons, dt);
            if !ctx.bus.events_of(EventKind::WeaponFired).is_empty() {
                fired_at.push(n);
                ctx.bus.clear_log();
            }
            if n == 2 {
                assert_eq!(
                    ctx.store.get::<Ai>(grunt).map(|ai| ai.reaction_timer),
                    Some(ratio(1, 2))
                );
            }
        }
        assert_eq!(fired_at, vec![6]);
        assert_eq!(ctx.store.get::<Weapon>(grunt).map(|w| w.trigger_held), Some(true));
    }

    #[test]
    fn test_disengage_hysteresis() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        let actor = with_actor(&mut ctx, Vec2Fixed::from_ints(320, 100));
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));
        if let Some(ai) = ctx.store.get_mut::<Ai>(grunt) {
            ai.state = AiState::Engage;
        }

        // 220 is past fire range (200) but inside 200 × 1.2.
        tick(&mut ctx, &mut system, 16);
        assert_eq!(state(&ctx, grunt), Some(AiState::Engage));

        if let Some(pos) = ctx.store.get_mut::<Position>(actor) {
            pos.value = Vec2Fixed::from_ints(350, 100);
        }
        tick(&mut ctx, &mut system, 16);
        assert_eq!(state(&ctx, grunt), Some(AiState::Chase));
    }

    #[test]
    fn test_target_without_position_keeps_state() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        let actor = ctx.store.create();
        ctx.actor = Some(actor);
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));
        ctx.store.attach(grunt, Weapon::new(WeaponId::from("gun-03")));
        if let Some(ai) = ctx.store.get_mut::<Ai>(grunt) {
            ai.state = AiState::Chase;
        }
        if let Some(weapon) = ctx.store.get_mut::<Weapon>(grunt) {
            weapon.trigger_held = true;
        }

        tick(&mut ctx, &mut system, 16);
        assert_eq!(state(&ctx, grunt), Some(AiState::Chase));
        assert_eq!(ctx.bus.log_len(), 0);
        assert_eq!(ctx.store.get::<Weapon>(grunt).map(|w| w.trigger_held), Some(false));
    }

    #[test]
    fn test_blocked_sight_prevents_engage() {
        let mut grid = TileGrid::new(20, 20, Fixed::from_num(32), TileCell::open("grass"));
        grid.set_cell(TileCoord::new(3, 5), TileCell::wall("rock", false));
        let mut ctx = SimContext::for_tests();
        ctx.terrain = Box::new(grid);
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(250, 100));
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));

        for _ in 0..3 {
            tick(&mut ctx, &mut system, 16);
        }
        assert_eq!(state(&ctx, grunt), Some(AiState::Chase));
    }

    // ========================================================================
    // Movement
    // ========================================================================

    #[test]
    fn test_chase_aim_holds_until_retarget() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        let actor = with_actor(&mut ctx, Vec2Fixed::from_ints(600, 100));
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));
        let aim = |ctx: &SimContext| ctx.store.get::<Aim>(grunt).map(|a| a.direction);

        // Entering Chase aims at once and arms the 0.3 s timer.
        tick(&mut ctx, &mut system, 16);
        assert_eq!(state(&ctx, grunt), Some(AiState::Chase));
        let first = aim(&ctx).unwrap_or_default();
        assert!(first.x > Fixed::ZERO && first.y == Fixed::ZERO);

        if let Some(pos) = ctx.store.get_mut::<Position>(actor) {
            pos.value = Vec2Fixed::from_ints(100, 600);
        }
        tick(&mut ctx, &mut system, 100);
        tick(&mut ctx, &mut system, 100);
        assert_eq!(aim(&ctx), Some(first));
        assert!(ctx.store.get::<Ai>(grunt).is_some_and(|ai| ai.retarget_timer > Fixed::ZERO));

        tick(&mut ctx, &mut system, 200);
        let turned = aim(&ctx).unwrap_or_default();
        assert!(turned.x == Fixed::ZERO && turned.y > Fixed::ZERO);
        assert_eq!(
            ctx.store.get::<Ai>(grunt).map(|ai| ai.retarget_timer),
            Some(ratio(3, 10))
        );
    }

    #[test]
    fn test_chase_follows_flow_field() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(48, 560));
        let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(48, 48));
        ctx.store.attach(grunt, Mobility { max_speed: Fixed::from_num(50) });

        tick(&mut ctx, &mut system, 16);
        assert_eq!(system.flow_field().goal(), Some(TileCoord::new(17, 1)));
        assert_eq!(velocity(&ctx, grunt), Some(Vec2Fixed::from_ints(0, 50)));
        assert_eq!(
            ctx.store.get::<Heading>(grunt).map(|h| h.direction),
            Some(Vec2Fixed::from_ints(0, 1))
        );
    }

    #[test]
    fn test_squad_follower_steers_to_slot_then_breaks_formation() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(600, 600));
        let lead = ctx.store.create();
        ctx.store.attach(lead, Position::new(Vec2Fixed::from_ints(200, 200)));
        ctx.store.attach(lead, Heading::default());

        let follower = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 200));
        ctx.store.attach(follower, Mobility { max_speed: Fixed::from_num(60) });
        if let Some(ai) = ctx.store.get_mut::<Ai>(follower) {
            ai.squad_lead = Some(lead);
            ai.formation_offset = Vec2Fixed::from_ints(-40, 0);
        }

        tick(&mut ctx, &mut system, 16);
        assert_eq!(velocity(&ctx, follower), Some(Vec2Fixed::from_ints(60, 0)));

        // On the slot: stand still.
        if let Some(pos) = ctx.store.get_mut::<Position>(follower) {
            pos.value = Vec2Fixed::from_ints(165, 200);
        }
        tick(&mut ctx, &mut system, 16);
        assert_eq!(velocity(&ctx, follower), Some(Vec2Fixed::ZERO));

        ctx.store.destroy(lead);
        tick(&mut ctx, &mut system, 16);
        assert_eq!(ctx.store.get::<Ai>(follower).and_then(|ai| ai.squad_lead), None);
        assert!(velocity(&ctx, follower).is_some_and(|v| !v.is_zero()));
    }

    #[test]
    fn test_engage_strafes_at_preferred_range() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(250, 100));
        let flanker = unit(&mut ctx, AiRole::Flanker, Vec2Fixed::from_ints(100, 100));
        ctx.store.attach(flanker, Mobility { max_speed: Fixed::from_num(100) });
        if let Some(ai) = ctx.store.get_mut::<Ai>(flanker) {
            ai.state = AiState::Engage;
        }

        tick(&mut ctx, &mut system, 16);
        let v = velocity(&ctx, flanker).unwrap_or_default();
        assert_eq!(v.x, Fixed::ZERO);
        assert!(v.y > Fixed::ZERO);
    }

    #[test]
    fn test_engaged_rusher_closes_inside_preferred_range() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(140, 100));
        let rusher = unit(&mut ctx, AiRole::Rusher, Vec2Fixed::from_ints(100, 100));
        ctx.store.attach(rusher, Mobility { max_speed: Fixed::from_num(100) });
        if let Some(ai) = ctx.store.get_mut::<Ai>(rusher) {
            ai.state = AiState::Engage;
        }

        // 40 is well inside the rusher's preferred range of 60.
        tick(&mut ctx, &mut system, 16);
        assert_eq!(state(&ctx, rusher), Some(AiState::Engage));
        let v = velocity(&ctx, rusher).unwrap_or_default();
        assert!(v.x > Fixed::ZERO, "rusher moved away: {v:?}");
        assert_eq!(v.y, Fixed::ZERO);
    }

    #[test]
    fn test_stationary_role_stops_when_engaged() {
        let mut ctx = SimContext::for_tests();
        let mut system = AiSystem::new();
        with_actor(&mut ctx, Vec2Fixed::from_ints(250, 100));
        let sniper = unit(&mut ctx, AiRole::Sniper, Vec2Fixed::from_ints(100, 100));
        ctx.store.attach(sniper, Mobility { max_speed: Fixed::from_num(80) });
        ctx.store.attach(sniper, Velocity::new(Vec2Fixed::from_ints(5, 5)));
        if let Some(ai) = ctx.store.get_mut::<Ai>(sniper) {
            ai.state = AiState::Engage;
        }

        tick(&mut ctx, &mut system, 16);
        assert_eq!(velocity(&ctx, sniper), Some(Vec2Fixed::ZERO));
    }

    #[test]
    fn test_separation_pushes_apart() {
        let neighbours = [
            (1, Vec2Fixed::from_ints(100, 100)),
            (2, Vec2Fixed::from_ints(120, 100)),
            (3, Vec2Fixed::from_ints(400, 100)),
        ];
        let push = separation(1, neighbours[0].1, &neighbours, Fixed::from_num(50), Fixed::ONE);
        assert_eq!(push, Vec2Fixed::from_ints(-1, 0));
    }

    proptest! {
        /// While engaged the reaction timer never goes up.
        #[test]
        fn prop_reaction_timer_non_increasing(steps in prop::collection::vec(1u32..200, 1..30)) {
            let mut ctx = SimContext::for_tests();
            let mut system = AiSystem::new();
            with_actor(&mut ctx, Vec2Fixed::from_ints(250, 100));
            let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));
            if let Some(ai) = ctx.store.get_mut::<Ai>(grunt) {
                ai.state = AiState::Engage;
            }

            let mut last = ctx.store.get::<Ai>(grunt).map(|ai| ai.reaction_timer);
            for ms in steps {
                tick(&mut ctx, &mut system, ms);
                let now = ctx.store.get::<Ai>(grunt).map(|ai| ai.reaction_timer);
                prop_assert!(now <= last);
                prop_assert!(now >= Some(Fixed::ZERO));
                last = now;
            }
        }

        /// While chasing the retarget timer only goes up when it expired
        /// and was rearmed.
        #[test]
        fn prop_retarget_timer_non_increasing(steps in prop::collection::vec(1u32..200, 1..30)) {
            let mut ctx = SimContext::for_tests();
            let mut system = AiSystem::new();
            with_actor(&mut ctx, Vec2Fixed::from_ints(600, 100));
            let grunt = unit(&mut ctx, AiRole::Grunt, Vec2Fixed::from_ints(100, 100));
            if let Some(ai) = ctx.store.get_mut::<Ai>(grunt) {
                ai.state = AiState::Chase;
            }
            let interval = ratio(3, 10);

            let mut last = ctx.store.get::<Ai>(grunt).map_or(Fixed::ZERO, |ai| ai.retarget_timer);
            for ms in steps {
                tick(&mut ctx, &mut system, ms);
                prop_assert_eq!(state(&ctx, grunt), Some(AiState::Chase));
                let now = ctx.store.get::<Ai>(grunt).map_or(Fixed::ZERO, |ai| ai.retarget_timer);
                if now > last {
                    prop_assert_eq!(now, interval);
                    prop_assert!(last <= TickDelta::from_millis(ms).secs());
                }
                prop_assert!(now >= Fixed::ZERO && now <= interval);
                last = now;
            }
        }
    }
}
