//! Weapon state machine.
//!
//! Each tick, per weapon:
//! 1. Cooldown counts down.
//! 2. A switch in progress advances (stow, swap, draw).
//! 3. The active definition's fire mode runs against the trigger input:
//!    ballistic and splash shots, hold-to-charge release, single hitscan
//!    beams, or continuous beams with heat and batched damage.
//!
//! A shot is only ever taken when [`Weapon::can_fire`] holds.

use crate::beam::{spawn_beam, BeamShot};
use crate::components::{Ai, Aim, Position, SwitchPhase, Weapon};
use crate::context::SimContext;
use crate::data::{
    BallisticSpec, ChargeSpec, HitscanSpec, SplashSpec, UnderchargePolicy, WeaponBehavior,
    WeaponDef, WeaponId,
};
use crate::ecs::{Component, ComponentKind, EntityId};
use crate::error::{GameError, Result};
use crate::events::GameEvent;
use crate::math::{clamp01, Fixed, Vec2Fixed};
use crate::projectile::{spawn_projectile, ProjectileShot};
use crate::rng::signed_unit;
use crate::scheduler::System;
use crate::time::{count_down, TickDelta};

/// Set or release the trigger of an entity's weapon.
pub fn set_trigger(ctx: &mut SimContext, entity: EntityId, held: bool) -> Result<()> {
    let weapon = ctx
        .store
        .get_mut::<Weapon>(entity)
        .ok_or(GameError::MissingComponent {
            entity,
            component: Weapon::KIND.name(),
        })?;
    weapon.trigger_held = held;
    Ok(())
}

/// Ask an entity's weapon to switch to `next`.
///
/// Emits `weapon:switch` when stowing begins. A request made while a switch
/// is already running only replaces the pending weapon.
pub fn request_switch(ctx: &mut SimContext, entity: EntityId, next: WeaponId) -> Result<()> {
    ctx.defs.weapon(&next)?;
    let weapon = ctx
        .store
        .get_mut::<Weapon>(entity)
        .ok_or(GameError::MissingComponent {
            entity,
            component: Weapon::KIND.name(),
        })?;
    if weapon.switch_phase == SwitchPhase::None && weapon.def == next {
        return Ok(());
    }
    let current = weapon.def.clone();
    if weapon.request_switch(next) {
        tracing::debug!(entity, weapon = %current, "Weapon stowing");
        ctx.bus.fire(GameEvent::WeaponSwitch {
            owner: entity,
            phase: SwitchPhase::Stowing,
            weapon: current,
        });
    }
    Ok(())
}

/// Where and how an entity is shooting this tick.
struct Muzzle {
    owner: EntityId,
    origin: Vec2Fixed,
    aim: Aim,
    rate_multiplier: Fixed,
}

impl Muzzle {
    fn cooldown(&self, def: &WeaponDef) -> Fixed {
        if self.rate_multiplier <= Fixed::ZERO {
            def.cooldown()
        } else {
            def.cooldown() / self.rate_multiplier
        }
    }
}

const REQUIRED: &[ComponentKind] = &[Weapon::KIND, Position::KIND];

/// Drives cooldown, switching, charging, heat and firing.
#[derive(Debug, Default)]
pub struct WeaponSystem;

impl System for WeaponSystem {
    fn name(&self) -> &str {
        "weapon"
    }

    fn required(&self) -> &[ComponentKind] {
        REQUIRED
    }

    fn priority(&self) -> i32 {
        20
    }

    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta) {
        for &id in entities {
            let Some(origin) = ctx.position(id) else {
                continue;
            };
            let Some(mut weapon) = ctx.store.get::<Weapon>(id).cloned() else {
                continue;
            };
            let muzzle = Muzzle {
                owner: id,
                origin,
                aim: ctx.store.get::<Aim>(id).copied().unwrap_or_default(),
                rate_multiplier: ctx
                    .store
                    .get::<Ai>(id)
                    .map_or(Fixed::ONE, |ai| ai.params.fire_rate_multiplier),
            };

            weapon.cooldown_remaining = count_down(weapon.cooldown_remaining, dt.secs());
            advance_switch(ctx, id, &mut weapon, dt);

            match ctx.defs.weapon(&weapon.def).cloned() {
                Ok(def) => fire_mode(ctx, &muzzle, &mut weapon, &def, dt),
                Err(err) => tracing::trace!(entity = id, %err, "Skipping weapon"),
            }

            if let Some(slot) = ctx.store.get_mut::<Weapon>(id) {
                *slot = weapon;
            }
        }
    }
}

fn advance_switch(ctx: &mut SimContext, owner: EntityId, weapon: &mut Weapon, dt: TickDelta) {
    let phase_ms = |ctx: &SimContext, id: &WeaponId, stow: bool| {
        ctx.defs.weapon(id).map_or(Fixed::ZERO, |def| {
            Fixed::from_num(if stow { def.switch_out_ms } else { def.switch_in_ms })
        })
    };

    match weapon.switch_phase {
        SwitchPhase::None => return,
        SwitchPhase::Stowing => {
            weapon.switch_elapsed_ms += dt.millis();
            if weapon.switch_elapsed_ms < phase_ms(ctx, &weapon.def, true) {
                return;
            }
            if let Some(next) = weapon.pending_def.take() {
                weapon.def = next;
            }
            weapon.switch_phase = SwitchPhase::Drawing;
            weapon.heat_current = Fixed::ZERO;
            weapon.is_overheated = false;
            weapon.overheat_remaining = Fixed::ZERO;
            weapon.beam_active = false;
            weapon.beam_accum_ms = Fixed::ZERO;
            weapon.is_charging = false;
            weapon.charge_elapsed_ms = Fixed::ZERO;
        }
        SwitchPhase::Drawing => {
            weapon.switch_elapsed_ms += dt.millis();
            if weapon.switch_elapsed_ms < phase_ms(ctx, &weapon.def, false) {
                return;
            }
            // A request that arrived mid-draw stows straight away.
            weapon.switch_phase = if weapon.pending_def.is_some() {
                SwitchPhase::Stowing
            } else {
                SwitchPhase::None
            };
        }
    }

    weapon.switch_elapsed_ms = Fixed::ZERO;
    tracing::debug!(
        entity = owner,
        phase = weapon.switch_phase.as_str(),
        weapon = %weapon.def,
        "Weapon switch phase"
    );
    ctx.bus.fire(GameEvent::WeaponSwitch {
        owner,
        phase: weapon.switch_phase,
        weapon: weapon.def.clone(),
    });
}

fn fire_mode(ctx: &mut SimContext, muzzle: &Muzzle, weapon: &mut Weapon, def: &WeaponDef, dt: TickDelta) {
    match &def.behavior {
        WeaponBehavior::Ballistic(spec) => {
            if weapon.trigger_held && weapon.can_fire() {
                fire_ballistic(ctx, muzzle, weapon, def, spec);
            }
        }
        WeaponBehavior::Splash(spec) => {
            if weapon.trigger_held && weapon.can_fire() {
                fire_splash(ctx, muzzle, weapon, def, spec);
            }
        }
        WeaponBehavior::Charge(spec) => update_charge(ctx, muzzle, weapon, def, spec, dt),
        WeaponBehavior::Hitscan(spec) if spec.continuous => {
            update_continuous(ctx, muzzle, weapon, def, spec, dt);
        }
        WeaponBehavior::Hitscan(spec) => {
            if weapon.trigger_held && weapon.can_fire() {
                let beam = spawn_beam(ctx, beam_shot(muzzle, def, spec, def.damage));
                finish_shot(ctx, muzzle, weapon, def, vec![beam]);
            }
        }
    }
}

/// Bookkeeping shared by every discrete shot.
fn finish_shot(
    ctx: &mut SimContext,
    muzzle: &Muzzle,
    weapon: &mut Weapon,
    def: &WeaponDef,
    spawned: Vec<EntityId>,
) {
    weapon.cooldown_remaining = muzzle.cooldown(def);
    weapon.shot_count += 1;
    ctx.bus.fire(GameEvent::WeaponFired {
        owner: muzzle.owner,
        weapon: def.id.clone(),
        origin: muzzle.origin,
        direction: muzzle.aim.direction,
        spawned,
    });
}

fn fire_ballistic(
    ctx: &mut SimContext,
    muzzle: &Muzzle,
    weapon: &mut Weapon,
    def: &WeaponDef,
    spec: &BallisticSpec,
) {
    let mut spawned = Vec::with_capacity(spec.pellet_count as usize);
    for _ in 0..spec.pellet_count {
        let direction = if spec.spread > Fixed::ZERO {
            muzzle.aim.direction.rotate(spec.spread * signed_unit(&mut ctx.rng))
        } else {
            muzzle.aim.direction
        };
        spawned.push(spawn_projectile(
            ctx,
            ProjectileShot {
                owner: muzzle.owner,
                weapon: def.id.clone(),
                origin: muzzle.origin,
                direction,
                speed: def.projectile_speed,
                damage: def.damage,
                lifetime: def.projectile_lifetime,
                max_range: spec.max_range,
                bounces: spec.bounces_max,
                pierces: 0,
                splash_radius: None,
                splash_target: None,
            },
        ));
    }
    finish_shot(ctx, muzzle, weapon, def, spawned);
}

fn fire_splash(
    ctx: &mut SimContext,
    muzzle: &Muzzle,
    weapon: &mut Weapon,
    def: &WeaponDef,
    spec: &SplashSpec,
) {
    // Shorten the flight so the shell lands on the aim point.
    let lifetime = match muzzle.aim.target {
        Some(target) if def.projectile_speed > Fixed::ZERO => {
            (muzzle.origin.distance(target) / def.projectile_speed).min(def.projectile_lifetime)
        }
        _ => def.projectile_lifetime,
    };
    let shell = spawn_projectile(
        ctx,
        ProjectileShot {
            owner: muzzle.owner,
            weapon: def.id.clone(),
            origin: muzzle.origin,
            direction: muzzle.aim.direction,
            speed: def.projectile_speed,
            damage: def.damage,
            lifetime,
            max_range: None,
            bounces: 0,
            pierces: 0,
            splash_radius: Some(spec.splash_radius),
            splash_target: muzzle.aim.target,
        },
    );
    finish_shot(ctx, muzzle, weapon, def, vec![shell]);
}

fn update_charge(
    ctx: &mut SimContext,
    muzzle: &Muzzle,
    weapon: &mut Weapon,
    def: &WeaponDef,
    spec: &ChargeSpec,
    dt: TickDelta,
) {
    let full = Fixed::from_num(spec.charge_ms);

    if weapon.trigger_held {
        if !weapon.is_charging && !weapon.can_fire() {
            return;
        }
        weapon.is_charging = true;
        weapon.charge_elapsed_ms = (weapon.charge_elapsed_ms + dt.millis()).min(full);
        ctx.bus.fire(GameEvent::WeaponCharging {
            owner: muzzle.owner,
            weapon: def.id.clone(),
            charge_ratio: clamp01(weapon.charge_elapsed_ms / full),
        });
        return;
    }

    if !weapon.is_charging {
        return;
    }
    weapon.is_charging = false;
    let charge = std::mem::take(&mut weapon.charge_elapsed_ms);
    if !weapon.can_fire() {
        return;
    }

    let base = Fixed::from_num(def.damage);
    let (damage, pierces) = if charge >= Fixed::from_num(spec.min_charge()) {
        ((base * clamp01(charge / full)).to_num::<u32>(), spec.pierces_max)
    } else {
        match spec.undercharge {
            UnderchargePolicy::Discard => {
                tracing::trace!(entity = muzzle.owner, "Undercharged shot discarded");
                return;
            }
            UnderchargePolicy::LowPower => ((base * spec.low_power_fraction).to_num::<u32>(), 0),
        }
    };

    let slug = spawn_projectile(
        ctx,
        ProjectileShot {
            owner: muzzle.owner,
            weapon: def.id.clone(),
            origin: muzzle.origin,
            direction: muzzle.aim.direction,
            speed: def.projectile_speed,
            damage: damage.max(1),
            lifetime: def.projectile_lifetime,
            max_range: None,
            bounces: 0,
            pierces,
            splash_radius: None,
            splash_target: None,
        },
    );
    finish_shot(ctx, muzzle, weapon, def, vec![slug]);
}

fn update_continuous(
    ctx: &mut SimContext,
    muzzle: &Muzzle,
    weapon: &mut Weapon,
    def: &WeaponDef,
    spec: &HitscanSpec,
    dt: TickDelta,
) {
    let secs = dt.secs();

    if weapon.is_overheated {
        weapon.beam_active = false;
        weapon.beam_accum_ms = Fixed::ZERO;
        weapon.overheat_remaining = count_down(weapon.overheat_remaining, secs);
        if weapon.overheat_remaining == Fixed::ZERO {
            weapon.is_overheated = false;
            weapon.heat_current = Fixed::ZERO;
            tracing::debug!(entity = muzzle.owner, "Weapon lockout ended");
        }
        return;
    }

    if !(weapon.trigger_held && weapon.can_fire()) {
        weapon.beam_active = false;
        weapon.beam_accum_ms = Fixed::ZERO;
        if let Some(heat) = &spec.heat {
            weapon.heat_current = count_down(weapon.heat_current, heat.cooldown_per_sec * secs);
        }
        return;
    }

    let interval = Fixed::from_num(spec.damage_tick_interval_ms.max(1));
    let starting = !weapon.beam_active;
    weapon.beam_active = true;
    weapon.beam_accum_ms += if starting { interval } else { dt.millis() };

    let mut batches: u64 = 0;
    while weapon.beam_accum_ms >= interval {
        weapon.beam_accum_ms -= interval;
        batches += 1;
    }
    if batches > 0 {
        let damage = u64::from(def.damage) * u64::from(spec.damage_tick_interval_ms) * batches / 1000;
        let beam = spawn_beam(
            ctx,
            beam_shot(muzzle, def, spec, u32::try_from(damage).unwrap_or(u32::MAX)),
        );
        if starting {
            weapon.shot_count += 1;
            ctx.bus.fire(GameEvent::WeaponFired {
                owner: muzzle.owner,
                weapon: def.id.clone(),
                origin: muzzle.origin,
                direction: muzzle.aim.direction,
                spawned: vec![beam],
            });
        }
    }

    if let Some(heat) = &spec.heat {
        weapon.heat_current = (weapon.heat_current + heat.per_sec * secs).min(heat.capacity);
        if weapon.heat_current >= heat.capacity {
            weapon.is_overheated = true;
            weapon.overheat_remaining = heat.lockout_sec;
            weapon.beam_active = false;
            weapon.beam_accum_ms = Fixed::ZERO;
            tracing::debug!(entity = muzzle.owner, weapon = %def.id, "Weapon overheated");
            ctx.bus.fire(GameEvent::WeaponOverheated {
                owner: muzzle.owner,
                weapon: def.id.clone(),
            });
        }
    }
}

fn beam_shot(muzzle: &Muzzle, def: &WeaponDef, spec: &HitscanSpec, damage: u32) -> BeamShot {
    BeamShot {
        owner: muzzle.owner,
        weapon: def.id.clone(),
        start: muzzle.origin,
        direction: muzzle.aim.direction,
        max_range: spec.max_range,
        persist_ms: spec.persist_ms,
        layer_count: spec.beam_layer_count,
        damage,
    }
}
