//! Headless tick loop.
//!
//! Positions are owned outside the core, so the runner stands in for the
//! host game: it applies scripted inputs, ticks the simulation, integrates
//! velocities and streams the drained event log.

use std::io::Write;

use arcade_core::components::{Position, Projectile, Velocity};
use arcade_core::ecs::{Component, EntityId};
use arcade_core::events::{EventKind, EventRecord};
use arcade_core::math::Vec2Fixed;
use arcade_core::simulation::Simulation;
use arcade_core::time::TickDelta;
use serde::Serialize;

use crate::scenario::{InputAction, ScriptedInput, Spawned};

/// Headless run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Ticks to simulate.
    pub ticks: u64,
    /// Milliseconds per tick.
    pub tick_ms: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            tick_ms: 16,
        }
    }
}

/// Final line printed after the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulation clock at the end, in milliseconds.
    pub clock_ms: u64,
    /// Events drained over the run.
    pub events: usize,
    /// AI units still alive.
    pub enemies_alive: usize,
    /// Whether the actor survived.
    pub actor_alive: bool,
    /// Final state hash.
    pub state_hash: u64,
}

/// Drives one scenario run.
pub struct HeadlessRunner {
    sim: Simulation,
    spawned: Spawned,
    inputs: Vec<ScriptedInput>,
    config: RunConfig,
}

impl HeadlessRunner {
    /// Create a runner over a built scenario.
    #[must_use]
    pub fn new(sim: Simulation, spawned: Spawned, mut inputs: Vec<ScriptedInput>, config: RunConfig) -> Self {
        inputs.sort_by_key(|input| input.tick);
        Self {
            sim,
            spawned,
            inputs,
            config,
        }
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run every tick, writing each drained event to `out` as a JSON line,
    /// followed by the summary line.
    pub fn run<W: Write>(mut self, out: &mut W) -> std::io::Result<RunSummary> {
        let dt = TickDelta::from_millis(self.config.tick_ms);
        let mut events = 0;
        let mut next_input = 0;

        for tick in 0..self.config.ticks {
            while let Some(input) = self.inputs.get(next_input).filter(|i| i.tick <= tick) {
                apply_input(&mut self.sim, self.spawned.actor, &input.action);
                next_input += 1;
            }

            self.sim.tick(dt);
            integrate(&mut self.sim, dt);

            for record in self.sim.drain_events() {
                log_notable(&record);
                writeln!(out, "{}", to_json_line(&record))?;
                events += 1;
            }
        }

        let summary = self.summary(events);
        writeln!(out, "{}", serde_json::to_string(&summary).unwrap_or_default())?;
        tracing::info!(
            ticks = summary.ticks,
            events = summary.events,
            state_hash = summary.state_hash,
            "Run complete"
        );
        Ok(summary)
    }

    fn summary(&self, events: usize) -> RunSummary {
        let store = &self.sim.context().store;
        RunSummary {
            ticks: self.sim.context().tick,
            clock_ms: self.sim.context().clock_ms.to_num(),
            events,
            enemies_alive: self.spawned.enemies.iter().filter(|&&id| store.is_alive(id)).count(),
            actor_alive: store.is_alive(self.spawned.actor),
            state_hash: self.sim.state_hash(),
        }
    }
}

fn apply_input(sim: &mut Simulation, actor: EntityId, action: &InputAction) {
    let result = match action {
        InputAction::Move(x, y) => {
            if let Some(vel) = sim.context_mut().store.get_mut::<Velocity>(actor) {
                vel.value = Vec2Fixed::from_ints(*x, *y);
            }
            Ok(())
        }
        InputAction::AimAt(x, y) => sim.aim_at(actor, Vec2Fixed::from_ints(*x, *y)),
        InputAction::Trigger(held) => sim.set_trigger(actor, *held),
        InputAction::SwitchWeapon(next) => sim.request_weapon_switch(actor, next.clone()),
        InputAction::PlaceBomb(kind) => match sim.context().position(actor) {
            Some(at) => sim.place_bomb(actor, at, *kind).map(|_| ()),
            None => Ok(()),
        },
        InputAction::DetonateRemotes => {
            sim.trigger_remote_bombs(actor);
            Ok(())
        }
    };
    if let Err(e) = result {
        tracing::warn!(?action, "Scripted input rejected: {}", e);
    }
}

/// Move every body by its velocity. Bodies stop at unwalkable tiles;
/// projectiles fly on and are resolved by the collision system.
fn integrate(sim: &mut Simulation, dt: TickDelta) {
    let ctx = sim.context_mut();
    for id in ctx.store.query(&[Position::KIND, Velocity::KIND]) {
        let Some(velocity) = ctx.store.get::<Velocity>(id).map(|v| v.value) else {
            continue;
        };
        if velocity.is_zero() {
            continue;
        }
        let is_projectile = ctx.store.has::<Projectile>(id);
        let Some(pos) = ctx.store.get_mut::<Position>(id) else {
            continue;
        };
        let next = pos.value + velocity * dt.secs();
        let walkable = ctx.terrain.world_to_tile(next).is_some_and(|tile| ctx.terrain.is_walkable(tile));
        if is_projectile || walkable {
            pos.value = next;
        }
    }
}

fn log_notable(record: &EventRecord) {
    match record.kind {
        EventKind::EntityKilled | EventKind::TileDestroyed | EventKind::ObjectInteract => {
            tracing::info!(kind = %record.kind, at_ms = record.timestamp_ms, "Notable event");
        }
        _ => {}
    }
}

fn to_json_line(record: &EventRecord) -> String {
    serde_json::to_string(record).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
}
