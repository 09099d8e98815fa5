//! System scheduler.
//!
//! Systems run once per tick in ascending priority; systems with equal
//! priority keep their registration order. Each system sees exactly the
//! entities its required-component query returned when its own pass
//! started.

use crate::context::SimContext;
use crate::ecs::{ComponentKind, EntityId};
use crate::time::TickDelta;

/// A per-tick update unit.
pub trait System {
    /// Unique name, used for lookup and logging.
    fn name(&self) -> &str;

    /// Components an entity must hold to be passed to [`System::update`].
    fn required(&self) -> &[ComponentKind];

    /// Lower runs first.
    fn priority(&self) -> i32;

    /// Advance this system by `dt` over `entities`.
    fn update(&mut self, ctx: &mut SimContext, entities: &[EntityId], dt: TickDelta);
}

struct Slot {
    system: Box<dyn System>,
    enabled: bool,
}

/// Ordered pipeline of systems.
#[derive(Default)]
pub struct Scheduler {
    slots: Vec<Slot>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|slot| (slot.system.name(), slot.system.priority(), slot.enabled)))
            .finish()
    }
}

impl Scheduler {
    /// Empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system after every system of lower or equal priority.
    pub fn add_system(&mut self, system: Box<dyn System>) {
        let priority = system.priority();
        let at = self
            .slots
            .iter()
            .position(|slot| slot.system.priority() > priority)
            .unwrap_or(self.slots.len());
        self.slots.insert(
            at,
            Slot {
                system,
                enabled: true,
            },
        );
    }

    /// Remove a system by name.
    pub fn remove_system(&mut self, name: &str) -> Option<Box<dyn System>> {
        let at = self.slots.iter().position(|slot| slot.system.name() == name)?;
        Some(self.slots.remove(at).system)
    }

    /// Look up a system by name.
    #[must_use]
    pub fn system(&self, name: &str) -> Option<&dyn System> {
        self.slots
            .iter()
            .find(|slot| slot.system.name() == name)
            .map(|slot| slot.system.as_ref())
    }

    /// Enable or disable a system. Returns `false` if no such system exists.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.slots.iter_mut().find(|slot| slot.system.name() == name) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// System names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.system.name()).collect()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run one tick.
    ///
    /// Entities created during the previous tick become visible first; each
    /// system's pass is bracketed so that destruction it requests lands
    /// before the next system queries.
    pub fn run(&mut self, ctx: &mut SimContext, dt: TickDelta) {
        ctx.store.begin_tick();
        for slot in &mut self.slots {
            if !slot.enabled {
                continue;
            }
            let entities = ctx.store.query(slot.system.required());
            ctx.store.begin_pass();
            slot.system.update(ctx, &entities, dt);
            ctx.store.end_pass();
        }
    }
}
