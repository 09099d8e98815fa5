//! # Arcade Core
//!
//! Deterministic combat simulation core for arcade-style games.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No unseeded randomness
//! - No floating-point math inside a tick (uses fixed-point)
//!
//! The host game owns the frame loop, physics and presentation. It drives
//! the core through [`simulation::Simulation`], reads positions and health
//! from the component store and reacts to the events on the bus.
//!
//! ## Crate Structure
//!
//! - [`ecs`] - Entity identifiers and the component store
//! - [`events`] - Typed events and the event bus
//! - [`scheduler`] - Priority-ordered system pipeline
//! - [`components`] - Component records
//! - [`data`] - Weapon, bomb and AI definitions, run configuration
//! - [`terrain`] - Tilemap and tile health collaborators
//! - [`ai`], [`weapon`], [`projectile`], [`beam`], [`collision`], [`bomb`],
//!   [`damage`], [`interaction`] - The stock systems
//! - [`simulation`] - Facade owning one run
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod beam;
pub mod bomb;
pub mod collision;
pub mod components;
pub mod context;
pub mod damage;
pub mod data;
pub mod ecs;
pub mod error;
pub mod events;
pub mod flow_field;
pub mod interaction;
pub mod math;
pub mod projectile;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod terrain;
pub mod time;
pub mod weapon;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::context::SimContext;
    pub use crate::data::{AiRole, BombKind, Definitions, Difficulty, SimConfig, WeaponId};
    pub use crate::ecs::{ComponentStore, EntityId};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventBus, EventKind, EventRecord, GameEvent};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::projectile::{Contact, ContactOutcome};
    pub use crate::scheduler::{Scheduler, System};
    pub use crate::simulation::{Simulation, SpawnParams};
    pub use crate::terrain::{TerrainMap, TileCoord, TileGrid, TileHealthTracker};
    pub use crate::time::TickDelta;
}
