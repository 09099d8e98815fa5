//! Static tuning data.
//!
//! Weapon, bomb and AI definitions plus the per-run [`SimConfig`]. All
//! structs deserialize from RON; decimal fields are converted to
//! fixed-point once at load time.
//!
//! **Note:** This module contains no IO. File loading is handled by
//! `arcade_headless` (or the embedding game).

mod ai_profile;
mod bomb_data;
mod config;
mod definitions;
mod weapon_data;

pub use ai_profile::{
    builtin_difficulty, builtin_profiles, AiProfile, AiRole, Difficulty, DifficultyModifiers,
    ResolvedAiProfile, WaveScaling,
};
pub use bomb_data::{builtin_bombs, BombDef, BombKind};
pub use config::SimConfig;
pub use definitions::{DefinitionSet, Definitions, InteractionRadius, TerrainCost};
pub use weapon_data::{
    builtin_weapons, BallisticSpec, ChargeSpec, HeatSpec, HitscanSpec, SplashSpec,
    UnderchargePolicy, WeaponBehavior, WeaponDef, WeaponId,
};
