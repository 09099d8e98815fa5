//! Per-run simulation configuration.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, ratio, Fixed};
use crate::time::TickDelta;

use super::ai_profile::Difficulty;

/// Settings for one simulation run.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     seed: 42,
///     difficulty: Hard,
///     wave: 3,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// RNG seed.
    #[serde(default)]
    pub seed: u64,

    /// Longest step a single tick may simulate, in milliseconds.
    #[serde(default = "default_max_tick_ms")]
    pub max_tick_ms: u32,

    /// Event log capacity.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Difficulty level.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Zero-based wave index used for AI scaling.
    #[serde(default)]
    pub wave: u32,

    /// Engage → chase once distance exceeds `fire_range` times this.
    #[serde(default = "default_disengage_multiplier", with = "fixed_decimal")]
    pub disengage_multiplier: Fixed,

    /// Squad followers stop within this distance of their slot.
    #[serde(default = "default_slot_reach_radius", with = "fixed_decimal")]
    pub slot_reach_radius: Fixed,

    /// AI units closer than this push apart.
    #[serde(default = "default_separation_radius", with = "fixed_decimal")]
    pub separation_radius: Fixed,

    /// Weight of the separation push.
    #[serde(default = "default_separation_weight", with = "fixed_decimal")]
    pub separation_weight: Fixed,

    /// Flow fields are rebuilt once the target moves this many tiles.
    #[serde(default = "default_flow_recompute_tiles")]
    pub flow_recompute_tiles: u32,
}

const fn default_max_tick_ms() -> u32 {
    250
}

const fn default_event_log_capacity() -> usize {
    1000
}

fn default_disengage_multiplier() -> Fixed {
    ratio(6, 5)
}

fn default_slot_reach_radius() -> Fixed {
    Fixed::from_num(20)
}

fn default_separation_radius() -> Fixed {
    Fixed::from_num(50)
}

fn default_separation_weight() -> Fixed {
    ratio(3, 5)
}

const fn default_flow_recompute_tiles() -> u32 {
    2
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_tick_ms: default_max_tick_ms(),
            event_log_capacity: default_event_log_capacity(),
            difficulty: Difficulty::default(),
            wave: 0,
            disengage_multiplier: default_disengage_multiplier(),
            slot_reach_radius: default_slot_reach_radius(),
            separation_radius: default_separation_radius(),
            separation_weight: default_separation_weight(),
            flow_recompute_tiles: default_flow_recompute_tiles(),
        }
    }
}

impl SimConfig {
    /// Default configuration with a specific seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// The longest tick as a [`TickDelta`].
    #[must_use]
    pub fn max_tick(&self) -> TickDelta {
        TickDelta::from_millis(self.max_tick_ms)
    }
}
