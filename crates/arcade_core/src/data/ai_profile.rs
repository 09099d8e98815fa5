//! AI behaviour profiles.
//!
//! A role's base profile is resolved once per spawn:
//! base × difficulty, plus per-wave scaling, ± seeded per-instance variance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{clamp01, fixed_decimal, fixed_serde, ratio, Fixed};
use crate::rng::{variance, SimRng};

/// Floor for reaction time and retarget interval, in seconds.
fn min_timer() -> Fixed {
    ratio(1, 20)
}

/// Behavioural archetype. Parameterises thresholds; never adds states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AiRole {
    /// Standard mid-range unit.
    Grunt,
    /// Approaches at an angle and circles while firing.
    Flanker,
    /// Long range, accurate, stationary when engaged.
    Sniper,
    /// Closes distance fast, fires on the move.
    Rusher,
}

impl fmt::Display for AiRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Grunt => "grunt",
            Self::Flanker => "flanker",
            Self::Sniper => "sniper",
            Self::Rusher => "rusher",
        };
        f.write_str(name)
    }
}

/// Difficulty setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Slower, less accurate enemies.
    Easy,
    /// Baseline tuning.
    #[default]
    Normal,
    /// Faster, more accurate enemies.
    Hard,
}

/// Base profile of a role.
///
/// # Example RON
///
/// ```ron
/// AiProfile(
///     role: Sniper,
///     fire_range: 350.0,
///     preferred_range: 320.0,
///     accuracy: 0.85,
///     max_spread: 0.2618,
///     reaction_time: 0.8,
///     retarget_interval: 0.5,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Role this profile belongs to.
    pub role: AiRole,
    /// Distance at which the unit starts engaging.
    #[serde(with = "fixed_decimal")]
    pub fire_range: Fixed,
    /// Distance the unit tries to hold while engaged.
    #[serde(with = "fixed_decimal")]
    pub preferred_range: Fixed,
    /// Aim accuracy in `[0, 1]`.
    #[serde(with = "fixed_decimal")]
    pub accuracy: Fixed,
    /// Aim spread at zero accuracy, in radians.
    #[serde(with = "fixed_decimal")]
    pub max_spread: Fixed,
    /// Seconds between entering engage and the first shot.
    #[serde(with = "fixed_decimal")]
    pub reaction_time: Fixed,
    /// Seconds between turret re-aims while chasing.
    #[serde(with = "fixed_decimal")]
    pub retarget_interval: Fixed,
    /// Fraction of max speed used while engaged.
    #[serde(default, with = "fixed_decimal")]
    pub engage_speed_fraction: Fixed,
    /// Orbit rate while engaged; zero disables strafing.
    #[serde(default, with = "fixed_decimal")]
    pub engage_strafe_rate: Fixed,
    /// Angle off the direct path while chasing, in radians.
    #[serde(default, with = "fixed_decimal")]
    pub chase_offset_angle: Fixed,
    /// Whether the unit fires while still chasing.
    #[serde(default)]
    pub fire_on_move: bool,
}

/// Difficulty multipliers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyModifiers {
    /// Level these multipliers apply to.
    pub level: Difficulty,
    /// Accuracy multiplier.
    #[serde(with = "fixed_decimal")]
    pub accuracy: Fixed,
    /// Reaction time multiplier.
    #[serde(with = "fixed_decimal")]
    pub reaction_time: Fixed,
    /// Engage speed fraction multiplier.
    #[serde(with = "fixed_decimal")]
    pub engage_speed: Fixed,
    /// Weapon fire rate multiplier for AI-owned weapons.
    #[serde(with = "fixed_decimal")]
    pub fire_rate: Fixed,
}

impl DifficultyModifiers {
    /// Identity multipliers.
    #[must_use]
    pub fn neutral(level: Difficulty) -> Self {
        Self {
            level,
            accuracy: Fixed::ONE,
            reaction_time: Fixed::ONE,
            engage_speed: Fixed::ONE,
            fire_rate: Fixed::ONE,
        }
    }
}

/// Additive per-wave scaling (wave index is zero-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveScaling {
    /// Accuracy added per wave.
    #[serde(with = "fixed_decimal")]
    pub accuracy_per_wave: Fixed,
    /// Reaction time added per wave (negative speeds reactions up).
    #[serde(with = "fixed_decimal")]
    pub reaction_time_per_wave: Fixed,
}

impl Default for WaveScaling {
    fn default() -> Self {
        Self {
            accuracy_per_wave: ratio(3, 100),
            reaction_time_per_wave: ratio(-4, 100),
        }
    }
}

/// Combat parameters written into an AI component at spawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedAiProfile {
    /// Engage threshold.
    #[serde(with = "fixed_serde")]
    pub fire_range: Fixed,
    /// Held distance while engaged.
    #[serde(with = "fixed_serde")]
    pub preferred_range: Fixed,
    /// Aim accuracy in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub accuracy: Fixed,
    /// Spread at zero accuracy.
    #[serde(with = "fixed_serde")]
    pub max_spread: Fixed,
    /// Delay before the first shot in engage.
    #[serde(with = "fixed_serde")]
    pub reaction_time: Fixed,
    /// Turret re-aim period while chasing.
    #[serde(with = "fixed_serde")]
    pub retarget_interval: Fixed,
    /// Engage speed as a fraction of max speed.
    #[serde(with = "fixed_serde")]
    pub engage_speed_fraction: Fixed,
    /// Strafe rate while engaged.
    #[serde(with = "fixed_serde")]
    pub engage_strafe_rate: Fixed,
    /// Chase approach offset in radians.
    #[serde(with = "fixed_serde")]
    pub chase_offset_angle: Fixed,
    /// Fires while chasing.
    pub fire_on_move: bool,
    /// Weapon fire rate multiplier.
    #[serde(with = "fixed_serde")]
    pub fire_rate_multiplier: Fixed,
}

impl AiProfile {
    /// Profile without difficulty, wave or variance adjustments.
    #[must_use]
    pub fn unscaled(&self) -> ResolvedAiProfile {
        ResolvedAiProfile {
            fire_range: self.fire_range,
            preferred_range: self.preferred_range,
            accuracy: clamp01(self.accuracy),
            max_spread: self.max_spread,
            reaction_time: self.reaction_time.max(min_timer()),
            retarget_interval: self.retarget_interval.max(min_timer()),
            engage_speed_fraction: clamp01(self.engage_speed_fraction),
            engage_strafe_rate: self.engage_strafe_rate,
            chase_offset_angle: self.chase_offset_angle,
            fire_on_move: self.fire_on_move,
            fire_rate_multiplier: Fixed::ONE,
        }
    }

    /// Resolve the final parameters for one spawned unit.
    pub fn resolve(
        &self,
        mods: &DifficultyModifiers,
        scaling: &WaveScaling,
        wave: u32,
        variance_range: Fixed,
        rng: &mut SimRng,
    ) -> ResolvedAiProfile {
        let wave = Fixed::from_num(wave);
        let mut resolved = ResolvedAiProfile {
            accuracy: clamp01(self.accuracy * mods.accuracy + scaling.accuracy_per_wave * wave),
            reaction_time: (self.reaction_time * mods.reaction_time
                + scaling.reaction_time_per_wave * wave)
                .max(min_timer()),
            engage_speed_fraction: clamp01(self.engage_speed_fraction * mods.engage_speed),
            fire_rate_multiplier: mods.fire_rate,
            ..self.unscaled()
        };

        let v = variance_range;
        resolved.fire_range *= variance(rng, v);
        resolved.preferred_range *= variance(rng, v);
        resolved.accuracy = clamp01(resolved.accuracy * variance(rng, v));
        resolved.max_spread *= variance(rng, v);
        resolved.reaction_time = (resolved.reaction_time * variance(rng, v)).max(min_timer());
        resolved.retarget_interval =
            (resolved.retarget_interval * variance(rng, v)).max(min_timer());
        resolved.engage_speed_fraction =
            clamp01(resolved.engage_speed_fraction * variance(rng, v));
        resolved.engage_strafe_rate *= variance(rng, v);
        resolved
    }
}

/// Stock role profiles.
#[must_use]
pub fn builtin_profiles() -> Vec<AiProfile> {
    let int = Fixed::from_num::<i32>;
    vec![
        AiProfile {
            role: AiRole::Grunt,
            fire_range: int(200),
            preferred_range: int(180),
            accuracy: ratio(2, 5),
            max_spread: Fixed::PI / int(6),
            reaction_time: ratio(1, 2),
            retarget_interval: ratio(3, 10),
            engage_speed_fraction: Fixed::ZERO,
            engage_strafe_rate: Fixed::ZERO,
            chase_offset_angle: Fixed::ZERO,
            fire_on_move: false,
        },
        AiProfile {
            role: AiRole::Flanker,
            fire_range: int(180),
            preferred_range: int(150),
            accuracy: ratio(7, 20),
            max_spread: Fixed::PI / int(5),
            reaction_time: ratio(3, 10),
            retarget_interval: ratio(1, 5),
            engage_speed_fraction: ratio(3, 5),
            engage_strafe_rate: Fixed::FRAC_PI_2,
            chase_offset_angle: Fixed::FRAC_PI_4,
            fire_on_move: true,
        },
        AiProfile {
            role: AiRole::Sniper,
            fire_range: int(350),
            preferred_range: int(320),
            accuracy: ratio(17, 20),
            max_spread: Fixed::PI / int(12),
            reaction_time: ratio(4, 5),
            retarget_interval: ratio(1, 2),
            engage_speed_fraction: Fixed::ZERO,
            engage_strafe_rate: Fixed::ZERO,
            chase_offset_angle: Fixed::ZERO,
            fire_on_move: false,
        },
        AiProfile {
            role: AiRole::Rusher,
            fire_range: int(120),
            preferred_range: int(60),
            accuracy: ratio(1, 4),
            max_spread: Fixed::FRAC_PI_4,
            reaction_time: ratio(3, 20),
            retarget_interval: ratio(3, 20),
            engage_speed_fraction: Fixed::ONE,
            engage_strafe_rate: Fixed::ZERO,
            chase_offset_angle: Fixed::ZERO,
            fire_on_move: true,
        },
    ]
}

/// Stock difficulty table.
#[must_use]
pub fn builtin_difficulty() -> Vec<DifficultyModifiers> {
    vec![
        DifficultyModifiers {
            level: Difficulty::Easy,
            accuracy: ratio(7, 10),
            reaction_time: ratio(7, 5),
            engage_speed: ratio(4, 5),
            fire_rate: ratio(7, 10),
        },
        DifficultyModifiers::neutral(Difficulty::Normal),
        DifficultyModifiers {
            level: Difficulty::Hard,
            accuracy: ratio(13, 10),
            reaction_time: ratio(7, 10),
            engage_speed: ratio(6, 5),
            fire_rate: ratio(13, 10),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    fn grunt() -> AiProfile {
        builtin_profiles().remove(0)
    }

    #[test]
    fn test_zero_variance_normal_wave_zero_is_base() {
        let mut rng = seeded(1);
        let resolved = grunt().resolve(
            &DifficultyModifiers::neutral(Difficulty::Normal),
            &WaveScaling::default(),
            0,
            Fixed::ZERO,
            &mut rng,
        );
        assert_eq!(resolved, grunt().unscaled());
    }

    #[test]
    fn test_wave_scaling_raises_accuracy_and_lowers_reaction() {
        let mut rng = seeded(1);
        let mods = DifficultyModifiers::neutral(Difficulty::Normal);
        let resolved = grunt().resolve(&mods, &WaveScaling::default(), 5, Fixed::ZERO, &mut rng);
        assert_eq!(resolved.accuracy, ratio(2, 5) + ratio(3, 100) * Fixed::from_num(5));
        assert_eq!(resolved.reaction_time, ratio(1, 2) + ratio(-4, 100) * Fixed::from_num(5));
    }

    #[test]
    fn test_reaction_time_floor() {
        let mut rng = seeded(1);
        let mods = DifficultyModifiers::neutral(Difficulty::Normal);
        let resolved = grunt().resolve(&mods, &WaveScaling::default(), 100, Fixed::ZERO, &mut rng);
        assert_eq!(resolved.reaction_time, ratio(1, 20));
        assert_eq!(resolved.accuracy, Fixed::ONE);
    }

    #[test]
    fn test_variance_is_seeded() {
        let mods = builtin_difficulty().remove(2);
        let scaling = WaveScaling::default();
        let range = ratio(15, 100);
        let a = grunt().resolve(&mods, &scaling, 2, range, &mut seeded(99));
        let b = grunt().resolve(&mods, &scaling, 2, range, &mut seeded(99));
        assert_eq!(a, b);
        assert_eq!(a.fire_rate_multiplier, ratio(13, 10));
        assert!(a.fire_range >= Fixed::from_num(170) && a.fire_range <= Fixed::from_num(230));
    }

    #[test]
    fn test_builtin_tables_cover_all_levels_and_roles() {
        assert_eq!(builtin_profiles().len(), 4);
        assert_eq!(builtin_difficulty().len(), 3);
    }
}
