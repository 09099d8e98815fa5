//! Weapon definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, option_fixed_decimal, ratio, Fixed};

/// Identifier of a weapon definition (e.g. `"gun-01"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponId(String);

impl WeaponId {
    /// Create an id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WeaponId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happens when an undercharged shot is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnderchargePolicy {
    /// Releasing below the minimum charge fires nothing.
    #[default]
    Discard,
    /// Releasing below the minimum charge fires at `low_power_fraction` damage.
    LowPower,
}

/// Projectile weapon parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallisticSpec {
    /// Half-angle of random deviation in radians.
    #[serde(default, with = "fixed_decimal")]
    pub spread: Fixed,

    /// Wall bounces before the projectile is spent.
    #[serde(default)]
    pub bounces_max: u32,

    /// Projectiles spawned per shot.
    #[serde(default = "default_pellet_count")]
    pub pellet_count: u32,

    /// Range cap in world units; lifetime alone limits flight when absent.
    #[serde(default, with = "option_fixed_decimal")]
    pub max_range: Option<Fixed>,
}

impl Default for BallisticSpec {
    fn default() -> Self {
        Self {
            spread: Fixed::ZERO,
            bounces_max: 0,
            pellet_count: default_pellet_count(),
            max_range: None,
        }
    }
}

const fn default_pellet_count() -> u32 {
    1
}

/// Hold-to-charge weapon parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSpec {
    /// Milliseconds of holding for a full-power shot.
    pub charge_ms: u32,

    /// Minimum charge for a regular shot; defaults to `charge_ms`.
    #[serde(default)]
    pub min_charge_ms: Option<u32>,

    /// Behaviour when released before `min_charge_ms`.
    #[serde(default)]
    pub undercharge: UnderchargePolicy,

    /// Damage fraction of a low-power shot.
    #[serde(default = "default_low_power_fraction", with = "fixed_decimal")]
    pub low_power_fraction: Fixed,

    /// Entities a single shot passes through before it is spent.
    #[serde(default)]
    pub pierces_max: u32,
}

impl ChargeSpec {
    /// Effective minimum charge in milliseconds.
    #[must_use]
    pub fn min_charge(&self) -> u32 {
        self.min_charge_ms.unwrap_or(self.charge_ms)
    }
}

fn default_low_power_fraction() -> Fixed {
    ratio(1, 4)
}

/// Heat model for continuous beams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatSpec {
    /// Heat at which the weapon locks out.
    #[serde(with = "fixed_decimal")]
    pub capacity: Fixed,

    /// Heat gained per second of firing.
    #[serde(with = "fixed_decimal")]
    pub per_sec: Fixed,

    /// Heat lost per second while idle.
    #[serde(with = "fixed_decimal")]
    pub cooldown_per_sec: Fixed,

    /// Forced lockout after reaching capacity, in seconds.
    #[serde(with = "fixed_decimal")]
    pub lockout_sec: Fixed,
}

/// Instant-hit beam weapon parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitscanSpec {
    /// How long a beam stays visible, in milliseconds.
    pub persist_ms: u32,

    /// Concentric render layers.
    #[serde(default = "default_beam_layers")]
    pub beam_layer_count: u8,

    /// Raycast cutoff in world units.
    #[serde(with = "fixed_decimal")]
    pub max_range: Fixed,

    /// Hold-to-fire; `damage` is then damage per second.
    #[serde(default)]
    pub continuous: bool,

    /// Milliseconds between batched damage beams in continuous mode.
    #[serde(default = "default_damage_tick_interval")]
    pub damage_tick_interval_ms: u32,

    /// Heat model; continuous weapons without one never overheat.
    #[serde(default)]
    pub heat: Option<HeatSpec>,
}

const fn default_beam_layers() -> u8 {
    1
}

const fn default_damage_tick_interval() -> u32 {
    100
}

/// Area-of-effect artillery parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplashSpec {
    /// Damage radius on landing.
    #[serde(with = "fixed_decimal")]
    pub splash_radius: Fixed,

    /// Landing indicator pulse frequency for renderers.
    #[serde(default, with = "fixed_decimal")]
    pub indicator_pulse_hz: Fixed,
}

/// Fire mode of a weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponBehavior {
    /// Simulated-flight projectiles.
    Ballistic(BallisticSpec),
    /// Hold to charge, release to fire a piercing shot.
    Charge(ChargeSpec),
    /// Instant beams.
    Hitscan(HitscanSpec),
    /// Lobbed shell landing on the aim point.
    Splash(SplashSpec),
}

/// Data-driven weapon definition.
///
/// # Example RON
///
/// ```ron
/// WeaponDef(
///     id: "gun-04",
///     name: "Rifled Gun",
///     damage: 40,
///     fire_rate: 1.5,
///     projectile_speed: 380.0,
///     projectile_lifetime: 3.0,
///     switch_out_ms: 250,
///     switch_in_ms: 280,
///     behavior: Ballistic((bounces_max: 2)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponDef {
    /// Unique identifier.
    pub id: WeaponId,

    /// Display name.
    pub name: String,

    /// Damage per hit (per second for continuous beams).
    pub damage: u32,

    /// Shots per second.
    #[serde(with = "fixed_decimal")]
    pub fire_rate: Fixed,

    /// Projectile speed in world units per second.
    #[serde(default, with = "fixed_decimal")]
    pub projectile_speed: Fixed,

    /// Projectile lifetime in seconds.
    #[serde(default, with = "fixed_decimal")]
    pub projectile_lifetime: Fixed,

    /// Milliseconds to stow this weapon.
    #[serde(default = "default_switch_ms")]
    pub switch_out_ms: u32,

    /// Milliseconds to draw this weapon.
    #[serde(default = "default_switch_ms")]
    pub switch_in_ms: u32,

    /// Fire mode.
    pub behavior: WeaponBehavior,
}

const fn default_switch_ms() -> u32 {
    300
}

impl WeaponDef {
    /// Seconds between shots.
    #[must_use]
    pub fn cooldown(&self) -> Fixed {
        if self.fire_rate <= Fixed::ZERO {
            Fixed::ZERO
        } else {
            Fixed::ONE / self.fire_rate
        }
    }

    /// Whether this weapon fires beams while the trigger is held.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        matches!(&self.behavior, WeaponBehavior::Hitscan(spec) if spec.continuous)
    }

    /// Check value constraints.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(GameError::InvalidDefinition {
                id: self.id.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.fire_rate < Fixed::ZERO {
            return invalid("fire_rate must not be negative");
        }
        match &self.behavior {
            WeaponBehavior::Ballistic(spec) => {
                if spec.pellet_count == 0 {
                    return invalid("pellet_count must be at least 1");
                }
                if self.projectile_lifetime <= Fixed::ZERO {
                    return invalid("projectile_lifetime must be positive");
                }
            }
            WeaponBehavior::Charge(spec) => {
                if spec.charge_ms == 0 {
                    return invalid("charge_ms must be positive");
                }
                if self.projectile_lifetime <= Fixed::ZERO {
                    return invalid("projectile_lifetime must be positive");
                }
            }
            WeaponBehavior::Hitscan(spec) => {
                if spec.max_range <= Fixed::ZERO {
                    return invalid("max_range must be positive");
                }
                if spec.continuous && spec.damage_tick_interval_ms == 0 {
                    return invalid("damage_tick_interval_ms must be positive");
                }
                if let Some(heat) = &spec.heat {
                    if heat.capacity <= Fixed::ZERO {
                        return invalid("heat capacity must be positive");
                    }
                }
            }
            WeaponBehavior::Splash(spec) => {
                if spec.splash_radius < Fixed::ZERO {
                    return invalid("splash_radius must not be negative");
                }
                if self.projectile_speed <= Fixed::ZERO {
                    return invalid("splash weapons need a projectile_speed");
                }
            }
        }
        Ok(())
    }
}

/// Stock arcade weapon set.
#[must_use]
pub fn builtin_weapons() -> Vec<WeaponDef> {
    let int = Fixed::from_num::<i32>;
    vec![
        WeaponDef {
            id: "gun-01".into(),
            name: "Medium Cannon".into(),
            damage: 20,
            fire_rate: int(3),
            projectile_speed: int(400),
            projectile_lifetime: int(2),
            switch_out_ms: 280,
            switch_in_ms: 320,
            behavior: WeaponBehavior::Ballistic(BallisticSpec::default()),
        },
        WeaponDef {
            id: "gun-02".into(),
            name: "Machine Gun".into(),
            damage: 8,
            fire_rate: int(8),
            projectile_speed: int(350),
            projectile_lifetime: ratio(3, 2),
            switch_out_ms: 200,
            switch_in_ms: 220,
            behavior: WeaponBehavior::Ballistic(BallisticSpec {
                spread: Fixed::PI / int(36),
                ..BallisticSpec::default()
            }),
        },
        WeaponDef {
            id: "gun-03".into(),
            name: "Heavy Cannon".into(),
            damage: 80,
            fire_rate: ratio(1, 2),
            projectile_speed: int(500),
            projectile_lifetime: ratio(5, 2),
            switch_out_ms: 450,
            switch_in_ms: 520,
            behavior: WeaponBehavior::Ballistic(BallisticSpec::default()),
        },
        WeaponDef {
            id: "gun-04".into(),
            name: "Rifled Gun".into(),
            damage: 40,
            fire_rate: ratio(3, 2),
            projectile_speed: int(380),
            projectile_lifetime: int(3),
            switch_out_ms: 250,
            switch_in_ms: 280,
            behavior: WeaponBehavior::Ballistic(BallisticSpec {
                bounces_max: 2,
                ..BallisticSpec::default()
            }),
        },
        WeaponDef {
            id: "gun-05".into(),
            name: "Mortar".into(),
            damage: 120,
            fire_rate: ratio(2, 5),
            projectile_speed: int(220),
            projectile_lifetime: int(4),
            switch_out_ms: 520,
            switch_in_ms: 600,
            behavior: WeaponBehavior::Splash(SplashSpec {
                splash_radius: int(120),
                indicator_pulse_hz: int(3),
            }),
        },
        WeaponDef {
            id: "gun-06".into(),
            name: "Laser".into(),
            damage: 60,
            fire_rate: int(1),
            projectile_speed: Fixed::ZERO,
            projectile_lifetime: Fixed::ZERO,
            switch_out_ms: 300,
            switch_in_ms: 360,
            behavior: WeaponBehavior::Hitscan(HitscanSpec {
                persist_ms: 120,
                beam_layer_count: 3,
                max_range: int(800),
                continuous: true,
                damage_tick_interval_ms: 100,
                heat: Some(HeatSpec {
                    capacity: int(3),
                    per_sec: int(1),
                    cooldown_per_sec: ratio(3, 5),
                    lockout_sec: int(2),
                }),
            }),
        },
        WeaponDef {
            id: "gun-07".into(),
            name: "Shotgun".into(),
            damage: 15,
            fire_rate: ratio(3, 2),
            projectile_speed: int(500),
            projectile_lifetime: ratio(1, 2),
            switch_out_ms: 220,
            switch_in_ms: 250,
            behavior: WeaponBehavior::Ballistic(BallisticSpec {
                spread: Fixed::PI / int(12),
                pellet_count: 5,
                max_range: Some(int(250)),
                ..BallisticSpec::default()
            }),
        },
        WeaponDef {
            id: "gun-08".into(),
            name: "Railgun".into(),
            damage: 100,
            fire_rate: ratio(1, 2),
            projectile_speed: int(900),
            projectile_lifetime: ratio(3, 2),
            switch_out_ms: 560,
            switch_in_ms: 640,
            behavior: WeaponBehavior::Charge(ChargeSpec {
                charge_ms: 180,
                min_charge_ms: None,
                undercharge: UnderchargePolicy::Discard,
                low_power_fraction: default_low_power_fraction(),
                pierces_max: 2,
            }),
        },
        WeaponDef {
            id: "sniper-gun".into(),
            name: "Sniper Gun".into(),
            damage: 40,
            fire_rate: ratio(4, 5),
            projectile_speed: int(600),
            projectile_lifetime: int(3),
            switch_out_ms: 350,
            switch_in_ms: 400,
            behavior: WeaponBehavior::Ballistic(BallisticSpec {
                max_range: Some(int(720)),
                ..BallisticSpec::default()
            }),
        },
        WeaponDef {
            id: "autocannon".into(),
            name: "Autocannon".into(),
            damage: 12,
            fire_rate: int(5),
            projectile_speed: int(380),
            projectile_lifetime: ratio(3, 2),
            switch_out_ms: 200,
            switch_in_ms: 220,
            behavior: WeaponBehavior::Ballistic(BallisticSpec {
                spread: Fixed::PI / int(30),
                ..BallisticSpec::default()
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_weapons_validate() {
        for def in builtin_weapons() {
            def.validate().unwrap_or_else(|e| panic!("{}: {e}", def.id));
        }
    }

    #[test]
    fn test_cooldown_is_inverse_fire_rate() {
        let heavy = builtin_weapons()
            .into_iter()
            .find(|w| w.id.as_str() == "gun-03")
            .unwrap();
        assert_eq!(heavy.cooldown(), Fixed::from_num(2));
    }

    #[test]
    fn test_laser_is_continuous() {
        let weapons = builtin_weapons();
        let laser = weapons.iter().find(|w| w.id.as_str() == "gun-06").unwrap();
        assert!(laser.is_continuous());
        assert!(!weapons[0].is_continuous());
    }

    #[test]
    fn test_min_charge_defaults_to_full_charge() {
        let spec = ChargeSpec {
            charge_ms: 180,
            min_charge_ms: None,
            undercharge: UnderchargePolicy::Discard,
            low_power_fraction: default_low_power_fraction(),
            pierces_max: 0,
        };
        assert_eq!(spec.min_charge(), 180);
    }

    #[test]
    fn test_parse_ron_with_defaults() {
        let ron_str = r#"
            WeaponDef(
                id: "gun-04",
                name: "Rifled Gun",
                damage: 40,
                fire_rate: 1.5,
                projectile_speed: 380.0,
                projectile_lifetime: 3.0,
                behavior: Ballistic((bounces_max: 2)),
            )
        "#;
        let def: WeaponDef = ron::from_str(ron_str).expect("parse weapon");
        assert_eq!(def.fire_rate, ratio(3, 2));
        assert_eq!(def.switch_out_ms, 300);
        match def.behavior {
            WeaponBehavior::Ballistic(spec) => {
                assert_eq!(spec.bounces_max, 2);
                assert_eq!(spec.pellet_count, 1);
                assert_eq!(spec.max_range, None);
            }
            other => panic!("unexpected behavior {other:?}"),
        }
    }

    #[test]
    fn test_zero_pellets_rejected() {
        let mut def = builtin_weapons().remove(0);
        def.behavior = WeaponBehavior::Ballistic(BallisticSpec {
            pellet_count: 0,
            ..BallisticSpec::default()
        });
        assert!(matches!(def.validate(), Err(GameError::InvalidDefinition { .. })));
    }
}
