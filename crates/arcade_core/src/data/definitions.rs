//! The static definition bundle read by every system.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ai_profile::{
    builtin_difficulty, builtin_profiles, AiProfile, AiRole, Difficulty, DifficultyModifiers,
    WaveScaling,
};
use super::bomb_data::{builtin_bombs, BombDef, BombKind};
use super::weapon_data::{builtin_weapons, WeaponDef, WeaponId};
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, option_fixed_decimal, ratio, Fixed};
use crate::terrain::TerrainCosts;

/// Speed multiplier for one ground type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCost {
    /// Ground type name.
    pub ground: String,
    /// Speed multiplier on that ground.
    #[serde(with = "fixed_decimal")]
    pub multiplier: Fixed,
}

/// Trigger radius for one interaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRadius {
    /// Interaction type name (e.g. `"door"`).
    pub interaction: String,
    /// Radius in world units.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
}

/// A partial set of definitions as authored in one RON file.
///
/// Every field is optional so files can split definitions however they
/// like; [`Definitions::merged`] layers them over the current tables.
///
/// # Example RON
///
/// ```ron
/// DefinitionSet(
///     bombs: [
///         BombDef(kind: Timed, damage: 150, splash_radius: 140.0, arm_ms: 500, fuse_ms: Some(2000)),
///     ],
///     terrain_costs: [
///         TerrainCost(ground: "mud", multiplier: 0.5),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionSet {
    /// Weapon definitions.
    pub weapons: Vec<WeaponDef>,
    /// Bomb definitions.
    pub bombs: Vec<BombDef>,
    /// AI role profiles.
    pub ai_profiles: Vec<AiProfile>,
    /// Difficulty multipliers.
    pub difficulty: Vec<DifficultyModifiers>,
    /// Per-wave scaling override.
    pub wave_scaling: Option<WaveScaling>,
    /// Per-instance variance override.
    #[serde(with = "option_fixed_decimal")]
    pub instance_variance: Option<Fixed>,
    /// Ground speed multipliers.
    pub terrain_costs: Vec<TerrainCost>,
    /// Interaction trigger radii.
    pub interaction_radii: Vec<InteractionRadius>,
}

impl DefinitionSet {
    /// Total number of entries in the set.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.weapons.len()
            + self.bombs.len()
            + self.ai_profiles.len()
            + self.difficulty.len()
            + self.terrain_costs.len()
            + self.interaction_radii.len()
            + usize::from(self.wave_scaling.is_some())
            + usize::from(self.instance_variance.is_some())
    }
}

/// Read-only tuning tables shared by every system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definitions {
    /// Weapons by id.
    pub weapons: BTreeMap<WeaponId, WeaponDef>,
    /// Bombs by kind.
    pub bombs: BTreeMap<BombKind, BombDef>,
    /// AI profiles by role.
    pub ai_profiles: BTreeMap<AiRole, AiProfile>,
    /// Difficulty multipliers by level.
    pub difficulty: BTreeMap<Difficulty, DifficultyModifiers>,
    /// Per-wave additive scaling.
    pub wave_scaling: WaveScaling,
    /// Per-instance variance range (0.15 = ±15%).
    pub instance_variance: Fixed,
    /// Ground speed multipliers.
    pub terrain_costs: TerrainCosts,
    /// Interaction radii by interaction type, in world units.
    pub interaction_radii: BTreeMap<String, Fixed>,
    /// Interaction radius in tiles for types absent from the table.
    pub default_interaction_tiles: Fixed,
}

impl Default for Definitions {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Definitions {
    /// Tables with nothing in them.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            weapons: BTreeMap::new(),
            bombs: BTreeMap::new(),
            ai_profiles: BTreeMap::new(),
            difficulty: BTreeMap::new(),
            wave_scaling: WaveScaling::default(),
            instance_variance: ratio(3, 20),
            terrain_costs: TerrainCosts::default(),
            interaction_radii: BTreeMap::new(),
            default_interaction_tiles: ratio(3, 2),
        }
    }

    /// The stock arcade tables.
    #[must_use]
    pub fn builtin() -> Self {
        let mut defs = Self::empty();
        for weapon in builtin_weapons() {
            defs.weapons.insert(weapon.id.clone(), weapon);
        }
        for bomb in builtin_bombs() {
            defs.bombs.insert(bomb.kind, bomb);
        }
        for profile in builtin_profiles() {
            defs.ai_profiles.insert(profile.role, profile);
        }
        for mods in builtin_difficulty() {
            defs.difficulty.insert(mods.level, mods);
        }
        for (ground, multiplier) in [
            ("grass", Fixed::ONE),
            ("road", ratio(6, 5)),
            ("sand", ratio(4, 5)),
            ("mud", ratio(1, 2)),
            ("water", ratio(3, 10)),
        ] {
            defs.terrain_costs.set(ground, multiplier);
        }
        defs
    }

    /// Parse a [`DefinitionSet`] and layer it over the builtin tables.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let set: DefinitionSet = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        Self::builtin().merged(set)
    }

    /// Layer `set` over these tables, validating every incoming entry.
    ///
    /// Entries replace existing ones with the same key.
    pub fn merged(mut self, set: DefinitionSet) -> Result<Self> {
        for weapon in set.weapons {
            weapon.validate()?;
            self.weapons.insert(weapon.id.clone(), weapon);
        }
        for bomb in set.bombs {
            bomb.validate()?;
            self.bombs.insert(bomb.kind, bomb);
        }
        for profile in set.ai_profiles {
            if profile.fire_range <= Fixed::ZERO {
                return Err(GameError::InvalidDefinition {
                    id: profile.role.to_string(),
                    reason: "fire_range must be positive".into(),
                });
            }
            self.ai_profiles.insert(profile.role, profile);
        }
        for mods in set.difficulty {
            self.difficulty.insert(mods.level, mods);
        }
        if let Some(scaling) = set.wave_scaling {
            self.wave_scaling = scaling;
        }
        if let Some(variance) = set.instance_variance {
            if variance < Fixed::ZERO || variance >= Fixed::ONE {
                return Err(GameError::InvalidDefinition {
                    id: "instance_variance".into(),
                    reason: "must lie in [0, 1)".into(),
                });
            }
            self.instance_variance = variance;
        }
        for cost in set.terrain_costs {
            if cost.multiplier < Fixed::ZERO {
                return Err(GameError::InvalidDefinition {
                    id: cost.ground,
                    reason: "terrain multiplier must not be negative".into(),
                });
            }
            self.terrain_costs.set(cost.ground, cost.multiplier);
        }
        for entry in set.interaction_radii {
            if entry.radius < Fixed::ZERO {
                return Err(GameError::InvalidDefinition {
                    id: entry.interaction,
                    reason: "interaction radius must not be negative".into(),
                });
            }
            self.interaction_radii.insert(entry.interaction, entry.radius);
        }
        Ok(self)
    }

    /// Look up a weapon definition.
    pub fn weapon(&self, id: &WeaponId) -> Result<&WeaponDef> {
        self.weapons
            .get(id)
            .ok_or_else(|| GameError::UnknownWeapon(id.to_string()))
    }

    /// Look up a bomb definition.
    pub fn bomb(&self, kind: BombKind) -> Result<&BombDef> {
        self.bombs
            .get(&kind)
            .ok_or_else(|| GameError::UnknownBombKind(kind.to_string()))
    }

    /// Look up an AI profile.
    pub fn ai_profile(&self, role: AiRole) -> Result<&AiProfile> {
        self.ai_profiles
            .get(&role)
            .ok_or_else(|| GameError::UnknownAiRole(role.to_string()))
    }

    /// Difficulty multipliers; identity when the level is not tabulated.
    #[must_use]
    pub fn difficulty(&self, level: Difficulty) -> DifficultyModifiers {
        self.difficulty
            .get(&level)
            .cloned()
            .unwrap_or_else(|| DifficultyModifiers::neutral(level))
    }

    /// Trigger radius for an interaction type, in world units.
    #[must_use]
    pub fn interaction_radius(&self, interaction: &str, tile_size: Fixed) -> Fixed {
        self.interaction_radii
            .get(interaction)
            .copied()
            .unwrap_or(tile_size * self.default_interaction_tiles)
    }
}
