//! Scenario loading and configuration.
//!
//! Scenarios define the initial arena for headless runs: the tilemap,
//! the player actor, AI squads, interactive tile objects and a script of
//! timed player inputs.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use arcade_core::data::{AiRole, BombKind, Definitions, SimConfig, WeaponId};
use arcade_core::ecs::EntityId;
use arcade_core::error::GameError;
use arcade_core::math::{Fixed, Vec2Fixed};
use arcade_core::simulation::{Simulation, SpawnParams};
use arcade_core::terrain::{TileCell, TileCoord, TileGrid, TileHealthTracker};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Map rows have different widths or contain unknown glyphs.
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    /// Spawning a scenario entity failed.
    #[error("Failed to spawn scenario entity: {0}")]
    Spawn(#[from] GameError),
}

/// A complete scenario configuration.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Corridor",
///     map: MapSetup(rows: [
///         "..........",
///         "..####....",
///         "..........",
///     ]),
///     actor: UnitSetup(position: (16, 80), weapon: Some("gun-01")),
///     squads: [
///         SquadSetup(
///             lead: AiUnit(role: Grunt, body: UnitSetup(position: (300, 16))),
///             members: [SquadMember(role: Rusher, offset: (-30, 20))],
///         ),
///     ],
///     inputs: [ScriptedInput(tick: 5, action: Trigger(true))],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Run configuration (seed, difficulty, wave...).
    #[serde(default)]
    pub config: SimConfig,
    /// Tilemap.
    pub map: MapSetup,
    /// The player-controlled body.
    pub actor: UnitSetup,
    /// AI squads.
    #[serde(default)]
    pub squads: Vec<SquadSetup>,
    /// Interactive tile objects.
    #[serde(default)]
    pub objects: Vec<ObjectSetup>,
    /// Player inputs keyed by tick.
    #[serde(default)]
    pub inputs: Vec<ScriptedInput>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Build the simulation, spawning every scenario entity.
    ///
    /// `seed` overrides the scenario's configured seed when given.
    pub fn build(&self, defs: Definitions, seed: Option<u64>) -> Result<(Simulation, Spawned), ScenarioError> {
        let mut config = self.config.clone();
        if let Some(seed) = seed {
            config.seed = seed;
        }
        let (grid, tiles) = self.map.build()?;
        let mut sim = Simulation::new(defs, config, Box::new(grid), Rc::new(RefCell::new(tiles)));

        let actor = sim.spawn_actor(self.actor.params());
        let mut enemies = Vec::new();
        for squad in &self.squads {
            let lead = sim.spawn_ai(squad.lead.role, squad.lead.body.params())?;
            enemies.push(lead);
            for member in &squad.members {
                let lead_pos = squad.lead.body.world_position();
                let offset = pair_to_vec(member.offset);
                let params = SpawnParams {
                    position: lead_pos + offset,
                    ..squad.lead.body.params()
                };
                enemies.push(sim.spawn_squad_member(member.role, params, lead, offset)?);
            }
        }
        for object in &self.objects {
            sim.spawn_tile_object(
                TileCoord::new(object.tile.0, object.tile.1),
                object.object_id.clone(),
                object.interaction.clone(),
            );
        }

        tracing::info!(
            scenario = %self.name,
            enemies = enemies.len(),
            objects = self.objects.len(),
            "Scenario loaded"
        );
        Ok((sim, Spawned { actor, enemies }))
    }
}

/// Entities created by [`Scenario::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawned {
    /// The player actor.
    pub actor: EntityId,
    /// AI units, each lead before its members.
    pub enemies: Vec<EntityId>,
}

/// ASCII tilemap.
///
/// | Glyph | Tile |
/// |-------|------|
/// | `.` | grass |
/// | `=` | road |
/// | `s` | sand |
/// | `m` | mud |
/// | `~` | water |
/// | `#` | rock wall |
/// | `x` | destructible crate |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSetup {
    /// Tile edge length in world units.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Health of each `x` crate.
    #[serde(default = "default_crate_health")]
    pub crate_health: u32,
    /// One string per tile row, top row first.
    pub rows: Vec<String>,
}

const fn default_tile_size() -> u32 {
    32
}

const fn default_crate_health() -> u32 {
    60
}

impl MapSetup {
    /// Parse the rows into a grid and the tile health of its crates.
    pub fn build(&self) -> Result<(TileGrid, TileHealthTracker), ScenarioError> {
        let rows = self.rows.len() as u32;
        let cols = self.rows.first().map_or(0, |r| r.chars().count()) as u32;
        if rows == 0 || cols == 0 {
            return Err(ScenarioError::InvalidMap("map has no tiles".into()));
        }

        let mut grid = TileGrid::new(rows, cols, Fixed::from_num(self.tile_size), TileCell::open("grass"));
        let mut tiles = TileHealthTracker::new();
        for (row, line) in self.rows.iter().enumerate() {
            if line.chars().count() as u32 != cols {
                return Err(ScenarioError::InvalidMap(format!("row {row} is not {cols} tiles wide")));
            }
            for (col, glyph) in line.chars().enumerate() {
                let coord = TileCoord::new(row as u32, col as u32);
                let cell = match glyph {
                    '.' => continue,
                    '=' => TileCell::open("road"),
                    's' => TileCell::open("sand"),
                    'm' => TileCell::open("mud"),
                    '~' => TileCell::open("water"),
                    '#' => TileCell::wall("rock", false),
                    'x' => {
                        tiles.track(coord, self.crate_health);
                        TileCell::wall("crate", true)
                    }
                    other => {
                        return Err(ScenarioError::InvalidMap(format!(
                            "unknown glyph '{other}' at row {row}, column {col}"
                        )))
                    }
                };
                grid.set_cell(coord, cell);
            }
        }
        Ok((grid, tiles))
    }
}

/// Body stats shared by the actor and AI units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSetup {
    /// World position.
    pub position: (i32, i32),
    /// Hit points.
    #[serde(default = "default_health")]
    pub health: u32,
    /// Collider radius.
    #[serde(default = "default_radius")]
    pub collider_radius: i32,
    /// Top speed in world units per second.
    #[serde(default = "default_speed")]
    pub max_speed: i32,
    /// Equipped weapon.
    #[serde(default)]
    pub weapon: Option<WeaponId>,
}

const fn default_health() -> u32 {
    100
}

const fn default_radius() -> i32 {
    14
}

const fn default_speed() -> i32 {
    80
}

impl UnitSetup {
    fn world_position(&self) -> Vec2Fixed {
        pair_to_vec(self.position)
    }

    fn params(&self) -> SpawnParams {
        SpawnParams {
            health: Some(self.health),
            collider_radius: Some(Fixed::from_num(self.collider_radius)),
            max_speed: Some(Fixed::from_num(self.max_speed)),
            weapon: self.weapon.clone(),
            ..SpawnParams::at(self.world_position())
        }
    }
}

/// One AI unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiUnit {
    /// Behaviour profile.
    pub role: AiRole,
    /// Body.
    pub body: UnitSetup,
}

/// A lead and the members holding formation on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadSetup {
    /// Squad lead.
    pub lead: AiUnit,
    /// Followers, spawned at their slot with the lead's body stats.
    #[serde(default)]
    pub members: Vec<SquadMember>,
}

/// A squad follower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadMember {
    /// Behaviour profile.
    pub role: AiRole,
    /// Slot offset in the lead's frame.
    pub offset: (i32, i32),
}

/// An interactive object anchored to a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSetup {
    /// Anchor tile (row, column).
    pub tile: (u32, u32),
    /// Object identifier reported in interaction events.
    pub object_id: String,
    /// Interaction type.
    pub interaction: String,
}

/// A player input applied at the start of `tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedInput {
    /// Zero-based tick index.
    pub tick: u64,
    /// What the player does.
    pub action: InputAction,
}

/// Player actions available to scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputAction {
    /// Set the actor's velocity in world units per second.
    Move(i32, i32),
    /// Aim at a world point.
    AimAt(i32, i32),
    /// Press or release the trigger.
    Trigger(bool),
    /// Request a weapon switch.
    SwitchWeapon(WeaponId),
    /// Drop a bomb at the actor's position.
    PlaceBomb(BombKind),
    /// Detonate the actor's armed remote bombs.
    DetonateRemotes,
}

fn pair_to_vec((x, y): (i32, i32)) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}
