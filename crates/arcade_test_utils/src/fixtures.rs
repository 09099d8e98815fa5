//! Test fixtures and helpers.
//!
//! Pre-built arenas and entity configurations
//! for consistent testing.

use std::cell::RefCell;
use std::rc::Rc;

use arcade_core::data::{AiRole, Definitions, Difficulty, SimConfig};
use arcade_core::ecs::EntityId;
use arcade_core::math::Vec2Fixed;
use arcade_core::simulation::{Simulation, SpawnParams};
use arcade_core::terrain::{TileCell, TileCoord, TileGrid, TileHealthTracker};
use fixed::types::I32F32;

/// Edge length of fixture tiles in world units.
pub const TILE_SIZE: i32 = 32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from integer components.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Builder for a rectangular arena with walls and destructible crates.
#[derive(Debug, Clone)]
pub struct ArenaBuilder {
    rows: u32,
    cols: u32,
    walls: Vec<TileCoord>,
    crates: Vec<(TileCoord, u32)>,
    config: SimConfig,
    defs: Definitions,
}

impl Default for ArenaBuilder {
    fn default() -> Self {
        Self::new(20, 20)
    }
}

impl ArenaBuilder {
    /// Open grass arena of `rows × cols` tiles.
    #[must_use]
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            walls: Vec::new(),
            crates: Vec::new(),
            config: SimConfig::default(),
            defs: Definitions::builtin(),
        }
    }

    /// RNG seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Difficulty level.
    #[must_use]
    pub fn difficulty(mut self, level: Difficulty) -> Self {
        self.config.difficulty = level;
        self
    }

    /// Replace the definition tables.
    #[must_use]
    pub fn definitions(mut self, defs: Definitions) -> Self {
        self.defs = defs;
        self
    }

    /// Indestructible wall.
    #[must_use]
    pub fn wall(mut self, row: u32, col: u32) -> Self {
        self.walls.push(TileCoord::new(row, col));
        self
    }

    /// Destructible crate with `hp` health.
    #[must_use]
    pub fn crate_at(mut self, row: u32, col: u32, hp: u32) -> Self {
        self.crates.push((TileCoord::new(row, col), hp));
        self
    }

    /// Build the simulation.
    #[must_use]
    pub fn build(self) -> Simulation {
        let mut grid = TileGrid::new(self.rows, self.cols, fixed(TILE_SIZE), TileCell::open("grass"));
        let mut tiles = TileHealthTracker::new();
        for coord in self.walls {
            grid.set_cell(coord, TileCell::wall("rock", false));
        }
        for (coord, hp) in self.crates {
            grid.set_cell(coord, TileCell::wall("crate", true));
            tiles.track(coord, hp);
        }
        Simulation::new(self.defs, self.config, Box::new(grid), Rc::new(RefCell::new(tiles)))
    }
}

/// World position of a tile's centre in a fixture arena.
#[must_use]
pub fn tile_center(row: u32, col: u32) -> Vec2Fixed {
    let half = TILE_SIZE / 2;
    vec2(col as i32 * TILE_SIZE + half, row as i32 * TILE_SIZE + half)
}

/// A player tank with `gun-01`.
#[must_use]
pub fn player_params(position: Vec2Fixed) -> SpawnParams {
    SpawnParams {
        health: Some(200),
        collider_radius: Some(fixed(14)),
        max_speed: Some(fixed(120)),
        weapon: Some("gun-01".into()),
        ..SpawnParams::at(position)
    }
}

/// An enemy tank with `gun-02`.
#[must_use]
pub fn enemy_params(position: Vec2Fixed) -> SpawnParams {
    SpawnParams {
        health: Some(80),
        collider_radius: Some(fixed(14)),
        max_speed: Some(fixed(70)),
        weapon: Some("gun-02".into()),
        ..SpawnParams::at(position)
    }
}

/// Entities placed by [`skirmish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skirmish {
    /// The player.
    pub actor: EntityId,
    /// Every AI unit, lead first.
    pub enemies: Vec<EntityId>,
}

/// Player in the bottom-left corner, a squad of three in the top-right and
/// a crate wall between them.
///
/// # Panics
///
/// Panics if the builtin tables lack a stock role, which is a fixture bug.
#[must_use]
pub fn skirmish(seed: u64) -> (Simulation, Skirmish) {
    let mut builder = ArenaBuilder::new(20, 20).seed(seed);
    for row in 6..14 {
        builder = builder.crate_at(row, 10, 60);
    }
    let mut sim = builder.build();

    let actor = sim.spawn_actor(player_params(tile_center(17, 2)));
    let lead = sim
        .spawn_ai(AiRole::Grunt, enemy_params(tile_center(2, 17)))
        .expect("grunt profile");
    let mut enemies = vec![lead];
    for (role, offset) in [(AiRole::Flanker, vec2(-40, 30)), (AiRole::Rusher, vec2(-40, -30))] {
        let member = sim
            .spawn_squad_member(role, enemy_params(tile_center(2, 16)), lead, offset)
            .expect("stock squad role");
        enemies.push(member);
    }

    (sim, Skirmish { actor, enemies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::components::Ai;
    use arcade_core::time::TickDelta;

    #[test]
    fn test_tile_center() {
        assert_eq!(tile_center(0, 0), vec2(16, 16));
        assert_eq!(tile_center(2, 3), vec2(112, 80));
    }

    #[test]
    fn test_arena_tracks_crates() {
        let sim = ArenaBuilder::new(4, 4).crate_at(1, 1, 30).wall(2, 2).build();
        let ctx = sim.context();
        assert_eq!(ctx.tile_health.borrow().health(TileCoord::new(1, 1)), 30);
        assert!(ctx.terrain.is_destructible(TileCoord::new(1, 1)));
        assert!(!ctx.terrain.is_walkable(TileCoord::new(2, 2)));
        assert!(!ctx.terrain.is_destructible(TileCoord::new(2, 2)));
    }

    #[test]
    fn test_skirmish_squad_links_to_lead() {
        let (mut sim, skirmish) = skirmish(9);
        assert_eq!(skirmish.enemies.len(), 3);
        let lead = skirmish.enemies[0];
        for &member in &skirmish.enemies[1..] {
            let ai = sim.context().store.get::<Ai>(member).map(|ai| ai.squad_lead);
            assert_eq!(ai, Some(Some(lead)));
        }
        sim.tick(TickDelta::from_millis(16));
        assert_eq!(sim.context().actor, Some(skirmish.actor));
    }
}
