//! Terrain collaborators.
//!
//! The simulation reads terrain through [`TerrainMap`] and mutates tile
//! health only through [`TileHealthStore`]. [`TileGrid`] and
//! [`TileHealthTracker`] are the in-crate implementations used by the
//! headless runner and tests; a game can supply its own tilemap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed, Vec2Fixed};

/// Row/column address of a terrain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Row index (y).
    pub row: u32,
    /// Column index (x).
    pub col: u32,
}

impl TileCoord {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Read-only view of the tilemap.
pub trait TerrainMap {
    /// Edge length of a square tile in world units.
    fn tile_size(&self) -> Fixed;

    /// Number of tile rows.
    fn rows(&self) -> u32;

    /// Number of tile columns.
    fn cols(&self) -> u32;

    /// Ground type name at `coord`, `None` outside the map.
    fn ground(&self, coord: TileCoord) -> Option<&str>;

    /// Whether units can move through `coord`. Out of bounds is not walkable.
    fn is_walkable(&self, coord: TileCoord) -> bool;

    /// Whether projectiles and sight lines stop at `coord`.
    fn blocks_projectiles(&self, coord: TileCoord) -> bool;

    /// Whether the object on `coord` can be damaged.
    fn is_destructible(&self, coord: TileCoord) -> bool;

    /// Tile containing a world position, `None` outside the map.
    fn world_to_tile(&self, pos: Vec2Fixed) -> Option<TileCoord> {
        if pos.x < Fixed::ZERO || pos.y < Fixed::ZERO {
            return None;
        }
        let size = self.tile_size();
        if size <= Fixed::ZERO {
            return None;
        }
        let col = (pos.x / size).to_num::<i64>();
        let row = (pos.y / size).to_num::<i64>();
        if row < i64::from(self.rows()) && col < i64::from(self.cols()) {
            Some(TileCoord::new(row as u32, col as u32))
        } else {
            None
        }
    }

    /// World position of a tile's centre.
    fn tile_center(&self, coord: TileCoord) -> Vec2Fixed {
        let size = self.tile_size();
        let half = size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(coord.col) * size + half,
            Fixed::from_num(coord.row) * size + half,
        )
    }

    /// Whether nothing blocks projectiles on the segment `from → to`.
    ///
    /// Samples every quarter tile; leaving the map counts as blocked.
    fn line_of_sight(&self, from: Vec2Fixed, to: Vec2Fixed) -> bool {
        let step = self.tile_size() / Fixed::from_num(4);
        if step <= Fixed::ZERO {
            return true;
        }
        let delta = to - from;
        let length = delta.length();
        let dir = delta.normalize();
        let mut travelled = Fixed::ZERO;
        while travelled <= length {
            match self.world_to_tile(from + dir * travelled) {
                Some(coord) if !self.blocks_projectiles(coord) => {}
                _ => return false,
            }
            travelled += step;
        }
        true
    }
}

/// One cell of a [`TileGrid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCell {
    /// Ground type name, keyed into the terrain cost table.
    pub ground: String,
    /// Units can pass.
    #[serde(default = "default_true")]
    pub walkable: bool,
    /// Stops projectiles and sight lines.
    #[serde(default)]
    pub blocks_projectiles: bool,
    /// Object on the tile takes damage.
    #[serde(default)]
    pub destructible: bool,
}

const fn default_true() -> bool {
    true
}

impl TileCell {
    /// Open ground of the given type.
    #[must_use]
    pub fn open(ground: impl Into<String>) -> Self {
        Self {
            ground: ground.into(),
            walkable: true,
            blocks_projectiles: false,
            destructible: false,
        }
    }

    /// A wall: blocks movement and projectiles.
    #[must_use]
    pub fn wall(ground: impl Into<String>, destructible: bool) -> Self {
        Self {
            ground: ground.into(),
            walkable: false,
            blocks_projectiles: true,
            destructible,
        }
    }
}

/// Rectangular tilemap stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    rows: u32,
    cols: u32,
    #[serde(with = "fixed_decimal")]
    tile_size: Fixed,
    cells: Vec<TileCell>,
}

impl TileGrid {
    /// Grid of `rows × cols` tiles filled with `fill`.
    #[must_use]
    pub fn new(rows: u32, cols: u32, tile_size: Fixed, fill: TileCell) -> Self {
        let count = (rows as usize) * (cols as usize);
        Self {
            rows,
            cols,
            tile_size,
            cells: vec![fill; count],
        }
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.row < self.rows && coord.col < self.cols {
            Some((coord.row as usize) * (self.cols as usize) + coord.col as usize)
        } else {
            None
        }
    }

    /// Cell at `coord`.
    #[must_use]
    pub fn cell(&self, coord: TileCoord) -> Option<&TileCell> {
        self.index(coord).and_then(|i| self.cells.get(i))
    }

    /// Replace the cell at `coord`. Returns `false` out of bounds.
    pub fn set_cell(&mut self, coord: TileCoord, cell: TileCell) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    /// Whether the stored cell count matches the dimensions.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.cells.len() == (self.rows as usize) * (self.cols as usize)
    }
}

impl TerrainMap for TileGrid {
    fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    fn rows(&self) -> u32 {
        self.rows
    }

    fn cols(&self) -> u32 {
        self.cols
    }

    fn ground(&self, coord: TileCoord) -> Option<&str> {
        self.cell(coord).map(|c| c.ground.as_str())
    }

    fn is_walkable(&self, coord: TileCoord) -> bool {
        self.cell(coord).is_some_and(|c| c.walkable)
    }

    fn blocks_projectiles(&self, coord: TileCoord) -> bool {
        self.cell(coord).is_some_and(|c| c.blocks_projectiles)
    }

    fn is_destructible(&self, coord: TileCoord) -> bool {
        self.cell(coord).is_some_and(|c| c.destructible)
    }
}

/// Speed multipliers per ground type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerrainCosts {
    multipliers: BTreeMap<String, Fixed>,
}

impl TerrainCosts {
    /// Set the multiplier for a ground type.
    pub fn set(&mut self, ground: impl Into<String>, multiplier: Fixed) {
        self.multipliers.insert(ground.into(), multiplier);
    }

    /// Multiplier for a ground type; 1.0 when absent.
    #[must_use]
    pub fn multiplier(&self, ground: &str) -> Fixed {
        self.multipliers.get(ground).copied().unwrap_or(Fixed::ONE)
    }

    /// Merge `other` over `self`.
    pub fn extend(&mut self, other: &TerrainCosts) {
        for (ground, value) in &other.multipliers {
            self.multipliers.insert(ground.clone(), *value);
        }
    }
}

/// Speed multiplier at a world position.
///
/// Positions outside the map, and ground types missing from the table,
/// yield 1.0.
#[must_use]
pub fn terrain_speed_modifier(map: &dyn TerrainMap, costs: &TerrainCosts, pos: Vec2Fixed) -> Fixed {
    map.world_to_tile(pos)
        .and_then(|coord| map.ground(coord))
        .map_or(Fixed::ONE, |ground| costs.multiplier(ground))
}

/// Mutable tile health, keyed by tile.
pub trait TileHealthStore {
    /// Current health; 0 for untracked tiles.
    fn health(&self, coord: TileCoord) -> u32;

    /// Whether the tile has tracked health.
    fn is_tracked(&self, coord: TileCoord) -> bool;

    /// Apply damage and return the remaining health.
    ///
    /// Untracked tiles report 0. A tile reaching 0 stops being tracked.
    fn apply_damage(&mut self, coord: TileCoord, amount: u32) -> u32;
}

/// In-memory [`TileHealthStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileHealthTracker {
    health: BTreeMap<TileCoord, u32>,
}

impl TileHealthTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `coord` with `hp` health. Zero untracks it.
    pub fn track(&mut self, coord: TileCoord, hp: u32) {
        if hp == 0 {
            self.health.remove(&coord);
        } else {
            self.health.insert(coord, hp);
        }
    }

    /// Number of tracked tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.health.len()
    }

    /// Whether no tiles are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.health.is_empty()
    }
}

impl TileHealthStore for TileHealthTracker {
    fn health(&self, coord: TileCoord) -> u32 {
        self.health.get(&coord).copied().unwrap_or(0)
    }

    fn is_tracked(&self, coord: TileCoord) -> bool {
        self.health.contains_key(&coord)
    }

    fn apply_damage(&mut self, coord: TileCoord, amount: u32) -> u32 {
        let Some(hp) = self.health.get_mut(&coord) else {
            return 0;
        };
        *hp = hp.saturating_sub(amount);
        let remaining = *hp;
        if remaining == 0 {
            self.health.remove(&coord);
        }
        remaining
    }
}
