//! Flow field navigation.
//!
//! A breadth-first search from the goal tile over 4-connected walkable
//! tiles assigns every reachable tile a unit step toward a neighbour that is
//! one tile closer to the goal. AI units sample the field at their own tile
//! instead of each running a path search.

use crate::math::{Fixed, Vec2Fixed};
use crate::terrain::{TerrainMap, TileCoord};
use std::collections::VecDeque;

/// Neighbour offsets (row, col) in tie-break order: up, down, left, right.
const NEIGHBOURS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Per-tile steering toward a goal tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowField {
    rows: u32,
    cols: u32,
    goal: Option<TileCoord>,
    /// BFS distance in tiles; `None` when unreachable.
    distances: Vec<Option<u32>>,
    /// Step toward the goal as (row delta, col delta).
    steps: Vec<Option<(i8, i8)>>,
}

impl FlowField {
    /// Empty field; every lookup returns `None` until computed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Goal the field was last computed for.
    #[must_use]
    pub const fn goal(&self) -> Option<TileCoord> {
        self.goal
    }

    /// Whether the goal has moved at least `threshold` tiles along either
    /// axis since the last computation. Always true before the first one.
    #[must_use]
    pub fn needs_recompute(&self, goal: TileCoord, threshold: u32) -> bool {
        let Some(last) = self.goal else {
            return true;
        };
        let threshold = threshold.max(1);
        last.row.abs_diff(goal.row) >= threshold || last.col.abs_diff(goal.col) >= threshold
    }

    /// Rebuild the field toward `goal`.
    ///
    /// The goal tile itself need not be walkable; every other tile on a
    /// route must be.
    pub fn compute(&mut self, terrain: &dyn TerrainMap, goal: TileCoord) {
        self.rows = terrain.rows();
        self.cols = terrain.cols();
        self.goal = Some(goal);
        let cells = self.rows as usize * self.cols as usize;
        self.distances = vec![None; cells];
        self.steps = vec![None; cells];

        let Some(goal_index) = self.index(goal) else {
            return;
        };
        self.distances[goal_index] = Some(0);

        let mut queue = VecDeque::from([goal]);
        while let Some(current) = queue.pop_front() {
            let Some(dist) = self.index(current).and_then(|i| self.distances[i]) else {
                continue;
            };
            for (dr, dc) in NEIGHBOURS {
                let Some(next) = self.offset(current, dr, dc) else {
                    continue;
                };
                let Some(i) = self.index(next) else {
                    continue;
                };
                if self.distances[i].is_some() || !terrain.is_walkable(next) {
                    continue;
                }
                self.distances[i] = Some(dist + 1);
                queue.push_back(next);
            }
        }

        for row in 0..self.rows {
            for col in 0..self.cols {
                let tile = TileCoord::new(row, col);
                let Some(i) = self.index(tile) else {
                    continue;
                };
                let Some(mut best) = self.distances[i] else {
                    continue;
                };
                for (dr, dc) in NEIGHBOURS {
                    let Some(d) = self
                        .offset(tile, dr, dc)
                        .and_then(|n| self.index(n))
                        .and_then(|n| self.distances[n])
                    else {
                        continue;
                    };
                    if d < best {
                        best = d;
                        self.steps[i] = Some((dr as i8, dc as i8));
                    }
                }
            }
        }

        tracing::trace!(row = goal.row, col = goal.col, "Flow field computed");
    }

    /// Tiles between `tile` and the goal, `None` when unreachable.
    #[must_use]
    pub fn distance(&self, tile: TileCoord) -> Option<u32> {
        self.index(tile).and_then(|i| self.distances[i])
    }

    /// Unit world direction toward the goal from `tile`.
    ///
    /// `None` on the goal tile, on unreachable tiles and outside the map.
    #[must_use]
    pub fn direction(&self, tile: TileCoord) -> Option<Vec2Fixed> {
        let (dr, dc) = self.index(tile).and_then(|i| self.steps[i])?;
        Some(Vec2Fixed::new(Fixed::from_num(dc), Fixed::from_num(dr)))
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        (tile.row < self.rows && tile.col < self.cols)
            .then(|| tile.row as usize * self.cols as usize + tile.col as usize)
    }

    fn offset(&self, tile: TileCoord, dr: i64, dc: i64) -> Option<TileCoord> {
        let row = i64::from(tile.row) + dr;
        let col = i64::from(tile.col) + dc;
        if row < 0 || col < 0 || row >= i64::from(self.rows) || col >= i64::from(self.cols) {
            return None;
        }
        Some(TileCoord::new(row as u32, col as u32))
    }
}
