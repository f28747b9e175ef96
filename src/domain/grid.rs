/// GridMap: the arena terrain.
///
/// A fixed `rows x cols` array of tiles, stored row-major. Coordinates are
/// `(row, col)` with `(0, 0)` in the top-left corner.
///
/// ## Invariants
///   - Border tiles are always `Wall`.
///   - Generated maps put a `Wall` pillar at every (even row, even col).
///   - A `Wall` never changes and no tile ever becomes a `Wall`.
///
/// Only the blast propagator mutates the grid during a match, and only by
/// turning `Block` into `Empty`.

use rand::Rng;
use serde::Serialize;

use super::entity::ItemKind;
use super::input::Direction;
use super::tile::Tile;
use crate::error::MapLoadError;

/// Smallest arena that still has a playable interior.
pub const MIN_SIDE: usize = 5;

/// Tiles within this Manhattan distance of a spawn stay clear when generating.
const SPAWN_SAFE_RADIUS: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct TilePos {
    pub row: usize,
    pub col: usize,
}

impl TilePos {
    pub const fn new(row: usize, col: usize) -> Self {
        TilePos { row, col }
    }

    /// Step `n` tiles in `dir`. None if the step would leave the first quadrant.
    pub fn offset(self, dir: Direction, n: usize) -> Option<TilePos> {
        let (dr, dc) = dir.delta();
        let row = self.row as isize + dr as isize * n as isize;
        let col = self.col as isize + dc as isize * n as isize;
        if row < 0 || col < 0 {
            return None;
        }
        Some(TilePos::new(row as usize, col as usize))
    }

    pub fn manhattan(self, other: TilePos) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

#[derive(Clone, Debug)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    /// Item concealed under a block, revealed when the block is destroyed.
    hidden: Vec<Option<ItemKind>>,
}

// ── Construction ──

impl GridMap {
    /// All-empty interior ringed by walls.
    pub fn walled(rows: usize, cols: usize) -> Result<Self, MapLoadError> {
        if rows < MIN_SIDE || cols < MIN_SIDE {
            return Err(MapLoadError::TooSmall { rows, cols, min: MIN_SIDE });
        }
        let mut tiles = vec![Tile::Empty; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                if r == 0 || c == 0 || r == rows - 1 || c == cols - 1 {
                    tiles[r * cols + c] = Tile::Wall;
                }
            }
        }
        Ok(GridMap { rows, cols, tiles, hidden: vec![None; rows * cols] })
    }

    /// Build from already-parsed rows. The caller (map loader) owns validation
    /// of codes and spawns; this checks shape and the border invariant.
    pub fn from_rows(
        rows: Vec<Vec<Tile>>,
        hidden: Vec<Vec<Option<ItemKind>>>,
    ) -> Result<Self, MapLoadError> {
        let height = rows.len();
        if height == 0 {
            return Err(MapLoadError::Empty);
        }
        let width = rows[0].len();
        if height < MIN_SIDE || width < MIN_SIDE {
            return Err(MapLoadError::TooSmall { rows: height, cols: width, min: MIN_SIDE });
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MapLoadError::Ragged { row: r, found: row.len(), expected: width });
            }
        }

        let tiles: Vec<Tile> = rows.into_iter().flatten().collect();
        let mut hidden_flat: Vec<Option<ItemKind>> = hidden.into_iter().flatten().collect();
        hidden_flat.resize(tiles.len(), None);

        let grid = GridMap { rows: height, cols: width, tiles, hidden: hidden_flat };
        for r in 0..height {
            for c in 0..width {
                if grid.is_border(TilePos::new(r, c)) && grid.tiles[r * width + c] != Tile::Wall {
                    return Err(MapLoadError::OpenBorder { row: r, col: c });
                }
            }
        }
        Ok(grid)
    }

    /// Classic arena: border walls, pillars at (even, even), and blocks
    /// scattered with probability `block_density` outside the spawn zones.
    pub fn generate<R: Rng>(
        rows: usize,
        cols: usize,
        block_density: f64,
        spawns: &[TilePos],
        rng: &mut R,
    ) -> Result<Self, MapLoadError> {
        let mut grid = GridMap::walled(rows, cols)?;
        let density = block_density.clamp(0.0, 1.0);

        for r in 1..rows - 1 {
            for c in 1..cols - 1 {
                let pos = TilePos::new(r, c);
                let idx = grid.index(pos);
                if r % 2 == 0 && c % 2 == 0 {
                    grid.tiles[idx] = Tile::Wall;
                } else if spawns.iter().any(|s| s.manhattan(pos) <= SPAWN_SAFE_RADIUS) {
                    // Spawn corners stay open so nobody starts boxed in
                } else if rng.gen_bool(density) {
                    grid.tiles[idx] = Tile::Block;
                }
            }
        }
        Ok(grid)
    }
}

// ── Query / mutation API ──

impl GridMap {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Signed variant used by geometry code working in fractional coordinates.
    #[inline]
    pub fn in_bounds_signed(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    /// Query terrain at `pos`. Out of bounds reads as `Wall`.
    #[inline]
    pub fn cell_at(&self, pos: TilePos) -> Tile {
        if self.in_bounds(pos) {
            self.tiles[self.index(pos)]
        } else {
            Tile::Wall
        }
    }

    /// Set a tile. Out-of-bounds writes are ignored.
    ///
    /// # Panics
    /// If the write would change a `Wall` or create one: walls are fixed for
    /// the lifetime of the map and a violation means corrupted state.
    pub fn set_cell(&mut self, pos: TilePos, tile: Tile) {
        if !self.in_bounds(pos) {
            return;
        }
        let idx = self.index(pos);
        let current = self.tiles[idx];
        assert!(
            (current == Tile::Wall) == (tile == Tile::Wall),
            "wall tiles are immutable: {current:?} -> {tile:?} at {pos:?}"
        );
        self.tiles[idx] = tile;
        if tile != Tile::Block {
            self.hidden[idx] = None;
        }
    }

    /// Turn a block into empty ground. Returns the item it concealed, if any.
    /// No-op on anything but a `Block`.
    pub fn destroy_block(&mut self, pos: TilePos) -> Option<ItemKind> {
        if self.cell_at(pos) != Tile::Block {
            return None;
        }
        let idx = self.index(pos);
        let hidden = self.hidden[idx].take();
        self.set_cell(pos, Tile::Empty);
        hidden
    }

    pub fn hidden_item(&self, pos: TilePos) -> Option<ItemKind> {
        if self.in_bounds(pos) { self.hidden[self.index(pos)] } else { None }
    }

    /// Conceal `kind` under the block at `pos`. Ignored for non-block tiles.
    pub fn hide_item(&mut self, pos: TilePos, kind: ItemKind) {
        if self.cell_at(pos) == Tile::Block {
            let idx = self.index(pos);
            self.hidden[idx] = Some(kind);
        }
    }

    pub fn is_border(&self, pos: TilePos) -> bool {
        pos.row == 0 || pos.col == 0 || pos.row + 1 == self.rows || pos.col + 1 == self.cols
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    /// Row-major tile slice, for snapshots.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    #[inline]
    fn index(&self, pos: TilePos) -> usize {
        pos.row * self.cols + pos.col
    }
}
