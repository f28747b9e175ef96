/// Hit testing: axis-aligned boxes in tile units.
///
/// World space uses fractional tile coordinates: `x` runs along columns,
/// `y` along rows, and tile `(row, col)` is centred on `(col, row)`. A tile
/// box therefore spans `[col - 0.5, col + 0.5] x [row - 0.5, row + 0.5]`.
///
/// Intersection is strict: boxes that only share an edge do not touch.
/// That lets a hitbox sit flush against a wall without counting as inside it.

use super::grid::TilePos;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    /// Square box of half-extent `half` centred on `(cx, cy)`.
    pub fn centered(cx: f32, cy: f32, half: f32) -> Self {
        Aabb { min_x: cx - half, min_y: cy - half, max_x: cx + half, max_y: cy + half }
    }

    /// Full-size box of a grid tile.
    pub fn tile(pos: TilePos) -> Self {
        Aabb::centered(pos.col as f32, pos.row as f32, 0.5)
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Inclusive on all edges.
    #[inline]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Signed `(row, col)` range of tiles this box can overlap.
    /// Callers still confirm each candidate with `intersects`.
    pub fn tile_span(&self) -> (std::ops::RangeInclusive<isize>, std::ops::RangeInclusive<isize>) {
        let r0 = (self.min_y + 0.5).floor() as isize;
        let r1 = (self.max_y + 0.5).floor() as isize;
        let c0 = (self.min_x + 0.5).floor() as isize;
        let c1 = (self.max_x + 0.5).floor() as isize;
        (r0..=r1, c0..=c1)
    }
}

/// Round a world coordinate pair to the tile it lies in.
/// None if it falls left of or above the grid origin.
pub fn tile_of(x: f32, y: f32) -> Option<TilePos> {
    let row = y.round();
    let col = x.round();
    if row < 0.0 || col < 0.0 {
        return None;
    }
    Some(TilePos::new(row as usize, col as usize))
}
