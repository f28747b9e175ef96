/// Terrain kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so terrain semantics are centralized here.

use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub enum Tile {
    #[default]
    Empty,
    Wall,  // Indestructible, absorbs blasts
    Block, // Destructible, may hide an item
}

impl Tile {
    /// Does this tile stop an entity from entering it?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall | Tile::Block)
    }

    /// Can a blast destroy this tile?
    pub fn is_destructible(self) -> bool {
        matches!(self, Tile::Block)
    }

    /// Does a blast stop before this tile without touching it?
    pub fn absorbs_blast(self) -> bool {
        matches!(self, Tile::Wall)
    }

    pub fn is_passable(self) -> bool {
        !self.is_solid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_blocks_are_destructible() {
        assert!(Tile::Block.is_destructible());
        assert!(!Tile::Wall.is_destructible());
        assert!(!Tile::Empty.is_destructible());
    }

    #[test]
    fn walls_absorb_blocks_do_not() {
        assert!(Tile::Wall.absorbs_blast());
        assert!(!Tile::Block.absorbs_blast());
    }

    #[test]
    fn empty_is_the_only_passable_tile() {
        assert!(Tile::Empty.is_passable());
        assert!(!Tile::Wall.is_passable());
        assert!(!Tile::Block.is_passable());
    }
}
