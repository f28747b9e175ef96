/// Pure game rules: terrain, geometry, entities, blasts, skills.
/// Nothing in here does I/O or knows about the terminal.

pub mod ability;
pub mod blast;
pub mod entity;
pub mod grid;
pub mod hit;
pub mod input;
pub mod movement;
pub mod tile;
