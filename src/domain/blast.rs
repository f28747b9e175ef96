/// Explosion propagation.
///
/// A bomb always produces a centre cell, then walks each of the four arms
/// (in `Direction::ALL` order) up to `range` tiles:
///
/// ```text
///   out of bounds / Wall  → stop, nothing placed
///   Block                 → place, destroy, maybe drop an item, stop
///   Empty                 → place, continue
/// ```
///
/// Chaining is not handled here. The bomb phase of the step detonates any
/// bomb whose tile ends up covered by an explosion.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entity::{BlastPart, Explosion, Item, ItemKind, ItemWeights};
use super::grid::{GridMap, TilePos};
use super::input::Direction;

/// What happens to an arm after it destroys a block.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockPolicy {
    /// The arm ends on the destroyed block.
    #[default]
    Stop,
    /// One more Empty tile beyond the block is also hit, if still in range.
    OnePast,
}

#[derive(Clone, Copy, Debug)]
pub struct BlastParams {
    pub policy: BlockPolicy,
    /// Chance that a block without a hidden item drops one.
    pub drop_chance: f64,
    pub weights: ItemWeights,
    pub explosion_ticks: u32,
    pub item_ticks: u32,
}

#[derive(Clone, Debug, Default)]
pub struct BlastResult {
    pub explosions: Vec<Explosion>,
    pub destroyed: Vec<TilePos>,
    pub spawned: Vec<Item>,
}

impl BlastResult {
    pub fn covers(&self, pos: TilePos) -> bool {
        self.explosions.iter().any(|e| e.pos == pos)
    }
}

/// Detonate at `center`: mutate the grid and return everything spawned.
pub fn propagate<R: Rng>(
    grid: &mut GridMap,
    center: TilePos,
    range: u32,
    params: &BlastParams,
    tick: u64,
    rng: &mut R,
) -> BlastResult {
    let mut result = BlastResult::default();
    result.explosions.push(Explosion::new(center, BlastPart::Center, params.explosion_ticks, tick));

    let range = range as usize;
    for dir in Direction::ALL {
        let part = BlastPart::Arm(dir);
        for step in 1..=range {
            let pos = match center.offset(dir, step) {
                Some(p) if grid.in_bounds(p) => p,
                _ => break,
            };
            let tile = grid.cell_at(pos);
            if tile.absorbs_blast() {
                break;
            }
            result.explosions.push(Explosion::new(pos, part, params.explosion_ticks, tick));
            if tile.is_destructible() {
                destroy(grid, pos, params, tick, rng, &mut result);
                if params.policy == BlockPolicy::OnePast && step < range {
                    if let Some(next) = pos.offset(dir, 1) {
                        if grid.in_bounds(next) && grid.cell_at(next).is_passable() {
                            result.explosions.push(Explosion::new(next, part, params.explosion_ticks, tick));
                        }
                    }
                }
                break;
            }
        }
    }

    log::debug!(
        "blast at {center:?} r={range}: {} cells, {} blocks, {} drops",
        result.explosions.len(),
        result.destroyed.len(),
        result.spawned.len()
    );
    result
}

fn destroy<R: Rng>(
    grid: &mut GridMap,
    pos: TilePos,
    params: &BlastParams,
    tick: u64,
    rng: &mut R,
    result: &mut BlastResult,
) {
    let hidden = grid.destroy_block(pos);
    result.destroyed.push(pos);
    if let Some(kind) = hidden.or_else(|| roll_drop(params, rng)) {
        result.spawned.push(Item::new(pos, kind, params.item_ticks, tick));
    }
}

fn roll_drop<R: Rng>(params: &BlastParams, rng: &mut R) -> Option<ItemKind> {
    if params.drop_chance <= 0.0 {
        return None;
    }
    if rng.gen_bool(params.drop_chance.min(1.0)) {
        params.weights.pick(rng)
    } else {
        None
    }
}
