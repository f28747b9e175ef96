/// Continuous movement over the tile grid.
///
/// ## Architecture
///
/// Two distinct checks, queried separately:
///   1. TERRAIN:   does the candidate hitbox overlap a Wall or Block box?
///   2. OCCUPANCY: does it overlap a bomb the player is not already on?
///
/// A candidate position is accepted only if both pass and its rounded tile
/// is inside the grid. The X axis is resolved first, then Y, so a blocked
/// component never cancels the other. Each axis is walked in sub-steps no
/// longer than the hitbox half-extent, so a fast player stops flush
/// against an obstacle instead of skipping over it.
///
/// ## Bomb pass-through
///
/// A player may stay on and walk off a bomb it is standing on (same rounded
/// tile, or a hitbox that already overlaps the bomb's box). Once clear, the
/// bomb blocks like terrain.

use super::entity::{Bomb, Player};
use super::grid::{GridMap, TilePos};
use super::hit::{self, Aabb};

/// Movement tuning, taken from config.
#[derive(Clone, Copy, Debug)]
pub struct MoveParams {
    /// Tiles per tick for one point of `move_speed`.
    pub speed_unit: f32,
    /// Max distance from a lane centre at which a blocked move is nudged
    /// toward that centre. 0 disables.
    pub corner_assist: f32,
}

const LANE_EPSILON: f32 = 1e-4;

// ══════════════════════════════════════════════════════════════
// Layer 1: Terrain
// ══════════════════════════════════════════════════════════════

/// Does `hb` overlap any solid tile? Out-of-bounds tiles read as walls.
fn hits_terrain(grid: &GridMap, hb: &Aabb) -> bool {
    let (rows, cols) = hb.tile_span();
    for r in rows {
        for c in cols.clone() {
            let solid = if grid.in_bounds_signed(r, c) {
                grid.cell_at(TilePos::new(r as usize, c as usize)).is_solid()
            } else {
                true
            };
            if solid && hb.intersects(&tile_box(r, c)) {
                return true;
            }
        }
    }
    false
}

fn tile_box(row: isize, col: isize) -> Aabb {
    Aabb::centered(col as f32, row as f32, 0.5)
}

// ══════════════════════════════════════════════════════════════
// Layer 2: Occupancy (bombs)
// ══════════════════════════════════════════════════════════════

fn hits_foreign_bomb(player: &Player, bombs: &[Bomb], candidate: &Aabb) -> bool {
    let current_tile = player.tile();
    let current = player.hitbox();
    bombs.iter().any(|b| {
        let bb = b.hitbox();
        b.pos != current_tile && !current.intersects(&bb) && candidate.intersects(&bb)
    })
}

// ══════════════════════════════════════════════════════════════
// Layer 3: Resolution
// ══════════════════════════════════════════════════════════════

/// Can `player` occupy `(x, y)`?
pub fn can_occupy(player: &Player, grid: &GridMap, bombs: &[Bomb], x: f32, y: f32) -> bool {
    match hit::tile_of(x, y) {
        Some(t) if grid.in_bounds(t) => {}
        _ => return false,
    }
    let hb = player.hitbox_at(x, y);
    !hits_terrain(grid, &hb) && !hits_foreign_bomb(player, bombs, &hb)
}

/// Move `player` one tick along its active direction.
/// Returns true if the position changed.
pub fn resolve_movement(player: &mut Player, grid: &GridMap, bombs: &[Bomb], params: &MoveParams) -> bool {
    if !player.alive {
        player.is_moving = false;
        return false;
    }
    let dir = match player.input.active_direction() {
        Some(d) => d,
        None => {
            player.is_moving = false;
            return false;
        }
    };
    player.facing = dir;

    let step = player.stats.move_speed as f32 * params.speed_unit;
    let (ux, uy) = dir.unit();
    let (dx, dy) = (ux * step, uy * step);
    let (start_x, start_y) = (player.x, player.y);

    // X then Y, independently
    let mut blocked = false;
    if dx != 0.0 {
        blocked |= slide(player, grid, bombs, dx, 0.0);
    }
    if dy != 0.0 {
        blocked |= slide(player, grid, bombs, 0.0, dy);
    }

    if blocked && params.corner_assist > 0.0 {
        corner_assist(player, grid, bombs, dx, dy, step, params.corner_assist);
    }

    player.is_moving = player.x != start_x || player.y != start_y;
    player.is_moving
}

/// Longest sub-step `player` may take without skipping over a tile.
fn max_sub_step(player: &Player) -> f32 {
    player.hitbox_half.max(LANE_EPSILON)
}

/// Move by `(dx, dy)` in sub-steps no longer than the hitbox half-extent,
/// stopping at the first rejected one. Returns true if blocked.
fn slide(player: &mut Player, grid: &GridMap, bombs: &[Bomb], dx: f32, dy: f32) -> bool {
    let dist = dx.abs().max(dy.abs());
    let n = (dist / max_sub_step(player)).ceil().max(1.0) as u32;
    let (sx, sy) = (dx / n as f32, dy / n as f32);
    for _ in 0..n {
        if !can_occupy(player, grid, bombs, player.x + sx, player.y + sy) {
            return true;
        }
        player.x += sx;
        player.y += sy;
    }
    false
}

/// Slide toward the perpendicular lane centre if the lane is open ahead.
fn corner_assist(player: &mut Player, grid: &GridMap, bombs: &[Bomb], dx: f32, dy: f32, step: f32, reach: f32) {
    let horizontal = dx != 0.0;
    let (along, across) = if horizontal { (player.x, player.y) } else { (player.y, player.x) };
    let lane = across.round();
    let offset = across - lane;
    if offset.abs() <= LANE_EPSILON || offset.abs() > reach {
        return;
    }

    // Would the move succeed from the lane centre?
    let d = if horizontal { dx } else { dy };
    let ahead = along + d.signum() * d.abs().min(max_sub_step(player));
    let lane_open = if horizontal {
        can_occupy(player, grid, bombs, ahead, lane)
    } else {
        can_occupy(player, grid, bombs, lane, ahead)
    };
    if !lane_open {
        return;
    }

    let nudge = -offset.signum() * step.min(offset.abs());
    let (nx, ny) = if horizontal { (player.x, player.y + nudge) } else { (player.x + nudge, player.y) };
    if can_occupy(player, grid, bombs, nx, ny) {
        player.x = nx;
        player.y = ny;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ability::{AbilityState, Character, SkillSpec};
    use crate::domain::entity::{PlayerId, Stats};
    use crate::domain::input::Direction;
    use crate::domain::tile::Tile;

    fn params() -> MoveParams {
        MoveParams { speed_unit: 0.05, corner_assist: 0.0 }
    }

    fn grid_from(rows: &[&str]) -> GridMap {
        let tiles = rows
            .iter()
            .map(|r| {
                r.chars()
                    .map(|ch| match ch {
                        '#' => Tile::Wall,
                        'B' => Tile::Block,
                        _ => Tile::Empty,
                    })
                    .collect()
            })
            .collect();
        GridMap::from_rows(tiles, vec![]).unwrap()
    }

    fn open() -> GridMap {
        grid_from(&["#######", "#     #", "#     #", "#     #", "#######"])
    }

    fn player_at(row: usize, col: usize) -> Player {
        let stats = Stats { move_speed: 1, bomb_range: 1, max_bombs: 1, active_bombs: 0 };
        let spec = SkillSpec { magnitude: 2, duration_ticks: 10, cooldown_ticks: 10 };
        Player::new(PlayerId::One, TilePos::new(row, col), stats, 0.3, AbilityState::new(Character::Runner, spec))
    }

    fn walk(p: &mut Player, g: &GridMap, bombs: &[Bomb], dir: Direction, ticks: usize, mp: &MoveParams) {
        p.input.press(dir);
        for _ in 0..ticks {
            resolve_movement(p, g, bombs, mp);
        }
        p.input.release(dir);
    }

    // ── Basic motion ──

    #[test]
    fn moves_by_speed_times_unit() {
        let g = open();
        let mut p = player_at(1, 1);
        p.input.press(Direction::Right);
        assert!(resolve_movement(&mut p, &g, &[], &params()));
        assert!((p.x - 1.05).abs() < 1e-5);
        assert_eq!(p.y, 1.0);
        assert!(p.is_moving);
        assert_eq!(p.facing, Direction::Right);
    }

    #[test]
    fn no_direction_means_no_motion() {
        let g = open();
        let mut p = player_at(1, 1);
        p.is_moving = true;
        assert!(!resolve_movement(&mut p, &g, &[], &params()));
        assert!(!p.is_moving);
        assert_eq!((p.x, p.y), (1.0, 1.0));
    }

    #[test]
    fn dead_player_does_not_move() {
        let g = open();
        let mut p = player_at(1, 1);
        p.alive = false;
        p.input.press(Direction::Down);
        assert!(!resolve_movement(&mut p, &g, &[], &params()));
        assert_eq!((p.x, p.y), (1.0, 1.0));
    }

    #[test]
    fn wall_stops_hitbox_flush() {
        let g = open();
        let mut p = player_at(1, 1);
        walk(&mut p, &g, &[], Direction::Left, 30, &params());
        assert!(p.x < 1.0);
        assert!(p.x - 0.3 >= 0.5 - 1e-4, "hitbox entered the wall: x={}", p.x);
    }

    #[test]
    fn block_is_solid() {
        let g = grid_from(&["#######", "# B   #", "#     #", "#     #", "#######"]);
        let mut p = player_at(1, 1);
        walk(&mut p, &g, &[], Direction::Right, 30, &params());
        assert!(p.x + 0.3 <= 1.5 + 1e-4);
    }

    // ── Bombs ──

    #[test]
    fn foreign_bomb_blocks() {
        let g = open();
        let mut p = player_at(1, 1);
        let bombs = [Bomb::new(TilePos::new(1, 2), 1, 120, PlayerId::Two, 0)];
        walk(&mut p, &g, &bombs, Direction::Right, 20, &params());
        assert!(p.x + 0.3 <= 1.5 + 1e-4, "walked into a bomb: x={}", p.x);
    }

    #[test]
    fn can_walk_off_own_bomb_but_not_back() {
        let g = open();
        let mut p = player_at(1, 1);
        let bombs = [Bomb::new(TilePos::new(1, 1), 1, 120, PlayerId::One, 0)];
        walk(&mut p, &g, &bombs, Direction::Right, 20, &params());
        assert!(p.x > 1.9);
        walk(&mut p, &g, &bombs, Direction::Left, 20, &params());
        assert!(p.x - 0.3 >= 1.5 - 1e-4, "re-entered bomb: x={}", p.x);
    }

    // ── Corner assist ──

    #[test]
    fn corner_assist_slides_into_lane() {
        let g = grid_from(&["#####", "#   #", "# # #", "#   #", "#####"]);
        let mp = MoveParams { corner_assist: 0.35, ..params() };
        let mut p = player_at(1, 1);
        p.x = 1.25;
        walk(&mut p, &g, &[], Direction::Down, 40, &mp);
        assert!(p.y > 2.0, "stuck on pillar corner: ({}, {})", p.x, p.y);
        assert!(p.x <= 1.2 + 1e-4);
    }

    #[test]
    fn without_assist_corner_blocks() {
        let g = grid_from(&["#####", "#   #", "# # #", "#   #", "#####"]);
        let mut p = player_at(1, 1);
        p.x = 1.25;
        walk(&mut p, &g, &[], Direction::Down, 40, &params());
        assert!(p.y < 1.25);
        assert_eq!(p.x, 1.25);
    }

    // ── Fast movement ──

    fn fast_player_at(row: usize, col: usize, speed: u32) -> Player {
        let mut p = player_at(row, col);
        p.stats.move_speed = speed;
        p
    }

    #[test]
    fn fast_step_stops_flush_at_wall() {
        let g = grid_from(&["#######", "# #   #", "#     #", "#     #", "#######"]);
        let mp = MoveParams { speed_unit: 0.4, corner_assist: 0.0 };
        let mut p = fast_player_at(1, 1, 5);
        walk(&mut p, &g, &[], Direction::Right, 3, &mp);
        assert_eq!(p.tile(), TilePos::new(1, 1));
        assert!(p.x + 0.3 <= 1.5 + 1e-4, "crossed the wall: x={}", p.x);
    }

    #[test]
    fn boosted_runner_at_cap_stops_at_block_and_bomb() {
        let g = grid_from(&["#######", "# B   #", "#     #", "#     #", "#######"]);
        let mp = MoveParams { speed_unit: 0.09, corner_assist: 0.35 };
        let mut p = fast_player_at(1, 1, 5);
        assert!(p.ability.activate(&mut p.stats));
        assert_eq!(p.stats.move_speed, 10);
        walk(&mut p, &g, &[], Direction::Right, 10, &mp);
        assert_eq!(p.tile(), TilePos::new(1, 1));

        let bombs = [Bomb::new(TilePos::new(2, 3), 1, 120, PlayerId::Two, 0)];
        let mut p = fast_player_at(2, 1, 5);
        assert!(p.ability.activate(&mut p.stats));
        walk(&mut p, &g, &bombs, Direction::Right, 10, &mp);
        assert_eq!(p.tile(), TilePos::new(2, 2));
        assert!(p.x + 0.3 <= 2.5 + 1e-4, "walked into the bomb: x={}", p.x);
    }

    #[test]
    fn out_of_bounds_target_is_rejected() {
        let g = open();
        let p = player_at(1, 1);
        assert!(!can_occupy(&p, &g, &[], -0.6, 1.0));
        assert!(!can_occupy(&p, &g, &[], 1.0, 40.0));
    }
}
