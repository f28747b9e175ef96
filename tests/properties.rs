//! Property tests for the simulation core.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use blastarena::config::SimConfig;
use blastarena::domain::ability::{AbilityState, Character, SkillSpec};
use blastarena::domain::blast::{propagate, BlastParams, BlockPolicy};
use blastarena::domain::entity::{Bomb, ItemWeights, Player, PlayerId, Stats};
use blastarena::domain::grid::{GridMap, TilePos};
use blastarena::domain::input::{Action, ActionEvent, Direction, InputDirectionQueue};
use blastarena::domain::movement::{resolve_movement, MoveParams};
use blastarena::domain::tile::Tile;
use blastarena::sim::world::Match;

const ROWS: usize = 9;
const COLS: usize = 11;

fn tile_from(code: u8) -> Tile {
    match code {
        1 => Tile::Wall,
        2 => Tile::Block,
        _ => Tile::Empty,
    }
}

/// Walled grid with an arbitrary interior. The centre tile is forced Empty.
fn build_grid(interior: &[u8], center: TilePos) -> GridMap {
    let mut rows = vec![vec![Tile::Wall; COLS]; ROWS];
    for r in 1..ROWS - 1 {
        for c in 1..COLS - 1 {
            rows[r][c] = tile_from(interior[(r - 1) * (COLS - 2) + (c - 1)]);
        }
    }
    rows[center.row][center.col] = Tile::Empty;
    GridMap::from_rows(rows, vec![]).unwrap()
}

fn params() -> BlastParams {
    BlastParams {
        policy: BlockPolicy::Stop,
        drop_chance: 0.0,
        weights: ItemWeights { bomb_count_up: 1, range_up: 1, speed_up: 1, shield: 1 },
        explosion_ticks: 30,
        item_ticks: 600,
    }
}

/// Cells an arm reaches: stops before the first Wall, on the first Block.
fn expected_cells(grid: &GridMap, center: TilePos, range: u32) -> HashSet<TilePos> {
    let mut cells = HashSet::from([center]);
    for dir in Direction::ALL {
        for step in 1..=range as usize {
            let Some(pos) = center.offset(dir, step) else { break };
            if !grid.in_bounds(pos) { break; }
            match grid.cell_at(pos) {
                Tile::Wall => break,
                Tile::Block => {
                    cells.insert(pos);
                    break;
                }
                Tile::Empty => {
                    cells.insert(pos);
                }
            }
        }
    }
    cells
}

proptest! {
    #[test]
    fn explosions_stop_at_first_wall_and_first_block(
        interior in prop::collection::vec(0u8..3, (ROWS - 2) * (COLS - 2)),
        row in 1usize..ROWS - 1,
        col in 1usize..COLS - 1,
        range in 0u32..8,
    ) {
        let center = TilePos::new(row, col);
        let mut grid = build_grid(&interior, center);
        let before = grid.clone();
        let expected = expected_cells(&before, center, range);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = propagate(&mut grid, center, range, &params(), 0, &mut rng);

        let got: HashSet<TilePos> = result.explosions.iter().map(|e| e.pos).collect();
        prop_assert_eq!(got.len(), result.explosions.len(), "duplicate explosion cell");
        prop_assert_eq!(&got, &expected);
        for pos in &result.destroyed {
            prop_assert_eq!(before.cell_at(*pos), Tile::Block);
            prop_assert_eq!(grid.cell_at(*pos), Tile::Empty);
        }
        prop_assert_eq!(grid.count(Tile::Wall), before.count(Tile::Wall));
    }

    #[test]
    fn direction_queue_reports_earliest_held(
        ops in prop::collection::vec((0usize..4, any::<bool>()), 0..64),
    ) {
        let mut q = InputDirectionQueue::new();
        let mut model: Vec<Direction> = Vec::new();
        for (d, pressed) in ops {
            let dir = Direction::ALL[d];
            if pressed {
                q.press(dir);
                if !model.contains(&dir) { model.push(dir); }
            } else {
                q.release(dir);
                model.retain(|m| *m != dir);
            }
            prop_assert_eq!(q.active_direction(), model.first().copied());
        }
    }

    #[test]
    fn active_bombs_match_bombs_on_the_field(
        script in prop::collection::vec((0usize..2, 0usize..6, any::<bool>()), 1..240),
    ) {
        let mut cfg = SimConfig::default();
        cfg.seed = Some(7);
        cfg.bomb_fuse_ticks = 25;
        cfg.characters = [Character::Bomber, Character::Bomber];
        cfg.skills.bomber = SkillSpec { magnitude: 2, duration_ticks: 15, cooldown_ticks: 5 };
        let mut m = Match::new(cfg).unwrap();

        for (p, a, pressed) in script {
            let ev = ActionEvent { player: PlayerId::BOTH[p], action: Action::ALL[a], pressed };
            m.step(&[ev]);
            for id in PlayerId::BOTH {
                let stats = m.player(id).stats;
                let owned = m.bombs.iter().filter(|b| b.owner == id).count() as u32;
                prop_assert_eq!(stats.active_bombs, owned);
                prop_assert!(stats.active_bombs <= stats.max_bombs);
            }
        }
    }

    #[test]
    fn ability_cycles_restore_stats(
        character in prop::sample::select(Character::ALL.to_vec()),
        speed in 1u32..5,
        range in 1u32..8,
        bombs in 1u32..8,
        magnitude in 1u32..4,
        duration in 1u32..20,
        cooldown in 0u32..20,
        cycles in 1usize..6,
    ) {
        let start = Stats { move_speed: speed, bomb_range: range, max_bombs: bombs, active_bombs: 0 };
        let mut stats = start;
        let spec = SkillSpec { magnitude, duration_ticks: duration, cooldown_ticks: cooldown };
        let mut ability = AbilityState::new(character, spec);

        for _ in 0..cycles {
            prop_assert!(ability.activate(&mut stats));
            prop_assert!(!ability.activate(&mut stats));
            let mut expired = false;
            for _ in 0..duration + cooldown + 1 {
                expired |= ability.tick(&mut stats);
            }
            prop_assert!(expired);
            prop_assert_eq!(stats, start);
            prop_assert!(ability.can_activate());
        }
    }

    #[test]
    fn fastest_valid_player_never_enters_solid_or_foreign_bomb_tiles(
        interior in prop::collection::vec(0u8..3, (ROWS - 2) * (COLS - 2)),
        speed_unit in 0.01f32..0.49,
        cap in 1u32..12,
        magnitude in 1u32..5,
        hitbox_half in 0.05f32..0.49,
        corner_assist in 0.0f32..0.5,
        bomb_at in (1usize..ROWS - 1, 1usize..COLS - 1),
        moves in prop::collection::vec((0usize..4, 1usize..12), 1..24),
    ) {
        let mut cfg = SimConfig::default();
        cfg.speed_unit = speed_unit;
        cfg.hitbox_half = hitbox_half;
        cfg.corner_assist = corner_assist;
        cfg.caps.move_speed = cap;
        cfg.start_stats.move_speed = cap;
        cfg.skills.runner.magnitude = magnitude;
        prop_assume!(cfg.validate().is_ok());

        let center = TilePos::new(ROWS / 2, COLS / 2);
        let grid = build_grid(&interior, center);
        let bomb_pos = TilePos::new(bomb_at.0, bomb_at.1);
        let bombs: Vec<Bomb> = if bomb_pos != center && grid.cell_at(bomb_pos) == Tile::Empty {
            vec![Bomb::new(bomb_pos, 1, 120, PlayerId::Two, 0)]
        } else {
            vec![]
        };

        let ability = AbilityState::new(Character::Runner, cfg.skills.runner);
        let mut p = Player::new(PlayerId::One, center, cfg.start_stats, hitbox_half, ability);
        prop_assert!(p.ability.activate(&mut p.stats));
        let params = MoveParams { speed_unit, corner_assist };

        for (d, ticks) in moves {
            let dir = Direction::ALL[d];
            p.input.press(dir);
            for _ in 0..ticks {
                resolve_movement(&mut p, &grid, &bombs, &params);
                let tile = p.tile();
                prop_assert_eq!(grid.cell_at(tile), Tile::Empty, "player on solid tile {:?}", tile);
                prop_assert!(bombs.iter().all(|b| b.pos != tile), "player on foreign bomb {:?}", tile);
            }
            p.input.release(dir);
        }
    }
}
