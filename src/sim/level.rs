/// Arena loader.
///
/// ## Sources
///   1. Generated at match start (`[map]` rows/cols/block_density)
///   2. A map file named in config (`[map].file`)
///   3. `maps/` directory (individual `.txt` files), listed on the title screen
///   4. Built-in embedded arenas
///
/// ## Map format (`.txt`):
///   Optional first line: `# Arena Name`
///   Further `#` lines are comments; blank lines are ignored.
///   Rows: whitespace-separated integer codes, one row per line.
///
/// ## Code legend:
///   0 = Empty                    1 = Wall
///   2 = Block                    3 = Block hiding BombCountUp
///   4 = Block hiding RangeUp     5 = Block hiding SpeedUp
///   6 = Block hiding Shield      7 = Player 1 spawn
///   8 = Player 2 spawn
///
/// Missing spawns default to (1, 1) and (rows - 2, cols - 2).

use std::path::Path;

use rand::Rng;

use crate::config::Arena;
use crate::domain::entity::{ItemKind, PlayerId};
use crate::domain::grid::{GridMap, TilePos};
use crate::domain::tile::Tile;
use crate::error::MapLoadError;

/// A parsed, validated arena.
#[derive(Clone, Debug)]
pub struct MapDef {
    pub name: String,
    pub grid: GridMap,
    pub spawns: [TilePos; 2],
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Terrain and spawn tiles for a new round.
pub fn build_arena<R: Rng>(arena: &Arena, rng: &mut R) -> Result<(GridMap, [TilePos; 2]), MapLoadError> {
    match arena {
        Arena::Generated { rows, cols, block_density } => {
            let spawns = default_spawns(*rows, *cols);
            let grid = GridMap::generate(*rows, *cols, *block_density, &spawns, rng)?;
            Ok((grid, spawns))
        }
        Arena::Fixed(def) => Ok((def.grid.clone(), def.spawns)),
    }
}

pub fn load_map_file(path: &Path) -> Result<MapDef, MapLoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| MapLoadError::Io { path: path.to_path_buf(), source })?;
    let mut def = parse_map(&content)?;
    if def.name.is_empty() {
        def.name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
    }
    Ok(def)
}

/// Every readable `.txt` arena in `dir`, sorted by file name.
/// Broken files are skipped with a warning.
pub fn scan_maps(dir: &Path) -> Vec<MapDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return vec![],
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    let mut maps = vec![];
    for path in paths {
        match load_map_file(&path) {
            Ok(def) => maps.push(def),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }
    maps
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

pub fn parse_map(content: &str) -> Result<MapDef, MapLoadError> {
    let mut name = String::new();
    let mut tiles: Vec<Vec<Tile>> = vec![];
    let mut hidden: Vec<Vec<Option<ItemKind>>> = vec![];
    let mut spawns: [Option<TilePos>; 2] = [None, None];

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            if name.is_empty() && tiles.is_empty() && rest.chars().any(|c| c.is_alphabetic()) {
                name = rest.trim().to_string();
            }
            continue;
        }

        let row = tiles.len();
        let mut tile_row = vec![];
        let mut hidden_row = vec![];
        for (col, token) in trimmed.split_whitespace().enumerate() {
            let bad = || MapLoadError::BadCode { row, col, token: token.to_string() };
            let code: u8 = token.parse().map_err(|_| bad())?;
            let (tile, item) = match code {
                0 => (Tile::Empty, None),
                1 => (Tile::Wall, None),
                2 => (Tile::Block, None),
                3 => (Tile::Block, Some(ItemKind::BombCountUp)),
                4 => (Tile::Block, Some(ItemKind::RangeUp)),
                5 => (Tile::Block, Some(ItemKind::SpeedUp)),
                6 => (Tile::Block, Some(ItemKind::Shield)),
                7 | 8 => {
                    let player = if code == 7 { PlayerId::One } else { PlayerId::Two };
                    let slot = &mut spawns[player.index()];
                    if slot.is_some() {
                        return Err(MapLoadError::DuplicateSpawn { player: player.number() });
                    }
                    *slot = Some(TilePos::new(row, col));
                    (Tile::Empty, None)
                }
                _ => return Err(bad()),
            };
            tile_row.push(tile);
            hidden_row.push(item);
        }
        tiles.push(tile_row);
        hidden.push(hidden_row);
    }

    if tiles.is_empty() {
        return Err(MapLoadError::Empty);
    }

    let grid = GridMap::from_rows(tiles, hidden)?;
    let defaults = default_spawns(grid.rows(), grid.cols());
    let spawns = [spawns[0].unwrap_or(defaults[0]), spawns[1].unwrap_or(defaults[1])];

    for id in PlayerId::BOTH {
        let s = spawns[id.index()];
        if grid.cell_at(s) != Tile::Empty {
            return Err(MapLoadError::BlockedSpawn { player: id.number(), row: s.row, col: s.col });
        }
    }
    if spawns[0] == spawns[1] {
        return Err(MapLoadError::SharedSpawn);
    }

    Ok(MapDef { name, grid, spawns })
}

fn default_spawns(rows: usize, cols: usize) -> [TilePos; 2] {
    [TilePos::new(1, 1), TilePos::new(rows.saturating_sub(2), cols.saturating_sub(2))]
}

// ══════════════════════════════════════════════════════════════
// Embedded arenas
// ══════════════════════════════════════════════════════════════

pub fn embedded_maps() -> Vec<MapDef> {
    [CLASSIC, OPEN_FIELD, CROSSFIRE]
        .iter()
        .filter_map(|text| match parse_map(text) {
            Ok(def) => Some(def),
            Err(e) => {
                log::warn!("embedded arena rejected: {e}");
                None
            }
        })
        .collect()
}

const CLASSIC: &str = "\
# Classic
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
1 7 0 0 2 3 2 2 2 2 0 0 0 2 1
1 0 1 2 1 2 1 2 1 2 1 2 1 0 1
1 0 0 0 0 2 2 2 0 4 0 2 2 0 1
1 2 1 2 1 2 1 2 1 0 1 0 1 2 1
1 4 0 2 0 0 2 2 2 2 2 2 0 2 1
1 2 1 2 1 2 1 6 1 2 1 2 1 0 1
1 2 2 2 2 2 2 0 2 2 0 2 2 5 1
1 0 1 2 1 2 1 2 1 2 1 2 1 2 1
1 0 0 0 0 5 2 2 0 0 2 0 2 0 1
1 0 1 2 1 2 1 2 1 2 1 2 1 0 1
1 0 2 2 2 2 0 2 2 3 0 0 0 8 1
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
";

const OPEN_FIELD: &str = "\
# Open Field
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
1 7 0 0 0 0 2 0 2 0 0 2 0 0 1
1 0 0 2 0 0 0 0 2 2 2 0 0 0 1
1 0 0 0 0 2 2 0 0 0 2 2 2 2 1
1 0 2 0 1 0 2 0 1 0 2 0 1 0 1
1 2 0 2 0 0 2 2 2 0 2 2 0 0 1
1 0 0 0 2 0 2 6 0 2 0 0 2 2 1
1 0 0 2 0 0 2 0 2 0 0 0 0 2 1
1 0 0 0 1 0 0 0 1 0 2 0 1 0 1
1 0 2 0 0 2 0 2 0 2 0 0 0 0 1
1 0 2 0 0 2 0 0 0 0 0 0 0 0 1
1 2 0 2 2 0 2 0 0 0 2 0 0 8 1
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
";

const CROSSFIRE: &str = "\
# Crossfire
# Spawns face each other down the open middle row.
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
1 2 0 2 2 0 2 2 5 2 2 0 2 2 0 2 1
1 0 1 2 1 2 1 0 1 2 1 2 1 0 1 2 1
1 2 2 0 2 3 0 2 0 0 2 2 0 2 2 0 1
1 0 1 2 1 0 1 2 1 2 1 0 1 2 1 0 1
1 7 0 0 0 0 0 0 0 0 0 0 0 0 0 8 1
1 0 1 0 1 2 1 2 1 0 1 2 1 2 1 0 1
1 2 0 2 2 0 2 2 0 2 2 4 2 2 0 2 1
1 0 1 2 1 2 1 0 1 2 1 2 1 0 1 2 1
1 2 2 0 2 2 0 2 6 0 2 2 0 2 2 0 1
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
";

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SMALL: &str = "\
# Tiny
1 1 1 1 1
1 7 0 2 1
1 0 1 3 1
1 0 0 8 1
1 1 1 1 1
";

    #[test]
    fn parses_codes_spawns_and_hidden_items() {
        let def = parse_map(SMALL).unwrap();
        assert_eq!(def.name, "Tiny");
        assert_eq!(def.spawns, [TilePos::new(1, 1), TilePos::new(3, 3)]);
        assert_eq!(def.grid.cell_at(TilePos::new(1, 3)), Tile::Block);
        assert_eq!(def.grid.cell_at(TilePos::new(2, 3)), Tile::Block);
        assert_eq!(def.grid.hidden_item(TilePos::new(2, 3)), Some(ItemKind::BombCountUp));
        assert_eq!(def.grid.cell_at(TilePos::new(1, 1)), Tile::Empty);
    }

    #[test]
    fn missing_spawns_use_corners() {
        let def = parse_map("1 1 1 1 1\n1 0 0 0 1\n1 0 0 0 1\n1 0 0 0 1\n1 1 1 1 1\n").unwrap();
        assert_eq!(def.spawns, [TilePos::new(1, 1), TilePos::new(3, 3)]);
        assert!(def.name.is_empty());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = format!("# Named\n\n# just a note\n{SMALL}");
        let def = parse_map(&text).unwrap();
        assert_eq!(def.name, "Named");
        assert_eq!(def.grid.rows(), 5);
    }

    #[test]
    fn ragged_rows_fail() {
        let err = parse_map("1 1 1 1 1\n1 0 0 0 1\n1 0 0 1\n1 0 0 0 1\n1 1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::Ragged { row: 2, found: 4, expected: 5 }));
    }

    #[test]
    fn unknown_code_fails() {
        let err = parse_map("1 1 1 1 1\n1 0 9 0 1\n1 0 0 0 1\n1 0 0 0 1\n1 1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::BadCode { row: 1, col: 2, .. }));
        let err = parse_map("1 1 1 1 1\n1 0 x 0 1\n1 0 0 0 1\n1 0 0 0 1\n1 1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::BadCode { .. }));
    }

    #[test]
    fn undersized_map_fails() {
        let err = parse_map("1 1 1 1\n1 0 0 1\n1 0 0 1\n1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::TooSmall { .. }));
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(parse_map("# only a comment\n\n"), Err(MapLoadError::Empty)));
    }

    #[test]
    fn open_border_fails() {
        let err = parse_map("1 1 1 1 1\n0 0 0 0 1\n1 0 0 0 1\n1 0 0 0 1\n1 1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::OpenBorder { row: 1, col: 0 }));
    }

    #[test]
    fn duplicate_spawn_fails() {
        let err = parse_map("1 1 1 1 1\n1 7 0 7 1\n1 0 0 0 1\n1 0 0 8 1\n1 1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::DuplicateSpawn { player: 1 }));
    }

    #[test]
    fn default_spawn_on_block_fails() {
        let err = parse_map("1 1 1 1 1\n1 2 0 0 1\n1 0 0 0 1\n1 0 0 8 1\n1 1 1 1 1\n").unwrap_err();
        assert!(matches!(err, MapLoadError::BlockedSpawn { player: 1, row: 1, col: 1 }));
    }

    #[test]
    fn embedded_arenas_are_valid() {
        let maps = embedded_maps();
        assert_eq!(maps.len(), 3);
        for m in &maps {
            assert!(!m.name.is_empty());
        }
    }

    #[test]
    fn generated_arena_uses_corner_spawns() {
        let arena = Arena::Generated { rows: 11, cols: 13, block_density: 0.5 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (grid, spawns) = build_arena(&arena, &mut rng).unwrap();
        assert_eq!(spawns, [TilePos::new(1, 1), TilePos::new(9, 11)]);
        assert_eq!(grid.cell_at(spawns[1]), Tile::Empty);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_map_file(Path::new("/nonexistent/arena.txt")).unwrap_err();
        assert!(matches!(err, MapLoadError::Io { .. }));
    }

    #[test]
    fn bundled_duel_map_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("maps/duel.txt");
        let def = load_map_file(&path).unwrap();
        assert_eq!(def.name, "Duel");
        assert_eq!((def.grid.rows(), def.grid.cols()), (9, 13));
        assert_eq!(def.spawns, [TilePos::new(1, 1), TilePos::new(7, 11)]);
        assert_eq!(def.grid.hidden_item(TilePos::new(3, 3)), Some(ItemKind::Shield));
    }
}

