/// Read-only view of a match for presentation.
///
/// Owned plain data, so a renderer (or a JSON dump for debugging) can hold
/// it without borrowing the match.

use serde::Serialize;

use crate::domain::ability::{AbilityPhase, Character};
use crate::domain::entity::{BlastPart, ItemKind, PlayerId, Stats};
use crate::domain::grid::TilePos;
use crate::domain::input::Direction;
use crate::domain::tile::Tile;

use super::world::{Match, Outcome};

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub round: u32,
    pub rows: usize,
    pub cols: usize,
    /// Row-major.
    pub cells: Vec<Tile>,
    pub players: Vec<PlayerView>,
    pub bombs: Vec<BombView>,
    pub explosions: Vec<ExplosionView>,
    pub items: Vec<ItemView>,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub tile: TilePos,
    pub alive: bool,
    pub facing: Direction,
    pub is_moving: bool,
    pub shield: bool,
    pub invulnerable: bool,
    pub stats: Stats,
    pub character: Character,
    pub skill_phase: AbilityPhase,
    pub skill_remaining: u32,
    pub skill_cooldown: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct BombView {
    pub pos: TilePos,
    pub owner: PlayerId,
    pub fuse: u32,
    pub range: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExplosionView {
    pub pos: TilePos,
    pub part: BlastPart,
    pub remaining: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemView {
    pub pos: TilePos,
    pub kind: ItemKind,
    pub remaining: u32,
}

impl Snapshot {
    pub fn capture(m: &Match) -> Self {
        Snapshot {
            tick: m.tick,
            round: m.round,
            rows: m.grid.rows(),
            cols: m.grid.cols(),
            cells: m.grid.tiles().to_vec(),
            players: m
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    x: p.x,
                    y: p.y,
                    tile: p.tile(),
                    alive: p.alive,
                    facing: p.facing,
                    is_moving: p.is_moving,
                    shield: p.shield,
                    invulnerable: p.grace_ticks > 0,
                    stats: p.stats,
                    character: p.ability.character,
                    skill_phase: p.ability.phase,
                    skill_remaining: p.ability.duration_remaining,
                    skill_cooldown: p.ability.cooldown_remaining,
                })
                .collect(),
            bombs: m
                .bombs
                .iter()
                .map(|b| BombView { pos: b.pos, owner: b.owner, fuse: b.fuse, range: b.range })
                .collect(),
            explosions: m
                .explosions
                .iter()
                .filter(|e| e.is_alive())
                .map(|e| ExplosionView { pos: e.pos, part: e.part, remaining: e.remaining })
                .collect(),
            items: m
                .items
                .iter()
                .filter(|i| i.is_available())
                .map(|i| ItemView { pos: i.pos, kind: i.kind, remaining: i.remaining })
                .collect(),
            outcome: m.outcome,
        }
    }

    pub fn cell(&self, pos: TilePos) -> Tile {
        if pos.row < self.rows && pos.col < self.cols {
            self.cells[pos.row * self.cols + pos.col]
        } else {
            Tile::Wall
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::domain::entity::PlayerId;
    use crate::domain::grid::TilePos;
    use crate::domain::tile::Tile;
    use crate::sim::world::Match;

    #[test]
    fn snapshot_mirrors_match() {
        let mut cfg = SimConfig::default();
        cfg.seed = Some(1);
        let m = Match::new(cfg).unwrap();
        let s = m.snapshot();
        assert_eq!(s.rows, 13);
        assert_eq!(s.cols, 15);
        assert_eq!(s.cells.len(), 13 * 15);
        assert_eq!(s.cell(TilePos::new(0, 0)), Tile::Wall);
        assert_eq!(s.cell(TilePos::new(50, 0)), Tile::Wall);
        let p2 = s.player(PlayerId::Two).unwrap();
        assert_eq!(p2.tile, TilePos::new(11, 13));
        assert!(p2.alive);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut cfg = SimConfig::default();
        cfg.seed = Some(2);
        let m = Match::new(cfg).unwrap();
        let json = serde_json::to_string(&m.snapshot()).unwrap();
        assert!(json.contains("\"outcome\":\"Ongoing\""));
        assert!(json.contains("\"facing\""));
    }
}
