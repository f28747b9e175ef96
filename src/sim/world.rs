/// Match: the complete state of one round.
///
/// ## Ownership
///
/// The match owns everything the step mutates: the grid, both players and
/// the bomb, explosion and item lists. Lists are kept in creation order, which
/// is also the order the step processes them in.
///
/// ## Determinism
///
/// All randomness comes from one `ChaCha8Rng` seeded at construction. The
/// same config, seed and action sequence always produce the same match.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::SimConfig;
use crate::domain::ability::AbilityState;
use crate::domain::blast::BlastParams;
use crate::domain::entity::{Bomb, Explosion, Item, Player, PlayerId};
use crate::domain::grid::{GridMap, TilePos};
use crate::domain::input::ActionEvent;
use crate::domain::movement::MoveParams;
use crate::error::ConfigError;

use super::event::GameEvent;
use super::level;
use super::snapshot::Snapshot;
use super::step;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Outcome {
    Ongoing,
    Player1Wins,
    Player2Wins,
    Draw,
}

impl Outcome {
    pub fn is_over(self) -> bool {
        self != Outcome::Ongoing
    }

    pub fn winner(self) -> Option<PlayerId> {
        match self {
            Outcome::Player1Wins => Some(PlayerId::One),
            Outcome::Player2Wins => Some(PlayerId::Two),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Match {
    pub config: SimConfig,
    pub grid: GridMap,
    pub players: [Player; 2],
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<Explosion>,
    pub items: Vec<Item>,
    pub tick: u64,
    pub outcome: Outcome,
    /// Round number, starting at 1. Bumped by `restart`.
    pub round: u32,
    pub(crate) rng: ChaCha8Rng,
    seed: u64,
}

impl Match {
    /// Validate `config` and set up round 1.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (grid, spawns) = level::build_arena(&config.arena, &mut rng)?;
        let players = spawn_players(&config, spawns);
        log::info!("match start: {}x{} arena, seed {seed}", grid.rows(), grid.cols());

        Ok(Match {
            config,
            grid,
            players,
            bombs: vec![],
            explosions: vec![],
            items: vec![],
            tick: 0,
            outcome: Outcome::Ongoing,
            round: 1,
            rng,
            seed,
        })
    }

    /// Start the next round with fresh terrain and players. The RNG keeps
    /// running, so generated arenas differ between rounds.
    pub fn restart(&mut self) -> Result<(), ConfigError> {
        let (grid, spawns) = level::build_arena(&self.config.arena, &mut self.rng)?;
        self.grid = grid;
        self.players = spawn_players(&self.config, spawns);
        self.bombs.clear();
        self.explosions.clear();
        self.items.clear();
        self.tick = 0;
        self.outcome = Outcome::Ongoing;
        self.round += 1;
        log::info!("round {} start", self.round);
        Ok(())
    }

    /// Advance one tick.
    pub fn step(&mut self, actions: &[ActionEvent]) -> Vec<GameEvent> {
        step::step(self, actions)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.index()]
    }

    pub fn bomb_at(&self, pos: TilePos) -> bool {
        self.bombs.iter().any(|b| b.pos == pos)
    }

    pub fn move_params(&self) -> MoveParams {
        MoveParams { speed_unit: self.config.speed_unit, corner_assist: self.config.corner_assist }
    }

    pub fn blast_params(&self) -> BlastParams {
        BlastParams {
            policy: self.config.block_policy,
            drop_chance: self.config.item_drop_chance,
            weights: self.config.item_weights,
            explosion_ticks: self.config.explosion_ticks,
            item_ticks: self.config.item_ticks,
        }
    }

    /// Outcome implied by who is alive right now.
    pub fn current_outcome(&self) -> Outcome {
        match (self.players[0].alive, self.players[1].alive) {
            (true, true) => Outcome::Ongoing,
            (true, false) => Outcome::Player1Wins,
            (false, true) => Outcome::Player2Wins,
            (false, false) => Outcome::Draw,
        }
    }
}

fn spawn_players(config: &SimConfig, spawns: [TilePos; 2]) -> [Player; 2] {
    PlayerId::BOTH.map(|id| {
        let character = config.characters[id.index()];
        let ability = AbilityState::new(character, config.skills.get(character));
        Player::new(id, spawns[id.index()], config.start_stats, config.hitbox_half, ability)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Arena;

    fn config() -> SimConfig {
        let mut c = SimConfig::default();
        c.seed = Some(42);
        c
    }

    #[test]
    fn new_match_places_players_on_spawns() {
        let m = Match::new(config()).unwrap();
        assert_eq!(m.player(PlayerId::One).tile(), TilePos::new(1, 1));
        assert_eq!(m.player(PlayerId::Two).tile(), TilePos::new(11, 13));
        assert_eq!(m.outcome, Outcome::Ongoing);
        assert_eq!(m.round, 1);
    }

    #[test]
    fn same_seed_same_arena() {
        let a = Match::new(config()).unwrap();
        let b = Match::new(config()).unwrap();
        assert_eq!(a.grid.tiles(), b.grid.tiles());
        assert_eq!(a.seed(), 42);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut c = config();
        c.tick_rate_hz = 0;
        assert!(Match::new(c).is_err());
    }

    #[test]
    fn restart_resets_round_state() {
        let mut m = Match::new(config()).unwrap();
        m.players[0].alive = false;
        m.outcome = Outcome::Player2Wins;
        m.tick = 500;
        m.restart().unwrap();
        assert!(m.players[0].alive);
        assert_eq!(m.tick, 0);
        assert_eq!(m.round, 2);
        assert_eq!(m.outcome, Outcome::Ongoing);
    }

    #[test]
    fn fixed_arena_is_reused_on_restart() {
        let def = level::embedded_maps().remove(0);
        let tiles = def.grid.tiles().to_vec();
        let mut m = Match::new(config().with_arena(Arena::Fixed(def))).unwrap();
        m.restart().unwrap();
        assert_eq!(m.grid.tiles(), &tiles[..]);
    }

    #[test]
    fn outcome_follows_alive_flags() {
        let mut m = Match::new(config()).unwrap();
        m.players[1].alive = false;
        assert_eq!(m.current_outcome(), Outcome::Player1Wins);
        m.players[0].alive = false;
        assert_eq!(m.current_outcome(), Outcome::Draw);
        assert_eq!(Outcome::Player2Wins.winner(), Some(PlayerId::Two));
    }
}
