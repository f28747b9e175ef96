/// Entities: Player, Bomb, Explosion, Item.
///
/// Each is an independent struct with its own timers. They share only the
/// `Tickable` capability; there is no common base type.

use rand::Rng;
use serde::Serialize;

use super::ability::{AbilityState, StatDelta};
use super::grid::TilePos;
use super::hit::{self, Aabb};
use super::input::{Direction, InputDirectionQueue};

/// Anything advanced once per simulation tick.
pub trait Tickable {
    /// Advance one tick. Returns true on the tick a timed phase ends:
    /// fuse burnt out, lifetime over, skill expired.
    fn tick(&mut self) -> bool;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const BOTH: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn other(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

/// Stat block. `active_bombs` is bookkeeping, the rest are tunable.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Stats {
    pub move_speed: u32,
    pub bomb_range: u32,
    pub max_bombs: u32,
    pub active_bombs: u32,
}

impl Stats {
    pub fn apply(&mut self, delta: StatDelta) {
        self.move_speed += delta.move_speed;
        self.bomb_range += delta.bomb_range;
        self.max_bombs += delta.max_bombs;
    }

    /// Exact inverse of `apply`.
    ///
    /// # Panics
    /// If a stat would go negative, which means the delta was never applied.
    pub fn revert(&mut self, delta: StatDelta) {
        assert!(
            self.move_speed >= delta.move_speed
                && self.bomb_range >= delta.bomb_range
                && self.max_bombs >= delta.max_bombs,
            "reverting a stat delta that was never applied: {self:?} - {delta:?}"
        );
        self.move_speed -= delta.move_speed;
        self.bomb_range -= delta.bomb_range;
        self.max_bombs -= delta.max_bombs;
    }

    pub fn has_bomb_available(&self) -> bool {
        self.active_bombs < self.max_bombs
    }
}

/// Upper bounds for permanent item upgrades.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StatCaps {
    pub move_speed: u32,
    pub bomb_range: u32,
    pub max_bombs: u32,
}

/// Outcome of an explosion touching a player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HitResult {
    /// Still in post-shield grace; nothing happened.
    Ignored,
    ShieldBroken,
    Killed,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    /// World position: `x` = column, `y` = row, tile centres on integers.
    pub x: f32,
    pub y: f32,
    pub spawn: TilePos,
    pub alive: bool,
    pub stats: Stats,
    pub input: InputDirectionQueue,
    pub ability: AbilityState,
    pub shield: bool,
    /// Ticks of invulnerability left after a shield breaks.
    pub grace_ticks: u32,
    pub hitbox_half: f32,
    // ── Presentation hints ──
    pub facing: Direction,
    pub is_moving: bool,
}

impl Player {
    pub fn new(id: PlayerId, spawn: TilePos, stats: Stats, hitbox_half: f32, ability: AbilityState) -> Self {
        Player {
            id,
            x: spawn.col as f32,
            y: spawn.row as f32,
            spawn,
            alive: true,
            stats,
            input: InputDirectionQueue::new(),
            ability,
            shield: false,
            grace_ticks: 0,
            hitbox_half,
            facing: Direction::Down,
            is_moving: false,
        }
    }

    /// Tile the player is standing on (rounded position).
    pub fn tile(&self) -> TilePos {
        hit::tile_of(self.x, self.y).unwrap_or(self.spawn)
    }

    pub fn hitbox(&self) -> Aabb {
        self.hitbox_at(self.x, self.y)
    }

    pub fn hitbox_at(&self, x: f32, y: f32) -> Aabb {
        Aabb::centered(x, y, self.hitbox_half)
    }

    /// Stats without the currently applied skill modifier.
    pub fn base_stats(&self) -> Stats {
        let mut base = self.stats;
        base.revert(self.ability.applied());
        base
    }

    /// Apply an item's permanent effect. Returns false if it changed nothing
    /// (already at the cap); the item is consumed either way.
    pub fn apply_item(&mut self, kind: ItemKind, caps: &StatCaps) -> bool {
        let base = self.base_stats();
        match kind {
            ItemKind::BombCountUp if base.max_bombs < caps.max_bombs => {
                self.stats.max_bombs += 1;
                true
            }
            ItemKind::RangeUp if base.bomb_range < caps.bomb_range => {
                self.stats.bomb_range += 1;
                true
            }
            ItemKind::SpeedUp if base.move_speed < caps.move_speed => {
                self.stats.move_speed += 1;
                true
            }
            ItemKind::Shield if !self.shield => {
                self.shield = true;
                true
            }
            _ => false,
        }
    }

    /// Resolve one explosion hit for this tick.
    pub fn take_hit(&mut self, shield_grace: u32) -> HitResult {
        if !self.alive || self.grace_ticks > 0 {
            return HitResult::Ignored;
        }
        if self.shield {
            self.shield = false;
            self.grace_ticks = shield_grace;
            return HitResult::ShieldBroken;
        }
        self.alive = false;
        self.is_moving = false;
        self.input.clear();
        HitResult::Killed
    }
}

impl Tickable for Player {
    fn tick(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        if self.grace_ticks > 0 {
            self.grace_ticks -= 1;
        }
        self.ability.tick(&mut self.stats)
    }
}

// ══════════════════════════════════════════════════════════════
// Bomb
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Bomb {
    pub pos: TilePos,
    pub range: u32,
    pub fuse: u32,
    /// Only used to give the bomb back to its owner on detonation.
    pub owner: PlayerId,
    pub placed_tick: u64,
    /// Set off by another blast rather than its own fuse.
    pub chained: bool,
}

impl Bomb {
    pub fn new(pos: TilePos, range: u32, fuse: u32, owner: PlayerId, tick: u64) -> Self {
        Bomb { pos, range, fuse, owner, placed_tick: tick, chained: false }
    }

    /// Caught in a blast: detonate at the next opportunity.
    pub fn ignite(&mut self) {
        if self.fuse > 0 {
            self.chained = true;
        }
        self.fuse = 0;
    }

    pub fn is_due(&self) -> bool {
        self.fuse == 0
    }

    pub fn hitbox(&self) -> Aabb {
        Aabb::tile(self.pos)
    }
}

impl Tickable for Bomb {
    fn tick(&mut self) -> bool {
        self.fuse = self.fuse.saturating_sub(1);
        self.is_due()
    }
}

// ══════════════════════════════════════════════════════════════
// Explosion
// ══════════════════════════════════════════════════════════════

/// Which arm of a blast a tile belongs to. Presentation only.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum BlastPart {
    Center,
    Arm(Direction),
}

#[derive(Clone, Debug)]
pub struct Explosion {
    pub pos: TilePos,
    pub part: BlastPart,
    pub remaining: u32,
    pub spawned_tick: u64,
}

impl Explosion {
    pub fn new(pos: TilePos, part: BlastPart, lifetime: u32, tick: u64) -> Self {
        Explosion { pos, part, remaining: lifetime, spawned_tick: tick }
    }

    pub fn is_alive(&self) -> bool {
        self.remaining > 0
    }

    pub fn hitbox(&self) -> Aabb {
        Aabb::tile(self.pos)
    }
}

impl Tickable for Explosion {
    fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        !self.is_alive()
    }
}

// ══════════════════════════════════════════════════════════════
// Item
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum ItemKind {
    BombCountUp,
    RangeUp,
    SpeedUp,
    Shield,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [ItemKind::BombCountUp, ItemKind::RangeUp, ItemKind::SpeedUp, ItemKind::Shield];
}

/// Relative drop weights per kind. All-zero means blocks never drop anything.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ItemWeights {
    pub bomb_count_up: u32,
    pub range_up: u32,
    pub speed_up: u32,
    pub shield: u32,
}

impl ItemWeights {
    fn weight(&self, kind: ItemKind) -> u32 {
        match kind {
            ItemKind::BombCountUp => self.bomb_count_up,
            ItemKind::RangeUp => self.range_up,
            ItemKind::SpeedUp => self.speed_up,
            ItemKind::Shield => self.shield,
        }
    }

    pub fn total(&self) -> u32 {
        ItemKind::ALL.iter().map(|k| self.weight(*k)).sum()
    }

    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<ItemKind> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let mut roll = rng.gen_range(0..total);
        for kind in ItemKind::ALL {
            let w = self.weight(kind);
            if roll < w {
                return Some(kind);
            }
            roll -= w;
        }
        None
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    pub pos: TilePos,
    pub kind: ItemKind,
    pub remaining: u32,
    pub collected: bool,
    pub spawned_tick: u64,
}

impl Item {
    pub fn new(pos: TilePos, kind: ItemKind, lifetime: u32, tick: u64) -> Self {
        Item { pos, kind, remaining: lifetime, collected: false, spawned_tick: tick }
    }

    pub fn is_available(&self) -> bool {
        !self.collected && self.remaining > 0
    }
}

impl Tickable for Item {
    fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ability::{Character, SkillSpec};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn stats() -> Stats {
        Stats { move_speed: 1, bomb_range: 1, max_bombs: 1, active_bombs: 0 }
    }

    fn caps() -> StatCaps {
        StatCaps { move_speed: 3, bomb_range: 4, max_bombs: 4 }
    }

    fn player() -> Player {
        let spec = SkillSpec { magnitude: 2, duration_ticks: 10, cooldown_ticks: 20 };
        Player::new(PlayerId::One, TilePos::new(1, 1), stats(), 0.3, AbilityState::new(Character::Runner, spec))
    }

    #[test]
    fn bomb_fuse_counts_down_to_due() {
        let mut b = Bomb::new(TilePos::new(1, 1), 2, 3, PlayerId::One, 0);
        assert!(!b.tick());
        assert!(!b.tick());
        assert!(b.tick());
        assert!(b.is_due());
        // Stays due, never underflows
        assert!(b.tick());
        assert_eq!(b.fuse, 0);
    }

    #[test]
    fn ignite_makes_bomb_due_immediately() {
        let mut b = Bomb::new(TilePos::new(1, 1), 2, 120, PlayerId::Two, 0);
        b.ignite();
        assert!(b.is_due());
        assert!(b.chained);
    }

    #[test]
    fn explosion_lifecycle() {
        let mut e = Explosion::new(TilePos::new(2, 2), BlastPart::Center, 2, 0);
        assert!(e.is_alive());
        assert!(!e.tick());
        assert!(e.tick());
        assert!(!e.is_alive());
    }

    #[test]
    fn speed_item_respects_cap() {
        let mut p = player();
        let c = caps();
        assert!(p.apply_item(ItemKind::SpeedUp, &c));
        assert!(p.apply_item(ItemKind::SpeedUp, &c));
        assert!(!p.apply_item(ItemKind::SpeedUp, &c));
        assert_eq!(p.stats.move_speed, 3);
    }

    #[test]
    fn count_and_range_items_increment() {
        let mut p = player();
        p.apply_item(ItemKind::BombCountUp, &caps());
        p.apply_item(ItemKind::RangeUp, &caps());
        assert_eq!(p.stats.max_bombs, 2);
        assert_eq!(p.stats.bomb_range, 2);
    }

    #[test]
    fn speed_cap_ignores_active_boost() {
        let mut p = player();
        assert!(p.ability.activate(&mut p.stats));
        // Runner doubled speed 1 → 2; base is still 1
        assert_eq!(p.stats.move_speed, 2);
        assert!(p.apply_item(ItemKind::SpeedUp, &caps()));
        assert_eq!(p.base_stats().move_speed, 2);
    }

    #[test]
    fn shield_absorbs_one_hit_then_grace_then_lethal() {
        let mut p = player();
        p.apply_item(ItemKind::Shield, &caps());
        assert_eq!(p.take_hit(2), HitResult::ShieldBroken);
        assert!(p.alive);
        assert!(!p.shield);
        assert_eq!(p.take_hit(2), HitResult::Ignored);
        p.tick();
        p.tick();
        assert_eq!(p.take_hit(2), HitResult::Killed);
        assert!(!p.alive);
    }

    #[test]
    fn item_weights_pick_only_weighted_kinds() {
        let w = ItemWeights { bomb_count_up: 0, range_up: 0, speed_up: 5, shield: 0 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(w.pick(&mut rng), Some(ItemKind::SpeedUp));
        }
        let none = ItemWeights { bomb_count_up: 0, range_up: 0, speed_up: 0, shield: 0 };
        assert_eq!(none.pick(&mut rng), None);
    }

    #[test]
    fn player_tile_rounds_position() {
        let mut p = player();
        p.x = 2.45;
        p.y = 0.55;
        assert_eq!(p.tile(), TilePos::new(1, 2));
    }
}
