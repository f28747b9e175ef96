/// The step function: advances a match by one tick.
///
/// Processing order:
///   1. Action events (direction queues, bomb/skill requests)
///   2. Player timers (shield grace, skill duration/cooldown)
///   3. Movement (player 1 → player 2)
///   4. Skill activation
///   5. Bomb placement
///   6. Bomb fuses and detonations, chained to a fixed point
///   7. Explosion lifetimes
///   8. Item collection and expiry
///   9. Explosion hits on players
///  10. Outcome check
///
/// Anything created during this tick (bomb, explosion, item) is not aged
/// until the next one, so a lifetime of N means N full ticks.

use crate::domain::blast::{self, BlastResult};
use crate::domain::entity::{Bomb, HitResult, PlayerId, Tickable};
use crate::domain::input::{Action, ActionEvent};
use crate::domain::movement;
use super::event::GameEvent;
use super::world::Match;

/// Edge-triggered requests collected from this tick's action events.
#[derive(Clone, Copy, Debug, Default)]
struct Requests {
    bomb: bool,
    skill: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(m: &mut Match, actions: &[ActionEvent]) -> Vec<GameEvent> {
    if m.outcome.is_over() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    m.tick += 1;

    let requests = apply_actions(m, actions);
    resolve_player_timers(m, &mut events);
    resolve_movement(m);
    resolve_skills(m, &requests, &mut events);
    resolve_bomb_placement(m, &requests, &mut events);
    resolve_bombs(m, &mut events);
    resolve_explosions(m);
    resolve_items(m, &mut events);
    resolve_explosion_hits(m, &mut events);
    check_bomb_budget(m);
    resolve_outcome(m, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Players
// ══════════════════════════════════════════════════════════════

fn apply_actions(m: &mut Match, actions: &[ActionEvent]) -> [Requests; 2] {
    let mut requests = [Requests::default(); 2];
    for ev in actions {
        let idx = ev.player.index();
        let p = &mut m.players[idx];
        if !p.alive { continue; }
        match (ev.action.direction(), ev.pressed) {
            (Some(dir), true) => p.input.press(dir),
            (Some(dir), false) => p.input.release(dir),
            (None, true) => match ev.action {
                Action::PlaceBomb => requests[idx].bomb = true,
                Action::ActivateSkill => requests[idx].skill = true,
                _ => {}
            },
            (None, false) => {}
        }
    }
    requests
}

fn resolve_player_timers(m: &mut Match, events: &mut Vec<GameEvent>) {
    for p in m.players.iter_mut() {
        if p.tick() {
            events.push(GameEvent::SkillExpired { player: p.id, character: p.ability.character });
        }
    }
}

fn resolve_movement(m: &mut Match) {
    let params = m.move_params();
    for p in m.players.iter_mut() {
        movement::resolve_movement(p, &m.grid, &m.bombs, &params);
    }
}

fn resolve_skills(m: &mut Match, requests: &[Requests; 2], events: &mut Vec<GameEvent>) {
    for id in PlayerId::BOTH {
        if !requests[id.index()].skill { continue; }
        let p = &mut m.players[id.index()];
        if !p.alive { continue; }
        if p.ability.activate(&mut p.stats) {
            events.push(GameEvent::SkillActivated { player: id, character: p.ability.character });
        } else {
            log::debug!(
                "{id:?} skill rejected: phase {:?}, cooldown {}",
                p.ability.phase,
                p.ability.cooldown_remaining
            );
        }
    }
}

fn resolve_bomb_placement(m: &mut Match, requests: &[Requests; 2], events: &mut Vec<GameEvent>) {
    let fuse = m.config.bomb_fuse_ticks;
    for id in PlayerId::BOTH {
        if !requests[id.index()].bomb { continue; }
        let p = &m.players[id.index()];
        if !p.alive { continue; }
        if !p.stats.has_bomb_available() {
            log::debug!("{id:?} bomb rejected: {}/{} active", p.stats.active_bombs, p.stats.max_bombs);
            continue;
        }
        let pos = p.tile();
        if m.bomb_at(pos) {
            log::debug!("{id:?} bomb rejected: {pos:?} occupied");
            continue;
        }
        let range = p.stats.bomb_range;
        m.bombs.push(Bomb::new(pos, range, fuse, id, m.tick));
        m.players[id.index()].stats.active_bombs += 1;
        events.push(GameEvent::BombPlaced { player: id, pos });
    }
}

// ══════════════════════════════════════════════════════════════
// Bombs
// ══════════════════════════════════════════════════════════════

/// Age fuses, then detonate every due bomb. A blast ignites any bomb it
/// covers, so the loop runs until no bomb is due. Bombs go off in
/// placement order.
fn resolve_bombs(m: &mut Match, events: &mut Vec<GameEvent>) {
    let tick = m.tick;
    for b in m.bombs.iter_mut() {
        if b.placed_tick < tick { b.tick(); }
    }
    // Bombs sitting in a live blast go off too
    for b in m.bombs.iter_mut() {
        if m.explosions.iter().any(|e| e.is_alive() && e.pos == b.pos) {
            b.ignite();
        }
    }

    let params = m.blast_params();
    while let Some(idx) = m.bombs.iter().position(|b| b.is_due()) {
        let bomb = m.bombs.remove(idx);
        let owner = &mut m.players[bomb.owner.index()].stats;
        debug_assert!(owner.active_bombs > 0, "active bomb count underflow for {:?}", bomb.owner);
        owner.active_bombs = owner.active_bombs.saturating_sub(1);
        events.push(GameEvent::BombDetonated { owner: bomb.owner, pos: bomb.pos, chained: bomb.chained });

        let result = blast::propagate(&mut m.grid, bomb.pos, bomb.range, &params, tick, &mut m.rng);
        for &pos in &result.destroyed {
            events.push(GameEvent::BlockDestroyed { pos });
        }
        burn_items(m, &result, events);
        for b in m.bombs.iter_mut() {
            if result.covers(b.pos) { b.ignite(); }
        }
        for item in &result.spawned {
            events.push(GameEvent::ItemSpawned { kind: item.kind, pos: item.pos });
        }
        m.explosions.extend(result.explosions);
        m.items.extend(result.spawned);
    }
}

/// Items already on the ground burn; this blast's own drops are added after.
fn burn_items(m: &mut Match, result: &BlastResult, events: &mut Vec<GameEvent>) {
    m.items.retain(|item| {
        if item.is_available() && result.covers(item.pos) {
            events.push(GameEvent::ItemBurned { kind: item.kind, pos: item.pos });
            false
        } else {
            true
        }
    });
}

// ══════════════════════════════════════════════════════════════
// Explosions & items
// ══════════════════════════════════════════════════════════════

fn resolve_explosions(m: &mut Match) {
    let tick = m.tick;
    for e in m.explosions.iter_mut() {
        if e.spawned_tick < tick { e.tick(); }
    }
    m.explosions.retain(|e| e.is_alive());
}

fn resolve_items(m: &mut Match, events: &mut Vec<GameEvent>) {
    let tick = m.tick;
    let caps = m.config.caps;

    // Collection: player 1 has priority on a shared tile
    for item in m.items.iter_mut() {
        if !item.is_available() { continue; }
        if let Some(p) = m.players.iter_mut().find(|p| p.alive && p.tile() == item.pos) {
            item.collected = true;
            let applied = p.apply_item(item.kind, &caps);
            events.push(GameEvent::ItemCollected { player: p.id, kind: item.kind, applied });
        }
    }

    // Expiry
    for item in m.items.iter_mut() {
        if item.collected || item.spawned_tick >= tick { continue; }
        if item.tick() {
            events.push(GameEvent::ItemExpired { kind: item.kind, pos: item.pos });
        }
    }
    m.items.retain(|i| i.is_available());
}

// ══════════════════════════════════════════════════════════════
// Collisions & outcome
// ══════════════════════════════════════════════════════════════

/// Any number of overlapping explosions is one hit per player per tick.
fn resolve_explosion_hits(m: &mut Match, events: &mut Vec<GameEvent>) {
    let grace = m.config.shield_grace_ticks;
    for p in m.players.iter_mut() {
        if !p.alive { continue; }
        let hb = p.hitbox();
        if !m.explosions.iter().any(|e| e.is_alive() && e.hitbox().intersects(&hb)) { continue; }
        match p.take_hit(grace) {
            HitResult::ShieldBroken => events.push(GameEvent::ShieldBroken { player: p.id }),
            HitResult::Killed => {
                log::info!("{:?} killed at {:?}", p.id, p.tile());
                events.push(GameEvent::PlayerKilled { player: p.id });
            }
            HitResult::Ignored => {}
        }
    }
}

fn check_bomb_budget(m: &Match) {
    for p in &m.players {
        debug_assert_eq!(
            p.stats.active_bombs as usize,
            m.bombs.iter().filter(|b| b.owner == p.id).count(),
            "active bomb count mismatch for {:?}",
            p.id
        );
        debug_assert!(
            p.stats.active_bombs <= p.stats.max_bombs,
            "{:?} has {} bombs out with capacity {}",
            p.id,
            p.stats.active_bombs,
            p.stats.max_bombs
        );
    }
}

fn resolve_outcome(m: &mut Match, events: &mut Vec<GameEvent>) {
    let outcome = m.current_outcome();
    if outcome.is_over() {
        m.outcome = outcome;
        log::info!("match over at tick {}: {outcome:?}", m.tick);
        events.push(GameEvent::MatchOver { outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Arena, SimConfig};
    use crate::domain::entity::{Explosion, BlastPart, Item, ItemKind};
    use crate::domain::grid::TilePos;
    use crate::domain::tile::Tile;
    use crate::sim::level::parse_map;
    use crate::sim::world::Outcome;

    const OPEN: &str = "\
1 1 1 1 1 1 1 1 1
1 7 0 0 0 0 0 0 1
1 0 0 0 0 0 0 0 1
1 0 0 0 0 3 0 0 1
1 0 0 0 0 0 0 0 1
1 0 0 0 0 0 0 8 1
1 1 1 1 1 1 1 1 1
";

    fn arena_with(f: impl FnOnce(&mut SimConfig)) -> Match {
        let mut cfg = SimConfig::default();
        cfg.seed = Some(7);
        cfg.item_drop_chance = 0.0;
        cfg.bomb_fuse_ticks = 10;
        cfg.explosion_ticks = 5;
        cfg.item_ticks = 20;
        cfg.shield_grace_ticks = 5;
        f(&mut cfg);
        let def = parse_map(OPEN).unwrap();
        Match::new(cfg.with_arena(Arena::Fixed(def))).unwrap()
    }

    fn arena() -> Match {
        arena_with(|_| {})
    }

    fn run(m: &mut Match, ticks: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..ticks {
            all.extend(m.step(&[]));
        }
        all
    }

    fn press(id: PlayerId, action: Action) -> ActionEvent {
        ActionEvent::press(id, action)
    }

    fn plant(m: &mut Match, owner: PlayerId, pos: TilePos, range: u32, fuse: u32) {
        m.bombs.push(Bomb::new(pos, range, fuse, owner, 0));
        m.players[owner.index()].stats.active_bombs += 1;
    }

    // ── Bomb lifecycle ──

    #[test]
    fn own_bomb_detonates_on_fuse_and_kills_owner() {
        let mut m = arena();
        let ev = m.step(&[press(PlayerId::One, Action::PlaceBomb)]);
        assert!(ev.contains(&GameEvent::BombPlaced { player: PlayerId::One, pos: TilePos::new(1, 1) }));
        assert_eq!(m.players[0].stats.active_bombs, 1);

        run(&mut m, 9);
        assert_eq!(m.bombs.len(), 1, "fuse of 10 must not be done after 9 more ticks");

        let ev = m.step(&[]);
        assert!(ev.contains(&GameEvent::BombDetonated { owner: PlayerId::One, pos: TilePos::new(1, 1), chained: false }));
        assert!(ev.contains(&GameEvent::PlayerKilled { player: PlayerId::One }));
        assert!(ev.contains(&GameEvent::MatchOver { outcome: Outcome::Player2Wins }));
        assert_eq!(m.players[0].stats.active_bombs, 0);
        assert!(m.bombs.is_empty());
    }

    #[test]
    fn placement_rejected_when_budget_spent() {
        let mut m = arena_with(|c| c.bomb_fuse_ticks = 200);
        m.step(&[press(PlayerId::One, Action::PlaceBomb)]);
        // Walk onto the next tile and try again
        m.step(&[press(PlayerId::One, Action::Right)]);
        run(&mut m, 15);
        assert_eq!(m.players[0].tile(), TilePos::new(1, 2));
        let ev = m.step(&[press(PlayerId::One, Action::PlaceBomb)]);
        assert!(ev.is_empty());
        assert_eq!(m.bombs.len(), 1);
    }

    #[test]
    fn placement_rejected_on_occupied_tile() {
        let mut m = arena_with(|c| c.start_stats.max_bombs = 3);
        m.step(&[press(PlayerId::One, Action::PlaceBomb)]);
        m.step(&[press(PlayerId::One, Action::PlaceBomb)]);
        assert_eq!(m.bombs.len(), 1);
        assert_eq!(m.players[0].stats.active_bombs, 1);
    }

    #[test]
    fn chained_bombs_detonate_in_same_tick() {
        let mut m = arena();
        plant(&mut m, PlayerId::One, TilePos::new(3, 2), 2, 1);
        plant(&mut m, PlayerId::Two, TilePos::new(3, 4), 2, 50);
        let ev = m.step(&[]);
        let detonations: Vec<_> = ev.iter().filter(|e| matches!(e, GameEvent::BombDetonated { .. })).collect();
        assert_eq!(detonations.len(), 2);
        assert!(ev.contains(&GameEvent::BombDetonated { owner: PlayerId::Two, pos: TilePos::new(3, 4), chained: true }));
        assert!(m.bombs.is_empty());
        assert_eq!(m.players[0].stats.active_bombs, 0);
        assert_eq!(m.players[1].stats.active_bombs, 0);
        assert_eq!(m.outcome, Outcome::Ongoing);
    }

    #[test]
    fn bomb_in_lingering_blast_goes_off() {
        let mut m = arena();
        m.explosions.push(Explosion::new(TilePos::new(3, 3), BlastPart::Center, 5, 0));
        plant(&mut m, PlayerId::Two, TilePos::new(3, 3), 1, 100);
        let ev = m.step(&[]);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::BombDetonated { chained: true, .. })));
    }

    // ── Explosions ──

    #[test]
    fn explosions_live_for_configured_ticks() {
        let mut m = arena();
        plant(&mut m, PlayerId::Two, TilePos::new(3, 3), 1, 1);
        m.step(&[]);
        assert!(!m.explosions.is_empty());
        run(&mut m, 4);
        assert!(!m.explosions.is_empty());
        m.step(&[]);
        assert!(m.explosions.is_empty());
    }

    #[test]
    fn blast_destroys_block_and_drops_hidden_item() {
        let mut m = arena();
        plant(&mut m, PlayerId::Two, TilePos::new(3, 4), 1, 1);
        let ev = m.step(&[]);
        assert!(ev.contains(&GameEvent::BlockDestroyed { pos: TilePos::new(3, 5) }));
        assert!(ev.contains(&GameEvent::ItemSpawned { kind: ItemKind::BombCountUp, pos: TilePos::new(3, 5) }));
        assert_eq!(m.grid.cell_at(TilePos::new(3, 5)), Tile::Empty);
        // The item outlives the blast that revealed it
        run(&mut m, 6);
        assert_eq!(m.items.len(), 1);
    }

    #[test]
    fn blast_burns_items_already_on_ground() {
        let mut m = arena();
        m.items.push(Item::new(TilePos::new(3, 3), ItemKind::Shield, 100, 0));
        plant(&mut m, PlayerId::Two, TilePos::new(3, 4), 1, 1);
        let ev = m.step(&[]);
        assert!(ev.contains(&GameEvent::ItemBurned { kind: ItemKind::Shield, pos: TilePos::new(3, 3) }));
        assert!(m.items.iter().all(|i| i.pos != TilePos::new(3, 3)));
    }

    // ── Hits ──

    #[test]
    fn shield_absorbs_overlapping_explosions_as_one_hit() {
        let mut m = arena();
        m.players[1].shield = true;
        let at = m.players[1].tile();
        for _ in 0..3 {
            m.explosions.push(Explosion::new(at, BlastPart::Center, 5, 0));
        }
        let ev = m.step(&[]);
        let broken = ev.iter().filter(|e| matches!(e, GameEvent::ShieldBroken { .. })).count();
        assert_eq!(broken, 1);
        run(&mut m, 10);
        assert!(m.players[1].alive);
        assert!(!m.players[1].shield);
        assert_eq!(m.outcome, Outcome::Ongoing);
    }

    #[test]
    fn simultaneous_deaths_are_a_draw() {
        let mut m = arena();
        for id in PlayerId::BOTH {
            let at = m.players[id.index()].tile();
            m.explosions.push(Explosion::new(at, BlastPart::Center, 5, 0));
        }
        let ev = m.step(&[]);
        assert!(ev.contains(&GameEvent::MatchOver { outcome: Outcome::Draw }));
        assert!(m.step(&[]).is_empty(), "finished match must not advance");
    }

    // ── Items ──

    #[test]
    fn item_under_player_is_collected() {
        let mut m = arena();
        m.items.push(Item::new(TilePos::new(1, 1), ItemKind::RangeUp, 20, 0));
        let ev = m.step(&[]);
        assert!(ev.contains(&GameEvent::ItemCollected { player: PlayerId::One, kind: ItemKind::RangeUp, applied: true }));
        assert_eq!(m.players[0].stats.bomb_range, 2);
        assert!(m.items.is_empty());
    }

    #[test]
    fn uncollected_item_expires() {
        let mut m = arena();
        m.items.push(Item::new(TilePos::new(3, 3), ItemKind::SpeedUp, 3, 0));
        let ev = run(&mut m, 3);
        assert!(ev.contains(&GameEvent::ItemExpired { kind: ItemKind::SpeedUp, pos: TilePos::new(3, 3) }));
        assert!(m.items.is_empty());
    }

    // ── Skills & input ──

    #[test]
    fn skill_activates_and_expires() {
        let mut m = arena_with(|c| {
            c.skills.runner.duration_ticks = 3;
            c.skills.runner.cooldown_ticks = 10;
        });
        let ev = m.step(&[press(PlayerId::One, Action::ActivateSkill)]);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::SkillActivated { player: PlayerId::One, .. })));
        assert_eq!(m.players[0].stats.move_speed, 2);

        let ev = m.step(&[press(PlayerId::One, Action::ActivateSkill)]);
        assert!(ev.is_empty(), "re-activation while active must be ignored");

        let ev = run(&mut m, 2);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::SkillExpired { player: PlayerId::One, .. })));
        assert_eq!(m.players[0].stats.move_speed, 1);
    }

    #[test]
    fn direction_release_stops_movement() {
        let mut m = arena();
        m.step(&[press(PlayerId::Two, Action::Up)]);
        assert!(m.players[1].is_moving);
        m.step(&[ActionEvent::release(PlayerId::Two, Action::Up)]);
        assert!(!m.players[1].is_moving);
        assert!(m.players[1].y < 5.0);
    }

    #[test]
    fn same_seed_same_match() {
        let play = || {
            let mut cfg = SimConfig::default();
            cfg.seed = Some(99);
            cfg.item_drop_chance = 1.0;
            let mut m = Match::new(cfg).unwrap();
            m.step(&[press(PlayerId::One, Action::Right), press(PlayerId::Two, Action::Left)]);
            run(&mut m, 20);
            m.step(&[press(PlayerId::One, Action::PlaceBomb), press(PlayerId::Two, Action::PlaceBomb)]);
            run(&mut m, 200);
            serde_json::to_string(&m.snapshot()).unwrap()
        };
        assert_eq!(play(), play());
    }
}
