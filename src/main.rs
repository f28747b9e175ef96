/// Entry point and game loop.

mod ui;

use std::time::{Duration, Instant};

use crossterm::event::{
    KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};

use blastarena::config::{Arena, GameConfig, SimConfig};
use blastarena::domain::ability::Character;
use blastarena::domain::input::ActionEvent;
use blastarena::sim::clock::SimulationClock;
use blastarena::sim::event::GameEvent;
use blastarena::sim::level::{embedded_maps, scan_maps};
use blastarena::sim::world::{Match, Outcome};
use ui::gamepad::GamepadState;
use ui::input::{merge, ActionTracker, InputState, KeyBindings};
use ui::renderer::{Renderer, View};
use ui::sound::{sfx_for_events, SoundEngine};
use ui::Phase;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Frames a message stays on screen.
const MESSAGE_FRAMES: u32 = 400;

/// Frames before the match-over screen accepts confirm, so a held bomb key
/// doesn't skip it.
const MATCH_OVER_GRACE_FRAMES: u32 = 60;

/// Menu state plus the running match, if any.
struct App {
    phase: Phase,
    paused: bool,
    base: SimConfig,
    arenas: Vec<(String, Arena)>,
    arena_names: Vec<String>,
    selected: usize,
    characters: [Character; 2],
    game: Option<Match>,
    wins: [u32; 2],
    draws: u32,
    message: String,
    message_timer: u32,
    phase_frames: u32,
    anim_tick: u64,
}

impl App {
    fn new(config: &GameConfig) -> Self {
        let mut message = String::new();
        let base = match config.sim_config() {
            Ok(sim) => sim,
            Err(e) => {
                log::warn!("config rejected, using defaults: {e}");
                message = format!("config: {e}");
                SimConfig::default()
            }
        };

        let mut arenas = vec![(arena_label(&base.arena), base.arena.clone())];
        for def in embedded_maps().into_iter().chain(scan_maps(&config.maps_dir)) {
            arenas.push((def.name.clone(), Arena::Fixed(def)));
        }
        let arena_names = arenas.iter().map(|(name, _)| name.clone()).collect();

        App {
            phase: Phase::Title,
            paused: false,
            characters: base.characters,
            base,
            arenas,
            arena_names,
            selected: 0,
            game: None,
            wins: [0, 0],
            draws: 0,
            message_timer: if message.is_empty() { 0 } else { MESSAGE_FRAMES },
            message,
            phase_frames: 0,
            anim_tick: 0,
        }
    }

    fn set_message(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
        self.message_timer = MESSAGE_FRAMES;
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.paused = false;
        self.phase_frames = 0;
    }

    fn start_match(&mut self) {
        let arena = match self.arenas.get(self.selected) {
            Some((_, arena)) => arena.clone(),
            None => return,
        };
        let mut sim = self.base.with_arena(arena);
        sim.characters = self.characters;
        match Match::new(sim) {
            Ok(m) => {
                self.game = Some(m);
                self.wins = [0, 0];
                self.draws = 0;
                self.set_phase(Phase::Playing);
            }
            Err(e) => {
                log::warn!("cannot start match: {e}");
                self.set_message(format!("cannot start: {e}"));
            }
        }
    }

    fn next_round(&mut self) {
        let result = match &mut self.game {
            Some(m) => m.restart(),
            None => return,
        };
        match result {
            Ok(()) => self.set_phase(Phase::Playing),
            Err(e) => {
                self.set_message(format!("cannot restart: {e}"));
                self.to_title();
            }
        }
    }

    fn to_title(&mut self) {
        self.game = None;
        self.set_phase(Phase::Title);
    }

    fn record_outcome(&mut self, outcome: Outcome) {
        match outcome.winner() {
            Some(id) => {
                self.wins[id.index()] += 1;
                self.set_message(format!("Player {} takes the round", id.number()));
            }
            None => {
                self.draws += 1;
                self.set_message("Draw");
            }
        }
        self.set_phase(Phase::MatchOver);
    }

    fn cycle_character(&mut self, slot: usize) {
        let cur = self.characters[slot];
        let idx = Character::ALL.iter().position(|&c| c == cur).unwrap_or(0);
        self.characters[slot] = Character::ALL[(idx + 1) % Character::ALL.len()];
    }
}

fn arena_label(arena: &Arena) -> String {
    match arena {
        Arena::Generated { rows, cols, .. } => format!("Random {rows}x{cols}"),
        Arena::Fixed(def) => def.name.clone(),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GameConfig::load();
    let bindings = match KeyBindings::from_config(&config.players) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Bad key binding in config.toml: {e}");
            return;
        }
    };

    let mut app = App::new(&config);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    // Release events make two players on one keyboard work properly.
    let mut kb = InputState::new();
    if terminal::supports_keyboard_enhancement().unwrap_or(false) {
        let pushed = execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );
        kb.honor_release = pushed.is_ok();
    }
    log::info!("key release events: {}", kb.honor_release);

    let sound = SoundEngine::new();

    let result = game_loop(&mut app, &mut renderer, &mut kb, sound.as_ref(), &config, &bindings);

    if kb.honor_release {
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Blast Arena!");
    if app.wins != [0, 0] || app.draws > 0 {
        println!("Final tally  P1 {} : {} P2  ({} draws)", app.wins[0], app.wins[1], app.draws);
    }
}

fn game_loop(
    app: &mut App,
    renderer: &mut Renderer,
    kb: &mut InputState,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    bindings: &KeyBindings,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let mut clock = SimulationClock::new(app.base.tick_rate_hz, app.base.max_catch_up);
    let mut tracker = ActionTracker::new();
    let mut pending: Vec<ActionEvent> = Vec::new();
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let phase_before = app.phase;
        let round_before = app.game.as_ref().map(|m| m.round);
        if handle_meta(app, kb, &gp) {
            break;
        }
        let round_changed = app.game.as_ref().map(|m| m.round) != round_before;
        if app.phase != phase_before || round_changed {
            // Fresh players: held keys are re-reported as fresh presses.
            tracker = ActionTracker::new();
            pending.clear();
            clock.reset();
        } else if app.paused {
            // Release into the frozen match; keys still down re-press on resume.
            pending.extend(tracker.release_all());
            clock.reset();
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last_frame);
        last_frame = now;

        if app.phase == Phase::Playing && !app.paused {
            let held = merge(bindings.held(kb), [[false; 6], gp.held_actions()]);
            pending.extend(tracker.update(held, bindings.pressed(kb)));

            let ticks = clock.advance(elapsed);
            for _ in 0..ticks {
                let Some(m) = app.game.as_mut() else { break };
                let events = m.step(&pending);
                pending.clear();
                process_sound_events(sound, &events);
                if m.outcome.is_over() {
                    let outcome = m.outcome;
                    app.record_outcome(outcome);
                    break;
                }
            }
        }

        app.anim_tick = app.anim_tick.wrapping_add(1);
        app.phase_frames = app.phase_frames.saturating_add(1);
        if app.message_timer > 0 {
            app.message_timer -= 1;
            if app.message_timer == 0 { app.message.clear(); }
        }

        let snapshot = app.game.as_ref().map(Match::snapshot);
        let view = View {
            phase: app.phase,
            paused: app.paused,
            snapshot: snapshot.as_ref(),
            arenas: &app.arena_names,
            selected: app.selected,
            characters: app.characters,
            wins: app.wins,
            draws: app.draws,
            message: &app.message,
            anim_tick: app.anim_tick,
        };
        renderer.render(&view)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for s in sfx_for_events(events) {
        sfx.play(s);
    }
}

// ── Meta keys: phase changes, pause, quit ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1)];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::F(2)];

/// Returns true when the player asked to quit.
fn handle_meta(app: &mut App, kb: &InputState, gp: &GamepadState) -> bool {
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();

    match app.phase {
        // ── Title ──
        Phase::Title => {
            if esc || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
            let count = app.arenas.len().max(1);
            if kb.any_pressed(&[KeyCode::Up]) {
                app.selected = (app.selected + count - 1) % count;
            }
            if kb.any_pressed(&[KeyCode::Down]) {
                app.selected = (app.selected + 1) % count;
            }
            if kb.any_pressed(&[KeyCode::Char('1')]) {
                app.cycle_character(0);
            }
            if kb.any_pressed(&[KeyCode::Char('2')]) {
                app.cycle_character(1);
            }
            if confirm {
                app.start_match();
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if esc {
                app.to_title();
                return false;
            }
            if kb.any_pressed(KEYS_PAUSE) {
                app.paused = !app.paused;
            }
            if kb.any_pressed(KEYS_RESTART) {
                app.next_round();
                app.set_message("Round restarted");
            }
        }

        // ── Match over ──
        Phase::MatchOver => {
            if esc {
                app.to_title();
            } else if confirm && app.phase_frames >= MATCH_OVER_GRACE_FRAMES {
                app.next_round();
            }
        }
    }

    false
}
