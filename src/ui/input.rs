/// Keyboard state and key bindings.
///
/// Tracks which keys are currently held down, enabling:
///   - Both players on one keyboard, each with their own bindings
///   - Direction keys held continuously, bomb and skill on the press edge
///   - Player 2 on keyboard and gamepad at the same time
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// `ActionTracker` turns per-frame held state into the press/release
/// `ActionEvent`s the simulation consumes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, poll};

use blastarena::config::PlayerControls;
use blastarena::domain::entity::PlayerId;
use blastarena::domain::input::{Action, ActionEvent};
use blastarena::error::ConfigError;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from not held to held during the most recent
    /// `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before stepping the simulation.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                self.record(normalize(key.code), key.kind, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, code: KeyCode, kind: KeyEventKind, at: Instant) {
        match kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&code);
            }
            // Unconfirmed release: rely on timeout expiry.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(code);
                self.last_active.insert(code, at);
                if !was_held {
                    self.fresh_presses.push(code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&normalize(code))
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&normalize(code))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// Letters are matched case-insensitively so Shift or Caps Lock don't
/// break a binding.
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// Parse a key name from config.toml. Single characters bind themselves;
/// named keys are case-insensitive.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(normalize(KeyCode::Char(c)));
    }
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "space" => KeyCode::Char(' '),
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "insert" => KeyCode::Insert,
        "delete" => KeyCode::Delete,
        _ => {
            let n: u8 = lower.strip_prefix('f')?.parse().ok()?;
            if !(1..=12).contains(&n) { return None; }
            KeyCode::F(n)
        }
    };
    Some(code)
}

// ══════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════

/// Key lists per player, indexed by `Action as usize`.
#[derive(Clone, Debug)]
pub struct KeyBindings {
    keys: [[Vec<KeyCode>; 6]; 2],
}

impl KeyBindings {
    pub fn from_config(players: &[PlayerControls; 2]) -> Result<Self, ConfigError> {
        let mut keys: [[Vec<KeyCode>; 6]; 2] = Default::default();
        for (slot, controls) in players.iter().enumerate() {
            for action in Action::ALL {
                let names = match action {
                    Action::Up => &controls.up,
                    Action::Down => &controls.down,
                    Action::Left => &controls.left,
                    Action::Right => &controls.right,
                    Action::PlaceBomb => &controls.bomb,
                    Action::ActivateSkill => &controls.skill,
                };
                keys[slot][action as usize] = names
                    .iter()
                    .map(|n| {
                        parse_key(n).ok_or_else(|| ConfigError::UnknownKey {
                            action: format!("player{}.{action:?}", slot + 1),
                            name: n.clone(),
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
        }
        Ok(KeyBindings { keys })
    }

    pub fn keys(&self, player: PlayerId, action: Action) -> &[KeyCode] {
        &self.keys[player.index()][action as usize]
    }

    /// Held state of every action for both players.
    pub fn held(&self, input: &InputState) -> [[bool; 6]; 2] {
        PlayerId::BOTH.map(|p| Action::ALL.map(|a| input.any_held(self.keys(p, a))))
    }

    /// Fresh presses of every action for both players.
    pub fn pressed(&self, input: &InputState) -> [[bool; 6]; 2] {
        PlayerId::BOTH.map(|p| Action::ALL.map(|a| input.any_pressed(self.keys(p, a))))
    }
}

// ══════════════════════════════════════════════════════════════
// Edge tracking
// ══════════════════════════════════════════════════════════════

/// Remembers what the simulation was last told and emits the difference.
#[derive(Clone, Debug, Default)]
pub struct ActionTracker {
    held: [[bool; 6]; 2],
}

impl ActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `held` against the previous frame. `fresh` marks keys pressed
    /// again this frame, so a quick tap on bomb or skill still fires while
    /// the tracker already believes the action is held.
    pub fn update(&mut self, held: [[bool; 6]; 2], fresh: [[bool; 6]; 2]) -> Vec<ActionEvent> {
        let mut out = Vec::new();
        for id in PlayerId::BOTH {
            let p = id.index();
            for action in Action::ALL {
                let a = action as usize;
                let now = held[p][a] || fresh[p][a];
                let was = self.held[p][a];
                if now && !was {
                    out.push(ActionEvent::press(id, action));
                } else if !now && was {
                    out.push(ActionEvent::release(id, action));
                } else if now && fresh[p][a] && action.direction().is_none() {
                    out.push(ActionEvent::press(id, action));
                }
                self.held[p][a] = now;
            }
        }
        out
    }

    /// Release everything currently held.
    pub fn release_all(&mut self) -> Vec<ActionEvent> {
        let none = [[false; 6]; 2];
        self.update(none, none)
    }
}

/// OR two held tables together (keyboard plus gamepad).
pub fn merge(a: [[bool; 6]; 2], b: [[bool; 6]; 2]) -> [[bool; 6]; 2] {
    let mut out = a;
    for (row, other) in out.iter_mut().zip(b.iter()) {
        for (x, y) in row.iter_mut().zip(other.iter()) {
            *x |= *y;
        }
    }
    out
}
