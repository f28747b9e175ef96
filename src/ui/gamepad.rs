/// Gamepad tracker for player 2, using gilrs.
///
/// Button mapping is loaded from config.toml `[gamepad]`.
/// Default mapping:
///   D-pad / Left Stick    →  Movement
///   A / X                 →  Place bomb
///   B / Y / R1            →  Skill
///   Start                 →  Confirm / next round
///   Select                →  Back
///
/// Without the `gamepad` feature this compiles to a tracker that never
/// reports anything.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use blastarena::config::GamepadConfig;
use blastarena::domain::input::{Action, Direction};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "L2" | "LT" => Some(Btn::L2),
            "R2" | "RT" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2 => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

struct ButtonMap {
    bomb: Vec<Btn>,
    skill: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ButtonMap {
    fn default() -> Self {
        ButtonMap {
            bomb: vec![Btn::A, Btn::X],
            skill: vec![Btn::B, Btn::Y, Btn::R1],
            confirm: vec![Btn::Start],
            cancel: vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    buttons: [BtnState; 10],
    /// Indexed like `Direction::ALL`.
    dpad: [bool; 4],
    stick: [bool; 4],
    stick_x: f32,
    stick_y: f32,
    map: ButtonMap,
    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

fn dir_index(dir: Direction) -> usize {
    dir as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); 10],
            dpad: [false; 4],
            stick: [false; 4],
            stick_x: 0.0,
            stick_y: 0.0,
            map: ButtonMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Unknown names are skipped; an entry
    /// with no usable names keeps its default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names
                .iter()
                .filter_map(|s| {
                    let b = Btn::from_name(s);
                    if b.is_none() {
                        log::warn!("unknown gamepad button {s:?}");
                    }
                    b
                })
                .collect()
        }
        let replace = |slot: &mut Vec<Btn>, names: &[String]| {
            let parsed = parse_list(names);
            if !parsed.is_empty() { *slot = parsed; }
        };
        replace(&mut self.map.bomb, &cfg.bomb);
        replace(&mut self.map.skill, &cfg.skill);
        replace(&mut self.map.confirm, &cfg.confirm);
        replace(&mut self.map.cancel, &cfg.cancel);
    }

    pub fn update(&mut self) {
        for b in &mut self.buttons { b.just_pressed = false; }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    self.connected = true;
                    log::info!("gamepad connected");
                }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                    log::info!("gamepad disconnected");
                }
                _ => {}
            }
        }

        self.stick[dir_index(Direction::Left)] = self.stick_x < -STICK_DEADZONE;
        self.stick[dir_index(Direction::Right)] = self.stick_x > STICK_DEADZONE;
        self.stick[dir_index(Direction::Up)] = self.stick_y > STICK_DEADZONE;
        self.stick[dir_index(Direction::Down)] = self.stick_y < -STICK_DEADZONE;
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp => Some(Direction::Up),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(dir) = dpad {
            self.dpad[dir_index(dir)] = held;
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            let state = &mut self.buttons[btn_index(btn)];
            state.held = held;
            if held { state.just_pressed = true; }
        }
    }

    // ── Queries ──

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].held)
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    pub fn direction_held(&self, dir: Direction) -> bool {
        self.dpad[dir_index(dir)] || self.stick[dir_index(dir)]
    }

    /// Held state of every logical action, indexed like `Action::ALL`.
    pub fn held_actions(&self) -> [bool; 6] {
        Action::ALL.map(|a| match a.direction() {
            Some(dir) => self.direction_held(dir),
            None if a == Action::PlaceBomb => self.any_held(&self.map.bomb) || self.any_just_pressed(&self.map.bomb),
            None => self.any_held(&self.map.skill) || self.any_just_pressed(&self.map.skill),
        })
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.map.confirm)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.map.cancel)
    }

    // ── Internal ──

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); 10];
        self.dpad = [false; 4];
        self.stick = [false; 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}
