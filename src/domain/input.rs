/// Logical input: directions, actions, and the per-player direction queue.
///
/// The core never sees raw key codes. The presentation layer maps its keys
/// (or gamepad buttons) to `Action`s and feeds `ActionEvent`s into the step.
///
/// ## Direction priority
///
/// Several direction keys may be held at once. `InputDirectionQueue` keeps
/// them in press order and reports the *earliest* one still held, so the
/// first-pressed key stays authoritative until it is released:
///
/// ```text
/// press Up    → [Up]         active Up
/// press Down  → [Up, Down]   active Up
/// release Up  → [Down]       active Down
/// release Down→ []           active none
/// ```

use serde::Serialize;

use super::entity::PlayerId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// `(d_row, d_col)` grid step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// `(dx, dy)` unit vector in world space (x = column, y = row).
    pub fn unit(self) -> (f32, f32) {
        let (dr, dc) = self.delta();
        (dc as f32, dr as f32)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The six logical actions each player is bound to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    PlaceBomb,
    ActivateSkill,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::PlaceBomb,
        Action::ActivateSkill,
    ];

    pub fn direction(self) -> Option<Direction> {
        match self {
            Action::Up => Some(Direction::Up),
            Action::Down => Some(Direction::Down),
            Action::Left => Some(Direction::Left),
            Action::Right => Some(Direction::Right),
            Action::PlaceBomb | Action::ActivateSkill => None,
        }
    }
}

/// An already-resolved press or release of a logical action.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ActionEvent {
    pub player: PlayerId,
    pub action: Action,
    pub pressed: bool,
}

impl ActionEvent {
    pub fn press(player: PlayerId, action: Action) -> Self {
        ActionEvent { player, action, pressed: true }
    }

    pub fn release(player: PlayerId, action: Action) -> Self {
        ActionEvent { player, action, pressed: false }
    }
}

/// Ordered set of held directions, first-pressed wins.
#[derive(Clone, Debug, Default)]
pub struct InputDirectionQueue {
    order: Vec<Direction>,
    held: [bool; 4],
}

impl InputDirectionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `dir` held and append it unless it is already queued.
    pub fn press(&mut self, dir: Direction) {
        self.held[dir.index()] = true;
        if !self.order.contains(&dir) {
            self.order.push(dir);
        }
    }

    /// Forget `dir` wherever it sits in the queue.
    pub fn release(&mut self, dir: Direction) {
        self.held[dir.index()] = false;
        self.order.retain(|d| *d != dir);
    }

    /// Drop the held flag without dequeuing. Used when a backend loses track
    /// of a key (focus loss, missed release); the entry is purged lazily.
    pub fn clear_held(&mut self, dir: Direction) {
        self.held[dir.index()] = false;
    }

    /// Earliest still-held direction. Stale entries at the front are purged.
    pub fn active_direction(&mut self) -> Option<Direction> {
        while let Some(&front) = self.order.first() {
            if self.held[front.index()] {
                return Some(front);
            }
            self.order.remove(0);
        }
        None
    }

    pub fn is_held(&self, dir: Direction) -> bool {
        self.held[dir.index()]
    }

    /// Queued directions in press order (may include stale entries).
    pub fn queued(&self) -> &[Direction] {
        &self.order
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.held = [false; 4];
    }
}
