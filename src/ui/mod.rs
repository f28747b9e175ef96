pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod sound;

/// Top-level screen the binary is showing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Arena and character picker.
    Title,
    Playing,
    /// Round decided; waiting for next round or back to title.
    MatchOver,
}
