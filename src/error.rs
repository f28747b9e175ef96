/// Error types.
///
/// Only fallible setup returns errors: loading a map and loading config.
/// Rejected in-game requests (full bomb budget, skill on cooldown, blocked
/// moves) are not errors and never surface here.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("could not read map {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("map has no rows")]
    Empty,

    #[error("map is {rows}x{cols}, minimum is {min}x{min}")]
    TooSmall { rows: usize, cols: usize, min: usize },

    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, found: usize, expected: usize },

    #[error("unknown map code {token:?} at row {row}, column {col}")]
    BadCode { row: usize, col: usize, token: String },

    #[error("border cell at row {row}, column {col} is not a wall")]
    OpenBorder { row: usize, col: usize },

    #[error("player {player} spawn appears more than once")]
    DuplicateSpawn { player: u8 },

    #[error("player {player} spawn at row {row}, column {col} is not empty ground")]
    BlockedSpawn { player: u8, row: usize, col: usize },

    #[error("both players spawn on the same tile")]
    SharedSpawn,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown key name {name:?} bound to {action}")]
    UnknownKey { action: String, name: String },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Map(#[from] MapLoadError),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field, reason: reason.into() }
    }
}
