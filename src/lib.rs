//! Blast Arena: a two-player, grid-based bomb arena.
//!
//! The library is the simulation core. It has no terminal, audio or file
//! access beyond loading config and map files up front:
//!
//!   - `domain`: terrain, geometry, entities, blast propagation, skills
//!   - `sim`:    the `Match` state, the per-tick `step`, snapshots, clock
//!   - `config`: TOML loading into a validated `SimConfig`
//!   - `error`:  `MapLoadError` and `ConfigError`
//!
//! A front end drives it by feeding `ActionEvent`s into `Match::step` at a
//! fixed rate and drawing `Match::snapshot()`.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;

pub use config::{GameConfig, SimConfig};
pub use sim::world::{Match, Outcome};
