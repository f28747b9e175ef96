/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or
/// `~/.local/share/blastarena`). Falls back to defaults if the file is
/// missing or incomplete.
///
/// The simulation never reads this file itself. `GameConfig::sim_config()`
/// turns the loaded sections into a validated `SimConfig` which is passed
/// explicitly into `Match::new`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::ability::{Character, SkillSpec};
use crate::domain::blast::BlockPolicy;
use crate::domain::entity::{ItemWeights, StatCaps, Stats};
use crate::domain::grid::MIN_SIDE;
use crate::error::ConfigError;
use crate::sim::level::{self, MapDef};

/// Largest skill magnitude accepted. Keeps boosted stats far from overflow.
pub const MAX_SKILL_MAGNITUDE: u32 = 16;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub players: [PlayerControls; 2],
    pub gamepad: GamepadConfig,
    /// Directory scanned for extra arena files.
    pub maps_dir: PathBuf,
    /// `[map].file`, resolved against the search dirs.
    pub map_file: Option<PathBuf>,
}

/// Everything the simulation core needs, already validated.
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub tick_rate_hz: u32,
    pub max_catch_up: u32,
    pub bomb_fuse_ticks: u32,
    pub explosion_ticks: u32,
    pub item_ticks: u32,
    pub item_drop_chance: f64,
    pub block_policy: BlockPolicy,
    pub shield_grace_ticks: u32,
    /// None = seed from OS entropy.
    pub seed: Option<u64>,
    pub speed_unit: f32,
    pub hitbox_half: f32,
    pub corner_assist: f32,
    pub start_stats: Stats,
    pub caps: StatCaps,
    pub item_weights: ItemWeights,
    pub skills: SkillTable,
    pub characters: [Character; 2],
    pub arena: Arena,
}

/// Where the match terrain comes from.
#[derive(Clone, Debug)]
pub enum Arena {
    Generated { rows: usize, cols: usize, block_density: f64 },
    Fixed(MapDef),
}

#[derive(Clone, Copy, Debug)]
pub struct SkillTable {
    pub runner: SkillSpec,
    pub demolisher: SkillSpec,
    pub bomber: SkillSpec,
}

impl SkillTable {
    pub fn get(&self, character: Character) -> SkillSpec {
        match character {
            Character::Runner => self.runner,
            Character::Demolisher => self.demolisher,
            Character::Bomber => self.bomber,
        }
    }
}

/// Key names per logical action. Parsed into key codes by the UI.
#[derive(Clone, Debug)]
pub struct PlayerControls {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub bomb: Vec<String>,
    pub skill: Vec<String>,
}

/// Gamepad button names for player 2.
#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub bomb: Vec<String>,
    pub skill: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    sim: TomlSim,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    items: TomlItems,
    #[serde(default)]
    map: TomlMap,
    #[serde(default)]
    skills: TomlSkills,
    #[serde(default)]
    players: TomlPlayers,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlSim {
    #[serde(default = "default_tick_rate")]
    tick_rate_hz: u32,
    #[serde(default = "default_max_catch_up")]
    max_catch_up: u32,
    #[serde(default = "default_fuse")]
    bomb_fuse_ticks: u32,
    #[serde(default = "default_explosion")]
    explosion_ticks: u32,
    #[serde(default = "default_item_life")]
    item_ticks: u32,
    #[serde(default = "default_drop_chance")]
    item_drop_chance: f64,
    #[serde(default)]
    block_policy: BlockPolicy,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_shield_grace")]
    shield_grace_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_speed_unit")]
    speed_unit: f32,
    #[serde(default = "default_hitbox_half")]
    hitbox_half: f32,
    #[serde(default = "default_corner_assist")]
    corner_assist: f32,
    #[serde(default = "default_one")]
    start_speed: u32,
    #[serde(default = "default_one")]
    start_range: u32,
    #[serde(default = "default_one")]
    start_bombs: u32,
    #[serde(default = "default_speed_cap")]
    max_speed_cap: u32,
    #[serde(default = "default_range_cap")]
    max_range_cap: u32,
    #[serde(default = "default_bomb_cap")]
    max_bomb_cap: u32,
}

#[derive(Deserialize, Debug)]
struct TomlItems {
    #[serde(default = "default_weight")]
    bomb_count_up: u32,
    #[serde(default = "default_weight")]
    range_up: u32,
    #[serde(default = "default_weight")]
    speed_up: u32,
    #[serde(default = "default_shield_weight")]
    shield: u32,
}

#[derive(Deserialize, Debug)]
struct TomlMap {
    #[serde(default = "default_rows")]
    rows: usize,
    #[serde(default = "default_cols")]
    cols: usize,
    #[serde(default = "default_block_density")]
    block_density: f64,
    #[serde(default)]
    file: Option<String>,
    #[serde(default = "default_maps_dir")]
    maps_dir: String,
}

/// Partial skill entry; unset fields take the character's default.
#[derive(Deserialize, Debug, Default)]
struct TomlSkill {
    magnitude: Option<u32>,
    duration_ticks: Option<u32>,
    cooldown_ticks: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlSkills {
    #[serde(default)]
    runner: TomlSkill,
    #[serde(default)]
    demolisher: TomlSkill,
    #[serde(default)]
    bomber: TomlSkill,
}

#[derive(Deserialize, Debug, Default)]
struct TomlControls {
    character: Option<Character>,
    up: Option<Vec<String>>,
    down: Option<Vec<String>>,
    left: Option<Vec<String>>,
    right: Option<Vec<String>>,
    bomb: Option<Vec<String>>,
    skill: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlPlayers {
    #[serde(default)]
    p1: TomlControls,
    #[serde(default)]
    p2: TomlControls,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_bomb")]
    bomb: Vec<String>,
    #[serde(default = "default_pad_skill")]
    skill: Vec<String>,
    #[serde(default = "default_pad_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_pad_cancel")]
    cancel: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u32 { 60 }
fn default_max_catch_up() -> u32 { 5 }
fn default_fuse() -> u32 { 120 }        // 2s at 60Hz
fn default_explosion() -> u32 { 30 }
fn default_item_life() -> u32 { 600 }   // 10s
fn default_drop_chance() -> f64 { 0.3 }
fn default_shield_grace() -> u32 { 30 } // one explosion lifetime

fn default_speed_unit() -> f32 { 0.05 }
fn default_hitbox_half() -> f32 { 0.3 }
fn default_corner_assist() -> f32 { 0.35 }
fn default_one() -> u32 { 1 }
fn default_speed_cap() -> u32 { 5 }
fn default_range_cap() -> u32 { 8 }
fn default_bomb_cap() -> u32 { 8 }

fn default_weight() -> u32 { 3 }
fn default_shield_weight() -> u32 { 1 }

fn default_rows() -> usize { 13 }
fn default_cols() -> usize { 15 }
fn default_block_density() -> f64 { 0.7 }
fn default_maps_dir() -> String { "maps".into() }

fn default_skill(character: Character) -> SkillSpec {
    match character {
        Character::Runner => SkillSpec { magnitude: 2, duration_ticks: 180, cooldown_ticks: 600 },
        Character::Demolisher => SkillSpec { magnitude: 2, duration_ticks: 300, cooldown_ticks: 720 },
        Character::Bomber => SkillSpec { magnitude: 2, duration_ticks: 300, cooldown_ticks: 720 },
    }
}

fn default_character(slot: usize) -> Character {
    if slot == 0 { Character::Runner } else { Character::Demolisher }
}

fn names(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn default_controls(slot: usize) -> PlayerControls {
    if slot == 0 {
        PlayerControls {
            up: names(&["w"]),
            down: names(&["s"]),
            left: names(&["a"]),
            right: names(&["d"]),
            bomb: names(&["Space", "f"]),
            skill: names(&["e", "g"]),
        }
    } else {
        PlayerControls {
            up: names(&["Up"]),
            down: names(&["Down"]),
            left: names(&["Left"]),
            right: names(&["Right"]),
            bomb: names(&["Enter", "."]),
            skill: names(&["/", "Backspace"]),
        }
    }
}

fn default_pad_bomb() -> Vec<String> { vec!["A".into(), "X".into()] }
fn default_pad_skill() -> Vec<String> { vec!["B".into(), "Y".into(), "R1".into()] }
fn default_pad_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_pad_cancel() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlSim {
    fn default() -> Self {
        TomlSim {
            tick_rate_hz: default_tick_rate(),
            max_catch_up: default_max_catch_up(),
            bomb_fuse_ticks: default_fuse(),
            explosion_ticks: default_explosion(),
            item_ticks: default_item_life(),
            item_drop_chance: default_drop_chance(),
            block_policy: BlockPolicy::default(),
            seed: None,
            shield_grace_ticks: default_shield_grace(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            speed_unit: default_speed_unit(),
            hitbox_half: default_hitbox_half(),
            corner_assist: default_corner_assist(),
            start_speed: default_one(),
            start_range: default_one(),
            start_bombs: default_one(),
            max_speed_cap: default_speed_cap(),
            max_range_cap: default_range_cap(),
            max_bomb_cap: default_bomb_cap(),
        }
    }
}

impl Default for TomlItems {
    fn default() -> Self {
        TomlItems {
            bomb_count_up: default_weight(),
            range_up: default_weight(),
            speed_up: default_weight(),
            shield: default_shield_weight(),
        }
    }
}

impl Default for TomlMap {
    fn default() -> Self {
        TomlMap {
            rows: default_rows(),
            cols: default_cols(),
            block_density: default_block_density(),
            file: None,
            maps_dir: default_maps_dir(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            bomb: default_pad_bomb(),
            skill: default_pad_skill(),
            confirm: default_pad_confirm(),
            cancel: default_pad_cancel(),
        }
    }
}

impl TomlSkill {
    fn resolve(&self, character: Character) -> SkillSpec {
        let d = default_skill(character);
        SkillSpec {
            magnitude: self.magnitude.unwrap_or(d.magnitude),
            duration_ticks: self.duration_ticks.unwrap_or(d.duration_ticks),
            cooldown_ticks: self.cooldown_ticks.unwrap_or(d.cooldown_ticks),
        }
    }
}

impl TomlControls {
    fn resolve(self, slot: usize) -> (Character, PlayerControls) {
        let d = default_controls(slot);
        let controls = PlayerControls {
            up: self.up.unwrap_or(d.up),
            down: self.down.unwrap_or(d.down),
            left: self.left.unwrap_or(d.left),
            right: self.right.unwrap_or(d.right),
            bomb: self.bomb.unwrap_or(d.bomb),
            skill: self.skill.unwrap_or(d.skill),
        };
        (self.character.unwrap_or_else(|| default_character(slot)), controls)
    }
}

// ── Loading ──

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        GameConfig::default().sim
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/blastarena`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly. Unlike `load`, errors are returned.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        Ok(GameConfig::from_toml(toml_cfg, &[]))
    }

    fn from_toml(t: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let (c1, p1) = t.players.p1.resolve(0);
        let (c2, p2) = t.players.p2.resolve(1);

        let sim = SimConfig {
            tick_rate_hz: t.sim.tick_rate_hz,
            max_catch_up: t.sim.max_catch_up,
            bomb_fuse_ticks: t.sim.bomb_fuse_ticks,
            explosion_ticks: t.sim.explosion_ticks,
            item_ticks: t.sim.item_ticks,
            item_drop_chance: t.sim.item_drop_chance,
            block_policy: t.sim.block_policy,
            shield_grace_ticks: t.sim.shield_grace_ticks,
            seed: t.sim.seed,
            speed_unit: t.player.speed_unit,
            hitbox_half: t.player.hitbox_half,
            corner_assist: t.player.corner_assist,
            start_stats: Stats {
                move_speed: t.player.start_speed,
                bomb_range: t.player.start_range,
                max_bombs: t.player.start_bombs,
                active_bombs: 0,
            },
            caps: StatCaps {
                move_speed: t.player.max_speed_cap,
                bomb_range: t.player.max_range_cap,
                max_bombs: t.player.max_bomb_cap,
            },
            item_weights: ItemWeights {
                bomb_count_up: t.items.bomb_count_up,
                range_up: t.items.range_up,
                speed_up: t.items.speed_up,
                shield: t.items.shield,
            },
            skills: SkillTable {
                runner: t.skills.runner.resolve(Character::Runner),
                demolisher: t.skills.demolisher.resolve(Character::Demolisher),
                bomber: t.skills.bomber.resolve(Character::Bomber),
            },
            characters: [c1, c2],
            arena: Arena::Generated {
                rows: t.map.rows,
                cols: t.map.cols,
                block_density: t.map.block_density,
            },
        };

        GameConfig {
            sim,
            players: [p1, p2],
            gamepad: GamepadConfig {
                bomb: t.gamepad.bomb,
                skill: t.gamepad.skill,
                confirm: t.gamepad.confirm,
                cancel: t.gamepad.cancel,
            },
            maps_dir: resolve_dir(&t.map.maps_dir, search_dirs),
            map_file: t.map.file.map(|f| resolve_file(&f, search_dirs)),
        }
    }

    /// Validated simulation config. Loads `[map].file` if one is set.
    pub fn sim_config(&self) -> Result<SimConfig, ConfigError> {
        let mut sim = self.sim.clone();
        if let Some(path) = &self.map_file {
            sim.arena = Arena::Fixed(level::load_map_file(path)?);
        }
        sim.validate()?;
        Ok(sim)
    }
}

impl SimConfig {
    /// Same config on a different arena.
    pub fn with_arena(&self, arena: Arena) -> SimConfig {
        SimConfig { arena, ..self.clone() }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::invalid("sim.tick_rate_hz", "must be positive"));
        }
        if self.max_catch_up == 0 {
            return Err(ConfigError::invalid("sim.max_catch_up", "must be at least 1"));
        }
        if self.bomb_fuse_ticks == 0 {
            return Err(ConfigError::invalid("sim.bomb_fuse_ticks", "must be at least 1"));
        }
        if self.explosion_ticks == 0 {
            return Err(ConfigError::invalid("sim.explosion_ticks", "must be at least 1"));
        }
        if self.item_ticks == 0 {
            return Err(ConfigError::invalid("sim.item_ticks", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.item_drop_chance) {
            return Err(ConfigError::invalid("sim.item_drop_chance", format!("{} is outside 0..=1", self.item_drop_chance)));
        }
        if !(self.speed_unit > 0.0 && self.speed_unit < 0.5) {
            return Err(ConfigError::invalid("player.speed_unit", "must be in (0, 0.5)"));
        }
        if !(self.hitbox_half > 0.0 && self.hitbox_half < 0.5) {
            return Err(ConfigError::invalid("player.hitbox_half", "must be smaller than half a tile"));
        }
        if !(0.0..=0.5).contains(&self.corner_assist) {
            return Err(ConfigError::invalid("player.corner_assist", "must be in 0..=0.5"));
        }
        let s = self.start_stats;
        if s.move_speed == 0 || s.max_bombs == 0 || s.bomb_range == 0 {
            return Err(ConfigError::invalid("player.start_*", "starting stats must be at least 1"));
        }
        if s.move_speed > self.caps.move_speed || s.bomb_range > self.caps.bomb_range || s.max_bombs > self.caps.max_bombs {
            return Err(ConfigError::invalid("player.max_*_cap", "caps must not be below starting stats"));
        }
        for c in Character::ALL {
            let spec = self.skills.get(c);
            if spec.magnitude == 0 || spec.duration_ticks == 0 {
                return Err(ConfigError::invalid(
                    "skills",
                    format!("{} needs magnitude and duration_ticks of at least 1", c.name()),
                ));
            }
            if spec.magnitude > MAX_SKILL_MAGNITUDE {
                return Err(ConfigError::invalid(
                    "skills",
                    format!("{} magnitude {} exceeds {MAX_SKILL_MAGNITUDE}", c.name(), spec.magnitude),
                ));
            }
        }
        // Fastest reachable speed: capped base stat under a Runner boost
        let peak = self.caps.move_speed.saturating_mul(self.skills.runner.magnitude) as f32 * self.speed_unit;
        if peak >= 1.0 {
            return Err(ConfigError::invalid(
                "player.max_speed_cap",
                format!("peak speed {peak} tiles per tick must stay below one tile"),
            ));
        }
        if let Arena::Generated { rows, cols, block_density } = self.arena {
            if rows < MIN_SIDE || cols < MIN_SIDE {
                return Err(ConfigError::invalid("map", format!("{rows}x{cols} is below {MIN_SIDE}x{MIN_SIDE}")));
            }
            // Even sizes would put the far spawn on a pillar
            if rows % 2 == 0 || cols % 2 == 0 {
                return Err(ConfigError::invalid("map", "generated arenas need odd rows and cols"));
            }
            if !(0.0..=1.0).contains(&block_density) {
                return Err(ConfigError::invalid("map.block_density", "must be in 0..=1"));
            }
        }
        Ok(())
    }
}

/// Candidate directories to search: exe dir + CWD + data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/blastarena");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn resolve_dir(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(name);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter().map(|d| d.join(name)).find(|p| p.is_dir()).unwrap_or(p)
}

fn resolve_file(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(name);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter().map(|d| d.join(name)).find(|p| p.is_file()).unwrap_or(p)
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match read_toml(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    log::warn!("{e}; using default settings");
                    return TomlConfig::default();
                }
            }
        }
    }
    TomlConfig::default()
}

fn read_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    Ok(toml::from_str(&text)?)
}
