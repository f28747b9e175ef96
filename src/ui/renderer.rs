/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The renderer only reads a `Snapshot`; it never touches the match.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use blastarena::domain::ability::{AbilityPhase, Character};
use blastarena::domain::entity::{BlastPart, ItemKind, PlayerId};
use blastarena::domain::grid::TilePos;
use blastarena::domain::input::Direction;
use blastarena::domain::tile::Tile;
use blastarena::sim::snapshot::{PlayerView, Snapshot};
use blastarena::sim::world::Outcome;

use super::Phase;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool, // occupies 2 terminal columns
    cont: bool, // right half of a wide char, never printed
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, also used
    /// for `Clear`, so row gaps on VTE terminals match the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 4],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Differs from any real cell, so every position gets diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch = [0; 4];
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::from_char(c, fg, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    /// Two-column glyph for one arena tile.
    fn put_pair(&mut self, col: usize, row: usize, glyph: (char, char), fg: Color, bg: Color) {
        self.set(col, row, Cell::from_char(glyph.0, fg, bg));
        self.set(col + 1, row, Cell::from_char(glyph.1, fg, bg));
    }

    fn put_wide(&mut self, col: usize, row: usize, c: char, bg: Color) {
        self.set(col, row, Cell::from_char_wide(c, Color::Reset, bg));
        self.set(col + 1, row, Cell::WIDE_CONT);
    }
}

// ── Screen model handed in by the game loop ──

/// Everything one frame needs besides the snapshot.
pub struct View<'a> {
    pub phase: Phase,
    pub paused: bool,
    pub snapshot: Option<&'a Snapshot>,
    /// Title screen arena list; the first entry is the generated arena.
    pub arenas: &'a [String],
    pub selected: usize,
    pub characters: [Character; 2],
    pub wins: [u32; 2],
    pub draws: u32,
    pub message: &'a str,
    /// Frame counter for blinking.
    pub anim_tick: u64,
}

// ── Renderer ──

/// Each arena tile is 2 terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 3;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const P1_COLOR: Color = Color::Rgb { r: 100, g: 200, b: 255 };
const P2_COLOR: Color = Color::Rgb { r: 255, g: 110, b: 110 };

/// Fuse below this blinks.
const FUSE_WARN_TICKS: u32 = 40;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, view: &View) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(view.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(view.phase);
        }

        self.front.clear();
        compose(&mut self.front, view);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Not ResetColor: the terminal default may differ from BASE_BG.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

// ══════════════════════════════════════════════════════════════
// Compose: build front buffer content
// ══════════════════════════════════════════════════════════════

fn compose(fb: &mut FrameBuffer, view: &View) {
    match (view.phase, view.snapshot) {
        (Phase::Title, _) | (_, None) => compose_title(fb, view),
        (Phase::Playing, Some(snap)) => {
            compose_game(fb, view, snap);
            if view.paused { compose_pause_overlay(fb, view, snap); }
        }
        (Phase::MatchOver, Some(snap)) => {
            compose_game(fb, view, snap);
            compose_match_over(fb, view, snap);
        }
    }
}

fn player_color(id: PlayerId) -> Color {
    match id {
        PlayerId::One => P1_COLOR,
        PlayerId::Two => P2_COLOR,
    }
}

fn skill_label(p: &PlayerView) -> String {
    match p.skill_phase {
        AbilityPhase::Active => format!("ACTIVE {:>3}", p.skill_remaining),
        AbilityPhase::Idle if p.skill_cooldown > 0 => format!("cd {:>4}", p.skill_cooldown),
        AbilityPhase::Idle => "READY".to_string(),
    }
}

/// One HUD line per player.
fn hud_line(p: &PlayerView, wins: u32) -> String {
    let state = if !p.alive {
        "  DOWN"
    } else if p.shield {
        "  [shield]"
    } else {
        ""
    };
    format!(
        " P{} {:<10} wins:{}  spd:{} rng:{} bombs:{}/{}  skill:{}{}",
        p.id.number(),
        p.character.name(),
        wins,
        p.stats.move_speed,
        p.stats.bomb_range,
        p.stats.max_bombs.saturating_sub(p.stats.active_bombs),
        p.stats.max_bombs,
        skill_label(p),
        state,
    )
}

fn compose_game(fb: &mut FrameBuffer, view: &View, snap: &Snapshot) {
    // ── HUD rows ──
    for (i, p) in snap.players.iter().enumerate() {
        let row = HUD_ROW + i;
        fb.fill_row(row, HUD_BG);
        fb.put_str(0, row, &hud_line(p, view.wins[p.id.index()]), player_color(p.id), HUD_BG);
    }
    let round = format!(" Round {}  draws:{} ", snap.round, view.draws);
    let rx = fb.width.saturating_sub(round.chars().count());
    fb.put_str(rx, HUD_ROW, &round, Color::White, HUD_BG);

    // ── Arena ──
    for r in 0..snap.rows {
        let row = MAP_ROW + r;
        if row >= fb.height { break; }
        for c in 0..snap.cols {
            let col = c * CELL_W;
            if col + 1 >= fb.width { break; }
            compose_cell(fb, view, snap, TilePos::new(r, c), col, row);
        }
    }

    // ── Message / help ──
    let msg_row = MAP_ROW + snap.rows + 1;
    if !view.message.is_empty() && msg_row < fb.height {
        fb.fill_row(msg_row, MSG_BG);
        fb.put_str(0, msg_row, &format!(" ◈ {} ", view.message), Color::Black, MSG_BG);
    }
    let help_row = MAP_ROW + snap.rows + 3;
    if help_row < fb.height {
        let help = " F1:Pause  F2:Restart  ESC:Title  │  Pad: A/X bomb  B/Y/R1 skill";
        fb.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }
}

/// Draw order, top first: player, explosion, bomb, item, tile.
fn compose_cell(fb: &mut FrameBuffer, view: &View, snap: &Snapshot, pos: TilePos, col: usize, row: usize) {
    let flame = snap.explosions.iter().find(|e| e.pos == pos);

    if let Some(p) = snap.players.iter().find(|p| p.alive && p.tile == pos) {
        let bg = if flame.is_some() { Color::Rgb { r: 120, g: 30, b: 0 } } else { Color::Reset };
        compose_player(fb, view, p, col, row, bg);
        return;
    }

    if let Some(e) = flame {
        let glyph = match e.part {
            BlastPart::Center => ('✹', '✹'),
            BlastPart::Arm(d) if d.is_horizontal() => ('═', '═'),
            BlastPart::Arm(_) => ('║', ' '),
        };
        // Fade as the flame dies.
        let fg = if e.remaining > 10 { Color::Rgb { r: 255, g: 240, b: 120 } } else { Color::Rgb { r: 255, g: 140, b: 40 } };
        fb.put_pair(col, row, glyph, fg, Color::Rgb { r: 160, g: 50, b: 0 });
        return;
    }

    if let Some(b) = snap.bombs.iter().find(|b| b.pos == pos) {
        let blink = b.fuse < FUSE_WARN_TICKS && (view.anim_tick / 3) % 2 == 0;
        let bg = if blink { Color::Rgb { r: 140, g: 0, b: 0 } } else { Color::Reset };
        fb.put_wide(col, row, '💣', bg);
        return;
    }

    if let Some(i) = snap.items.iter().find(|i| i.pos == pos) {
        // Blink during the last second on the ground.
        if i.remaining > 60 || (view.anim_tick / 4) % 2 == 0 {
            let (glyph, fg) = match i.kind {
                ItemKind::BombCountUp => (('B', '+'), Color::Rgb { r: 255, g: 120, b: 255 }),
                ItemKind::RangeUp => (('R', '+'), Color::Rgb { r: 255, g: 160, b: 60 }),
                ItemKind::SpeedUp => (('S', '+'), Color::Rgb { r: 120, g: 255, b: 160 }),
                ItemKind::Shield => (('<', '>'), Color::Rgb { r: 120, g: 200, b: 255 }),
            };
            fb.put_pair(col, row, glyph, fg, Color::Rgb { r: 40, g: 40, b: 70 });
            return;
        }
    }

    let (glyph, fg, bg) = match snap.cell(pos) {
        Tile::Empty => ((' ', ' '), Color::Reset, Color::Reset),
        Tile::Wall => (('█', '█'), Color::Rgb { r: 120, g: 120, b: 120 }, Color::Rgb { r: 70, g: 70, b: 70 }),
        Tile::Block => (('▒', '▒'), Color::Rgb { r: 180, g: 120, b: 60 }, Color::Rgb { r: 100, g: 65, b: 30 }),
    };
    fb.put_pair(col, row, glyph, fg, bg);
}

fn compose_player(fb: &mut FrameBuffer, view: &View, p: &PlayerView, col: usize, row: usize, bg: Color) {
    // Flicker while invulnerable after a broken shield.
    if p.invulnerable && (view.anim_tick / 2) % 2 == 0 {
        fb.put_pair(col, row, (' ', ' '), Color::Reset, bg);
        return;
    }
    let arrow = match p.facing {
        Direction::Up => '^',
        Direction::Down => 'v',
        Direction::Left => '<',
        Direction::Right => '>',
    };
    let fg = player_color(p.id);
    let bg = if p.shield { Color::Rgb { r: 30, g: 60, b: 110 } } else { bg };
    let digit = char::from_digit(p.id.number() as u32, 10).unwrap_or('?');
    let glyph = if p.skill_phase == AbilityPhase::Active { ('★', arrow) } else { (digit, arrow) };
    fb.put_pair(col, row, glyph, fg, bg);
}

// ── Static screens ──

fn compose_title(fb: &mut FrameBuffer, view: &View) {
    let title = [
        r"  ___  _             _      _                         ",
        r" | _ )| | __ _  ___ | |_   /_\   _ _  ___  _ _   __ _ ",
        r" | _ \| |/ _` |(_-< |  _| / _ \ | '_|/ -_)| ' \ / _` |",
        r" |___/|_|\__,_|/__/  \__|/_/ \_\|_|  \___||_||_|\__,_|",
    ];
    for (i, line) in title.iter().enumerate() {
        fb.put_str(2, 1 + i, line, ACCENT, Color::Reset);
    }

    let base = 7;
    fb.put_str(4, base, "Arena", Color::White, Color::Reset);
    for (i, name) in view.arenas.iter().enumerate() {
        let selected = i == view.selected;
        let marker = if selected { "▸ " } else { "  " };
        let fg = if selected { GOOD } else { Color::DarkGrey };
        fb.put_str(6, base + 1 + i, &format!("{marker}{name}"), fg, Color::Reset);
    }

    let chars_row = base + 2 + view.arenas.len();
    fb.put_str(4, chars_row, "Characters", Color::White, Color::Reset);
    for id in PlayerId::BOTH {
        let line = format!("  P{}  {:<10}  ({} to change)", id.number(), view.characters[id.index()].name(), id.number());
        fb.put_str(6, chars_row + 1 + id.index(), &line, player_color(id), Color::Reset);
    }

    let tally_row = chars_row + 4;
    if view.wins != [0, 0] || view.draws > 0 {
        let tally = format!("Score  P1 {}  :  {} P2   draws {}", view.wins[0], view.wins[1], view.draws);
        fb.put_str(4, tally_row, &tally, ACCENT, Color::Reset);
    }

    let help = [
        "Controls",
        "  ↑↓          choose arena      ENTER / Start  fight",
        "  1 / 2       change character  Q / ESC        quit",
        "  P1: WASD move, Space/F bomb, E/G skill",
        "  P2: arrows move, Enter/. bomb, / skill   (or gamepad)",
    ];
    let help_row = tally_row + 2;
    for (i, line) in help.iter().enumerate() {
        let fg = if i == 0 { ACCENT } else { Color::White };
        fb.put_str(4, help_row + i, line, fg, Color::Reset);
    }

    if !view.message.is_empty() {
        let msg_row = fb.height.saturating_sub(1);
        if msg_row > help_row + help.len() {
            fb.fill_row(msg_row, MSG_BG);
            fb.put_str(0, msg_row, &format!(" ◈ {} ", view.message), Color::Black, MSG_BG);
        }
    }
}

fn overlay_box(fb: &mut FrameBuffer, snap: &Snapshot, box_w: usize, box_h: usize) -> (usize, usize) {
    let view_cols = (snap.cols * CELL_W).max(box_w);
    let box_x = (view_cols - box_w) / 2;
    let box_y = MAP_ROW + snap.rows.saturating_sub(box_h) / 2;
    let dim = Color::Rgb { r: 40, g: 40, b: 40 };
    for y in box_y..box_y + box_h {
        for x in box_x..box_x + box_w {
            fb.set(x, y, Cell::from_char(' ', Color::Reset, dim));
        }
    }
    (box_x, box_y)
}

fn compose_match_over(fb: &mut FrameBuffer, view: &View, snap: &Snapshot) {
    let dim = Color::Rgb { r: 40, g: 40, b: 40 };
    let (x, y) = overlay_box(fb, snap, 28, 7);
    let (headline, fg) = match snap.outcome {
        Outcome::Player1Wins => ("PLAYER 1 WINS", P1_COLOR),
        Outcome::Player2Wins => ("PLAYER 2 WINS", P2_COLOR),
        Outcome::Draw => ("DRAW", ACCENT),
        Outcome::Ongoing => ("", Color::White),
    };
    let hx = x + (28usize.saturating_sub(headline.len())) / 2;
    fb.put_str(hx, y + 1, headline, fg, dim);
    let tally = format!("{}  :  {}", view.wins[0], view.wins[1]);
    fb.put_str(x + (28 - tally.len()) / 2, y + 3, &tally, Color::White, dim);
    fb.put_str(x + 2, y + 5, "ENTER next round  ESC title", GOOD, dim);
}

fn compose_pause_overlay(fb: &mut FrameBuffer, view: &View, snap: &Snapshot) {
    let dim = Color::Rgb { r: 40, g: 40, b: 40 };
    let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
    let (x, y) = overlay_box(fb, snap, 26, 7);
    let label = if (view.anim_tick / 8) % 2 == 0 { "▶  PAUSED  ◀" } else { "   PAUSED   " };
    fb.put_str(x + 7, y + 1, label, ACCENT, dim);
    fb.put_str(x + 2, y + 3, "F1  Resume", key_c, dim);
    fb.put_str(x + 2, y + 4, "F2  Restart round", key_c, dim);
    fb.put_str(x + 2, y + 5, "ESC Back to title", key_c, dim);
}
