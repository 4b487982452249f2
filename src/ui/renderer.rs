/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each map tile is two terminal columns. The left column is the tile
/// itself, the right one carries horizontal pipe links to the neighbour.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::drill::DrillMotion;
use crate::domain::tile::{CellKind, Direction, TileCoord};
use crate::domain::tilemap::{EnemyKind, TileMap};
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 18, g: 14, b: 10 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell, so every position gets repainted.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Pipe rasterization ──

/// Tiles the pipe passes through, anchor first, consecutive duplicates removed.
pub fn pipe_tiles(map: &TileMap, points: &[glam::Vec2]) -> Vec<TileCoord> {
    let mut tiles: Vec<TileCoord> = vec![];
    let mut push = |t: TileCoord| {
        if tiles.last() != Some(&t) {
            tiles.push(t);
        }
    };
    let Some(first) = points.first().and_then(|p| map.pixel_to_tile(*p)) else {
        return vec![];
    };
    push(first);
    for w in points.windows(2) {
        let (Some(a), Some(b)) = (map.pixel_to_tile(w[0]), map.pixel_to_tile(w[1])) else {
            continue;
        };
        let (dx, dy) = ((b.x - a.x).signum(), (b.y - a.y).signum());
        let mut t = a;
        while t != b {
            t = TileCoord::new(t.x + dx, t.y + dy);
            push(t);
        }
    }
    tiles
}

/// Two-column glyph for a pipe tile linked toward `links`.
fn pipe_glyph(links: &[Direction]) -> (char, char) {
    let has = |d: Direction| links.contains(&d);
    let right = if has(Direction::Right) { '═' } else { ' ' };
    let left_col = match (has(Direction::Up), has(Direction::Down), has(Direction::Left), has(Direction::Right)) {
        (true, true, _, _) => '║',
        (true, false, true, _) => '╝',
        (true, false, false, true) => '╚',
        (false, true, true, _) => '╗',
        (false, true, false, true) => '╔',
        (true, false, false, false) | (false, true, false, false) => '║',
        _ => '═',
    };
    (left_col, right)
}

fn head_glyph(facing: Direction) -> char {
    match facing {
        Direction::Up => '▲',
        Direction::Down => '▼',
        Direction::Left => '◀',
        Direction::Right => '▶',
    }
}

// ── Renderer ──

const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 50, g: 35, b: 15 };
const ROCK_FG: Color = Color::Rgb { r: 120, g: 90, b: 60 };
const ROCK_BG: Color = Color::Rgb { r: 70, g: 50, b: 30 };
const PIPE_FG: Color = Color::Rgb { r: 170, g: 170, b: 190 };
const HEAD_FG: Color = Color::Rgb { r: 255, g: 210, b: 40 };

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
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_game(world);
        match world.phase {
            Phase::Playing if world.paused => self.compose_banner(world, "PAUSED", "P / F1: resume", HEAD_FG),
            Phase::Playing => {}
            Phase::LevelComplete => {
                let sub = format!("Score {}   ENTER: next level", world.score);
                self.compose_banner(world, "LEVEL CLEAR", &sub, Color::Rgb { r: 80, g: 255, b: 80 });
            }
            Phase::GameOver => {
                let sub = format!("Final score {}   ENTER: play again", world.score);
                self.compose_banner(world, "GAME OVER", &sub, Color::Rgb { r: 255, g: 60, b: 60 });
            }
            Phase::GameComplete => {
                let sub = format!("All {} levels dug! Score {}   ENTER: again", world.total_levels, world.score);
                self.compose_banner(world, "YOU WIN", &sub, HEAD_FG);
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        let map = &w.map;

        // ── HUD row ──
        let state = match w.drill.motion() {
            DrillMotion::Retracting => "RETRACT",
            DrillMotion::Docked => "DOCKED",
            _ => "",
        };
        let hud = format!(
            " Lv.{:<2} Score:{:<7} Lives:{}  Time:{:>3}  Pellets:{:<3} {} ",
            w.current_level + 1,
            w.score,
            w.lives,
            w.time_left.ceil() as u32,
            map.remaining_pellets(),
            state,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Tiles ──
        let pulse = (map.anim_time() * 2.0) as u32 % 2 == 0;
        for ty in 0..map.height() as i32 {
            for tx in 0..map.width() as i32 {
                let t = TileCoord::new(tx, ty);
                let (c0, c1, fg, bg) = match map.tile_at(t) {
                    Some(CellKind::Wall) => ('▓', '▓', ROCK_FG, ROCK_BG),
                    Some(CellKind::Pellet) => {
                        let fg = if pulse { Color::Rgb { r: 255, g: 240, b: 150 } } else { Color::Rgb { r: 190, g: 170, b: 90 } };
                        ('•', ' ', fg, Color::Reset)
                    }
                    _ => (' ', ' ', Color::White, Color::Reset),
                };
                self.put_tile(t, c0, c1, fg, bg);
            }
        }

        // ── Well mouth ──
        let entry = map.entry_tile();
        self.put_tile(entry, '▽', ' ', PIPE_FG, Color::Reset);

        // ── Pipe ──
        let tiles = pipe_tiles(map, w.drill.pipe().points());
        for (i, t) in tiles.iter().enumerate() {
            let mut links = vec![];
            if i == 0 {
                links.push(Direction::Up);
            }
            for n in [i.checked_sub(1), Some(i + 1)].into_iter().flatten() {
                if let Some(o) = tiles.get(n) {
                    if let Some(d) = Direction::from_delta(o.x - t.x, o.y - t.y) {
                        links.push(d);
                    }
                }
            }
            let (c0, c1) = pipe_glyph(&links);
            self.put_tile(*t, c0, c1, PIPE_FG, Color::Reset);
        }

        // ── Enemies ──
        for e in w.enemies.iter().filter(|e| e.is_active()) {
            if let Some(t) = map.pixel_to_tile(e.position()) {
                let (ch, fg) = match e.kind() {
                    EnemyKind::Destructible => ('●', Color::Rgb { r: 90, g: 220, b: 90 }),
                    EnemyKind::Hazardous => ('✖', Color::Rgb { r: 255, g: 70, b: 70 }),
                };
                self.put_left(t, ch, fg);
            }
        }

        // ── Drill head ──
        if let Some(t) = map.pixel_to_tile(w.drill.position()) {
            self.put_left(t, head_glyph(w.drill.facing()), HEAD_FG);
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + map.height() + 1;
        if !w.message.is_empty() {
            let bg = Color::Rgb { r: 200, g: 160, b: 50 };
            self.front.fill_row(msg_row, bg);
            self.front.put_str(0, msg_row, &format!(" {} ", w.message), Color::Black, bg);
        }

        // ── Help bar ──
        let help = " Arrows/WASD: dig   SPACE (hold): retract   P: pause   F2: restart   ESC: quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Color::Reset);
    }

    fn put_tile(&mut self, t: TileCoord, c0: char, c1: char, fg: Color, bg: Color) {
        let col = t.x as usize * CELL_W;
        let row = MAP_ROW + t.y as usize;
        self.front.set(col, row, Cell::new(c0, fg, bg));
        self.front.set(col + 1, row, Cell::new(c1, fg, bg));
    }

    /// Overwrite only the tile's main column, keeping its background.
    fn put_left(&mut self, t: TileCoord, ch: char, fg: Color) {
        let col = t.x as usize * CELL_W;
        let row = MAP_ROW + t.y as usize;
        let bg = self.front.get(col, row).bg;
        self.front.set(col, row, Cell::new(ch, fg, bg));
    }

    /// Boxed two-line banner centred over the map.
    fn compose_banner(&mut self, w: &WorldState, title: &str, sub: &str, color: Color) {
        let map_cols = w.map.width() * CELL_W;
        let inner = title.chars().count().max(sub.chars().count()) + 4;
        let x = map_cols.saturating_sub(inner + 2) / 2;
        let y = MAP_ROW + w.map.height().saturating_sub(4) / 2;
        let bg = Color::Rgb { r: 30, g: 30, b: 30 };

        let bar = "═".repeat(inner);
        self.front.put_str(x, y, &format!("╔{bar}╗"), color, bg);
        self.front.put_str(x, y + 1, &format!("║{:^inner$}║", title), color, bg);
        self.front.put_str(x, y + 2, &format!("║{:^inner$}║", sub), Color::White, bg);
        self.front.put_str(x, y + 3, &format!("╚{bar}╝"), color, bg);
    }
}
