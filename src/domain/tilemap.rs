/// The static tile grid: walls, open tunnel space and pellets.
///
/// ## Layout legend
///   '#' = Wall             '.' = Pellet           ' ' = Open
///   'W' = Entry tile (Open)
///   'E' = Destructible spawn, lane patrol    'e' = ... reciprocating
///   'X' = Hazardous spawn, lane patrol       'x' = ... reciprocating
///
/// Spawn markers are consumed here: the cell becomes Open and a
/// `SpawnPoint` is recorded. They are never a tile kind.
///
/// ## Coordinates
/// Tile (tx, ty) covers pixels `[offset + t*size, offset + (t+1)*size)`.
/// Its center is `offset + (t + 0.5) * size`. Offset and size never change.
///
/// The only mutation after construction is pellet collection.

use glam::Vec2;
use thiserror::Error;

use super::tile::{CellKind, TileCoord};

/// Shortest horizontal run that counts as a patrol lane.
pub const MIN_LANE_TILES: i32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has no rows")]
    Empty,
    #[error("layout is {found_w}x{found_h}, expected {expected_w}x{expected_h}")]
    DimensionMismatch {
        expected_w: usize,
        expected_h: usize,
        found_w: usize,
        found_h: usize,
    },
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("unknown layout symbol {symbol:?} at ({x}, {y})")]
    UnknownSymbol { symbol: char, x: usize, y: usize },
    #[error("no passable entry tile in the top row")]
    NoEntry,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyKind {
    /// Dies when the drill head touches it; worth points.
    Destructible,
    /// Touching it with the head costs a life.
    Hazardous,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PatrolStyle {
    /// Crosses the lane edge to edge, leaves, respawns later.
    Lane,
    /// Bounces between walls, never leaves on its own.
    Reciprocating,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpawnPoint {
    pub tile: TileCoord,
    pub kind: EnemyKind,
    pub style: PatrolStyle,
}

/// A horizontal run of passable tiles on one row.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Lane {
    pub row: i32,
    pub first: i32,
    pub last: i32,
    /// Pixel y of the row's tile centers.
    pub center_y: f32,
    /// Left edge of `first`, right edge of `last`, in pixels.
    pub min_x: f32,
    pub max_x: f32,
}

impl Lane {
    pub fn len(&self) -> i32 {
        self.last - self.first + 1
    }

    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.y == self.row && tile.x >= self.first && tile.x <= self.last
    }
}

/// Pixel placement of the grid.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TileGeometry {
    pub size: f32,
    pub offset: Vec2,
}

impl TileGeometry {
    pub fn new(size: f32) -> Self {
        TileGeometry { size, offset: Vec2::ZERO }
    }
}

impl Default for TileGeometry {
    fn default() -> Self {
        TileGeometry::new(16.0)
    }
}

#[derive(Clone, Debug)]
pub struct TileMap {
    cells: Vec<Vec<CellKind>>,
    width: usize,
    height: usize,
    geometry: TileGeometry,
    entry: TileCoord,
    pellet_count: usize,
    spawns: Vec<SpawnPoint>,
    lanes: Vec<Lane>,
    /// Cosmetic clock for pellet pulsing; no gameplay effect.
    anim_time: f32,
}

// ── Construction ──

impl TileMap {
    /// Build a map of exactly `width` x `height` from layout rows.
    pub fn new(width: usize, height: usize, rows: &[&str], geometry: TileGeometry) -> Result<Self, LayoutError> {
        let found_h = rows.len();
        let found_w = rows.first().map_or(0, |r| r.chars().count());
        if found_h != height || found_w != width {
            return Err(LayoutError::DimensionMismatch {
                expected_w: width,
                expected_h: height,
                found_w,
                found_h,
            });
        }
        TileMap::parse(rows, geometry)
    }

    /// Build a map sized by the layout itself. All rows must be equally wide.
    pub fn parse(rows: &[&str], geometry: TileGeometry) -> Result<Self, LayoutError> {
        let height = rows.len();
        if height == 0 {
            return Err(LayoutError::Empty);
        }
        let width = rows[0].chars().count();
        if width == 0 {
            return Err(LayoutError::Empty);
        }

        let mut cells = vec![vec![CellKind::Open; width]; height];
        let mut spawns = vec![];
        let mut marked_entry = None;
        let mut pellet_count = 0;

        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(LayoutError::Ragged { row: y, expected: width, found });
            }
            for (x, ch) in row.chars().enumerate() {
                let tile = TileCoord::new(x as i32, y as i32);
                cells[y][x] = match ch {
                    '#' => CellKind::Wall,
                    ' ' => CellKind::Open,
                    '.' => {
                        pellet_count += 1;
                        CellKind::Pellet
                    }
                    'W' => {
                        marked_entry.get_or_insert(tile);
                        CellKind::Open
                    }
                    'E' | 'e' | 'X' | 'x' => {
                        let kind = if ch.eq_ignore_ascii_case(&'E') {
                            EnemyKind::Destructible
                        } else {
                            EnemyKind::Hazardous
                        };
                        let style = if ch.is_ascii_uppercase() {
                            PatrolStyle::Lane
                        } else {
                            PatrolStyle::Reciprocating
                        };
                        spawns.push(SpawnPoint { tile, kind, style });
                        CellKind::Open
                    }
                    other => return Err(LayoutError::UnknownSymbol { symbol: other, x, y }),
                };
            }
        }

        let entry = match marked_entry {
            Some(t) => t,
            None => find_entry(&cells[0]).ok_or(LayoutError::NoEntry)?,
        };

        let mut map = TileMap {
            cells,
            width,
            height,
            geometry,
            entry,
            pellet_count,
            spawns,
            lanes: vec![],
            anim_time: 0.0,
        };
        map.lanes = map.derive_lanes(MIN_LANE_TILES);
        Ok(map)
    }

    /// Horizontal passable runs of at least `min_len` tiles, row by row.
    fn derive_lanes(&self, min_len: i32) -> Vec<Lane> {
        let mut lanes = vec![];
        for y in 0..self.height as i32 {
            let mut x = 0;
            while x < self.width as i32 {
                if !self.is_passable_at(TileCoord::new(x, y)) {
                    x += 1;
                    continue;
                }
                let first = x;
                while x < self.width as i32 && self.is_passable_at(TileCoord::new(x, y)) {
                    x += 1;
                }
                let lane = self.make_lane(y, first, x - 1);
                if lane.len() >= min_len {
                    lanes.push(lane);
                }
            }
        }
        lanes
    }

    fn make_lane(&self, row: i32, first: i32, last: i32) -> Lane {
        let size = self.geometry.size;
        let off = self.geometry.offset;
        Lane {
            row,
            first,
            last,
            center_y: off.y + (row as f32 + 0.5) * size,
            min_x: off.x + first as f32 * size,
            max_x: off.x + (last + 1) as f32 * size,
        }
    }
}

/// Passable top-row tile closest to the centre column (left wins ties).
fn find_entry(top_row: &[CellKind]) -> Option<TileCoord> {
    let center = (top_row.len() as i32 - 1) / 2;
    top_row.iter()
        .enumerate()
        .filter(|(_, k)| k.is_passable())
        .min_by_key(|(x, _)| ((*x as i32 - center).abs(), *x))
        .map(|(x, _)| TileCoord::new(x as i32, 0))
}

// ── Queries ──

impl TileMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    pub fn entry_tile(&self) -> TileCoord {
        self.entry
    }

    pub fn spawns(&self) -> &[SpawnPoint] {
        &self.spawns
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn anim_time(&self) -> f32 {
        self.anim_time
    }

    pub fn in_bounds(&self, t: TileCoord) -> bool {
        t.x >= 0 && t.y >= 0 && (t.x as usize) < self.width && (t.y as usize) < self.height
    }

    /// Cell at `t`; `None` outside the grid.
    #[inline]
    pub fn tile_at(&self, t: TileCoord) -> Option<CellKind> {
        if self.in_bounds(t) {
            Some(self.cells[t.y as usize][t.x as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn is_passable_at(&self, t: TileCoord) -> bool {
        super::tile::is_passable(self.tile_at(t))
    }

    /// Tile containing pixel `(x, y)`; `None` outside the grid.
    pub fn pixel_to_tile(&self, p: Vec2) -> Option<TileCoord> {
        let local = (p - self.geometry.offset) / self.geometry.size;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let t = TileCoord::new(local.x.floor() as i32, local.y.floor() as i32);
        if self.in_bounds(t) { Some(t) } else { None }
    }

    /// Pixel center of a tile. Pure in the tile indices; works off-grid too.
    #[inline]
    pub fn tile_center(&self, t: TileCoord) -> Vec2 {
        self.geometry.offset
            + Vec2::new(t.x as f32 + 0.5, t.y as f32 + 0.5) * self.geometry.size
    }

    pub fn remaining_pellets(&self) -> usize {
        self.pellet_count
    }

    /// The lane derived at load time that contains `t`, if any.
    pub fn lane_at(&self, t: TileCoord) -> Option<Lane> {
        self.lanes.iter().find(|l| l.contains(t)).copied()
    }
}

// ── Mutation ──

impl TileMap {
    /// Pellet → Open. Returns true only if a pellet was actually removed;
    /// repeated calls on the same tile are harmless no-ops.
    pub fn collect_pellet_at(&mut self, t: TileCoord) -> bool {
        if self.tile_at(t) != Some(CellKind::Pellet) {
            return false;
        }
        self.cells[t.y as usize][t.x as usize] = CellKind::Open;
        self.pellet_count -= 1;
        true
    }

    /// Cosmetic animation clock only.
    pub fn update(&mut self, dt: f32) {
        self.anim_time = (self.anim_time + dt) % 60.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(rows: &[&str]) -> TileMap {
        TileMap::parse(rows, TileGeometry::new(10.0)).unwrap()
    }

    #[test]
    fn parses_kinds_and_counts_pellets() {
        let m = map(&[
            "# W #",
            "#...#",
            "#####",
        ]);
        assert_eq!(m.width(), 5);
        assert_eq!(m.height(), 3);
        assert_eq!(m.remaining_pellets(), 3);
        assert_eq!(m.tile_at(TileCoord::new(0, 0)), Some(CellKind::Wall));
        assert_eq!(m.tile_at(TileCoord::new(2, 1)), Some(CellKind::Pellet));
        assert_eq!(m.tile_at(TileCoord::new(2, 0)), Some(CellKind::Open));
        assert_eq!(m.entry_tile(), TileCoord::new(2, 0));
    }

    #[test]
    fn out_of_bounds_is_none_and_impassable() {
        let m = map(&["   "]);
        assert_eq!(m.tile_at(TileCoord::new(-1, 0)), None);
        assert_eq!(m.tile_at(TileCoord::new(3, 0)), None);
        assert_eq!(m.tile_at(TileCoord::new(0, 1)), None);
        assert!(!m.is_passable_at(TileCoord::new(0, 5)));
    }

    #[test]
    fn entry_defaults_to_passable_top_tile_nearest_center() {
        let m = map(&[
            "## ###",
            "      ",
        ]);
        assert_eq!(m.entry_tile(), TileCoord::new(2, 0));

        let m = map(&[
            "###### ",
            "       ",
        ]);
        assert_eq!(m.entry_tile(), TileCoord::new(6, 0));
    }

    #[test]
    fn no_entry_is_an_error() {
        let err = TileMap::parse(&["###", "   "], TileGeometry::default()).unwrap_err();
        assert_eq!(err, LayoutError::NoEntry);
    }

    #[test]
    fn layout_errors() {
        assert_eq!(TileMap::parse(&[], TileGeometry::default()).unwrap_err(), LayoutError::Empty);
        assert_eq!(
            TileMap::parse(&["   ", "  "], TileGeometry::default()).unwrap_err(),
            LayoutError::Ragged { row: 1, expected: 3, found: 2 },
        );
        assert_eq!(
            TileMap::parse(&[" ? "], TileGeometry::default()).unwrap_err(),
            LayoutError::UnknownSymbol { symbol: '?', x: 1, y: 0 },
        );
        assert!(matches!(
            TileMap::new(4, 1, &["   "], TileGeometry::default()),
            Err(LayoutError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn spawn_markers_become_open_with_records() {
        let m = map(&[
            "  W  ",
            "E   x",
        ]);
        assert_eq!(m.tile_at(TileCoord::new(0, 1)), Some(CellKind::Open));
        assert_eq!(m.spawns().len(), 2);
        assert_eq!(m.spawns()[0].kind, EnemyKind::Destructible);
        assert_eq!(m.spawns()[0].style, PatrolStyle::Lane);
        assert_eq!(m.spawns()[1].kind, EnemyKind::Hazardous);
        assert_eq!(m.spawns()[1].style, PatrolStyle::Reciprocating);
    }

    #[test]
    fn pixel_tile_round_trip_and_bounds() {
        let m = TileMap::parse(&["   ", "   "], TileGeometry { size: 10.0, offset: Vec2::new(5.0, 20.0) }).unwrap();
        let c = m.tile_center(TileCoord::new(2, 1));
        assert_eq!(c, Vec2::new(30.0, 35.0));
        assert_eq!(m.pixel_to_tile(c), Some(TileCoord::new(2, 1)));
        assert_eq!(m.pixel_to_tile(Vec2::new(4.9, 25.0)), None);
        assert_eq!(m.pixel_to_tile(Vec2::new(35.0, 25.0)), None);
        assert_eq!(m.pixel_to_tile(Vec2::new(5.0, 20.0)), Some(TileCoord::new(0, 0)));
    }

    #[test]
    fn pellet_collection_is_idempotent() {
        let mut m = map(&[
            " W ",
            " . ",
        ]);
        let t = TileCoord::new(1, 1);
        assert_eq!(m.remaining_pellets(), 1);
        assert!(m.collect_pellet_at(t));
        assert!(!m.collect_pellet_at(t));
        assert_eq!(m.remaining_pellets(), 0);
        assert_eq!(m.tile_at(t), Some(CellKind::Open));
        // Open, wall and off-grid tiles are no-ops too.
        assert!(!m.collect_pellet_at(TileCoord::new(0, 0)));
        assert!(!m.collect_pellet_at(TileCoord::new(9, 9)));
        assert_eq!(m.remaining_pellets(), 0);
    }

    #[test]
    fn lanes_are_long_passable_runs() {
        let m = map(&[
            "# W ####",
            "#  .  ##",
            "##  #  #",
        ]);
        let lanes = m.lanes();
        // Row 2 only has two-tile runs.
        assert!(lanes.iter().any(|l| l.row == 0 && l.first == 1 && l.last == 3));
        assert!(lanes.iter().any(|l| l.row == 1 && l.first == 1 && l.last == 5));
        assert!(lanes.iter().all(|l| l.row != 2));

        let l = m.lane_at(TileCoord::new(4, 1)).unwrap();
        assert_eq!((l.first, l.last), (1, 5));
        assert!((l.min_x - 10.0).abs() < 1e-5);
        assert!((l.max_x - 60.0).abs() < 1e-5);
        assert!((l.center_y - 15.0).abs() < 1e-5);
        // Too short to be a lane, and a wall.
        assert!(m.lane_at(TileCoord::new(5, 2)).is_none());
        assert!(m.lane_at(TileCoord::new(0, 0)).is_none());
    }

    #[test]
    fn update_touches_only_cosmetics() {
        let mut m = map(&[" W ", " . "]);
        m.update(0.5);
        assert!((m.anim_time() - 0.5).abs() < 1e-6);
        assert_eq!(m.remaining_pellets(), 1);
    }
}
