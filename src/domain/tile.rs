/// Tile kinds, tile coordinates and the four drilling directions.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CellKind {
    Wall,
    #[default]
    Open,
    Pellet,
}

impl CellKind {
    /// Can the drill or an enemy occupy this cell?
    pub fn is_passable(self) -> bool {
        matches!(self, CellKind::Open | CellKind::Pellet)
    }

    pub fn is_pellet(self) -> bool {
        matches!(self, CellKind::Pellet)
    }
}

/// Passability of a lookup result: out-of-bounds (`None`) is never passable.
#[inline]
pub fn is_passable(kind: Option<CellKind>) -> bool {
    kind.map_or(false, CellKind::is_passable)
}

/// Grid coordinate. Signed so that neighbours of edge tiles can be
/// expressed and then rejected by bounds checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        TileCoord { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        TileCoord { x: self.x + dx, y: self.y + dy }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Grid delta; +y points down.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Inverse of `delta`. Anything that is not a unit axis vector is `None`.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn unit(self) -> glam::Vec2 {
        let (dx, dy) = self.delta();
        glam::Vec2::new(dx as f32, dy as f32)
    }

    /// Facing angle in radians for renderers (0 = right, +π/2 = down).
    pub fn angle(self) -> f32 {
        match self {
            Direction::Right => 0.0,
            Direction::Down => std::f32::consts::FRAC_PI_2,
            Direction::Left => std::f32::consts::PI,
            Direction::Up => -std::f32::consts::FRAC_PI_2,
        }
    }
}
