/// The drill: tile-locked tunnelling with smooth in-between motion.
///
/// ## Motion states
///
/// ```text
///   Docked ──(down)──▶ Dropping(t) ──arrive──▶ Idle ◀──arrive── MovingTo(t)
///     ▲                                          │  └──(dir ok)──────▲
///     │                                          ▼
///     └────────── anchor reached ◀──────── Retracting ──(release)──▶ Idle
/// ```
///
/// A destination tile exists only in `Dropping` / `MovingTo`; while one is
/// set the off-axis coordinate is pinned to the tile-center line, so the
/// head never moves diagonally.
///
/// ## Direction acceptance
/// A direction is taken only if ALL hold:
///   - it is not the reverse of the last committed direction
///   - the target tile is on the grid and passable
///   - the target tile is not already in the trail
///
/// The buffered press (`pending`) is tried before the held key
/// (`intent`). A press survives until it is applied or replaced.
///
/// ## Retraction
/// The pipe is wound back from the head at a speed that grows with the
/// square of how long retract has been held, capped at
/// `1 + retract_max_bonus` times the base speed. Reaching the anchor docks
/// the drill and clears the trail.

use std::collections::HashSet;

use glam::Vec2;
use tracing::debug;

use crate::config::{DrillConfig, RetractHold};
use super::geom::point_segment_distance;
use super::pipe::PathPipe;
use super::tile::{Direction, TileCoord};
use super::tilemap::{TileGeometry, TileMap};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DrillMotion {
    /// In the well, nothing dug.
    Docked,
    /// Forced first move straight down out of the well.
    Dropping(TileCoord),
    MovingTo(TileCoord),
    /// Resting on the current tile, waiting for a direction.
    Idle,
    Retracting,
}

impl DrillMotion {
    pub fn destination(self) -> Option<TileCoord> {
        match self {
            DrillMotion::Dropping(t) | DrillMotion::MovingTo(t) => Some(t),
            _ => None,
        }
    }
}

/// Emitted by the drill, drained by the caller after `update`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DrillEvent {
    PelletCollected { x: i32, y: i32 },
    RetractStarted,
    RetractStopped,
    Docked,
}

/// Step length for one retract tick after `held` seconds of holding.
pub fn retract_step_distance(config: &DrillConfig, held: f32, dt: f32) -> f32 {
    let held = held.max(0.0);
    let bonus = (config.retract_accel * held * held).min(config.retract_max_bonus);
    config.retract_speed * (1.0 + bonus) * dt
}

#[derive(Clone, Debug)]
pub struct DrillController {
    config: DrillConfig,
    geometry: TileGeometry,
    anchor: Vec2,
    entry: TileCoord,

    pos: Vec2,
    tile: TileCoord,
    motion: DrillMotion,
    facing: Direction,
    last_forward: Option<Direction>,

    /// Tiles dug since the last full retraction, in order.
    trail: Vec<TileCoord>,
    visited: HashSet<TileCoord>,

    pending: Option<Direction>,
    intent: Option<Direction>,
    retract_held: f32,

    pipe: PathPipe,
    events: Vec<DrillEvent>,
}

// ── Construction ──

impl DrillController {
    /// A fresh, docked drill. `anchor` is the well mouth and should sit on
    /// the entry tile's vertical center line.
    pub fn new(map: &TileMap, anchor: Vec2, entry: TileCoord, config: DrillConfig) -> Self {
        let mut visited = HashSet::new();
        visited.insert(entry);
        DrillController {
            config,
            geometry: map.geometry(),
            anchor,
            entry,
            pos: anchor,
            tile: entry,
            motion: DrillMotion::Docked,
            facing: Direction::Down,
            last_forward: None,
            trail: vec![entry],
            visited,
            pending: None,
            intent: None,
            retract_held: 0.0,
            pipe: PathPipe::new(anchor),
            events: vec![],
        }
    }
}

// ── Queries (render surface) ──

impl DrillController {
    pub fn position(&self) -> Vec2 {
        self.pos
    }

    pub fn tile(&self) -> TileCoord {
        self.tile
    }

    pub fn motion(&self) -> DrillMotion {
        self.motion
    }

    pub fn destination(&self) -> Option<TileCoord> {
        self.motion.destination()
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn facing_angle(&self) -> f32 {
        self.facing.angle()
    }

    pub fn last_forward(&self) -> Option<Direction> {
        self.last_forward
    }

    pub fn pipe(&self) -> &PathPipe {
        &self.pipe
    }

    pub fn trail(&self) -> &[TileCoord] {
        &self.trail
    }

    pub fn has_visited(&self, t: TileCoord) -> bool {
        self.visited.contains(&t)
    }

    pub fn is_docked(&self) -> bool {
        self.motion == DrillMotion::Docked
    }

    pub fn is_retracting(&self) -> bool {
        self.motion == DrillMotion::Retracting
    }

    pub fn retract_held(&self) -> f32 {
        self.retract_held
    }

    pub fn entry_tile(&self) -> TileCoord {
        self.entry
    }

    /// Current velocity in px/s. Zero unless heading for a tile.
    pub fn velocity(&self) -> Vec2 {
        match self.motion {
            DrillMotion::Dropping(_) | DrillMotion::MovingTo(_) => self.facing.unit() * self.config.speed,
            _ => Vec2::ZERO,
        }
    }

    pub fn drain_events(&mut self) -> Vec<DrillEvent> {
        std::mem::take(&mut self.events)
    }
}

// ── Input ──

impl DrillController {
    /// Directional key edge. A non-zero axis vector becomes both the
    /// buffered press and the held intent; `(0, 0)` releases the intent.
    /// Ignored while retracting.
    pub fn set_direction(&mut self, dx: i32, dy: i32) {
        if self.is_retracting() {
            return;
        }
        if dx == 0 && dy == 0 {
            self.intent = None;
            return;
        }
        if let Some(dir) = Direction::from_delta(dx, dy) {
            if dx == 0 || dy == 0 {
                self.pending = Some(dir);
                self.intent = Some(dir);
            }
        }
    }

    /// Release of one specific key: clears the intent only if it was that key.
    pub fn release_direction(&mut self, dir: Direction) {
        if self.intent == Some(dir) {
            self.intent = None;
        }
    }

    /// Begin winding the pipe back. No-op (false) when nothing is dug.
    pub fn start_retract(&mut self) -> bool {
        if self.pipe.is_anchored_only() || self.is_retracting() {
            return false;
        }
        self.pending = None;
        self.intent = None;
        self.pipe.set_head(self.pos);
        if self.config.retract_hold == RetractHold::Reset {
            self.retract_held = 0.0;
        }
        self.motion = DrillMotion::Retracting;
        self.events.push(DrillEvent::RetractStarted);
        debug!(tile = ?self.tile, points = self.pipe.len(), "retract started");
        true
    }

    /// Release retract: freeze where the head is and hand control back.
    pub fn stop_retract(&mut self) {
        if !self.is_retracting() {
            return;
        }
        self.events.push(DrillEvent::RetractStopped);
        // Still inside the well: the only way out is the drop again.
        if self.tile_under(self.pos) == self.entry {
            self.pipe = PathPipe::new(self.anchor);
            self.dock();
            return;
        }
        self.tile = self.tile_under(self.pos);
        match self.trail.iter().rposition(|t| *t == self.tile) {
            Some(i) => {
                for t in self.trail.drain(i + 1..) {
                    self.visited.remove(&t);
                }
            }
            None => {
                // Head is off the dug path; fall back to the last dug tile.
                if let Some(&last) = self.trail.last() {
                    self.tile = last;
                }
            }
        }
        self.last_forward = self.pipe.terminal_direction();
        if let Some(dir) = self.last_forward {
            self.facing = dir;
        }
        if self.config.retract_hold == RetractHold::Reset {
            self.retract_held = 0.0;
        }
        self.motion = DrillMotion::Idle;
        debug!(tile = ?self.tile, held = self.retract_held, "retract released");
    }

    fn tile_under(&self, p: Vec2) -> TileCoord {
        let local = (p - self.geometry.offset) / self.geometry.size;
        TileCoord::new(local.x.floor() as i32, local.y.floor() as i32)
    }
}

// ── Per-frame update ──

impl DrillController {
    pub fn update(&mut self, map: &mut TileMap, dt: f32) {
        if self.is_retracting() {
            self.update_retract(dt);
            return;
        }

        match self.motion {
            DrillMotion::Docked => {
                self.pos = self.anchor;
                self.try_drop(map);
            }
            DrillMotion::Idle => {
                let center = map.tile_center(self.tile);
                if self.pos.distance(center) <= self.config.snap_epsilon {
                    self.pos = center;
                    self.pipe.set_head(center);
                }
                self.try_directions(map);
            }
            _ => {}
        }

        if let Some(dest) = self.motion.destination() {
            self.advance(map, dest, dt);
        }
    }

    /// Ask for an immediate turn. Only an idle drill can turn; returns
    /// whether the move was started.
    pub fn try_turn(&mut self, map: &TileMap, dir: Direction) -> bool {
        if self.motion != DrillMotion::Idle {
            return false;
        }
        match self.accepts(map, dir) {
            Some(target) => {
                self.begin_move(map, dir, target, DrillMotion::MovingTo(target));
                true
            }
            None => false,
        }
    }

    /// Target tile for `dir`, or `None` if the move is illegal.
    fn accepts(&self, map: &TileMap, dir: Direction) -> Option<TileCoord> {
        if self.last_forward == Some(dir.opposite()) {
            return None;
        }
        let target = self.tile.step(dir);
        if !map.is_passable_at(target) || self.visited.contains(&target) {
            return None;
        }
        Some(target)
    }

    fn try_drop(&mut self, map: &TileMap) {
        let wants_down = self.pending == Some(Direction::Down) || self.intent == Some(Direction::Down);
        if !wants_down {
            return;
        }
        let target = self.tile.step(Direction::Down);
        if !map.is_passable_at(target) || self.visited.contains(&target) {
            return;
        }
        if self.pending == Some(Direction::Down) {
            self.pending = None;
        }
        self.begin_move(map, Direction::Down, target, DrillMotion::Dropping(target));
        debug!(target = ?target, "drill dropping out of the well");
    }

    /// Pending press first, then the held intent.
    fn try_directions(&mut self, map: &TileMap) -> bool {
        if let Some(dir) = self.pending {
            if self.try_turn(map, dir) {
                self.pending = None;
                return true;
            }
        }
        if let Some(dir) = self.intent {
            if self.try_turn(map, dir) {
                return true;
            }
        }
        false
    }

    fn begin_move(&mut self, map: &TileMap, dir: Direction, target: TileCoord, motion: DrillMotion) {
        // Pin the cross axis before opening the leg so a corner lands
        // exactly on the tile center.
        let center = map.tile_center(self.tile);
        if dir.is_horizontal() {
            self.pos.y = center.y;
        } else {
            self.pos.x = center.x;
        }
        self.pipe.set_head(self.pos);
        self.pipe.extend_toward(map.tile_center(target));

        self.facing = dir;
        self.last_forward = Some(dir);
        self.trail.push(target);
        self.visited.insert(target);
        self.motion = motion;
    }

    fn advance(&mut self, map: &mut TileMap, dest: TileCoord, dt: f32) {
        let target = map.tile_center(dest);
        if self.facing.is_horizontal() {
            self.pos.y = target.y;
        } else {
            self.pos.x = target.x;
        }

        let remaining = self.pos.distance(target);
        let travel = self.config.speed * dt;
        if remaining <= travel {
            self.pos = target;
            self.pipe.set_head(target);
            self.arrive(map, dest);
            // Chain straight into the next leg: no idle frame between tiles.
            self.try_directions(map);
        } else {
            self.pos += (target - self.pos) / remaining * travel;
            self.pipe.set_head(self.pos);
        }
    }

    fn arrive(&mut self, map: &mut TileMap, dest: TileCoord) {
        self.tile = dest;
        self.motion = DrillMotion::Idle;
        if map.collect_pellet_at(dest) {
            self.events.push(DrillEvent::PelletCollected { x: dest.x, y: dest.y });
        }
    }

    fn update_retract(&mut self, dt: f32) {
        self.retract_held += dt;
        let step = retract_step_distance(&self.config, self.retract_held, dt);
        self.pipe.retract_step(step);
        self.pos = self.pipe.head();
        if let Some(dir) = self.pipe.terminal_direction() {
            self.facing = dir;
        }
        if self.pipe.is_anchored_only() {
            self.dock();
        }
    }

    fn dock(&mut self) {
        self.motion = DrillMotion::Docked;
        self.pos = self.anchor;
        self.tile = self.entry;
        self.trail.clear();
        self.trail.push(self.entry);
        self.visited.clear();
        self.visited.insert(self.entry);
        self.last_forward = None;
        self.facing = Direction::Down;
        self.retract_held = 0.0;
        self.events.push(DrillEvent::Docked);
        debug!("drill docked");
    }
}

// ── Collision geometry ──

impl DrillController {
    /// Does a circle at `point` touch the drill head?
    ///
    /// The head is a circle at the drill position plus a tip capsule
    /// reaching `tip_length` ahead along the facing axis.
    pub fn collides_with_head(&self, point: Vec2, radius: f32) -> bool {
        if self.is_docked() {
            return false;
        }
        if self.pos.distance(point) <= radius + self.config.head_radius {
            return true;
        }
        let tip = self.pos + self.facing.unit() * self.config.tip_length;
        point_segment_distance(point, self.pos, tip) <= radius + self.config.tip_radius
    }

    pub fn pipe_radius(&self) -> f32 {
        self.config.pipe_radius
    }
}
