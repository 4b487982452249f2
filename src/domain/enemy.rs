/// Roaming enemies.
///
/// Two movement styles:
///   - `Lane`: enters from one lane edge, crosses, leaves past the other
///     edge and goes inactive until a random respawn delay runs out.
///   - `Reciprocating`: bounces between the walls of its row and only goes
///     inactive when destroyed.
///
/// Enemies are never removed from the level. Each one owns a seeded RNG,
/// so a given seed always replays the same directions, speeds and delays.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::EnemyConfig;
use super::tilemap::{EnemyKind, Lane, PatrolStyle, SpawnPoint, TileMap};

#[derive(Clone, Debug)]
pub struct EnemyAgent {
    id: usize,
    kind: EnemyKind,
    style: PatrolStyle,
    /// Center of the spawn tile.
    home: Vec2,
    lane: Lane,
    config: EnemyConfig,

    pos: Vec2,
    dir: f32,
    speed: f32,
    active: bool,
    respawn_timer: f32,
    rng: StdRng,
}

impl EnemyAgent {
    /// New inactive enemy that appears after `initial_delay` seconds.
    pub fn new(
        id: usize,
        spawn: SpawnPoint,
        map: &TileMap,
        config: EnemyConfig,
        initial_delay: f32,
        seed: u64,
    ) -> Self {
        let home = map.tile_center(spawn.tile);
        let lane = map.lane_at(spawn.tile).unwrap_or_else(|| {
            let half = map.geometry().size * 0.5;
            Lane {
                row: spawn.tile.y,
                first: spawn.tile.x,
                last: spawn.tile.x,
                center_y: home.y,
                min_x: home.x - half,
                max_x: home.x + half,
            }
        });
        EnemyAgent {
            id,
            kind: spawn.kind,
            style: spawn.style,
            home,
            lane,
            speed: config.speed,
            config,
            pos: home,
            dir: 1.0,
            active: false,
            respawn_timer: initial_delay.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn style(&self) -> PatrolStyle {
        self.style
    }

    pub fn position(&self) -> Vec2 {
        self.pos
    }

    pub fn radius(&self) -> f32 {
        self.config.radius
    }

    pub fn points(&self) -> u32 {
        self.config.points
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// -1 (left) or +1 (right).
    pub fn direction(&self) -> f32 {
        self.dir
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn respawn_timer(&self) -> f32 {
        self.respawn_timer
    }

    pub fn lane(&self) -> &Lane {
        &self.lane
    }

    pub fn update(&mut self, map: &TileMap, dt: f32) {
        if !self.active {
            self.respawn_timer -= dt;
            if self.respawn_timer <= 0.0 {
                self.activate();
            }
            return;
        }
        match self.style {
            PatrolStyle::Lane => self.cross_lane(dt),
            PatrolStyle::Reciprocating => self.bounce(map, dt),
        }
    }

    /// Killed by the drill head: go inactive and come back later.
    pub fn handle_destroyed(&mut self) {
        if !self.active {
            return;
        }
        self.deactivate();
        debug!(id = self.id, respawn = self.respawn_timer, "enemy destroyed");
    }

    /// Inactive with a zero delay: reappears on the next update.
    pub fn reset(&mut self) {
        self.active = false;
        self.respawn_timer = 0.0;
        self.pos = self.home;
    }

    fn activate(&mut self) {
        self.dir = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let jitter = self.rng.gen_range(-1.0f32..=1.0) * self.config.speed_jitter;
        self.speed = self.config.speed * (1.0 + jitter);
        self.pos = match self.style {
            PatrolStyle::Lane => {
                let margin = self.config.edge_margin;
                let x = if self.dir > 0.0 {
                    self.lane.min_x - margin
                } else {
                    self.lane.max_x + margin
                };
                Vec2::new(x, self.lane.center_y)
            }
            PatrolStyle::Reciprocating => self.home,
        };
        self.active = true;
        self.respawn_timer = 0.0;
        debug!(id = self.id, kind = ?self.kind, x = self.pos.x, dir = self.dir, "enemy active");
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.respawn_timer = self.random_delay();
    }

    fn random_delay(&mut self) -> f32 {
        let (lo, hi) = (self.config.respawn_min, self.config.respawn_max);
        if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        }
    }

    fn cross_lane(&mut self, dt: f32) {
        self.pos.x += self.dir * self.speed * dt;
        let margin = self.config.edge_margin;
        let gone = if self.dir > 0.0 {
            self.pos.x > self.lane.max_x + margin
        } else {
            self.pos.x < self.lane.min_x - margin
        };
        if gone {
            self.deactivate();
        }
    }

    fn bounce(&mut self, map: &TileMap, dt: f32) {
        let next_x = self.pos.x + self.dir * self.speed * dt;
        let leading = Vec2::new(next_x + self.dir * self.config.radius, self.pos.y);
        let open = map.pixel_to_tile(leading).map_or(false, |t| map.is_passable_at(t));
        if open {
            self.pos.x = next_x;
        } else {
            self.dir = -self.dir;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::TileCoord;
    use crate::domain::tilemap::TileGeometry;

    fn lane_map() -> TileMap {
        TileMap::parse(&[
            "####W####",
            "#   E   #",
            "#  e  x #",
            "#########",
        ], TileGeometry::new(16.0)).unwrap()
    }

    fn agent(map: &TileMap, index: usize, delay: f32, seed: u64) -> EnemyAgent {
        EnemyAgent::new(index, map.spawns()[index], map, EnemyConfig::default(), delay, seed)
    }

    #[test]
    fn waits_for_initial_delay() {
        let map = lane_map();
        let mut e = agent(&map, 0, 1.0, 7);
        e.update(&map, 0.5);
        assert!(!e.is_active());
        e.update(&map, 0.6);
        assert!(e.is_active());
    }

    #[test]
    fn spawn_off_every_lane_patrols_its_own_tile() {
        let map = TileMap::parse(&[
            "##W##",
            "#X ##",
            "#####",
        ], TileGeometry::new(16.0)).unwrap();
        assert!(map.lanes().iter().all(|l| l.row != 1));
        let e = agent(&map, 0, 0.0, 3);
        let lane = *e.lane();
        assert_eq!((lane.first, lane.last), (1, 1));
        assert_eq!((lane.min_x, lane.max_x), (16.0, 32.0));
        assert_eq!(lane.center_y, 24.0);
    }

    #[test]
    fn lane_enemy_enters_at_edge_and_leaves() {
        let map = lane_map();
        let cfg = EnemyConfig::default();
        let mut e = agent(&map, 0, 0.0, 42);
        assert_eq!(e.style(), PatrolStyle::Lane);
        e.update(&map, 0.01);
        assert!(e.is_active());

        let lane = *e.lane();
        assert_eq!((lane.min_x, lane.max_x), (16.0, 128.0));
        let expected_x = if e.direction() > 0.0 {
            lane.min_x - cfg.edge_margin
        } else {
            lane.max_x + cfg.edge_margin
        };
        assert_eq!(e.position(), Vec2::new(expected_x, lane.center_y));

        let mut ticks = 0;
        while e.is_active() && ticks < 1000 {
            e.update(&map, 0.05);
            assert_eq!(e.position().y, lane.center_y);
            ticks += 1;
        }
        assert!(!e.is_active(), "never left the lane");
        assert!(e.respawn_timer() >= cfg.respawn_min && e.respawn_timer() <= cfg.respawn_max);
    }

    #[test]
    fn speed_jitter_stays_in_band() {
        let map = lane_map();
        let cfg = EnemyConfig::default();
        let lo = cfg.speed * (1.0 - cfg.speed_jitter) - 1e-3;
        let hi = cfg.speed * (1.0 + cfg.speed_jitter) + 1e-3;
        for seed in 0..64 {
            let mut e = agent(&map, 0, 0.0, seed);
            e.update(&map, 0.01);
            assert!(e.speed() >= lo && e.speed() <= hi, "seed {seed}: {}", e.speed());
        }
    }

    #[test]
    fn same_seed_same_run() {
        let map = lane_map();
        let mut a = agent(&map, 0, 0.2, 99);
        let mut b = agent(&map, 0, 0.2, 99);
        for _ in 0..300 {
            a.update(&map, 1.0 / 30.0);
            b.update(&map, 1.0 / 30.0);
            assert_eq!(a.position(), b.position());
            assert_eq!(a.is_active(), b.is_active());
        }
    }

    #[test]
    fn reciprocating_enemy_bounces_between_walls() {
        let map = lane_map();
        let mut e = agent(&map, 1, 0.0, 3);
        assert_eq!(e.style(), PatrolStyle::Reciprocating);
        e.update(&map, 0.01);
        assert!(e.is_active());

        let r = e.radius();
        let start_dir = e.direction();
        let mut flipped = false;
        for _ in 0..400 {
            e.update(&map, 0.05);
            let x = e.position().x;
            assert!(x - r >= 16.0 && x + r <= 128.0, "inside a wall at x={x}");
            flipped |= e.direction() != start_dir;
            assert!(e.is_active());
        }
        assert!(flipped);
    }

    #[test]
    fn destroyed_enemy_schedules_respawn() {
        let map = lane_map();
        let cfg = EnemyConfig::default();
        let mut e = agent(&map, 2, 0.0, 5);
        assert_eq!(e.kind(), EnemyKind::Hazardous);
        e.update(&map, 0.01);
        e.handle_destroyed();
        assert!(!e.is_active());
        let t = e.respawn_timer();
        assert!(t >= cfg.respawn_min && t <= cfg.respawn_max);

        // A second call while inactive does not reschedule.
        e.handle_destroyed();
        assert_eq!(e.respawn_timer(), t);

        e.update(&map, t + 0.01);
        assert!(e.is_active());
        assert_eq!(map.pixel_to_tile(e.position()), Some(TileCoord::new(6, 2)));
    }

    #[test]
    fn reset_respawns_on_next_update() {
        let map = lane_map();
        let mut e = agent(&map, 0, 0.0, 11);
        e.update(&map, 0.01);
        for _ in 0..10 {
            e.update(&map, 0.05);
        }
        e.reset();
        assert!(!e.is_active());
        assert_eq!(e.respawn_timer(), 0.0);
        e.update(&map, 1.0 / 60.0);
        assert!(e.is_active());
    }
}
