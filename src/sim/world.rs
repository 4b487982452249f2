/// WorldState: the complete snapshot of a running game.
///
/// ## Map layers
///
///   - `base_map` : the level as loaded. **Never mutated** after load.
///   - `map`      : the live map; pellets disappear from it as they are dug.
///
/// `restart_level` resets `map = base_map.clone()`. Losing a life does not:
/// collected pellets stay collected, only the drill, enemies and timer reset.
///
/// ## Drill lifetime
///
/// The drill is never rewound in place. Every life gets a brand new
/// `DrillController` (and with it a fresh pipe and trail).

use glam::Vec2;

use crate::config::GameConfig;
use crate::domain::drill::DrillController;
use crate::domain::enemy::EnemyAgent;
use crate::domain::tilemap::TileMap;

/// Seconds between the first appearances of consecutive enemies.
pub const SPAWN_STAGGER: f32 = 1.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    LevelComplete,
    GameOver,
    /// Past the last level.
    GameComplete,
}

pub struct WorldState {
    // ── Map layers ──
    pub map: TileMap,
    base_map: TileMap,

    // ── Actors ──
    pub drill: DrillController,
    pub enemies: Vec<EnemyAgent>,

    pub config: GameConfig,

    // ── Meta ──
    pub phase: Phase,
    pub score: u32,
    pub lives: u32,
    /// Seconds left on the level timer.
    pub time_left: f32,
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub tick: u64,
    /// Base seed; each enemy derives its own from it.
    pub seed: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: f32,
    pub paused: bool,
}

// ── Construction ──

impl WorldState {
    pub fn new(map: TileMap, config: GameConfig, seed: u64) -> Self {
        let drill = fresh_drill(&map, &config);
        let enemies = spawn_enemies(&map, &config, seed);
        WorldState {
            base_map: map.clone(),
            map,
            drill,
            enemies,
            phase: Phase::Playing,
            score: 0,
            lives: config.session.lives,
            time_left: config.session.time_limit,
            current_level: 0,
            total_levels: 1,
            level_name: String::new(),
            tick: 0,
            seed,
            message: String::new(),
            message_timer: 0.0,
            paused: false,
            config,
        }
    }

    pub fn set_message(&mut self, msg: &str, seconds: f32) {
        self.message = msg.to_string();
        self.message_timer = seconds;
    }

    /// Well mouth: the entry tile's center.
    pub fn anchor(&self) -> Vec2 {
        self.map.tile_center(self.map.entry_tile())
    }
}

// ── Resets ──

impl WorldState {
    /// Swap in a new level. Score and lives carry over.
    pub fn install_map(&mut self, map: TileMap) {
        self.base_map = map.clone();
        self.map = map;
        self.restart_level();
    }

    /// Back to the level as loaded: pellets restored, fresh drill and enemies.
    pub fn restart_level(&mut self) {
        self.map = self.base_map.clone();
        self.drill = fresh_drill(&self.map, &self.config);
        self.enemies = spawn_enemies(&self.map, &self.config, self.seed);
        self.time_left = self.config.session.time_limit;
        self.tick = 0;
        self.paused = false;
        self.phase = Phase::Playing;
    }

    /// After a lost life: new drill, enemies back to immediate respawn,
    /// timer restarted. The map keeps its collected pellets.
    pub fn reset_after_life_loss(&mut self) {
        self.drill = fresh_drill(&self.map, &self.config);
        for e in &mut self.enemies {
            e.reset();
        }
        self.time_left = self.config.session.time_limit;
    }
}

fn fresh_drill(map: &TileMap, config: &GameConfig) -> DrillController {
    let entry = map.entry_tile();
    DrillController::new(map, map.tile_center(entry), entry, config.drill.clone())
}

fn spawn_enemies(map: &TileMap, config: &GameConfig, seed: u64) -> Vec<EnemyAgent> {
    map.spawns()
        .iter()
        .enumerate()
        .map(|(i, spawn)| {
            let delay = config.enemy.respawn_min + i as f32 * SPAWN_STAGGER;
            let enemy_seed = seed.wrapping_mul(6364136223846793005).wrapping_add(i as u64 + 1);
            EnemyAgent::new(i, *spawn, map, config.enemy.clone(), delay, enemy_seed)
        })
        .collect()
}
