/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// All distances are in pixels, all durations in seconds.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub drill: DrillConfig,
    pub enemy: EnemyConfig,
    pub session: SessionConfig,
    pub tile_size: f32,
    pub levels_dir: PathBuf,
}

/// What a release of the retract key does to the acceleration timer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetractHold {
    /// Held time survives release/re-press; cleared only once docked.
    Preserve,
    /// Every release starts the acceleration over.
    Reset,
}

#[derive(Clone, Debug)]
pub struct DrillConfig {
    pub speed: f32,
    pub snap_epsilon: f32,
    pub retract_speed: f32,
    pub retract_accel: f32,
    pub retract_max_bonus: f32,
    pub retract_hold: RetractHold,
    pub head_radius: f32,
    pub tip_length: f32,
    pub tip_radius: f32,
    pub pipe_radius: f32,
}

#[derive(Clone, Debug)]
pub struct EnemyConfig {
    pub speed: f32,
    pub speed_jitter: f32, // fraction of `speed`, applied symmetrically
    pub radius: f32,
    pub respawn_min: f32,
    pub respawn_max: f32,
    pub edge_margin: f32,
    pub points: u32,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub lives: u32,
    pub time_limit: f32,
    pub pellet_points: u32,
    pub time_bonus_per_second: u32,
}

impl Default for DrillConfig {
    fn default() -> Self {
        TomlDrill::default().into_config()
    }
}

impl Default for EnemyConfig {
    fn default() -> Self {
        TomlEnemy::default().into_config()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        TomlSession::default().into_config()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    drill: TomlDrill,
    #[serde(default)]
    enemy: TomlEnemy,
    #[serde(default)]
    session: TomlSession,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlDrill {
    #[serde(default = "default_drill_speed")]
    speed: f32,
    #[serde(default = "default_snap_epsilon")]
    snap_epsilon: f32,
    #[serde(default = "default_retract_speed")]
    retract_speed: f32,
    #[serde(default = "default_retract_accel")]
    retract_accel: f32,
    #[serde(default = "default_retract_max_bonus")]
    retract_max_bonus: f32,
    #[serde(default = "default_retract_hold")]
    retract_hold: RetractHold,
    #[serde(default = "default_head_radius")]
    head_radius: f32,
    #[serde(default = "default_tip_length")]
    tip_length: f32,
    #[serde(default = "default_tip_radius")]
    tip_radius: f32,
    #[serde(default = "default_pipe_radius")]
    pipe_radius: f32,
}

#[derive(Deserialize, Debug)]
struct TomlEnemy {
    #[serde(default = "default_enemy_speed")]
    speed: f32,
    #[serde(default = "default_speed_jitter")]
    speed_jitter: f32,
    #[serde(default = "default_enemy_radius")]
    radius: f32,
    #[serde(default = "default_respawn_min")]
    respawn_min: f32,
    #[serde(default = "default_respawn_max")]
    respawn_max: f32,
    #[serde(default = "default_edge_margin")]
    edge_margin: f32,
    #[serde(default = "default_enemy_points")]
    points: u32,
}

#[derive(Deserialize, Debug)]
struct TomlSession {
    #[serde(default = "default_lives")]
    lives: u32,
    #[serde(default = "default_time_limit")]
    time_limit: f32,
    #[serde(default = "default_pellet_points")]
    pellet_points: u32,
    #[serde(default = "default_time_bonus")]
    time_bonus_per_second: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tile_size")]
    tile_size: f32,
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_drill_speed() -> f32 { 96.0 }       // 6 tiles/s at 16px
fn default_snap_epsilon() -> f32 { 0.5 }
fn default_retract_speed() -> f32 { 128.0 }
fn default_retract_accel() -> f32 { 1.5 }      // bonus per held second²
fn default_retract_max_bonus() -> f32 { 2.0 }  // up to 3x base speed
fn default_retract_hold() -> RetractHold { RetractHold::Preserve }
fn default_head_radius() -> f32 { 6.0 }
fn default_tip_length() -> f32 { 8.0 }
fn default_tip_radius() -> f32 { 3.0 }
fn default_pipe_radius() -> f32 { 3.0 }

fn default_enemy_speed() -> f32 { 40.0 }
fn default_speed_jitter() -> f32 { 0.15 }
fn default_enemy_radius() -> f32 { 5.0 }
fn default_respawn_min() -> f32 { 1.5 }
fn default_respawn_max() -> f32 { 4.0 }
fn default_edge_margin() -> f32 { 16.0 }
fn default_enemy_points() -> u32 { 200 }

fn default_lives() -> u32 { 3 }
fn default_time_limit() -> f32 { 90.0 }
fn default_pellet_points() -> u32 { 10 }
fn default_time_bonus() -> u32 { 5 }

fn default_tile_size() -> f32 { 16.0 }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlDrill {
    fn default() -> Self {
        TomlDrill {
            speed: default_drill_speed(),
            snap_epsilon: default_snap_epsilon(),
            retract_speed: default_retract_speed(),
            retract_accel: default_retract_accel(),
            retract_max_bonus: default_retract_max_bonus(),
            retract_hold: default_retract_hold(),
            head_radius: default_head_radius(),
            tip_length: default_tip_length(),
            tip_radius: default_tip_radius(),
            pipe_radius: default_pipe_radius(),
        }
    }
}

impl Default for TomlEnemy {
    fn default() -> Self {
        TomlEnemy {
            speed: default_enemy_speed(),
            speed_jitter: default_speed_jitter(),
            radius: default_enemy_radius(),
            respawn_min: default_respawn_min(),
            respawn_max: default_respawn_max(),
            edge_margin: default_edge_margin(),
            points: default_enemy_points(),
        }
    }
}

impl Default for TomlSession {
    fn default() -> Self {
        TomlSession {
            lives: default_lives(),
            time_limit: default_time_limit(),
            pellet_points: default_pellet_points(),
            time_bonus_per_second: default_time_bonus(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tile_size: default_tile_size(),
            levels_dir: default_levels_dir(),
        }
    }
}

impl TomlDrill {
    fn into_config(self) -> DrillConfig {
        DrillConfig {
            speed: self.speed,
            snap_epsilon: self.snap_epsilon,
            retract_speed: self.retract_speed,
            retract_accel: self.retract_accel,
            retract_max_bonus: self.retract_max_bonus.max(0.0),
            retract_hold: self.retract_hold,
            head_radius: self.head_radius,
            tip_length: self.tip_length,
            tip_radius: self.tip_radius,
            pipe_radius: self.pipe_radius,
        }
    }
}

impl TomlEnemy {
    fn into_config(self) -> EnemyConfig {
        // A reversed respawn window would make gen_range panic.
        let (lo, hi) = if self.respawn_min <= self.respawn_max {
            (self.respawn_min, self.respawn_max)
        } else {
            (self.respawn_max, self.respawn_min)
        };
        EnemyConfig {
            speed: self.speed,
            speed_jitter: self.speed_jitter.clamp(0.0, 0.9),
            radius: self.radius,
            respawn_min: lo.max(0.0),
            respawn_max: hi.max(0.0),
            edge_margin: self.edge_margin,
            points: self.points,
        }
    }
}

impl TomlSession {
    fn into_config(self) -> SessionConfig {
        SessionConfig {
            lives: self.lives.max(1),
            time_limit: self.time_limit,
            pellet_points: self.pellet_points,
            time_bonus_per_second: self.time_bonus_per_second,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Strict variant: parse a TOML document, reporting errors instead of
    /// falling back. Relative `levels_dir` is kept relative.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, &[]))
    }

    /// Read and parse a specific file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        GameConfig::from_toml_str(&text)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let tile_size = if toml_cfg.general.tile_size > 0.0 {
            toml_cfg.general.tile_size
        } else {
            default_tile_size()
        };

        GameConfig {
            drill: toml_cfg.drill.into_config(),
            enemy: toml_cfg.enemy.into_config(),
            session: toml_cfg.session.into_config(),
            tile_size,
            levels_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config.toml parse error, using defaults");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config file");
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.session.lives, 3);
        assert_eq!(cfg.drill.retract_hold, RetractHold::Preserve);
        assert!((cfg.tile_size - 16.0).abs() < f32::EPSILON);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[drill]\nspeed = 50.0\nretract_hold = \"reset\"\n",
        ).unwrap();
        assert!((cfg.drill.speed - 50.0).abs() < f32::EPSILON);
        assert_eq!(cfg.drill.retract_hold, RetractHold::Reset);
        assert!((cfg.drill.snap_epsilon - 0.5).abs() < f32::EPSILON);
        assert_eq!(cfg.enemy.points, 200);
    }

    #[test]
    fn reversed_respawn_window_is_normalized() {
        let cfg = GameConfig::from_toml_str(
            "[enemy]\nrespawn_min = 5.0\nrespawn_max = 1.0\n",
        ).unwrap();
        assert!(cfg.enemy.respawn_min <= cfg.enemy.respawn_max);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let err = GameConfig::from_toml_str("[drill\nspeed = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_hold_policy_is_an_error() {
        assert!(GameConfig::from_toml_str("[drill]\nretract_hold = \"sometimes\"\n").is_err());
    }
}
