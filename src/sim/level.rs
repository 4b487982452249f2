/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   Line 1: `# Level Name`
///   Lines:  map rows (short rows are right-padded with open space)
///
/// ## Tile legend:
///   '#' = Rock (wall)            '.' = Pellet
///   ' ' = Open tunnel            'W' = Well entry (top row)
///   'E' = Destructible, lane     'e' = Destructible, reciprocating
///   'X' = Hazardous, lane        'x' = Hazardous, reciprocating

use std::path::Path;

use tracing::{info, warn};

use crate::domain::tilemap::{LayoutError, TileGeometry, TileMap};
use crate::sim::world::{Phase, WorldState};

/// Every character a map row may contain.
const LAYOUT_SYMBOLS: &str = "#. WEeXx";

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

impl LevelDef {
    pub fn build_map(&self, geometry: TileGeometry) -> Result<TileMap, LayoutError> {
        let rows: Vec<&str> = self.rows.iter().map(String::as_str).collect();
        TileMap::parse(&rows, geometry)
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Levels from `dir` if it holds any, otherwise the built-in set.
pub fn load_levels(dir: &Path) -> Vec<LevelDef> {
    if dir.is_dir() {
        let from_dir: Vec<LevelDef> = load_from_directory(dir)
            .into_iter()
            .map(|(_, def)| def)
            .collect();
        if !from_dir.is_empty() {
            info!(count = from_dir.len(), dir = %dir.display(), "loaded levels from directory");
            return from_dir;
        }
    }
    embedded_levels()
}

/// Load level `level_idx` into the world. Preserves score and lives.
/// Past the last level the world moves to `GameComplete`.
pub fn load_level(world: &mut WorldState, levels: &[LevelDef], level_idx: usize) -> Result<(), LayoutError> {
    let Some(def) = levels.get(level_idx) else {
        world.phase = Phase::GameComplete;
        return Ok(());
    };

    let map = def.build_map(TileGeometry::new(world.config.tile_size))?;
    info!(
        level = level_idx,
        name = %def.name,
        pellets = map.remaining_pellets(),
        enemies = map.spawns().len(),
        "level loaded",
    );
    world.install_map(map);
    world.current_level = level_idx;
    world.total_levels = levels.len();
    world.level_name = def.name.clone();
    world.set_message(&def.name, 2.5);
    Ok(())
}

/// Fresh session on the first level.
pub fn new_game(world: &mut WorldState, levels: &[LevelDef]) -> Result<(), LayoutError> {
    world.score = 0;
    world.lives = world.config.session.lives;
    load_level(world, levels, 0)
}

// ══════════════════════════════════════════════════════════════
// Single-level file parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content.
fn parse_level_file(content: &str) -> Option<LevelDef> {
    let mut name = String::new();
    let mut rows = vec![];

    for line in content.lines() {
        if line.starts_with('#') && name.is_empty() && rows.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return None;
    }

    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let w = row.chars().count();
        if w < max_width {
            row.extend(std::iter::repeat(' ').take(max_width - w));
        }
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    Some(LevelDef { name, rows })
}

/// Distinguish `# Level Name` from `#..#  #....#` (level data).
/// A name line holds at least one character outside the layout legend.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| !LAYOUT_SYMBOLS.contains(c))
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read levels directory");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            if let Ok(content) = std::fs::read_to_string(&path) {
                if let Some(def) = parse_level_file(&content) {
                    let filename = path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    results.push((filename, def));
                }
            }
        }
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Level 1 - Topsoil", &[
            "##########W#############",
            "#.........  ...........#",
            "#.####.########.######.#",
            "#.#  #.#      #.#    #.#",
            "#.#  #...E.........  #.#",
            "#.####.########.######.#",
            "#...........  .........#",
            "#.###.#######.#######..#",
            "#.#.......e........#...#",
            "#.###.#######.#######..#",
            "#......................#",
            "########################",
        ]),
        make_embedded("Level 2 - Clay Beds", &[
            "###########W############",
            "#.....   .....   ......#",
            "#.##.#####.###.#####.#.#",
            "#.##.#   #.# #.#   #.#.#",
            "#....X.................#",
            "####.#####.###.#####.###",
            "#......................#",
            "#.####.##.######.##.##.#",
            "#......E...............#",
            "#.####.##.######.##.##.#",
            "#...x.......  .........#",
            "########################",
        ]),
        make_embedded("Level 3 - Bedrock", &[
            "###########W############",
            "#......................#",
            "#.#.####.######.####.#.#",
            "#...X..................#",
            "###.##.####.####.##.####",
            "#........e.............#",
            "#.######.##.##.######..#",
            "#.....E.........X......#",
            "#.##.#####.##.#####.##.#",
            "#.........x............#",
            "#.####.##########.####.#",
            "#......................#",
            "########################",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_levels_parse() {
        for def in embedded_levels() {
            let map = def.build_map(TileGeometry::default())
                .unwrap_or_else(|e| panic!("{}: {e}", def.name));
            assert!(map.remaining_pellets() > 0, "{} has no pellets", def.name);
            assert!(!map.spawns().is_empty(), "{} has no enemies", def.name);
            assert_eq!(map.entry_tile().y, 0);
        }
    }

    #[test]
    fn level_file_name_and_padding() {
        let text = "# Narrow Seam\n#W##\n#..\n#  #\n\n";
        let def = parse_level_file(text).unwrap();
        assert_eq!(def.name, "Narrow Seam");
        assert_eq!(def.rows, vec!["#W##", "#.. ", "#  #"]);
        assert!(def.build_map(TileGeometry::default()).is_ok());
    }

    #[test]
    fn wall_row_is_not_a_name() {
        let text = "#W##\n#..#\n####\n";
        let def = parse_level_file(text).unwrap();
        assert_eq!(def.name, "Unnamed Level");
        assert_eq!(def.rows.len(), 3);
        assert!(!is_name_line("#..E  x#"));
        assert!(is_name_line("# Deep Run"));
    }

    #[test]
    fn empty_file_is_skipped() {
        assert!(parse_level_file("# Only A Name\n\n").is_none());
    }

    #[test]
    fn missing_directory_falls_back_to_embedded() {
        let levels = load_levels(Path::new("/nonexistent/drillrunner/levels"));
        assert_eq!(levels.len(), embedded_levels().len());
    }

    #[test]
    fn directory_levels_sorted_by_file_name() {
        let dir = std::env::temp_dir().join(format!("drillrunner-levels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.txt"), "# Second\n#W#\n#.#\n").unwrap();
        std::fs::write(dir.join("a.txt"), "# First\n#W#\n#.#\n").unwrap();
        std::fs::write(dir.join("notes.md"), "# ignored\n").unwrap();

        let levels = load_levels(&dir);
        let names: Vec<&str> = levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
