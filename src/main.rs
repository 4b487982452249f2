/// Entry point and game loop.

use std::io;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::execute;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use drillrunner::config::GameConfig;
use drillrunner::domain::tilemap::{LayoutError, TileGeometry};
use drillrunner::sim::event::GameEvent;
use drillrunner::sim::level::{load_level, load_levels, new_game, LevelDef};
use drillrunner::sim::step::step;
use drillrunner::sim::world::{Phase, WorldState};
use drillrunner::ui::input::{
    InputState, KEYS_CONFIRM, KEYS_PAUSE, KEYS_QUIT, KEYS_RESTART, KEYS_RETRACT,
};
use drillrunner::ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Longest frame the simulation will take in one step (after a stall or resize).
const MAX_DT: f32 = 0.05;

fn main() {
    init_logging();

    let config = GameConfig::load();
    let levels = load_levels(&config.levels_dir);

    let first = match levels.first().map(|l| l.build_map(TileGeometry::new(config.tile_size))) {
        Some(Ok(map)) => map,
        Some(Err(e)) => {
            eprintln!("Level 1 is malformed: {e}");
            return;
        }
        None => {
            eprintln!("No levels found");
            return;
        }
    };

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut world = WorldState::new(first, config, seed);
    if let Err(e) = new_game(&mut world, &levels) {
        eprintln!("Level 1 is malformed: {e}");
        return;
    }
    info!(seed, levels = levels.len(), "session start");

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let enhanced = enable_key_release();

    let result = game_loop(&mut world, &mut renderer, &levels, enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Drill Runner!");
    println!("Final Score: {}", world.score);
}

/// Logs go to `drillrunner.log`, and only when `DRILLRUNNER_LOG` holds a filter
/// (e.g. `DRILLRUNNER_LOG=debug`). The terminal belongs to the renderer.
fn init_logging() {
    let Ok(filter) = std::env::var("DRILLRUNNER_LOG") else { return };
    let Ok(file) = std::fs::File::create("drillrunner.log") else { return };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

/// Ask the terminal for key Release events. Returns whether it agreed.
fn enable_key_release() -> bool {
    let supported = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
    if !supported {
        return false;
    }
    match execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    ) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "keyboard enhancement refused");
            false
        }
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    levels: &[LevelDef],
    enhanced: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) {
            break;
        }
        handle_meta(world, &kb, levels)?;

        if world.phase == Phase::Playing && !world.paused {
            feed_drill(world, &kb);
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f32().min(MAX_DT);
        last_frame = now;

        let events = step(world, dt);
        report_events(&events);

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Keyboard edges become drill commands.
fn feed_drill(world: &mut WorldState, kb: &InputState) {
    if let Some(dir) = kb.direction_pressed() {
        let (dx, dy) = dir.delta();
        world.drill.set_direction(dx, dy);
    }
    for dir in kb.directions_released() {
        world.drill.release_direction(dir);
    }
    if kb.any_pressed(KEYS_RETRACT) {
        world.drill.start_retract();
    }
    if kb.any_released(KEYS_RETRACT) && !kb.any_held(KEYS_RETRACT) {
        world.drill.stop_retract();
    }
}

fn report_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::PelletCollected { .. } => {}
            other => debug!(event = ?other, "game event"),
        }
    }
}

fn handle_meta(world: &mut WorldState, kb: &InputState, levels: &[LevelDef]) -> Result<(), LayoutError> {
    let confirm = kb.any_pressed(KEYS_CONFIRM);

    match world.phase {
        // ── Playing ──
        Phase::Playing => {
            if kb.any_pressed(KEYS_PAUSE) {
                world.paused = !world.paused;
            } else if kb.any_pressed(KEYS_RESTART) && !world.paused {
                world.restart_level();
                world.set_message("Level Restarted", 1.5);
            }
        }

        // ── Level Complete ──
        Phase::LevelComplete => {
            if confirm {
                load_level(world, levels, world.current_level + 1)?;
            }
        }

        // ── Game Over / Game Complete ──
        Phase::GameOver | Phase::GameComplete => {
            if confirm {
                new_game(world, levels)?;
            }
        }
    }

    Ok(())
}
