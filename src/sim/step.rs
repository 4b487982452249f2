/// The step function: advances the world by one frame of `dt` seconds.
///
/// Processing order:
///   1. Cosmetic map clock
///   2. Drill (movement, pellet pickup, retraction)
///   3. Enemies
///   4. Contacts (drill head / pipe vs. enemies)
///   5. Level timer
///   6. Win check (no pellets left and the drill back in the well)
///
/// A lost life ends the frame immediately: nothing after it runs against
/// the freshly reset drill.

use tracing::info;

use crate::domain::drill::DrillEvent;
use crate::domain::interaction::resolve_interactions;
use super::event::{GameEvent, LifeLossCause};
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0.0 {
        world.message_timer -= dt;
        if world.message_timer <= 0.0 { world.message.clear(); }
    }

    world.map.update(dt);
    resolve_drill(world, dt, &mut events);
    resolve_enemies(world, dt);
    if resolve_contacts(world, &mut events) { return events; }
    if resolve_timer(world, dt, &mut events) { return events; }
    resolve_win(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Drill
// ══════════════════════════════════════════════════════════════

fn resolve_drill(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    world.drill.update(&mut world.map, dt);

    for ev in world.drill.drain_events() {
        match ev {
            DrillEvent::PelletCollected { x, y } => {
                world.score += world.config.session.pellet_points;
                events.push(GameEvent::PelletCollected { x, y });
                if world.map.remaining_pellets() == 0 {
                    events.push(GameEvent::AllPelletsCollected);
                    world.set_message("All pellets dug! Back to the well", 2.5);
                }
            }
            DrillEvent::RetractStarted => events.push(GameEvent::RetractStarted),
            DrillEvent::RetractStopped => events.push(GameEvent::RetractStopped),
            DrillEvent::Docked => events.push(GameEvent::Docked),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(world: &mut WorldState, dt: f32) {
    for e in &mut world.enemies {
        e.update(&world.map, dt);
    }
}

// ══════════════════════════════════════════════════════════════
// Contacts
// ══════════════════════════════════════════════════════════════

/// Returns true when a life was lost this frame.
fn resolve_contacts(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let outcome = resolve_interactions(&world.drill, &mut world.enemies);

    for id in &outcome.destroyed {
        if let Some(e) = world.enemies.iter().find(|e| e.id() == *id) {
            let pos = e.position();
            world.score += e.points();
            events.push(GameEvent::EnemyDestroyed { id: *id, x: pos.x, y: pos.y });
        }
    }

    match outcome.life_lost {
        Some(cause) => {
            lose_life(world, cause.into(), events);
            true
        }
        None => false,
    }
}

// ══════════════════════════════════════════════════════════════
// Timer
// ══════════════════════════════════════════════════════════════

fn resolve_timer(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) -> bool {
    world.time_left -= dt;
    if world.time_left > 0.0 { return false; }
    world.time_left = 0.0;
    lose_life(world, LifeLossCause::TimeUp, events);
    true
}

// ══════════════════════════════════════════════════════════════
// Win check
// ══════════════════════════════════════════════════════════════

fn resolve_win(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.map.remaining_pellets() > 0 || !world.drill.is_docked() { return; }

    let bonus = world.config.session.time_bonus_per_second * world.time_left.floor() as u32;
    world.score += bonus;
    world.phase = Phase::LevelComplete;
    events.push(GameEvent::LevelComplete { bonus });
    world.set_message(&format!("Level {} complete! Time bonus +{}", world.current_level + 1, bonus), 3.0);
    info!(level = world.current_level, bonus, score = world.score, "level complete");
}

// ══════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════

fn lose_life(world: &mut WorldState, cause: LifeLossCause, events: &mut Vec<GameEvent>) {
    world.lives = world.lives.saturating_sub(1);
    events.push(GameEvent::LifeLost { cause });
    info!(?cause, lives = world.lives, "life lost");

    if world.lives == 0 {
        world.phase = Phase::GameOver;
        events.push(GameEvent::GameOver);
        world.set_message("GAME OVER", 5.0);
        return;
    }

    world.reset_after_life_loss();
    let msg = match cause {
        LifeLossCause::EnemyHead => "Crushed by a rock beast!",
        LifeLossCause::PipeContact => "Pipe cut!",
        LifeLossCause::TimeUp => "Out of time!",
    };
    world.set_message(msg, 2.0);
}
