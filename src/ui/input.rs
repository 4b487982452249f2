/// Keyboard state tracker.
///
/// The drill wants edges, not levels:
///   - a direction press becomes both the buffered press and the held intent
///   - a direction release clears the intent
///   - the retract key is a momentary switch (press starts, release stops)
///
/// Release events come from crossterm's keyboard enhancement when the
/// terminal supports it. Otherwise a key counts as released once no
/// Press/Repeat has arrived for `HOLD_TIMEOUT`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::tile::Direction;

/// Without Release events, a key is dropped after this long without a repeat.
/// Must exceed the terminal's initial key-repeat delay.
const HOLD_TIMEOUT: Duration = Duration::from_millis(550);

// ── Key Constants ──

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_RETRACT: &[KeyCode] = &[KeyCode::Char(' ')];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
pub const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::F(2)];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc];

fn direction_keys(dir: Direction) -> &'static [KeyCode] {
    match dir {
        Direction::Up => KEYS_UP,
        Direction::Down => KEYS_DOWN,
        Direction::Left => KEYS_LEFT,
        Direction::Right => KEYS_RIGHT,
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each held key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from "not held" to "held" in the last drain.
    fresh_presses: Vec<KeyCode>,
    /// Keys that went from "held" to "not held" in the last drain,
    /// by explicit Release or by timeout.
    releases: Vec<KeyCode>,
    /// Raw key events collected during drain, for modifier checks.
    raw_events: Vec<KeyEvent>,
    /// Only honor Release events once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            releases: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.releases.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                if self.last_active.remove(&key.code).is_some() {
                    self.releases.push(key.code);
                }
            }
            KeyEventKind::Release => {}
            _ => {
                if self.last_active.insert(key.code, now).is_none() {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        let releases = &mut self.releases;
        self.last_active.retain(|code, t| {
            let alive = now.duration_since(*t) < HOLD_TIMEOUT;
            if !alive {
                releases.push(*code);
            }
            alive
        });
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.contains_key(&code)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Freshly pressed this frame (edge trigger).
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn any_released(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.releases.contains(c))
    }

    /// Direction freshly pressed this frame, latest event wins.
    pub fn direction_pressed(&self) -> Option<Direction> {
        self.fresh_presses.iter().rev().find_map(|code| {
            Direction::ALL.into_iter().find(|d| direction_keys(*d).contains(code))
        })
    }

    /// Directions whose keys were all let go this frame.
    pub fn directions_released(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| {
                let keys = direction_keys(*d);
                self.any_released(keys) && !self.any_held(keys)
            })
            .collect()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    fn frame(input: &mut InputState) {
        input.fresh_presses.clear();
        input.releases.clear();
        input.raw_events.clear();
    }

    #[test]
    fn press_is_an_edge_repeat_is_not() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.apply(key(KeyCode::Left, KeyEventKind::Press), t0);
        assert_eq!(input.direction_pressed(), Some(Direction::Left));
        assert!(input.any_held(KEYS_LEFT));

        frame(&mut input);
        input.apply(key(KeyCode::Left, KeyEventKind::Repeat), t0);
        assert_eq!(input.direction_pressed(), None);
        assert!(input.is_held(KeyCode::Left));
    }

    #[test]
    fn release_event_clears_direction_when_honored() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t0 = Instant::now();
        input.apply(key(KeyCode::Char('d'), KeyEventKind::Press), t0);
        frame(&mut input);
        input.apply(key(KeyCode::Char('d'), KeyEventKind::Release), t0);
        assert_eq!(input.directions_released(), vec![Direction::Right]);
        assert!(!input.any_held(KEYS_RIGHT));
    }

    #[test]
    fn timeout_counts_as_release() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.apply(key(KeyCode::Char(' '), KeyEventKind::Press), t0);
        input.expire(t0 + HOLD_TIMEOUT / 2);
        assert!(input.any_held(KEYS_RETRACT));
        frame(&mut input);
        input.expire(t0 + HOLD_TIMEOUT * 2);
        assert!(!input.any_held(KEYS_RETRACT));
        assert!(input.any_released(KEYS_RETRACT));
    }

    #[test]
    fn latest_direction_press_wins() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.apply(key(KeyCode::Up, KeyEventKind::Press), t0);
        input.apply(key(KeyCode::Char('s'), KeyEventKind::Press), t0);
        assert_eq!(input.direction_pressed(), Some(Direction::Down));
    }
}
