//! Drill Runner: a terminal arcade tunnelling game.
//!
//!   - `domain` : tile map, pipe, drill, enemies, contact rules
//!   - `sim`    : world state, per-frame step, level loading
//!   - `ui`     : keyboard input and terminal renderer

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
