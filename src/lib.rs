//! Motion-controller to keyboard bridge for keyboard-only 2D shooters.
//!
//! A tracked PS Move controller steers the player character: the controller's
//! camera position is mapped into the game's playfield, compared against the
//! player position read from the game's memory, and turned into held arrow keys
//! on a virtual keyboard. Controller buttons drive the game's action keys.
//!
//! ```text
//! Tracker ──► ControllerSample ─┐
//!                               ├──► TranslationEngine ──► KeyEventEmitter ──► VirtualKeyboard
//! /proc/<pid>/mem ──► Position ─┘
//! ```

pub mod bridge;
pub mod config;
pub mod controller;
pub mod device;
pub mod mapping;
pub mod target;

pub use bridge::{Bridge, BridgeError};
pub use config::{ConfigError, Configuration};
pub use mapping::{KeyCode, KeyEvent, TranslationEngine};
