//! Translation of controller ticks into keyboard key-state changes.
//!
//! # Architecture
//!
//! ```text
//! ControllerSample ──► CoordinateMapper ──► Aim ──┐
//!        │                                        ├──► InputModeController ──► arrow events ─┐
//!        │                  GamePosition ─────────┘                                          ├──► KeyEventEmitter
//!        └──────────────► ButtonActionDispatcher ──────────────────────────► action events ─┘
//! ```
//!
//! Everything in here is pure state over validated input: no I/O happens until
//! the [`KeyEventEmitter`] hands the batch to a [`crate::device::KeySink`].

pub mod actions;
pub mod arrows;
pub mod coordinates;
pub mod emitter;
pub mod engine;
pub mod mode;

pub use actions::{Action, ButtonActionDispatcher, SmartShot};
pub use arrows::{ArrowSet, Direction};
pub use coordinates::{Aim, CoordinateMapper};
pub use emitter::KeyEventEmitter;
pub use engine::{TickOutcome, TranslationEngine};
pub use mode::{InputModeController, Mode, ModeInput};

use serde::Deserialize;
use std::fmt;

/// Linux input key code (`KEY_*` from `linux/input-event-codes.h`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const ESC: KeyCode = KeyCode(1);
    pub const LEFT_CTRL: KeyCode = KeyCode(29);
    pub const LEFT_SHIFT: KeyCode = KeyCode(42);
    pub const Z: KeyCode = KeyCode(44);
    pub const X: KeyCode = KeyCode(45);
    pub const UP: KeyCode = KeyCode(103);
    pub const LEFT: KeyCode = KeyCode(105);
    pub const RIGHT: KeyCode = KeyCode(106);
    pub const DOWN: KeyCode = KeyCode(108);

    pub const fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {}", self.0)
    }
}

/// One key transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub pressed: bool,
}

impl KeyEvent {
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            pressed: true,
        }
    }

    pub const fn release(code: KeyCode) -> Self {
        Self {
            code,
            pressed: false,
        }
    }
}
