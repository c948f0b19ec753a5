//! Navigation / movement state machine driving the arrow keys
//!
//! ```text
//!            mode_toggle edge (arrows released)
//!   ┌────────────┐ ───────────────────────► ┌──────────┐
//!   │ Navigation │                          │ Movement │
//!   └────────────┘ ◄─────────────────────── └──────────┘
//!   tilt picks one arrow                    aim angle picks 1-2 arrows
//!   while navigate is held                  until within precision
//! ```

use crate::config::Configuration;
use crate::controller::ButtonSet;
use crate::mapping::arrows::sector;
use crate::mapping::{Action, Aim, ArrowSet, Direction, KeyEvent};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Menus: arrows come from controller tilt
    Navigation,
    /// Gameplay: arrows steer the player towards the controller's aim
    Movement,
}

impl Mode {
    pub fn toggled(self) -> Mode {
        match self {
            Mode::Navigation => Mode::Movement,
            Mode::Movement => Mode::Navigation,
        }
    }
}

/// Per-tick input of the mode controller
#[derive(Clone, Copy, Debug)]
pub struct ModeInput {
    pub previous: ButtonSet,
    pub buttons: ButtonSet,
    pub accel: [f32; 3],
    /// `None` while the game position is unavailable
    pub aim: Option<Aim>,
}

#[derive(Clone, Debug)]
pub struct InputModeController {
    mode: Mode,
    arrows: ArrowSet,
}

impl Default for InputModeController {
    fn default() -> Self {
        Self::new(Mode::Navigation)
    }
}

impl InputModeController {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            arrows: ArrowSet::EMPTY,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn arrows(&self) -> ArrowSet {
        self.arrows
    }

    /// Advances one tick and returns the arrow key changes
    pub fn step(&mut self, config: &Configuration, input: &ModeInput) -> Vec<KeyEvent> {
        let controls = &config.controls;

        if input.buttons.pressed_since(input.previous, controls.mode_toggle) {
            self.mode = self.mode.toggled();
            info!("Switched to {:?} mode", self.mode);
            return self.replace(ArrowSet::EMPTY);
        }

        let desired = match self.mode {
            Mode::Navigation => {
                if !input.buttons.changed_since(input.previous).contains(controls.navigate) {
                    return Vec::new();
                }
                if input.buttons.contains(controls.navigate) {
                    ArrowSet::single(tilt_direction(config, input.accel))
                } else {
                    ArrowSet::EMPTY
                }
            }
            Mode::Movement => {
                let Some(aim) = input.aim else {
                    return Vec::new();
                };
                let focus_button = config.bindings.get(Action::Focus).button;
                let precision = if input.buttons.contains(focus_button) {
                    config.precision.focus
                } else {
                    config.precision.normal
                };
                if aim.distance <= precision {
                    ArrowSet::EMPTY
                } else {
                    ArrowSet::from_sector(sector(aim.angle))
                }
            }
        };
        self.replace(desired)
    }

    /// Releases every held arrow
    pub fn release_all(&mut self) -> Vec<KeyEvent> {
        self.replace(ArrowSet::EMPTY)
    }

    fn replace(&mut self, desired: ArrowSet) -> Vec<KeyEvent> {
        let events = self.arrows.transitions_to(desired).collect();
        self.arrows = desired;
        events
    }
}

/// Single menu direction from controller tilt
///
/// Vertical by default, horizontal wins once the sideways tilt passes its
/// threshold. Tilting the controller to the right reads as negative `ax`.
fn tilt_direction(config: &Configuration, accel: [f32; 3]) -> Direction {
    let [ax, ay, _] = accel;
    let nav = &config.navigation;
    if ax > nav.x {
        Direction::Left
    } else if ax < -nav.x {
        Direction::Right
    } else if ay > nav.y {
        Direction::Up
    } else {
        Direction::Down
    }
}
