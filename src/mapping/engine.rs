//! Per-tick translation engine
//!
//! Owns the configuration and every piece of state that survives a tick:
//! previous buttons, mode, held arrows and held action keys.
//!
//! ```text
//! ControllerSample + Option<GamePosition>
//!        │
//!        ├─ quit held? ──► TickOutcome { quit: true }
//!        ├─► InputModeController::step ──► arrow events
//!        ├─► ButtonActionDispatcher::dispatch ──► action events
//!        └─ commit buttons
//! ```

use crate::config::Configuration;
use crate::controller::{ButtonSet, ControllerSample};
use crate::mapping::mode::ModeInput;
use crate::mapping::{ButtonActionDispatcher, CoordinateMapper, InputModeController, KeyEvent, Mode};
use crate::target::GamePosition;
use tracing::info;

/// Result of one tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    /// Key transitions in emission order
    pub events: Vec<KeyEvent>,
    /// The quit button is held, nothing else was processed
    pub quit: bool,
}

pub struct TranslationEngine {
    config: Configuration,
    mapper: CoordinateMapper,
    modes: InputModeController,
    dispatcher: ButtonActionDispatcher,
    previous: ButtonSet,
}

impl TranslationEngine {
    pub fn new(config: Configuration) -> Self {
        Self {
            mapper: CoordinateMapper::new(config.camera, config.target),
            modes: InputModeController::default(),
            dispatcher: ButtonActionDispatcher::new(config.smart_shot),
            previous: ButtonSet::EMPTY,
            config,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &InputModeController {
        &self.modes
    }

    pub fn dispatcher(&self) -> &ButtonActionDispatcher {
        &self.dispatcher
    }

    /// Translates one sample into key transitions
    ///
    /// `game` is `None` when the position could not be read this tick, which
    /// freezes the arrows in movement mode.
    pub fn tick(&mut self, sample: &ControllerSample, game: Option<GamePosition>) -> TickOutcome {
        if sample.buttons.contains(self.config.controls.quit) {
            info!("Quit button ({}) pressed", self.config.controls.quit);
            return TickOutcome {
                events: Vec::new(),
                quit: true,
            };
        }

        let input = ModeInput {
            previous: self.previous,
            buttons: sample.buttons,
            accel: sample.accel,
            aim: game.map(|game| self.mapper.map(sample.x, sample.y, game)),
        };

        let mode_before = self.modes.mode();
        let mut events = self.modes.step(&self.config, &input);
        if mode_before == Mode::Movement && self.modes.mode() != Mode::Movement {
            events.extend(self.dispatcher.leave_movement(&self.config.bindings));
        }

        events.extend(self.dispatcher.dispatch(
            &self.config.bindings,
            self.previous,
            sample.buttons,
            self.modes.mode(),
        ));

        self.previous = sample.buttons;
        TickOutcome {
            events,
            quit: false,
        }
    }

    /// Releases every key still held, arrows first
    pub fn release_all(&mut self) -> Vec<KeyEvent> {
        let mut events = self.modes.release_all();
        events.extend(self.dispatcher.release_all(&self.config.bindings));
        events
    }
}
