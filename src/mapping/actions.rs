//! Edge-triggered button to action key dispatch

use crate::config::ActionBindings;
use crate::controller::ButtonSet;
use crate::mapping::{KeyEvent, Mode};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Logical game actions, in dispatch order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Shot,
    Bomb,
    Focus,
    Skip,
    Pause,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Shot,
        Action::Bomb,
        Action::Focus,
        Action::Skip,
        Action::Pause,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Shot => "shot",
            Action::Bomb => "bomb",
            Action::Focus => "focus",
            Action::Skip => "skip",
            Action::Pause => "pause",
        };
        f.write_str(name)
    }
}

/// How the shot key follows the shot button in movement mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmartShot {
    /// Key follows the button
    #[default]
    None,
    /// Key is held while the button is up
    Reverse,
    /// Each press flips the key between held and released
    Toggle,
}

/// Turns button edges into action key events
///
/// Remembers which action keys it left held so they can be released when the
/// session ends.
#[derive(Clone, Debug)]
pub struct ButtonActionDispatcher {
    smart_shot: SmartShot,
    shot_latched: bool,
    held: [bool; 5],
}

impl ButtonActionDispatcher {
    pub fn new(smart_shot: SmartShot) -> Self {
        Self {
            smart_shot,
            shot_latched: false,
            held: [false; 5],
        }
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held[action.index()]
    }

    pub fn shot_latched(&self) -> bool {
        self.shot_latched
    }

    /// One event for every action whose bound button changed between `previous`
    /// and `current`
    pub fn dispatch(
        &mut self,
        bindings: &ActionBindings,
        previous: ButtonSet,
        current: ButtonSet,
        mode: Mode,
    ) -> Vec<KeyEvent> {
        let changed = current.changed_since(previous);
        let mut events = Vec::new();
        if changed.is_empty() {
            return events;
        }

        for (action, binding) in bindings.iter() {
            if !changed.contains(binding.button) {
                continue;
            }
            let raw = current.contains(binding.button);

            let pressed = match (action, mode, self.smart_shot) {
                (Action::Shot, Mode::Movement, SmartShot::Reverse) => !raw,
                (Action::Shot, Mode::Movement, SmartShot::Toggle) => {
                    if raw {
                        self.shot_latched = !self.shot_latched;
                        self.shot_latched
                    } else if self.is_held(action) && !self.shot_latched {
                        // pressed in navigation mode, released after switching
                        false
                    } else {
                        continue;
                    }
                }
                _ => raw,
            };

            debug!("{} ({}) -> {} {}", action, binding.button, binding.key, pressed);
            self.held[action.index()] = pressed;
            events.push(KeyEvent {
                code: binding.key,
                pressed,
            });
        }
        events
    }

    /// Releases the shot key left held by reverse or toggle when movement
    /// mode ends
    pub fn leave_movement(&mut self, bindings: &ActionBindings) -> Option<KeyEvent> {
        let owned = match self.smart_shot {
            SmartShot::None => false,
            SmartShot::Reverse => self.is_held(Action::Shot),
            SmartShot::Toggle => self.shot_latched,
        };
        self.shot_latched = false;
        if !owned {
            return None;
        }
        self.held[Action::Shot.index()] = false;
        Some(KeyEvent::release(bindings.get(Action::Shot).key))
    }

    /// Releases every action key still held
    pub fn release_all(&mut self, bindings: &ActionBindings) -> Vec<KeyEvent> {
        self.shot_latched = false;
        let mut events = Vec::new();
        for (action, binding) in bindings.iter() {
            if std::mem::take(&mut self.held[action.index()]) {
                events.push(KeyEvent::release(binding.key));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Binding;
    use crate::controller::Button;
    use crate::mapping::KeyCode;

    fn bindings() -> ActionBindings {
        ActionBindings::new(
            Binding {
                button: Button::Cross,
                key: KeyCode::Z,
            },
            Binding {
                button: Button::Circle,
                key: KeyCode::X,
            },
            Binding {
                button: Button::T,
                key: KeyCode::LEFT_SHIFT,
            },
            Binding {
                button: Button::Square,
                key: KeyCode::LEFT_CTRL,
            },
            Binding {
                button: Button::Select,
                key: KeyCode::ESC,
            },
        )
    }

    fn set(buttons: &[Button]) -> ButtonSet {
        buttons.iter().copied().collect()
    }

    #[test]
    fn test_one_event_per_changed_action() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::None);

        let previous = set(&[Button::Circle]);
        let current = set(&[Button::Cross, Button::T, Button::Start]);
        let events = dispatcher.dispatch(&b, previous, current, Mode::Movement);

        assert_eq!(
            events,
            vec![
                KeyEvent::press(KeyCode::Z),
                KeyEvent::release(KeyCode::X),
                KeyEvent::press(KeyCode::LEFT_SHIFT),
            ]
        );

        // nothing changed
        assert!(dispatcher
            .dispatch(&b, current, current, Mode::Movement)
            .is_empty());
    }

    #[test]
    fn test_reverse_only_in_movement() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::Reverse);
        let up = ButtonSet::EMPTY;
        let down = set(&[Button::Cross]);

        for (previous, current) in [(up, down), (down, up)] {
            let raw = current.contains(Button::Cross);
            let moving = dispatcher.dispatch(&b, previous, current, Mode::Movement);
            assert_eq!(moving, vec![KeyEvent { code: KeyCode::Z, pressed: !raw }]);

            let navigating = dispatcher.dispatch(&b, previous, current, Mode::Navigation);
            assert_eq!(navigating, vec![KeyEvent { code: KeyCode::Z, pressed: raw }]);
        }
    }

    #[test]
    fn test_reverse_leaves_other_actions_alone() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::Reverse);
        let events =
            dispatcher.dispatch(&b, ButtonSet::EMPTY, set(&[Button::Circle]), Mode::Movement);
        assert_eq!(events, vec![KeyEvent::press(KeyCode::X)]);
    }

    #[test]
    fn test_toggle_alternates() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::Toggle);
        let up = ButtonSet::EMPTY;
        let down = set(&[Button::Cross]);

        let mut emitted = Vec::new();
        for _ in 0..3 {
            emitted.extend(dispatcher.dispatch(&b, up, down, Mode::Movement));
            // release edges are swallowed
            assert!(dispatcher.dispatch(&b, down, up, Mode::Movement).is_empty());
        }

        assert_eq!(
            emitted,
            vec![
                KeyEvent::press(KeyCode::Z),
                KeyEvent::release(KeyCode::Z),
                KeyEvent::press(KeyCode::Z),
            ]
        );
        assert!(dispatcher.shot_latched());
    }

    #[test]
    fn test_leave_movement_releases_latch() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::Toggle);
        dispatcher.dispatch(&b, ButtonSet::EMPTY, set(&[Button::Cross]), Mode::Movement);

        assert_eq!(dispatcher.leave_movement(&b), Some(KeyEvent::release(KeyCode::Z)));
        assert!(!dispatcher.shot_latched());
        assert_eq!(dispatcher.leave_movement(&b), None);
    }

    #[test]
    fn test_leave_movement_releases_reversed_shot() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::Reverse);
        let down = set(&[Button::Cross]);

        dispatcher.dispatch(&b, ButtonSet::EMPTY, down, Mode::Movement);
        let events = dispatcher.dispatch(&b, down, ButtonSet::EMPTY, Mode::Movement);
        assert_eq!(events, vec![KeyEvent::press(KeyCode::Z)]);

        assert_eq!(dispatcher.leave_movement(&b), Some(KeyEvent::release(KeyCode::Z)));
        assert!(!dispatcher.is_held(Action::Shot));
        assert_eq!(dispatcher.leave_movement(&b), None);
    }

    #[test]
    fn test_leave_movement_keeps_plain_shot() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::None);
        dispatcher.dispatch(&b, ButtonSet::EMPTY, set(&[Button::Cross]), Mode::Movement);

        // the button is still down, its own release edge lifts the key
        assert_eq!(dispatcher.leave_movement(&b), None);
        assert!(dispatcher.is_held(Action::Shot));
    }

    #[test]
    fn test_toggle_releases_key_pressed_in_navigation() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::Toggle);
        let down = set(&[Button::Cross]);

        let pressed = dispatcher.dispatch(&b, ButtonSet::EMPTY, down, Mode::Navigation);
        assert_eq!(pressed, vec![KeyEvent::press(KeyCode::Z)]);

        let released = dispatcher.dispatch(&b, down, ButtonSet::EMPTY, Mode::Movement);
        assert_eq!(released, vec![KeyEvent::release(KeyCode::Z)]);
    }

    #[test]
    fn test_release_all() {
        let b = bindings();
        let mut dispatcher = ButtonActionDispatcher::new(SmartShot::None);
        dispatcher.dispatch(
            &b,
            ButtonSet::EMPTY,
            set(&[Button::Circle, Button::Select]),
            Mode::Movement,
        );

        assert_eq!(
            dispatcher.release_all(&b),
            vec![KeyEvent::release(KeyCode::X), KeyEvent::release(KeyCode::ESC)]
        );
        assert!(dispatcher.release_all(&b).is_empty());
    }
}
