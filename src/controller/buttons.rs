use serde::Deserialize;
use std::fmt;

/// Physical buttons of the PS Move controller
///
/// Discriminants are the bit positions used in the controller's report bitmask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Button {
    Triangle,
    Circle,
    Cross,
    Square,
    Select,
    Start,
    Ps,
    Move,
    T,
}

impl Button {
    pub const ALL: [Button; 9] = [
        Button::Triangle,
        Button::Circle,
        Button::Cross,
        Button::Square,
        Button::Select,
        Button::Start,
        Button::Ps,
        Button::Move,
        Button::T,
    ];

    /// Bit mask of this button inside a raw report
    pub const fn mask(self) -> u32 {
        match self {
            Button::Triangle => 1 << 0x04,
            Button::Circle => 1 << 0x05,
            Button::Cross => 1 << 0x06,
            Button::Square => 1 << 0x07,
            Button::Select => 1 << 0x08,
            Button::Start => 1 << 0x0B,
            Button::Ps => 1 << 0x10,
            Button::Move => 1 << 0x13,
            Button::T => 1 << 0x14,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Triangle => "TRIANGLE",
            Button::Circle => "CIRCLE",
            Button::Cross => "CROSS",
            Button::Square => "SQUARE",
            Button::Select => "SELECT",
            Button::Start => "START",
            Button::Ps => "PS",
            Button::Move => "MOVE",
            Button::T => "T",
        };
        write!(f, "{}", name)
    }
}

/// Set of held controller buttons for one tick
///
/// Wraps the raw report bitmask. Edge queries compare against the set from the
/// previous tick, so callers never touch the bits directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u32);

impl ButtonSet {
    pub const EMPTY: ButtonSet = ButtonSet(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn with(self, button: Button) -> Self {
        Self(self.0 | button.mask())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    /// Buttons whose held state differs from `previous`
    pub fn changed_since(self, previous: ButtonSet) -> ButtonSet {
        ButtonSet(self.0 ^ previous.0)
    }

    /// True when `button` went from released to held
    pub fn pressed_since(self, previous: ButtonSet, button: Button) -> bool {
        self.contains(button) && !previous.contains(button)
    }

    /// True when `button` went from held to released
    pub fn released_since(self, previous: ButtonSet, button: Button) -> bool {
        !self.contains(button) && previous.contains(button)
    }

    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        iter.into_iter().fold(ButtonSet::EMPTY, ButtonSet::with)
    }
}
