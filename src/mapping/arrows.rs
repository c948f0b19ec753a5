//! Arrow-key state and the 8-way direction quantizer

use crate::mapping::{KeyCode, KeyEvent};
use std::f32::consts::FRAC_PI_4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Up,
    Left,
    Down,
}

impl Direction {
    /// Counter-clockwise order starting at 0° (pointing right)
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Up,
        Direction::Left,
        Direction::Down,
    ];

    pub const fn key(self) -> KeyCode {
        match self {
            Direction::Right => KeyCode::RIGHT,
            Direction::Up => KeyCode::UP,
            Direction::Left => KeyCode::LEFT,
            Direction::Down => KeyCode::DOWN,
        }
    }

    pub const fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    const fn bit(self) -> u8 {
        match self {
            Direction::Right => 1 << 0,
            Direction::Up => 1 << 1,
            Direction::Left => 1 << 2,
            Direction::Down => 1 << 3,
        }
    }

    /// Next direction counter-clockwise
    const fn ccw(self) -> Direction {
        match self {
            Direction::Right => Direction::Up,
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
        }
    }
}

/// Held arrow keys
///
/// Holds at most two directions and two held directions are always one
/// vertical plus one horizontal. The constructors are the only way in, so the
/// invariant cannot be broken from outside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArrowSet(u8);

impl ArrowSet {
    pub const EMPTY: ArrowSet = ArrowSet(0);

    pub const fn single(direction: Direction) -> Self {
        Self(direction.bit())
    }

    /// Diagonal made of two directions, `None` unless they are orthogonal
    pub fn diagonal(a: Direction, b: Direction) -> Option<Self> {
        (a.is_vertical() != b.is_vertical()).then_some(Self(a.bit() | b.bit()))
    }

    /// Arrow set for an 8-way sector (`0..8`, counter-clockwise from right)
    ///
    /// | sector | arrows      |
    /// |--------|-------------|
    /// | 0      | Right       |
    /// | 1      | Right + Up  |
    /// | 2      | Up          |
    /// | 3      | Up + Left   |
    /// | 4      | Left        |
    /// | 5      | Left + Down |
    /// | 6      | Down        |
    /// | 7      | Down + Right|
    pub fn from_sector(sector: usize) -> Self {
        let base = Direction::ALL[(sector / 2) % 4];
        if sector % 2 == 0 {
            Self::single(base)
        } else {
            Self(base.bit() | base.ccw().bit())
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// Key events that turn `self` into `next`
    ///
    /// Directions held in both sets produce nothing.
    pub fn transitions_to(self, next: ArrowSet) -> impl Iterator<Item = KeyEvent> {
        let changed = self.0 ^ next.0;
        Direction::ALL
            .into_iter()
            .filter(move |d| changed & d.bit() != 0)
            .map(move |d| KeyEvent {
                code: d.key(),
                pressed: next.contains(d),
            })
    }
}

/// Quantizes an angle in `[0, 2π)` into one of 8 sectors of 45°
///
/// Sector boundaries sit halfway between the cardinal and diagonal directions,
/// so sector 0 covers `[-22.5°, 22.5°)`.
pub fn sector(angle: f32) -> usize {
    (angle / FRAC_PI_4).round() as usize % 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn test_sector_range_and_shape() {
        let steps = 3600;
        for i in 0..steps {
            let angle = TAU * i as f32 / steps as f32;
            let s = sector(angle);
            assert!(s < 8, "angle {} gave sector {}", angle, s);

            let arrows = ArrowSet::from_sector(s);
            if s % 2 == 0 {
                assert_eq!(arrows.len(), 1);
            } else {
                assert_eq!(arrows.len(), 2);
                let mut dirs = arrows.iter();
                let (a, b) = (dirs.next().unwrap(), dirs.next().unwrap());
                assert_ne!(a.is_vertical(), b.is_vertical());
            }
        }
    }

    #[test]
    fn test_sector_table() {
        use Direction::*;
        let expected = [
            ArrowSet::single(Right),
            ArrowSet::diagonal(Right, Up).unwrap(),
            ArrowSet::single(Up),
            ArrowSet::diagonal(Up, Left).unwrap(),
            ArrowSet::single(Left),
            ArrowSet::diagonal(Left, Down).unwrap(),
            ArrowSet::single(Down),
            ArrowSet::diagonal(Down, Right).unwrap(),
        ];
        for (s, arrows) in expected.iter().enumerate() {
            assert_eq!(ArrowSet::from_sector(s), *arrows, "sector {}", s);
        }
    }

    #[test]
    fn test_sector_boundaries() {
        let deg = |d: f32| d.to_radians();
        assert_eq!(sector(deg(0.0)), 0);
        assert_eq!(sector(deg(22.0)), 0);
        assert_eq!(sector(deg(23.0)), 1);
        assert_eq!(sector(deg(315.0)), 7);
        assert_eq!(sector(deg(340.0)), 0);
        assert_eq!(sector(deg(359.9)), 0);
    }

    #[test]
    fn test_diagonal_rejects_parallel() {
        use Direction::*;
        assert!(ArrowSet::diagonal(Up, Down).is_none());
        assert!(ArrowSet::diagonal(Left, Right).is_none());
        assert!(ArrowSet::diagonal(Up, Up).is_none());
        assert!(ArrowSet::diagonal(Up, Right).is_some());
    }

    #[test]
    fn test_transitions() {
        use Direction::*;
        let from = ArrowSet::diagonal(Up, Right).unwrap();
        let to = ArrowSet::diagonal(Up, Left).unwrap();

        let events: Vec<_> = from.transitions_to(to).collect();
        assert_eq!(
            events,
            vec![KeyEvent::release(KeyCode::RIGHT), KeyEvent::press(KeyCode::LEFT)]
        );

        // same set twice is silent
        assert_eq!(to.transitions_to(to).count(), 0);
        assert_eq!(ArrowSet::EMPTY.transitions_to(ArrowSet::EMPTY).count(), 0);
    }
}
