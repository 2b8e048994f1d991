//! Keyboard state to movement intent.

use gridwalk_core::{Direction, MovementIntent};
use thiserror::Error;

/// Error raised when a key chord names an unmapped key.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unmapped movement key {0:?}")]
pub struct UnknownKey(pub char);

/// Movement keys held during a frame.
///
/// `w`/`s` map to north/south, `a`/`d` to west/east and `q`, `e`, `z`, `c`
/// to the four diagonals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyState {
    /// Toward increasing z.
    pub up: bool,
    /// Toward decreasing z.
    pub down: bool,
    /// Toward decreasing x.
    pub left: bool,
    /// Toward increasing x.
    pub right: bool,
    /// Diagonal north-west.
    pub up_left: bool,
    /// Diagonal north-east.
    pub up_right: bool,
    /// Diagonal south-west.
    pub down_left: bool,
    /// Diagonal south-east.
    pub down_right: bool,
}

impl KeyState {
    /// Parses a chord such as `"wd"`; case and whitespace are ignored.
    pub fn from_keys(keys: &str) -> Result<Self, UnknownKey> {
        let mut state = Self::default();
        for key in keys.chars().filter(|key| !key.is_whitespace()) {
            match key.to_ascii_lowercase() {
                'w' => state.up = true,
                's' => state.down = true,
                'a' => state.left = true,
                'd' => state.right = true,
                'q' => state.up_left = true,
                'e' => state.up_right = true,
                'z' => state.down_left = true,
                'c' => state.down_right = true,
                _ => return Err(UnknownKey(key)),
            }
        }
        Ok(state)
    }

    /// Resolves the held keys into a single grid direction.
    ///
    /// Diagonal keys win in the order q, e, z, c. Opposite cardinal keys
    /// cancel each other on their axis.
    #[must_use]
    pub fn intent(&self) -> MovementIntent {
        let diagonals = [
            (self.up_left, Direction::NorthWest),
            (self.up_right, Direction::NorthEast),
            (self.down_left, Direction::SouthWest),
            (self.down_right, Direction::SouthEast),
        ];
        if let Some((_, direction)) = diagonals.into_iter().find(|(held, _)| *held) {
            return MovementIntent::toward(direction);
        }

        let column = i32::from(self.right) - i32::from(self.left);
        let row = i32::from(self.up) - i32::from(self.down);
        Direction::from_delta(column, row).map_or(MovementIntent::none(), MovementIntent::toward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(keys: &str) -> Option<Direction> {
        KeyState::from_keys(keys)
            .expect("valid chord")
            .intent()
            .direction()
    }

    #[test]
    fn cardinal_keys_combine_into_diagonals() {
        assert_eq!(intent("w"), Some(Direction::North));
        assert_eq!(intent("a"), Some(Direction::West));
        assert_eq!(intent("wd"), Some(Direction::NorthEast));
        assert_eq!(intent("sa"), Some(Direction::SouthWest));
    }

    #[test]
    fn opposite_keys_cancel() {
        assert_eq!(intent("ws"), None);
        assert_eq!(intent("wsd"), Some(Direction::East));
        assert_eq!(intent("adws"), None);
        assert_eq!(intent(""), None);
    }

    #[test]
    fn diagonal_keys_take_precedence() {
        assert_eq!(intent("cw"), Some(Direction::SouthEast));
        assert_eq!(intent("zqs"), Some(Direction::NorthWest));
        assert_eq!(intent("E"), Some(Direction::NorthEast));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert_eq!(KeyState::from_keys("wx"), Err(UnknownKey('x')));
        assert!(KeyState::from_keys(" w d ").is_ok());
    }
}
