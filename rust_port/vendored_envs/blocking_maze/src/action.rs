use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MazeError;
use crate::layout::{MazeLayout, Position};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Unit (row, col) displacement.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = MazeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Action::Up),
            "down" => Ok(Action::Down),
            "left" => Ok(Action::Left),
            "right" => Ok(Action::Right),
            _ => Err(MazeError::InvalidAction(format!("'{s}' (expected up/down/left/right)"))),
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = MazeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Action::Up,
            1 => Action::Down,
            2 => Action::Left,
            3 => Action::Right,
            _ => return Err(MazeError::InvalidAction(format!("index {v} (expected 0..3)"))),
        })
    }
}

/// Apply one action to one position under one layout.
///
/// Moving off the grid clamps to the edge. If the clamped cell is a wall the
/// move is discarded and `pos` comes back unchanged.
pub fn resolve(pos: Position, action: Action, layout: &MazeLayout) -> Position {
    let candidate = layout.clamp(pos.offset(action.delta()));
    if layout.is_blocked(candidate) {
        pos
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("UP".parse::<Action>().unwrap(), Action::Up);
        assert_eq!("Right".parse::<Action>().unwrap(), Action::Right);
        assert!(matches!("jump".parse::<Action>(), Err(MazeError::InvalidAction(_))));
    }

    #[test]
    fn edge_clamp_is_not_a_collision() {
        let layout = MazeLayout::left_variant().unwrap();
        let corner = Position::new(0, 0);
        assert_eq!(resolve(corner, Action::Up, &layout), corner);
        assert_eq!(resolve(corner, Action::Left, &layout), corner);
        assert_eq!(resolve(corner, Action::Right, &layout), Position::new(0, 1));
    }

    #[test]
    fn wall_collision_is_full_noop() {
        let layout = MazeLayout::left_variant().unwrap();
        assert_eq!(resolve(Position::new(2, 1), Action::Down, &layout), Position::new(2, 1));
        assert_eq!(resolve(Position::new(4, 4), Action::Up, &layout), Position::new(4, 4));
        assert_eq!(resolve(Position::new(2, 8), Action::Down, &layout), Position::new(3, 8));
    }

    #[test]
    fn far_off_grid_positions_clamp_without_overflow() {
        let layout = MazeLayout::left_variant().unwrap();
        assert_eq!(resolve(Position::new(i32::MAX, 0), Action::Down, &layout), Position::new(5, 0));
        assert_eq!(resolve(Position::new(i32::MIN, 4), Action::Up, &layout), Position::new(0, 4));
        assert_eq!(resolve(Position::new(i32::MIN, i32::MAX), Action::Right, &layout), Position::new(0, 8));
    }
}
