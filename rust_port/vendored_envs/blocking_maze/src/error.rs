use thiserror::Error;

use crate::layout::Position;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("invalid layout: blocked cell {cell} outside {height}x{width} grid")]
    CellOutOfBounds { cell: Position, height: i32, width: i32 },
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("invalid layout switch: unknown layout '{0}'")]
    InvalidLayoutSwitch(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("session not active: call reset before step")]
    SessionNotActive,
}
