use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MazeError;

/// Largest grid a layout may cover (height * width).
pub const MAX_CELLS: i32 = 1 << 24;

/// Grid coordinate as (row, col), row 0 at the top.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Component-wise translation, saturating at the `i32` limits; no bounds checking.
    pub fn offset(self, (dr, dc): (i32, i32)) -> Self {
        Self { row: self.row.saturating_add(dr), col: self.col.saturating_add(dc) }
    }
}

impl From<(i32, i32)> for Position {
    fn from((row, col): (i32, i32)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One immutable wall configuration over a fixed-size grid.
///
/// Blocked cells are kept as an ordered set for introspection and mirrored
/// into a dense row-major mask so membership checks stay O(1).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MazeLayout {
    height: i32,
    width: i32,
    blocked: BTreeSet<Position>,
    #[serde(skip)]
    mask: Vec<bool>,
}

impl MazeLayout {
    pub fn new(
        height: i32,
        width: i32,
        blocked: impl IntoIterator<Item = Position>,
    ) -> Result<Self, MazeError> {
        if height <= 0 || width <= 0 {
            return Err(MazeError::InvalidLayout(format!(
                "dimensions must be positive, got {height}x{width}"
            )));
        }
        let cells = height
            .checked_mul(width)
            .filter(|&n| n <= MAX_CELLS)
            .ok_or_else(|| {
                MazeError::InvalidLayout(format!("{height}x{width} grid exceeds {MAX_CELLS} cells"))
            })?;
        let mut layout = Self {
            height,
            width,
            blocked: BTreeSet::new(),
            mask: vec![false; cells as usize],
        };
        for cell in blocked {
            if !layout.in_bounds(cell) {
                return Err(MazeError::CellOutOfBounds { cell, height, width });
            }
            let idx = layout.index(cell);
            layout.mask[idx] = true;
            layout.blocked.insert(cell);
        }
        Ok(layout)
    }

    /// Build a layout from text rows: `#` is a wall, `.` is open floor.
    pub fn from_rows(rows: &[&str]) -> Result<Self, MazeError> {
        let height = rows.len();
        if height == 0 {
            return Err(MazeError::InvalidLayout("no rows".into()));
        }
        let width = rows[0].chars().count();
        let mut blocked = Vec::new();
        for (r, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(MazeError::InvalidLayout(format!(
                    "row {r} has {} cells, expected {width}",
                    line.chars().count()
                )));
            }
            for (c, ch) in line.chars().enumerate() {
                match ch {
                    '#' => blocked.push(Position::new(r as i32, c as i32)),
                    '.' => {}
                    other => {
                        return Err(MazeError::InvalidLayout(format!(
                            "unknown glyph '{other}' at row {r}, col {c}"
                        )))
                    }
                }
            }
        }
        Self::new(height as i32, width as i32, blocked)
    }

    /// Sutton & Barto blocking maze, initial variant: the gap sits at the right end of the wall.
    pub fn left_variant() -> Result<Self, MazeError> {
        Self::from_rows(&[
            ".........",
            ".........",
            ".........",
            "########.",
            ".........",
            ".........",
        ])
    }

    /// Switched variant: the gap has slid to the left end of the wall.
    pub fn right_variant() -> Result<Self, MazeError> {
        Self::from_rows(&[
            ".........",
            ".........",
            ".........",
            ".########",
            ".........",
            ".........",
        ])
    }

    pub fn height(&self) -> i32 { self.height }
    pub fn width(&self) -> i32 { self.width }
    pub fn blocked_cells(&self) -> &BTreeSet<Position> { &self.blocked }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        (0..self.height).contains(&pos.row) && (0..self.width).contains(&pos.col)
    }

    #[inline]
    pub fn is_blocked(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.mask[self.index(pos)]
    }

    /// Row-major mask slot. Only meaningful for in-bounds positions.
    #[inline]
    fn index(&self, pos: Position) -> usize {
        pos.row as usize * self.width as usize + pos.col as usize
    }

    /// Clamp each coordinate independently onto the grid.
    pub fn clamp(&self, pos: Position) -> Position {
        Position {
            row: pos.row.clamp(0, self.height - 1),
            col: pos.col.clamp(0, self.width - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layouts_differ_only_in_gap() {
        let left = MazeLayout::left_variant().unwrap();
        let right = MazeLayout::right_variant().unwrap();
        assert_eq!((left.height(), left.width()), (6, 9));
        assert_eq!((right.height(), right.width()), (6, 9));
        let diff: Vec<_> = left.blocked_cells().symmetric_difference(right.blocked_cells()).copied().collect();
        assert_eq!(diff, vec![Position::new(3, 0), Position::new(3, 8)]);
        assert!(!left.is_blocked(Position::new(3, 8)));
        assert!(!right.is_blocked(Position::new(3, 0)));
    }

    #[test]
    fn rejects_cell_outside_grid() {
        let err = MazeLayout::new(2, 2, [Position::new(2, 0)]).unwrap_err();
        assert!(matches!(err, MazeError::CellOutOfBounds { .. }));
        let err = MazeLayout::new(2, 2, [Position::new(0, -1)]).unwrap_err();
        assert!(matches!(err, MazeError::CellOutOfBounds { .. }));
    }

    #[test]
    fn rejects_degenerate_dimensions_and_rows() {
        assert!(MazeLayout::new(0, 3, []).is_err());
        assert!(MazeLayout::from_rows(&[]).is_err());
        assert!(MazeLayout::from_rows(&["..", "..."]).is_err());
        assert!(MazeLayout::from_rows(&[".x"]).is_err());
    }

    #[test]
    fn out_of_bounds_is_never_blocked() {
        let layout = MazeLayout::left_variant().unwrap();
        assert!(!layout.is_blocked(Position::new(-1, 0)));
        assert!(!layout.is_blocked(Position::new(3, 9)));
        assert!(!layout.in_bounds(Position::new(6, 0)));
        assert_eq!(layout.clamp(Position::new(-3, 12)), Position::new(0, 8));
    }

    #[test]
    fn oversized_grid_is_an_error_not_a_panic() {
        let err = MazeLayout::new(100_000, 100_000, []).unwrap_err();
        assert!(matches!(err, MazeError::InvalidLayout(_)));
        assert!(matches!(MazeLayout::new(i32::MAX, 2, []), Err(MazeError::InvalidLayout(_))));
        assert!(MazeLayout::new(MAX_CELLS + 1, 1, []).is_err());
        let wide = MazeLayout::new(1, 4096, [Position::new(0, 4095)]).unwrap();
        assert!(wide.is_blocked(Position::new(0, 4095)));
        assert!(!wide.is_blocked(Position::new(0, 4094)));
    }

    #[test]
    fn offset_saturates_at_extremes() {
        let far = Position::new(i32::MAX, i32::MIN);
        assert_eq!(far.offset((1, -1)), far);
        assert_eq!(Position::new(2, 3).offset((-1, 1)), Position::new(1, 4));
    }
}
