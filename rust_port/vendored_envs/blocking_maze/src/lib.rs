//! Pure blocking-maze logic crate.
//! - Layouts as immutable blocked-cell sets, plus a registry keyed by id
//! - Action vocabulary and the deterministic transition rule
//! - Episodic session with reset/step and hot-swappable layouts

mod action;
mod error;
mod layout;
mod registry;
mod session;

pub use action::{resolve, Action};
pub use error::MazeError;
pub use layout::{MazeLayout, Position, MAX_CELLS};
pub use registry::{LayoutRegistry, LEFT, RIGHT};
pub use session::{Info, MazeSession, Phase, StepOutcome, GOAL_POSITION, START_POSITION};
