use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::{resolve, Action};
use crate::error::MazeError;
use crate::layout::{MazeLayout, Position};
use crate::registry::{LayoutRegistry, LEFT};

/// Start cell shared by every layout.
pub const START_POSITION: Position = Position::new(5, 3);
/// Goal cell shared by every layout.
pub const GOAL_POSITION: Position = Position::new(0, 8);

/// Cell codes used by [`MazeSession::grid_array`].
const CELL_OPEN: u8 = 0;
const CELL_WALL: u8 = 1;
const CELL_AGENT: u8 = 2;
const CELL_GOAL: u8 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Freshly constructed, or the last episode terminated.
    Idle,
    /// Between a `reset` and the terminating `step`.
    Active,
}

/// Diagnostic record returned by `reset` and `step`. Currently always empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub position: Position,
    pub reward: u8,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

/// Mutable interaction state over a swappable, shared layout.
#[derive(Clone, Debug)]
pub struct MazeSession {
    registry: Arc<LayoutRegistry>,
    layout_id: String,
    layout: Arc<MazeLayout>,
    agent_pos: Option<Position>,
    last_action: Option<Action>,
    phase: Phase,
    start: Position,
    goal: Position,
    pub num_env_steps: u32,
    pub episode: u32,
    pub reward_last: u8,
    pub total_reward: u32,
}

impl MazeSession {
    /// Create an Idle session on `layout_id`. Call [`reset`](Self::reset) before stepping.
    pub fn new(registry: Arc<LayoutRegistry>, layout_id: &str) -> Result<Self, MazeError> {
        let (layout_id, layout) = registry.get(layout_id)?;
        check_endpoints(&layout_id, &layout)?;
        Ok(Self {
            registry,
            layout_id,
            layout,
            agent_pos: None,
            last_action: None,
            phase: Phase::Idle,
            start: START_POSITION,
            goal: GOAL_POSITION,
            num_env_steps: 0,
            episode: 0,
            reward_last: 0,
            total_reward: 0,
        })
    }

    /// The classic setup: built-in layouts, starting on `left`.
    pub fn blocking_maze() -> Result<Self, MazeError> {
        Self::new(Arc::new(LayoutRegistry::with_defaults()?), LEFT)
    }

    /// Begin a new episode at the start cell, optionally switching layout first.
    ///
    /// An unknown layout id fails without touching any session state.
    pub fn reset(&mut self, switch_to: Option<&str>) -> Result<(Position, Info), MazeError> {
        if let Some(id) = switch_to {
            let (canonical, layout) = self.registry.get(id)?;
            check_endpoints(&canonical, &layout)?;
            if canonical != self.layout_id {
                info!(from = %self.layout_id, to = %canonical, "switching maze layout");
            }
            self.layout_id = canonical;
            self.layout = layout;
        }
        self.agent_pos = Some(self.start);
        self.phase = Phase::Active;
        self.episode += 1;
        self.num_env_steps = 0;
        self.reward_last = 0;
        self.total_reward = 0;
        debug!(episode = self.episode, layout = %self.layout_id, "episode reset");
        Ok((self.start, Info::default()))
    }

    pub fn step(&mut self, action: Action) -> Result<StepOutcome, MazeError> {
        let current = match (self.phase, self.agent_pos) {
            (Phase::Active, Some(pos)) => pos,
            _ => return Err(MazeError::SessionNotActive),
        };
        let next = resolve(current, action, &self.layout);
        let reward = u8::from(next == self.goal);
        let terminated = reward == 1;

        self.agent_pos = Some(next);
        self.last_action = Some(action);
        self.num_env_steps = self.num_env_steps.saturating_add(1);
        self.reward_last = reward;
        self.total_reward += u32::from(reward);
        debug!(%action, from = %current, to = %next, reward, "step");

        if terminated {
            self.phase = Phase::Idle;
            info!(episode = self.episode, steps = self.num_env_steps, layout = %self.layout_id, "goal reached");
        }
        Ok(StepOutcome { position: next, reward, terminated, truncated: false, info: Info::default() })
    }

    /// Parse `action` by name and step.
    pub fn step_named(&mut self, action: &str) -> Result<StepOutcome, MazeError> {
        self.step(action.parse()?)
    }

    /// Abandon the current episode; the next `step` needs a `reset`.
    pub fn end_episode(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn phase(&self) -> Phase { self.phase }
    pub fn is_active(&self) -> bool { self.phase == Phase::Active }
    /// `None` until the first reset. Left in place (stale) after termination.
    pub fn agent_position(&self) -> Option<Position> { self.agent_pos }
    pub fn start_position(&self) -> Position { self.start }
    pub fn goal_position(&self) -> Position { self.goal }
    pub fn last_action(&self) -> Option<Action> { self.last_action }
    pub fn active_layout(&self) -> &MazeLayout { &self.layout }
    pub fn active_layout_id(&self) -> &str { &self.layout_id }
    pub fn registry(&self) -> &LayoutRegistry { &self.registry }

    /// Row-major cell codes: 0 open, 1 wall, 2 agent, 3 goal.
    /// The goal is painted last so it stays visible under the agent.
    pub fn grid_array(&self) -> Vec<Vec<u8>> {
        let layout = &self.layout;
        let mut grid = vec![vec![CELL_OPEN; layout.width() as usize]; layout.height() as usize];
        for cell in layout.blocked_cells() {
            grid[cell.row as usize][cell.col as usize] = CELL_WALL;
        }
        if let Some(pos) = self.agent_pos.filter(|p| layout.in_bounds(*p)) {
            grid[pos.row as usize][pos.col as usize] = CELL_AGENT;
        }
        if layout.in_bounds(self.goal) {
            grid[self.goal.row as usize][self.goal.col as usize] = CELL_GOAL;
        }
        grid
    }

    /// Text view with 3-char glyphs per cell.
    pub fn grid_text(&self) -> String {
        let agent = self.agent_pos;
        let mut out = String::new();
        for row in 0..self.layout.height() {
            for col in 0..self.layout.width() {
                let pos = Position::new(row, col);
                let glyph = if Some(pos) == agent {
                    " A "
                } else if pos == self.goal {
                    " G "
                } else if self.layout.is_blocked(pos) {
                    " # "
                } else {
                    " _ "
                };
                out.push_str(glyph);
            }
            if row + 1 < self.layout.height() {
                out.push('\n');
            }
        }
        out
    }
}

/// Start and goal must be open cells of every layout a session runs on.
fn check_endpoints(id: &str, layout: &MazeLayout) -> Result<(), MazeError> {
    for (what, pos) in [("start", START_POSITION), ("goal", GOAL_POSITION)] {
        if !layout.in_bounds(pos) || layout.is_blocked(pos) {
            return Err(MazeError::InvalidLayout(format!("layout '{id}' has no open {what} cell at {pos}")));
        }
    }
    Ok(())
}
