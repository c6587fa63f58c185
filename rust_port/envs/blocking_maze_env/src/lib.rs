use async_trait::async_trait;
use blocking_maze_rs::{Action, LayoutRegistry, MazeError, MazeSession, Position, LEFT};
use maze_core::{
    make_snapshot, EngineError, EnvRegistry, Environment, Observation, ReproducibleEngine, Snapshot, ToolCall,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry name for this environment.
pub const ENV_NAME: &str = "BlockingMaze";

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Layout id (or alias) active on the first episode. Defaults to `left`.
    pub layout: Option<String>,
    /// Attach `grid_text`/`grid_array` to every observation. Defaults to true.
    pub include_grid: Option<bool>,
}

fn map_maze_err(err: MazeError) -> EngineError {
    match err {
        MazeError::InvalidAction(_) | MazeError::InvalidLayoutSwitch(_) => EngineError::Validation(err.to_string()),
        MazeError::SessionNotActive => EngineError::Conflict(err.to_string()),
        MazeError::InvalidLayout(_) | MazeError::CellOutOfBounds { .. } => EngineError::Internal(err.to_string()),
    }
}

/// Accepts either an action name ("up") or its index (0..3).
fn action_from_json(v: &Json) -> Result<Action, EngineError> {
    if let Some(name) = v.as_str() {
        return name.parse().map_err(map_maze_err);
    }
    if let Some(idx) = v.as_u64() {
        let idx = u8::try_from(idx).map_err(|_| EngineError::Validation(format!("invalid action: index {idx} (expected 0..3)")))?;
        return Action::try_from(idx).map_err(map_maze_err);
    }
    Err(EngineError::Validation(format!("action must be a name or index, got {v}")))
}

fn pos_json(p: Position) -> Json {
    json!([p.row, p.col])
}

pub struct BlockingMazeEnvironment {
    session: MazeSession,
    include_grid: bool,
    terminated: bool,
    truncated: bool,
}

impl BlockingMazeEnvironment {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let registry = Arc::new(LayoutRegistry::with_defaults().map_err(map_maze_err)?);
        let layout = config.layout.as_deref().unwrap_or(LEFT);
        let session = MazeSession::new(registry, layout).map_err(map_maze_err)?;
        Ok(Self::with_session(session, config.include_grid.unwrap_or(true)))
    }

    /// Wrap an existing session, e.g. one built over a custom layout registry.
    pub fn with_session(session: MazeSession, include_grid: bool) -> Self {
        Self { session, include_grid, terminated: false, truncated: false }
    }

    pub fn session(&self) -> &MazeSession {
        &self.session
    }

    fn snapshot_obs(&self, event: &str, extra: Json) -> Observation {
        let layout = self.session.active_layout();
        let blocked: Vec<Json> = layout.blocked_cells().iter().map(|&p| pos_json(p)).collect();
        let mut data = json!({
            "agent_position": self.session.agent_position().map(pos_json),
            "start_position": pos_json(self.session.start_position()),
            "goal_position": pos_json(self.session.goal_position()),
            "layout": self.session.active_layout_id(),
            "layouts": self.session.registry().ids(),
            "height": layout.height(),
            "width": layout.width(),
            "blocked_cells": blocked,
            "last_action": self.session.last_action().map(Action::name),
            "num_env_steps": self.session.num_env_steps,
            "episode": self.session.episode,
            "reward_last": self.session.reward_last,
            "total_reward": self.session.total_reward,
            "terminated": self.terminated,
            "truncated": self.truncated,
            "info": {},
            "event": event,
            "extra": extra,
        });
        if self.include_grid {
            if let Some(map) = data.as_object_mut() {
                map.insert("grid_text".into(), Json::String(self.session.grid_text()));
                map.insert("grid_array".into(), json!(self.session.grid_array()));
            }
        }
        Observation { terminated: self.terminated, truncated: self.truncated, data }
    }

    fn reset(&mut self, switch_to: Option<&str>) -> Result<(), EngineError> {
        self.session.reset(switch_to).map_err(map_maze_err)?;
        self.terminated = false;
        self.truncated = false;
        Ok(())
    }

    /// Step through `actions` in order, stopping early at the goal. Returns steps taken.
    fn run_actions(&mut self, actions: &[Action]) -> Result<usize, EngineError> {
        let mut taken = 0;
        for &action in actions {
            let out = self.session.step(action).map_err(map_maze_err)?;
            taken += 1;
            self.terminated = out.terminated;
            self.truncated = out.truncated;
            if out.terminated {
                break;
            }
        }
        Ok(taken)
    }

    fn apply(&mut self, call: &ToolCall) -> Result<Json, EngineError> {
        match call.tool.as_str() {
            "interact" | "move" => {
                let args = &call.args;
                // Parse everything up front so a bad entry rejects the whole call.
                let actions = if let Some(a) = args.get("action") {
                    vec![action_from_json(a)?]
                } else if let Some(arr) = args.get("actions").and_then(|v| v.as_array()) {
                    arr.iter().map(action_from_json).collect::<Result<Vec<_>, _>>()?
                } else {
                    return Err(EngineError::Validation("missing 'action' or 'actions'".into()));
                };
                let taken = self.run_actions(&actions)?;
                Ok(json!({ "steps_taken": taken }))
            }
            "reset" => {
                let switch_to = match call.args.get("switch_to").or_else(|| call.args.get("shift_maze")) {
                    None | Some(Json::Null) => None,
                    Some(Json::String(s)) => Some(s.as_str()),
                    Some(other) => return Err(EngineError::Validation(format!("layout id must be a string, got {other}"))),
                };
                self.reset(switch_to)?;
                Ok(json!({ "switched_to": switch_to }))
            }
            _ => Err(EngineError::Validation(format!("unknown tool: {}", call.tool))),
        }
    }
}

impl ReproducibleEngine for BlockingMazeEnvironment {
    fn serialize_engine(&self) -> Result<Json, EngineError> {
        Ok(json!({
            "layout": self.session.active_layout_id(),
            "agent_position": self.session.agent_position().map(pos_json),
            "phase": self.session.phase(),
            "last_action": self.session.last_action(),
            "num_env_steps": self.session.num_env_steps,
            "episode": self.session.episode,
            "reward_last": self.session.reward_last,
            "total_reward": self.session.total_reward,
            "terminated": self.terminated,
            "truncated": self.truncated,
        }))
    }

    fn engine_name(&self) -> String {
        "blocking_maze".into()
    }
}

#[async_trait]
impl Environment for BlockingMazeEnvironment {
    async fn initialize(&mut self) -> Result<Observation, EngineError> {
        self.reset(None)?;
        Ok(self.snapshot_obs("initialize", Json::Null))
    }

    async fn step(&mut self, tool_calls: Vec<ToolCall>) -> Result<Observation, EngineError> {
        if tool_calls.is_empty() {
            return Err(EngineError::Validation("no tool_calls provided".into()));
        }
        let mut extra = Json::Null;
        for (i, call) in tool_calls.iter().enumerate() {
            extra = self.apply(call).inspect_err(|e| {
                warn!(tool = %call.tool, error = %e, "tool call rejected");
            })?;
            // The call that ends the episode also ends the batch.
            if self.terminated {
                let skipped = tool_calls.len() - i - 1;
                if skipped > 0 {
                    debug!(skipped, "episode ended mid-batch, dropping remaining tool calls");
                    if let Some(map) = extra.as_object_mut() {
                        map.insert("skipped_calls".into(), json!(skipped));
                    }
                }
                break;
            }
        }
        Ok(self.snapshot_obs("step", extra))
    }

    async fn checkpoint(&self) -> Result<Snapshot, EngineError> {
        make_snapshot(self, 1)
    }

    async fn terminate(&mut self) -> Result<Observation, EngineError> {
        self.session.end_episode();
        self.truncated = true;
        Ok(self.snapshot_obs("terminate", Json::Null))
    }
}

/// Catalog entry advertised next to [`ENV_NAME`]: layout ids, actions, tools and config keys.
pub fn describe() -> Result<Json, EngineError> {
    let layouts = LayoutRegistry::with_defaults().map_err(map_maze_err)?;
    Ok(json!({
        "layouts": layouts.ids(),
        "default_layout": LEFT,
        "actions": Action::ALL.iter().map(|a| a.name()).collect::<Vec<_>>(),
        "tools": ["interact", "move", "reset"],
        "config": ["layout", "include_grid"],
    }))
}

/// Add the blocking maze to `registry` under [`ENV_NAME`].
pub fn register_default_env(registry: &mut EnvRegistry) -> Result<(), EngineError> {
    registry.register(
        ENV_NAME,
        describe()?,
        Arc::new(|cfg| {
            let cfg: Config = match cfg {
                Some(v) => serde_json::from_value(v).map_err(|e| EngineError::Validation(format!("bad config: {e}")))?,
                None => Config::default(),
            };
            Ok(Box::new(BlockingMazeEnvironment::new(cfg)?))
        }),
    );
    Ok(())
}
