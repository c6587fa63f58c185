//! Environment contract shared by engine adapters and the HTTP service.
//! Agents drive an environment through `ToolCall`s and read back `Observation`s;
//! an [`EnvRegistry`] maps names to factories so drivers can construct environments from JSON config.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Canonical tool call: tool name and JSON-serializable arguments.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Json,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Json) -> Self {
        Self { tool: tool.into(), args }
    }
}

/// Observation contract. Enforces presence of terminated/truncated; additional fields live in `data`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub terminated: bool,
    pub truncated: bool,
    /// Per-environment fields (agent position, layout, rewards, grid views).
    #[serde(default)]
    pub data: Json,
}

/// Snapshot contract for checkpointing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub engine: String,
    pub data: Json,
}

/// Environment errors mapped to HTTP responses by services.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The request is well-formed but the environment is in the wrong state for it.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Core async environment trait.
#[async_trait]
pub trait Environment: Send + Sync {
    async fn initialize(&mut self) -> Result<Observation, EngineError>;
    async fn step(&mut self, tool_calls: Vec<ToolCall>) -> Result<Observation, EngineError>;
    async fn checkpoint(&self) -> Result<Snapshot, EngineError>;
    async fn terminate(&mut self) -> Result<Observation, EngineError>;
}

// ---------------------------------
// Environment catalog
// ---------------------------------

/// Builds an environment from optional JSON config.
pub type EnvFactory = Arc<dyn Fn(Option<Json>) -> Result<Box<dyn Environment>, EngineError> + Send + Sync + 'static>;

/// Catalog row as listed to drivers: the environment name plus whatever the
/// adapter chose to advertise (accepted config, layouts, tools).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnvDescriptor {
    pub name: String,
    #[serde(default)]
    pub about: Json,
}

#[derive(Clone)]
struct EnvEntry {
    about: Json,
    factory: EnvFactory,
}

/// Named environment factories owned by whoever serves them.
///
/// Built once at startup, then shared read-only, so lookups need no locking.
#[derive(Clone, Default)]
pub struct EnvRegistry {
    entries: BTreeMap<String, EnvEntry>,
}

impl EnvRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the factory for `name`.
    pub fn register(&mut self, name: &str, about: Json, factory: EnvFactory) -> &mut Self {
        if self.entries.insert(name.to_string(), EnvEntry { about, factory }).is_some() {
            tracing::warn!(env = name, "replacing registered environment");
        } else {
            tracing::debug!(env = name, "registered environment");
        }
        self
    }

    pub fn create(&self, name: &str, config: Option<Json>) -> Result<Box<dyn Environment>, EngineError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| EngineError::NotFound(format!("unsupported environment: {name}")))?;
        (entry.factory)(config)
    }

    /// Descriptors in name order.
    pub fn describe(&self) -> Vec<EnvDescriptor> {
        self.entries
            .iter()
            .map(|(name, entry)| EnvDescriptor { name: name.clone(), about: entry.about.clone() })
            .collect()
    }
}

impl std::fmt::Debug for EnvRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// -----------------------
// Reproducibility traits
// -----------------------

/// Engines that can serialize their full state.
pub trait ReproducibleEngine: Send + Sync {
    fn serialize_engine(&self) -> Result<Json, EngineError>;
    fn engine_name(&self) -> String;
}

/// Helper to build Snapshots from a ReproducibleEngine.
pub fn make_snapshot(engine: &dyn ReproducibleEngine, version: u32) -> Result<Snapshot, EngineError> {
    let data = engine.serialize_engine()?;
    Ok(Snapshot { version, engine: engine.engine_name(), data })
}
