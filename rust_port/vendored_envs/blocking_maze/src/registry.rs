use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::MazeError;
use crate::layout::MazeLayout;

pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";

/// Named layouts a session may switch between.
///
/// Layouts are shared as `Arc`s so any number of sessions can point at the
/// same immutable value. Aliases resolve to a canonical id.
#[derive(Clone, Debug, Default)]
pub struct LayoutRegistry {
    layouts: BTreeMap<String, Arc<MazeLayout>>,
    aliases: BTreeMap<String, String>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two blocking-maze variants under `left`/`right`, with
    /// `left-variant`/`right-variant` as aliases.
    pub fn with_defaults() -> Result<Self, MazeError> {
        let mut reg = Self::new();
        reg.register(LEFT, MazeLayout::left_variant()?);
        reg.register(RIGHT, MazeLayout::right_variant()?);
        reg.alias("left-variant", LEFT)?;
        reg.alias("right-variant", RIGHT)?;
        Ok(reg)
    }

    /// Insert or replace a layout under a canonical id.
    pub fn register(&mut self, id: &str, layout: MazeLayout) -> Option<Arc<MazeLayout>> {
        self.aliases.remove(id);
        self.layouts.insert(id.to_string(), Arc::new(layout))
    }

    pub fn alias(&mut self, alias: &str, target: &str) -> Result<(), MazeError> {
        let canonical = self
            .canonical_id(target)
            .ok_or_else(|| MazeError::InvalidLayout(format!("alias target '{target}' is not registered")))?
            .to_string();
        if self.layouts.contains_key(alias) {
            return Err(MazeError::InvalidLayout(format!("alias '{alias}' shadows a layout id")));
        }
        self.aliases.insert(alias.to_string(), canonical);
        Ok(())
    }

    pub fn canonical_id<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if self.layouts.contains_key(id) {
            return Some(id);
        }
        self.aliases.get(id).map(String::as_str)
    }

    /// Look up a layout by id or alias, returning its canonical id.
    pub fn get(&self, id: &str) -> Result<(String, Arc<MazeLayout>), MazeError> {
        let canonical = self
            .canonical_id(id)
            .ok_or_else(|| MazeError::InvalidLayoutSwitch(id.to_string()))?;
        let layout = self
            .layouts
            .get(canonical)
            .cloned()
            .ok_or_else(|| MazeError::InvalidLayoutSwitch(id.to_string()))?;
        Ok((canonical.to_string(), layout))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.canonical_id(id).is_some()
    }

    /// Canonical ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        self.layouts.keys().cloned().collect()
    }
}
