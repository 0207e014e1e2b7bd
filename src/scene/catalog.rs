use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Catalog entry backing a token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Display name.
    pub name: String,
    /// Portrait path, campaign-relative.
    #[serde(default)]
    pub portrait: Option<String>,
    /// Starting hit points.
    #[serde(default)]
    pub hp: Option<i32>,
    /// Maximum hit points.
    #[serde(default)]
    pub max_hp: Option<i32>,
    /// Short text shown on the hover card.
    #[serde(default)]
    pub summary: String,
}

/// Lookup of entities referenced by tokens. Missing entries are normal.
pub trait EntityCatalog: Send + Sync {
    /// Entry for `(entity_type, entity_id)`.
    fn lookup(&self, entity_type: &str, entity_id: &str) -> Option<EntityRecord>;
}

/// Catalog held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    entries: HashMap<(String, String), EntityRecord>,
}

impl MemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        record: EntityRecord,
    ) -> Self {
        self.entries
            .insert((entity_type.into(), entity_id.into()), record);
        self
    }
}

impl EntityCatalog for MemoryCatalog {
    fn lookup(&self, entity_type: &str, entity_id: &str) -> Option<EntityRecord> {
        self.entries
            .get(&(entity_type.to_string(), entity_id.to_string()))
            .cloned()
    }
}

/// Hover card text for a token: name, hp line, then the catalog summary when present.
pub fn hover_text(
    catalog: &dyn EntityCatalog,
    token: &crate::scene::item::Token,
) -> String {
    let entry = catalog.lookup(&token.entity_type, &token.entity_id);
    let name = entry
        .as_ref()
        .map(|e| e.name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(&token.entity_id);
    let mut out = format!("{name}\nHP {}/{}", token.hp, token.max_hp);
    if let Some(summary) = entry.map(|e| e.summary).filter(|s| !s.trim().is_empty()) {
        out.push('\n');
        out.push_str(summary.trim());
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/scene/catalog.rs"]
mod tests;
