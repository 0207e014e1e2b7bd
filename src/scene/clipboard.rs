use crate::foundation::core::{ItemId, Point, Vec2};
use crate::scene::item::SceneItem;
use crate::scene::store::SceneStore;

/// Copied items with offsets from the first copied item's position.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    entries: Vec<(SceneItem, Vec2)>,
}

impl Clipboard {
    /// Empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of copied items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing has been copied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capture `ids` (in the given order). Missing ids are ignored.
    ///
    /// Returns the number of items captured; an empty capture leaves the clipboard unchanged.
    pub fn copy(&mut self, store: &SceneStore, ids: &[ItemId]) -> usize {
        let items: Vec<&SceneItem> = ids.iter().filter_map(|id| store.get(*id)).collect();
        let Some(first) = items.first() else {
            return 0;
        };
        let reference = first.position();
        self.entries = items
            .iter()
            .map(|it| ((*it).clone(), it.position() - reference))
            .collect();
        self.entries.len()
    }

    /// Re-create the copied items with the first one at `anchor`, preserving offsets.
    pub fn paste(&self, store: &mut SceneStore, anchor: Point) -> Vec<ItemId> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (item, offset) in &self.entries {
            let mut copy = item.clone();
            if !copy.set_position(anchor + *offset) {
                continue;
            }
            out.push(store.insert(copy));
        }
        tracing::debug!(count = out.len(), "pasted items");
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/clipboard.rs"]
mod tests;
