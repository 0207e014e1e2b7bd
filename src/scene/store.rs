use std::collections::HashMap;

use crate::foundation::core::{ItemId, Point, Rect, Vec2};
use crate::scene::item::{ItemKind, SceneItem};

/// Change notification drained by the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneChange {
    /// Item appended to the store.
    Added(ItemId),
    /// Item removed; its popups are gone too.
    Removed(ItemId),
    /// Item translated.
    Moved(ItemId),
    /// Item geometry changed.
    Resized(ItemId),
    /// Item moved within the z-order.
    Restacked(ItemId),
    /// Non-geometric field edited.
    Edited(ItemId),
    /// Hover card or description visibility changed.
    PopupToggled {
        /// Affected item.
        id: ItemId,
        /// New visibility.
        visible: bool,
    },
}

/// Per-item presentation state that is never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemRuntime {
    /// Token hover card shown.
    pub hover_visible: bool,
    /// Marker description shown.
    pub description_visible: bool,
}

/// Ordered overlay items; index 0 is drawn first, the last item is frontmost.
#[derive(Debug, Default)]
pub struct SceneStore {
    items: Vec<(ItemId, SceneItem)>,
    runtime: HashMap<ItemId, ItemRuntime>,
    next_id: u64,
    changes: Vec<SceneChange>,
}

impl SceneStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `items` in order.
    pub fn from_items(items: impl IntoIterator<Item = SceneItem>) -> Self {
        let mut s = Self::new();
        for item in items {
            s.insert(item);
        }
        s.changes.clear();
        s
    }

    /// Append an item at the front of the z-order.
    pub fn insert(&mut self, item: SceneItem) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.push((id, item));
        self.runtime.insert(id, ItemRuntime::default());
        self.changes.push(SceneChange::Added(id));
        id
    }

    /// Remove an item and release its runtime state.
    pub fn remove(&mut self, id: ItemId) -> Option<SceneItem> {
        let idx = self.index_of(id)?;
        let (_, item) = self.items.remove(idx);
        self.runtime.remove(&id);
        self.changes.push(SceneChange::Removed(id));
        Some(item)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` when the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Z-order index of `id`.
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|(i, _)| *i == id)
    }

    /// Borrow an item.
    pub fn get(&self, id: ItemId) -> Option<&SceneItem> {
        self.items.iter().find(|(i, _)| *i == id).map(|(_, it)| it)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut SceneItem> {
        self.items
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, it)| it)
    }

    /// Return `true` when `id` is present.
    pub fn contains(&self, id: ItemId) -> bool {
        self.index_of(id).is_some()
    }

    /// Items in z-order, back to front.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &SceneItem)> {
        self.items.iter().map(|(id, it)| (*id, it))
    }

    /// Ids in z-order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|(id, _)| *id).collect()
    }

    /// Runtime state of an item.
    pub fn runtime(&self, id: ItemId) -> Option<ItemRuntime> {
        self.runtime.get(&id).copied()
    }

    /// Translate the given items; returns how many moved.
    pub fn translate(&mut self, ids: &[ItemId], delta: Vec2) -> usize {
        if delta == Vec2::ZERO {
            return 0;
        }
        let mut moved = 0;
        for &id in ids {
            if let Some(item) = self.get_mut(id)
                && item.translate(delta)
            {
                moved += 1;
                self.changes.push(SceneChange::Moved(id));
            }
        }
        moved
    }

    /// Move one item to an absolute position.
    pub fn set_position(&mut self, id: ItemId, p: Point) -> bool {
        let ok = self.get_mut(id).is_some_and(|it| it.set_position(p));
        if ok {
            self.changes.push(SceneChange::Moved(id));
        }
        ok
    }

    /// Set position and size of a rectangle or oval.
    pub fn set_shape_geometry(&mut self, id: ItemId, position: Point, width: f64, height: f64) -> bool {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return false;
        }
        let Some(item) = self.get_mut(id) else {
            return false;
        };
        if item.shape().is_none() || !item.set_position(position) {
            return false;
        }
        if let Some(s) = item.shape_mut() {
            s.width = width;
            s.height = height;
        }
        self.changes.push(SceneChange::Resized(id));
        true
    }

    /// Apply a non-geometric edit to one item.
    pub fn edit<R>(&mut self, id: ItemId, f: impl FnOnce(&mut ItemKind) -> R) -> Option<R> {
        let item = self.get_mut(id)?;
        let r = f(&mut item.kind);
        self.changes.push(SceneChange::Edited(id));
        Some(r)
    }

    /// Apply an edit that changes an item's extent (token size, text).
    pub fn edit_geometry<R>(&mut self, id: ItemId, f: impl FnOnce(&mut ItemKind) -> R) -> Option<R> {
        let item = self.get_mut(id)?;
        let r = f(&mut item.kind);
        self.changes.push(SceneChange::Resized(id));
        Some(r)
    }

    /// Move an item to the end of the order (drawn last).
    pub fn bring_to_front(&mut self, id: ItemId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let entry = self.items.remove(idx);
        self.items.push(entry);
        self.changes.push(SceneChange::Restacked(id));
        true
    }

    /// Move an item to the start of the order (drawn right above the base image).
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let entry = self.items.remove(idx);
        self.items.insert(0, entry);
        self.changes.push(SceneChange::Restacked(id));
        true
    }

    /// Topmost item hit by a world point.
    pub fn hit_at(&self, world: Point, tolerance: f64) -> Option<ItemId> {
        self.items
            .iter()
            .rev()
            .find(|(_, it)| it.hit_test(world, tolerance))
            .map(|(id, _)| *id)
    }

    /// Items whose bounding boxes overlap `rect`, in z-order.
    pub fn items_in_rect(&self, rect: Rect) -> Vec<ItemId> {
        let r = rect.abs();
        self.items
            .iter()
            .filter(|(_, it)| {
                let b = it.bounding_box();
                b.x0 <= r.x1 && b.x1 >= r.x0 && b.y0 <= r.y1 && b.y1 >= r.y0
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Toggle a token's hover card. Showing it hides every other popup.
    pub fn toggle_hover(&mut self, id: ItemId) -> Option<bool> {
        let visible = !self.runtime.get(&id)?.hover_visible;
        if visible {
            self.hide_all_popups();
        }
        let rt = self.runtime.get_mut(&id)?;
        rt.hover_visible = visible;
        self.changes.push(SceneChange::PopupToggled { id, visible });
        Some(visible)
    }

    /// Toggle a marker's description. Showing it hides every other popup.
    pub fn toggle_description(&mut self, id: ItemId) -> Option<bool> {
        let visible = !self.runtime.get(&id)?.description_visible;
        if visible {
            self.hide_all_popups();
        }
        let rt = self.runtime.get_mut(&id)?;
        rt.description_visible = visible;
        self.changes.push(SceneChange::PopupToggled { id, visible });
        Some(visible)
    }

    /// Hide every hover card and description.
    pub fn hide_all_popups(&mut self) {
        for (id, rt) in self.runtime.iter_mut() {
            if rt.hover_visible || rt.description_visible {
                *rt = ItemRuntime::default();
                self.changes.push(SceneChange::PopupToggled {
                    id: *id,
                    visible: false,
                });
            }
        }
    }

    /// Take pending change notifications.
    pub fn drain_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }

    /// Return `true` when notifications are pending.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Owned copy of the items in z-order.
    pub fn items_cloned(&self) -> Vec<SceneItem> {
        self.items.iter().map(|(_, it)| it.clone()).collect()
    }

    /// Borrowed items in z-order.
    pub fn items(&self) -> Vec<&SceneItem> {
        self.items.iter().map(|(_, it)| it).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/store.rs"]
mod tests;
