use crate::foundation::core::ItemId;
use crate::scene::store::SceneStore;

/// Keyboard modifiers held during a pointer press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift: extend the selection.
    pub shift: bool,
    /// Ctrl (Cmd): toggle membership.
    pub ctrl: bool,
}

impl Modifiers {
    /// No modifier held.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
    };
    /// Shift only.
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
    };
    /// Ctrl only.
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
    };
}

/// How marquee hits combine with the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarqueeMerge {
    /// Hits become the selection.
    Replace,
    /// Hits are added.
    Union,
    /// Hits are removed.
    Subtract,
}

impl MarqueeMerge {
    /// Ctrl wins over shift.
    pub fn from_modifiers(m: Modifiers) -> Self {
        if m.ctrl {
            Self::Subtract
        } else if m.shift {
            Self::Union
        } else {
            Self::Replace
        }
    }
}

/// Selection change postponed until the pointer is released without dragging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredClick {
    /// Clicked the sole selected item: clear.
    Clear,
    /// Clicked one member of a multi-selection: keep only it.
    Replace(ItemId),
}

/// Insertion-ordered, de-duplicated set of selected items.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ItemId>,
    graphical_edit: Option<ItemId>,
}

impl Selection {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected ids in selection order.
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Number of selected items.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Return `true` when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Return `true` when `id` is selected.
    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    /// The only selected item, if exactly one is selected.
    pub fn sole(&self) -> Option<ItemId> {
        match self.ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Shape currently edited with handles.
    pub fn graphical_edit(&self) -> Option<ItemId> {
        self.graphical_edit
    }

    /// Enter graphical edit on `id`; it becomes the sole selection.
    pub fn begin_graphical_edit(&mut self, id: ItemId) {
        self.ids.clear();
        self.ids.push(id);
        self.graphical_edit = Some(id);
    }

    /// Leave graphical edit mode.
    pub fn end_graphical_edit(&mut self) {
        self.graphical_edit = None;
    }

    /// Drop everything, including graphical edit.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.graphical_edit = None;
    }

    /// Replace the selection, keeping first occurrences only.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.ids.clear();
        for id in ids {
            self.insert(id);
        }
        self.drop_stale_edit();
    }

    /// Append `id`; returns `false` when already selected.
    pub fn insert(&mut self, id: ItemId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`; returns `true` if it was selected.
    pub fn remove(&mut self, id: ItemId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|x| *x != id);
        if self.graphical_edit == Some(id) {
            self.graphical_edit = None;
        }
        before != self.ids.len()
    }

    /// Flip membership of `id`; returns the new membership.
    pub fn toggle(&mut self, id: ItemId) -> bool {
        if self.remove(id) {
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    /// Apply a press on an item.
    ///
    /// Plain presses on an already selected item are deferred so the selection can be dragged as
    /// a group; the returned value is resolved by [`Selection::resolve_deferred`] on a release
    /// without movement.
    pub fn press_item(&mut self, id: ItemId, mods: Modifiers) -> Option<DeferredClick> {
        if mods.ctrl {
            self.toggle(id);
            return None;
        }
        if mods.shift {
            self.insert(id);
            return None;
        }
        if self.sole() == Some(id) {
            return Some(DeferredClick::Clear);
        }
        if self.contains(id) {
            return Some(DeferredClick::Replace(id));
        }
        self.replace([id]);
        None
    }

    /// Apply a deferred click after a release without movement.
    pub fn resolve_deferred(&mut self, deferred: DeferredClick) {
        match deferred {
            DeferredClick::Clear => self.clear(),
            DeferredClick::Replace(id) => self.replace([id]),
        }
    }

    /// Merge marquee hits into the selection.
    pub fn merge_marquee(&mut self, hits: &[ItemId], merge: MarqueeMerge) {
        match merge {
            MarqueeMerge::Replace => self.replace(hits.iter().copied()),
            MarqueeMerge::Union => {
                for id in hits {
                    self.insert(*id);
                }
            }
            MarqueeMerge::Subtract => {
                for id in hits {
                    self.remove(*id);
                }
            }
        }
    }

    /// Forget ids the store no longer holds.
    pub fn retain_existing(&mut self, store: &SceneStore) {
        self.ids.retain(|id| store.contains(*id));
        if self.graphical_edit.is_some_and(|id| !store.contains(id)) {
            self.graphical_edit = None;
        }
    }

    fn drop_stale_edit(&mut self) {
        if self
            .graphical_edit
            .is_some_and(|id| self.sole() != Some(id))
        {
            self.graphical_edit = None;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interact/selection.rs"]
mod tests;
