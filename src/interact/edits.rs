use crate::foundation::core::{Color, ItemId};
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::scene::item::ItemKind;
use crate::scene::store::SceneStore;

/// Field edit applied to one item from a context menu or dialog.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemEdit {
    /// Border color of tokens, shapes and markers; stroke/text color otherwise.
    BorderColor(Color),
    /// Fill color of a rectangle or oval.
    FillColor(Color),
    /// Flip a shape between filled and outlined.
    ToggleFill,
    /// Token hit points.
    Hp {
        /// Current hp.
        hp: i32,
        /// Maximum hp.
        max_hp: i32,
    },
    /// Token edge length.
    TokenSize(f64),
    /// Shape dimensions.
    ShapeSize {
        /// Width in world units.
        width: f64,
        /// Height in world units.
        height: f64,
    },
    /// Marker label.
    MarkerText(String),
    /// Marker description.
    MarkerDescription(String),
    /// Map opened when the marker is double-clicked.
    LinkedMap(Option<String>),
    /// Text annotation body.
    Text(String),
    /// Text annotation size.
    TextSize(f64),
}

fn positive(v: f64, what: &str) -> FogmapResult<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(FogmapError::validation(format!("{what} must be finite and > 0")))
    }
}

/// Apply `edit` to item `id`.
///
/// Returns `Ok(false)` when the item is gone or the edit does not apply to its kind.
pub fn apply_edit(store: &mut SceneStore, id: ItemId, edit: ItemEdit) -> FogmapResult<bool> {
    let Some(item) = store.get(id) else {
        return Ok(false);
    };
    let applies = matches!(
        (&edit, &item.kind),
        (ItemEdit::BorderColor(_), _)
            | (
                ItemEdit::FillColor(_) | ItemEdit::ToggleFill | ItemEdit::ShapeSize { .. },
                ItemKind::Rectangle(_) | ItemKind::Oval(_)
            )
            | (ItemEdit::Hp { .. } | ItemEdit::TokenSize(_), ItemKind::Token(_))
            | (
                ItemEdit::MarkerText(_) | ItemEdit::MarkerDescription(_) | ItemEdit::LinkedMap(_),
                ItemKind::Marker(_)
            )
            | (ItemEdit::Text(_) | ItemEdit::TextSize(_), ItemKind::TextAnnotation(_))
    );
    if !applies {
        return Ok(false);
    }

    match edit {
        ItemEdit::TokenSize(size) => {
            let size = positive(size, "token size")?;
            store.edit_geometry(id, |k| {
                if let ItemKind::Token(t) = k {
                    t.size = size;
                }
            });
        }
        ItemEdit::ShapeSize { width, height } => {
            let width = positive(width, "shape width")?;
            let height = positive(height, "shape height")?;
            store.edit_geometry(id, |k| {
                if let ItemKind::Rectangle(s) | ItemKind::Oval(s) = k {
                    s.width = width;
                    s.height = height;
                }
            });
        }
        ItemEdit::TextSize(size) => {
            let size = positive(size, "text size")?;
            store.edit_geometry(id, |k| {
                if let ItemKind::TextAnnotation(t) = k {
                    t.size = size;
                }
            });
        }
        ItemEdit::Text(text) => {
            store.edit_geometry(id, |k| {
                if let ItemKind::TextAnnotation(t) = k {
                    t.text = text;
                }
            });
        }
        ItemEdit::Hp { hp, max_hp } => {
            if max_hp < 0 {
                return Err(FogmapError::validation("max_hp must be >= 0"));
            }
            store.edit(id, |k| {
                if let ItemKind::Token(t) = k {
                    t.max_hp = max_hp;
                    t.hp = hp.min(max_hp);
                }
            });
        }
        other => {
            store.edit(id, |k| match (other, k) {
                (ItemEdit::BorderColor(c), ItemKind::Token(t)) => t.border_color = c,
                (ItemEdit::BorderColor(c), ItemKind::Rectangle(s) | ItemKind::Oval(s)) => {
                    s.border_color = c
                }
                (ItemEdit::BorderColor(c), ItemKind::Marker(m)) => m.border_color = c,
                (ItemEdit::BorderColor(c), ItemKind::FreehandStroke(s)) => s.color = c,
                (ItemEdit::BorderColor(c), ItemKind::TextAnnotation(t)) => t.color = c,
                (ItemEdit::FillColor(c), ItemKind::Rectangle(s) | ItemKind::Oval(s)) => {
                    s.fill_color = c;
                    s.filled = true;
                }
                (ItemEdit::ToggleFill, ItemKind::Rectangle(s) | ItemKind::Oval(s)) => {
                    s.filled = !s.filled
                }
                (ItemEdit::MarkerText(text), ItemKind::Marker(m)) => m.text = text,
                (ItemEdit::MarkerDescription(text), ItemKind::Marker(m)) => m.description = text,
                (ItemEdit::LinkedMap(name), ItemKind::Marker(m)) => {
                    m.linked_map = name.filter(|n| !n.trim().is_empty())
                }
                _ => {}
            });
        }
    }
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/interact/edits.rs"]
mod tests;
