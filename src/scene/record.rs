use crate::foundation::core::{Color, Point, Vec2};
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::scene::item::{
    DEFAULT_HP, DEFAULT_MARKER_BORDER, DEFAULT_MARKER_WIDTH, DEFAULT_SHAPE_BORDER,
    DEFAULT_SHAPE_SIZE, DEFAULT_TEXT_SIZE, DEFAULT_TOKEN_BORDER, DEFAULT_TOKEN_SIZE,
    FreehandStroke, ItemKind, Marker, SceneItem, ShapeItem, TextAnnotation, Token,
};

fn default_hp() -> i32 {
    DEFAULT_HP
}
fn default_token_size() -> f64 {
    DEFAULT_TOKEN_SIZE
}
fn default_token_border() -> Color {
    DEFAULT_TOKEN_BORDER
}
fn default_shape_size() -> f64 {
    DEFAULT_SHAPE_SIZE
}
fn default_shape_fill() -> Color {
    Color::WHITE
}
fn default_shape_border() -> Color {
    DEFAULT_SHAPE_BORDER
}
fn default_true() -> bool {
    true
}
fn default_marker_border() -> Color {
    DEFAULT_MARKER_BORDER
}
fn default_marker_width() -> f64 {
    DEFAULT_MARKER_WIDTH
}
fn default_text_color() -> Color {
    Color::WHITE
}
fn default_text_size() -> f64 {
    DEFAULT_TEXT_SIZE
}
fn default_stroke_color() -> Color {
    Color::rgb(255, 0, 0)
}
fn default_stroke_width() -> f64 {
    3.0
}

/// Persisted token fields.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TokenRecord {
    /// World x of the top-left corner.
    pub x: f64,
    /// World y of the top-left corner.
    pub y: f64,
    /// Catalog table.
    #[serde(default)]
    pub entity_type: String,
    /// Catalog key.
    #[serde(default)]
    pub entity_id: String,
    /// Campaign-relative image path.
    #[serde(default)]
    pub image_path: String,
    /// Edge length.
    #[serde(default = "default_token_size")]
    pub size: f64,
    /// Current health.
    #[serde(default = "default_hp")]
    pub hp: i32,
    /// Maximum health.
    #[serde(default = "default_hp")]
    pub max_hp: i32,
    /// Border color.
    #[serde(default = "default_token_border")]
    pub border_color: Color,
}

/// Persisted rectangle/oval fields.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapeRecord {
    /// World x of the top-left corner.
    pub x: f64,
    /// World y of the top-left corner.
    pub y: f64,
    /// Repeats the variant name.
    #[serde(default)]
    pub shape_type: String,
    /// Fill color (kept while unfilled).
    #[serde(default = "default_shape_fill")]
    pub fill_color: Color,
    /// Whether the fill is painted.
    #[serde(default = "default_true")]
    pub is_filled: bool,
    /// Width.
    #[serde(default = "default_shape_size")]
    pub width: f64,
    /// Height.
    #[serde(default = "default_shape_size")]
    pub height: f64,
    /// Border color.
    #[serde(default = "default_shape_border")]
    pub border_color: Color,
}

/// Persisted marker fields. Empty strings stand for absent references.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarkerRecord {
    /// World x of the top-left corner.
    pub x: f64,
    /// World y of the top-left corner.
    pub y: f64,
    /// Label.
    #[serde(default)]
    pub text: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Label width.
    #[serde(default = "default_marker_width")]
    pub entry_width: f64,
    /// Border color.
    #[serde(default = "default_marker_border")]
    pub border_color: Color,
    /// Campaign-relative video path or `""`.
    #[serde(default)]
    pub video_path: String,
    /// Linked map name or `""`.
    #[serde(default)]
    pub linked_map: String,
}

/// Persisted freehand stroke.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrokeRecord {
    /// World x of the first point.
    pub x: f64,
    /// World y of the first point.
    pub y: f64,
    /// Offsets from `(x, y)`.
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
    /// Stroke color.
    #[serde(default = "default_stroke_color")]
    pub color: Color,
    /// Stroke width.
    #[serde(default = "default_stroke_width")]
    pub width: f64,
}

/// Persisted text annotation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextRecord {
    /// World x of the top-left corner.
    pub x: f64,
    /// World y of the top-left corner.
    pub y: f64,
    /// Text.
    #[serde(default)]
    pub text: String,
    /// Text color.
    #[serde(default = "default_text_color")]
    pub color: Color,
    /// Font size.
    #[serde(default = "default_text_size")]
    pub text_size: f64,
}

/// Variant-tagged item record, one element of a map's `Tokens` array.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemRecord {
    /// `"type": "token"`.
    Token(TokenRecord),
    /// `"type": "rectangle"`.
    Rectangle(ShapeRecord),
    /// `"type": "oval"`.
    Oval(ShapeRecord),
    /// `"type": "marker"`.
    Marker(MarkerRecord),
    /// `"type": "stroke"`.
    Stroke(StrokeRecord),
    /// `"type": "text"`.
    Text(TextRecord),
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn shape_record(p: Point, s: &ShapeItem, name: &str) -> ShapeRecord {
    ShapeRecord {
        x: p.x,
        y: p.y,
        shape_type: name.to_string(),
        fill_color: s.fill_color,
        is_filled: s.filled,
        width: s.width,
        height: s.height,
        border_color: s.border_color,
    }
}

fn shape_item(r: &ShapeRecord) -> FogmapResult<ShapeItem> {
    if !(r.width.is_finite() && r.height.is_finite()) || r.width <= 0.0 || r.height <= 0.0 {
        return Err(FogmapError::malformed("shape dimensions must be finite and > 0"));
    }
    Ok(ShapeItem {
        width: r.width,
        height: r.height,
        fill_color: r.fill_color,
        filled: r.is_filled,
        border_color: r.border_color,
    })
}

impl ItemRecord {
    /// Serialize-side view of an item.
    pub fn from_item(item: &SceneItem) -> Self {
        let p = item.position();
        match &item.kind {
            ItemKind::Token(t) => Self::Token(TokenRecord {
                x: p.x,
                y: p.y,
                entity_type: t.entity_type.clone(),
                entity_id: t.entity_id.clone(),
                image_path: t.image_path.clone(),
                size: t.size,
                hp: t.hp,
                max_hp: t.max_hp,
                border_color: t.border_color,
            }),
            ItemKind::Rectangle(s) => Self::Rectangle(shape_record(p, s, "rectangle")),
            ItemKind::Oval(s) => Self::Oval(shape_record(p, s, "oval")),
            ItemKind::Marker(m) => Self::Marker(MarkerRecord {
                x: p.x,
                y: p.y,
                text: m.text.clone(),
                description: m.description.clone(),
                entry_width: m.entry_width,
                border_color: m.border_color,
                video_path: m.video_path.clone().unwrap_or_default(),
                linked_map: m.linked_map.clone().unwrap_or_default(),
            }),
            ItemKind::FreehandStroke(s) => Self::Stroke(StrokeRecord {
                x: p.x,
                y: p.y,
                points: s.points.iter().map(|v| [v.x, v.y]).collect(),
                color: s.color,
                width: s.width,
            }),
            ItemKind::TextAnnotation(t) => Self::Text(TextRecord {
                x: p.x,
                y: p.y,
                text: t.text.clone(),
                color: t.color,
                text_size: t.size,
            }),
        }
    }

    /// Rebuild a scene item, validating geometry.
    pub fn into_item(self) -> FogmapResult<SceneItem> {
        let (x, y, kind) = match self {
            Self::Token(r) => {
                if !r.size.is_finite() || r.size <= 0.0 {
                    return Err(FogmapError::malformed("token size must be finite and > 0"));
                }
                (
                    r.x,
                    r.y,
                    ItemKind::Token(Token {
                        entity_type: r.entity_type,
                        entity_id: r.entity_id,
                        image_path: r.image_path,
                        size: r.size,
                        border_color: r.border_color,
                        hp: r.hp,
                        max_hp: r.max_hp,
                    }),
                )
            }
            Self::Rectangle(r) => (r.x, r.y, ItemKind::Rectangle(shape_item(&r)?)),
            Self::Oval(r) => (r.x, r.y, ItemKind::Oval(shape_item(&r)?)),
            Self::Marker(r) => (
                r.x,
                r.y,
                ItemKind::Marker(Marker {
                    linked_map: non_empty(&r.linked_map),
                    video_path: non_empty(&r.video_path),
                    text: r.text,
                    description: r.description,
                    border_color: r.border_color,
                    entry_width: if r.entry_width.is_finite() && r.entry_width > 0.0 {
                        r.entry_width
                    } else {
                        DEFAULT_MARKER_WIDTH
                    },
                }),
            ),
            Self::Stroke(r) => {
                if r.points.iter().flatten().any(|v| !v.is_finite()) {
                    return Err(FogmapError::malformed("stroke points must be finite"));
                }
                (
                    r.x,
                    r.y,
                    ItemKind::FreehandStroke(FreehandStroke {
                        points: r.points.iter().map(|[a, b]| Vec2::new(*a, *b)).collect(),
                        color: r.color,
                        width: r.width.max(0.5),
                    }),
                )
            }
            Self::Text(r) => (
                r.x,
                r.y,
                ItemKind::TextAnnotation(TextAnnotation {
                    text: r.text,
                    color: r.color,
                    size: if r.text_size.is_finite() && r.text_size > 0.0 {
                        r.text_size
                    } else {
                        DEFAULT_TEXT_SIZE
                    },
                }),
            ),
        };
        SceneItem::new(Point::new(x, y), kind).map_err(|e| FogmapError::malformed(e.to_string()))
    }
}

/// Serialize items into the JSON array string stored in a map record.
pub fn items_to_json(items: &[&SceneItem]) -> FogmapResult<String> {
    let records: Vec<ItemRecord> = items.iter().map(|i| ItemRecord::from_item(i)).collect();
    Ok(serde_json::to_string(&records)?)
}

/// Parse a stored item list.
///
/// An unparseable list is a [`FogmapError::MalformedRecord`]. Individual elements with unknown
/// types or bad fields are skipped with a warning.
pub fn items_from_json(raw: &str) -> FogmapResult<Vec<SceneItem>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)
        .map_err(|e| FogmapError::malformed(format!("item list is not a JSON array: {e}")))?;

    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ItemRecord>(v)
            .map_err(|e| FogmapError::malformed(e.to_string()))
            .and_then(ItemRecord::into_item);
        match parsed {
            Ok(item) => out.push(item),
            Err(e) => tracing::warn!(index = i, error = %e, "skipping stored item"),
        }
    }
    Ok(out)
}

/// Like [`items_from_json`], but a malformed list yields an empty list and a warning.
pub fn items_from_json_lenient(raw: &str) -> Vec<SceneItem> {
    match items_from_json(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "stored item list unreadable; opening with no items");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/record.rs"]
mod tests;
