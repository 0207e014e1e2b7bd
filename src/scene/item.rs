use crate::foundation::core::{Color, Point, Rect, Vec2};
use crate::foundation::error::{FogmapError, FogmapResult};

/// Default token edge length in world units.
pub const DEFAULT_TOKEN_SIZE: f64 = 48.0;
/// Default width and height of a new rectangle or oval.
pub const DEFAULT_SHAPE_SIZE: f64 = 50.0;
/// Health assigned to tokens when neither the record nor the catalog has one.
pub const DEFAULT_HP: i32 = 10;
/// Default token border.
pub const DEFAULT_TOKEN_BORDER: Color = Color::rgb(0, 0, 255);
/// Default shape fill.
pub const DEFAULT_SHAPE_FILL: Color = Color::rgb(0xcc, 0xcc, 0xcc);
/// Default shape border.
pub const DEFAULT_SHAPE_BORDER: Color = Color::BLACK;
/// Default marker border.
pub const DEFAULT_MARKER_BORDER: Color = Color::rgb(0, 255, 0);
/// Default marker label width in world units.
pub const DEFAULT_MARKER_WIDTH: f64 = 180.0;
/// Marker label height in world units.
pub const MARKER_HEIGHT: f64 = 28.0;
/// Default text annotation size.
pub const DEFAULT_TEXT_SIZE: f64 = 24.0;

/// Creature token linked to a catalog entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// Catalog table, e.g. `"NPCs"`.
    pub entity_type: String,
    /// Catalog key; doubles as the display name.
    pub entity_id: String,
    /// Campaign-relative image path.
    pub image_path: String,
    /// Edge length in world units.
    pub size: f64,
    /// Border color.
    pub border_color: Color,
    /// Current health.
    pub hp: i32,
    /// Maximum health.
    pub max_hp: i32,
}

/// Geometry and colors of a rectangle or oval. `position` is the top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeItem {
    /// Width in world units.
    pub width: f64,
    /// Height in world units.
    pub height: f64,
    /// Fill color, kept while unfilled so toggling restores it.
    pub fill_color: Color,
    /// Whether the interior is painted.
    pub filled: bool,
    /// Border color.
    pub border_color: Color,
}

impl ShapeItem {
    /// Default 50x50 shape.
    pub fn new(fill_color: Color, filled: bool, border_color: Color) -> Self {
        Self {
            width: DEFAULT_SHAPE_SIZE,
            height: DEFAULT_SHAPE_SIZE,
            fill_color,
            filled,
            border_color,
        }
    }

    /// Fill color, `None` when unfilled.
    pub fn fill(&self) -> Option<Color> {
        self.filled.then_some(self.fill_color)
    }
}

/// GM-only text marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Short label.
    pub text: String,
    /// Free-form description shown on activation.
    pub description: String,
    /// Border color.
    pub border_color: Color,
    /// Label width in world units.
    pub entry_width: f64,
    /// Map opened on double-click.
    pub linked_map: Option<String>,
    /// Campaign-relative video reference.
    pub video_path: Option<String>,
}

impl Marker {
    /// Marker with default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: String::new(),
            border_color: DEFAULT_MARKER_BORDER,
            entry_width: DEFAULT_MARKER_WIDTH,
            linked_map: None,
            video_path: None,
        }
    }
}

/// Polyline; points are offsets from the item position.
#[derive(Clone, Debug, PartialEq)]
pub struct FreehandStroke {
    /// Offsets relative to the item position.
    pub points: Vec<Vec2>,
    /// Stroke color.
    pub color: Color,
    /// Stroke width in world units.
    pub width: f64,
}

impl FreehandStroke {
    /// Build a stroke from absolute world points; returns the anchor and the stroke.
    pub fn from_world_points(points: &[Point], color: Color, width: f64) -> Option<(Point, Self)> {
        let first = *points.first()?;
        let stroke = Self {
            points: points.iter().map(|p| *p - first).collect(),
            color,
            width,
        };
        Some((first, stroke))
    }
}

/// Free text drawn on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct TextAnnotation {
    /// Text, possibly multi-line.
    pub text: String,
    /// Text color.
    pub color: Color,
    /// Font size in world units.
    pub size: f64,
}

/// Variant payload of a [`SceneItem`].
#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    /// Creature token.
    Token(Token),
    /// Axis-aligned rectangle.
    Rectangle(ShapeItem),
    /// Ellipse inscribed in its box.
    Oval(ShapeItem),
    /// GM-only marker.
    Marker(Marker),
    /// Freehand polyline.
    FreehandStroke(FreehandStroke),
    /// Text annotation.
    TextAnnotation(TextAnnotation),
}

/// One overlay item. Z-order is the item's position in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneItem {
    position: Point,
    /// Variant payload.
    pub kind: ItemKind,
}

impl SceneItem {
    /// Build an item; the position must be finite.
    pub fn new(position: Point, kind: ItemKind) -> FogmapResult<Self> {
        if !(position.x.is_finite() && position.y.is_finite()) {
            return Err(FogmapError::validation("item position must be finite"));
        }
        Ok(Self { position, kind })
    }

    /// World position (top-left for boxed items, first point for strokes).
    pub fn position(&self) -> Point {
        self.position
    }

    /// Move to `p`; non-finite positions are rejected.
    pub fn set_position(&mut self, p: Point) -> bool {
        if p.x.is_finite() && p.y.is_finite() {
            self.position = p;
            true
        } else {
            false
        }
    }

    /// Translate by `delta`.
    pub fn translate(&mut self, delta: Vec2) -> bool {
        self.set_position(self.position + delta)
    }

    /// Short name of the variant, as written in records.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ItemKind::Token(_) => "token",
            ItemKind::Rectangle(_) => "rectangle",
            ItemKind::Oval(_) => "oval",
            ItemKind::Marker(_) => "marker",
            ItemKind::FreehandStroke(_) => "stroke",
            ItemKind::TextAnnotation(_) => "text",
        }
    }

    /// Return `true` for GM-only items.
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, ItemKind::Marker(_))
    }

    /// Rectangle or oval payload.
    pub fn shape(&self) -> Option<&ShapeItem> {
        match &self.kind {
            ItemKind::Rectangle(s) | ItemKind::Oval(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable rectangle or oval payload.
    pub fn shape_mut(&mut self) -> Option<&mut ShapeItem> {
        match &mut self.kind {
            ItemKind::Rectangle(s) | ItemKind::Oval(s) => Some(s),
            _ => None,
        }
    }

    /// World-space bounding box.
    pub fn bounding_box(&self) -> Rect {
        let p = self.position;
        match &self.kind {
            ItemKind::Token(t) => Rect::new(p.x, p.y, p.x + t.size, p.y + t.size),
            ItemKind::Rectangle(s) | ItemKind::Oval(s) => {
                Rect::new(p.x, p.y, p.x + s.width, p.y + s.height)
            }
            ItemKind::Marker(m) => Rect::new(p.x, p.y, p.x + m.entry_width, p.y + MARKER_HEIGHT),
            ItemKind::FreehandStroke(s) => {
                let mut r = Rect::from_origin_size(p, (0.0, 0.0));
                for off in &s.points {
                    r = r.union_pt(p + *off);
                }
                r.inflate(s.width / 2.0, s.width / 2.0)
            }
            ItemKind::TextAnnotation(t) => {
                let (w, h) = estimate_text_extent(&t.text, t.size);
                Rect::new(p.x, p.y, p.x + w, p.y + h)
            }
        }
    }

    /// Return `true` when the world point hits the item.
    pub fn hit_test(&self, world: Point, tolerance: f64) -> bool {
        match &self.kind {
            ItemKind::FreehandStroke(s) => {
                let reach = s.width / 2.0 + tolerance;
                let pts: Vec<Point> = s.points.iter().map(|o| self.position + *o).collect();
                if pts.len() == 1 {
                    return pts[0].distance(world) <= reach;
                }
                pts.windows(2)
                    .any(|w| distance_to_segment(world, w[0], w[1]) <= reach)
            }
            ItemKind::Oval(s) => {
                let rx = s.width / 2.0 + tolerance;
                let ry = s.height / 2.0 + tolerance;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let c = self.bounding_box().center();
                let dx = (world.x - c.x) / rx;
                let dy = (world.y - c.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
            _ => self
                .bounding_box()
                .inflate(tolerance, tolerance)
                .contains(world),
        }
    }
}

/// Rough text extent used for hit testing and selection before any font is loaded.
pub fn estimate_text_extent(text: &str, size: f64) -> (f64, f64) {
    let lines: Vec<&str> = text.lines().collect();
    let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1);
    let rows = lines.len().max(1);
    (cols as f64 * size * 0.6, rows as f64 * size * 1.25)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/item.rs"]
mod tests;
