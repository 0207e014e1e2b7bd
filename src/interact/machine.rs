use crate::fog::brush::{BrushShape, clamp_brush_size};
use crate::fog::engine::FogMode;
use crate::foundation::core::{Color, ItemId, Point, Vec2, rect_from_corners};
use crate::foundation::error::FogmapResult;
use crate::interact::resize::{Handle, ShapeGeometry, apply_resize, handle_at, min_dimension};
use crate::interact::selection::{DeferredClick, MarqueeMerge, Modifiers, Selection};
use crate::render::frame::Decorations;
use crate::scene::clipboard::Clipboard;
use crate::scene::item::{
    DEFAULT_SHAPE_SIZE, FreehandStroke, ItemKind, Marker, SceneItem, ShapeItem,
};
use crate::session::config::EditorOpts;
use crate::session::document::MapDocument;
use crate::viewport::mapper::screen_to_world;

/// Pointer travel (screen px) before a press on an item becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 2.0;
/// Pointer travel (screen px) before an empty-space press shows a marquee.
pub const MARQUEE_THRESHOLD_PX: f64 = 5.0;
/// Minimum spacing of freehand points in world units.
pub const MIN_STROKE_SPACING: f64 = 1.0;
/// Item hit slop in screen pixels.
pub const HIT_TOLERANCE_PX: f64 = 3.0;
/// Label given to markers placed with the marker tool.
pub const NEW_MARKER_TEXT: &str = "New Marker";

/// How the fog tool applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FogTool {
    /// Soft brush dabs along the pointer path.
    Brush,
    /// Hard-edged rectangle filled on release.
    Rect,
}

/// Active GM tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    /// Select, move and resize items.
    #[default]
    Select,
    /// Click empty space to add a rectangle.
    Rectangle,
    /// Click empty space to add an oval.
    Oval,
    /// Click empty space to add a marker.
    Marker,
    /// Draw freehand strokes.
    Freehand,
    /// Edit the fog.
    Fog {
        /// Add or remove fog.
        mode: FogMode,
        /// Brush or rectangle.
        kind: FogTool,
    },
}

/// Pointer button of a press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button: the active tool.
    Primary,
    /// Middle button: pan the view.
    Pan,
}

/// Minimum repaint an input requires.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Redraw {
    /// Nothing visible changed.
    #[default]
    None,
    /// Only the view moved; shift the last frame by this many screen pixels.
    Translate(Vec2),
    /// GM-only overlays changed (selection, marquee, previews, popups).
    Overlay,
    /// Scene content changed; every surface recomposes.
    Full,
}

impl Redraw {
    fn rank(self) -> u8 {
        match self {
            Redraw::None => 0,
            Redraw::Translate(_) => 1,
            Redraw::Overlay => 2,
            Redraw::Full => 3,
        }
    }

    /// Combine two requests into one that covers both.
    pub fn merge(self, other: Redraw) -> Redraw {
        match (self, other) {
            (Redraw::Translate(a), Redraw::Translate(b)) => Redraw::Translate(a + b),
            (Redraw::Translate(_), Redraw::Overlay) | (Redraw::Overlay, Redraw::Translate(_)) => {
                Redraw::Full
            }
            (a, b) if a.rank() >= b.rank() => a,
            (_, b) => b,
        }
    }
}

/// Effect of one input event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputOutcome {
    /// Repaint needed.
    pub redraw: Redraw,
    /// Document changed in a way worth saving.
    pub persist: bool,
    /// Map to open (double-click on a linked marker).
    pub navigate_to: Option<String>,
}

impl InputOutcome {
    fn redraw(redraw: Redraw) -> Self {
        Self {
            redraw,
            ..Self::default()
        }
    }

    fn changed() -> Self {
        Self {
            redraw: Redraw::Full,
            persist: true,
            navigate_to: None,
        }
    }

    /// Combine two outcomes.
    pub fn merge(self, other: InputOutcome) -> InputOutcome {
        InputOutcome {
            redraw: self.redraw.merge(other.redraw),
            persist: self.persist || other.persist,
            navigate_to: other.navigate_to.or(self.navigate_to),
        }
    }
}

/// Tool defaults used when creating content.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSettings {
    /// Fog brush edge length in raster pixels.
    pub brush_size: u32,
    /// Fog brush shape.
    pub brush_shape: BrushShape,
    /// Fill color of new shapes.
    pub shape_fill: Color,
    /// Whether new shapes are filled.
    pub shape_filled: bool,
    /// Border color of new shapes.
    pub shape_border: Color,
    /// Freehand color.
    pub stroke_color: Color,
    /// Freehand width in world units.
    pub stroke_width: f64,
    /// Resize handle size in screen pixels.
    pub handle_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from(&EditorOpts::default())
    }
}

impl From<&EditorOpts> for ToolSettings {
    fn from(o: &EditorOpts) -> Self {
        Self {
            brush_size: clamp_brush_size(o.brush_size),
            brush_shape: o.brush_shape,
            shape_fill: o.shape_fill,
            shape_filled: o.shape_filled,
            shape_border: o.shape_border,
            stroke_color: o.stroke_color,
            stroke_width: o.stroke_width,
            handle_size: o.handle_size,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    ItemDrag {
        item: ItemId,
        press: Point,
        last: Point,
        moved: bool,
        deferred: Option<DeferredClick>,
    },
    Resize {
        item: ItemId,
        handle: Handle,
        start: Point,
        original: ShapeGeometry,
    },
    Marquee {
        start: Point,
        start_screen: Point,
        current: Point,
        active: bool,
        merge: MarqueeMerge,
    },
    Freehand {
        points: Vec<Point>,
    },
    FogBrush {
        mode: FogMode,
    },
    FogRect {
        start: Point,
        current: Point,
        mode: FogMode,
    },
    Pan {
        last: Point,
    },
}

/// Pointer and keyboard state machine of the GM surface.
///
/// Every handler takes the document it acts on; nothing is shared with other threads.
#[derive(Debug, Default)]
pub struct Interaction {
    tool: Tool,
    /// Defaults for created content.
    pub settings: ToolSettings,
    selection: Selection,
    gesture: Gesture,
    clipboard: Clipboard,
    pointer: Option<Point>,
}

impl Interaction {
    /// Idle machine with the select tool.
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Active tool.
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. A gesture in progress finishes with the tool it started with.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of items on the clipboard.
    pub fn clipboard_len(&self) -> usize {
        self.clipboard.len()
    }

    /// Return `true` while a pointer gesture is in progress.
    pub fn gesture_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Return `true` while the view is being dragged.
    pub fn panning(&self) -> bool {
        matches!(self.gesture, Gesture::Pan { .. })
    }

    /// Pointer left the surface.
    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    /// Press at a screen position.
    pub fn pointer_down(
        &mut self,
        doc: &mut MapDocument,
        screen: Point,
        button: PointerButton,
        mods: Modifiers,
    ) -> FogmapResult<InputOutcome> {
        self.pointer = Some(screen);
        if self.gesture != Gesture::Idle {
            return Ok(InputOutcome::default());
        }
        let world = screen_to_world(screen, &doc.viewport);
        if button == PointerButton::Pan {
            self.gesture = Gesture::Pan { last: screen };
            return Ok(InputOutcome::default());
        }

        match self.tool {
            Tool::Fog {
                mode,
                kind: FogTool::Brush,
            } => {
                doc.fog.begin_gesture()?;
                doc.fog
                    .paint(world, self.settings.brush_size, self.settings.brush_shape, mode)?;
                self.gesture = Gesture::FogBrush { mode };
                Ok(InputOutcome::redraw(Redraw::Full))
            }
            Tool::Fog {
                mode,
                kind: FogTool::Rect,
            } => {
                self.gesture = Gesture::FogRect {
                    start: world,
                    current: world,
                    mode,
                };
                Ok(InputOutcome::redraw(Redraw::Overlay))
            }
            Tool::Freehand => {
                self.gesture = Gesture::Freehand {
                    points: vec![world],
                };
                Ok(InputOutcome::redraw(Redraw::Overlay))
            }
            Tool::Select | Tool::Rectangle | Tool::Oval | Tool::Marker => {
                self.press_select(doc, screen, world, mods)
            }
        }
    }

    fn press_select(
        &mut self,
        doc: &mut MapDocument,
        screen: Point,
        world: Point,
        mods: Modifiers,
    ) -> FogmapResult<InputOutcome> {
        let zoom = doc.viewport.zoom();

        if let Some(id) = self.selection.graphical_edit()
            && let Some(geom) = shape_geometry(doc, id)
        {
            let reach = self.settings.handle_size / 2.0 / zoom;
            if let Some(handle) = handle_at(&geom, world, reach) {
                tracing::debug!(item = id.0, ?handle, "resize started");
                self.gesture = Gesture::Resize {
                    item: id,
                    handle,
                    start: world,
                    original: geom,
                };
                return Ok(InputOutcome::redraw(Redraw::Overlay));
            }
        }

        if let Some(id) = doc.store.hit_at(world, HIT_TOLERANCE_PX / zoom) {
            let editing = self.selection.graphical_edit();
            let deferred = if editing == Some(id) && mods == Modifiers::NONE {
                None
            } else {
                if editing.is_some() {
                    self.selection.end_graphical_edit();
                }
                self.selection.press_item(id, mods)
            };
            self.gesture = Gesture::ItemDrag {
                item: id,
                press: screen,
                last: screen,
                moved: false,
                deferred,
            };
            return Ok(InputOutcome::redraw(Redraw::Overlay));
        }

        doc.store.hide_all_popups();
        self.selection.end_graphical_edit();

        let created = match self.tool {
            Tool::Rectangle | Tool::Oval => {
                let shape = ShapeItem::new(
                    self.settings.shape_fill,
                    self.settings.shape_filled,
                    self.settings.shape_border,
                );
                let half = DEFAULT_SHAPE_SIZE / 2.0;
                let kind = if self.tool == Tool::Rectangle {
                    ItemKind::Rectangle(shape)
                } else {
                    ItemKind::Oval(shape)
                };
                Some(SceneItem::new(world - Vec2::new(half, half), kind)?)
            }
            Tool::Marker => Some(SceneItem::new(
                world,
                ItemKind::Marker(Marker::new(NEW_MARKER_TEXT)),
            )?),
            _ => None,
        };
        if let Some(item) = created {
            let kind = item.type_name();
            let id = doc.store.insert(item);
            self.selection.replace([id]);
            tracing::debug!(item = id.0, kind, "item created");
            return Ok(InputOutcome::changed());
        }

        self.gesture = Gesture::Marquee {
            start: world,
            start_screen: screen,
            current: world,
            active: false,
            merge: MarqueeMerge::from_modifiers(mods),
        };
        Ok(InputOutcome::redraw(Redraw::Overlay))
    }

    /// Pointer motion at a screen position.
    pub fn pointer_move(
        &mut self,
        doc: &mut MapDocument,
        screen: Point,
    ) -> FogmapResult<InputOutcome> {
        self.pointer = Some(screen);
        let zoom = doc.viewport.zoom();
        let world = screen_to_world(screen, &doc.viewport);

        let outcome = match &mut self.gesture {
            Gesture::Idle => InputOutcome::default(),
            Gesture::ItemDrag {
                item,
                press,
                last,
                moved,
                ..
            } => {
                if !*moved {
                    if (screen - *press).hypot() <= DRAG_THRESHOLD_PX {
                        return Ok(InputOutcome::default());
                    }
                    *moved = true;
                }
                let delta = (screen - *last) / zoom;
                *last = screen;
                let ids = if self.selection.contains(*item) {
                    self.selection.ids().to_vec()
                } else {
                    vec![*item]
                };
                doc.store.translate(&ids, delta);
                InputOutcome::redraw(Redraw::Full)
            }
            Gesture::Resize {
                item,
                handle,
                start,
                original,
            } => {
                let min = min_dimension(self.settings.handle_size, zoom);
                let g = apply_resize(*original, *handle, world - *start, min);
                doc.store
                    .set_shape_geometry(*item, g.position, g.width, g.height);
                InputOutcome::redraw(Redraw::Full)
            }
            Gesture::Marquee {
                start_screen,
                current,
                active,
                ..
            } => {
                *current = world;
                if !*active && (screen - *start_screen).hypot() > MARQUEE_THRESHOLD_PX {
                    *active = true;
                }
                if *active {
                    InputOutcome::redraw(Redraw::Overlay)
                } else {
                    InputOutcome::default()
                }
            }
            Gesture::Freehand { points } => {
                match points.last() {
                    Some(last) if last.distance(world) < MIN_STROKE_SPACING => {}
                    _ => points.push(world),
                }
                InputOutcome::redraw(Redraw::Overlay)
            }
            Gesture::FogBrush { mode } => {
                doc.fog
                    .paint(world, self.settings.brush_size, self.settings.brush_shape, *mode)?;
                InputOutcome::redraw(Redraw::Full)
            }
            Gesture::FogRect { current, .. } => {
                *current = world;
                InputOutcome::redraw(Redraw::Overlay)
            }
            Gesture::Pan { last } => {
                let delta = screen - *last;
                *last = screen;
                doc.viewport.pan_by(delta);
                InputOutcome::redraw(Redraw::Translate(delta))
            }
        };
        Ok(outcome)
    }

    /// Release at a screen position.
    pub fn pointer_up(
        &mut self,
        doc: &mut MapDocument,
        screen: Point,
    ) -> FogmapResult<InputOutcome> {
        self.pointer = Some(screen);
        let world = screen_to_world(screen, &doc.viewport);

        let outcome = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => InputOutcome::default(),
            Gesture::ItemDrag {
                item,
                moved,
                deferred,
                ..
            } => {
                if moved {
                    InputOutcome::changed()
                } else {
                    if let Some(d) = deferred {
                        self.selection.resolve_deferred(d);
                    }
                    activate(doc, item);
                    InputOutcome::redraw(Redraw::Overlay)
                }
            }
            Gesture::Resize { item, .. } => {
                tracing::debug!(item = item.0, "resize finished");
                InputOutcome::changed()
            }
            Gesture::Marquee {
                start,
                current,
                active,
                merge,
                ..
            } => {
                if active {
                    let hits = doc.store.items_in_rect(rect_from_corners(start, current));
                    self.selection.merge_marquee(&hits, merge);
                } else if merge == MarqueeMerge::Replace {
                    self.selection.clear();
                }
                InputOutcome::redraw(Redraw::Overlay)
            }
            Gesture::Freehand { mut points } => {
                if points.last().is_none_or(|p| p.distance(world) >= MIN_STROKE_SPACING) {
                    points.push(world);
                }
                match FreehandStroke::from_world_points(
                    &points,
                    self.settings.stroke_color,
                    self.settings.stroke_width,
                ) {
                    Some((anchor, stroke)) if points.len() >= 2 => {
                        doc.store
                            .insert(SceneItem::new(anchor, ItemKind::FreehandStroke(stroke))?);
                        InputOutcome::changed()
                    }
                    _ => InputOutcome::redraw(Redraw::Overlay),
                }
            }
            Gesture::FogBrush { .. } => {
                doc.fog.end_gesture();
                InputOutcome::changed()
            }
            Gesture::FogRect {
                start,
                current,
                mode,
            } => {
                match doc
                    .fog
                    .fill_rect_with_history(rect_from_corners(start, current), mode)?
                {
                    Some(_) => InputOutcome::changed(),
                    None => InputOutcome::redraw(Redraw::Overlay),
                }
            }
            Gesture::Pan { .. } => InputOutcome::changed(),
        };
        Ok(outcome)
    }

    /// Double-click: follow a marker's linked map.
    pub fn double_click(&mut self, doc: &MapDocument, screen: Point) -> InputOutcome {
        let world = screen_to_world(screen, &doc.viewport);
        let tol = HIT_TOLERANCE_PX / doc.viewport.zoom();
        let linked = doc
            .store
            .hit_at(world, tol)
            .and_then(|id| doc.store.get(id))
            .and_then(|item| match &item.kind {
                ItemKind::Marker(m) => m.linked_map.clone(),
                _ => None,
            });
        InputOutcome {
            navigate_to: linked,
            ..InputOutcome::default()
        }
    }

    /// Wheel zoom around the cursor.
    pub fn wheel(&mut self, doc: &mut MapDocument, screen: Point, notches: i32) -> InputOutcome {
        self.pointer = Some(screen);
        if notches == 0 {
            return InputOutcome::default();
        }
        let before = doc.viewport.zoom();
        doc.viewport.zoom_step_at(screen, notches);
        if doc.viewport.zoom() == before {
            return InputOutcome::default();
        }
        InputOutcome::changed()
    }

    /// Remove the selected items.
    pub fn delete_selected(&mut self, doc: &mut MapDocument) -> InputOutcome {
        let ids = self.selection.ids().to_vec();
        if ids.is_empty() {
            return InputOutcome::default();
        }
        for id in &ids {
            self.forget(*id);
            doc.store.remove(*id);
        }
        tracing::debug!(count = ids.len(), "deleted items");
        InputOutcome::changed()
    }

    /// Drop every reference the machine holds to `id`.
    pub fn forget(&mut self, id: ItemId) {
        self.selection.remove(id);
        let targets = match &self.gesture {
            Gesture::ItemDrag { item, .. } | Gesture::Resize { item, .. } => *item == id,
            _ => false,
        };
        if targets {
            self.gesture = Gesture::Idle;
        }
    }

    /// Copy the selection; returns the number of copied items.
    pub fn copy_selection(&mut self, doc: &MapDocument) -> usize {
        self.clipboard.copy(&doc.store, self.selection.ids())
    }

    /// Paste at the pointer, or at the view center when the pointer is outside the surface.
    pub fn paste(&mut self, doc: &mut MapDocument) -> InputOutcome {
        if self.clipboard.is_empty() {
            return InputOutcome::default();
        }
        let anchor = self
            .pointer
            .filter(|p| doc.viewport.contains_screen(*p))
            .map(|p| screen_to_world(p, &doc.viewport))
            .unwrap_or_else(|| doc.viewport.viewport_center_world());
        let ids = self.clipboard.paste(&mut doc.store, anchor);
        self.selection.replace(ids);
        InputOutcome::changed()
    }

    /// Raise the selection above every other item, keeping its relative order.
    pub fn bring_to_front(&mut self, doc: &mut MapDocument) -> InputOutcome {
        let mut ids = self.selection.ids().to_vec();
        ids.sort_by_key(|id| doc.store.index_of(*id));
        let n = ids
            .into_iter()
            .filter(|id| doc.store.bring_to_front(*id))
            .count();
        if n == 0 {
            InputOutcome::default()
        } else {
            InputOutcome::changed()
        }
    }

    /// Lower the selection below every other item, keeping its relative order.
    pub fn send_to_back(&mut self, doc: &mut MapDocument) -> InputOutcome {
        let mut ids = self.selection.ids().to_vec();
        ids.sort_by_key(|id| std::cmp::Reverse(doc.store.index_of(*id)));
        let n = ids
            .into_iter()
            .filter(|id| doc.store.send_to_back(*id))
            .count();
        if n == 0 {
            InputOutcome::default()
        } else {
            InputOutcome::changed()
        }
    }

    /// Move the selection by a world-space delta (arrow keys).
    pub fn nudge(&mut self, doc: &mut MapDocument, delta: Vec2) -> InputOutcome {
        if doc.store.translate(self.selection.ids(), delta) == 0 {
            return InputOutcome::default();
        }
        InputOutcome::changed()
    }

    /// Select a shape and show its resize handles.
    pub fn begin_graphical_edit(&mut self, doc: &mut MapDocument, id: ItemId) -> bool {
        if doc.store.get(id).and_then(SceneItem::shape).is_none() {
            return false;
        }
        doc.store.hide_all_popups();
        self.selection.begin_graphical_edit(id);
        true
    }

    /// Pop the last fog snapshot.
    pub fn undo_fog(&mut self, doc: &mut MapDocument) -> FogmapResult<InputOutcome> {
        if matches!(self.gesture, Gesture::FogBrush { .. }) {
            self.gesture = Gesture::Idle;
        }
        Ok(if doc.fog.undo()? {
            InputOutcome::changed()
        } else {
            InputOutcome::default()
        })
    }

    /// Forget selection and gestures, e.g. when another map opens.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.gesture = Gesture::Idle;
    }

    /// Overlays for the GM surface. Popups are left to the caller.
    pub fn decorations(&self, doc: &MapDocument) -> Decorations {
        let mut d = Decorations {
            handle_size: self.settings.handle_size,
            ..Decorations::default()
        };
        d.selected = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| doc.store.get(*id))
            .map(SceneItem::bounding_box)
            .collect();
        d.handles = self
            .selection
            .graphical_edit()
            .and_then(|id| shape_geometry(doc, id))
            .map(|g| g.rect());
        match &self.gesture {
            Gesture::Marquee {
                start,
                current,
                active: true,
                ..
            } => d.marquee = Some(rect_from_corners(*start, *current)),
            Gesture::Freehand { points } => d.stroke_preview = points.clone(),
            Gesture::FogRect { start, current, .. } => {
                d.fog_rect_preview = Some(rect_from_corners(*start, *current))
            }
            _ => {}
        }
        d
    }
}

fn shape_geometry(doc: &MapDocument, id: ItemId) -> Option<ShapeGeometry> {
    let item = doc.store.get(id)?;
    let s = item.shape()?;
    Some(ShapeGeometry {
        position: item.position(),
        width: s.width,
        height: s.height,
    })
}

fn activate(doc: &mut MapDocument, id: ItemId) {
    let visible = match doc.store.get(id).map(|it| &it.kind) {
        Some(ItemKind::Token(_)) => doc.store.toggle_hover(id),
        Some(ItemKind::Marker(_)) => doc.store.toggle_description(id),
        _ => None,
    };
    if let Some(visible) = visible {
        tracing::debug!(item = id.0, visible, "popup toggled");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interact/machine.rs"]
mod tests;
