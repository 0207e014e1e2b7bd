use crate::foundation::core::{Point, Rect, Vec2};
use crate::foundation::math::clamp_f64;
use kurbo::Affine;

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;
/// Zoom delta applied per wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

/// Pan/zoom state of one output surface.
///
/// `pan` is the screen position of the world origin; `zoom` scales world units to screen pixels.
/// Zoom is kept inside `[MIN_ZOOM, MAX_ZOOM]`, so it is never zero.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    zoom: f64,
    pan: Vec2,
    width: u32,
    height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            width: 1,
            height: 1,
        }
    }
}

impl Viewport {
    /// Identity viewport with the given output size in pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            ..Self::default()
        }
    }

    /// Return a copy with `zoom` (clamped).
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.set_zoom(zoom);
        self
    }

    /// Return a copy with the given pan offset.
    pub fn with_pan(mut self, pan: Vec2) -> Self {
        self.set_pan(pan);
        self
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current pan offset in screen pixels.
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Output width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Set the zoom factor without moving the pan (clamped, NaN maps to the minimum).
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_f64(zoom, MIN_ZOOM, MAX_ZOOM);
    }

    /// Set the pan offset. Non-finite components are ignored.
    pub fn set_pan(&mut self, pan: Vec2) {
        if pan.x.is_finite() {
            self.pan.x = pan.x;
        }
        if pan.y.is_finite() {
            self.pan.y = pan.y;
        }
    }

    /// Resize the output surface.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Translate the view by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.set_pan(self.pan + delta);
    }

    /// Set zoom to `zoom` keeping the world point under `cursor` fixed on screen.
    pub fn set_zoom_at(&mut self, cursor: Point, zoom: f64) {
        let world = screen_to_world(cursor, self);
        self.set_zoom(zoom);
        self.set_pan(Vec2::new(
            cursor.x - world.x * self.zoom,
            cursor.y - world.y * self.zoom,
        ));
    }

    /// Multiply zoom by `factor` around `cursor`.
    pub fn zoom_at(&mut self, cursor: Point, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.set_zoom_at(cursor, self.zoom * factor);
    }

    /// Apply `notches` wheel steps of [`ZOOM_STEP`] around `cursor`.
    pub fn zoom_step_at(&mut self, cursor: Point, notches: i32) {
        self.set_zoom_at(cursor, self.zoom + ZOOM_STEP * f64::from(notches));
    }

    /// World-to-screen transform.
    pub fn world_to_screen_affine(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// World-space rectangle currently covered by the output surface.
    pub fn visible_world_rect(&self) -> Rect {
        let a = screen_to_world(Point::ZERO, self);
        let b = screen_to_world(
            Point::new(f64::from(self.width), f64::from(self.height)),
            self,
        );
        Rect::from_points(a, b)
    }

    /// World point at the center of the output surface.
    pub fn viewport_center_world(&self) -> Point {
        self.visible_world_rect().center()
    }

    /// Return `true` when `p` lies inside the output surface.
    pub fn contains_screen(&self, p: Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < f64::from(self.width) && p.y < f64::from(self.height)
    }
}

/// Convert a screen point to world coordinates.
pub fn screen_to_world(p: Point, vp: &Viewport) -> Point {
    Point::new((p.x - vp.pan.x) / vp.zoom, (p.y - vp.pan.y) / vp.zoom)
}

/// Convert a world point to screen coordinates.
pub fn world_to_screen(p: Point, vp: &Viewport) -> Point {
    Point::new(p.x * vp.zoom + vp.pan.x, p.y * vp.zoom + vp.pan.y)
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/mapper.rs"]
mod tests;
