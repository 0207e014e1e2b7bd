use crate::foundation::core::{Point, Rect, Vec2};

/// Default handle edge length in screen pixels.
pub const DEFAULT_HANDLE_SIZE: f64 = 8.0;

/// Resize handle on a shape's bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    /// Top edge.
    N,
    /// Bottom edge.
    S,
    /// Right edge.
    E,
    /// Left edge.
    W,
    /// Top-right corner.
    NE,
    /// Top-left corner.
    NW,
    /// Bottom-right corner.
    SE,
    /// Bottom-left corner.
    SW,
}

impl Handle {
    /// All handles, corners first so they win hit tests over edges.
    pub const ALL: [Handle; 8] = [
        Handle::NW,
        Handle::NE,
        Handle::SE,
        Handle::SW,
        Handle::N,
        Handle::E,
        Handle::S,
        Handle::W,
    ];

    fn moves_west(self) -> bool {
        matches!(self, Handle::W | Handle::NW | Handle::SW)
    }

    fn moves_east(self) -> bool {
        matches!(self, Handle::E | Handle::NE | Handle::SE)
    }

    fn moves_north(self) -> bool {
        matches!(self, Handle::N | Handle::NE | Handle::NW)
    }

    fn moves_south(self) -> bool {
        matches!(self, Handle::S | Handle::SE | Handle::SW)
    }

    /// Handle center on a box.
    pub fn anchor(self, r: Rect) -> Point {
        let cx = (r.x0 + r.x1) / 2.0;
        let cy = (r.y0 + r.y1) / 2.0;
        match self {
            Handle::N => Point::new(cx, r.y0),
            Handle::S => Point::new(cx, r.y1),
            Handle::E => Point::new(r.x1, cy),
            Handle::W => Point::new(r.x0, cy),
            Handle::NE => Point::new(r.x1, r.y0),
            Handle::NW => Point::new(r.x0, r.y0),
            Handle::SE => Point::new(r.x1, r.y1),
            Handle::SW => Point::new(r.x0, r.y1),
        }
    }
}

/// Top-left position and size of a rectangle or oval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeGeometry {
    /// Top-left corner in world units.
    pub position: Point,
    /// Width in world units.
    pub width: f64,
    /// Height in world units.
    pub height: f64,
}

impl ShapeGeometry {
    /// Bounding box.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

/// Smallest allowed dimension in world units. Grows as the view zooms out.
pub fn min_dimension(handle_size: f64, zoom: f64) -> f64 {
    (handle_size / zoom).max(1.0)
}

/// Geometry after dragging `handle` by `delta` world units from `original`.
///
/// East/south handles grow the box; west/north handles move the position so the opposite edge
/// stays put. A clamped dimension keeps the opposite edge fixed too.
pub fn apply_resize(
    original: ShapeGeometry,
    handle: Handle,
    delta: Vec2,
    min_dim: f64,
) -> ShapeGeometry {
    let mut x = original.position.x;
    let mut y = original.position.y;
    let mut w = original.width;
    let mut h = original.height;

    if handle.moves_east() {
        w = original.width + delta.x;
    } else if handle.moves_west() {
        w = original.width - delta.x;
        x = original.position.x + delta.x;
    }
    if handle.moves_south() {
        h = original.height + delta.y;
    } else if handle.moves_north() {
        h = original.height - delta.y;
        y = original.position.y + delta.y;
    }

    if w < min_dim {
        if handle.moves_west() {
            x -= min_dim - w;
        }
        w = min_dim;
    }
    if h < min_dim {
        if handle.moves_north() {
            y -= min_dim - h;
        }
        h = min_dim;
    }

    ShapeGeometry {
        position: Point::new(x, y),
        width: w,
        height: h,
    }
}

/// Handle under a world point; `reach` is half the handle size in world units.
pub fn handle_at(geometry: &ShapeGeometry, world: Point, reach: f64) -> Option<Handle> {
    let r = geometry.rect();
    Handle::ALL.into_iter().find(|h| {
        let a = h.anchor(r);
        (world.x - a.x).abs() <= reach && (world.y - a.y).abs() <= reach
    })
}

#[cfg(test)]
#[path = "../../tests/unit/interact/resize.rs"]
mod tests;
