use crate::assets::decode::{encode_jpeg_premul, encode_png_premul};
use crate::foundation::core::{Point, Rect, Vec2};
use crate::foundation::error::FogmapResult;

/// Which surface a frame is composed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Game master surface: graded fog, markers and editing decorations.
    Gm,
    /// Mirror and stream surfaces: binary fog, no markers.
    Player,
}

/// One composed frame in premultiplied RGBA8, plus the screen-space fog alpha it was built with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub data: Vec<u8>,
    /// Fog alpha applied to each screen pixel.
    pub fog_alpha: Vec<u8>,
}

impl ComposedFrame {
    /// Opaque black frame with no fog.
    pub fn blank(width: u32, height: u32) -> Self {
        let n = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: [0, 0, 0, 255].repeat(n),
            fog_alpha: vec![0; n],
        }
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Fog alpha at `(x, y)`.
    pub fn fog_alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.fog_alpha[(y as usize) * (self.width as usize) + (x as usize)])
    }

    /// Shift the frame by whole pixels; uncovered area becomes opaque black with no fog.
    pub fn translate_in_place(&mut self, delta: Vec2) {
        let dx = delta.x.round() as i64;
        let dy = delta.y.round() as i64;
        if dx == 0 && dy == 0 {
            return;
        }
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        let mut data = [0u8, 0, 0, 255].repeat((w * h) as usize);
        let mut fog = vec![0u8; (w * h) as usize];
        for y in 0..h {
            let sy = y - dy;
            if sy < 0 || sy >= h {
                continue;
            }
            let x0 = dx.max(0);
            let x1 = (w + dx).min(w);
            if x0 >= x1 {
                continue;
            }
            let src = (sy * w + (x0 - dx)) as usize;
            let dst = (y * w + x0) as usize;
            let n = (x1 - x0) as usize;
            data[dst * 4..(dst + n) * 4].copy_from_slice(&self.data[src * 4..(src + n) * 4]);
            fog[dst..dst + n].copy_from_slice(&self.fog_alpha[src..src + n]);
        }
        self.data = data;
        self.fog_alpha = fog;
    }

    /// PNG bytes.
    pub fn encode_png(&self) -> FogmapResult<Vec<u8>> {
        encode_png_premul(self.width, self.height, &self.data)
    }

    /// JPEG bytes.
    pub fn encode_jpeg(&self, quality: u8) -> FogmapResult<Vec<u8>> {
        encode_jpeg_premul(self.width, self.height, &self.data, quality)
    }
}

/// Hover card or marker description drawn next to an item.
#[derive(Clone, Debug, PartialEq)]
pub struct PopupCard {
    /// World-space top-left of the card.
    pub anchor: Point,
    /// Card text, possibly multi-line.
    pub text: String,
    /// Font size in screen pixels.
    pub font_size: f64,
}

/// GM-only overlays drawn above the fog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decorations {
    /// World bounding boxes of selected items.
    pub selected: Vec<Rect>,
    /// World box of the shape in graphical edit mode.
    pub handles: Option<Rect>,
    /// Handle edge length in screen pixels.
    pub handle_size: f64,
    /// World marquee rectangle.
    pub marquee: Option<Rect>,
    /// World points of the stroke being drawn.
    pub stroke_preview: Vec<Point>,
    /// World rectangle of a pending fog fill.
    pub fog_rect_preview: Option<Rect>,
    /// Visible popups.
    pub popups: Vec<PopupCard>,
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
