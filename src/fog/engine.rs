use crate::fog::brush::{BrushCache, BrushShape, clamp_brush_size};
use crate::fog::history::{FogHistory, FogHistoryEntry};
use crate::fog::raster::{DEFAULT_FOG_ALPHA, FogRaster};
use crate::foundation::core::{Point, Rect};
use crate::foundation::error::{FogmapError, FogmapResult};

/// Whether an operation occludes or reveals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FogMode {
    /// Add fog (saturating add).
    Add,
    /// Remove fog (saturating subtract).
    Remove,
}

/// Integer pixel rectangle `[x0, x1) x [y0, y1)` inside a raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive).
    pub y0: u32,
    /// Right edge (exclusive).
    pub x1: u32,
    /// Bottom edge (exclusive).
    pub y1: u32,
}

impl PixelRect {
    /// Same area as a world rectangle.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }
}

/// Fog raster plus brushes and undo history for one open map.
///
/// Lives on the thread that handles input; nothing here locks.
#[derive(Debug)]
pub struct FogEngine {
    raster: FogRaster,
    history: FogHistory,
    brushes: BrushCache,
    gesture_active: bool,
}

impl FogEngine {
    /// Fully occluded engine for a base image of `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_raster(FogRaster::occluded(width, height))
    }

    /// Engine around an existing raster.
    pub fn with_raster(raster: FogRaster) -> Self {
        Self {
            history: FogHistory::for_pixel_count(raster.pixel_count()),
            raster,
            brushes: BrushCache::new(),
            gesture_active: false,
        }
    }

    /// Live raster.
    pub fn raster(&self) -> &FogRaster {
        &self.raster
    }

    /// Cheap copy-on-write snapshot of the live raster.
    pub fn snapshot(&self) -> FogRaster {
        self.raster.clone()
    }

    /// Undo history.
    pub fn history(&self) -> &FogHistory {
        &self.history
    }

    /// Return `true` between `begin_gesture` and `end_gesture`.
    pub fn gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Stamp one brush dab centered on `center` (raster pixels).
    ///
    /// Returns the touched pixel area, `None` when the stamp lies fully outside the raster.
    pub fn paint(
        &mut self,
        center: Point,
        brush_size: u32,
        shape: BrushShape,
        mode: FogMode,
    ) -> FogmapResult<Option<PixelRect>> {
        if !(center.x.is_finite() && center.y.is_finite()) {
            return Err(FogmapError::validation("paint center must be finite"));
        }
        let size = clamp_brush_size(brush_size);
        let half = f64::from(size) / 2.0;
        let left = (center.x - half).round() as i64;
        let top = (center.y - half).round() as i64;
        let stamp = self.brushes.stamp_for_dab(shape, size, (left, top))?;
        let (w, h) = (i64::from(self.raster.width()), i64::from(self.raster.height()));
        let s = i64::from(size);

        let x0 = left.max(0);
        let y0 = top.max(0);
        let x1 = (left + s).min(w);
        let y1 = (top + s).min(h);
        if x0 >= x1 || y0 >= y1 {
            return Ok(None);
        }

        let row_len = w as usize;
        let alpha = self.raster.alpha_mut();
        for y in y0..y1 {
            let sy = (y - top) as u32;
            let row = (y as usize) * row_len;
            for x in x0..x1 {
                let a = stamp.alpha_at((x - left) as u32, sy);
                if a == 0 {
                    continue;
                }
                let dst = &mut alpha[row + x as usize];
                *dst = match mode {
                    FogMode::Add => dst.saturating_add(a),
                    FogMode::Remove => dst.saturating_sub(a),
                };
            }
        }

        Ok(Some(PixelRect {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        }))
    }

    fn clip_rect(&self, rect: Rect) -> Option<PixelRect> {
        let r = rect.abs();
        if !(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()) {
            return None;
        }
        let (w, h) = (
            f64::from(self.raster.width()),
            f64::from(self.raster.height()),
        );
        let x0 = r.x0.floor().clamp(0.0, w) as u32;
        let y0 = r.y0.floor().clamp(0.0, h) as u32;
        let x1 = r.x1.ceil().clamp(0.0, w) as u32;
        let y1 = r.y1.ceil().clamp(0.0, h) as u32;
        (x0 < x1 && y0 < y1).then_some(PixelRect { x0, y0, x1, y1 })
    }

    /// Hard-edged fill of a world rectangle: occluded alpha for `Add`, zero for `Remove`.
    pub fn fill_rect(&mut self, rect: Rect, mode: FogMode) -> Option<PixelRect> {
        let px = self.clip_rect(rect)?;
        let value = match mode {
            FogMode::Add => DEFAULT_FOG_ALPHA,
            FogMode::Remove => 0,
        };
        let row_len = self.raster.width() as usize;
        let alpha = self.raster.alpha_mut();
        for y in px.y0..px.y1 {
            let row = (y as usize) * row_len;
            alpha[row + px.x0 as usize..row + px.x1 as usize].fill(value);
        }
        Some(px)
    }

    /// [`fill_rect`](Self::fill_rect) with an undo step, pushed only when pixels are covered.
    pub fn fill_rect_with_history(
        &mut self,
        rect: Rect,
        mode: FogMode,
    ) -> FogmapResult<Option<PixelRect>> {
        if self.clip_rect(rect).is_none() {
            return Ok(None);
        }
        self.push_history()?;
        Ok(self.fill_rect(rect, mode))
    }

    /// Reveal everything.
    pub fn clear(&mut self) {
        self.raster.fill(0);
    }

    /// Occlude everything with the default alpha.
    pub fn reset(&mut self) {
        self.raster.fill(DEFAULT_FOG_ALPHA);
    }

    /// Push a compressed snapshot of the live raster.
    pub fn push_history(&mut self) -> FogmapResult<()> {
        let entry = FogHistoryEntry::capture(&self.raster)?;
        tracing::debug!(
            bytes = entry.byte_len(),
            depth = self.history.len() + 1,
            "pushed fog history"
        );
        self.history.push(entry);
        Ok(())
    }

    /// Start a continuous gesture; pushes history once per gesture.
    pub fn begin_gesture(&mut self) -> FogmapResult<()> {
        if self.gesture_active {
            return Ok(());
        }
        self.push_history()?;
        self.gesture_active = true;
        Ok(())
    }

    /// Finish the current gesture.
    pub fn end_gesture(&mut self) {
        self.gesture_active = false;
    }

    /// Restore the newest history snapshot. Returns `false` when the history is empty.
    ///
    /// A snapshot whose size differs from the live raster is resized to fit.
    pub fn undo(&mut self) -> FogmapResult<bool> {
        self.gesture_active = false;
        let Some(entry) = self.history.pop() else {
            return Ok(false);
        };
        let restored = entry.restore()?;
        let (w, h) = self.raster.dimensions();
        self.raster = if restored.dimensions() != (w, h) {
            tracing::warn!(
                from = ?restored.dimensions(),
                to = ?(w, h),
                "fog history entry resized on undo"
            );
            restored.resized(w, h)
        } else {
            restored
        };
        Ok(true)
    }

    /// Replace the live raster with a stored mask, resizing it to the current dimensions.
    ///
    /// History is cleared because old snapshots belong to the previous mask.
    pub fn load_mask(&mut self, mask: FogRaster) {
        let (w, h) = self.raster.dimensions();
        if mask.dimensions() != (w, h) {
            tracing::warn!(
                expected = ?(w, h),
                actual = ?mask.dimensions(),
                "fog mask size mismatch; resizing"
            );
            self.raster = mask.resized(w, h);
        } else {
            self.raster = mask;
        }
        self.history = FogHistory::for_pixel_count(self.raster.pixel_count());
        self.gesture_active = false;
    }

    /// RGBA PNG bytes of the live mask.
    pub fn encode_png(&self) -> FogmapResult<Vec<u8>> {
        self.raster.encode_mask_png()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fog/engine.rs"]
mod tests;
