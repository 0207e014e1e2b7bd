use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{FogmapError, FogmapResult};
use crate::foundation::math::{Fnv1a64, hash_unit};

/// Smallest brush edge length in raster pixels.
pub const MIN_BRUSH_SIZE: u32 = 4;
/// Largest brush edge length in raster pixels.
pub const MAX_BRUSH_SIZE: u32 = 512;
/// Default brush edge length in raster pixels.
pub const DEFAULT_BRUSH_SIZE: u32 = 32;
/// Peak alpha of one brush stamp (about half of full scale).
pub const STAMP_PEAK_ALPHA: u8 = 128;
/// Number of cached cloud variants.
pub const CLOUD_VARIANTS: u8 = 4;

/// Brush footprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushShape {
    /// Soft-edged square.
    Rectangle,
    /// Radial falloff.
    #[default]
    Circle,
    /// Perturbed blob.
    Cloud,
}

/// Clamp a requested brush size into the supported range.
pub fn clamp_brush_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

/// Square single-channel alpha stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrushStamp {
    size: u32,
    alpha: Vec<u8>,
}

impl BrushStamp {
    /// Edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row-major alpha values, `size * size` bytes.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Alpha at `(x, y)`, zero outside the stamp.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.size || y >= self.size {
            return 0;
        }
        self.alpha[(y as usize) * (self.size as usize) + (x as usize)]
    }

    /// Largest alpha in the stamp.
    pub fn peak(&self) -> u8 {
        self.alpha.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct BrushKey {
    shape: BrushShape,
    size: u32,
    variant: u8,
}

/// Stamp cache keyed by `(shape, size)`, plus the variant index for clouds.
#[derive(Debug, Default)]
pub struct BrushCache {
    stamps: HashMap<BrushKey, Arc<BrushStamp>>,
}

impl BrushCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached stamps.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Return `true` when nothing has been generated yet.
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Stamp for a dab of `shape` whose top-left corner lands on `anchor`.
    ///
    /// Cloud dabs pick one of [`CLOUD_VARIANTS`] variants from the anchor, so consecutive dabs of
    /// a stroke differ while replaying the same stroke reproduces the same stamps.
    pub fn stamp_for_dab(
        &mut self,
        shape: BrushShape,
        size: u32,
        anchor: (i64, i64),
    ) -> FogmapResult<Arc<BrushStamp>> {
        let variant = match shape {
            BrushShape::Cloud => {
                let mut h = Fnv1a64::new(u64::from(size));
                h.write_u64(anchor.0 as u64);
                h.write_u64(anchor.1 as u64);
                (h.finish() % u64::from(CLOUD_VARIANTS)) as u8
            }
            _ => 0,
        };
        self.stamp(shape, size, variant)
    }

    /// Stamp for an explicit variant (ignored for non-cloud shapes).
    pub fn stamp(
        &mut self,
        shape: BrushShape,
        size: u32,
        variant: u8,
    ) -> FogmapResult<Arc<BrushStamp>> {
        let key = BrushKey {
            shape,
            size: clamp_brush_size(size),
            variant: if shape == BrushShape::Cloud {
                variant % CLOUD_VARIANTS
            } else {
                0
            },
        };
        if let Some(s) = self.stamps.get(&key) {
            return Ok(Arc::clone(s));
        }
        let stamp = Arc::new(generate(key)?);
        tracing::debug!(?shape, size = key.size, variant = key.variant, "generated brush stamp");
        self.stamps.insert(key, Arc::clone(&stamp));
        Ok(stamp)
    }
}

fn generate(key: BrushKey) -> FogmapResult<BrushStamp> {
    let alpha = match key.shape {
        BrushShape::Rectangle => rectangle_alpha(key.size)?,
        BrushShape::Circle => circle_alpha(key.size),
        BrushShape::Cloud => cloud_alpha(key.size, u64::from(key.variant))?,
    };
    Ok(BrushStamp {
        size: key.size,
        alpha,
    })
}

fn blur_radius_for(size: u32) -> u32 {
    (size / 8).max(1)
}

fn rectangle_alpha(size: u32) -> FogmapResult<Vec<u8>> {
    let r = blur_radius_for(size);
    let n = size as usize;
    let mut src = vec![0u8; n * n];
    for y in r..size - r {
        for x in r..size - r {
            src[(y as usize) * n + (x as usize)] = STAMP_PEAK_ALPHA;
        }
    }
    blur_alpha(&src, size, size, r, r as f32 / 2.0)
}

fn circle_alpha(size: u32) -> Vec<u8> {
    let n = size as usize;
    let c = f64::from(size) / 2.0;
    let mut out = vec![0u8; n * n];
    for y in 0..size {
        for x in 0..size {
            let dx = f64::from(x) + 0.5 - c;
            let dy = f64::from(y) + 0.5 - c;
            let d = (dx * dx + dy * dy).sqrt() / c;
            let t = 1.0 - smoothstep(0.6, 1.0, d);
            out[(y as usize) * n + (x as usize)] =
                (f64::from(STAMP_PEAK_ALPHA) * t).round() as u8;
        }
    }
    out
}

fn cloud_alpha(size: u32, seed: u64) -> FogmapResult<Vec<u8>> {
    const LOBES: u64 = 7;
    let n = size as usize;
    let c = f64::from(size) / 2.0;
    let r = blur_radius_for(size);
    let usable = c - f64::from(r);

    let rotation = hash_unit(seed, 0) * std::f64::consts::TAU;
    let mut lobes = Vec::with_capacity(LOBES as usize + 1);
    lobes.push((c, c, (usable * 0.55).max(1.0)));
    for i in 0..LOBES {
        let angle = rotation + (i as f64) * std::f64::consts::TAU / (LOBES as f64)
            + (hash_unit(seed, 3 * i + 1) - 0.5) * 0.6;
        let lobe_r = usable * (0.25 + 0.15 * hash_unit(seed, 3 * i + 2));
        let dist = (usable - lobe_r) * (0.55 + 0.45 * hash_unit(seed, 3 * i + 3));
        lobes.push((c + dist * angle.cos(), c + dist * angle.sin(), lobe_r));
    }

    let mut src = vec![0u8; n * n];
    for y in 0..size {
        for x in 0..size {
            let px = f64::from(x) + 0.5;
            let py = f64::from(y) + 0.5;
            let inside = lobes.iter().any(|&(lx, ly, lr)| {
                let dx = px - lx;
                let dy = py - ly;
                dx * dx + dy * dy <= lr * lr
            });
            if inside {
                src[(y as usize) * n + (x as usize)] = STAMP_PEAK_ALPHA;
            }
        }
    }
    blur_alpha(&src, size, size, r, r as f32 / 2.0)
}

fn smoothstep(a: f64, b: f64, x: f64) -> f64 {
    if x <= a {
        return 0.0;
    }
    if x >= b {
        return 1.0;
    }
    let t = (x - a) / (b - a);
    (t * t * (3.0 - 2.0 * t)).clamp(0.0, 1.0)
}

/// Separable gaussian blur of a single-channel alpha plane.
pub(crate) fn blur_alpha(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> FogmapResult<Vec<u8>> {
    if src.len() != (width as usize) * (height as usize) {
        return Err(FogmapError::validation("blur input length mismatch"));
    }
    let k = gaussian_kernel_q16(radius, sigma)?;
    if k.len() == 1 {
        return Ok(src.to_vec());
    }
    let mut tmp = vec![0u8; src.len()];
    let mut dst = vec![0u8; src.len()];
    horizontal_blur_q16(src, &mut tmp, width, height, &k);
    vertical_blur_q16(&tmp, &mut dst, width, height, &k);
    Ok(dst)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> FogmapResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FogmapError::validation("blur sigma must be finite and > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn horizontal_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                acc += u64::from(kw) * u64::from(src[(y * w + sx) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

fn vertical_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                acc += u64::from(kw) * u64::from(src[(sy * w + x) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/fog/brush.rs"]
mod tests;
