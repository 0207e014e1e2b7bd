use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{FogmapError, FogmapResult};

/// Alpha of freshly occluded fog.
pub const DEFAULT_FOG_ALPHA: u8 = 128;

/// Single-channel fog alpha plane with the base image's dimensions.
///
/// Storage is shared: cloning is cheap and the first write after a clone copies the plane, so
/// snapshots handed to the compositor or the persistence worker never observe later edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FogRaster {
    width: u32,
    height: u32,
    alpha: Arc<Vec<u8>>,
}

impl FogRaster {
    /// Raster filled with `fill`.
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            alpha: Arc::new(vec![fill; (width as usize) * (height as usize)]),
        }
    }

    /// Raster filled with [`DEFAULT_FOG_ALPHA`].
    pub fn occluded(width: u32, height: u32) -> Self {
        Self::new(width, height, DEFAULT_FOG_ALPHA)
    }

    /// Wrap an existing alpha plane.
    pub fn from_alpha(width: u32, height: u32, alpha: Vec<u8>) -> FogmapResult<Self> {
        if width == 0 || height == 0 {
            return Err(FogmapError::validation("fog raster must be non-empty"));
        }
        if alpha.len() != (width as usize) * (height as usize) {
            return Err(FogmapError::validation(format!(
                "fog alpha length {} does not match {width}x{height}",
                alpha.len()
            )));
        }
        Ok(Self {
            width,
            height,
            alpha: Arc::new(alpha),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.alpha.len()
    }

    /// Row-major alpha values.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Mutable access; copies the plane when it is shared with a snapshot.
    pub(crate) fn alpha_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.alpha).as_mut_slice()
    }

    /// Alpha at a pixel, `None` outside the raster.
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.alpha
            .get((y as usize) * (self.width as usize) + (x as usize))
            .copied()
    }

    /// Set every pixel to `value`.
    pub fn fill(&mut self, value: u8) {
        match Arc::get_mut(&mut self.alpha) {
            Some(v) => v.fill(value),
            None => self.alpha = Arc::new(vec![value; self.pixel_count()]),
        }
    }

    /// Return `true` when both rasters share storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.alpha, &other.alpha)
    }

    /// Nearest-neighbour resize to new dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.dimensions() {
            return self.clone();
        }
        let src = image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.alpha[(y as usize) * (self.width as usize) + (x as usize)]])
        });
        let out = image::imageops::resize(
            &src,
            width,
            height,
            image::imageops::FilterType::Nearest,
        );
        Self {
            width,
            height,
            alpha: Arc::new(out.into_raw()),
        }
    }

    /// Encode as an 8-bit grayscale PNG (compact form used by the undo history).
    pub fn encode_gray_png(&self) -> FogmapResult<Vec<u8>> {
        let img = image::GrayImage::from_raw(self.width, self.height, self.alpha.to_vec())
            .ok_or_else(|| FogmapError::validation("fog raster buffer size mismatch"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode fog history png")?;
        Ok(buf)
    }

    /// Encode as an RGBA PNG mask: black pixels carrying the fog alpha.
    pub fn encode_mask_png(&self) -> FogmapResult<Vec<u8>> {
        let mut rgba = Vec::with_capacity(self.pixel_count() * 4);
        for &a in self.alpha.iter() {
            rgba.extend_from_slice(&[0, 0, 0, a]);
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, rgba)
            .ok_or_else(|| FogmapError::validation("fog raster buffer size mismatch"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode fog mask png")?;
        Ok(buf)
    }

    /// Decode PNG (or any supported format) bytes into a raster.
    ///
    /// Images with an alpha channel contribute their alpha; opaque images contribute luma.
    pub fn decode(bytes: &[u8]) -> FogmapResult<Self> {
        let img = image::load_from_memory(bytes).context("decode fog mask")?;
        Ok(Self::from_image(&img))
    }

    /// Extract fog alpha from a decoded image.
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let (width, height) = (img.width().max(1), img.height().max(1));
        let alpha = if img.color().has_alpha() {
            img.to_rgba8().pixels().map(|p| p.0[3]).collect::<Vec<u8>>()
        } else {
            img.to_luma8().into_raw()
        };
        if alpha.len() != (width as usize) * (height as usize) {
            return Self::occluded(width, height);
        }
        Self {
            width,
            height,
            alpha: Arc::new(alpha),
        }
    }

    /// Decode a stored mask and fit it to `expected` dimensions.
    ///
    /// Returns the raster plus the mismatch that was repaired, if any.
    pub fn decode_fitted(
        bytes: &[u8],
        expected: (u32, u32),
    ) -> FogmapResult<(Self, Option<FogmapError>)> {
        let raster = Self::decode(bytes)?;
        if raster.dimensions() == expected {
            return Ok((raster, None));
        }
        let mismatch = FogmapError::RasterSizeMismatch {
            expected,
            actual: raster.dimensions(),
        };
        Ok((raster.resized(expected.0, expected.1), Some(mismatch)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fog/raster.rs"]
mod tests;
