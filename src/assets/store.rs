use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;

use crate::foundation::error::{FogmapError, FogmapResult};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Uniform image.
    pub fn solid(width: u32, height: u32, premul: [u8; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            rgba8_premul: Arc::new(premul.repeat((width as usize) * (height as usize))),
        }
    }

    /// Grey checkerboard drawn in place of a missing base image.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut px = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for y in 0..height {
            for x in 0..width {
                let v = if ((x / 32) + (y / 32)) % 2 == 0 { 96 } else { 128 };
                px.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Self {
            width,
            height,
            rgba8_premul: Arc::new(px),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    /// Red channel.
    pub(crate) r: u8,
    /// Green channel.
    pub(crate) g: u8,
    /// Blue channel.
    pub(crate) b: u8,
    /// Alpha channel.
    pub(crate) a: u8,
}

/// Normalize and validate campaign-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> FogmapResult<String> {
    let s = source.trim().replace('\\', "/");
    if s.starts_with('/') || has_drive_prefix(&s) {
        return Err(FogmapError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(FogmapError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(FogmapError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(FogmapError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

fn has_drive_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

/// Express `path` relative to `campaign_dir` in normalized form.
///
/// Relative inputs are normalized as-is; absolute inputs must live under the campaign directory.
pub fn campaign_relative_path(campaign_dir: &Path, path: &str) -> FogmapResult<String> {
    let p = Path::new(path.trim());
    if !p.is_absolute() {
        return normalize_rel_path(path);
    }
    let rel = p.strip_prefix(campaign_dir).map_err(|_| {
        FogmapError::validation(format!(
            "'{}' is outside the campaign directory {}",
            p.display(),
            campaign_dir.display()
        ))
    })?;
    normalize_rel_path(&rel.to_string_lossy())
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
        }
    }

    fn ensure_family(&mut self, font_bytes: &[u8]) -> FogmapResult<String> {
        if let Some(name) = &self.family_name {
            return Ok(name.clone());
        }
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            FogmapError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| FogmapError::validation("registered font family has no name"))?
            .to_string();
        self.family_name = Some(family_name.clone());
        Ok(family_name)
    }

    /// Shape and lay out plain text using provided font bytes and styling.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> FogmapResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(FogmapError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let family_name = self.ensure_family(font_bytes)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        Ok(layout)
    }
}

/// Campaign asset loader with a shared decoded-image cache.
///
/// Failed loads are cached too, so a missing token image is reported once rather than on every
/// frame.
#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
    images: RwLock<HashMap<String, Option<Arc<PreparedImage>>>>,
    font: Option<Arc<Vec<u8>>>,
}

impl AssetStore {
    /// Store rooted at the campaign directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            images: RwLock::new(HashMap::new()),
            font: None,
        }
    }

    /// Attach font bytes used for labels and text annotations.
    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.font = Some(Arc::new(bytes));
        self
    }

    /// Load the label font from disk.
    pub fn with_font_file(self, path: &Path) -> FogmapResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font file {}", path.display()))?;
        Ok(self.with_font_bytes(bytes))
    }

    /// Campaign directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Font bytes, if configured.
    pub fn font_bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.font.clone()
    }

    /// Absolute path of a campaign-relative asset.
    pub fn resolve(&self, rel: &str) -> FogmapResult<PathBuf> {
        let p = Path::new(rel.trim());
        if p.is_absolute() {
            return Ok(p.to_path_buf());
        }
        Ok(self.root.join(normalize_rel_path(rel)?))
    }

    /// Read raw bytes; a missing file is [`FogmapError::AssetMissing`].
    pub fn read_bytes(&self, rel: &str) -> FogmapResult<Vec<u8>> {
        let path = self.resolve(rel)?;
        match std::fs::read(&path) {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FogmapError::asset_missing(
                path.display().to_string(),
            )),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read asset {}", path.display()))
                .into()),
        }
    }

    /// Decoded image, cached by path.
    pub fn image(&self, rel: &str) -> FogmapResult<Arc<PreparedImage>> {
        let key = rel.trim().replace('\\', "/");
        {
            let cache = self.images.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = cache.get(&key) {
                return slot
                    .clone()
                    .ok_or_else(|| FogmapError::asset_missing(key.clone()));
            }
        }

        let loaded = self
            .read_bytes(&key)
            .and_then(|bytes| crate::assets::decode::decode_image(&bytes));
        let mut cache = self.images.write().unwrap_or_else(|e| e.into_inner());
        match loaded {
            Ok(img) => {
                let img = Arc::new(img);
                cache.insert(key, Some(Arc::clone(&img)));
                Ok(img)
            }
            Err(e) => {
                tracing::warn!(path = %key, error = %e, "image unavailable; drawing placeholder");
                cache.insert(key.clone(), None);
                Err(FogmapError::asset_missing(key))
            }
        }
    }

    /// Forget a cached image so the next request reloads it.
    pub fn invalidate(&self, rel: &str) {
        let key = rel.trim().replace('\\', "/");
        self.images
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
