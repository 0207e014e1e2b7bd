use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::fog::brush::{BrushShape, DEFAULT_BRUSH_SIZE, clamp_brush_size};
use crate::foundation::core::Color;
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::interact::resize::DEFAULT_HANDLE_SIZE;
use crate::persist::record::DEFAULT_HOVER_FONT_SIZE;
use crate::scene::item::{DEFAULT_SHAPE_BORDER, DEFAULT_SHAPE_FILL, DEFAULT_TOKEN_SIZE};

/// Default HTTP bind address for the stream sink.
pub const DEFAULT_STREAM_BIND: &str = "127.0.0.1:32000";

/// HTTP stream sink options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOpts {
    /// Socket address to listen on.
    pub bind: String,
    /// Delay between multipart frames and the viewer page refresh.
    pub interval_ms: u64,
    /// JPEG quality for `/stream` parts, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for StreamOpts {
    fn default() -> Self {
        Self {
            bind: DEFAULT_STREAM_BIND.to_string(),
            interval_ms: 200,
            jpeg_quality: 80,
        }
    }
}

impl StreamOpts {
    /// Return options with another bind address.
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Return options with another frame interval (at least 10 ms).
    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = ms.max(10);
        self
    }
}

/// Persistence pipeline options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistOpts {
    /// Pause after an in-flight write before flushing the pending snapshot.
    pub coalesce_delay_ms: u64,
}

impl Default for PersistOpts {
    fn default() -> Self {
        Self {
            coalesce_delay_ms: 250,
        }
    }
}

impl PersistOpts {
    /// Return options with another coalescing delay.
    pub fn with_coalesce_delay_ms(mut self, ms: u64) -> Self {
        self.coalesce_delay_ms = ms;
        self
    }
}

/// Editing defaults for the GM surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOpts {
    /// Fog brush edge length in pixels.
    pub brush_size: u32,
    /// Fog brush shape.
    pub brush_shape: BrushShape,
    /// Size of newly added tokens.
    pub token_size: f64,
    /// Resize handle size in screen pixels.
    pub handle_size: f64,
    /// Fill color of new shapes.
    pub shape_fill: Color,
    /// Whether new shapes are filled.
    pub shape_filled: bool,
    /// Border color of new shapes.
    pub shape_border: Color,
    /// Freehand stroke color.
    pub stroke_color: Color,
    /// Freehand stroke width in world units.
    pub stroke_width: f64,
    /// Hover card font size.
    pub hover_font_size: u32,
    /// TrueType/OpenType font for labels and text; text is skipped without one.
    pub font_path: Option<PathBuf>,
}

impl Default for EditorOpts {
    fn default() -> Self {
        Self {
            brush_size: DEFAULT_BRUSH_SIZE,
            brush_shape: BrushShape::default(),
            token_size: DEFAULT_TOKEN_SIZE,
            handle_size: DEFAULT_HANDLE_SIZE,
            shape_fill: DEFAULT_SHAPE_FILL,
            shape_filled: true,
            shape_border: DEFAULT_SHAPE_BORDER,
            stroke_color: Color::rgb(255, 0, 0),
            stroke_width: 3.0,
            hover_font_size: DEFAULT_HOVER_FONT_SIZE,
            font_path: None,
        }
    }
}

/// Top-level options for a [`crate::session::MapSession`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOpts {
    /// Root every campaign-relative path resolves against.
    pub campaign_dir: PathBuf,
    /// GM surface size in pixels.
    pub surface_size: (u32, u32),
    /// Stream sink options.
    pub stream: StreamOpts,
    /// Persistence options.
    pub persist: PersistOpts,
    /// Editing defaults.
    pub editor: EditorOpts,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            campaign_dir: PathBuf::from("."),
            surface_size: (1280, 720),
            stream: StreamOpts::default(),
            persist: PersistOpts::default(),
            editor: EditorOpts::default(),
        }
    }
}

impl SessionOpts {
    /// Return options rooted at `dir`.
    pub fn with_campaign_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.campaign_dir = dir.into();
        self
    }

    /// Return options with another GM surface size.
    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = (width.max(1), height.max(1));
        self
    }

    /// Return options with other stream settings.
    pub fn with_stream(mut self, stream: StreamOpts) -> Self {
        self.stream = stream;
        self
    }

    /// Return options with other persistence settings.
    pub fn with_persist(mut self, persist: PersistOpts) -> Self {
        self.persist = persist;
        self
    }

    /// Return options with other editing defaults.
    pub fn with_editor(mut self, editor: EditorOpts) -> Self {
        self.editor = editor;
        self
    }

    /// Load options from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> FogmapResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let opts: Self = serde_json::from_str(&raw)?;
        opts.validated()
    }

    /// Apply `FOGMAP_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        self.stream.interval_ms = std::env::var("FOGMAP_STREAM_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(self.stream.interval_ms);
        self.stream.bind = std::env::var("FOGMAP_STREAM_BIND")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(self.stream.bind);
        self.persist.coalesce_delay_ms = std::env::var("FOGMAP_COALESCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(self.persist.coalesce_delay_ms);
        self
    }

    /// Check ranges and clamp soft limits.
    pub fn validated(mut self) -> FogmapResult<Self> {
        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(FogmapError::validation(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.stream.jpeg_quality
            )));
        }
        if !(self.editor.token_size.is_finite() && self.editor.token_size > 0.0) {
            return Err(FogmapError::validation("token_size must be finite and > 0"));
        }
        if !(self.editor.handle_size.is_finite() && self.editor.handle_size > 0.0) {
            return Err(FogmapError::validation("handle_size must be finite and > 0"));
        }
        self.editor.brush_size = clamp_brush_size(self.editor.brush_size);
        self.stream.interval_ms = self.stream.interval_ms.max(10);
        Ok(self)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
