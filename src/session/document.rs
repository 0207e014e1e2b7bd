use std::sync::Arc;

use crate::assets::store::{AssetStore, PreparedImage};
use crate::fog::engine::FogEngine;
use crate::fog::raster::FogRaster;
use crate::foundation::core::Vec2;
use crate::foundation::error::FogmapResult;
use crate::persist::record::{MapRecord, mask_rel_path};
use crate::scene::item::SceneItem;
use crate::scene::record::{items_from_json_lenient, items_to_json};
use crate::scene::store::SceneStore;
use crate::viewport::mapper::Viewport;

/// Size of the placeholder drawn when the base image cannot be loaded.
pub const PLACEHOLDER_MAP_SIZE: (u32, u32) = (1024, 768);

/// One open map: base image, fog, overlay items and the GM viewport.
///
/// Owned by the input thread. Other threads only ever see a [`DocumentSnapshot`].
#[derive(Debug)]
pub struct MapDocument {
    name: String,
    image_path: String,
    base: Arc<PreparedImage>,
    fog_mask_path: Option<String>,
    /// Fog raster and undo history.
    pub fog: FogEngine,
    /// Overlay items.
    pub store: SceneStore,
    /// GM surface viewport; saved with the record.
    pub viewport: Viewport,
    /// Hover card font size.
    pub hover_font_size: u32,
    /// Default size for new tokens.
    pub token_size: f64,
    revision: u64,
}

/// Immutable view of a document handed to background renderers.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    /// Record name.
    pub name: String,
    /// Base image.
    pub base: Arc<PreparedImage>,
    /// Fog raster at capture time (copy-on-write).
    pub fog: FogRaster,
    /// Items in z-order.
    pub items: Arc<Vec<SceneItem>>,
    /// GM viewport at capture time.
    pub viewport: Viewport,
    /// Document revision the snapshot was taken at.
    pub revision: u64,
}

impl DocumentSnapshot {
    /// Base image dimensions.
    pub fn map_size(&self) -> (u32, u32) {
        (self.base.width, self.base.height)
    }

    /// Empty snapshot used before any map is open.
    pub fn empty() -> Self {
        let (w, h) = PLACEHOLDER_MAP_SIZE;
        Self {
            name: String::new(),
            base: Arc::new(PreparedImage::placeholder(w, h)),
            fog: FogRaster::occluded(w, h),
            items: Arc::new(Vec::new()),
            viewport: Viewport::default(),
            revision: 0,
        }
    }
}

impl MapDocument {
    /// New document over a base image; fog starts fully occluded.
    pub fn new(
        name: impl Into<String>,
        image_path: impl Into<String>,
        base: Arc<PreparedImage>,
    ) -> Self {
        Self {
            name: name.into(),
            image_path: image_path.into(),
            fog: FogEngine::new(base.width, base.height),
            base,
            fog_mask_path: None,
            store: SceneStore::new(),
            viewport: Viewport::default(),
            hover_font_size: crate::persist::record::DEFAULT_HOVER_FONT_SIZE,
            token_size: crate::scene::item::DEFAULT_TOKEN_SIZE,
            revision: 0,
        }
    }

    /// Open a stored map. Missing assets and unreadable items degrade instead of failing.
    #[tracing::instrument(skip(record, assets), fields(map = %record.name))]
    pub fn open(record: &MapRecord, assets: &AssetStore, surface: (u32, u32)) -> Self {
        let base = assets.image(&record.image).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "base image unavailable");
            let (w, h) = PLACEHOLDER_MAP_SIZE;
            Arc::new(PreparedImage::placeholder(w, h))
        });
        let expected = (base.width, base.height);

        let fog = match record.fog_mask() {
            Some(mask) => match assets
                .read_bytes(mask)
                .and_then(|bytes| FogRaster::decode_fitted(&bytes, expected))
            {
                Ok((raster, mismatch)) => {
                    if let Some(m) = mismatch {
                        tracing::warn!(error = %m, "fog mask resized to base image");
                    }
                    raster
                }
                Err(e) => {
                    tracing::warn!(error = %e, "fog mask unavailable; starting occluded");
                    FogRaster::occluded(expected.0, expected.1)
                }
            },
            None => FogRaster::occluded(expected.0, expected.1),
        };

        let items = items_from_json_lenient(&record.tokens);
        tracing::info!(items = items.len(), width = expected.0, height = expected.1, "map opened");

        Self {
            name: record.name.clone(),
            image_path: record.image.clone(),
            base,
            fog_mask_path: record.fog_mask().map(str::to_string),
            fog: FogEngine::with_raster(fog),
            store: SceneStore::from_items(items),
            viewport: Viewport::new(surface.0, surface.1)
                .with_zoom(record.zoom)
                .with_pan(Vec2::new(record.pan_x, record.pan_y)),
            hover_font_size: record.hover_font_size,
            token_size: record.token_size,
            revision: 0,
        }
    }

    /// Record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Campaign-relative base image path.
    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    /// Base image.
    pub fn base(&self) -> &Arc<PreparedImage> {
        &self.base
    }

    /// Base image dimensions.
    pub fn map_size(&self) -> (u32, u32) {
        (self.base.width, self.base.height)
    }

    /// Path the fog mask is saved to.
    pub fn fog_mask_path(&self) -> String {
        self.fog_mask_path
            .clone()
            .unwrap_or_else(|| mask_rel_path(&self.image_path))
    }

    /// Remember where the mask was last written.
    pub fn set_fog_mask_path(&mut self, path: impl Into<String>) {
        self.fog_mask_path = Some(path.into());
    }

    /// Mask path recorded by the last load or save; `None` for a never-saved map.
    pub fn saved_fog_mask_path(&self) -> Option<&str> {
        self.fog_mask_path.as_deref()
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mark the document changed.
    pub fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Cheap immutable view for renderers on other threads.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            name: self.name.clone(),
            base: Arc::clone(&self.base),
            fog: self.fog.snapshot(),
            items: Arc::new(self.store.items_cloned()),
            viewport: self.viewport,
            revision: self.revision,
        }
    }

    /// Record reflecting the current state. Fails only if items cannot be serialized.
    pub fn to_record(&self) -> FogmapResult<MapRecord> {
        let pan = self.viewport.pan();
        Ok(MapRecord {
            name: self.name.clone(),
            image: self.image_path.clone(),
            fog_mask_path: self.fog_mask_path(),
            tokens: items_to_json(&self.store.items())?,
            pan_x: pan.x,
            pan_y: pan.y,
            zoom: self.viewport.zoom(),
            token_size: self.token_size,
            hover_font_size: self.hover_font_size,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/document.rs"]
mod tests;
