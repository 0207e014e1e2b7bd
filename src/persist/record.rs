use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::scene::item::DEFAULT_TOKEN_SIZE;

/// Default hover-card font size.
pub const DEFAULT_HOVER_FONT_SIZE: u32 = 14;

/// Directory (campaign-relative) holding fog masks.
pub const MASKS_DIR: &str = "masks";

/// One stored map, field-compatible with the campaign's map table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    /// Unique map name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Campaign-relative base image path.
    #[serde(rename = "Image", default)]
    pub image: String,
    /// Campaign-relative fog mask path; empty when never saved.
    #[serde(rename = "FogMaskPath", default)]
    pub fog_mask_path: String,
    /// JSON array of variant-tagged items.
    #[serde(
        rename = "Tokens",
        default = "empty_item_list",
        deserialize_with = "tokens_as_string"
    )]
    pub tokens: String,
    /// Horizontal pan in screen pixels.
    #[serde(default)]
    pub pan_x: f64,
    /// Vertical pan in screen pixels.
    #[serde(default)]
    pub pan_y: f64,
    /// Zoom factor.
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Default token size for new tokens.
    #[serde(default = "default_token_size")]
    pub token_size: f64,
    /// Hover card font size.
    #[serde(default = "default_hover_font_size")]
    pub hover_font_size: u32,
}

impl MapRecord {
    /// Fresh record for a base image.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            fog_mask_path: String::new(),
            tokens: empty_item_list(),
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: default_zoom(),
            token_size: default_token_size(),
            hover_font_size: default_hover_font_size(),
        }
    }

    /// Stored mask path, `None` when empty.
    pub fn fog_mask(&self) -> Option<&str> {
        let p = self.fog_mask_path.trim();
        (!p.is_empty()).then_some(p)
    }
}

fn empty_item_list() -> String {
    "[]".to_string()
}

fn default_zoom() -> f64 {
    1.0
}

fn default_token_size() -> f64 {
    DEFAULT_TOKEN_SIZE
}

fn default_hover_font_size() -> u32 {
    DEFAULT_HOVER_FONT_SIZE
}

// Older tables hold the list inline rather than as an encoded string.
fn tokens_as_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Null => empty_item_list(),
        serde_json::Value::String(s) if s.trim().is_empty() => empty_item_list(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Campaign-relative mask path for a base image: `masks/<stem>_mask.png`.
pub fn mask_rel_path(base_image: &str) -> String {
    let stem = Path::new(&base_image.replace('\\', "/"))
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "map".to_string());
    format!("{MASKS_DIR}/{stem}_mask.png")
}

#[cfg(test)]
#[path = "../../tests/unit/persist/record.rs"]
mod tests;
