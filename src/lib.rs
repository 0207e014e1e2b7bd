//! fogmap is a live map display and fog-of-war compositing engine for tabletop sessions.
//!
//! A game master edits a base image, a fog raster and an ordered set of overlay items. The same
//! scene is shown on three sinks:
//!
//! - the interactive GM surface (graded fog, markers, selection overlays)
//! - a player mirror display (binary fog, no markers)
//! - an HTTP stream (`/frame`, `/stream`, `/`, `/api/status`)
//!
//! The entry point is [`MapSession`]; the lower layers ([`FogEngine`], [`SceneStore`],
//! [`Interaction`], [`Compositor`], [`PersistPipeline`]) are usable on their own.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Asset lookup, decoding and text layout.
pub mod assets;
/// Fog raster, brushes and undo history.
pub mod fog;
/// Core types and errors.
pub mod foundation;
/// Selection and manipulation state machine.
pub mod interact;
/// Map records, repositories and the save worker.
pub mod persist;
/// CPU compositing.
pub mod render;
/// Scene items and their store.
pub mod scene;
/// Open map state and session orchestration.
pub mod session;
/// Render sinks.
pub mod sink;
/// Pan and zoom.
pub mod viewport;

pub use crate::assets::{AssetStore, PreparedImage};
pub use crate::fog::{BrushShape, FogEngine, FogMode, FogRaster};
pub use crate::foundation::core::{Color, ItemId, Point, Rect, Rgba8Premul, Vec2};
pub use crate::foundation::error::{FogmapError, FogmapResult};
pub use crate::interact::{InputOutcome, Interaction, Modifiers, PointerButton, Redraw, Tool};
pub use crate::persist::{
    ItemRepository, JsonFileRepository, MapRecord, MemoryRepository, PersistPipeline,
};
pub use crate::render::{ComposedFrame, Compositor, RenderMode};
pub use crate::scene::{EntityCatalog, MemoryCatalog, SceneItem, SceneStore};
pub use crate::session::{DocumentSnapshot, Input, MapDocument, MapSession, SessionOpts};
pub use crate::sink::{FrameSink, StreamServer};
pub use crate::viewport::Viewport;
