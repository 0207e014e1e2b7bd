/// Cached soft brush stamps.
pub mod brush;
/// Fog painting, rectangles and undo.
pub mod engine;
/// Byte-budgeted undo snapshots.
pub mod history;
/// Single-channel fog raster.
pub mod raster;

pub use brush::{BrushShape, DEFAULT_BRUSH_SIZE, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
pub use engine::{FogEngine, FogMode, PixelRect};
pub use history::{FogHistory, FogHistoryEntry, history_budget_bytes};
pub use raster::{DEFAULT_FOG_ALPHA, FogRaster};
