/// Entity lookup for tokens.
pub mod catalog;
/// Copy and paste of items.
pub mod clipboard;
/// Scene item variants.
pub mod item;
/// Item JSON wire format.
pub mod record;
/// Ordered item store.
pub mod store;

pub use catalog::{EntityCatalog, EntityRecord, MemoryCatalog, hover_text};
pub use clipboard::Clipboard;
pub use item::{
    FreehandStroke, ItemKind, Marker, SceneItem, ShapeItem, TextAnnotation, Token,
};
pub use record::{ItemRecord, items_from_json, items_from_json_lenient, items_to_json};
pub use store::{ItemRuntime, SceneChange, SceneStore};
