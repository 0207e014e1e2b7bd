/// Property edits on single items.
pub mod edits;
/// Pointer and keyboard state machine.
pub mod machine;
/// Eight-handle shape resize.
pub mod resize;
/// Selection set and click semantics.
pub mod selection;

pub use edits::{ItemEdit, apply_edit};
pub use machine::{FogTool, InputOutcome, Interaction, PointerButton, Redraw, Tool, ToolSettings};
pub use resize::{Handle, ShapeGeometry};
pub use selection::{Modifiers, Selection};
