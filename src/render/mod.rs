/// CPU compositor.
pub mod compositor;
/// Composed frames and GM overlays.
pub mod frame;
pub(crate) mod paint;

pub use compositor::Compositor;
pub use frame::{ComposedFrame, Decorations, PopupCard, RenderMode};
