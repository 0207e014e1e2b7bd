/// Player mirror display.
pub mod mirror;
/// HTTP stream server.
pub mod stream;
/// Interactive GM surface.
pub mod surface;

use std::sync::Arc;

use crate::foundation::error::FogmapResult;
use crate::interact::machine::Redraw;
use crate::render::frame::{ComposedFrame, Decorations};
use crate::session::document::DocumentSnapshot;

pub use mirror::MirrorSink;
pub use stream::{SnapshotCell, StreamServer};
pub use surface::InteractiveSurface;

/// Sink contract for surfaces refreshed on the owning thread.
///
/// `refresh` is called once per handled input with the newest snapshot and the repaint the input
/// asked for. Sinks decide how much of that they honor.
pub trait FrameSink {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Bring the sink up to date with `snap`.
    fn refresh(
        &mut self,
        snap: &Arc<DocumentSnapshot>,
        redraw: Redraw,
        decorations: &Decorations,
    ) -> FogmapResult<()>;

    /// Last frame shown, if any.
    fn frame(&self) -> Option<&ComposedFrame>;
}
