use std::sync::Arc;

use crate::assets::store::AssetStore;
use crate::foundation::error::FogmapResult;
use crate::interact::machine::Redraw;
use crate::render::compositor::Compositor;
use crate::render::frame::{ComposedFrame, Decorations, RenderMode};
use crate::session::document::DocumentSnapshot;
use crate::sink::FrameSink;

/// Player-facing second display: binary fog, no markers, no decorations.
///
/// Every change is a full compose; the mirror never takes input.
pub struct MirrorSink {
    compositor: Compositor,
    frame: Option<ComposedFrame>,
    last_revision: Option<u64>,
}

impl MirrorSink {
    /// Mirror drawing with its own compositor.
    pub fn new(assets: Arc<AssetStore>) -> Self {
        Self {
            compositor: Compositor::new(assets),
            frame: None,
            last_revision: None,
        }
    }
}

impl FrameSink for MirrorSink {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn refresh(
        &mut self,
        snap: &Arc<DocumentSnapshot>,
        redraw: Redraw,
        _decorations: &Decorations,
    ) -> FogmapResult<()> {
        // GM overlays are invisible here.
        let overlay_only = matches!(redraw, Redraw::None | Redraw::Overlay);
        if overlay_only && self.last_revision == Some(snap.revision) && self.frame.is_some() {
            return Ok(());
        }
        let frame = self
            .compositor
            .compose(snap, &snap.viewport, RenderMode::Player, None)?;
        self.frame = Some(frame);
        self.last_revision = Some(snap.revision);
        Ok(())
    }

    fn frame(&self) -> Option<&ComposedFrame> {
        self.frame.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sink/mirror.rs"]
mod tests;
