use std::sync::Arc;

use crate::assets::store::AssetStore;
use crate::foundation::error::FogmapResult;
use crate::interact::machine::Redraw;
use crate::render::compositor::Compositor;
use crate::render::frame::{ComposedFrame, Decorations, RenderMode};
use crate::session::document::DocumentSnapshot;
use crate::sink::FrameSink;

/// GM surface. Keeps the last frame and shifts it while the view is dragged.
pub struct InteractiveSurface {
    compositor: Compositor,
    frame: Option<ComposedFrame>,
    full_renders: u64,
    translations: u64,
}

impl InteractiveSurface {
    /// Surface drawing with its own compositor.
    pub fn new(assets: Arc<AssetStore>) -> Self {
        Self {
            compositor: Compositor::new(assets),
            frame: None,
            full_renders: 0,
            translations: 0,
        }
    }

    /// Number of full recomposes so far.
    pub fn full_renders(&self) -> u64 {
        self.full_renders
    }

    /// Number of frames served by shifting the previous one.
    pub fn translations(&self) -> u64 {
        self.translations
    }

    /// Drop the kept frame so the next refresh recomposes.
    pub fn invalidate(&mut self) {
        self.frame = None;
    }

    fn recompose(&mut self, snap: &DocumentSnapshot, decorations: &Decorations) -> FogmapResult<()> {
        let frame = self
            .compositor
            .compose(snap, &snap.viewport, RenderMode::Gm, Some(decorations))?;
        self.frame = Some(frame);
        self.full_renders += 1;
        Ok(())
    }
}

impl FrameSink for InteractiveSurface {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn refresh(
        &mut self,
        snap: &Arc<DocumentSnapshot>,
        redraw: Redraw,
        decorations: &Decorations,
    ) -> FogmapResult<()> {
        let size = (snap.viewport.width(), snap.viewport.height());
        let fits = self
            .frame
            .as_ref()
            .is_some_and(|f| (f.width, f.height) == size);
        match redraw {
            Redraw::None if fits => Ok(()),
            Redraw::Translate(delta) if fits => {
                if let Some(frame) = self.frame.as_mut() {
                    frame.translate_in_place(delta);
                }
                self.translations += 1;
                Ok(())
            }
            _ => self.recompose(snap, decorations),
        }
    }

    fn frame(&self) -> Option<&ComposedFrame> {
        self.frame.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sink/surface.rs"]
mod tests;
