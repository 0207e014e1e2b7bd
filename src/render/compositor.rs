use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Affine, BezPath, Ellipse, Rect, Shape};
use rayon::prelude::*;

use crate::assets::store::{AssetStore, PreparedImage, TextBrushRgba8, TextLayoutEngine};
use crate::fog::raster::FogRaster;
use crate::foundation::core::{Color, Point};
use crate::foundation::error::FogmapResult;
use crate::interact::resize::Handle;
use crate::render::frame::{ComposedFrame, Decorations, PopupCard, RenderMode};
use crate::render::paint::{
    affine_to_cpu, bezpath_to_cpu, color_paint, fog_over_px, frame_dim, image_paint,
    premul_over_in_place, rect_to_cpu,
};
use crate::scene::item::{
    FreehandStroke, ItemKind, MARKER_HEIGHT, Marker, SceneItem, ShapeItem, TextAnnotation, Token,
    estimate_text_extent,
};
use crate::session::document::DocumentSnapshot;
use crate::viewport::mapper::Viewport;

const TOKEN_BORDER_WIDTH: f64 = 3.0;
const SHAPE_BORDER_WIDTH: f64 = 2.0;
const LABEL_SIZE: f64 = 12.0;
const MARKER_TEXT_SIZE: f64 = 16.0;
const TEXT_CACHE_LIMIT: usize = 256;

const PLACEHOLDER_FILL: Color = Color::rgb(110, 110, 110);
const SELECTION_COLOR: Color = Color::rgb(0, 200, 255);
const MARQUEE_FILL: Color = Color::rgba(0, 120, 255, 48);
const FOG_PREVIEW_COLOR: Color = Color::rgb(255, 210, 0);
const POPUP_FILL: Color = Color::rgba(20, 20, 20, 220);

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TextKey {
    text: String,
    size_bits: u32,
    color: Color,
}

/// CPU compositor turning a document snapshot into a frame.
///
/// Each thread that renders owns its own compositor; image paints and text layouts are cached per
/// instance. Output is a pure function of the snapshot, viewport, mode and decorations.
pub struct Compositor {
    assets: Arc<AssetStore>,
    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    font: Option<(Arc<Vec<u8>>, vello_cpu::peniko::FontData)>,
    base_paint: Option<(Arc<PreparedImage>, ImagePaint)>,
    token_paints: HashMap<String, Option<ImagePaint>>,
    layouts: HashMap<TextKey, Arc<parley::Layout<TextBrushRgba8>>>,
    reported_no_font: bool,
}

impl Compositor {
    /// Compositor loading token images and the label font from `assets`.
    pub fn new(assets: Arc<AssetStore>) -> Self {
        let font = assets.font_bytes().map(|bytes| {
            let data = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                0,
            );
            (bytes, data)
        });
        Self {
            assets,
            ctx: None,
            text_engine: TextLayoutEngine::new(),
            font,
            base_paint: None,
            token_paints: HashMap::new(),
            layouts: HashMap::new(),
            reported_no_font: false,
        }
    }

    /// Compose one frame at the viewport's output size.
    #[tracing::instrument(skip_all, fields(mode = ?mode, width = viewport.width(), height = viewport.height()))]
    pub fn compose(
        &mut self,
        snap: &DocumentSnapshot,
        viewport: &Viewport,
        mode: RenderMode,
        decorations: Option<&Decorations>,
    ) -> FogmapResult<ComposedFrame> {
        let w = frame_dim(viewport.width(), "frame width")?;
        let h = frame_dim(viewport.height(), "frame height")?;
        let world = viewport.world_to_screen_affine();
        let base = self.base_paint_for(&snap.base)?;

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        self.with_ctx_mut(w, h, |this, ctx| {
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(color_paint(Color::BLACK));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

            ctx.set_transform(affine_to_cpu(world));
            ctx.set_paint(base.paint.clone());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(base.w),
                f64::from(base.h),
            ));

            for item in snap.items.iter().filter(|it| !it.is_marker()) {
                this.draw_item(ctx, world, item);
            }
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(())
        })?;

        let mut data = pixmap.data_as_u8_slice().to_vec();
        let fog_alpha = apply_fog(&mut data, viewport, &snap.fog, mode);

        if mode == RenderMode::Gm {
            let mut overlay = vello_cpu::Pixmap::new(w, h);
            self.with_ctx_mut(w, h, |this, ctx| {
                ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                for item in snap.items.iter() {
                    if let ItemKind::Marker(m) = &item.kind {
                        this.draw_marker(ctx, world, item.position(), m);
                    }
                }
                if let Some(d) = decorations {
                    this.draw_decorations(ctx, world, d);
                }
                ctx.flush();
                ctx.render_to_pixmap(&mut overlay);
                Ok(())
            })?;
            premul_over_in_place(&mut data, overlay.data_as_u8_slice())?;
        }

        Ok(ComposedFrame {
            width: u32::from(w),
            height: u32::from(h),
            data,
            fog_alpha,
        })
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> FogmapResult<R>,
    ) -> FogmapResult<R> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx);
        self.ctx = Some(ctx);
        out
    }

    fn base_paint_for(&mut self, base: &Arc<PreparedImage>) -> FogmapResult<ImagePaint> {
        if let Some((cached, paint)) = &self.base_paint
            && Arc::ptr_eq(cached, base)
        {
            return Ok(paint.clone());
        }
        let paint = ImagePaint {
            paint: image_paint(&base.rgba8_premul, base.width, base.height)?,
            w: base.width,
            h: base.height,
        };
        self.base_paint = Some((Arc::clone(base), paint.clone()));
        Ok(paint)
    }

    fn token_paint_for(&mut self, path: &str) -> Option<ImagePaint> {
        if path.trim().is_empty() {
            return None;
        }
        if let Some(slot) = self.token_paints.get(path) {
            return slot.clone();
        }
        let paint = self
            .assets
            .image(path)
            .and_then(|img| {
                Ok(ImagePaint {
                    paint: image_paint(&img.rgba8_premul, img.width, img.height)?,
                    w: img.width,
                    h: img.height,
                })
            })
            .ok();
        self.token_paints.insert(path.to_string(), paint.clone());
        paint
    }

    fn layout_for(
        &mut self,
        text: &str,
        size: f64,
        color: Color,
    ) -> Option<(Arc<parley::Layout<TextBrushRgba8>>, vello_cpu::peniko::FontData)> {
        let Some((bytes, font)) = self.font.clone() else {
            if !self.reported_no_font {
                tracing::debug!("no label font configured; skipping text");
                self.reported_no_font = true;
            }
            return None;
        };
        if text.trim().is_empty() {
            return None;
        }
        let key = TextKey {
            text: text.to_string(),
            size_bits: (size as f32).to_bits(),
            color,
        };
        if let Some(layout) = self.layouts.get(&key) {
            return Some((Arc::clone(layout), font));
        }
        let brush = TextBrushRgba8 {
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
        };
        match self
            .text_engine
            .layout_plain(text, &bytes, size as f32, brush)
        {
            Ok(layout) => {
                if self.layouts.len() >= TEXT_CACHE_LIMIT {
                    self.layouts.clear();
                }
                let layout = Arc::new(layout);
                self.layouts.insert(key, Arc::clone(&layout));
                Some((layout, font))
            }
            Err(e) => {
                tracing::warn!(error = %e, "text layout failed");
                None
            }
        }
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        transform: Affine,
        text: &str,
        size: f64,
        color: Color,
    ) {
        let Some((layout, font)) = self.layout_for(text, size, color) else {
            return;
        };
        ctx.set_transform(affine_to_cpu(transform));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    fn draw_item(&mut self, ctx: &mut vello_cpu::RenderContext, world: Affine, item: &SceneItem) {
        let pos = item.position();
        match &item.kind {
            ItemKind::Token(t) => self.draw_token(ctx, world, pos, t),
            ItemKind::Rectangle(s) => {
                let r = Rect::from_origin_size(pos, (s.width, s.height));
                draw_shape(ctx, world, &r.to_path(0.1), s);
            }
            ItemKind::Oval(s) => {
                let r = Rect::from_origin_size(pos, (s.width, s.height));
                draw_shape(ctx, world, &Ellipse::from_rect(r).to_path(0.1), s);
            }
            ItemKind::FreehandStroke(s) => draw_stroke(ctx, world, pos, s),
            ItemKind::TextAnnotation(t) => self.draw_annotation(ctx, world, pos, t),
            ItemKind::Marker(_) => {}
        }
    }

    fn draw_token(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: Affine,
        pos: Point,
        t: &Token,
    ) {
        let r = Rect::from_origin_size(pos, (t.size, t.size));
        match self.token_paint_for(&t.image_path) {
            Some(img) => {
                let fit = Affine::translate(pos.to_vec2())
                    * Affine::scale_non_uniform(
                        t.size / f64::from(img.w.max(1)),
                        t.size / f64::from(img.h.max(1)),
                    );
                ctx.set_transform(affine_to_cpu(world * fit));
                ctx.set_paint(img.paint);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(img.w),
                    f64::from(img.h),
                ));
            }
            None => {
                ctx.set_transform(affine_to_cpu(world));
                ctx.set_paint(color_paint(PLACEHOLDER_FILL));
                ctx.fill_rect(&rect_to_cpu(r));
            }
        }

        ctx.set_transform(affine_to_cpu(world));
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(TOKEN_BORDER_WIDTH));
        ctx.set_paint(color_paint(t.border_color));
        ctx.stroke_rect(&rect_to_cpu(r));

        // hp badge, top-right corner
        if t.max_hp > 0 {
            let ratio = (f64::from(t.hp) / f64::from(t.max_hp)).clamp(0.0, 1.0);
            let badge_w = (t.size * 0.4).max(8.0);
            let badge = Rect::new(r.x1 - badge_w, r.y0 - 10.0, r.x1, r.y0);
            ctx.set_paint(color_paint(Color::rgba(0, 0, 0, 180)));
            ctx.fill_rect(&rect_to_cpu(badge));
            ctx.set_paint(color_paint(hp_color(ratio)));
            ctx.fill_rect(&rect_to_cpu(Rect::new(
                badge.x0,
                badge.y0,
                badge.x0 + badge.width() * ratio,
                badge.y1,
            )));
        }

        let label = Affine::translate((pos.x, pos.y + t.size + 2.0));
        self.draw_text(ctx, world * label, &t.entity_id, LABEL_SIZE, Color::WHITE);
    }

    fn draw_annotation(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: Affine,
        pos: Point,
        t: &TextAnnotation,
    ) {
        let at = world * Affine::translate(pos.to_vec2());
        self.draw_text(ctx, at, &t.text, t.size, t.color);
    }

    fn draw_marker(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: Affine,
        pos: Point,
        m: &Marker,
    ) {
        let r = Rect::from_origin_size(pos, (m.entry_width, MARKER_HEIGHT));
        ctx.set_transform(affine_to_cpu(world));
        ctx.set_paint(color_paint(Color::rgba(250, 250, 240, 230)));
        ctx.fill_rect(&rect_to_cpu(r));
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(SHAPE_BORDER_WIDTH));
        ctx.set_paint(color_paint(m.border_color));
        ctx.stroke_rect(&rect_to_cpu(r));
        let text_at = world * Affine::translate((pos.x + 6.0, pos.y + 4.0));
        self.draw_text(ctx, text_at, &m.text, MARKER_TEXT_SIZE, Color::BLACK);
    }

    fn draw_decorations(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: Affine,
        d: &Decorations,
    ) {
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(2.0));
        ctx.set_paint(color_paint(SELECTION_COLOR));
        for r in &d.selected {
            ctx.stroke_rect(&rect_to_cpu(world.transform_rect_bbox(*r).inflate(2.0, 2.0)));
        }

        if let Some(r) = d.handles {
            let screen = world.transform_rect_bbox(r);
            let half = d.handle_size.max(1.0) / 2.0;
            for h in Handle::ALL {
                let c = h.anchor(screen);
                let sq = Rect::new(c.x - half, c.y - half, c.x + half, c.y + half);
                ctx.set_paint(color_paint(Color::WHITE));
                ctx.fill_rect(&rect_to_cpu(sq));
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
                ctx.set_paint(color_paint(Color::BLACK));
                ctx.stroke_rect(&rect_to_cpu(sq));
            }
        }

        if let Some(r) = d.marquee {
            let screen = world.transform_rect_bbox(r);
            ctx.set_paint(color_paint(MARQUEE_FILL));
            ctx.fill_rect(&rect_to_cpu(screen));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
            ctx.set_paint(color_paint(SELECTION_COLOR));
            ctx.stroke_rect(&rect_to_cpu(screen));
        }

        if let Some(r) = d.fog_rect_preview {
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(2.0));
            ctx.set_paint(color_paint(FOG_PREVIEW_COLOR));
            ctx.stroke_rect(&rect_to_cpu(world.transform_rect_bbox(r)));
        }

        if d.stroke_preview.len() >= 2 {
            let mut path = BezPath::new();
            path.move_to(world * d.stroke_preview[0]);
            for p in &d.stroke_preview[1..] {
                path.line_to(world * *p);
            }
            ctx.set_stroke(round_stroke(2.0));
            ctx.set_paint(color_paint(SELECTION_COLOR));
            ctx.stroke_path(&bezpath_to_cpu(&path));
        }

        for card in &d.popups {
            self.draw_popup(ctx, world, card);
        }
    }

    fn draw_popup(&mut self, ctx: &mut vello_cpu::RenderContext, world: Affine, card: &PopupCard) {
        let at = world * card.anchor;
        let (tw, th) = estimate_text_extent(&card.text, card.font_size);
        let r = Rect::new(at.x, at.y, at.x + tw + 16.0, at.y + th + 12.0);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color_paint(POPUP_FILL));
        ctx.fill_rect(&rect_to_cpu(r));
        let text_at = Affine::translate((at.x + 8.0, at.y + 6.0));
        self.draw_text(ctx, text_at, &card.text, card.font_size, Color::WHITE);
    }
}

fn draw_shape(
    ctx: &mut vello_cpu::RenderContext,
    world: Affine,
    path: &BezPath,
    shape: &ShapeItem,
) {
    let cpu_path = bezpath_to_cpu(path);
    ctx.set_transform(affine_to_cpu(world));
    if let Some(fill) = shape.fill() {
        ctx.set_paint(color_paint(fill));
        ctx.fill_path(&cpu_path);
    }
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(SHAPE_BORDER_WIDTH));
    ctx.set_paint(color_paint(shape.border_color));
    ctx.stroke_path(&cpu_path);
}

fn draw_stroke(
    ctx: &mut vello_cpu::RenderContext,
    world: Affine,
    pos: Point,
    s: &FreehandStroke,
) {
    let Some((first, rest)) = s.points.split_first() else {
        return;
    };
    let mut path = BezPath::new();
    path.move_to(pos + *first);
    if rest.is_empty() {
        path.line_to(pos + *first);
    }
    for off in rest {
        path.line_to(pos + *off);
    }
    ctx.set_transform(affine_to_cpu(world));
    ctx.set_stroke(round_stroke(s.width.max(0.5)));
    ctx.set_paint(color_paint(s.color));
    ctx.stroke_path(&bezpath_to_cpu(&path));
}

fn round_stroke(width: f64) -> vello_cpu::kurbo::Stroke {
    vello_cpu::kurbo::Stroke::new(width)
        .with_caps(vello_cpu::kurbo::Cap::Round)
        .with_join(vello_cpu::kurbo::Join::Round)
}

fn hp_color(ratio: f64) -> Color {
    if ratio > 0.5 {
        Color::rgb(40, 180, 60)
    } else if ratio > 0.25 {
        Color::rgb(230, 180, 30)
    } else {
        Color::rgb(200, 40, 40)
    }
}

/// Darken `data` with the fog raster sampled through `viewport`; returns the screen fog plane.
///
/// Player surfaces see any fog at all as fully opaque.
pub(crate) fn apply_fog(
    data: &mut [u8],
    viewport: &Viewport,
    fog: &FogRaster,
    mode: RenderMode,
) -> Vec<u8> {
    let width = viewport.width() as usize;
    let height = viewport.height() as usize;
    let mut plane = vec![0u8; width * height];
    let zoom = viewport.zoom();
    let pan = viewport.pan();
    let (fw, fh) = (fog.width() as usize, fog.height() as usize);
    let alpha = fog.alpha();

    data.par_chunks_mut(width * 4)
        .zip(plane.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (row, fog_row))| {
            let wy = ((y as f64 + 0.5) - pan.y) / zoom;
            if wy < 0.0 || wy >= fh as f64 {
                return;
            }
            let src = &alpha[(wy as usize) * fw..(wy as usize + 1) * fw];
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let wx = ((x as f64 + 0.5) - pan.x) / zoom;
                if wx < 0.0 || wx >= fw as f64 {
                    continue;
                }
                let mut a = src[wx as usize];
                if mode == RenderMode::Player && a > 0 {
                    a = 255;
                }
                fog_row[x] = a;
                fog_over_px(px, a);
            }
        });
    plane
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
