use std::sync::Arc;

use kurbo::{Affine, BezPath, PathEl};

use crate::foundation::core::Color;
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::foundation::math::mul_div255_u8;

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn rect_to_cpu(r: kurbo::Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

pub(crate) fn color_paint(c: Color) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

pub(crate) fn frame_dim(v: u32, what: &str) -> FogmapResult<u16> {
    u16::try_from(v)
        .ok()
        .filter(|&d| d > 0)
        .ok_or_else(|| FogmapError::validation(format!("{what} must be in 1..=65535, got {v}")))
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> FogmapResult<vello_cpu::Pixmap> {
    let w = frame_dim(width, "pixmap width")?;
    let h = frame_dim(height, "pixmap height")?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(FogmapError::validation("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

pub(crate) fn image_paint(bytes_premul: &[u8], width: u32, height: u32) -> FogmapResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Source-over of two equally sized premultiplied buffers.
pub(crate) fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> FogmapResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FogmapError::validation(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - sa;
        d[3] = s[3].saturating_add(mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            d[c] = s[c].saturating_add(mul_div255_u8(u16::from(d[c]), inv));
        }
    }
    Ok(())
}

/// Darken one premultiplied pixel with black fog of alpha `a`.
#[inline]
pub(crate) fn fog_over_px(px: &mut [u8], a: u8) {
    if a == 0 {
        return;
    }
    let inv = 255u16 - u16::from(a);
    px[0] = mul_div255_u8(u16::from(px[0]), inv);
    px[1] = mul_div255_u8(u16::from(px[1]), inv);
    px[2] = mul_div255_u8(u16::from(px[2]), inv);
    px[3] = a.saturating_add(mul_div255_u8(u16::from(px[3]), inv));
}

#[cfg(test)]
#[path = "../../tests/unit/render/paint.rs"]
mod tests;
