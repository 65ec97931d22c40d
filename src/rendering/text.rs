//! Single-line text layout and glyph rasterization.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use super::{TextAlign, TextBaseline};

/// Scale for a CSS pixel size (pixels per em).
pub fn px_scale(font: &FontArc, size_px: f32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(size_px * font.height_unscaled() / units_per_em)
}

/// Advance width of `text` in pixels, including kerning.
pub fn measure(font: &FontArc, size_px: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(px_scale(font, size_px));
    let mut width = 0.0;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Horizontal start and baseline for text anchored at (`x`, `y`).
pub fn anchor(
    font: &FontArc,
    size_px: f32,
    text: &str,
    x: f32,
    y: f32,
    align: TextAlign,
    baseline: TextBaseline,
) -> (f32, f32) {
    let scaled = font.as_scaled(px_scale(font, size_px));
    let (ascent, descent) = (scaled.ascent(), scaled.descent());

    let start_x = match align {
        TextAlign::Start | TextAlign::Left => x,
        TextAlign::Center => x - measure(font, size_px, text) / 2.0,
        TextAlign::End | TextAlign::Right => x - measure(font, size_px, text),
    };
    // descent is negative
    let baseline_y = match baseline {
        TextBaseline::Alphabetic => y,
        TextBaseline::Top => y + ascent,
        TextBaseline::Middle => y + (ascent + descent) / 2.0,
        TextBaseline::Bottom => y + descent,
    };
    (start_x, baseline_y)
}

/// Draw `text` onto `target` with source-over blending. Pixels outside the
/// target are clipped.
#[allow(clippy::too_many_arguments)]
pub fn draw_text(
    target: &mut RgbaImage,
    font: &FontArc,
    size_px: f32,
    text: &str,
    x: f32,
    y: f32,
    align: TextAlign,
    baseline: TextBaseline,
    color: Rgba<u8>,
) {
    let scale = px_scale(font, size_px);
    let scaled = font.as_scaled(scale);
    let (mut caret, baseline_y) = anchor(font, size_px, text, x, y, align, baseline);

    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline_y));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + i64::from(gx);
            let py = bounds.min.y as i64 + i64::from(gy);
            blend_pixel(target, px, py, color, coverage);
        });
    }
}

/// Source-over blend of `color` at `coverage` onto one pixel.
pub fn blend_pixel(target: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= i64::from(target.width()) || y >= i64::from(target.height()) {
        return;
    }
    let src_a = coverage.clamp(0.0, 1.0) * f32::from(color.0[3]) / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst = target.get_pixel_mut(x as u32, y as u32);
    let dst_a = f32::from(dst.0[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let s = f32::from(color.0[c]);
        let d = f32::from(dst.0[c]);
        dst.0[c] = ((s * src_a + d * dst_a * (1.0 - src_a)) / out_a).round() as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}
