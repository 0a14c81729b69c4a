//! Glyph rendering onto the oversized canvas.

use crate::captcha::canvas::{Canvas, OVERSIZE_FACTOR};
use crate::captcha::font::{GlyphMask, GlyphSource};
use crate::config::FontDefinition;
use image::{GrayImage, Luma, Rgb};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::Rng;
use tracing::trace;

/// Font size boost per character an answer falls short of `max_length`, in percent.
pub const FONT_FACTOR: f32 = 9.0;

/// Pen start, in display pixels from the left edge.
const LEFT_MARGIN: f32 = 20.0;

/// Catalogue sizes are points; glyphs are rasterised at 96 dpi.
const PT_TO_PX: f32 = 96.0 / 72.0;

/// Oversize factor as a float.
const FACTOR: f32 = OVERSIZE_FACTOR as f32;

/// Draws an answer left to right with one font and per-letter jitter.
pub struct GlyphRenderer<'a> {
    glyphs: &'a dyn GlyphSource,
    font: &'a FontDefinition,
    color: Rgb<u8>,
    max_rotation: i32,
    max_length: usize,
}

impl<'a> GlyphRenderer<'a> {
    #[must_use]
    pub fn new(
        glyphs: &'a dyn GlyphSource,
        font: &'a FontDefinition,
        color: Rgb<u8>,
        max_rotation: i32,
        max_length: usize,
    ) -> Self {
        Self {
            glyphs,
            font,
            color,
            max_rotation,
            max_length,
        }
    }

    /// Scale applied to every glyph so short answers fill the same width.
    #[must_use]
    pub fn size_factor(&self, answer_len: usize) -> f32 {
        let missing = self.max_length.saturating_sub(answer_len);
        let missing = f32::from(u16::try_from(missing).unwrap_or(u16::MAX));
        1.0 + missing * (FONT_FACTOR / 100.0)
    }

    /// Draws `text` onto `canvas` and returns the final pen position.
    ///
    /// `display_height` is the unscaled CAPTCHA height; the baseline sits at
    /// 27/40 of it.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        canvas: &mut Canvas,
        text: &str,
        display_height: u32,
        rng: &mut R,
    ) -> f32 {
        let size_factor = self.size_factor(text.chars().count());
        let baseline = f64_to_i64(
            (f64::from(display_height) * 27.0 / 40.0 * f64::from(OVERSIZE_FACTOR)).round(),
        );
        let mut pen_x = LEFT_MARGIN * FACTOR;

        for ch in text.chars() {
            let angle = rng.random_range(-self.max_rotation..=self.max_rotation);
            let points = rng.random_range(self.font.min_size..=self.font.max_size);
            let points = f32::from(u16::try_from(points).unwrap_or(u16::MAX));
            let px_size = points * FACTOR * size_factor * PT_TO_PX;

            trace!(letter = %ch, x = pen_x, y = baseline, px_size, angle, "Drawing letter");

            let right_edge = match self.glyphs.rasterize(ch, px_size) {
                Some(mask) => {
                    let theta = f32::from(i16::try_from(angle).unwrap_or(0)).to_radians();
                    draw_rotated(canvas, &mask, (pen_x, baseline), theta, self.color);
                    pen_x + rotated_right(&mask, theta)
                }
                None => pen_x,
            };
            pen_x = self.font.letter_spacing.mul_add(FACTOR, right_edge);
        }
        pen_x
    }
}

/// X of the ink box's lower-right corner after a counter-clockwise turn by `theta`.
fn rotated_right(mask: &GlyphMask, theta: f32) -> f32 {
    let dx = mask.right();
    let dy = mask.bottom().max(0.0);
    dx.mul_add(theta.cos(), dy * theta.sin())
}

/// Blends `mask` rotated counter-clockwise by `theta` about the pen origin.
fn draw_rotated(
    canvas: &mut Canvas,
    mask: &GlyphMask,
    origin: (f32, i64),
    theta: f32,
    color: Rgb<u8>,
) {
    let (w, h) = mask.coverage.dimensions();
    let left = i64::from(mask.left);
    let top = i64::from(mask.top);
    let reach = [
        (left, top),
        (left + i64::from(w), top),
        (left, top + i64::from(h)),
        (left + i64::from(w), top + i64::from(h)),
    ]
    .iter()
    .map(|&(x, y)| x.abs().max(y.abs()))
    .max()
    .unwrap_or(0);
    // Covers the whole mask at any angle: the diagonal is at most sqrt(2) * reach.
    let radius = reach + reach / 2 + 1;
    let Ok(side) = u32::try_from(2 * radius + 1) else {
        return;
    };

    let mut scratch = GrayImage::new(side, side);
    for (mx, my, pixel) in mask.coverage.enumerate_pixels() {
        let sx = radius + left + i64::from(mx);
        let sy = radius + top + i64::from(my);
        if let (Ok(sx), Ok(sy)) = (u32::try_from(sx), u32::try_from(sy))
            && sx < side
            && sy < side
        {
            scratch.put_pixel(sx, sy, *pixel);
        }
    }

    // imageproc turns clockwise; GD-style angles turn counter-clockwise.
    let rotated = if theta.abs() < f32::EPSILON {
        scratch
    } else {
        rotate_about_center(&scratch, -theta, Interpolation::Bilinear, Luma([0]))
    };

    let origin_x = f64_to_i64(f64::from(origin.0).round());
    for (sx, sy, Luma([coverage])) in rotated.enumerate_pixels() {
        if *coverage > 0 {
            canvas.blend(
                origin_x - radius + i64::from(sx),
                origin.1 - radius + i64::from(sy),
                color,
                *coverage,
            );
        }
    }
}

#[inline]
fn f64_to_i64(val: f64) -> i64 {
    let clamped = val.clamp(f64::from(i32::MIN), f64::from(i32::MAX));
    // Clamped to the i32 range above.
    #[allow(clippy::cast_possible_truncation)]
    let out = clamped as i64;
    out
}
