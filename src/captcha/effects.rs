//! Optional raster post-effects: blur, emboss, pixelate.

use crate::captcha::canvas::{Canvas, OVERSIZE_FACTOR, to_channel};
use crate::config::Effects;
use image::{Rgba, RgbaImage};
use imageproc::filter::{filter3x3, gaussian_blur_f32};
use tracing::debug;

const BLUR_SIGMA: f32 = 1.0;

/// Relief kernel: the top-left neighbour minus the bottom-right one.
const EMBOSS_KERNEL: [[f32; 3]; 3] = [[1.5, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, -1.5]];
const EMBOSS_OFFSET: f32 = 127.0;

/// Applies the enabled effects in the fixed order blur, emboss, pixelate.
/// With every toggle off the canvas is left untouched.
pub fn apply_effects(canvas: &mut Canvas, effects: Effects, pixelate_block: u32) {
    if effects.blur {
        debug!(sigma = BLUR_SIGMA, "Blur effect added");
        let blurred = gaussian_blur_f32(canvas.image(), BLUR_SIGMA);
        *canvas.image_mut() = blurred;
    }
    if effects.emboss {
        debug!("Emboss effect added");
        let embossed = emboss(canvas.image());
        *canvas.image_mut() = embossed;
    }
    if effects.pixelate {
        let block = pixelate_block.max(1).saturating_mul(OVERSIZE_FACTOR);
        debug!(block, "Pixelate effect added");
        pixelate(canvas.image_mut(), block);
    }
}

/// 3x3 emboss with clamped edges; alpha is carried over unchanged.
fn emboss(src: &RgbaImage) -> RgbaImage {
    let relief = filter3x3::<_, f32, f32>(src, EMBOSS_KERNEL.as_flattened());
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let r = relief.get_pixel(x, y);
        Rgba([
            to_channel(r[0] + EMBOSS_OFFSET),
            to_channel(r[1] + EMBOSS_OFFSET),
            to_channel(r[2] + EMBOSS_OFFSET),
            src.get_pixel(x, y)[3],
        ])
    })
}

/// Replaces each `block`x`block` tile with its average color.
fn pixelate(image: &mut RgbaImage, block: u32) {
    let (width, height) = image.dimensions();
    for by in (0..height).step_by(block as usize) {
        for bx in (0..width).step_by(block as usize) {
            let x_end = bx.saturating_add(block).min(width);
            let y_end = by.saturating_add(block).min(height);

            let mut sum = [0u64; 4];
            let mut count = 0u64;
            for y in by..y_end {
                for x in bx..x_end {
                    let p = image.get_pixel(x, y);
                    for c in 0..4 {
                        sum[c] += u64::from(p[c]);
                    }
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }
            let avg = sum.map(|s| u8::try_from(s / count).unwrap_or(u8::MAX));
            for y in by..y_end {
                for x in bx..x_end {
                    image.put_pixel(x, y, Rgba(avg));
                }
            }
        }
    }
}
