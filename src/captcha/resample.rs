//! Area-averaging downsampler.
//!
//! Every destination pixel is the coverage-weighted mean of the source pixels
//! its footprint overlaps. Color is weighted by alpha so fully transparent
//! regions stay fully transparent and do not darken glyph edges.

use crate::captcha::canvas::Canvas;
use crate::config::Result;
use tracing::debug;

/// Source indices and overlap weights contributing to one destination index.
type Span = Vec<(u32, f64)>;

fn spans(src: u32, dst: u32) -> Vec<Span> {
    let ratio = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|d| {
            let start = f64::from(d) * ratio;
            let end = (f64::from(d) + 1.0) * ratio;
            let first = f64_to_u32(start.floor());
            let last = f64_to_u32(end.ceil()).min(src);
            (first..last)
                .filter_map(|s| {
                    let lo = start.max(f64::from(s));
                    let hi = end.min(f64::from(s) + 1.0);
                    (hi > lo).then_some((s, hi - lo))
                })
                .collect()
        })
        .collect()
}

/// Copies `source` into a new `width`x`height` canvas and releases `source`.
///
/// # Errors
///
/// Returns `Allocation` if the destination canvas cannot be created.
pub fn resample(source: Canvas, width: u32, height: u32) -> Result<Canvas> {
    let mut target = Canvas::allocate(width, height, source.is_transparent())?;
    let (src_w, src_h) = source.dimensions();
    let x_spans = spans(src_w, width);
    let y_spans = spans(src_h, height);
    let src = source.image();

    for (y, y_span) in (0..height).zip(&y_spans) {
        for (x, x_span) in (0..width).zip(&x_spans) {
            let mut weight = 0.0;
            let mut alpha = 0.0;
            let mut color = [0.0_f64; 3];
            let mut plain = [0.0_f64; 3];

            for &(sy, wy) in y_span {
                for &(sx, wx) in x_span {
                    let w = wx * wy;
                    let p = src.get_pixel(sx, sy);
                    let a = f64::from(p[3]) / 255.0;
                    weight += w;
                    alpha += w * a;
                    for c in 0..3 {
                        color[c] += w * a * f64::from(p[c]);
                        plain[c] += w * f64::from(p[c]);
                    }
                }
            }

            if weight <= 0.0 {
                continue;
            }
            let pixel = target.image_mut().get_pixel_mut(x, y);
            for c in 0..3 {
                let value = if alpha > 0.0 {
                    color[c] / alpha
                } else {
                    plain[c] / weight
                };
                pixel[c] = f64_to_channel(value);
            }
            pixel[3] = f64_to_channel(alpha / weight * 255.0);
        }
    }

    debug!(
        from_w = src_w,
        from_h = src_h,
        to_w = width,
        to_h = height,
        "Image resampled"
    );
    drop(source);
    Ok(target)
}

#[inline]
fn f64_to_u32(val: f64) -> u32 {
    let clamped = val.clamp(0.0, f64::from(u32::MAX));
    // Clamped to the u32 range above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = clamped as u32;
    out
}

#[inline]
fn f64_to_channel(val: f64) -> u8 {
    let clamped = val.round().clamp(0.0, 255.0);
    // Clamped to the u8 range above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = clamped as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::canvas::OVERSIZE_FACTOR;
    use image::Rgba;

    #[test]
    fn test_output_size_matches_request() {
        for (w, h) in [(250, 60), (7, 3), (1, 1), (100, 37)] {
            let mut src =
                Canvas::allocate(w * OVERSIZE_FACTOR, h * OVERSIZE_FACTOR, false).unwrap();
            src.fill(Rgba([9, 9, 9, 255]));
            let out = resample(src, w, h).unwrap();
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn test_non_integer_ratio() {
        let mut src = Canvas::allocate(10, 10, false).unwrap();
        src.fill(Rgba([40, 80, 120, 255]));
        let out = resample(src, 3, 4).unwrap();
        assert_eq!(out.dimensions(), (3, 4));
        assert!(out.image().pixels().all(|p| *p == Rgba([40, 80, 120, 255])));
    }

    #[test]
    fn test_area_average() {
        let mut src = Canvas::allocate(3, 3, false).unwrap();
        src.fill(Rgba([0, 0, 0, 255]));
        for x in 0..3 {
            src.image_mut().put_pixel(x, 0, Rgba([255, 255, 255, 255]));
        }
        let out = resample(src, 1, 1).unwrap();
        assert_eq!(*out.image().get_pixel(0, 0), Rgba([85, 85, 85, 255]));
    }

    #[test]
    fn test_transparency_preserved() {
        let mut src = Canvas::allocate(6, 3, true).unwrap();
        for y in 0..3 {
            for x in 0..3 {
                src.image_mut().put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
        }
        let out = resample(src, 2, 1).unwrap();
        assert!(out.is_transparent());
        assert_eq!(*out.image().get_pixel(0, 0), Rgba([200, 0, 0, 255]));
        assert_eq!(out.image().get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn test_half_covered_edge_keeps_color() {
        let mut src = Canvas::allocate(2, 1, true).unwrap();
        src.image_mut().put_pixel(0, 0, Rgba([0, 0, 255, 255]));
        let out = resample(src, 1, 1).unwrap();
        let p = out.image().get_pixel(0, 0);
        assert_eq!(p[2], 255);
        assert!((127..=128).contains(&p[3]));
    }
}
