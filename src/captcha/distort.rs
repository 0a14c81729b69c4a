//! Sinusoidal pixel-shear distortion.
//!
//! Two sweeps over the same canvas: the horizontal pass moves each column one
//! step left with a vertical sine offset, the vertical pass moves each row one
//! step up with a horizontal sine offset. Each sweep runs in increasing index
//! order and reads pixels the previous step may already have written.

use crate::captcha::canvas::{Canvas, OVERSIZE_FACTOR};
use rand::Rng;

/// Random draws for one distortion run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    /// Phase of the horizontal pass, in `[0, 100]`.
    pub phase_x: u32,
    /// Phase of the vertical pass, in `[0, 100]`.
    pub phase_y: u32,
    /// Oversized horizontal period.
    pub period_x: u32,
    /// Oversized vertical period.
    pub period_y: u32,
    /// Oversized horizontal-pass amplitude.
    pub amplitude_x: u32,
    /// Oversized vertical-pass amplitude.
    pub amplitude_y: u32,
}

impl WaveParams {
    /// Draws periods and phases for the configured base period and amplitude.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, period: (u32, u32), amplitude: (u32, u32)) -> Self {
        let period_x = period
            .0
            .saturating_mul(rng.random_range(1..=3))
            .saturating_mul(OVERSIZE_FACTOR);
        let period_y = period
            .1
            .saturating_mul(rng.random_range(1..=2))
            .saturating_mul(OVERSIZE_FACTOR);
        let phase_x = rng.random_range(0..=100);
        let phase_y = rng.random_range(0..=100);
        Self {
            phase_x,
            phase_y,
            period_x,
            period_y,
            amplitude_x: amplitude.0.saturating_mul(OVERSIZE_FACTOR),
            amplitude_y: amplitude.1.saturating_mul(OVERSIZE_FACTOR),
        }
    }
}

/// Offset of strip `i` for a wave with the given phase, period and amplitude.
#[must_use]
pub fn wave_offset(i: u32, phase: u32, period: u32, amplitude: u32) -> i64 {
    let angle = f64::from(phase) + f64::from(i) / f64::from(period.max(1));
    let offset = (f64::from(amplitude) * angle.sin()).round();
    // |offset| <= amplitude, which fits in i64.
    #[allow(clippy::cast_possible_truncation)]
    let out = offset as i64;
    out
}

/// Applies both passes in place.
pub fn distort(canvas: &mut Canvas, params: &WaveParams) {
    shear_columns(canvas, params);
    shear_rows(canvas, params);
}

fn shear_columns(canvas: &mut Canvas, params: &WaveParams) {
    let (width, height) = canvas.dimensions();
    let image = canvas.image_mut();
    for i in 1..width {
        let offset = wave_offset(i, params.phase_x, params.period_x, params.amplitude_x);
        for y in 0..height {
            let Ok(dy) = u32::try_from(i64::from(y) + offset) else {
                continue;
            };
            if dy >= height {
                continue;
            }
            let pixel = *image.get_pixel(i, y);
            image.put_pixel(i - 1, dy, pixel);
        }
    }
}

fn shear_rows(canvas: &mut Canvas, params: &WaveParams) {
    let (width, height) = canvas.dimensions();
    let image = canvas.image_mut();
    for i in 1..height {
        let offset = wave_offset(i, params.phase_y, params.period_y, params.amplitude_y);
        for x in 0..width {
            let Ok(dx) = u32::try_from(i64::from(x) + offset) else {
                continue;
            };
            if dx >= width {
                continue;
            }
            let pixel = *image.get_pixel(x, i);
            image.put_pixel(dx, i - 1, pixel);
        }
    }
}
