//! Owned raster buffer passed through the pipeline.

use crate::config::{CaptchaError, Result};
use image::{Rgb, Rgba, RgbaImage};

/// Rendering and distortion happen at this multiple of the display size.
pub const OVERSIZE_FACTOR: u32 = 3;

/// Exclusively owned RGBA raster.
///
/// The alpha channel is only meaningful when `transparent` is set; opaque
/// canvases keep every pixel at alpha 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    image: RgbaImage,
    transparent: bool,
}

impl Canvas {
    /// Allocates a zeroed canvas.
    ///
    /// # Errors
    ///
    /// Returns `Allocation` if a side is zero, the byte size overflows, or
    /// the allocator refuses the request.
    pub fn allocate(width: u32, height: u32, transparent: bool) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CaptchaError::Allocation(format!(
                "cannot allocate a {width}x{height} canvas"
            )));
        }
        let len = usize::try_from(width)
            .ok()
            .and_then(|w| w.checked_mul(usize::try_from(height).ok()?))
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| {
                CaptchaError::Allocation(format!("{width}x{height} canvas is too large"))
            })?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|e| CaptchaError::Allocation(format!("{width}x{height}: {e}")))?;
        buf.resize(len, 0);

        let image = RgbaImage::from_raw(width, height, buf).ok_or_else(|| {
            CaptchaError::Allocation(format!("{width}x{height} buffer size mismatch"))
        })?;
        Ok(Self { image, transparent })
    }

    /// Wraps an existing image.
    #[must_use]
    pub const fn from_image(image: RgbaImage, transparent: bool) -> Self {
        Self { image, transparent }
    }

    /// Paints every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub const fn is_transparent(&self) -> bool {
        self.transparent
    }

    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub const fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Composites `color` at `coverage` (0-255) over the pixel at `(x, y)`.
    /// Out-of-bounds coordinates are ignored.
    pub fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, coverage: u8) {
        if coverage == 0 {
            return;
        }
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x >= self.image.width() || y >= self.image.height() {
            return;
        }

        let dst = self.image.get_pixel_mut(x, y);
        let src_a = f32::from(coverage) / 255.0;
        let dst_a = f32::from(dst[3]) / 255.0;
        let out_a = dst_a.mul_add(1.0 - src_a, src_a);
        if out_a <= 0.0 {
            return;
        }
        for c in 0..3 {
            let mixed = f32::from(color[c])
                .mul_add(src_a, f32::from(dst[c]) * dst_a * (1.0 - src_a))
                / out_a;
            dst[c] = to_channel(mixed);
        }
        dst[3] = to_channel(out_a * 255.0);
    }
}

#[inline]
pub(crate) fn to_channel(val: f32) -> u8 {
    let clamped = val.round().clamp(0.0, 255.0);
    // Clamped to the u8 range above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = clamped as u8;
    out
}
