//! Final serialization to PNG or JPEG.

use crate::captcha::canvas::Canvas;
use crate::config::{CaptchaError, OutputFormat, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::{debug, warn};

pub const JPEG_QUALITY: u8 = 90;

/// Encoded bytes plus the format actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

impl EncodedImage {
    /// MIME type matching `format`.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self.format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Encodes `canvas` in the requested format.
///
/// A PNG failure falls back to JPEG once; a JPEG failure is fatal.
///
/// # Errors
///
/// Returns `Encoding` when no format could be produced.
pub fn encode(canvas: &Canvas, format: OutputFormat) -> Result<EncodedImage> {
    if format == OutputFormat::Png {
        match to_png(canvas) {
            Ok(bytes) => {
                debug!(len = bytes.len(), "Display image as PNG");
                return Ok(EncodedImage {
                    bytes,
                    format: OutputFormat::Png,
                });
            }
            Err(e) => warn!(error = %e, "PNG encoding failed, falling back to JPEG"),
        }
    }

    let bytes = to_jpeg(canvas)?;
    debug!(len = bytes.len(), "Display image as JPEG");
    Ok(EncodedImage {
        bytes,
        format: OutputFormat::Jpeg,
    })
}

fn to_png(canvas: &Canvas) -> Result<Vec<u8>> {
    let image = if canvas.is_transparent() {
        DynamicImage::ImageRgba8(canvas.image().clone())
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas.image().clone()).to_rgb8())
    };

    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| CaptchaError::Encoding(format!("PNG encoding failed: {e}")))?;
    Ok(buffer)
}

fn to_jpeg(canvas: &Canvas) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(canvas.image().clone()).to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| CaptchaError::Encoding(format!("JPEG encoding failed: {e}")))?;
    Ok(buffer)
}
