//! Test utilities and shared configuration.
//!
//! Rendering is exercised with solid block glyphs so tests need no font files.

use crate::captcha::{FontLoader, GlyphMask, GlyphSource};
use crate::config::{CaptchaConfig, FontDefinition, Result};
use image::{GrayImage, Luma};
use std::sync::Arc;

/// Paints every character as a filled box sitting on the baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockGlyphs;

impl GlyphSource for BlockGlyphs {
    fn rasterize(&self, ch: char, px_size: f32) -> Option<GlyphMask> {
        if ch.is_whitespace() {
            return None;
        }
        let width = block_edge(px_size * 0.6);
        let height = block_edge(px_size * 0.7);
        Some(GlyphMask {
            coverage: GrayImage::from_pixel(width, height, Luma([255])),
            left: 0,
            top: -i32::try_from(height).unwrap_or(i32::MAX),
            advance: px_size * 0.6,
        })
    }
}

/// Resolves every catalogue entry to [`BlockGlyphs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockFontLoader;

impl FontLoader for BlockFontLoader {
    fn load(&self, _font: &FontDefinition) -> Result<Arc<dyn GlyphSource>> {
        Ok(Arc::new(BlockGlyphs))
    }
}

/// 250x60 white PNG with a fixed six letter answer and one block font.
#[must_use]
pub fn test_config() -> CaptchaConfig {
    CaptchaConfig {
        min_length: 6,
        max_length: 6,
        fonts: vec![FontDefinition::new(0.5, 20, 24, "Block")],
        ..CaptchaConfig::default()
    }
}

fn block_edge(val: f32) -> u32 {
    // Glyph sizes stay far below u16::MAX.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let edge = val.round().clamp(1.0, f32::from(u16::MAX)) as u32;
    edge
}
