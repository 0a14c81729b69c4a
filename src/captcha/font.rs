//! Font resources.
//!
//! A `FontLoader` turns a catalogue entry into a `GlyphSource`, which
//! rasterises single characters into coverage masks. `FontDirectory` is the
//! file-backed loader used by the service.

use crate::captcha::canvas::to_channel;
use crate::config::{CaptchaError, FontDefinition, Result};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Coverage of one rasterised glyph.
///
/// `left` and `top` locate the mask's top-left pixel relative to the pen
/// origin on the baseline; `top` is negative for ink above the baseline.
#[derive(Debug, Clone)]
pub struct GlyphMask {
    pub coverage: GrayImage,
    pub left: i32,
    pub top: i32,
    pub advance: f32,
}

impl GlyphMask {
    /// Right edge of the ink relative to the pen origin.
    #[must_use]
    pub fn right(&self) -> f32 {
        let width = f32::from(u16::try_from(self.coverage.width()).unwrap_or(u16::MAX));
        f32::from(i16::try_from(self.left).unwrap_or(0)) + width
    }

    /// Bottom edge of the ink relative to the baseline.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        let height = f32::from(u16::try_from(self.coverage.height()).unwrap_or(u16::MAX));
        f32::from(i16::try_from(self.top).unwrap_or(0)) + height
    }
}

/// Rasterises characters of one typeface.
pub trait GlyphSource: Send + Sync {
    /// Returns the mask for `ch` at `px_size`, or `None` when the face has
    /// no outline for it.
    fn rasterize(&self, ch: char, px_size: f32) -> Option<GlyphMask>;
}

/// Resolves catalogue entries to glyph sources.
pub trait FontLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns `FontLoad` when the resource is missing or corrupt.
    fn load(&self, font: &FontDefinition) -> Result<Arc<dyn GlyphSource>>;
}

/// TrueType/OpenType face parsed with `ab_glyph`.
pub struct TrueTypeFace {
    font: FontVec,
}

impl TrueTypeFace {
    /// Parses font bytes.
    ///
    /// # Errors
    ///
    /// Returns `FontLoad` if the data is not a usable font.
    pub fn from_bytes(resource: &str, data: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(data).map_err(|e| CaptchaError::FontLoad {
            resource: resource.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { font })
    }
}

impl GlyphSource for TrueTypeFace {
    fn rasterize(&self, ch: char, px_size: f32) -> Option<GlyphMask> {
        let scale = PxScale::from(px_size);
        let id = self.font.glyph_id(ch);
        let advance = self.font.as_scaled(scale).h_advance(id);
        let outlined = self
            .font
            .outline_glyph(id.with_scale_and_position(scale, point(0.0, 0.0)))?;

        let bounds = outlined.px_bounds();
        let width = f32_to_u32(bounds.width());
        let height = f32_to_u32(bounds.height());
        if width == 0 || height == 0 {
            return None;
        }

        let mut coverage = GrayImage::new(width, height);
        outlined.draw(|x, y, c| {
            if x < width && y < height {
                coverage.put_pixel(x, y, Luma([to_channel(c * 255.0)]));
            }
        });

        Some(GlyphMask {
            coverage,
            left: f32_to_i32(bounds.min.x),
            top: f32_to_i32(bounds.min.y),
            advance,
        })
    }
}

/// Loads fonts from files under a root directory, caching parsed faces.
pub struct FontDirectory {
    root: PathBuf,
    cache: papaya::HashMap<String, Arc<TrueTypeFace>>,
}

impl FontDirectory {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: papaya::HashMap::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FontLoader for FontDirectory {
    fn load(&self, font: &FontDefinition) -> Result<Arc<dyn GlyphSource>> {
        let cache = self.cache.pin();
        if let Some(face) = cache.get(&font.resource) {
            debug!(resource = %font.resource, "Font served from cache");
            return Ok(face.clone());
        }

        let path = self.root.join(&font.resource);
        let data = std::fs::read(&path).map_err(|e| CaptchaError::FontLoad {
            resource: font.resource.clone(),
            reason: format!("{}: {e}", path.display()),
        })?;
        let face = Arc::new(TrueTypeFace::from_bytes(&font.resource, data)?);
        info!(resource = %font.resource, path = %path.display(), "Font loaded");

        cache.insert(font.resource.clone(), face.clone());
        Ok(face)
    }
}

#[inline]
fn f32_to_i32(val: f32) -> i32 {
    let clamped = val.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX));
    // Clamped to the i16 range above.
    #[allow(clippy::cast_possible_truncation)]
    let out = clamped as i32;
    out
}

#[inline]
fn f32_to_u32(val: f32) -> u32 {
    let clamped = val.round().clamp(0.0, f32::from(u16::MAX));
    // Clamped to the u16 range above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = clamped as u32;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file() {
        let loader = FontDirectory::new("/nonexistent/wavecaptcha-fonts");
        let def = FontDefinition::new(0.0, 10, 12, "Missing.ttf");
        let Err(err) = loader.load(&def) else {
            panic!("missing font must fail");
        };
        assert!(matches!(err, CaptchaError::FontLoad { ref resource, .. } if resource == "Missing.ttf"));
    }

    #[test]
    fn test_corrupt_font_file() {
        let dir = std::env::temp_dir().join("wavecaptcha_font_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Corrupt.ttf"), b"definitely not a font").unwrap();

        let loader = FontDirectory::new(&dir);
        let def = FontDefinition::new(0.0, 10, 12, "Corrupt.ttf");
        assert!(matches!(
            loader.load(&def),
            Err(CaptchaError::FontLoad { .. })
        ));
        let _ = std::fs::remove_file(dir.join("Corrupt.ttf"));
    }

    const FONT_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts");

    fn bundled_face() -> TrueTypeFace {
        let data = include_bytes!("../../assets/fonts/DejaVuSansMono-Bold.ttf");
        TrueTypeFace::from_bytes("DejaVuSansMono-Bold.ttf", data.to_vec()).unwrap()
    }

    #[test]
    fn test_rasterize_descender() {
        let mask = bundled_face().rasterize('g', 60.0).unwrap();

        assert!(mask.top < 0, "ink must rise above the baseline");
        assert!(mask.bottom() > 0.0, "'g' must descend below the baseline");
        assert!(mask.coverage.width() > 0 && mask.coverage.height() > 0);
        assert!(mask.advance > 0.0);
        assert!(mask.coverage.pixels().any(|p| p[0] >= 250));
    }

    #[test]
    fn test_rasterize_scales_with_size() {
        let face = bundled_face();
        let small = face.rasterize('W', 20.0).unwrap();
        let large = face.rasterize('W', 80.0).unwrap();

        assert!(large.coverage.height() > small.coverage.height() * 3);
        assert!(large.advance > small.advance * 3.0);
    }

    #[test]
    fn test_rasterize_blank_glyph() {
        assert!(bundled_face().rasterize(' ', 40.0).is_none());
    }

    #[test]
    fn test_directory_loads_and_caches() {
        let loader = FontDirectory::new(FONT_DIR);
        let def = FontDefinition::new(0.0, 22, 28, "DejaVuSansMono-Bold.ttf");

        let first = loader.load(&def).unwrap();
        let second = loader.load(&def).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.cache.pin().len(), 1);

        let mask = first.rasterize('a', 28.0).unwrap();
        assert!(mask.coverage.pixels().any(|p| p[0] > 0));
    }

    #[test]
    fn test_mask_edges() {
        let mask = GlyphMask {
            coverage: GrayImage::new(10, 20),
            left: 2,
            top: -18,
            advance: 13.0,
        };
        assert!((mask.right() - 12.0).abs() < f32::EPSILON);
        assert!((mask.bottom() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_f32_conversions() {
        assert_eq!(f32_to_i32(10.5), 11);
        assert_eq!(f32_to_i32(-5.3), -5);
        assert_eq!(f32_to_u32(15.8), 16);
        assert_eq!(f32_to_u32(-1.0), 0);
    }
}
