//! Configuration settings.
//!
//! Defines the per-run `CaptchaConfig`, the font catalogue, and the
//! `ServerConfig` loaded from environment variables.

use super::error::{CaptchaError, Result};
use crate::captcha::color::hex_to_rgb;
use image::{Rgb, Rgba};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Largest accepted display width or height.
const MAX_DIMENSION: u32 = 4096;

/// Largest accepted wave period or amplitude, and pixelation block edge.
const MAX_WAVE: u32 = MAX_DIMENSION;

/// Largest accepted catalogue font size, in points.
const MAX_FONT_SIZE: u32 = 500;

/// Letter colors used when none are configured: blue, green, red, purple, orange.
pub const DEFAULT_FOREGROUND_COLORS: [&str; 5] =
    ["#006ACC", "#00CC00", "#CC0000", "#8B28FA", "#FF7007"];

/// Encoded image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl FromStr for OutputFormat {
    type Err = CaptchaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(CaptchaError::InvalidConfig(format!(
                "unknown output format {other:?}"
            ))),
        }
    }
}

/// Raster post-effects, applied in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Effects {
    /// Gaussian blur.
    pub blur: bool,
    /// Emboss relief.
    pub emboss: bool,
    /// Block pixelation.
    pub pixelate: bool,
}

/// One entry of the font catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDefinition {
    /// Extra gap after each glyph, in display pixels.
    pub letter_spacing: f32,
    /// Smallest point size picked for a glyph.
    pub min_size: u32,
    /// Largest point size picked for a glyph.
    pub max_size: u32,
    /// Resource id handed to the font loader (a file name).
    pub resource: String,
}

impl FontDefinition {
    #[must_use]
    pub fn new(letter_spacing: f32, min_size: u32, max_size: u32, resource: &str) -> Self {
        Self {
            letter_spacing,
            min_size,
            max_size,
            resource: resource.to_string(),
        }
    }
}

/// The stock catalogue of eight display fonts.
#[must_use]
pub fn default_fonts() -> Vec<FontDefinition> {
    vec![
        FontDefinition::new(1.0, 14, 20, "BoomBox.ttf"),
        FontDefinition::new(0.0, 22, 38, "Duality.ttf"),
        FontDefinition::new(1.0, 28, 32, "Monof.ttf"),
        FontDefinition::new(0.0, 22, 28, "OrionPax.ttf"),
        FontDefinition::new(0.0, 26, 34, "Stark.ttf"),
        FontDefinition::new(1.5, 24, 30, "StayPuft.ttf"),
        FontDefinition::new(1.0, 12, 18, "VenusRisingRg.ttf"),
        FontDefinition::new(0.5, 22, 30, "WhiteRabbit.ttf"),
    ]
}

/// Colors resolved from a validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// Canvas fill; fully transparent when the background is disabled.
    pub background: Rgba<u8>,
    /// Candidate letter colors.
    pub foreground: Vec<Rgb<u8>>,
}

/// Immutable settings for one CAPTCHA generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaConfig {
    /// Display width in pixels.
    pub width: u32,
    /// Display height in pixels.
    pub height: u32,
    /// Shortest answer.
    pub min_length: usize,
    /// Longest answer.
    pub max_length: usize,
    /// Hex background color. Empty means black.
    pub background_color: String,
    /// Transparent background; overrides `background_color`.
    pub transparent: bool,
    /// Hex letter colors, one picked per run.
    pub foreground_colors: Vec<String>,
    /// Font catalogue, one entry picked per run.
    pub fonts: Vec<FontDefinition>,
    /// Max rotation of a letter either way, in degrees.
    pub max_rotation: i32,
    /// Wave period (x, y).
    pub period: (u32, u32),
    /// Wave amplitude (x, y), in display pixels.
    pub amplitude: (u32, u32),
    /// Post-effects toggles.
    pub effects: Effects,
    /// Pixelation block edge, in display pixels.
    pub pixelate_block: u32,
    /// Output encoding.
    pub format: OutputFormat,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            width: 250,
            height: 60,
            min_length: 6,
            max_length: 10,
            background_color: "#FFFFFF".to_string(),
            transparent: false,
            foreground_colors: DEFAULT_FOREGROUND_COLORS
                .iter()
                .map(ToString::to_string)
                .collect(),
            fonts: default_fonts(),
            max_rotation: 7,
            period: (11, 12),
            amplitude: (5, 14),
            effects: Effects::default(),
            pixelate_block: 2,
            format: OutputFormat::Png,
        }
    }
}

impl CaptchaConfig {
    /// Checks every invariant and resolves the colors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for bad bounds or an empty catalogue and
    /// `InvalidColor` for a malformed hex color.
    pub fn validate(&self) -> Result<Palette> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptchaError::InvalidConfig(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(CaptchaError::InvalidConfig(format!(
                "dimensions {}x{} exceed {MAX_DIMENSION}",
                self.width, self.height
            )));
        }
        if self.min_length == 0 {
            return Err(CaptchaError::InvalidConfig(
                "min_length must be at least 1".to_string(),
            ));
        }
        if self.min_length > self.max_length {
            return Err(CaptchaError::InvalidConfig(format!(
                "min_length {} is greater than max_length {}",
                self.min_length, self.max_length
            )));
        }
        if self.fonts.is_empty() {
            return Err(CaptchaError::InvalidConfig(
                "font catalogue is empty".to_string(),
            ));
        }
        for font in &self.fonts {
            if font.min_size == 0
                || font.min_size > font.max_size
                || font.max_size > MAX_FONT_SIZE
            {
                return Err(CaptchaError::InvalidConfig(format!(
                    "font {} has size range {}..={}",
                    font.resource, font.min_size, font.max_size
                )));
            }
            if !font.letter_spacing.is_finite() {
                return Err(CaptchaError::InvalidConfig(format!(
                    "font {} has a non-finite letter spacing",
                    font.resource
                )));
            }
        }
        if self.period.0 == 0 || self.period.1 == 0 {
            return Err(CaptchaError::InvalidConfig(
                "distortion period must be positive".to_string(),
            ));
        }
        let (px, py) = self.period;
        let (ax, ay) = self.amplitude;
        if px.max(py).max(ax).max(ay) > MAX_WAVE {
            return Err(CaptchaError::InvalidConfig(format!(
                "distortion period {:?} and amplitude {:?} must not exceed {MAX_WAVE}",
                self.period, self.amplitude
            )));
        }
        if self.effects.pixelate && (self.pixelate_block == 0 || self.pixelate_block > MAX_WAVE) {
            return Err(CaptchaError::InvalidConfig(format!(
                "pixelate_block must be in 1..={MAX_WAVE}, got {}",
                self.pixelate_block
            )));
        }
        if self.max_rotation < 0 {
            return Err(CaptchaError::InvalidConfig(
                "max_rotation must not be negative".to_string(),
            ));
        }
        if self.foreground_colors.is_empty() {
            return Err(CaptchaError::InvalidConfig(
                "foreground palette is empty".to_string(),
            ));
        }

        let background = if self.transparent {
            Rgba([0, 0, 0, 0])
        } else if self.background_color.is_empty() {
            Rgba([0, 0, 0, 255])
        } else {
            let Rgb([r, g, b]) = hex_to_rgb(&self.background_color)?;
            Rgba([r, g, b, 255])
        };

        let foreground = self
            .foreground_colors
            .iter()
            .map(String::as_str)
            .map(hex_to_rgb)
            .collect::<Result<Vec<_>>>()?;

        Ok(Palette {
            background,
            foreground,
        })
    }
}

fn get_env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_bool(key: &str) -> Result<bool> {
    let Some(raw) = env::var(key).ok().filter(|s| !s.trim().is_empty()) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(CaptchaError::InvalidConfig(format!(
            "{key} must be true, false, 1 or 0, got {raw:?}"
        ))),
    }
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key).ok().filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CaptchaError::InvalidConfig(format!("{key} has invalid value {raw:?}"))),
        None => Ok(default),
    }
}

fn parse_env_pair(key: &str, default: (u32, u32)) -> Result<(u32, u32)> {
    let Some(raw) = env::var(key).ok().filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let invalid = || CaptchaError::InvalidConfig(format!("{key} must be \"x,y\", got {raw:?}"));
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    Ok((
        x.trim().parse().map_err(|_| invalid())?,
        y.trim().parse().map_err(|_| invalid())?,
    ))
}

/// Service configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP service listens on.
    pub listen_addr: SocketAddr,
    /// Directory the font catalogue is resolved against.
    pub font_dir: PathBuf,
    /// Seconds a stored answer stays valid.
    pub session_expiry_secs: u64,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
    /// Logging format: "json" or "pretty".
    pub log_format: String,
    /// Settings for every generated CAPTCHA.
    pub captcha: CaptchaConfig,
}

impl ServerConfig {
    /// Loads configuration from environment variables, falling back to the
    /// stock defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a variable is set but cannot be parsed, or
    /// if the resulting CAPTCHA settings fail validation.
    pub fn from_env() -> Result<Arc<Self>> {
        let defaults = CaptchaConfig::default();

        let foreground_colors = env::var("CAPTCHA_FGD_COLORS")
            .ok()
            .filter(|s| !s.is_empty())
            .map_or(defaults.foreground_colors, |list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        let captcha = CaptchaConfig {
            width: parse_env_or("CAPTCHA_WIDTH", defaults.width)?,
            height: parse_env_or("CAPTCHA_HEIGHT", defaults.height)?,
            min_length: parse_env_or("CAPTCHA_MIN_LENGTH", defaults.min_length)?,
            max_length: parse_env_or("CAPTCHA_MAX_LENGTH", defaults.max_length)?,
            background_color: get_env_or("CAPTCHA_BGD_COLOR", &defaults.background_color),
            transparent: get_env_bool("CAPTCHA_BGD_TRANSPARENT")?,
            foreground_colors,
            fonts: defaults.fonts,
            max_rotation: parse_env_or("CAPTCHA_MAX_ROTATION", defaults.max_rotation)?,
            period: parse_env_pair("CAPTCHA_PERIOD", defaults.period)?,
            amplitude: parse_env_pair("CAPTCHA_AMPLITUDE", defaults.amplitude)?,
            effects: Effects {
                blur: get_env_bool("CAPTCHA_BLUR")?,
                emboss: get_env_bool("CAPTCHA_EMBOSS")?,
                pixelate: get_env_bool("CAPTCHA_PIXELATE")?,
            },
            pixelate_block: parse_env_or("CAPTCHA_PIXELATE_BLOCK", defaults.pixelate_block)?,
            format: parse_env_or("CAPTCHA_FORMAT", defaults.format)?,
        };
        captcha.validate()?;

        Ok(Arc::new(Self {
            listen_addr: parse_env_or(
                "LISTEN_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 8080)),
            )?,
            font_dir: PathBuf::from(get_env_or("FONT_DIR", "fonts")),
            session_expiry_secs: parse_env_or("SESSION_EXPIRY_SECS", 3600)?,
            secure_cookies: get_env_bool("SECURE_COOKIES")?,
            log_format: get_env_or("LOG_FORMAT", "json"),
            captcha,
        }))
    }
}
