//! Configuration management.
//!
//! Holds the immutable per-run CAPTCHA settings and the service settings
//! loaded from environment variables using dotenvy.

mod error;
mod settings;

pub use error::{CaptchaError, Result};
pub use settings::{
    CaptchaConfig, DEFAULT_FOREGROUND_COLORS, Effects, FontDefinition, OutputFormat, Palette,
    ServerConfig, default_fonts,
};
