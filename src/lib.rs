//! Library definitions.
//!
//! Exports the CAPTCHA pipeline, its configuration, the answer stores and
//! the HTTP service that serves images and checks answers.

pub mod captcha;
pub mod config;
pub mod store;
pub mod web;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
pub use captcha::{
    CaptchaGenerator, EncodedImage, FontDirectory, FontLoader, GlyphSource, SESSION_KEY,
    StageObserver, TracingObserver, check,
};
pub use config::{CaptchaConfig, CaptchaError, OutputFormat, Result, ServerConfig};
pub use store::{MemoryStore, SessionStore, VerificationStore};
pub use web::{AppState, serve};
