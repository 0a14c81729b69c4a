//! Distorted-text CAPTCHA pipeline.
//!
//! Answer generation, glyph rendering on an oversized canvas, wave
//! distortion, optional effects, downsampling and encoding.

pub mod answer;
pub mod canvas;
pub mod color;
pub mod distort;
pub mod effects;
pub mod encode;
pub mod font;
pub mod generator;
pub mod observer;
pub mod render;
pub mod resample;

pub use answer::random_answer;
pub use canvas::{Canvas, OVERSIZE_FACTOR};
pub use color::hex_to_rgb;
pub use encode::EncodedImage;
pub use font::{FontDirectory, FontLoader, GlyphMask, GlyphSource, TrueTypeFace};
pub use generator::{Captcha, CaptchaGenerator, SESSION_KEY, check};
pub use observer::{NoopObserver, Stage, StageObserver, TracingObserver};
