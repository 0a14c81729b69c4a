//! Error types and result aliases.
//!
//! Defines the core `CaptchaError` enumeration and common `Result` type.

use thiserror::Error;

/// CAPTCHA pipeline errors.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// Configuration rejected before generation started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed hexadecimal color.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// Font resource missing or unreadable.
    #[error("failed to load font {resource}: {reason}")]
    FontLoad { resource: String, reason: String },

    /// Image backend could not produce the requested format.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Canvas could not be allocated.
    #[error("canvas allocation failed: {0}")]
    Allocation(String),

    /// Socket or filesystem error in the HTTP service.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for `CaptchaError`.
pub type Result<T> = std::result::Result<T, CaptchaError>;
