//! Hex color parsing.

use crate::config::{CaptchaError, Result};
use image::Rgb;

/// Converts `#RGB` or `#RRGGBB` into an RGB triple.
///
/// The hash is optional for the six-digit form only; a bare three-character
/// string such as `bad` is read as a word, not a color. Short-form digits are
/// doubled, so `#1AF` becomes `#11AAFF`.
///
/// # Errors
///
/// Returns `InvalidColor` on a wrong length or non-hex characters.
pub fn hex_to_rgb(hex: &str) -> Result<Rgb<u8>> {
    let (digits, hashed) = match hex.strip_prefix('#') {
        Some(rest) => (rest, true),
        None => (hex, false),
    };
    let invalid = || CaptchaError::InvalidColor(hex.to_string());

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match digits.len() {
        3 if hashed => {
            let mut rgb = [0u8; 3];
            for (slot, ch) in rgb.iter_mut().zip(digits.chars()) {
                *slot = channel(&format!("{ch}{ch}"))?;
            }
            Ok(Rgb(rgb))
        }
        6 => Ok(Rgb([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        ])),
        _ => Err(invalid()),
    }
}
