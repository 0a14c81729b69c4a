//! HTTP sink for generated images.
//!
//! Serves the image with cache-busting headers, keeps the answer in a
//! cookie-identified session and checks submitted codes.

pub mod form;
pub mod headers;
pub mod pages;
pub mod server;
pub mod session;

pub use server::{AppState, IMAGE_PATH, serve};
pub use session::SESSION_COOKIE_NAME;
