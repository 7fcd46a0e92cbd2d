// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Render module: colors, pixel maps and the video driver adapters.
//!
//! adapter: the VideoDriver/Texture contract plus the text, offscreen and
//! OpenGL backends.

pub mod adapter;
mod color;
pub use color::*;
mod pixmap;
pub use pixmap::*;
