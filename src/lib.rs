// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! PixelDeck is the presentation core of a 2D game: a stack of interactive screens
//! (cards), a deterministic event/timer scheduler and a thin video driver contract
//! with three backends.
//!
//! Text Mode: the TextVideoDriver records every draw call as a tab separated line,
//! which makes golden-file tests of whole screen flows possible.
//! Offscreen Mode: a headless rasterizer that captures frames as PNG files.
//! Graphical Mode (winit): a live OpenGL driver built on glow and glutin.
//!
//! Card code is written once against the VideoDriver trait and runs unmodified on all
//! of them. The text and offscreen backends take their clock from the EventScheduler
//! instead of the wall clock, so a scripted or replayed timeline always yields the
//! same frames.

/// virtual ticks per second
pub const TICKS_PER_SECOND: i64 = 60;

pub mod card;
pub mod config;
pub mod error;
pub mod event;
pub mod log;
pub mod render;
pub mod replay;
pub mod scheduler;
pub mod time;
pub mod util;

pub use error::{DeckError, DeckResult};
