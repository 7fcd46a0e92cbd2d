// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! The video driver contract every backend implements.
//!
//! All coordinates are logical screen pixels, (0,0) top-left, y downward.
//! Backends must produce the same observable draw operations for the same
//! calls; the text backend records them so tests can pin that down.
//!
//! Batching (`Points`, `Lines`, `Rects`) only lets a backend group work.
//! Drawing through a batch must look exactly like drawing call by call.

use crate::error::DeckResult;
use crate::event::InputMode;
use crate::render::{PixMap, RgbColor};
use crate::time::WallTime;
use crate::util::{Point, Rect, Size};
use std::rc::Rc;

pub mod text;

#[cfg(feature = "image")]
pub mod offscreen;

#[cfg(gl_backend)]
pub mod gl;

#[cfg(gl_backend)]
pub mod winit_glow;

/// default double-click window, microseconds
pub const DOUBLE_CLICK_USECS: i64 = 500_000;

pub trait VideoDriver {
    fn screen_size(&self) -> Size;

    fn fill_rect(&mut self, rect: Rect, color: RgbColor);
    fn dither_rect(&mut self, rect: Rect, color: RgbColor);
    fn draw_point(&mut self, at: Point, color: RgbColor);
    fn draw_line(&mut self, from: Point, to: Point, color: RgbColor);
    fn draw_triangle(&mut self, rect: Rect, color: RgbColor);
    fn draw_diamond(&mut self, rect: Rect, color: RgbColor);
    fn draw_plus(&mut self, rect: Rect, color: RgbColor);

    fn begin_points(&mut self) {}
    fn end_points(&mut self) {}
    fn begin_lines(&mut self) {}
    fn end_lines(&mut self) {}
    fn begin_rects(&mut self) {}
    fn end_rects(&mut self) {}

    /// Registers `content` under `name`. `scale` is device pixels per
    /// logical pixel of the content.
    fn texture(&mut self, name: &str, content: &PixMap, scale: u32) -> DeckResult<Texture>;

    fn get_mouse(&self) -> Point;
    fn input_mode(&self) -> InputMode;
    fn now(&self) -> WallTime;

    fn double_click_interval(&self) -> WallTime {
        WallTime(DOUBLE_CLICK_USECS)
    }
}

/// Backend side of a texture handle.
pub trait TextureImpl {
    fn name(&self) -> &str;
    fn size(&self) -> Size;
    fn draw(&self, rect: Rect);
    fn draw_cropped(&self, dest: Rect, source: Rect, tint: RgbColor);
    fn draw_shaded(&self, rect: Rect, tint: RgbColor);
    fn draw_static(&self, rect: Rect, color: RgbColor, frac: u8);
    fn draw_outlined(&self, rect: Rect, outline: RgbColor, fill: RgbColor);
}

/// Shared handle to backend texture content; clones refer to the same texture.
#[derive(Clone)]
pub struct Texture(Rc<dyn TextureImpl>);

impl Texture {
    pub fn new(imp: impl TextureImpl + 'static) -> Texture {
        Texture(Rc::new(imp))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Logical size of the content.
    pub fn size(&self) -> Size {
        self.0.size()
    }

    pub fn draw(&self, rect: Rect) {
        self.0.draw(rect)
    }

    /// Draws at `origin` with the texture's own size.
    pub fn draw_at(&self, origin: Point) {
        self.0.draw(Rect::at(origin, self.size()))
    }

    pub fn draw_cropped(&self, dest: Rect, source: Rect, tint: RgbColor) {
        self.0.draw_cropped(dest, source, tint)
    }

    pub fn draw_shaded(&self, rect: Rect, tint: RgbColor) {
        self.0.draw_shaded(rect, tint)
    }

    /// `frac` out of 255 of the pixels are replaced by noise in `color`.
    pub fn draw_static(&self, rect: Rect, color: RgbColor, frac: u8) {
        self.0.draw_static(rect, color, frac)
    }

    pub fn draw_outlined(&self, rect: Rect, outline: RgbColor, fill: RgbColor) {
        self.0.draw_outlined(rect, outline, fill)
    }
}

/// Logical size of `content` at `scale` device pixels per logical pixel.
pub fn scaled_size(content: &PixMap, scale: u32) -> Size {
    let s = scale.max(1) as i32;
    let size = content.size();
    Size::new(size.width / s, size.height / s)
}

pub struct Points<'a> {
    video: &'a mut dyn VideoDriver,
}

impl<'a> Points<'a> {
    pub fn new(video: &'a mut dyn VideoDriver) -> Self {
        video.begin_points();
        Points { video }
    }

    pub fn draw(&mut self, at: Point, color: RgbColor) {
        self.video.draw_point(at, color);
    }
}

impl Drop for Points<'_> {
    fn drop(&mut self) {
        self.video.end_points();
    }
}

pub struct Lines<'a> {
    video: &'a mut dyn VideoDriver,
}

impl<'a> Lines<'a> {
    pub fn new(video: &'a mut dyn VideoDriver) -> Self {
        video.begin_lines();
        Lines { video }
    }

    pub fn draw(&mut self, from: Point, to: Point, color: RgbColor) {
        self.video.draw_line(from, to, color);
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.video.end_lines();
    }
}

pub struct Rects<'a> {
    video: &'a mut dyn VideoDriver,
}

impl<'a> Rects<'a> {
    pub fn new(video: &'a mut dyn VideoDriver) -> Self {
        video.begin_rects();
        Rects { video }
    }

    pub fn fill(&mut self, rect: Rect, color: RgbColor) {
        self.video.fill_rect(rect, color);
    }
}

impl Drop for Rects<'_> {
    fn drop(&mut self) {
        self.video.end_rects();
    }
}
