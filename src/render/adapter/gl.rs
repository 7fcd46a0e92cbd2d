// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! OpenGL backend on glow: the live, hardware accelerated driver.
//!
//! The driver is built by GlMainLoop once a window and context exist.
//! Time is the real monotonic clock; mouse and input mode come from the
//! live EventTracker the loop feeds.

use super::{scaled_size, Texture, TextureImpl, VideoDriver};
use crate::error::{DeckError, DeckResult};
use crate::event::{EventTracker, InputMode};
use crate::render::{PixMap, RgbColor};
use crate::time::WallTime;
use crate::util::{Point, Rect, Size};
use glow::HasContext;
use log::info;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

pub mod batch;
pub mod shader;
pub mod shader_source;

use batch::{GlBatch, Paint, Shading};

pub struct OpenGlVideoDriver {
    size: Size,
    batch: Rc<RefCell<GlBatch>>,
    tracker: Rc<RefCell<EventTracker>>,
    epoch: Instant,
    double_click: WallTime,
    batching: u32,
}

impl OpenGlVideoDriver {
    pub fn new(
        gl: glow::Context,
        size: Size,
        tracker: Rc<RefCell<EventTracker>>,
        epoch: Instant,
        double_click: WallTime,
    ) -> DeckResult<Self> {
        let gl = Rc::new(gl);
        let batch = GlBatch::new(gl, "#version 330 core", size).map_err(DeckError::Setup)?;
        info!("OpenGL driver ready, {}x{}", size.width, size.height);
        Ok(Self {
            size,
            batch: Rc::new(RefCell::new(batch)),
            tracker,
            epoch,
            double_click,
            batching: 0,
        })
    }

    pub fn begin_frame(&mut self) {
        self.batch.borrow_mut().clear();
    }

    pub fn end_frame(&mut self) {
        self.batch.borrow_mut().flush();
    }

    fn solid(&mut self, f: impl FnOnce(&mut GlBatch)) {
        let mut batch = self.batch.borrow_mut();
        batch.use_texture(None);
        f(&mut *batch);
        if self.batching == 0 {
            batch.flush();
        }
    }

    fn begin(&mut self) {
        self.batching += 1;
    }

    fn end(&mut self) {
        self.batching = self.batching.saturating_sub(1);
        if self.batching == 0 {
            self.batch.borrow_mut().flush();
        }
    }
}

fn corners(rect: Rect) -> (f32, f32, f32, f32) {
    (
        rect.left as f32,
        rect.top as f32,
        rect.right as f32,
        rect.bottom as f32,
    )
}

impl VideoDriver for OpenGlVideoDriver {
    fn screen_size(&self) -> Size {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, color: RgbColor) {
        self.solid(|b| b.quad(rect, [0.0; 4], &Paint::solid(color)));
    }

    fn dither_rect(&mut self, rect: Rect, color: RgbColor) {
        let paint = Paint {
            shading: Shading::Dither,
            ..Paint::solid(color)
        };
        self.solid(|b| b.quad(rect, [0.0; 4], &paint));
    }

    fn draw_point(&mut self, at: Point, color: RgbColor) {
        let rect = Rect::new(at.x, at.y, at.x + 1, at.y + 1);
        self.solid(|b| b.quad(rect, [0.0; 4], &Paint::solid(color)));
    }

    fn draw_line(&mut self, from: Point, to: Point, color: RgbColor) {
        self.solid(|b| b.line(from, to, &Paint::solid(color)));
    }

    fn draw_triangle(&mut self, rect: Rect, color: RgbColor) {
        let (l, t, r, b) = corners(rect);
        self.solid(|batch| batch.triangle([((l + r) / 2.0, t), (r, b), (l, b)], &Paint::solid(color)));
    }

    fn draw_diamond(&mut self, rect: Rect, color: RgbColor) {
        let (l, t, r, b) = corners(rect);
        let (cx, cy) = ((l + r) / 2.0, (t + b) / 2.0);
        let paint = Paint::solid(color);
        self.solid(|batch| {
            batch.triangle([(cx, t), (r, cy), (l, cy)], &paint);
            batch.triangle([(l, cy), (r, cy), (cx, b)], &paint);
        });
    }

    fn draw_plus(&mut self, rect: Rect, color: RgbColor) {
        let c = rect.center();
        let paint = Paint::solid(color);
        self.solid(|b| {
            b.quad(Rect::new(rect.left, c.y, rect.right, c.y + 1), [0.0; 4], &paint);
            b.quad(Rect::new(c.x, rect.top, c.x + 1, c.y), [0.0; 4], &paint);
            b.quad(Rect::new(c.x, c.y + 1, c.x + 1, rect.bottom), [0.0; 4], &paint);
        });
    }

    fn begin_points(&mut self) {
        self.begin();
    }

    fn end_points(&mut self) {
        self.end();
    }

    fn begin_lines(&mut self) {
        self.begin();
    }

    fn end_lines(&mut self) {
        self.end();
    }

    fn begin_rects(&mut self) {
        self.begin();
    }

    fn end_rects(&mut self) {
        self.end();
    }

    fn texture(&mut self, name: &str, content: &PixMap, scale: u32) -> DeckResult<Texture> {
        let cs = content.size();
        let id = {
            let batch = self.batch.borrow();
            GlBatch::upload(batch.gl(), cs.width, cs.height, &content.to_rgba())
                .map_err(|e| DeckError::Setup(format!("texture {}: {}", name, e)))?
        };
        Ok(Texture::new(GlTexture {
            name: name.to_string(),
            size: scaled_size(content, scale),
            id,
            batch: self.batch.clone(),
        }))
    }

    fn get_mouse(&self) -> Point {
        self.tracker.borrow().mouse()
    }

    fn input_mode(&self) -> InputMode {
        self.tracker.borrow().input_mode()
    }

    fn now(&self) -> WallTime {
        WallTime(self.epoch.elapsed().as_micros() as i64)
    }

    fn double_click_interval(&self) -> WallTime {
        self.double_click
    }
}

struct GlTexture {
    name: String,
    size: Size,
    id: glow::Texture,
    batch: Rc<RefCell<GlBatch>>,
}

impl GlTexture {
    fn paint(&self, dest: Rect, uv: [f32; 4], paint: Paint) {
        let mut batch = self.batch.borrow_mut();
        batch.use_texture(Some(self.id));
        batch.quad(dest, uv, &paint);
        batch.flush();
    }

    fn whole() -> [f32; 4] {
        [0.0, 0.0, 1.0, 1.0]
    }

    fn textured(tint: RgbColor) -> Paint {
        Paint {
            shading: Shading::Textured,
            ..Paint::solid(tint)
        }
    }
}

impl TextureImpl for GlTexture {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> Size {
        self.size
    }

    fn draw(&self, rect: Rect) {
        self.paint(rect, Self::whole(), Self::textured(RgbColor::WHITE));
    }

    fn draw_cropped(&self, dest: Rect, source: Rect, tint: RgbColor) {
        let (w, h) = (self.size.width.max(1) as f32, self.size.height.max(1) as f32);
        let uv = [
            source.left as f32 / w,
            source.top as f32 / h,
            source.right as f32 / w,
            source.bottom as f32 / h,
        ];
        self.paint(dest, uv, Self::textured(tint));
    }

    fn draw_shaded(&self, rect: Rect, tint: RgbColor) {
        self.paint(rect, Self::whole(), Self::textured(tint));
    }

    fn draw_static(&self, rect: Rect, color: RgbColor, frac: u8) {
        let paint = Paint {
            shading: Shading::Static,
            color: RgbColor::WHITE,
            color2: color,
            frac,
        };
        self.paint(rect, Self::whole(), paint);
    }

    fn draw_outlined(&self, rect: Rect, outline: RgbColor, fill: RgbColor) {
        let paint = Paint {
            shading: Shading::Outlined,
            color: fill,
            color2: outline,
            frac: 0,
        };
        self.paint(rect, Self::whole(), paint);
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        if let Ok(batch) = self.batch.try_borrow() {
            unsafe { batch.gl().delete_texture(self.id) };
        }
    }
}
