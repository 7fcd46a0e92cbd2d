// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Offscreen backend: headless rendering into an RGBA frame, captured as PNG.
//!
//! Runs without a window or GPU, so scripted screen flows can be captured on
//! CI. Like the text backend it takes time and pointer state from the
//! EventScheduler. Static noise is seeded from the draw call itself, so the
//! same frame always rasterizes to the same pixels.

use super::text::snapshot_path;
use super::{scaled_size, Texture, TextureImpl, VideoDriver};
use crate::card::{Card, CardStack};
use crate::error::{DeckError, DeckResult};
use crate::event::InputMode;
use crate::render::{PixMap, RgbColor};
use crate::scheduler::{EventScheduler, MainLoop, SchedulerHandle};
use crate::time::{Ticks, WallTime};
use crate::util::{Point, Rect, Size};
use image::{Rgba, RgbaImage};
use log::info;
use rand_xoshiro::{
    rand_core::{RngCore, SeedableRng},
    Xoshiro256StarStar,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

struct Canvas {
    frame: RgbaImage,
}

impl Canvas {
    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.frame.width() as i32, self.frame.height() as i32)
    }

    fn get(&self, x: i32, y: i32) -> RgbColor {
        let p = self.frame.get_pixel(x as u32, y as u32).0;
        RgbColor::with_alpha(p[0], p[1], p[2], p[3])
    }

    fn blend(&mut self, x: i32, y: i32, color: RgbColor) {
        if !self.bounds().contains(Point::new(x, y)) || color.alpha == 0 {
            return;
        }
        let c = color.over(self.get(x, y));
        self.frame
            .put_pixel(x as u32, y as u32, Rgba([c.red, c.green, c.blue, c.alpha]));
    }

    fn clear(&mut self, color: RgbColor) {
        for p in self.frame.pixels_mut() {
            *p = Rgba([color.red, color.green, color.blue, color.alpha]);
        }
    }

    fn fill(&mut self, rect: Rect, color: RgbColor) {
        let r = rect.intersection(self.bounds());
        for y in r.top..r.bottom {
            for x in r.left..r.right {
                self.blend(x, y, color);
            }
        }
    }

    /// Fills each row between `l(dy)` and `r(dy)` relative to rect.left.
    fn fill_rows(&mut self, rect: Rect, color: RgbColor, span: impl Fn(i32) -> (i32, i32)) {
        for dy in 0..rect.height() {
            let (l, r) = span(dy);
            for x in rect.left + l..rect.left + r {
                self.blend(x, rect.top + dy, color);
            }
        }
    }

    fn line(&mut self, from: Point, to: Point, color: RgbColor) {
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.blend(x, y, color);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Nearest-neighbour copy of `source` (in content pixels) into `dest`,
    /// each pixel passed through `shade` first.
    fn blit(
        &mut self,
        content: &PixMap,
        dest: Rect,
        source: Rect,
        mut shade: impl FnMut(i32, i32, RgbColor) -> RgbColor,
    ) {
        if dest.is_empty() || source.is_empty() {
            return;
        }
        let visible = dest.intersection(self.bounds());
        for y in visible.top..visible.bottom {
            let sy = source.top + (y - dest.top) * source.height() / dest.height();
            for x in visible.left..visible.right {
                let sx = source.left + (x - dest.left) * source.width() / dest.width();
                let c = shade(sx, sy, content.get(sx, sy));
                self.blend(x, y, c);
            }
        }
    }
}

pub struct OffscreenVideoDriver {
    size: Size,
    clock: SchedulerHandle,
    canvas: Rc<RefCell<Canvas>>,
}

impl OffscreenVideoDriver {
    pub fn new(size: Size, clock: SchedulerHandle) -> Self {
        let frame = RgbaImage::new(size.width.max(1) as u32, size.height.max(1) as u32);
        Self {
            size,
            clock,
            canvas: Rc::new(RefCell::new(Canvas { frame })),
        }
    }

    pub fn clear(&mut self) {
        self.canvas.borrow_mut().clear(RgbColor::BLACK);
    }

    /// Current frame contents.
    pub fn frame(&self) -> RgbaImage {
        self.canvas.borrow().frame.clone()
    }

    pub fn pixel(&self, at: Point) -> RgbColor {
        let canvas = self.canvas.borrow();
        if canvas.bounds().contains(at) {
            canvas.get(at.x, at.y)
        } else {
            RgbColor::CLEAR
        }
    }

    pub fn save_png(&self, path: &std::path::Path) -> DeckResult<()> {
        self.canvas
            .borrow()
            .frame
            .save(path)
            .map_err(|e| DeckError::Image(format!("{}: {}", path.display(), e)))
    }

    pub fn run(
        self,
        scheduler: &mut EventScheduler,
        output_dir: Option<PathBuf>,
        initial: Box<dyn Card>,
    ) -> DeckResult<()> {
        let mut main_loop = OffscreenMainLoop::new(self, output_dir, initial)?;
        scheduler.run(&mut main_loop)
    }
}

impl VideoDriver for OffscreenVideoDriver {
    fn screen_size(&self) -> Size {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, color: RgbColor) {
        self.canvas.borrow_mut().fill(rect, color);
    }

    fn dither_rect(&mut self, rect: Rect, color: RgbColor) {
        let mut canvas = self.canvas.borrow_mut();
        let solid = RgbColor::new(color.red, color.green, color.blue);
        let r = rect.intersection(canvas.bounds());
        for y in r.top..r.bottom {
            for x in r.left..r.right {
                if (x + y) % 2 == 0 {
                    canvas.blend(x, y, solid);
                }
            }
        }
    }

    fn draw_point(&mut self, at: Point, color: RgbColor) {
        self.canvas.borrow_mut().blend(at.x, at.y, color);
    }

    fn draw_line(&mut self, from: Point, to: Point, color: RgbColor) {
        self.canvas.borrow_mut().line(from, to, color);
    }

    fn draw_triangle(&mut self, rect: Rect, color: RgbColor) {
        // apex at top center, base along the bottom edge
        let (w, h) = (rect.width(), rect.height().max(1));
        self.canvas.borrow_mut().fill_rows(rect, color, |dy| {
            let half = w * (dy + 1) / (2 * h);
            (w / 2 - half, w - w / 2 + half)
        });
    }

    fn draw_diamond(&mut self, rect: Rect, color: RgbColor) {
        let (w, h) = (rect.width(), rect.height().max(1));
        self.canvas.borrow_mut().fill_rows(rect, color, |dy| {
            let from_mid = (2 * dy + 1 - h).abs();
            let half = w * (h - from_mid) / (2 * h);
            (w / 2 - half, w - w / 2 + half)
        });
    }

    fn draw_plus(&mut self, rect: Rect, color: RgbColor) {
        let c = rect.center();
        let mut canvas = self.canvas.borrow_mut();
        canvas.fill(Rect::new(rect.left, c.y, rect.right, c.y + 1), color);
        canvas.fill(Rect::new(c.x, rect.top, c.x + 1, c.y), color);
        canvas.fill(Rect::new(c.x, c.y + 1, c.x + 1, rect.bottom), color);
    }

    fn texture(&mut self, name: &str, content: &PixMap, scale: u32) -> DeckResult<Texture> {
        Ok(Texture::new(OffscreenTexture {
            name: name.to_string(),
            size: scaled_size(content, scale),
            content: content.clone(),
            canvas: self.canvas.clone(),
        }))
    }

    fn get_mouse(&self) -> Point {
        self.clock.get_mouse()
    }

    fn input_mode(&self) -> InputMode {
        self.clock.input_mode()
    }

    fn now(&self) -> WallTime {
        self.clock.now()
    }
}

struct OffscreenTexture {
    name: String,
    size: Size,
    content: PixMap,
    canvas: Rc<RefCell<Canvas>>,
}

impl OffscreenTexture {
    fn whole(&self) -> Rect {
        self.content.size().as_rect()
    }

    /// Maps a rect in logical texture pixels onto content pixels.
    fn to_content(&self, source: Rect) -> Rect {
        let cs = self.content.size();
        let (lw, lh) = (self.size.width.max(1), self.size.height.max(1));
        Rect::new(
            source.left * cs.width / lw,
            source.top * cs.height / lh,
            source.right * cs.width / lw,
            source.bottom * cs.height / lh,
        )
    }

    fn seed(&self, rect: Rect, frac: u8) -> u64 {
        self.name.bytes().fold(
            (rect.left as u64) << 48 ^ (rect.top as u64) << 32 ^ (frac as u64) << 16,
            |h, b| h.rotate_left(5) ^ b as u64,
        )
    }
}

impl TextureImpl for OffscreenTexture {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> Size {
        self.size
    }

    fn draw(&self, rect: Rect) {
        self.canvas
            .borrow_mut()
            .blit(&self.content, rect, self.whole(), |_, _, c| c);
    }

    fn draw_cropped(&self, dest: Rect, source: Rect, tint: RgbColor) {
        let source = self.to_content(source);
        self.canvas
            .borrow_mut()
            .blit(&self.content, dest, source, |_, _, c| c.modulate(tint));
    }

    fn draw_shaded(&self, rect: Rect, tint: RgbColor) {
        self.canvas
            .borrow_mut()
            .blit(&self.content, rect, self.whole(), |_, _, c| c.modulate(tint));
    }

    fn draw_static(&self, rect: Rect, color: RgbColor, frac: u8) {
        let mut rng = Xoshiro256StarStar::seed_from_u64(self.seed(rect, frac));
        self.canvas
            .borrow_mut()
            .blit(&self.content, rect, self.whole(), |_, _, c| {
                let noisy = rng.next_u32() % 255 < frac as u32;
                if c.alpha != 0 && noisy {
                    RgbColor::with_alpha(color.red, color.green, color.blue, c.alpha)
                } else {
                    c
                }
            });
    }

    fn draw_outlined(&self, rect: Rect, outline: RgbColor, fill: RgbColor) {
        let content = &self.content;
        self.canvas
            .borrow_mut()
            .blit(content, rect, self.whole(), |x, y, c| {
                if c.alpha == 0 {
                    return c;
                }
                let edge = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                    .iter()
                    .any(|(dx, dy)| content.get(x + dx, y + dy).alpha == 0);
                if edge {
                    outline
                } else {
                    fill
                }
            });
    }
}

/// Scheduler-driven loop that writes PNG snapshots.
pub struct OffscreenMainLoop {
    driver: OffscreenVideoDriver,
    output_dir: Option<PathBuf>,
    stack: CardStack,
}

impl OffscreenMainLoop {
    pub fn new(
        mut driver: OffscreenVideoDriver,
        output_dir: Option<PathBuf>,
        initial: Box<dyn Card>,
    ) -> DeckResult<Self> {
        let stack = CardStack::new(initial, &mut driver)?;
        Ok(Self {
            driver,
            output_dir,
            stack,
        })
    }

    pub fn driver(&self) -> &OffscreenVideoDriver {
        &self.driver
    }
}

impl MainLoop for OffscreenMainLoop {
    fn takes_snapshots(&self) -> bool {
        self.output_dir.is_some()
    }

    fn snapshot(&mut self, ticks: Ticks) -> DeckResult<()> {
        if let Some(dir) = &self.output_dir {
            let path = snapshot_path(dir, ticks, "png")?;
            self.driver.save_png(&path)?;
            info!("snapshot {}", path.display());
        }
        Ok(())
    }

    fn draw(&mut self) {
        self.driver.clear();
        self.stack.draw(&mut self.driver);
    }

    fn done(&self) -> bool {
        self.stack.empty()
    }

    fn top(&self) -> Option<&dyn Card> {
        self.stack.top()
    }

    fn parts(&mut self) -> (&mut CardStack, &mut dyn VideoDriver) {
        (&mut self.stack, &mut self.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::adapter::{Lines, Points, Rects};

    fn driver() -> OffscreenVideoDriver {
        let mut d = OffscreenVideoDriver::new(Size::new(64, 48), EventScheduler::new().handle());
        d.clear();
        d
    }

    #[test]
    fn test_fill_and_clip() {
        let mut d = driver();
        let red = RgbColor::new(255, 0, 0);
        d.fill_rect(Rect::new(60, 40, 80, 60), red);
        assert_eq!(d.pixel(Point::new(63, 47)), red);
        assert_eq!(d.pixel(Point::new(59, 40)), RgbColor::BLACK);
        assert_eq!(d.pixel(Point::new(64, 40)), RgbColor::CLEAR);
    }

    #[test]
    fn test_line_and_point() {
        let mut d = driver();
        d.draw_line(Point::new(0, 0), Point::new(5, 5), RgbColor::WHITE);
        d.draw_point(Point::new(10, 1), RgbColor::WHITE);
        for i in 0..=5 {
            assert_eq!(d.pixel(Point::new(i, i)), RgbColor::WHITE);
        }
        assert_eq!(d.pixel(Point::new(10, 1)), RgbColor::WHITE);
        assert_eq!(d.pixel(Point::new(1, 0)), RgbColor::BLACK);
    }

    #[test]
    fn test_shapes_stay_in_bounds() {
        let mut d = driver();
        let green = RgbColor::new(0, 255, 0);
        d.draw_triangle(Rect::new(0, 0, 10, 10), green);
        d.draw_diamond(Rect::new(20, 0, 30, 10), green);
        d.draw_plus(Rect::new(40, 0, 49, 9), green);
        // triangle base is full width, apex is narrow
        assert_eq!(d.pixel(Point::new(0, 9)), green);
        assert_eq!(d.pixel(Point::new(0, 0)), RgbColor::BLACK);
        // diamond is widest in the middle row
        assert_eq!(d.pixel(Point::new(21, 5)), green);
        assert_eq!(d.pixel(Point::new(21, 0)), RgbColor::BLACK);
        // plus crosses at the center
        assert_eq!(d.pixel(Point::new(44, 4)), green);
        assert_eq!(d.pixel(Point::new(40, 4)), green);
        assert_eq!(d.pixel(Point::new(44, 0)), green);
        assert_eq!(d.pixel(Point::new(40, 0)), RgbColor::BLACK);
        assert_eq!(d.pixel(Point::new(11, 5)), RgbColor::BLACK);
    }

    #[test]
    fn test_texture_scaled_and_tinted() {
        let mut d = driver();
        let mut pix = PixMap::new(Size::new(4, 4), RgbColor::WHITE);
        pix.set(0, 0, RgbColor::CLEAR);
        let t = d.texture("dot", &pix, 2).unwrap();
        assert_eq!(t.size(), Size::new(2, 2));
        t.draw(Rect::new(0, 0, 8, 8));
        assert_eq!(d.pixel(Point::new(0, 0)), RgbColor::BLACK);
        assert_eq!(d.pixel(Point::new(7, 7)), RgbColor::WHITE);
        let blue = RgbColor::new(0, 0, 255);
        t.draw_shaded(Rect::new(10, 0, 14, 4), blue);
        assert_eq!(d.pixel(Point::new(13, 3)), blue);
        t.draw_cropped(Rect::new(20, 0, 22, 2), Rect::new(1, 1, 2, 2), blue);
        assert_eq!(d.pixel(Point::new(20, 0)), blue);
    }

    #[test]
    fn test_outline_and_static() {
        let mut d = driver();
        let pix = PixMap::new(Size::new(4, 4), RgbColor::WHITE);
        let t = d.texture("box", &pix, 1).unwrap();
        let red = RgbColor::new(255, 0, 0);
        let blue = RgbColor::new(0, 0, 255);
        t.draw_outlined(Rect::new(0, 0, 4, 4), red, blue);
        assert_eq!(d.pixel(Point::new(0, 0)), red);
        assert_eq!(d.pixel(Point::new(1, 1)), blue);

        t.draw_static(Rect::new(10, 10, 14, 14), red, 255);
        assert_eq!(d.pixel(Point::new(11, 11)), red);
        t.draw_static(Rect::new(20, 10, 24, 14), red, 0);
        assert_eq!(d.pixel(Point::new(21, 11)), RgbColor::WHITE);

        let a = d.frame();
        t.draw_static(Rect::new(30, 10, 34, 14), red, 128);
        let b = d.frame();
        let mut e = driver();
        let t2 = e.texture("box", &pix, 1).unwrap();
        t2.draw_outlined(Rect::new(0, 0, 4, 4), red, blue);
        t2.draw_static(Rect::new(10, 10, 14, 14), red, 255);
        t2.draw_static(Rect::new(20, 10, 24, 14), red, 0);
        assert_eq!(e.frame(), a);
        t2.draw_static(Rect::new(30, 10, 34, 14), red, 128);
        assert_eq!(e.frame(), b);
    }

    fn scene_direct(d: &mut dyn VideoDriver) {
        let red = RgbColor::new(255, 0, 0);
        d.fill_rect(Rect::new(0, 0, 20, 10), RgbColor::BLACK);
        d.fill_rect(Rect::new(4, 4, 8, 8), red);
        d.draw_point(Point::new(1, 1), red);
        d.draw_point(Point::new(2, 1), red);
        d.draw_line(Point::new(0, 9), Point::new(19, 0), RgbColor::WHITE);
        d.draw_line(Point::new(0, 0), Point::new(19, 9), RgbColor::WHITE);
    }

    fn scene_bracketed(d: &mut dyn VideoDriver) {
        let red = RgbColor::new(255, 0, 0);
        {
            let mut rects = Rects::new(d);
            rects.fill(Rect::new(0, 0, 20, 10), RgbColor::BLACK);
            rects.fill(Rect::new(4, 4, 8, 8), red);
        }
        {
            let mut points = Points::new(d);
            points.draw(Point::new(1, 1), red);
            points.draw(Point::new(2, 1), red);
        }
        let mut lines = Lines::new(d);
        lines.draw(Point::new(0, 9), Point::new(19, 0), RgbColor::WHITE);
        lines.draw(Point::new(0, 0), Point::new(19, 9), RgbColor::WHITE);
    }

    #[test]
    fn test_brackets_match_single_calls() {
        let mut direct = driver();
        let mut bracketed = driver();
        scene_direct(&mut direct);
        scene_bracketed(&mut bracketed);
        assert_eq!(direct.pixel(Point::new(5, 5)), RgbColor::new(255, 0, 0));
        assert_eq!(direct.frame(), bracketed.frame());
    }
}
