// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

#![cfg(feature = "image")]

use pixel_deck::card::{Below, Card, CardCtx};
use pixel_deck::event::{Key, KeyEvent};
use pixel_deck::render::adapter::offscreen::{OffscreenMainLoop, OffscreenVideoDriver};
use pixel_deck::render::adapter::{Texture, VideoDriver};
use pixel_deck::render::{PixMap, RgbColor};
use pixel_deck::scheduler::EventScheduler;
use pixel_deck::time::Ticks;
use pixel_deck::util::{Point, Rect, Size};
use pixel_deck::DeckResult;

const SKY: RgbColor = RgbColor::new(0, 0, 200);

struct Scene {
    sprite: Option<Texture>,
}

impl Card for Scene {
    fn become_front(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
        let pix = PixMap::new(Size::new(8, 8), RgbColor::new(255, 0, 0));
        self.sprite = Some(ctx.video().texture("sprite", &pix, 1)?);
        Ok(())
    }

    fn draw(&self, _below: Below<'_>, video: &mut dyn VideoDriver) {
        video.fill_rect(Rect::new(0, 0, 32, 24), SKY);
        if let Some(s) = &self.sprite {
            s.draw_at(Point::new(4, 4));
        }
    }

    fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
        if event.key == Key::ESCAPE {
            ctx.pop();
        }
        Ok(())
    }
}

#[test]
fn test_snapshots_are_png_frames() {
    let dir = tempfile::tempdir().unwrap();
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_snapshot(Ticks(10));
    scheduler.schedule_key(Key::ESCAPE, Ticks(20), Ticks(21));

    let driver = OffscreenVideoDriver::new(Size::new(32, 24), scheduler.handle());
    let mut main_loop = OffscreenMainLoop::new(
        driver,
        Some(dir.path().to_path_buf()),
        Box::new(Scene { sprite: None }),
    )
    .unwrap();
    scheduler.run(&mut main_loop).unwrap();

    let path = dir.path().join("screens/000010.png");
    let frame = image::open(&path).unwrap().to_rgba8();
    assert_eq!(frame.dimensions(), (32, 24));
    assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 200, 255]);
    assert_eq!(frame.get_pixel(5, 5).0, [255, 0, 0, 255]);
    assert_eq!(frame.get_pixel(12, 12).0, [0, 0, 200, 255]);
    assert_eq!(main_loop.driver().pixel(Point::new(11, 11)), RgbColor::new(255, 0, 0));
}
