// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Demo screens: a splash with a timer, the main menu and an options overlay.

use log::info;
use pixel_deck::card::{Below, Card, CardCtx};
use pixel_deck::event::{Key, KeyEvent, MouseButtonEvent};
use pixel_deck::render::adapter::{Rects, Texture, VideoDriver};
use pixel_deck::render::{PixMap, RgbColor};
use pixel_deck::time::{Ticks, WallTime};
use pixel_deck::util::{Point, Rect, Size};
use pixel_deck::DeckResult;

const BACKGROUND: RgbColor = RgbColor::new(16, 24, 48);
const ACCENT: RgbColor = RgbColor::new(240, 200, 64);
const DIM: RgbColor = RgbColor::new(96, 104, 128);

/// 16x16 badge with a one pixel border, used as the logo and the menu cursor.
fn badge(color: RgbColor) -> PixMap {
    let mut pix = PixMap::new(Size::new(16, 16), color);
    for i in 0..16 {
        pix.set(i, 0, RgbColor::WHITE);
        pix.set(i, 15, RgbColor::WHITE);
        pix.set(0, i, RgbColor::WHITE);
        pix.set(15, i, RgbColor::WHITE);
    }
    pix
}

pub struct Splash {
    duration: Ticks,
    until: Option<WallTime>,
    logo: Option<Texture>,
}

impl Splash {
    pub fn new(duration: Ticks) -> Self {
        Self {
            duration,
            until: None,
            logo: None,
        }
    }

    fn finish(&mut self, ctx: &mut CardCtx) {
        self.until = None;
        ctx.pop();
        ctx.push(Box::new(MainMenu::new()));
    }
}

impl Card for Splash {
    fn become_front(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
        if self.logo.is_none() {
            self.logo = Some(ctx.video().texture("logo", &badge(ACCENT), 1)?);
            self.until = Some(ctx.now() + self.duration);
        }
        Ok(())
    }

    fn draw(&self, _below: Below<'_>, video: &mut dyn VideoDriver) {
        let screen = video.screen_size().as_rect();
        video.fill_rect(screen, RgbColor::BLACK);
        if let Some(logo) = &self.logo {
            let c = screen.center();
            logo.draw(Rect::new(c.x - 32, c.y - 32, c.x + 32, c.y + 32));
        }
    }

    fn next_timer(&self) -> Option<WallTime> {
        self.until
    }

    fn fire_timer(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
        info!("splash done at {}", ctx.now().usecs());
        self.finish(ctx);
        Ok(())
    }

    fn key_down(&mut self, ctx: &mut CardCtx, _event: &KeyEvent) -> DeckResult<()> {
        self.finish(ctx);
        Ok(())
    }

    fn mouse_down(&mut self, ctx: &mut CardCtx, _event: &MouseButtonEvent) -> DeckResult<()> {
        self.finish(ctx);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MenuItem {
    Play,
    Options,
    Quit,
}

const ITEMS: [MenuItem; 3] = [MenuItem::Play, MenuItem::Options, MenuItem::Quit];

pub struct MainMenu {
    selected: usize,
    cursor: Option<Texture>,
}

impl MainMenu {
    pub fn new() -> Self {
        Self {
            selected: 0,
            cursor: None,
        }
    }

    fn item_rect(screen: Rect, index: usize) -> Rect {
        let c = screen.center();
        let top = c.y - 60 + index as i32 * 40;
        Rect::new(c.x - 100, top, c.x + 100, top + 30)
    }

    fn activate(&mut self, ctx: &mut CardCtx, item: MenuItem) {
        match item {
            MenuItem::Play => info!("play selected"),
            MenuItem::Options => {
                ctx.push(Box::new(Options::new()));
            }
            MenuItem::Quit => ctx.pop(),
        }
    }
}

impl Card for MainMenu {
    fn become_front(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
        if self.cursor.is_none() {
            self.cursor = Some(ctx.video().texture("cursor", &badge(DIM), 2)?);
        }
        Ok(())
    }

    fn draw(&self, _below: Below<'_>, video: &mut dyn VideoDriver) {
        let screen = video.screen_size().as_rect();
        {
            let mut rects = Rects::new(video);
            rects.fill(screen, BACKGROUND);
            for (i, _) in ITEMS.iter().enumerate() {
                let color = if i == self.selected { ACCENT } else { DIM };
                rects.fill(Self::item_rect(screen, i), color);
            }
        }
        if let Some(cursor) = &self.cursor {
            let r = Self::item_rect(screen, self.selected);
            cursor.draw_at(Point::new(r.left - 16, r.top + 7));
        }
    }

    fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
        match event.key {
            Key::UP => self.selected = (self.selected + ITEMS.len() - 1) % ITEMS.len(),
            Key::DOWN => self.selected = (self.selected + 1) % ITEMS.len(),
            Key::RETURN | Key::SPACE => self.activate(ctx, ITEMS[self.selected]),
            Key::O => self.activate(ctx, MenuItem::Options),
            Key::Q => self.activate(ctx, MenuItem::Quit),
            _ => {}
        }
        Ok(())
    }

    fn mouse_down(&mut self, ctx: &mut CardCtx, event: &MouseButtonEvent) -> DeckResult<()> {
        let screen = ctx.video().screen_size().as_rect();
        if let Some(i) = (0..ITEMS.len()).find(|&i| Self::item_rect(screen, i).contains(event.point)) {
            self.selected = i;
            if event.count >= 2 {
                self.activate(ctx, ITEMS[i]);
            }
        }
        Ok(())
    }
}

/// Panel drawn over whatever is below it.
pub struct Options {
    sound: bool,
}

impl Options {
    pub fn new() -> Self {
        Self { sound: true }
    }
}

impl Card for Options {
    fn draw(&self, below: Below<'_>, video: &mut dyn VideoDriver) {
        let screen = video.screen_size().as_rect();
        if below.is_empty() {
            video.fill_rect(screen, RgbColor::BLACK);
        } else {
            below.draw(video);
            video.dither_rect(screen, RgbColor::BLACK);
        }
        let panel = screen.inset(screen.width() / 4, screen.height() / 4);
        video.fill_rect(panel, BACKGROUND);
        let c = panel.center();
        let toggle = Rect::new(c.x - 10, c.y - 10, c.x + 10, c.y + 10);
        if self.sound {
            video.draw_plus(toggle, ACCENT);
        } else {
            video.draw_diamond(toggle, DIM);
        }
    }

    fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
        match event.key {
            Key::ESCAPE | Key::RETURN => ctx.pop(),
            Key::LEFT | Key::RIGHT | Key::SPACE => self.sound = !self.sound,
            _ => {}
        }
        Ok(())
    }
}
