// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

use pixel_deck::card::{Below, Card, CardCtx};
use pixel_deck::event::{Key, KeyEvent};
use pixel_deck::render::adapter::text::{TextMainLoop, TextVideoDriver};
use pixel_deck::render::adapter::VideoDriver;
use pixel_deck::render::RgbColor;
use pixel_deck::replay::ReplayData;
use pixel_deck::scheduler::{EventScheduler, MainLoop};
use pixel_deck::time::{Ticks, WallTime};
use pixel_deck::util::{Point, Rect, Size};
use pixel_deck::DeckResult;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

type Journal = Rc<RefCell<Vec<String>>>;

/// Paints a backdrop, counts key presses, pops itself on Q.
struct Board {
    presses: i32,
    journal: Journal,
}

impl Board {
    fn boxed(journal: &Journal) -> Box<dyn Card> {
        Box::new(Board {
            presses: 0,
            journal: journal.clone(),
        })
    }
}

impl Card for Board {
    fn draw(&self, _below: Below<'_>, video: &mut dyn VideoDriver) {
        video.fill_rect(Rect::new(0, 0, 640, 480), RgbColor::new(16, 32, 48));
        video.draw_point(Point::new(self.presses, 0), RgbColor::WHITE);
    }

    fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
        self.journal
            .borrow_mut()
            .push(format!("key {} at {}", event.key, ctx.now().usecs()));
        self.presses += 1;
        if event.key == Key::Q {
            ctx.pop();
        }
        Ok(())
    }
}

fn text_loop(scheduler: &EventScheduler, dir: &Path, initial: Box<dyn Card>) -> TextMainLoop {
    let driver = TextVideoDriver::new(Size::new(640, 480), scheduler.handle());
    TextMainLoop::new(driver, Some(dir.to_path_buf()), initial).unwrap()
}

#[test]
fn test_quit_snapshot_shows_frame_before_pop() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_key(Key::Q, Ticks(900), Ticks(901));
    scheduler.schedule_snapshot(Ticks(900));

    let mut main_loop = text_loop(&scheduler, dir.path(), Board::boxed(&journal));
    scheduler.run(&mut main_loop).unwrap();

    let frame = fs::read_to_string(dir.path().join("screens/000900.txt")).unwrap();
    assert_eq!(frame, "rect\t0\t0\t640\t480\t102030\npoint\t0\t0\tffffff\n");
    assert!(main_loop.stack().empty());
    assert!(main_loop.done());
    assert_eq!(
        *journal.borrow(),
        vec![format!("key Q at {}", Ticks(900).to_wall().usecs())]
    );
}

/// Records draw and snapshot calls around a text loop.
struct Recording {
    inner: TextMainLoop,
    journal: Journal,
}

impl MainLoop for Recording {
    fn takes_snapshots(&self) -> bool {
        true
    }

    fn snapshot(&mut self, ticks: Ticks) -> DeckResult<()> {
        self.journal.borrow_mut().push(format!("snapshot {}", ticks));
        Ok(())
    }

    fn draw(&mut self) {
        self.journal.borrow_mut().push("draw".to_string());
        self.inner.draw();
    }

    fn done(&self) -> bool {
        self.inner.done()
    }

    fn top(&self) -> Option<&dyn Card> {
        self.inner.top()
    }

    fn parts(&mut self) -> (&mut pixel_deck::card::CardStack, &mut dyn VideoDriver) {
        self.inner.parts()
    }
}

#[test]
fn test_snapshot_lands_between_events() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_key(Key::A, Ticks(5), Ticks(6));
    scheduler.schedule_key(Key::Q, Ticks(15), Ticks(16));
    scheduler.schedule_snapshot(Ticks(10));

    let inner = text_loop(&scheduler, dir.path(), Board::boxed(&journal));
    let mut main_loop = Recording {
        inner,
        journal: journal.clone(),
    };
    scheduler.run(&mut main_loop).unwrap();

    assert_eq!(
        *journal.borrow(),
        vec![
            format!("key A at {}", Ticks(5).to_wall().usecs()),
            "draw".to_string(),
            "snapshot 10".to_string(),
            format!("key Q at {}", Ticks(15).to_wall().usecs()),
        ]
    );
}

/// Blinks on a timer; stops after a fixed number of blinks.
struct Blinker {
    next: Option<WallTime>,
    left: u32,
    on: bool,
}

impl Card for Blinker {
    fn become_front(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
        self.next = Some(ctx.now() + Ticks(7));
        Ok(())
    }

    fn draw(&self, _below: Below<'_>, video: &mut dyn VideoDriver) {
        let color = if self.on { RgbColor::WHITE } else { RgbColor::BLACK };
        video.fill_rect(Rect::new(0, 0, 640, 480), color);
        video.draw_line(Point::new(0, 0), Point::new(self.left as i32, 9), color);
    }

    fn next_timer(&self) -> Option<WallTime> {
        self.next
    }

    fn fire_timer(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
        self.on = !self.on;
        self.left -= 1;
        if self.left == 0 {
            self.next = None;
            ctx.pop();
        } else {
            self.next = Some(ctx.now() + Ticks(7));
        }
        Ok(())
    }

    fn key_down(&mut self, _ctx: &mut CardCtx, _event: &KeyEvent) -> DeckResult<()> {
        self.on = true;
        Ok(())
    }
}

fn blink_run(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut scheduler = EventScheduler::new();
    for t in [3, 20, 33] {
        scheduler.schedule_key(Key::SPACE, Ticks(t), Ticks(t + 2));
    }
    for t in (0..60).step_by(6) {
        scheduler.schedule_snapshot(Ticks(t));
    }
    let blinker = Box::new(Blinker {
        next: None,
        left: 8,
        on: false,
    });
    let mut main_loop = text_loop(&scheduler, dir, blinker);
    scheduler.run(&mut main_loop).unwrap();

    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(dir.join("screens"))
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (
                e.file_name().to_string_lossy().into_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_text_runs_are_deterministic() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = blink_run(a.path());
    let second = blink_run(b.path());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_replay_drives_cards() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = ReplayData::new(1, 7);
    data.wait(10);
    data.key_down(Key::A);
    data.wait(1);
    data.key_up(Key::A);
    data.wait(20);
    data.key_down(Key::Q);
    data.wait(1);
    data.key_up(Key::Q);
    let path = dir.path().join("run.rep");
    data.save(&path).unwrap();

    let loaded = ReplayData::load(&path).unwrap();
    assert_eq!(loaded, data);

    let journal = Journal::default();
    let mut scheduler = EventScheduler::strict();
    let end = scheduler.schedule_replay(&loaded, Ticks(1));
    assert_eq!(end, Ticks(33));
    let mut main_loop = text_loop(&scheduler, dir.path(), Board::boxed(&journal));
    scheduler.run(&mut main_loop).unwrap();
    assert_eq!(
        *journal.borrow(),
        vec![
            format!("key A at {}", Ticks(11).to_wall().usecs()),
            format!("key Q at {}", Ticks(32).to_wall().usecs()),
        ]
    );
}
