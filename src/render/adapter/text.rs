// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Text backend: draws nothing, logs every call.
//!
//! Each call becomes one line `command\targ1\targ2...`. With dedup on,
//! leading fields equal to the same field of the previous line are written
//! empty, up to the first field that differs. That keeps golden files small
//! and diffs readable; `expand_trace` restores the full rows.
//!
//! Texture draws entirely off screen are skipped. Time, mouse and input mode
//! come from the EventScheduler, so a scripted run logs the same frames on
//! every machine.

use super::{scaled_size, Texture, TextureImpl, VideoDriver};
use crate::card::{Card, CardStack};
use crate::error::DeckResult;
use crate::event::InputMode;
use crate::render::{PixMap, RgbColor};
use crate::scheduler::{EventScheduler, MainLoop, SchedulerHandle};
use crate::time::{Ticks, WallTime};
use crate::util::{Point, Rect, Size};
use log::info;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Default)]
struct TextLog {
    buf: String,
    last: Vec<String>,
    dedup: bool,
}

impl TextLog {
    fn emit(&mut self, fields: Vec<String>) {
        let mut same = self.dedup;
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.buf.push('\t');
            }
            same = same && self.last.get(i) == Some(field);
            if !same {
                self.buf.push_str(field);
            }
        }
        self.buf.push('\n');
        self.last = fields;
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.last.clear();
    }
}

/// Undoes the dedup of a text trace.
pub fn expand_trace(trace: &str) -> String {
    let mut out = String::with_capacity(trace.len());
    let mut last: Vec<String> = vec![];
    for line in trace.lines() {
        let mut fields: Vec<String> = vec![];
        let mut inherit = true;
        for (i, field) in line.split('\t').enumerate() {
            inherit = inherit && field.is_empty() && i < last.len();
            if inherit {
                fields.push(last[i].clone());
            } else {
                fields.push(field.to_string());
            }
        }
        let _ = writeln!(out, "{}", fields.join("\t"));
        last = fields;
    }
    out
}

macro_rules! fields {
    ($($arg:expr),* $(,)?) => {
        vec![$($arg.to_string()),*]
    };
}

pub struct TextVideoDriver {
    size: Size,
    clock: SchedulerHandle,
    log: Rc<RefCell<TextLog>>,
}

impl TextVideoDriver {
    pub fn new(size: Size, clock: SchedulerHandle) -> Self {
        Self {
            size,
            clock,
            log: Rc::new(RefCell::new(TextLog {
                dedup: true,
                ..Default::default()
            })),
        }
    }

    pub fn with_dedup(self, dedup: bool) -> Self {
        self.log.borrow_mut().dedup = dedup;
        self
    }

    /// Everything logged since the last clear.
    pub fn log(&self) -> String {
        self.log.borrow().buf.clone()
    }

    pub fn clear_log(&mut self) {
        self.log.borrow_mut().clear();
    }

    fn emit(&self, fields: Vec<String>) {
        self.log.borrow_mut().emit(fields);
    }

    fn shape(&self, cmd: &str, r: Rect, color: RgbColor) {
        self.emit(fields![cmd, r.left, r.top, r.right, r.bottom, color.hex()]);
    }

    /// Runs `initial` on a fresh stack until it is empty. Snapshots go to
    /// `output_dir` when one is given.
    pub fn run(
        self,
        scheduler: &mut EventScheduler,
        output_dir: Option<PathBuf>,
        initial: Box<dyn Card>,
    ) -> DeckResult<()> {
        let mut main_loop = TextMainLoop::new(self, output_dir, initial)?;
        scheduler.run(&mut main_loop)
    }
}

impl VideoDriver for TextVideoDriver {
    fn screen_size(&self) -> Size {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, color: RgbColor) {
        self.shape("rect", rect, color);
    }

    fn dither_rect(&mut self, rect: Rect, color: RgbColor) {
        self.shape("dither", rect, color);
    }

    fn draw_point(&mut self, at: Point, color: RgbColor) {
        self.emit(fields!["point", at.x, at.y, color.hex()]);
    }

    fn draw_line(&mut self, from: Point, to: Point, color: RgbColor) {
        self.emit(fields!["line", from.x, from.y, to.x, to.y, color.hex()]);
    }

    fn draw_triangle(&mut self, rect: Rect, color: RgbColor) {
        self.shape("triangle", rect, color);
    }

    fn draw_diamond(&mut self, rect: Rect, color: RgbColor) {
        self.shape("diamond", rect, color);
    }

    fn draw_plus(&mut self, rect: Rect, color: RgbColor) {
        self.shape("plus", rect, color);
    }

    fn texture(&mut self, name: &str, content: &PixMap, scale: u32) -> DeckResult<Texture> {
        Ok(Texture::new(TextTexture {
            name: name.to_string(),
            size: scaled_size(content, scale),
            screen: self.size.as_rect(),
            log: self.log.clone(),
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

struct TextTexture {
    name: String,
    size: Size,
    screen: Rect,
    log: Rc<RefCell<TextLog>>,
}

impl TextTexture {
    fn emit(&self, rect: Rect, mut fields: Vec<String>) {
        if !self.screen.intersects(rect) {
            return;
        }
        let mut row = fields![fields.remove(0), rect.left, rect.top, rect.right, rect.bottom];
        row.append(&mut fields);
        self.log.borrow_mut().emit(row);
    }
}

impl TextureImpl for TextTexture {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> Size {
        self.size
    }

    fn draw(&self, rect: Rect) {
        self.emit(rect, fields!["draw", self.name]);
    }

    fn draw_cropped(&self, dest: Rect, source: Rect, tint: RgbColor) {
        self.emit(
            dest,
            fields![
                "crop",
                source.left,
                source.top,
                source.right,
                source.bottom,
                self.name,
                tint.hex()
            ],
        );
    }

    fn draw_shaded(&self, rect: Rect, tint: RgbColor) {
        self.emit(rect, fields!["tint", self.name, tint.hex()]);
    }

    fn draw_static(&self, rect: Rect, color: RgbColor, frac: u8) {
        self.emit(rect, fields!["static", self.name, frac, color.hex()]);
    }

    fn draw_outlined(&self, rect: Rect, outline: RgbColor, fill: RgbColor) {
        self.emit(
            rect,
            fields!["outline", self.name, outline.hex(), fill.hex()],
        );
    }
}

/// Scheduler-driven loop over a text driver.
pub struct TextMainLoop {
    driver: TextVideoDriver,
    output_dir: Option<PathBuf>,
    stack: CardStack,
}

impl TextMainLoop {
    pub fn new(
        mut driver: TextVideoDriver,
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

    pub fn driver(&self) -> &TextVideoDriver {
        &self.driver
    }

    pub fn stack(&self) -> &CardStack {
        &self.stack
    }
}

/// `{dir}/screens/{ticks:06}.{ext}`, creating the directory.
pub(crate) fn snapshot_path(dir: &Path, ticks: Ticks, ext: &str) -> DeckResult<PathBuf> {
    let screens = dir.join("screens");
    fs::create_dir_all(&screens)?;
    Ok(screens.join(format!("{:06}.{}", ticks.count(), ext)))
}

impl MainLoop for TextMainLoop {
    fn takes_snapshots(&self) -> bool {
        self.output_dir.is_some()
    }

    fn snapshot(&mut self, ticks: Ticks) -> DeckResult<()> {
        if let Some(dir) = &self.output_dir {
            let path = snapshot_path(dir, ticks, "txt")?;
            fs::write(&path, self.driver.log())?;
            info!("snapshot {}", path.display());
        }
        Ok(())
    }

    fn draw(&mut self) {
        self.driver.clear_log();
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
