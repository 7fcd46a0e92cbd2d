// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Recorded input: replay data, the InputSource boundary and a recorder.
//!
//! A replay is a chapter id, the seed the game ran with, and a list of
//! items: wait N ticks, key down, key up. Files are bincode encoded.
//! Saving writes a temp file and renames it, so a failed save never
//! clobbers an existing replay.

use crate::error::{DeckError, DeckResult};
use crate::event::{Event, EventReceiver, Key, KeyEvent, KeyMap};
use crate::scheduler::EventScheduler;
use crate::time::Ticks;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayItem {
    Wait(u32),
    KeyDown(u8),
    KeyUp(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplayData {
    pub chapter_id: i32,
    pub global_seed: i32,
    pub items: Vec<ReplayItem>,
}

impl ReplayData {
    pub fn new(chapter_id: i32, global_seed: i32) -> Self {
        Self {
            chapter_id,
            global_seed,
            items: vec![],
        }
    }

    /// Adds `ticks` of waiting, merging with a trailing wait.
    pub fn wait(&mut self, ticks: u32) {
        if ticks == 0 {
            return;
        }
        if let Some(ReplayItem::Wait(w)) = self.items.last_mut() {
            *w = w.saturating_add(ticks);
        } else {
            self.items.push(ReplayItem::Wait(ticks));
        }
    }

    pub fn key_down(&mut self, key: Key) {
        self.items.push(ReplayItem::KeyDown(key.0));
    }

    pub fn key_up(&mut self, key: Key) {
        self.items.push(ReplayItem::KeyUp(key.0));
    }

    /// Total ticks the replay covers.
    pub fn duration(&self) -> Ticks {
        Ticks(
            self.items
                .iter()
                .map(|i| match i {
                    ReplayItem::Wait(w) => *w as i64,
                    _ => 0,
                })
                .sum(),
        )
    }

    pub fn encode(&self) -> DeckResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| DeckError::Replay(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> DeckResult<Self> {
        let (data, used): (ReplayData, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| DeckError::Replay(e.to_string()))?;
        if used != bytes.len() {
            return Err(DeckError::Replay(format!(
                "{} trailing bytes after replay data",
                bytes.len() - used
            )));
        }
        if let Some(i) = data.items.iter().position(|i| *i == ReplayItem::Wait(0)) {
            return Err(DeckError::Replay(format!("zero-length wait at item {}", i)));
        }
        Ok(data)
    }

    pub fn load(path: &Path) -> DeckResult<Self> {
        let bytes = fs::read(path)?;
        let data = Self::decode(&bytes)?;
        info!(
            "loaded replay {}: chapter {}, {} items",
            path.display(),
            data.chapter_id,
            data.items.len()
        );
        Ok(data)
    }

    pub fn save(&self, path: &Path) -> DeckResult<()> {
        let bytes = self.encode()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Producer of input for a running game, one call per virtual tick.
pub trait InputSource {
    fn start(&mut self) {}

    /// Delivers this tick's input to `receiver`. `false` means the source is
    /// exhausted and should not be asked again.
    fn get(&mut self, at: Ticks, receiver: &mut dyn EventReceiver) -> DeckResult<bool>;
}

/// Plays back recorded key transitions.
pub struct ReplayInputSource {
    data: ReplayData,
    index: usize,
    wait: u32,
    keys: KeyMap,
    exit: bool,
}

impl ReplayInputSource {
    pub fn new(data: ReplayData) -> Self {
        Self {
            data,
            index: 0,
            wait: 0,
            keys: KeyMap::default(),
            exit: false,
        }
    }

    /// Keys held down as of the last `get`.
    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    /// Stops the source; later `get` calls report exhaustion.
    pub fn exit(&mut self) {
        self.exit = true;
    }

    /// Applies key items up to the next wait. False when items ran out.
    fn advance(&mut self, at: Ticks, receiver: &mut dyn EventReceiver) -> DeckResult<bool> {
        while let Some(item) = self.data.items.get(self.index).copied() {
            self.index += 1;
            let when = at.to_wall();
            match item {
                ReplayItem::Wait(0) => {}
                ReplayItem::Wait(w) => {
                    self.wait = w;
                    return Ok(true);
                }
                ReplayItem::KeyDown(k) => {
                    self.keys.set(Key(k), true);
                    receiver.key_down(&KeyEvent { at: when, key: Key(k) })?;
                }
                ReplayItem::KeyUp(k) => {
                    self.keys.set(Key(k), false);
                    receiver.key_up(&KeyEvent { at: when, key: Key(k) })?;
                }
            }
        }
        Ok(false)
    }
}

impl InputSource for ReplayInputSource {
    fn start(&mut self) {
        self.index = 0;
        self.wait = 0;
        self.keys.clear();
        self.exit = false;
    }

    fn get(&mut self, at: Ticks, receiver: &mut dyn EventReceiver) -> DeckResult<bool> {
        if self.exit {
            return Ok(false);
        }
        if self.wait == 0 && !self.advance(at, receiver)? {
            self.exit = true;
            return Ok(false);
        }
        self.wait -= 1;
        Ok(true)
    }
}

/// Records key events into replay data, one `tick` call per virtual tick.
pub struct ReplayBuilder {
    data: ReplayData,
    pending_wait: u32,
}

impl ReplayBuilder {
    pub fn new(chapter_id: i32, global_seed: i32) -> Self {
        Self {
            data: ReplayData::new(chapter_id, global_seed),
            pending_wait: 0,
        }
    }

    /// Seeded from the thread rng, for recording fresh games.
    pub fn with_random_seed(chapter_id: i32) -> Self {
        Self::new(chapter_id, rand::random::<i32>())
    }

    pub fn tick(&mut self) {
        self.pending_wait += 1;
    }

    fn flush_wait(&mut self) {
        self.data.wait(self.pending_wait);
        self.pending_wait = 0;
    }

    pub fn finish(mut self) -> ReplayData {
        self.flush_wait();
        self.data
    }
}

impl EventReceiver for ReplayBuilder {
    fn key_down(&mut self, event: &KeyEvent) -> DeckResult<()> {
        self.flush_wait();
        self.data.key_down(event.key);
        Ok(())
    }

    fn key_up(&mut self, event: &KeyEvent) -> DeckResult<()> {
        self.flush_wait();
        self.data.key_up(event.key);
        Ok(())
    }
}

impl EventScheduler {
    /// Schedules the key transitions of `replay` starting at `start`.
    /// Returns the tick the replay ends at.
    pub fn schedule_replay(&mut self, replay: &ReplayData, start: Ticks) -> Ticks {
        let mut at = start;
        for item in &replay.items {
            match *item {
                ReplayItem::Wait(w) => at = at + Ticks(w as i64),
                ReplayItem::KeyDown(k) => self.schedule_event(Event::key_down(at.to_wall(), Key(k))),
                ReplayItem::KeyUp(k) => self.schedule_event(Event::key_up(at.to_wall(), Key(k))),
            }
        }
        at
    }
}
