// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

use std::fmt;

/// Virtual key code. Letters and digits use their ASCII codes,
/// other keys live above 0x7f.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key(pub u8);

impl Key {
    pub const BACKSPACE: Key = Key(0x08);
    pub const TAB: Key = Key(0x09);
    pub const RETURN: Key = Key(0x0d);
    pub const ESCAPE: Key = Key(0x1b);
    pub const SPACE: Key = Key(0x20);
    pub const A: Key = Key(b'A');
    pub const C: Key = Key(b'C');
    pub const K: Key = Key(b'K');
    pub const O: Key = Key(b'O');
    pub const Q: Key = Key(b'Q');
    pub const S: Key = Key(b'S');
    pub const UP: Key = Key(0x80);
    pub const DOWN: Key = Key(0x81);
    pub const LEFT: Key = Key(0x82);
    pub const RIGHT: Key = Key(0x83);
    pub const SHIFT: Key = Key(0x84);
    pub const CONTROL: Key = Key(0x85);
    pub const OPTION: Key = Key(0x86);
    pub const COMMAND: Key = Key(0x87);
    pub const CAPS_LOCK: Key = Key(0x88);
    pub const F1: Key = Key(0x90);

    const NAMED: [(Key, &'static str); 15] = [
        (Key::BACKSPACE, "backspace"),
        (Key::TAB, "tab"),
        (Key::RETURN, "return"),
        (Key::ESCAPE, "escape"),
        (Key::SPACE, "space"),
        (Key::UP, "up"),
        (Key::DOWN, "down"),
        (Key::LEFT, "left"),
        (Key::RIGHT, "right"),
        (Key::SHIFT, "shift"),
        (Key::CONTROL, "control"),
        (Key::OPTION, "option"),
        (Key::COMMAND, "command"),
        (Key::CAPS_LOCK, "capslock"),
        (Key::F1, "f1"),
    ];

    /// Key for a letter or digit, case-insensitive.
    pub fn from_char(c: char) -> Option<Key> {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            Some(Key(c as u8))
        } else {
            None
        }
    }

    /// Parses names as printed by `name()`, e.g. "Q" or "return".
    pub fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Key::from_char(c);
        }
        let lower = name.to_ascii_lowercase();
        Key::NAMED
            .iter()
            .find(|(_, n)| *n == lower)
            .map(|(k, _)| *k)
    }

    pub fn name(self) -> String {
        if self.0.is_ascii_uppercase() || self.0.is_ascii_digit() {
            return (self.0 as char).to_string();
        }
        match Key::NAMED.iter().find(|(k, _)| *k == self) {
            Some((_, n)) => n.to_string(),
            None => format!("key{:02x}", self.0),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Set of keys currently held down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyMap {
    bits: [u64; 4],
}

impl KeyMap {
    pub fn get(&self, key: Key) -> bool {
        let k = key.0 as usize;
        self.bits[k / 64] & (1 << (k % 64)) != 0
    }

    pub fn set(&mut self, key: Key, down: bool) {
        let k = key.0 as usize;
        if down {
            self.bits[k / 64] |= 1 << (k % 64);
        } else {
            self.bits[k / 64] &= !(1 << (k % 64));
        }
    }

    pub fn any(&self) -> bool {
        self.bits.iter().any(|b| *b != 0)
    }

    pub fn clear(&mut self) {
        self.bits = [0; 4];
    }

    /// Keys pressed here but not in `other`.
    pub fn newly_pressed(&self, other: &KeyMap) -> KeyMap {
        let mut bits = [0; 4];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = self.bits[i] & !other.bits[i];
        }
        KeyMap { bits }
    }
}
