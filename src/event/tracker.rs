// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Tracks the state implied by an event stream: mouse position, held
//! buttons and keys, caps lock and the active input mode.
//!
//! A strict tracker treats impossible transitions (a key going down twice,
//! a button released while up) as protocol violations. Replays run strict,
//! live input runs lenient because the OS may drop events on focus changes.

use super::{
    CapsEvent, EventReceiver, GamepadButtonEvent, GamepadStickEvent, Key, KeyEvent, KeyMap,
    MouseButtonEvent, MouseMoveEvent,
};
use crate::error::{DeckError, DeckResult};
use crate::util::Point;
use bitflags::bitflags;
use log::warn;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 0b001;
        const RIGHT = 0b010;
        const MIDDLE = 0b100;
    }
}

impl MouseButtons {
    pub fn from_index(button: u8) -> Option<MouseButtons> {
        match button {
            0 => Some(MouseButtons::LEFT),
            1 => Some(MouseButtons::RIGHT),
            2 => Some(MouseButtons::MIDDLE),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    KeyboardMouse,
    Gamepad,
}

#[derive(Debug, Clone)]
pub struct EventTracker {
    strict: bool,
    buttons: MouseButtons,
    mouse: Point,
    keys: KeyMap,
    caps_lock: bool,
    input_mode: InputMode,
}

impl EventTracker {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            buttons: MouseButtons::empty(),
            mouse: Point::new(-1, -1),
            keys: KeyMap::default(),
            caps_lock: false,
            input_mode: InputMode::KeyboardMouse,
        }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn button(&self, button: u8) -> bool {
        MouseButtons::from_index(button).is_some_and(|b| self.buttons.contains(b))
    }

    pub fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    pub fn mouse(&self) -> Point {
        self.mouse
    }

    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    fn violation(&self, msg: String) -> DeckResult<()> {
        if self.strict {
            Err(DeckError::Input(msg))
        } else {
            warn!("ignored input inconsistency: {}", msg);
            Ok(())
        }
    }

    fn set_key(&mut self, key: Key, down: bool) -> DeckResult<()> {
        self.input_mode = InputMode::KeyboardMouse;
        if self.keys.get(key) == down {
            let state = if down { "down" } else { "up" };
            self.violation(format!("key {} is already {}", key, state))?;
        }
        self.keys.set(key, down);
        Ok(())
    }

    fn set_button(&mut self, button: u8, down: bool, at: Point) -> DeckResult<()> {
        self.input_mode = InputMode::KeyboardMouse;
        self.mouse = at;
        let Some(flag) = MouseButtons::from_index(button) else {
            return self.violation(format!("no such mouse button {}", button));
        };
        if self.buttons.contains(flag) == down {
            let state = if down { "down" } else { "up" };
            self.violation(format!("mouse button {} is already {}", button, state))?;
        }
        self.buttons.set(flag, down);
        Ok(())
    }
}

impl EventReceiver for EventTracker {
    fn key_down(&mut self, event: &KeyEvent) -> DeckResult<()> {
        self.set_key(event.key, true)
    }

    fn key_up(&mut self, event: &KeyEvent) -> DeckResult<()> {
        self.set_key(event.key, false)
    }

    fn gamepad_button_down(&mut self, _event: &GamepadButtonEvent) -> DeckResult<()> {
        self.input_mode = InputMode::Gamepad;
        Ok(())
    }

    fn gamepad_button_up(&mut self, _event: &GamepadButtonEvent) -> DeckResult<()> {
        self.input_mode = InputMode::Gamepad;
        Ok(())
    }

    fn gamepad_stick(&mut self, _event: &GamepadStickEvent) -> DeckResult<()> {
        self.input_mode = InputMode::Gamepad;
        Ok(())
    }

    fn mouse_down(&mut self, event: &MouseButtonEvent) -> DeckResult<()> {
        self.set_button(event.button, true, event.point)
    }

    fn mouse_up(&mut self, event: &MouseButtonEvent) -> DeckResult<()> {
        self.set_button(event.button, false, event.point)
    }

    fn mouse_move(&mut self, event: &MouseMoveEvent) -> DeckResult<()> {
        self.mouse = event.point;
        Ok(())
    }

    fn caps_lock(&mut self, _event: &CapsEvent) -> DeckResult<()> {
        self.caps_lock = true;
        Ok(())
    }

    fn caps_unlock(&mut self, _event: &CapsEvent) -> DeckResult<()> {
        self.caps_lock = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::time::WallTime;

    #[test]
    fn test_tracks_mouse_and_buttons() {
        let mut t = EventTracker::new(true);
        assert_eq!(t.mouse(), Point::new(-1, -1));
        Event::mouse_down(WallTime(0), 0, 1, Point::new(3, 4))
            .send(&mut t)
            .unwrap();
        assert!(t.button(0));
        assert_eq!(t.mouse(), Point::new(3, 4));
        Event::mouse_move(WallTime(1), Point::new(8, 9))
            .send(&mut t)
            .unwrap();
        assert_eq!(t.mouse(), Point::new(8, 9));
        Event::mouse_up(WallTime(2), 0, Point::new(8, 9))
            .send(&mut t)
            .unwrap();
        assert!(t.buttons().is_empty());
    }

    #[test]
    fn test_strict_rejects_double_key_down() {
        let mut t = EventTracker::new(true);
        Event::key_down(WallTime(0), Key::Q).send(&mut t).unwrap();
        let err = Event::key_down(WallTime(1), Key::Q).send(&mut t);
        assert!(matches!(err, Err(DeckError::Input(_))));
        let mut t = EventTracker::new(true);
        assert!(Event::key_up(WallTime(0), Key::Q).send(&mut t).is_err());
    }

    #[test]
    fn test_lenient_accepts_double_key_down() {
        let mut t = EventTracker::new(false);
        Event::key_down(WallTime(0), Key::Q).send(&mut t).unwrap();
        Event::key_down(WallTime(1), Key::Q).send(&mut t).unwrap();
        assert!(t.keys().get(Key::Q));
        Event::mouse_down(WallTime(2), 7, 1, Point::new(0, 0))
            .send(&mut t)
            .unwrap();
    }

    #[test]
    fn test_input_mode_follows_device() {
        let mut t = EventTracker::new(false);
        let pad = Event::GamepadButtonDown(GamepadButtonEvent {
            at: WallTime(0),
            button: 1,
        });
        pad.send(&mut t).unwrap();
        assert_eq!(t.input_mode(), InputMode::Gamepad);
        Event::key_down(WallTime(1), Key::A).send(&mut t).unwrap();
        assert_eq!(t.input_mode(), InputMode::KeyboardMouse);
        Event::CapsLock(CapsEvent { at: WallTime(2) })
            .send(&mut t)
            .unwrap();
        assert!(t.caps_lock());
    }
}
