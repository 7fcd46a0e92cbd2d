// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Input events and the receiver trait that consumes them.
//!
//! Every event is an immutable value stamped with the wall time it happened at.
//! Events come from the live platform translator, from a replay decoder or from
//! test scripts scheduled on the EventScheduler. Dispatch happens through
//! `Event::send`, which calls the matching `EventReceiver` handler.

use crate::error::DeckResult;
use crate::time::WallTime;
use crate::util::Point;

mod keys;
pub use keys::*;
mod tracker;
pub use tracker::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub at: WallTime,
    pub key: Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub at: WallTime,
    /// 0 left, 1 right, 2 middle
    pub button: u8,
    /// 2 for a double click, 1 otherwise
    pub count: u32,
    pub point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMoveEvent {
    pub at: WallTime,
    pub point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamepadButtonEvent {
    pub at: WallTime,
    pub button: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamepadStickEvent {
    pub at: WallTime,
    pub stick: u8,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapsEvent {
    pub at: WallTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    GamepadButtonDown(GamepadButtonEvent),
    GamepadButtonUp(GamepadButtonEvent),
    GamepadStick(GamepadStickEvent),
    MouseDown(MouseButtonEvent),
    MouseUp(MouseButtonEvent),
    MouseMove(MouseMoveEvent),
    CapsLock(CapsEvent),
    CapsUnlock(CapsEvent),
}

impl Event {
    pub fn key_down(at: WallTime, key: Key) -> Event {
        Event::KeyDown(KeyEvent { at, key })
    }

    pub fn key_up(at: WallTime, key: Key) -> Event {
        Event::KeyUp(KeyEvent { at, key })
    }

    pub fn mouse_down(at: WallTime, button: u8, count: u32, point: Point) -> Event {
        Event::MouseDown(MouseButtonEvent {
            at,
            button,
            count,
            point,
        })
    }

    pub fn mouse_up(at: WallTime, button: u8, point: Point) -> Event {
        Event::MouseUp(MouseButtonEvent {
            at,
            button,
            count: 1,
            point,
        })
    }

    pub fn mouse_move(at: WallTime, point: Point) -> Event {
        Event::MouseMove(MouseMoveEvent { at, point })
    }

    pub fn at(&self) -> WallTime {
        match self {
            Event::KeyDown(e) | Event::KeyUp(e) => e.at,
            Event::GamepadButtonDown(e) | Event::GamepadButtonUp(e) => e.at,
            Event::GamepadStick(e) => e.at,
            Event::MouseDown(e) | Event::MouseUp(e) => e.at,
            Event::MouseMove(e) => e.at,
            Event::CapsLock(e) | Event::CapsUnlock(e) => e.at,
        }
    }

    /// Position carried by mouse events.
    pub fn point(&self) -> Option<Point> {
        match self {
            Event::MouseDown(e) | Event::MouseUp(e) => Some(e.point),
            Event::MouseMove(e) => Some(e.point),
            _ => None,
        }
    }

    /// Dispatch to the handler matching this event's kind.
    pub fn send(&self, receiver: &mut dyn EventReceiver) -> DeckResult<()> {
        match self {
            Event::KeyDown(e) => receiver.key_down(e),
            Event::KeyUp(e) => receiver.key_up(e),
            Event::GamepadButtonDown(e) => receiver.gamepad_button_down(e),
            Event::GamepadButtonUp(e) => receiver.gamepad_button_up(e),
            Event::GamepadStick(e) => receiver.gamepad_stick(e),
            Event::MouseDown(e) => receiver.mouse_down(e),
            Event::MouseUp(e) => receiver.mouse_up(e),
            Event::MouseMove(e) => receiver.mouse_move(e),
            Event::CapsLock(e) => receiver.caps_lock(e),
            Event::CapsUnlock(e) => receiver.caps_unlock(e),
        }
    }
}

/// Anything that observes input. All handlers default to doing nothing;
/// an `Err` means a protocol violation, never routine input.
pub trait EventReceiver {
    fn key_down(&mut self, _event: &KeyEvent) -> DeckResult<()> {
        Ok(())
    }
    fn key_up(&mut self, _event: &KeyEvent) -> DeckResult<()> {
        Ok(())
    }
    fn gamepad_button_down(&mut self, _event: &GamepadButtonEvent) -> DeckResult<()> {
        Ok(())
    }
    fn gamepad_button_up(&mut self, _event: &GamepadButtonEvent) -> DeckResult<()> {
        Ok(())
    }
    fn gamepad_stick(&mut self, _event: &GamepadStickEvent) -> DeckResult<()> {
        Ok(())
    }
    fn mouse_down(&mut self, _event: &MouseButtonEvent) -> DeckResult<()> {
        Ok(())
    }
    fn mouse_up(&mut self, _event: &MouseButtonEvent) -> DeckResult<()> {
        Ok(())
    }
    fn mouse_move(&mut self, _event: &MouseMoveEvent) -> DeckResult<()> {
        Ok(())
    }
    fn caps_lock(&mut self, _event: &CapsEvent) -> DeckResult<()> {
        Ok(())
    }
    fn caps_unlock(&mut self, _event: &CapsEvent) -> DeckResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl EventReceiver for Recorder {
        fn key_down(&mut self, e: &KeyEvent) -> DeckResult<()> {
            self.seen.push(format!("down {}", e.key.name()));
            Ok(())
        }
        fn mouse_move(&mut self, e: &MouseMoveEvent) -> DeckResult<()> {
            self.seen.push(format!("move {} {}", e.point.x, e.point.y));
            Ok(())
        }
    }

    #[test]
    fn test_send_routes_by_kind() {
        let mut r = Recorder::default();
        Event::key_down(WallTime(1), Key::Q).send(&mut r).unwrap();
        Event::key_up(WallTime(2), Key::Q).send(&mut r).unwrap();
        Event::mouse_move(WallTime(3), Point::new(4, 5))
            .send(&mut r)
            .unwrap();
        assert_eq!(r.seen, vec!["down Q", "move 4 5"]);
    }

    #[test]
    fn test_at_and_point() {
        let e = Event::mouse_down(WallTime(7), 0, 2, Point::new(1, 1));
        assert_eq!(e.at(), WallTime(7));
        assert_eq!(e.point(), Some(Point::new(1, 1)));
        assert_eq!(Event::key_up(WallTime(9), Key::S).point(), None);
    }
}
