// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Card and CardStack: the screen flow of the game.
//!
//! A card is one interactive screen or state machine node (menu, briefing,
//! play, dialog). Cards live on a strictly linear stack and only the top one
//! is frontmost: it receives input, timers and draw calls. Everything below
//! is suspended until the cards above it are popped.
//!
//! Lifecycle order is fixed:
//!
//! - push: `resign_front` on the old top, link the new card, `become_front` on it
//! - pop: `resign_front` on the card, unlink and drop it, `become_front` on the new top
//!
//! Cards change the stack from inside their own callbacks through `CardCtx`.
//! Requests are applied in call order as soon as the callback returns; requests
//! made by the callbacks those changes trigger are applied before later ones,
//! so the lifecycle sequence reads exactly like nested calls would.

use crate::error::{DeckError, DeckResult};
use crate::event::{
    CapsEvent, Event, EventReceiver, GamepadButtonEvent, GamepadStickEvent, KeyEvent,
    MouseButtonEvent, MouseMoveEvent,
};
use crate::render::adapter::VideoDriver;
use crate::time::WallTime;
use log::debug;
use std::collections::VecDeque;
use std::fmt;

/// Identity of a card for the time it is on a stack.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One screen of the flow. Override only what the screen needs.
pub trait Card {
    fn become_front(&mut self, _ctx: &mut CardCtx) -> DeckResult<()> {
        Ok(())
    }

    fn resign_front(&mut self, _ctx: &mut CardCtx) -> DeckResult<()> {
        Ok(())
    }

    /// Draws the card. The default shows whatever is below, so an overlay
    /// that does not draw is transparent.
    fn draw(&self, below: Below<'_>, video: &mut dyn VideoDriver) {
        below.draw(video);
    }

    /// Wall time the card wants `fire_timer` called at, if any.
    fn next_timer(&self) -> Option<WallTime> {
        None
    }

    fn fire_timer(&mut self, _ctx: &mut CardCtx) -> DeckResult<()> {
        Ok(())
    }

    fn key_down(&mut self, _ctx: &mut CardCtx, _event: &KeyEvent) -> DeckResult<()> {
        Ok(())
    }

    fn key_up(&mut self, _ctx: &mut CardCtx, _event: &KeyEvent) -> DeckResult<()> {
        Ok(())
    }

    fn gamepad_button_down(
        &mut self,
        _ctx: &mut CardCtx,
        _event: &GamepadButtonEvent,
    ) -> DeckResult<()> {
        Ok(())
    }

    fn gamepad_button_up(
        &mut self,
        _ctx: &mut CardCtx,
        _event: &GamepadButtonEvent,
    ) -> DeckResult<()> {
        Ok(())
    }

    fn gamepad_stick(&mut self, _ctx: &mut CardCtx, _event: &GamepadStickEvent) -> DeckResult<()> {
        Ok(())
    }

    fn mouse_down(&mut self, _ctx: &mut CardCtx, _event: &MouseButtonEvent) -> DeckResult<()> {
        Ok(())
    }

    fn mouse_up(&mut self, _ctx: &mut CardCtx, _event: &MouseButtonEvent) -> DeckResult<()> {
        Ok(())
    }

    fn mouse_move(&mut self, _ctx: &mut CardCtx, _event: &MouseMoveEvent) -> DeckResult<()> {
        Ok(())
    }

    fn caps_lock(&mut self, _ctx: &mut CardCtx, _event: &CapsEvent) -> DeckResult<()> {
        Ok(())
    }

    fn caps_unlock(&mut self, _ctx: &mut CardCtx, _event: &CapsEvent) -> DeckResult<()> {
        Ok(())
    }
}

/// The part of the stack under the card being drawn.
#[derive(Clone, Copy)]
pub struct Below<'a>(Option<&'a Slot>);

impl Below<'_> {
    pub fn draw(self, video: &mut dyn VideoDriver) {
        if let Some(slot) = self.0 {
            slot.card.draw(Below(slot.next.as_deref()), video);
        }
    }

    pub fn is_empty(self) -> bool {
        self.0.is_none()
    }
}

enum StackOp {
    Push(CardId, Box<dyn Card>),
    Pop(CardId),
}

/// Handed to card callbacks: the driver, and a way to change the stack.
pub struct CardCtx<'a> {
    id: CardId,
    video: &'a mut dyn VideoDriver,
    next_id: &'a mut u64,
    ops: &'a mut Vec<StackOp>,
}

impl<'a> CardCtx<'a> {
    /// The card this callback was made on.
    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn video(&mut self) -> &mut dyn VideoDriver {
        &mut *self.video
    }

    pub fn now(&self) -> WallTime {
        self.video.now()
    }

    /// Pushes `card` on top of the stack once the callback returns.
    pub fn push(&mut self, card: Box<dyn Card>) -> CardId {
        let id = CardId(*self.next_id);
        *self.next_id += 1;
        self.ops.push(StackOp::Push(id, card));
        id
    }

    /// Pops the calling card once the callback returns.
    pub fn pop(&mut self) {
        self.ops.push(StackOp::Pop(self.id));
    }

    /// Pops `id`, which must be frontmost when the request is applied.
    pub fn pop_card(&mut self, id: CardId) {
        self.ops.push(StackOp::Pop(id));
    }
}

struct Slot {
    id: CardId,
    card: Box<dyn Card>,
    next: Option<Box<Slot>>,
}

/// Owns the top card; each card's slot owns the one below it.
pub struct CardStack {
    top: Option<Box<Slot>>,
    len: usize,
    next_id: u64,
}

impl CardStack {
    /// A stack holding `initial`, which becomes frontmost right away.
    pub fn new(initial: Box<dyn Card>, video: &mut dyn VideoDriver) -> DeckResult<Self> {
        let mut stack = CardStack {
            top: None,
            len: 0,
            next_id: 1,
        };
        stack.push(initial, video)?;
        Ok(stack)
    }

    pub fn empty(&self) -> bool {
        self.top.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn top(&self) -> Option<&dyn Card> {
        self.top.as_deref().map(|s| s.card.as_ref())
    }

    pub fn top_id(&self) -> Option<CardId> {
        self.top.as_deref().map(|s| s.id)
    }

    /// Ids from the top down.
    pub fn ids(&self) -> Vec<CardId> {
        let mut ids = Vec::with_capacity(self.len);
        let mut slot = self.top.as_deref();
        while let Some(s) = slot {
            ids.push(s.id);
            slot = s.next.as_deref();
        }
        ids
    }

    pub fn push(&mut self, card: Box<dyn Card>, video: &mut dyn VideoDriver) -> DeckResult<CardId> {
        let id = CardId(self.next_id);
        self.next_id += 1;
        self.settle(StackOp::Push(id, card), video)?;
        Ok(id)
    }

    /// Pops `id`. Fails without touching the stack if it is not frontmost.
    pub fn pop(&mut self, id: CardId, video: &mut dyn VideoDriver) -> DeckResult<()> {
        self.settle(StackOp::Pop(id), video)
    }

    pub fn draw(&self, video: &mut dyn VideoDriver) {
        if let Some(slot) = self.top.as_deref() {
            slot.card.draw(Below(slot.next.as_deref()), video);
        }
    }

    pub fn next_timer(&self) -> Option<WallTime> {
        self.top.as_deref().and_then(|s| s.card.next_timer())
    }

    pub fn fire_timer(&mut self, video: &mut dyn VideoDriver) -> DeckResult<()> {
        let mut ops = vec![];
        if let Some(slot) = self.top.as_deref_mut() {
            let mut ctx = CardCtx {
                id: slot.id,
                video: &mut *video,
                next_id: &mut self.next_id,
                ops: &mut ops,
            };
            slot.card.fire_timer(&mut ctx)?;
        }
        self.apply(ops, video)
    }

    /// Delivers `event` to the frontmost card.
    pub fn send(&mut self, event: &Event, video: &mut dyn VideoDriver) -> DeckResult<()> {
        let mut ops = vec![];
        if let Some(slot) = self.top.as_deref_mut() {
            let mut front = Frontmost {
                card: slot.card.as_mut(),
                ctx: CardCtx {
                    id: slot.id,
                    video: &mut *video,
                    next_id: &mut self.next_id,
                    ops: &mut ops,
                },
            };
            event.send(&mut front)?;
        }
        self.apply(ops, video)
    }

    fn settle(&mut self, op: StackOp, video: &mut dyn VideoDriver) -> DeckResult<()> {
        self.apply(vec![op], video)
    }

    fn apply(&mut self, ops: Vec<StackOp>, video: &mut dyn VideoDriver) -> DeckResult<()> {
        let mut pending: VecDeque<StackOp> = ops.into();
        while let Some(op) = pending.pop_front() {
            let mut fresh = vec![];
            match op {
                StackOp::Push(id, card) => self.link(id, card, video, &mut fresh)?,
                StackOp::Pop(id) => self.unlink(id, video, &mut fresh)?,
            }
            for op in fresh.into_iter().rev() {
                pending.push_front(op);
            }
        }
        Ok(())
    }

    fn link(
        &mut self,
        id: CardId,
        card: Box<dyn Card>,
        video: &mut dyn VideoDriver,
        ops: &mut Vec<StackOp>,
    ) -> DeckResult<()> {
        if let Some(old) = self.top.as_deref_mut() {
            let mut ctx = CardCtx {
                id: old.id,
                video: &mut *video,
                next_id: &mut self.next_id,
                ops: &mut *ops,
            };
            old.card.resign_front(&mut ctx)?;
        }
        let next = self.top.take();
        let slot = self.top.insert(Box::new(Slot { id, card, next }));
        self.len += 1;
        debug!("card {} pushed, depth {}", id, self.len);
        let mut ctx = CardCtx {
            id,
            video,
            next_id: &mut self.next_id,
            ops,
        };
        slot.card.become_front(&mut ctx)
    }

    fn unlink(
        &mut self,
        id: CardId,
        video: &mut dyn VideoDriver,
        ops: &mut Vec<StackOp>,
    ) -> DeckResult<()> {
        if self.top_id() != Some(id) {
            return Err(DeckError::NotFrontmost {
                card: id,
                top: self.top_id(),
            });
        }
        if let Some(slot) = self.top.as_deref_mut() {
            let mut ctx = CardCtx {
                id,
                video: &mut *video,
                next_id: &mut self.next_id,
                ops: &mut *ops,
            };
            slot.card.resign_front(&mut ctx)?;
        }
        if let Some(slot) = self.top.take() {
            let Slot { next, .. } = *slot;
            self.top = next;
            self.len -= 1;
        }
        debug!("card {} popped, depth {}", id, self.len);
        if let Some(top) = self.top.as_deref_mut() {
            let mut ctx = CardCtx {
                id: top.id,
                video,
                next_id: &mut self.next_id,
                ops,
            };
            top.card.become_front(&mut ctx)?;
        }
        Ok(())
    }
}

/// Routes receiver calls to the frontmost card with its context.
struct Frontmost<'a, 'b> {
    card: &'a mut dyn Card,
    ctx: CardCtx<'b>,
}

impl EventReceiver for Frontmost<'_, '_> {
    fn key_down(&mut self, event: &KeyEvent) -> DeckResult<()> {
        self.card.key_down(&mut self.ctx, event)
    }
    fn key_up(&mut self, event: &KeyEvent) -> DeckResult<()> {
        self.card.key_up(&mut self.ctx, event)
    }
    fn gamepad_button_down(&mut self, event: &GamepadButtonEvent) -> DeckResult<()> {
        self.card.gamepad_button_down(&mut self.ctx, event)
    }
    fn gamepad_button_up(&mut self, event: &GamepadButtonEvent) -> DeckResult<()> {
        self.card.gamepad_button_up(&mut self.ctx, event)
    }
    fn gamepad_stick(&mut self, event: &GamepadStickEvent) -> DeckResult<()> {
        self.card.gamepad_stick(&mut self.ctx, event)
    }
    fn mouse_down(&mut self, event: &MouseButtonEvent) -> DeckResult<()> {
        self.card.mouse_down(&mut self.ctx, event)
    }
    fn mouse_up(&mut self, event: &MouseButtonEvent) -> DeckResult<()> {
        self.card.mouse_up(&mut self.ctx, event)
    }
    fn mouse_move(&mut self, event: &MouseMoveEvent) -> DeckResult<()> {
        self.card.mouse_move(&mut self.ctx, event)
    }
    fn caps_lock(&mut self, event: &CapsEvent) -> DeckResult<()> {
        self.card.caps_lock(&mut self.ctx, event)
    }
    fn caps_unlock(&mut self, event: &CapsEvent) -> DeckResult<()> {
        self.card.caps_unlock(&mut self.ctx, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Key;
    use crate::render::adapter::text::TextVideoDriver;
    use crate::render::RgbColor;
    use crate::scheduler::EventScheduler;
    use crate::util::{Rect, Size};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        journal: Journal,
        child: Option<Box<dyn Card>>,
        pop_on_q: bool,
    }

    impl Probe {
        fn new(name: &'static str, journal: &Journal) -> Box<Probe> {
            Box::new(Probe {
                name,
                journal: journal.clone(),
                child: None,
                pop_on_q: false,
            })
        }

        fn note(&self, what: &str) {
            self.journal.borrow_mut().push(format!("{} {}", self.name, what));
        }
    }

    impl Card for Probe {
        fn become_front(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
            self.note("become");
            if let Some(child) = self.child.take() {
                ctx.push(child);
            }
            Ok(())
        }

        fn resign_front(&mut self, _ctx: &mut CardCtx) -> DeckResult<()> {
            self.note("resign");
            Ok(())
        }

        fn draw(&self, _below: Below<'_>, video: &mut dyn VideoDriver) {
            video.fill_rect(Rect::new(0, 0, 10, 10), RgbColor::new(255, 0, 0));
        }

        fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
            if self.pop_on_q && event.key == Key::Q {
                ctx.pop();
            }
            Ok(())
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.note("drop");
        }
    }

    /// Overrides nothing.
    struct Plain;
    impl Card for Plain {}

    fn video() -> TextVideoDriver {
        TextVideoDriver::new(Size::new(640, 480), EventScheduler::new().handle())
    }

    fn taken(j: &Journal) -> Vec<String> {
        j.borrow_mut().drain(..).collect()
    }

    #[test]
    fn test_push_pop_lifecycle_order() {
        let j = Journal::default();
        let mut v = video();
        let mut stack = CardStack::new(Probe::new("a", &j), &mut v).unwrap();
        let a = stack.top_id().unwrap();
        let b = stack.push(Probe::new("b", &j), &mut v).unwrap();
        assert_eq!(taken(&j), vec!["a become", "a resign", "b become"]);
        assert_eq!(stack.ids(), vec![b, a]);

        stack.pop(b, &mut v).unwrap();
        assert_eq!(taken(&j), vec!["b resign", "b drop", "a become"]);
        stack.pop(a, &mut v).unwrap();
        assert_eq!(taken(&j), vec!["a resign", "a drop"]);
        assert!(stack.empty());
        assert!(stack.top().is_none());
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn test_pop_not_frontmost_leaves_stack_alone() {
        let j = Journal::default();
        let mut v = video();
        let mut stack = CardStack::new(Probe::new("a", &j), &mut v).unwrap();
        let a = stack.top_id().unwrap();
        let b = stack.push(Probe::new("b", &j), &mut v).unwrap();
        taken(&j);

        let err = stack.pop(a, &mut v).unwrap_err();
        assert!(matches!(
            err,
            DeckError::NotFrontmost { card, top: Some(top) } if card == a && top == b
        ));
        assert!(taken(&j).is_empty());
        assert_eq!(stack.ids(), vec![b, a]);

        stack.pop(b, &mut v).unwrap();
        stack.pop(a, &mut v).unwrap();
        assert!(matches!(
            stack.pop(a, &mut v),
            Err(DeckError::NotFrontmost { top: None, .. })
        ));
    }

    #[test]
    fn test_become_and_resign_alternate() {
        let j = Journal::default();
        let mut v = video();
        let mut stack = CardStack::new(Probe::new("a", &j), &mut v).unwrap();
        let b = stack.push(Probe::new("b", &j), &mut v).unwrap();
        let c = stack.push(Probe::new("c", &j), &mut v).unwrap();
        stack.pop(c, &mut v).unwrap();
        let d = stack.push(Probe::new("d", &j), &mut v).unwrap();
        stack.pop(d, &mut v).unwrap();
        stack.pop(b, &mut v).unwrap();

        for name in ["a", "b", "c", "d"] {
            let mut front = false;
            for line in j.borrow().iter().filter(|l| l.starts_with(name)) {
                if line.ends_with("become") {
                    assert!(!front, "{} became front twice", name);
                    front = true;
                } else if line.ends_with("resign") {
                    assert!(front, "{} resigned while not front", name);
                    front = false;
                }
            }
        }
    }

    #[test]
    fn test_default_card_is_transparent() {
        let j = Journal::default();
        let mut v = video();
        let mut stack = CardStack::new(Probe::new("a", &j), &mut v).unwrap();
        stack.draw(&mut v);
        let alone = v.log();
        v.clear_log();

        let plain = stack.push(Box::new(Plain), &mut v).unwrap();
        assert!(stack.next_timer().is_none());
        stack.draw(&mut v);
        assert_eq!(v.log(), alone);
        stack.pop(plain, &mut v).unwrap();

        let mut v = video();
        let mut lone = CardStack::new(Box::new(Plain), &mut v).unwrap();
        lone.draw(&mut v);
        assert_eq!(v.log(), "");
        let id = lone.top_id().unwrap();
        lone.pop(id, &mut v).unwrap();
        assert!(lone.empty());
    }

    #[test]
    fn test_ops_from_callbacks_apply_depth_first() {
        let j = Journal::default();
        let mut v = video();
        let mut parent = Probe::new("a", &j);
        let mut child = Probe::new("b", &j);
        child.child = Some(Probe::new("c", &j) as Box<dyn Card>);
        parent.child = Some(child as Box<dyn Card>);
        let stack = CardStack::new(parent, &mut v).unwrap();
        assert_eq!(
            taken(&j),
            vec!["a become", "a resign", "b become", "b resign", "c become"]
        );
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_card_pops_itself_on_input() {
        let j = Journal::default();
        let mut v = video();
        let mut a = Probe::new("a", &j);
        a.pop_on_q = true;
        let mut stack = CardStack::new(a, &mut v).unwrap();
        stack
            .send(&Event::key_down(WallTime(0), Key::S), &mut v)
            .unwrap();
        assert!(!stack.empty());
        stack
            .send(&Event::key_down(WallTime(1), Key::Q), &mut v)
            .unwrap();
        assert!(stack.empty());
        assert_eq!(taken(&j), vec!["a become", "a resign", "a drop"]);
    }

    /// Spawns and removes children by id.
    struct Spawner {
        journal: Journal,
    }

    impl Card for Spawner {
        fn become_front(&mut self, _ctx: &mut CardCtx) -> DeckResult<()> {
            self.journal.borrow_mut().push("spawner become".to_string());
            Ok(())
        }

        fn resign_front(&mut self, _ctx: &mut CardCtx) -> DeckResult<()> {
            self.journal.borrow_mut().push("spawner resign".to_string());
            Ok(())
        }

        fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
            if event.key == Key::S {
                let child = ctx.push(Box::new(Plain));
                ctx.pop_card(child);
            } else if event.key == Key::K {
                ctx.pop_card(CardId(999));
            }
            Ok(())
        }
    }

    #[test]
    fn test_pop_card_by_id() {
        let j = Journal::default();
        let mut v = video();
        let spawner = Box::new(Spawner { journal: j.clone() });
        let mut stack = CardStack::new(spawner, &mut v).unwrap();
        let id = stack.top_id().unwrap();
        stack
            .send(&Event::key_down(WallTime(0), Key::S), &mut v)
            .unwrap();
        assert_eq!(
            taken(&j),
            vec!["spawner become", "spawner resign", "spawner become"]
        );
        assert_eq!(stack.ids(), vec![id]);

        let err = stack
            .send(&Event::key_down(WallTime(1), Key::K), &mut v)
            .unwrap_err();
        assert!(matches!(
            err,
            DeckError::NotFrontmost { card: CardId(999), top: Some(top) } if top == id
        ));
        assert_eq!(stack.ids(), vec![id]);
    }

    /// Dims what is below it, or paints its own background when alone.
    struct Shade;

    impl Card for Shade {
        fn draw(&self, below: Below<'_>, video: &mut dyn VideoDriver) {
            if below.is_empty() {
                video.fill_rect(Rect::new(0, 0, 640, 480), RgbColor::BLACK);
            } else {
                below.draw(video);
                video.dither_rect(Rect::new(0, 0, 640, 480), RgbColor::BLACK);
            }
        }
    }

    #[test]
    fn test_below_is_empty_only_at_bottom() {
        let j = Journal::default();
        let mut v = video().with_dedup(false);
        let mut alone = CardStack::new(Box::new(Shade), &mut v).unwrap();
        alone.draw(&mut v);
        assert_eq!(v.log(), "rect\t0\t0\t640\t480\t000000\n");
        let id = alone.top_id().unwrap();
        alone.pop(id, &mut v).unwrap();

        v.clear_log();
        let mut stack = CardStack::new(Probe::new("a", &j), &mut v).unwrap();
        stack.push(Box::new(Shade), &mut v).unwrap();
        stack.draw(&mut v);
        assert_eq!(
            v.log(),
            "rect\t0\t0\t10\t10\tff0000\ndither\t0\t0\t640\t480\t000000\n"
        );
    }
}
