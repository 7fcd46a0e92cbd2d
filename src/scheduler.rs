// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! EventScheduler: one authoritative order of "what happens when".
//!
//! The scheduler merges a min-heap of pending events with the timer requested
//! by the frontmost card and moves a virtual tick counter forward. Backends
//! without a real clock (text, offscreen) read the time from it, which is what
//! makes a scripted or replayed run produce the same frames every time.
//!
//! Snapshot marks ask the main loop to capture its output when the counter
//! reaches a given tick.

use crate::card::{Card, CardStack};
use crate::error::{DeckError, DeckResult};
use crate::event::{Event, EventTracker, InputMode, Key, KeyMap};
use crate::render::adapter::VideoDriver;
use crate::time::{Ticks, WallTime, MINOR_TICK};
use crate::util::Point;
use log::{debug, info};
use std::cell::RefCell;
use std::cmp::{max, Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;

/// What the scheduler drives: a card stack, its video driver and,
/// for capturing backends, snapshot output.
pub trait MainLoop {
    fn takes_snapshots(&self) -> bool {
        false
    }

    fn snapshot(&mut self, _ticks: Ticks) -> DeckResult<()> {
        Ok(())
    }

    /// Renders the frontmost card once.
    fn draw(&mut self);

    fn done(&self) -> bool;

    fn top(&self) -> Option<&dyn Card>;

    /// Split borrow of the stack and the driver it draws with.
    fn parts(&mut self) -> (&mut CardStack, &mut dyn VideoDriver);
}

struct SchedulerState {
    ticks: Ticks,
    tracker: EventTracker,
}

/// Read side of the scheduler, shared with the drivers that take their
/// clock and pointer state from it.
#[derive(Clone)]
pub struct SchedulerHandle(Rc<RefCell<SchedulerState>>);

impl SchedulerHandle {
    pub fn ticks(&self) -> Ticks {
        self.0.borrow().ticks
    }

    pub fn now(&self) -> WallTime {
        self.ticks().to_wall()
    }

    pub fn get_mouse(&self) -> Point {
        self.0.borrow().tracker.mouse()
    }

    pub fn input_mode(&self) -> InputMode {
        self.0.borrow().tracker.input_mode()
    }

    pub fn button(&self, button: u8) -> bool {
        self.0.borrow().tracker.button(button)
    }

    pub fn keys(&self) -> KeyMap {
        *self.0.borrow().tracker.keys()
    }

    fn set_ticks(&self, ticks: Ticks) {
        self.0.borrow_mut().ticks = ticks;
    }

    fn track(&self, event: &Event) -> DeckResult<()> {
        event.send(&mut self.0.borrow_mut().tracker)
    }
}

struct Pending {
    at: WallTime,
    seq: u64,
    event: Event,
}

// Reversed so BinaryHeap pops the earliest; equal times pop in schedule order.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.cmp(&self.at).then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Pending {}

pub struct EventScheduler {
    shared: SchedulerHandle,
    events: BinaryHeap<Pending>,
    snapshots: BinaryHeap<Reverse<Ticks>>,
    seq: u64,
}

impl Default for EventScheduler {
    fn default() -> Self {
        EventScheduler::new()
    }
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::with_tracker(EventTracker::new(false))
    }

    /// Scheduler whose tracker rejects inconsistent input, for replays.
    pub fn strict() -> Self {
        Self::with_tracker(EventTracker::new(true))
    }

    fn with_tracker(tracker: EventTracker) -> Self {
        Self {
            shared: SchedulerHandle(Rc::new(RefCell::new(SchedulerState {
                ticks: Ticks(0),
                tracker,
            }))),
            events: BinaryHeap::new(),
            snapshots: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.shared.clone()
    }

    pub fn ticks(&self) -> Ticks {
        self.shared.ticks()
    }

    pub fn get_mouse(&self) -> Point {
        self.shared.get_mouse()
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn schedule_event(&mut self, event: Event) {
        self.seq += 1;
        self.events.push(Pending {
            at: event.at(),
            seq: self.seq,
            event,
        });
    }

    pub fn schedule_key(&mut self, key: Key, down: Ticks, up: Ticks) {
        self.schedule_event(Event::key_down(down.to_wall(), key));
        self.schedule_event(Event::key_up(up.to_wall(), key));
    }

    pub fn schedule_mouse(&mut self, button: u8, point: Point, down: Ticks, up: Ticks) {
        self.schedule_event(Event::mouse_down(down.to_wall(), button, 1, point));
        self.schedule_event(Event::mouse_up(up.to_wall(), button, point));
    }

    pub fn schedule_snapshot(&mut self, at: Ticks) {
        self.snapshots.push(Reverse(at));
    }

    /// Dispatches events and timers until `main_loop` is done.
    pub fn run(&mut self, main_loop: &mut dyn MainLoop) -> DeckResult<()> {
        while !main_loop.done() {
            let timer = main_loop.top().and_then(|c| c.next_timer());
            let event_due = match (self.events.peek(), timer) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(p), Some(at)) => p.at <= at,
            };
            if event_due {
                if let Some(p) = self.events.pop() {
                    self.advance_tick_count(main_loop, p.at.floor_ticks())?;
                    debug!("dispatch {:?} at tick {}", p.event, self.ticks());
                    self.shared.track(&p.event)?;
                    let (stack, video) = main_loop.parts();
                    stack.send(&p.event, video)?;
                    continue;
                }
            }
            let Some(at) = timer else {
                return Err(DeckError::Stalled);
            };
            let target = max(self.ticks() + MINOR_TICK, at.ceil_ticks());
            self.advance_tick_count(main_loop, target)?;
            let (stack, video) = main_loop.parts();
            stack.fire_timer(video)?;
        }
        info!("main loop done at tick {}", self.ticks());
        Ok(())
    }

    /// Moves the counter to `target`, capturing any snapshot marks reached
    /// on the way. Ticks never go backwards.
    fn advance_tick_count(&mut self, main_loop: &mut dyn MainLoop, target: Ticks) -> DeckResult<()> {
        let target = max(target, self.ticks());
        if main_loop.takes_snapshots() && self.have_snapshots_through(target) {
            main_loop.draw();
            while self.have_snapshots_through(target) {
                if let Some(Reverse(mark)) = self.snapshots.pop() {
                    self.shared.set_ticks(max(mark, self.ticks()));
                    main_loop.snapshot(mark)?;
                }
            }
        }
        self.shared.set_ticks(target);
        Ok(())
    }

    fn have_snapshots_through(&self, target: Ticks) -> bool {
        matches!(self.snapshots.peek(), Some(Reverse(mark)) if *mark <= target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardCtx;
    use crate::event::{KeyEvent, MouseButtonEvent};
    use crate::render::adapter::text::TextVideoDriver;
    use crate::util::Size;

    type Journal = Rc<RefCell<Vec<String>>>;

    /// Journals input and timers; pops itself on Q, asks for timers at `timers`.
    struct Watcher {
        journal: Journal,
        timers: Vec<Ticks>,
    }

    impl Card for Watcher {
        fn next_timer(&self) -> Option<WallTime> {
            self.timers.first().map(|t| t.to_wall())
        }

        fn fire_timer(&mut self, ctx: &mut CardCtx) -> DeckResult<()> {
            let t = ctx.now().floor_ticks();
            self.journal.borrow_mut().push(format!("timer {}", t));
            self.timers.remove(0);
            if self.timers.is_empty() {
                ctx.pop();
            }
            Ok(())
        }

        fn key_down(&mut self, ctx: &mut CardCtx, event: &KeyEvent) -> DeckResult<()> {
            let t = ctx.now().floor_ticks();
            self.journal.borrow_mut().push(format!("key {} {}", event.key, t));
            if event.key == Key::Q {
                ctx.pop();
            }
            Ok(())
        }

        fn mouse_down(&mut self, ctx: &mut CardCtx, e: &MouseButtonEvent) -> DeckResult<()> {
            let seen = ctx.video().get_mouse();
            self.journal
                .borrow_mut()
                .push(format!("mouse {} {} {} {}", e.point.x, e.point.y, seen.x, seen.y));
            Ok(())
        }
    }

    struct Harness {
        stack: CardStack,
        video: TextVideoDriver,
        journal: Journal,
        snapshots: bool,
    }

    impl MainLoop for Harness {
        fn takes_snapshots(&self) -> bool {
            self.snapshots
        }
        fn snapshot(&mut self, ticks: Ticks) -> DeckResult<()> {
            self.journal.borrow_mut().push(format!("snapshot {}", ticks));
            Ok(())
        }
        fn draw(&mut self) {
            self.journal.borrow_mut().push("draw".to_string());
        }
        fn done(&self) -> bool {
            self.stack.empty()
        }
        fn top(&self) -> Option<&dyn Card> {
            self.stack.top()
        }
        fn parts(&mut self) -> (&mut CardStack, &mut dyn VideoDriver) {
            (&mut self.stack, &mut self.video)
        }
    }

    fn harness(s: &EventScheduler, timers: Vec<Ticks>, snapshots: bool) -> Harness {
        let journal = Journal::default();
        let mut video = TextVideoDriver::new(Size::new(640, 480), s.handle());
        let card = Box::new(Watcher {
            journal: journal.clone(),
            timers,
        });
        let stack = CardStack::new(card, &mut video).unwrap();
        Harness {
            stack,
            video,
            journal,
            snapshots,
        }
    }

    fn lines(h: &Harness) -> Vec<String> {
        h.journal.borrow().clone()
    }

    #[test]
    fn test_events_dispatch_in_time_order() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![], false);
        s.schedule_event(Event::key_down(Ticks(30).to_wall(), Key::Q));
        s.schedule_event(Event::key_down(Ticks(10).to_wall(), Key::A));
        s.schedule_event(Event::key_down(Ticks(20).to_wall(), Key::S));
        s.run(&mut h).unwrap();
        assert_eq!(lines(&h), vec!["key A 10", "key S 20", "key Q 30"]);
        assert_eq!(s.ticks(), Ticks(30));
    }

    #[test]
    fn test_snapshot_between_events() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![], true);
        s.schedule_event(Event::key_down(Ticks(5).to_wall(), Key::A));
        s.schedule_event(Event::key_down(Ticks(15).to_wall(), Key::Q));
        s.schedule_snapshot(Ticks(10));
        s.run(&mut h).unwrap();
        assert_eq!(
            lines(&h),
            vec!["key A 5", "draw", "snapshot 10", "key Q 15"]
        );
    }

    #[test]
    fn test_snapshots_flush_in_order_after_one_draw() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![], true);
        s.schedule_snapshot(Ticks(12));
        s.schedule_snapshot(Ticks(3));
        s.schedule_snapshot(Ticks(7));
        s.schedule_key(Key::Q, Ticks(20), Ticks(21));
        s.run(&mut h).unwrap();
        assert_eq!(
            lines(&h),
            vec!["draw", "snapshot 3", "snapshot 7", "snapshot 12", "key Q 20"]
        );
    }

    #[test]
    fn test_no_snapshots_when_loop_does_not_take_them() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![], false);
        s.schedule_snapshot(Ticks(1));
        s.schedule_key(Key::Q, Ticks(2), Ticks(3));
        s.run(&mut h).unwrap();
        assert_eq!(lines(&h), vec!["key Q 2"]);
    }

    #[test]
    fn test_timer_and_events_interleave() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![Ticks(10), Ticks(40)], false);
        s.schedule_event(Event::key_down(Ticks(10).to_wall(), Key::A));
        s.schedule_event(Event::key_down(Ticks(25).to_wall(), Key::S));
        s.run(&mut h).unwrap();
        // an event at the timer's own time goes first
        assert_eq!(
            lines(&h),
            vec!["key A 10", "timer 11", "key S 25", "timer 40"]
        );
    }

    #[test]
    fn test_timer_never_fires_early() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![Ticks(3)], false);
        let card = h.stack.top_id().unwrap();
        s.run(&mut h).unwrap();
        assert_eq!(lines(&h), vec!["timer 3"]);
        assert!(h.stack.top_id() != Some(card));
    }

    #[test]
    fn test_stalls_loudly() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![], false);
        s.schedule_key(Key::A, Ticks(1), Ticks(2));
        assert!(matches!(s.run(&mut h), Err(DeckError::Stalled)));
        assert_eq!(lines(&h), vec!["key A 1"]);
    }

    #[test]
    fn test_mouse_tracked_before_card_sees_event() {
        let mut s = EventScheduler::new();
        let mut h = harness(&s, vec![], false);
        assert_eq!(s.get_mouse(), Point::new(-1, -1));
        s.schedule_mouse(0, Point::new(40, 50), Ticks(1), Ticks(2));
        s.schedule_key(Key::Q, Ticks(3), Ticks(4));
        s.run(&mut h).unwrap();
        assert_eq!(lines(&h), vec!["mouse 40 50 40 50", "key Q 3"]);
        assert_eq!(s.get_mouse(), Point::new(40, 50));
    }

    #[test]
    fn test_strict_scheduler_fails_on_bad_input() {
        let mut s = EventScheduler::strict();
        let mut h = harness(&s, vec![], false);
        s.schedule_event(Event::key_down(Ticks(1).to_wall(), Key::A));
        s.schedule_event(Event::key_down(Ticks(2).to_wall(), Key::A));
        assert!(matches!(s.run(&mut h), Err(DeckError::Input(_))));
    }
}
