// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Live main loop: a winit window with a glutin OpenGL 3.3 context.
//!
//! Each turn pumps OS events with a timeout bounded by the next card timer and
//! the poll interval, translates them into deck events, passes them through
//! the EventTracker and on to the frontmost card, fires a due timer, then
//! draws and swaps. Window, context and shader failures end the run with
//! `DeckError::Setup`.

use super::gl::OpenGlVideoDriver;
use crate::card::{Card, CardStack};
use crate::error::{DeckError, DeckResult};
use crate::event::{CapsEvent, Event, EventTracker, Key};
use crate::time::WallTime;
use crate::util::{Point, Size};
use glutin::{
    config::{ConfigTemplateBuilder, GlConfig},
    context::{
        ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext,
        Version,
    },
    display::{GetGlDisplay, GlDisplay},
    prelude::GlSurface,
    surface::{Surface, SurfaceAttributesBuilder, WindowSurface},
};
use glutin_winit::DisplayBuilder;
use log::{debug, info};
use raw_window_handle::HasWindowHandle;
use std::cell::RefCell;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

// Drop order matters: cards and their textures go before the context.
struct Live {
    stack: CardStack,
    video: OpenGlVideoDriver,
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    window: Arc<Window>,
}

pub struct GlMainLoop {
    title: String,
    size: Size,
    poll: Duration,
    double_click: WallTime,
    initial: Option<Box<dyn Card>>,
    tracker: Rc<RefCell<EventTracker>>,
    epoch: Instant,
    live: Option<Live>,
    pending: Vec<Event>,
    error: Option<DeckError>,
    exit: bool,
    last_click: Option<(WallTime, u8)>,
    clicks: u32,
    caps: bool,
    cursor: Point,
}

impl GlMainLoop {
    pub fn new(title: &str, size: Size, initial: Box<dyn Card>) -> Self {
        Self {
            title: title.to_string(),
            size,
            poll: Duration::from_millis(16),
            double_click: WallTime(super::DOUBLE_CLICK_USECS),
            initial: Some(initial),
            tracker: Rc::new(RefCell::new(EventTracker::new(false))),
            epoch: Instant::now(),
            live: None,
            pending: vec![],
            error: None,
            exit: false,
            last_click: None,
            clicks: 0,
            caps: false,
            cursor: Point::new(-1, -1),
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_double_click(mut self, interval: WallTime) -> Self {
        self.double_click = interval;
        self
    }

    fn now(&self) -> WallTime {
        WallTime(self.epoch.elapsed().as_micros() as i64)
    }

    /// Pumps, dispatches and draws until the stack is empty or the window closes.
    pub fn run(mut self) -> DeckResult<()> {
        let mut event_loop = EventLoop::new().map_err(|e| DeckError::Setup(e.to_string()))?;
        loop {
            let timeout = self.timeout();
            let status = event_loop.pump_app_events(Some(timeout), &mut self);
            if let Some(e) = self.error.take() {
                return Err(e);
            }
            if self.exit || matches!(status, PumpStatus::Exit(_)) {
                break;
            }
            self.dispatch()?;
            self.fire_due_timer()?;
            let Some(live) = self.live.as_mut() else {
                continue;
            };
            if live.stack.empty() {
                break;
            }
            live.video.begin_frame();
            live.stack.draw(&mut live.video);
            live.video.end_frame();
            live.surface
                .swap_buffers(&live.context)
                .map_err(|e| DeckError::Setup(format!("swap buffers: {}", e)))?;
        }
        info!("live loop finished");
        Ok(())
    }

    /// Time until the next card timer, capped by the poll interval.
    fn timeout(&self) -> Duration {
        let timer = self.live.as_ref().and_then(|l| l.stack.next_timer());
        match timer {
            Some(at) => (at - self.now()).min(self.poll),
            None => self.poll,
        }
    }

    fn dispatch(&mut self) -> DeckResult<()> {
        let Some(live) = self.live.as_mut() else {
            return Ok(());
        };
        for event in self.pending.drain(..) {
            debug!("live event {:?}", event);
            event.send(&mut *self.tracker.borrow_mut())?;
            live.stack.send(&event, &mut live.video)?;
            if live.stack.empty() {
                break;
            }
        }
        Ok(())
    }

    fn fire_due_timer(&mut self) -> DeckResult<()> {
        let now = self.now();
        if let Some(live) = self.live.as_mut() {
            if live.stack.next_timer().is_some_and(|at| at <= now) {
                live.stack.fire_timer(&mut live.video)?;
            }
        }
        Ok(())
    }

    fn create(&mut self, event_loop: &ActiveEventLoop) -> DeckResult<Live> {
        let setup = |e: &dyn std::fmt::Display| DeckError::Setup(e.to_string());
        info!("Creating OpenGL window and context...");

        let window_size = LogicalSize::new(self.size.width as f64, self.size.height as f64);
        let template = ConfigTemplateBuilder::new();
        let display_builder = DisplayBuilder::new().with_window_attributes(Some(
            Window::default_attributes()
                .with_title(&self.title)
                .with_inner_size(window_size)
                .with_resizable(false),
        ));
        let (window, gl_config) = display_builder
            .build(event_loop, template, |configs| {
                configs
                    .max_by_key(|c| c.num_samples())
                    .expect("glutin offers at least one config")
            })
            .map_err(|e| setup(&e))?;
        let window = Arc::new(window.ok_or_else(|| setup(&"no window created"))?);
        let physical = window.inner_size();

        let gl_display = gl_config.display();
        let raw_window_handle = window.window_handle().map_err(|e| setup(&e))?.as_raw();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window_handle));
        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .map_err(|e| setup(&e))?
        };
        let (w, h) = (
            NonZeroU32::new(physical.width).ok_or_else(|| setup(&"zero width window"))?,
            NonZeroU32::new(physical.height).ok_or_else(|| setup(&"zero height window"))?,
        );
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_window_handle, w, h);
        let surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .map_err(|e| setup(&e))?
        };
        let context = not_current.make_current(&surface).map_err(|e| setup(&e))?;

        let gl = unsafe {
            glow::Context::from_loader_function(|s| match std::ffi::CString::new(s) {
                Ok(s) => gl_display.get_proc_address(&s),
                Err(_) => std::ptr::null(),
            })
        };
        let mut video = OpenGlVideoDriver::new(
            gl,
            self.size,
            self.tracker.clone(),
            self.epoch,
            self.double_click,
        )?;
        let initial = self
            .initial
            .take()
            .ok_or_else(|| setup(&"initial card already used"))?;
        let stack = CardStack::new(initial, &mut video)?;
        info!(
            "Window created - logical: {}x{}, physical: {}x{}",
            self.size.width, self.size.height, physical.width, physical.height
        );
        Ok(Live {
            stack,
            video,
            context,
            surface,
            window,
        })
    }

    fn cursor_moved(&mut self, at: WallTime, point: Point) {
        self.cursor = point;
        self.pending.push(Event::mouse_move(at, point));
    }

    /// Button events carry the latest cursor position seen by this pump,
    /// which may not have reached the tracker yet.
    fn mouse_input(&mut self, at: WallTime, button: u8, pressed: bool) {
        let point = self.cursor;
        if pressed {
            let count = self.click_count(at, button);
            self.pending.push(Event::mouse_down(at, button, count, point));
        } else {
            self.pending.push(Event::mouse_up(at, button, point));
        }
    }

    fn click_count(&mut self, at: WallTime, button: u8) -> u32 {
        let window = self.double_click.usecs();
        self.clicks = match self.last_click {
            Some((last, b)) if b == button && at.usecs() - last.usecs() <= window => self.clicks + 1,
            _ => 1,
        };
        self.last_click = Some((at, button));
        self.clicks
    }
}

impl ApplicationHandler for GlMainLoop {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.live.is_some() {
            return;
        }
        match self.create(event_loop) {
            Ok(live) => self.live = Some(live),
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let at = self.now();
        match event {
            WindowEvent::CloseRequested => {
                self.exit = true;
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let PhysicalKey::Code(code) = key_event.physical_key else {
                    return;
                };
                let pressed = key_event.state == ElementState::Pressed;
                if code == KeyCode::CapsLock && pressed {
                    self.caps = !self.caps;
                    let caps = CapsEvent { at };
                    self.pending.push(if self.caps {
                        Event::CapsLock(caps)
                    } else {
                        Event::CapsUnlock(caps)
                    });
                }
                if key_event.repeat {
                    return;
                }
                if let Some(key) = key_from_code(code) {
                    self.pending.push(if pressed {
                        Event::key_down(at, key)
                    } else {
                        Event::key_up(at, key)
                    });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = self.live.as_ref().map_or(1.0, |l| l.window.scale_factor());
                let point = Point::new((position.x / scale) as i32, (position.y / scale) as i32);
                self.cursor_moved(at, point);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let index = match button {
                    MouseButton::Left => 0,
                    MouseButton::Right => 1,
                    MouseButton::Middle => 2,
                    _ => return,
                };
                self.mouse_input(at, index, state == ElementState::Pressed);
            }
            WindowEvent::RedrawRequested => {}
            _ => {}
        }
    }
}

fn key_from_code(code: KeyCode) -> Option<Key> {
    let letters = [
        KeyCode::KeyA,
        KeyCode::KeyB,
        KeyCode::KeyC,
        KeyCode::KeyD,
        KeyCode::KeyE,
        KeyCode::KeyF,
        KeyCode::KeyG,
        KeyCode::KeyH,
        KeyCode::KeyI,
        KeyCode::KeyJ,
        KeyCode::KeyK,
        KeyCode::KeyL,
        KeyCode::KeyM,
        KeyCode::KeyN,
        KeyCode::KeyO,
        KeyCode::KeyP,
        KeyCode::KeyQ,
        KeyCode::KeyR,
        KeyCode::KeyS,
        KeyCode::KeyT,
        KeyCode::KeyU,
        KeyCode::KeyV,
        KeyCode::KeyW,
        KeyCode::KeyX,
        KeyCode::KeyY,
        KeyCode::KeyZ,
    ];
    if let Some(i) = letters.iter().position(|c| *c == code) {
        return Some(Key(b'A' + i as u8));
    }
    let digits = [
        KeyCode::Digit0,
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    if let Some(i) = digits.iter().position(|c| *c == code) {
        return Some(Key(b'0' + i as u8));
    }
    let key = match code {
        KeyCode::Enter | KeyCode::NumpadEnter => Key::RETURN,
        KeyCode::Escape => Key::ESCAPE,
        KeyCode::Space => Key::SPACE,
        KeyCode::Tab => Key::TAB,
        KeyCode::Backspace => Key::BACKSPACE,
        KeyCode::ArrowUp => Key::UP,
        KeyCode::ArrowDown => Key::DOWN,
        KeyCode::ArrowLeft => Key::LEFT,
        KeyCode::ArrowRight => Key::RIGHT,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::SHIFT,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::CONTROL,
        KeyCode::AltLeft | KeyCode::AltRight => Key::OPTION,
        KeyCode::SuperLeft | KeyCode::SuperRight => Key::COMMAND,
        KeyCode::CapsLock => Key::CAPS_LOCK,
        KeyCode::F1 => Key::F1,
        _ => return None,
    };
    Some(key)
}
