// Window - platform window and event pumping
//
// The application owns the window and drives it once per tick through
// `poll_events`, which delivers every pending notification to a callback
// before returning. The winit implementation pumps the event loop with a
// zero timeout instead of handing control to `run_app`.

use anyhow::{bail, Context, Result};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, WindowAttributes, WindowId},
};

use crate::backend::context::NativeHandles;
use crate::config::WindowConfig;
use crate::event::{Event, EventKind};

/// What the application needs from a platform window
pub trait Window {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn title(&self) -> &str;
    fn set_title(&mut self, title: &str);

    fn set_vsync(&mut self, enabled: bool);
    fn is_vsync(&self) -> bool;

    /// Handles for surface creation; `None` for windows with no native backing
    fn native_handles(&self) -> Option<NativeHandles>;

    /// Process pending platform events, calling `callback` for each one
    fn poll_events(&mut self, callback: &mut dyn FnMut(&mut Event));
}

/// Startup pumps allowed before giving up on the window appearing
const STARTUP_PUMP_LIMIT: usize = 100;

/// Collects translated events between pumps
struct WindowHandler {
    attributes: Option<WindowAttributes>,
    window: Option<winit::window::Window>,
    creation_error: Option<winit::error::OsError>,
    pending: Vec<EventKind>,
    size: PhysicalSize<u32>,
}

impl WindowHandler {
    fn new(attributes: WindowAttributes, size: PhysicalSize<u32>) -> Self {
        Self {
            attributes: Some(attributes),
            window: None,
            creation_error: None,
            pending: Vec::new(),
            size,
        }
    }
}

impl ApplicationHandler for WindowHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only the first resume creates the window
        let Some(attributes) = self.attributes.take() else {
            return;
        };

        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(window),
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                self.creation_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let kind = match event {
            WindowEvent::CloseRequested => EventKind::WindowClose,
            WindowEvent::Resized(size) => {
                self.size = size;
                EventKind::WindowResize {
                    width: size.width,
                    height: size.height,
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                // Keys without a layout-independent code are dropped
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => EventKind::KeyPressed {
                        key,
                        repeat: event.repeat,
                    },
                    ElementState::Released => EventKind::KeyReleased { key },
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => EventKind::MouseButtonPressed(button),
                ElementState::Released => EventKind::MouseButtonReleased(button),
            },
            WindowEvent::CursorMoved { position, .. } => EventKind::MouseMoved {
                x: position.x,
                y: position.y,
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let (x_offset, y_offset) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
                    MouseScrollDelta::PixelDelta(position) => (position.x, position.y),
                };
                EventKind::MouseScrolled { x_offset, y_offset }
            }
            _ => return,
        };

        self.pending.push(kind);
    }
}

/// winit-backed window
///
/// Field order matters for Drop: the window goes before its event loop.
pub struct WinitWindow {
    window: winit::window::Window,
    handler: WindowHandler,
    event_loop: EventLoop<()>,
    title: String,
    vsync: bool,
}

impl WinitWindow {
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let title = config.display_title();
        log::info!(
            "Creating window {} ({}x{}, {})",
            title,
            config.width,
            config.height,
            if config.fullscreen { "fullscreen" } else { "windowed" }
        );

        let mut event_loop = EventLoop::new().context("Failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let size = PhysicalSize::new(config.width, config.height);
        let mut attributes = WindowAttributes::default()
            .with_title(&title)
            .with_inner_size(size);
        if config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        // The window only exists once the loop has delivered its first resume
        let mut handler = WindowHandler::new(attributes, size);
        for _ in 0..STARTUP_PUMP_LIMIT {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut handler);
            if handler.window.is_some() || handler.creation_error.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) = status {
                bail!("Event loop exited with code {} before the window was created", code);
            }
        }

        if let Some(e) = handler.creation_error.take() {
            bail!("Failed to create window: {}", e);
        }
        let Some(window) = handler.window.take() else {
            bail!("Window was not created after {} event loop pumps", STARTUP_PUMP_LIMIT);
        };

        handler.size = window.inner_size();

        Ok(Self {
            window,
            handler,
            event_loop,
            title,
            vsync: config.vsync,
        })
    }
}

impl Window for WinitWindow {
    fn width(&self) -> u32 {
        self.handler.size.width
    }

    fn height(&self) -> u32 {
        self.handler.size.height
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn set_vsync(&mut self, enabled: bool) {
        // Present mode is fixed when the swapchain is created
        self.vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.vsync
    }

    fn native_handles(&self) -> Option<NativeHandles> {
        Some((self.window.raw_display_handle(), self.window.raw_window_handle()))
    }

    fn poll_events(&mut self, callback: &mut dyn FnMut(&mut Event)) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler);

        if let PumpStatus::Exit(code) = status {
            log::info!("Event loop exited with code {}", code);
            self.handler.pending.push(EventKind::WindowClose);
        }

        for kind in self.handler.pending.drain(..) {
            callback(&mut Event::new(kind));
        }
    }
}
