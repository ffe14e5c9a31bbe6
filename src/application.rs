// Application loop
//
// Owns the window, the renderer and the layer stack. One tick runs the
// update hooks, renders a frame through the layers, then pumps window
// events. Field order is drop order: layers detach before the renderer
// goes away, and the renderer goes away before the window it draws into.

use anyhow::Result;

use crate::config::Config;
use crate::event::{Event, EventKind};
use crate::layer::{Layer, LayerStack};
use crate::renderer::Renderer;
use crate::ui::UiOverlay;
use crate::window::{Window, WinitWindow};

pub struct Application {
    layer_stack: LayerStack,
    ui_overlay: Option<Box<dyn UiOverlay>>,
    renderer: Renderer,
    window: Box<dyn Window>,
    running: bool,
    minimized: bool,
}

impl Application {
    pub fn new(window: Box<dyn Window>, renderer: Renderer) -> Self {
        Self {
            layer_stack: LayerStack::new(),
            ui_overlay: None,
            renderer,
            window,
            running: true,
            minimized: false,
        }
    }

    /// Open the configured window and bring up the configured renderer
    pub fn from_config(config: &Config) -> Result<Self> {
        let window = WinitWindow::new(&config.window)?;

        let enable_validation = cfg!(debug_assertions) && config.debug.validation_layers;
        let renderer = Renderer::init(&config.renderer, &window, enable_validation)?;

        Ok(Self::new(Box::new(window), renderer))
    }

    pub fn push_layer(&mut self, layer: Box<dyn Layer>) {
        log::debug!("Pushing layer '{}'", layer.name());
        self.layer_stack.push_layer(layer).on_attach();
    }

    pub fn push_overlay(&mut self, overlay: Box<dyn Layer>) {
        log::debug!("Pushing overlay '{}'", overlay.name());
        self.layer_stack.push_overlay(overlay).on_attach();
    }

    pub fn set_ui_overlay(&mut self, overlay: Box<dyn UiOverlay>) {
        self.ui_overlay = Some(overlay);
    }

    /// Tick until something clears the running flag
    pub fn run(&mut self) -> Result<()> {
        log::info!("Entering main loop");
        while self.running {
            self.tick()?;
        }
        log::info!("Main loop finished after {} frames", self.renderer.frame_counter());
        Ok(())
    }

    /// One iteration of the main loop
    pub fn tick(&mut self) -> Result<()> {
        if !self.minimized {
            for layer in self.layer_stack.iter_mut() {
                layer.on_update();
            }

            if let Some(frame) = self.renderer.begin_frame()? {
                for layer in self.layer_stack.iter_mut() {
                    layer.on_render(&frame);
                }

                if let Some(ui) = self.ui_overlay.as_mut() {
                    ui.begin();
                }
                for layer in self.layer_stack.iter_mut() {
                    layer.on_ui_render();
                }
                if let Some(ui) = self.ui_overlay.as_mut() {
                    ui.end(&mut *self.window);
                }

                self.renderer.end_frame()?;
            }
        }

        let Self {
            window,
            layer_stack,
            running,
            minimized,
            ..
        } = self;
        window.poll_events(&mut |event| route_event(running, minimized, layer_stack, event));

        Ok(())
    }

    /// Apply window-level effects of `event`, then hand it to the layers
    pub fn on_event(&mut self, event: &mut Event) {
        route_event(&mut self.running, &mut self.minimized, &mut self.layer_stack, event);
    }

    pub fn close(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn layer_stack(&self) -> &LayerStack {
        &self.layer_stack
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn window(&self) -> &dyn Window {
        &*self.window
    }

    /// Detach every layer, then release the renderer after a device idle-wait
    pub fn shutdown(self) -> Result<()> {
        let Self {
            layer_stack,
            ui_overlay,
            renderer,
            window,
            ..
        } = self;

        drop(layer_stack);
        drop(ui_overlay);
        renderer.shutdown()?;
        drop(window);
        Ok(())
    }
}

fn route_event(running: &mut bool, minimized: &mut bool, layers: &mut LayerStack, event: &mut Event) {
    if event.is_input() {
        log::trace!("{}", event);
    } else {
        log::debug!("{}", event);
    }

    // Neither case marks the event handled, so layers still see it
    match event.kind {
        EventKind::WindowClose => *running = false,
        EventKind::WindowResize { width, height } => {
            let now_minimized = width == 0 || height == 0;
            if now_minimized != *minimized {
                log::debug!("Window {}", if now_minimized { "minimized" } else { "restored" });
            }
            *minimized = now_minimized;
        }
        _ => {}
    }

    layers.dispatch_event(event);
}
