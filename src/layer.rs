// Layers - ordered update/render/event handlers
//
// Regular layers live below the overlay boundary, overlays above it.
// Updates and rendering walk the stack bottom to top; events walk it
// top to bottom so overlays see input first.

use crate::event::Event;
use crate::renderer::FrameContext;

/// A stack-ordered handler. Every hook has an empty default.
pub trait Layer {
    fn name(&self) -> &str;

    fn on_attach(&mut self) {}
    fn on_detach(&mut self) {}
    fn on_update(&mut self) {}
    fn on_render(&mut self, _frame: &FrameContext) {}
    fn on_ui_render(&mut self) {}
    fn on_event(&mut self, _event: &mut Event) {}
}

/// Owns every pushed layer until it is popped or the stack is dropped
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn Layer>>,
    /// Index of the first overlay
    insert_index: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert below every overlay. Attaching is the caller's job.
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) -> &mut Box<dyn Layer> {
        let index = self.insert_index;
        self.layers.insert(index, layer);
        self.insert_index += 1;
        &mut self.layers[index]
    }

    /// Insert on top of the stack. Attaching is the caller's job.
    pub fn push_overlay(&mut self, overlay: Box<dyn Layer>) -> &mut Box<dyn Layer> {
        let index = self.layers.len();
        self.layers.push(overlay);
        &mut self.layers[index]
    }

    /// Remove the first regular layer called `name`, detaching it
    pub fn pop_layer(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let index = self.layers[..self.insert_index]
            .iter()
            .position(|layer| layer.name() == name)?;

        let mut layer = self.layers.remove(index);
        self.insert_index -= 1;
        layer.on_detach();
        Some(layer)
    }

    /// Remove the first overlay called `name`, detaching it
    pub fn pop_overlay(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let offset = self.layers[self.insert_index..]
            .iter()
            .position(|layer| layer.name() == name)?;

        let mut overlay = self.layers.remove(self.insert_index + offset);
        overlay.on_detach();
        Some(overlay)
    }

    /// Deliver `event` top to bottom until a layer marks it handled
    pub fn dispatch_event(&mut self, event: &mut Event) {
        for layer in self.layers.iter_mut().rev() {
            if event.handled {
                break;
            }
            layer.on_event(event);
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Box<dyn Layer>> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Box<dyn Layer>> {
        self.layers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn overlay_count(&self) -> usize {
        self.layers.len() - self.insert_index
    }
}

impl Drop for LayerStack {
    fn drop(&mut self) {
        for layer in &mut self.layers {
            log::debug!("Detaching layer '{}'", layer.name());
            layer.on_detach();
        }
    }
}
