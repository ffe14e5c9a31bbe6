// Events
//
// Window and input notifications delivered to the application and its
// layers. The `handled` flag stops propagation through the layer stack.

use std::fmt;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

/// Concrete event kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    WindowClose,
    WindowResize { width: u32, height: u32 },
    KeyPressed { key: KeyCode, repeat: bool },
    KeyReleased { key: KeyCode },
    MouseButtonPressed(MouseButton),
    MouseButtonReleased(MouseButton),
    MouseMoved { x: f64, y: f64 },
    MouseScrolled { x_offset: f64, y_offset: f64 },
}

/// An event instance travelling through one dispatch pass
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub handled: bool,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            handled: false,
        }
    }

    /// Run `handler` against this event and fold its result into `handled`.
    ///
    /// A handler returning `false` never clears a flag set earlier.
    pub fn dispatch(&mut self, handler: impl FnOnce(&EventKind) -> bool) {
        self.handled |= handler(&self.kind);
    }

    pub fn is_input(&self) -> bool {
        !matches!(
            self.kind,
            EventKind::WindowClose | EventKind::WindowResize { .. }
        )
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::WindowClose => write!(f, "WindowCloseEvent"),
            EventKind::WindowResize { width, height } => {
                write!(f, "WindowResizeEvent: {}, {}", width, height)
            }
            EventKind::KeyPressed { key, repeat } => {
                write!(f, "KeyPressedEvent: {:?} (repeat = {})", key, repeat)
            }
            EventKind::KeyReleased { key } => write!(f, "KeyReleasedEvent: {:?}", key),
            EventKind::MouseButtonPressed(button) => {
                write!(f, "MouseButtonPressedEvent: {:?}", button)
            }
            EventKind::MouseButtonReleased(button) => {
                write!(f, "MouseButtonReleasedEvent: {:?}", button)
            }
            EventKind::MouseMoved { x, y } => write!(f, "MouseMovedEvent: {}, {}", x, y),
            EventKind::MouseScrolled { x_offset, y_offset } => {
                write!(f, "MouseScrolledEvent: {}, {}", x_offset, y_offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_only_sets_handled() {
        let mut event = Event::new(EventKind::KeyPressed {
            key: KeyCode::Space,
            repeat: false,
        });

        event.dispatch(|kind| matches!(kind, EventKind::KeyPressed { .. }));
        assert!(event.handled);

        // A later handler declining the event must not clear the flag
        event.dispatch(|_| false);
        assert!(event.handled);
    }

    #[test]
    fn window_events_are_not_input() {
        assert!(!Event::new(EventKind::WindowClose).is_input());
        assert!(!Event::new(EventKind::WindowResize { width: 1, height: 1 }).is_input());
        assert!(Event::new(EventKind::MouseMoved { x: 0.0, y: 0.0 }).is_input());
    }

    #[test]
    fn display_names_the_event() {
        let event = Event::new(EventKind::WindowResize {
            width: 800,
            height: 600,
        });
        assert_eq!(event.to_string(), "WindowResizeEvent: 800, 600");
    }
}
