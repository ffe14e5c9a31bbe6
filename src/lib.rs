// Noctis - layered application loop on a Vulkan frame pipeline
//
// ┌──────────────────────────────────────────────────────────┐
// │  Application (window, layer stack, running/minimized)    │
// │    └── Renderer facade (Vulkan | Headless)               │
// │          └── Device + Swapchain + Render targets         │
// │                └── Frame slots (cmd, semaphores, fence)  │
// └──────────────────────────────────────────────────────────┘

pub mod application;
pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod layer;
pub mod renderer;
pub mod ui;
pub mod window;

pub use application::Application;
pub use config::Config;
pub use error::{FrameError, RendererError};
pub use event::{Event, EventKind, KeyCode, MouseButton};
pub use layer::{Layer, LayerStack};
pub use renderer::{FrameContext, Renderer, RendererApi};
pub use ui::{FrameStatsOverlay, UiOverlay};
pub use window::{Window, WinitWindow};
