// Renderer facade
//
// The application only ever talks to `Renderer`: init once, then
// begin_frame / end_frame every tick. The backend is picked from the
// configured API when the renderer is created and never changes after.

mod frame;
mod headless;

pub use frame::{FramePhase, FrameTracker, MAX_FRAMES_IN_FLIGHT};
pub use headless::HeadlessRenderer;

use anyhow::Result;
use ash::vk;
use serde::Deserialize;

use crate::backend::VulkanRenderer;
use crate::config::RendererConfig;
use crate::error::RendererError;
use crate::window::Window;

/// Graphics API selector, read from `renderer.api`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererApi {
    None,
    Vulkan,
    Headless,
}

/// What a layer's render hook gets to record into
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Frame-in-flight slot, `frame_number % MAX_FRAMES_IN_FLIGHT`
    pub slot: usize,
    /// Swapchain image being rendered; unrelated to `slot`
    pub image_index: u32,
    /// Frames completed before this one
    pub frame_number: u64,
    /// Null for the headless backend
    pub command_buffer: vk::CommandBuffer,
    pub extent: vk::Extent2D,
}

enum Backend {
    Vulkan(Box<VulkanRenderer>),
    Headless(HeadlessRenderer),
}

pub struct Renderer {
    backend: Backend,
}

impl Renderer {
    /// Create and initialize the backend selected by `config.api`
    pub fn init(config: &RendererConfig, window: &dyn Window, enable_validation: bool) -> Result<Self> {
        let backend = match config.api {
            RendererApi::Vulkan => {
                Backend::Vulkan(Box::new(VulkanRenderer::new(window, config, enable_validation)?))
            }
            RendererApi::Headless => {
                Backend::Headless(HeadlessRenderer::new(window.width(), window.height()))
            }
            RendererApi::None => return Err(RendererError::UnsupportedApi(config.api).into()),
        };

        log::info!("Renderer initialized with {:?} backend", config.api);
        Ok(Self { backend })
    }

    /// Headless renderer without a window
    pub fn headless(width: u32, height: u32) -> Self {
        Self {
            backend: Backend::Headless(HeadlessRenderer::new(width, height)),
        }
    }

    pub fn api(&self) -> RendererApi {
        match self.backend {
            Backend::Vulkan(_) => RendererApi::Vulkan,
            Backend::Headless(_) => RendererApi::Headless,
        }
    }

    /// Start a frame. `None` means this tick renders nothing and
    /// `end_frame` must not be called.
    pub fn begin_frame(&mut self) -> Result<Option<FrameContext>> {
        match &mut self.backend {
            Backend::Vulkan(vulkan) => vulkan.begin_frame(),
            Backend::Headless(headless) => Ok(Some(headless.begin_frame()?)),
        }
    }

    pub fn end_frame(&mut self) -> Result<()> {
        match &mut self.backend {
            Backend::Vulkan(vulkan) => vulkan.end_frame(),
            Backend::Headless(headless) => Ok(headless.end_frame()?),
        }
    }

    /// Frames that went through the whole cycle
    pub fn frame_counter(&self) -> u64 {
        match &self.backend {
            Backend::Vulkan(vulkan) => vulkan.frame_counter(),
            Backend::Headless(headless) => headless.tracker().frame_counter(),
        }
    }

    /// Wait for outstanding GPU work, then release everything
    pub fn shutdown(self) -> Result<()> {
        if let Backend::Vulkan(vulkan) = &self.backend {
            vulkan.wait_idle()?;
        }
        log::info!("Renderer shut down after {} frames", self.frame_counter());
        Ok(())
    }
}
