// Vulkan renderer backend
//
// Owns every GPU object of the renderer. Field order is drop order:
// frame slots, then render targets, then swapchain, then the device
// (which keeps the instance and surface alive until last).

use anyhow::Result;
use std::sync::Arc;

use super::{FrameSynchronizer, RenderTargets, Swapchain, VulkanContext, VulkanDevice};
use crate::config::RendererConfig;
use crate::renderer::FrameContext;
use crate::window::Window;

pub struct VulkanRenderer {
    frames: FrameSynchronizer,
    targets: RenderTargets,
    swapchain: Swapchain,
    device: Arc<VulkanDevice>,
    clear_color: [f32; 4],
    /// Set once acquisition reports the swapchain out of date
    swapchain_stale: bool,
}

impl VulkanRenderer {
    /// Initialize all Vulkan resources.
    ///
    /// 1. Instance, debug messenger, surface
    /// 2. Device (GPU selection, queues)
    /// 3. Swapchain sized to the window
    /// 4. Render pass + framebuffers
    /// 5. Frame slots (command buffers, semaphores, fences)
    pub fn new(window: &dyn Window, config: &RendererConfig, enable_validation: bool) -> Result<Self> {
        log::info!("Initializing Vulkan Renderer API");

        let context = Arc::new(VulkanContext::new(
            window.title(),
            window.native_handles(),
            enable_validation,
        )?);

        let device = VulkanDevice::new(context)?;

        let swapchain = Swapchain::new(
            device.clone(),
            config.preferred_present_mode(),
            window.width(),
            window.height(),
        )?;

        let targets = RenderTargets::new(device.clone(), &swapchain)?;
        let frames = FrameSynchronizer::new(device.clone())?;

        log::info!("Vulkan Renderer API initialized successfully");

        Ok(Self {
            frames,
            targets,
            swapchain,
            device,
            clear_color: config.clear_color,
            swapchain_stale: false,
        })
    }

    /// Acquire an image and open its render pass.
    ///
    /// `None` means the frame is skipped and `end_frame` must not be called.
    pub fn begin_frame(&mut self) -> Result<Option<FrameContext>> {
        if self.swapchain_stale {
            return Ok(None);
        }

        let frame_number = self.frames.tracker().frame_counter();
        let Some(acquired) = self.frames.begin_frame(&self.swapchain)? else {
            log::warn!(
                "Swapchain is out of date and recreation is not supported; skipping frames from now on"
            );
            self.swapchain_stale = true;
            return Ok(None);
        };

        self.targets
            .begin(acquired.command_buffer, acquired.image_index, self.clear_color);

        Ok(Some(FrameContext {
            slot: acquired.slot,
            image_index: acquired.image_index,
            frame_number,
            command_buffer: acquired.command_buffer,
            extent: self.swapchain.extent,
        }))
    }

    /// Close the render pass, submit and present
    pub fn end_frame(&mut self) -> Result<()> {
        let command_buffer = self.frames.current_command_buffer()?;
        self.targets.end(command_buffer);

        if self.frames.end_frame(&self.swapchain)? {
            log::debug!("Presentation reported a suboptimal or out-of-date swapchain");
        }
        Ok(())
    }

    pub fn frame_counter(&self) -> u64 {
        self.frames.tracker().frame_counter()
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        log::info!("Shutting down Vulkan renderer...");

        // Wait for GPU to finish before destroying anything
        if let Err(e) = self.device.wait_idle() {
            log::error!("Device wait idle failed during shutdown: {:#}", e);
        }
    }
}
