// Render pass and framebuffers
//
// A single color attachment (the swapchain image), cleared on load and left
// in PRESENT_SRC layout. One framebuffer per swapchain image view.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::{Swapchain, VulkanDevice};

/// Create a render pass for clearing and drawing into a swapchain image
pub fn create_render_pass(device: &VulkanDevice, format: vk::Format) -> Result<vk::RenderPass> {
    // Color attachment (the swapchain image)
    let color_attachment = vk::AttachmentDescription::builder()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build();

    let color_attachment_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .build();

    let color_attachments = &[color_attachment_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments)
        .build();

    // The layout transition must wait for the acquire semaphore, which the
    // submit only makes COLOR_ATTACHMENT_OUTPUT wait on
    let dependency = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .build();

    let attachments = &[color_attachment];
    let subpasses = &[subpass];
    let dependencies = &[dependency];

    let render_pass_info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(dependencies);

    unsafe {
        device.device.create_render_pass(&render_pass_info, None)
            .context("Failed to create render pass")
    }
}

/// Render pass plus one framebuffer per swapchain image
pub struct RenderTargets {
    pub render_pass: vk::RenderPass,
    /// Indexed by acquired image index, never by frame slot
    pub framebuffers: Vec<vk::Framebuffer>,
    pub extent: vk::Extent2D,
    device: Arc<VulkanDevice>,
}

impl RenderTargets {
    pub fn new(device: Arc<VulkanDevice>, swapchain: &Swapchain) -> Result<Self> {
        let render_pass = create_render_pass(&device, swapchain.format)?;

        let mut this = Self {
            render_pass,
            framebuffers: Vec::with_capacity(swapchain.image_views.len()),
            extent: swapchain.extent,
            device,
        };

        for &view in &swapchain.image_views {
            let attachments = [view];
            let framebuffer_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(swapchain.extent.width)
                .height(swapchain.extent.height)
                .layers(1);

            let framebuffer = unsafe { this.device.device.create_framebuffer(&framebuffer_info, None) }
                .context("Failed to create framebuffer")?;
            this.framebuffers.push(framebuffer);
        }

        log::info!(
            "Created {} framebuffers for {} swapchain images",
            this.framebuffers.len(),
            swapchain.image_count()
        );
        Ok(this)
    }

    /// Begin the render pass on the framebuffer of `image_index`, clearing it
    pub fn begin(&self, command_buffer: vk::CommandBuffer, image_index: u32, clear_color: [f32; 4]) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear_color },
        }];

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffers[image_index as usize])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device.device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device.device.cmd_end_render_pass(command_buffer);
        }
    }
}

impl Drop for RenderTargets {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.device.device.destroy_framebuffer(framebuffer, None);
            }
            self.device.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
