// Synchronization - frames in flight
//
// Each frame slot owns a command buffer, two semaphores and a fence.
// Protocol for slot f and acquired image i (f and i are unrelated):
//   wait fence(f) -> acquire(i, image_available(f)) -> reset fence(f) + cmd(f)
//   -> record -> submit(wait image_available(f), signal render_finished(f), fence(f))
//   -> present(i, wait render_finished(f)) -> advance
//
// The cycle itself only talks to `FrameOps`; `VulkanFrameOps` issues the
// calls through ash.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::{Swapchain, VulkanDevice};
use crate::renderer::{FramePhase, FrameTracker, MAX_FRAMES_IN_FLIGHT};

/// Creates and destroys the sync objects of a frame slot
pub trait SyncObjectFactory {
    fn create_semaphore(&self) -> Result<vk::Semaphore>;
    fn create_signaled_fence(&self) -> Result<vk::Fence>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn destroy_fence(&self, fence: vk::Fence);
}

impl SyncObjectFactory for ash::Device {
    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo::builder();
        unsafe { Ok(ash::Device::create_semaphore(self, &info, None)?) }
    }

    fn create_signaled_fence(&self) -> Result<vk::Fence> {
        let info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
        unsafe { Ok(self.create_fence(&info, None)?) }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { ash::Device::destroy_semaphore(self, semaphore, None) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { ash::Device::destroy_fence(self, fence, None) }
    }
}

/// Per-frame GPU objects - one per frame in flight
#[derive(Debug, Clone, Copy)]
pub struct FrameSlot {
    pub command_buffer: vk::CommandBuffer,
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

impl FrameSlot {
    /// Create the slot's semaphores and fence. On failure, whatever was
    /// already created is destroyed before the error is returned.
    pub fn new<F: SyncObjectFactory + ?Sized>(factory: &F, command_buffer: vk::CommandBuffer) -> Result<Self> {
        let mut slot = Self {
            command_buffer,
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight_fence: vk::Fence::null(),
        };

        match slot.create_objects(factory) {
            Ok(()) => Ok(slot),
            Err(e) => {
                slot.destroy(factory);
                Err(e)
            }
        }
    }

    fn create_objects<F: SyncObjectFactory + ?Sized>(&mut self, factory: &F) -> Result<()> {
        self.image_available = factory.create_semaphore()?;
        self.render_finished = factory.create_semaphore()?;
        // Start signaled so the first wait on each slot returns immediately
        self.in_flight_fence = factory.create_signaled_fence()?;
        Ok(())
    }

    /// Destroy the sync objects. The command buffer belongs to the pool.
    pub fn destroy<F: SyncObjectFactory + ?Sized>(&self, factory: &F) {
        if self.image_available != vk::Semaphore::null() {
            factory.destroy_semaphore(self.image_available);
        }
        if self.render_finished != vk::Semaphore::null() {
            factory.destroy_semaphore(self.render_finished);
        }
        if self.in_flight_fence != vk::Fence::null() {
            factory.destroy_fence(self.in_flight_fence);
        }
    }
}

/// Slot and image handed to the recorder between `begin_frame` and `end_frame`
#[derive(Debug, Clone, Copy)]
pub struct AcquiredFrame {
    pub slot: usize,
    pub image_index: u32,
    pub command_buffer: vk::CommandBuffer,
}

/// Device calls made by the frame cycle
pub trait FrameOps {
    fn wait_for_fence(&self, fence: vk::Fence) -> Result<()>;

    /// `None` when the swapchain is out of date; the semaphore is then unsignaled
    fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<Option<(u32, bool)>>;

    fn reset_fence(&self, fence: vk::Fence) -> Result<()>;

    /// Reset the command buffer and begin recording into it
    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()>;
    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()>;

    /// Submit the slot's command buffer with its semaphores and fence
    fn submit(&self, slot: &FrameSlot) -> Result<()>;

    /// Returns `true` when the swapchain is suboptimal or out of date
    fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<bool>;
}

/// `FrameOps` on a real device and swapchain
pub struct VulkanFrameOps<'a> {
    device: &'a VulkanDevice,
    swapchain: &'a Swapchain,
}

impl<'a> VulkanFrameOps<'a> {
    pub fn new(device: &'a VulkanDevice, swapchain: &'a Swapchain) -> Self {
        Self { device, swapchain }
    }
}

impl FrameOps for VulkanFrameOps<'_> {
    fn wait_for_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe { Ok(self.device.device.wait_for_fences(&[fence], true, u64::MAX)?) }
    }

    fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<Option<(u32, bool)>> {
        self.swapchain.acquire_next_image(u64::MAX, semaphore)
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe { Ok(self.device.device.reset_fences(&[fence])?) }
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let device = &self.device.device;
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            device.begin_command_buffer(command_buffer, &begin_info)?;
        }
        Ok(())
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe { Ok(self.device.device.end_command_buffer(command_buffer)?) }
    }

    fn submit(&self, slot: &FrameSlot) -> Result<()> {
        let wait_semaphores = [slot.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.render_finished];
        let command_buffers = [slot.command_buffer];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)      // Wait for image to be available
            .wait_dst_stage_mask(&wait_stages)      // ...before writing color
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores); // Signal when done

        unsafe {
            self.device.device.queue_submit(
                self.device.graphics_queue,
                &[submit_info.build()],
                slot.in_flight_fence, // Signal this fence when GPU is done
            )?;
        }
        Ok(())
    }

    fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<bool> {
        self.swapchain
            .present(self.device.present_queue, image_index, &[wait_semaphore])
    }
}

/// Wait for the current slot, acquire an image and start recording.
/// An out-of-date swapchain returns the slot to Idle with its fence untouched.
pub fn begin_cycle<O: FrameOps + ?Sized>(
    tracker: &mut FrameTracker,
    slots: &[FrameSlot],
    ops: &O,
) -> Result<Option<AcquiredFrame>> {
    let slot_index = tracker.begin_acquire()?;
    let slot = &slots[slot_index];

    // 1. Bounds the host to MAX_FRAMES_IN_FLIGHT - 1 frames of lead
    ops.wait_for_fence(slot.in_flight_fence)?;

    // 2. The image index is whatever the presentation engine gives us
    let Some((image_index, suboptimal)) = ops.acquire_next_image(slot.image_available)? else {
        // Fence is still signaled, so the slot can be waited on again
        tracker.abandon_acquire()?;
        return Ok(None);
    };
    if suboptimal {
        log::debug!("Swapchain is suboptimal for the surface");
    }

    // 3. Only reset once we know work will be submitted on this fence
    ops.reset_fence(slot.in_flight_fence)?;
    ops.begin_commands(slot.command_buffer)?;

    tracker.begin_recording(image_index)?;

    Ok(Some(AcquiredFrame {
        slot: slot_index,
        image_index,
        command_buffer: slot.command_buffer,
    }))
}

/// Finish recording, submit, present and advance to the next slot
pub fn end_cycle<O: FrameOps + ?Sized>(
    tracker: &mut FrameTracker,
    slots: &[FrameSlot],
    ops: &O,
) -> Result<bool> {
    let image_index = tracker
        .image_index()
        .context("end_frame called without an acquired image")?;
    tracker.mark_submitted()?;

    let slot = &slots[tracker.slot()];
    ops.end_commands(slot.command_buffer)?;
    ops.submit(slot)?;

    // Presentation waits for rendering to finish
    let stale = ops.present(image_index, slot.render_finished)?;

    tracker.finish()?;
    Ok(stale)
}

/// Owns the frame slots and drives the acquire -> record -> submit -> present cycle
pub struct FrameSynchronizer {
    slots: Vec<FrameSlot>,
    command_pool: vk::CommandPool,
    tracker: FrameTracker,
    device: Arc<VulkanDevice>,
}

impl FrameSynchronizer {
    pub fn new(device: Arc<VulkanDevice>) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(device.queue_families.graphics)
            // TRANSIENT: Command buffers are re-recorded every frame
            // RESET: Allow individual buffer reset
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let command_pool = unsafe { device.device.create_command_pool(&pool_info, None) }
            .context("Failed to create command pool")?;

        // From here on, Drop cleans up whatever was created
        let mut this = Self {
            slots: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            command_pool,
            tracker: FrameTracker::new(MAX_FRAMES_IN_FLIGHT),
            device,
        };

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(this.tracker.slot_count() as u32);

        let command_buffers = unsafe { this.device.device.allocate_command_buffers(&alloc_info) }
            .context("Failed to allocate command buffers")?;

        for command_buffer in command_buffers {
            let slot = FrameSlot::new(&this.device.device, command_buffer)?;
            this.slots.push(slot);
        }

        log::info!("Created {} frame slots", this.slots.len());
        Ok(this)
    }

    pub fn tracker(&self) -> &FrameTracker {
        &self.tracker
    }

    /// Command buffer of the frame being recorded
    pub fn current_command_buffer(&self) -> Result<vk::CommandBuffer> {
        if self.tracker.phase() != FramePhase::Recording {
            anyhow::bail!("no frame is being recorded ({:?})", self.tracker.phase());
        }
        Ok(self.slots[self.tracker.slot()].command_buffer)
    }

    /// Returns `None` when the swapchain is out of date; the slot is left
    /// untouched and may be used again.
    pub fn begin_frame(&mut self, swapchain: &Swapchain) -> Result<Option<AcquiredFrame>> {
        let ops = VulkanFrameOps::new(&self.device, swapchain);
        begin_cycle(&mut self.tracker, &self.slots, &ops)
    }

    /// Returns `true` when presentation reported the swapchain out of date or
    /// suboptimal.
    pub fn end_frame(&mut self, swapchain: &Swapchain) -> Result<bool> {
        let ops = VulkanFrameOps::new(&self.device, swapchain);
        end_cycle(&mut self.tracker, &self.slots, &ops)
    }
}

impl Drop for FrameSynchronizer {
    fn drop(&mut self) {
        // Nothing below may still be referenced by queued GPU work
        let _ = self.device.wait_idle();

        for slot in &self.slots {
            slot.destroy(&self.device.device);
        }

        // Also frees the command buffers
        unsafe {
            self.device.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
