// Headless backend
//
// Runs the frame protocol bookkeeping with no GPU behind it. Images are
// handed out round-robin over a three-image chain so that image indices
// drift against the two frame slots the same way a real swapchain's can.

use ash::vk;

use super::{FrameContext, FrameTracker, MAX_FRAMES_IN_FLIGHT};
use crate::error::FrameError;

const IMAGE_COUNT: u32 = 3;

pub struct HeadlessRenderer {
    tracker: FrameTracker,
    extent: vk::Extent2D,
    next_image: u32,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        log::info!("Initializing headless renderer ({}x{})", width, height);
        Self {
            tracker: FrameTracker::new(MAX_FRAMES_IN_FLIGHT),
            extent: vk::Extent2D { width, height },
            next_image: 0,
        }
    }

    pub fn tracker(&self) -> &FrameTracker {
        &self.tracker
    }

    pub fn begin_frame(&mut self) -> Result<FrameContext, FrameError> {
        let frame_number = self.tracker.frame_counter();
        let slot = self.tracker.begin_acquire()?;

        let image_index = self.next_image;
        self.tracker.begin_recording(image_index)?;
        self.next_image = (self.next_image + 1) % IMAGE_COUNT;

        Ok(FrameContext {
            slot,
            image_index,
            frame_number,
            command_buffer: vk::CommandBuffer::null(),
            extent: self.extent,
        })
    }

    pub fn end_frame(&mut self) -> Result<(), FrameError> {
        self.tracker.mark_submitted()?;
        self.tracker.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_index_drifts_against_slot() {
        let mut renderer = HeadlessRenderer::new(8, 8);
        let mut pairs = Vec::new();

        for _ in 0..6 {
            let frame = renderer.begin_frame().unwrap();
            pairs.push((frame.slot, frame.image_index));
            renderer.end_frame().unwrap();
        }

        assert_eq!(pairs, [(0, 0), (1, 1), (0, 2), (1, 0), (0, 1), (1, 2)]);
    }

    #[test]
    fn double_begin_is_rejected() {
        let mut renderer = HeadlessRenderer::new(8, 8);
        renderer.begin_frame().unwrap();
        assert!(renderer.begin_frame().is_err());
    }
}
