// Frame tracking
//
// Bookkeeping for the acquire -> record -> submit -> present cycle.
// The slot index (which fence/semaphores/command buffer we use) and the
// acquired swapchain image index are separate values: the presentation
// engine hands out images in whatever order it likes.

use crate::error::FrameError;

/// Number of frames the host may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Where the current slot is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Acquiring,
    Recording,
    Submitted,
}

/// Frame counter, slot rotation and acquired image of the frame in progress
#[derive(Debug, Clone)]
pub struct FrameTracker {
    slot_count: usize,
    frame_counter: u64,
    image_index: Option<u32>,
    phase: FramePhase,
}

impl FrameTracker {
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count > 0, "need at least one frame slot");
        Self {
            slot_count,
            frame_counter: 0,
            image_index: None,
            phase: FramePhase::Idle,
        }
    }

    /// Slot used by the current (or next) frame: `frame_counter mod slot_count`
    pub fn slot(&self) -> usize {
        (self.frame_counter % self.slot_count as u64) as usize
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Frames that completed the whole cycle
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Image acquired for the frame in progress, if any
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Idle -> Acquiring. Returns the slot to wait on and acquire with.
    pub fn begin_acquire(&mut self) -> Result<usize, FrameError> {
        self.transition(FramePhase::Idle, FramePhase::Acquiring)?;
        Ok(self.slot())
    }

    /// Acquiring -> Idle without advancing, when no image could be acquired
    pub fn abandon_acquire(&mut self) -> Result<(), FrameError> {
        self.transition(FramePhase::Acquiring, FramePhase::Idle)?;
        self.image_index = None;
        Ok(())
    }

    /// Acquiring -> Recording with the image the swapchain handed out
    pub fn begin_recording(&mut self, image_index: u32) -> Result<(), FrameError> {
        self.transition(FramePhase::Acquiring, FramePhase::Recording)?;
        self.image_index = Some(image_index);
        Ok(())
    }

    /// Recording -> Submitted
    pub fn mark_submitted(&mut self) -> Result<(), FrameError> {
        self.transition(FramePhase::Recording, FramePhase::Submitted)
    }

    /// Submitted -> Idle, advancing to the next slot
    pub fn finish(&mut self) -> Result<(), FrameError> {
        self.transition(FramePhase::Submitted, FramePhase::Idle)?;
        self.image_index = None;
        self.frame_counter += 1;
        Ok(())
    }

    fn transition(&mut self, from: FramePhase, to: FramePhase) -> Result<(), FrameError> {
        if self.phase != from {
            return Err(FrameError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }
}

impl Default for FrameTracker {
    fn default() -> Self {
        Self::new(MAX_FRAMES_IN_FLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(tracker: &mut FrameTracker, image_index: u32) -> usize {
        let slot = tracker.begin_acquire().unwrap();
        tracker.begin_recording(image_index).unwrap();
        tracker.mark_submitted().unwrap();
        tracker.finish().unwrap();
        slot
    }

    #[test]
    fn slot_rotates_with_frame_counter() {
        let mut tracker = FrameTracker::default();
        assert_eq!(tracker.slot_count(), MAX_FRAMES_IN_FLIGHT);

        for k in 0..7u64 {
            assert_eq!(tracker.frame_counter(), k);
            assert_eq!(tracker.slot(), (k % 2) as usize);
            // Swapchain hands out images out of step with the slots
            let slot = run_frame(&mut tracker, ((k * 2 + 1) % 3) as u32);
            assert_eq!(slot, (k % 2) as usize);
        }
        assert_eq!(tracker.frame_counter(), 7);
    }

    #[test]
    fn image_index_is_tracked_separately() {
        let mut tracker = FrameTracker::default();

        let slot = tracker.begin_acquire().unwrap();
        tracker.begin_recording(2).unwrap();

        assert_eq!(slot, 0);
        assert_eq!(tracker.image_index(), Some(2));
        assert_eq!(tracker.phase(), FramePhase::Recording);

        tracker.mark_submitted().unwrap();
        tracker.finish().unwrap();
        assert_eq!(tracker.image_index(), None);
    }

    #[test]
    fn abandoned_acquire_keeps_the_slot() {
        let mut tracker = FrameTracker::default();
        run_frame(&mut tracker, 0);

        assert_eq!(tracker.begin_acquire().unwrap(), 1);
        tracker.abandon_acquire().unwrap();

        assert_eq!(tracker.phase(), FramePhase::Idle);
        assert_eq!(tracker.frame_counter(), 1);
        assert_eq!(tracker.begin_acquire().unwrap(), 1);
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut tracker = FrameTracker::default();

        assert_eq!(
            tracker.mark_submitted(),
            Err(FrameError::InvalidTransition {
                from: FramePhase::Idle,
                to: FramePhase::Submitted,
            })
        );

        tracker.begin_acquire().unwrap();
        assert!(tracker.begin_acquire().is_err());
        assert!(tracker.finish().is_err());

        // A rejected call leaves the phase alone
        assert_eq!(tracker.phase(), FramePhase::Acquiring);
    }
}
